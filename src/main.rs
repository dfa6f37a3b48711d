//! stocktwits-streams — binary entrypoint.
//!
//! ```text
//! stocktwits-streams latest BTC.X 1000
//! stocktwits-streams history AA 2022-07-10 2022-07-12
//! stocktwits-streams history AA 2018-01-01 2018-12-31 175000000
//! ```

use clap::Parser;
use stocktwits_streams::{app, cli::Cli};

// Pages depend on the previous cursor, so one thread is all the crawl can use.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let written = app::run(cli).await?;
    println!("{}", written.display());
    Ok(())
}
