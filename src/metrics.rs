use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::Path;

/// Prometheus recorder whose state is dumped to a text file when the run ends
/// (node_exporter textfile-collector format).
pub struct MetricsSnapshot {
    pub handle: PrometheusHandle,
}

impl MetricsSnapshot {
    /// Install the global recorder. Call before the first crawl so series get their descriptions.
    pub fn install() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        Ok(Self { handle })
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render())
            .with_context(|| format!("writing metrics snapshot {}", path.display()))
    }
}
