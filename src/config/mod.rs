pub mod crawler;

pub use crawler::CrawlerConfig;
