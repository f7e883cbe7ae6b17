// src/models/mod.rs

//! Domain models for the notice monitor.

mod config;
mod notice;

// Re-export all public types
pub use config::{
    Config, CrawlerConfig, MonitorConfig, NotifyConfig, SourceConfig, SourceMode,
};
pub use notice::Notice;
