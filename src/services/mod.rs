//! Service layer for the notice monitor.
//!
//! This module contains:
//! - Page fetching (`HtmlFetcher`, `ProxyFetcher`, `DirectFetcher`)
//! - Notice extraction (`NoticeExtractor`)

mod fetcher;
mod notices;

pub use fetcher::{DirectFetcher, HtmlFetcher, ProxyEnvelope, ProxyFetcher, fetcher_for};
pub use notices::NoticeExtractor;
