//! Monitoring pipeline.
//!
//! - `NoveltyTracker`: decides which extracted notices are new
//! - `ObserverRegistry`: fans new notices out to observers
//! - `NoticeMonitor`: runs fetch → extract → classify → notify on a timer

pub mod monitor;
pub mod observers;
pub mod tracker;

pub use monitor::{MonitorHandle, MonitorState, NoticeMonitor, PollStats};
pub use observers::{NoticeObserver, ObserverRegistry, Subscription};
pub use tracker::{Classification, DEFAULT_WATERMARK, NoveltyTracker, ScanMode};
