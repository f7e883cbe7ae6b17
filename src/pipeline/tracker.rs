//! Novelty tracking for extracted notices.
//!
//! A notice is new when the ordinal in its attachment filename exceeds the
//! highest ordinal seen so far (the watermark). The watermark lives in a
//! [`KeyValueStore`] so restarts do not re-announce old notices.
//!
//! Correctness depends on the source numbering attachments with strictly
//! increasing integers. Dates and titles are never consulted.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{MonitorConfig, Notice};
use crate::storage::KeyValueStore;
use crate::utils::notice_ordinal;

/// Watermark used when the store holds no value.
pub const DEFAULT_WATERMARK: u64 = 150_520_258_936;

/// How far down the notice list the tracker looks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// Stop at the first notice that is not new.
    ///
    /// Relies on the page being strictly newest-first: a single out-of-order
    /// row hides every new notice below it.
    #[default]
    StopAtFirstSeen,
    /// Check every notice.
    FullScan,
}

/// Outcome of classifying one poll's notices.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Classification {
    /// Every extracted notice, with `is_new` applied
    pub notices: Vec<Notice>,
    /// The new notices, in page order
    pub new_notices: Vec<Notice>,
}

impl Classification {
    /// Check if the poll found anything new.
    pub fn has_new(&self) -> bool {
        !self.new_notices.is_empty()
    }

    /// Highest ordinal among the new notices.
    pub fn max_new_ordinal(&self) -> Option<u64> {
        self.new_notices
            .iter()
            .map(|n| notice_ordinal(n.link.as_deref()))
            .max()
    }
}

/// Tracks the highest notice ordinal seen so far.
pub struct NoveltyTracker {
    store: Arc<dyn KeyValueStore>,
    key: String,
    high_watermark: u64,
    scan_mode: ScanMode,
    persist_retries: u32,
}

impl NoveltyTracker {
    /// Seed the tracker from `store`, falling back to `default_watermark`.
    ///
    /// A stored value that is not a decimal integer is ignored. A store that
    /// cannot be read at all is an error.
    pub fn load(
        store: Arc<dyn KeyValueStore>,
        key: impl Into<String>,
        default_watermark: u64,
    ) -> Result<Self> {
        let key = key.into();
        let high_watermark = match store.get(&key)? {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                log::warn!("Ignoring stored {key} {raw:?}: not a notice number");
                default_watermark
            }),
            None => default_watermark,
        };
        log::debug!("Notice watermark seeded at {high_watermark}");

        Ok(Self {
            store,
            key,
            high_watermark,
            scan_mode: ScanMode::default(),
            persist_retries: 0,
        })
    }

    /// Build a tracker from the `[monitor]` configuration section.
    pub fn from_config(store: Arc<dyn KeyValueStore>, config: &MonitorConfig) -> Result<Self> {
        let scan_mode = if config.full_scan {
            ScanMode::FullScan
        } else {
            ScanMode::StopAtFirstSeen
        };
        Ok(Self::load(store, &config.state_key, config.initial_watermark)?
            .with_scan_mode(scan_mode)
            .with_persist_retries(config.persist_retries))
    }

    pub fn with_scan_mode(mut self, scan_mode: ScanMode) -> Self {
        self.scan_mode = scan_mode;
        self
    }

    pub fn with_persist_retries(mut self, retries: u32) -> Self {
        self.persist_retries = retries;
        self
    }

    /// Current watermark.
    pub fn watermark(&self) -> u64 {
        self.high_watermark
    }

    pub fn scan_mode(&self) -> ScanMode {
        self.scan_mode
    }

    /// Classify notices against the current watermark without touching it.
    pub fn detect(&self, notices: &[Notice]) -> Classification {
        let mut all = notices.to_vec();
        let mut new_notices = Vec::new();

        for notice in all.iter_mut() {
            if notice_ordinal(notice.link.as_deref()) > self.high_watermark {
                notice.is_new = true;
                new_notices.push(notice.clone());
            } else if self.scan_mode == ScanMode::StopAtFirstSeen {
                break;
            }
        }

        Classification {
            notices: all,
            new_notices,
        }
    }

    /// Classify notices and advance the watermark past the new ones.
    ///
    /// The new watermark is written to the store before this returns. If the
    /// write keeps failing the in-memory watermark stays where it was and the
    /// error is returned, so the same notices are detected again next time.
    pub fn classify(&mut self, notices: Vec<Notice>) -> Result<Classification> {
        let classification = self.detect(&notices);

        if let Some(max_ordinal) = classification.max_new_ordinal() {
            let next = self.high_watermark.max(max_ordinal);
            self.persist(next)?;
            self.high_watermark = next;
            log::info!("Updated last notice number: {next}");
        }

        Ok(classification)
    }

    fn persist(&self, watermark: u64) -> Result<()> {
        let value = watermark.to_string();
        let attempts = self.persist_retries + 1;
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.store.set(&self.key, &value) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    log::warn!(
                        "Writing {} failed (attempt {}/{}): {}",
                        self.key,
                        attempt,
                        attempts,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e @ AppError::Persistence { .. }) => e,
            Some(e) => AppError::persistence(&self.key, e),
            None => AppError::persistence(&self.key, "no write attempted"),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::storage::MemoryStore;

    const KEY: &str = "last_notice_number";

    fn notice(id: usize, ordinal: u64) -> Notice {
        Notice::new(
            id,
            format!("Notice {id}"),
            Some(format!("https://mmmut.ac.in/News_content/{ordinal}.pdf")),
        )
    }

    fn notices(ordinals: &[u64]) -> Vec<Notice> {
        ordinals
            .iter()
            .enumerate()
            .map(|(i, &ord)| notice(i + 1, ord))
            .collect()
    }

    fn ordinals(notices: &[Notice]) -> Vec<u64> {
        notices
            .iter()
            .map(|n| notice_ordinal(n.link.as_deref()))
            .collect()
    }

    fn tracker_at(watermark: u64) -> (NoveltyTracker, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let tracker = NoveltyTracker::load(store.clone(), KEY, watermark).unwrap();
        (tracker, store)
    }

    /// Store whose first `failures` writes fail.
    struct FlakyStore {
        failures: Mutex<u32>,
        inner: MemoryStore,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                failures: Mutex::new(failures),
                inner: MemoryStore::new(),
            }
        }
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(AppError::persistence(key, "disk full"));
            }
            self.inner.set(key, value)
        }
    }

    #[test]
    fn test_seeds_default_when_store_empty() {
        let (tracker, _) = tracker_at(DEFAULT_WATERMARK);
        assert_eq!(tracker.watermark(), 150520258936);
        assert_eq!(tracker.scan_mode(), ScanMode::StopAtFirstSeen);
    }

    #[test]
    fn test_seeds_from_store() {
        let store = Arc::new(MemoryStore::with_value(KEY, "150520259000"));
        let tracker = NoveltyTracker::load(store, KEY, DEFAULT_WATERMARK).unwrap();
        assert_eq!(tracker.watermark(), 150520259000);
    }

    #[test]
    fn test_unparsable_stored_value_uses_default() {
        let store = Arc::new(MemoryStore::with_value(KEY, "NaN"));
        let tracker = NoveltyTracker::load(store, KEY, DEFAULT_WATERMARK).unwrap();
        assert_eq!(tracker.watermark(), DEFAULT_WATERMARK);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let (mut tracker, store) = tracker_at(DEFAULT_WATERMARK);
        let result = tracker
            .classify(notices(&[150520259100, 150520259050, 150520258900]))
            .unwrap();

        assert_eq!(ordinals(&result.new_notices), vec![150520259100, 150520259050]);
        assert!(result.new_notices.iter().all(|n| n.is_new));
        assert_eq!(
            result.notices.iter().map(|n| n.is_new).collect::<Vec<_>>(),
            vec![true, true, false]
        );
        assert_eq!(tracker.watermark(), 150520259100);
        assert_eq!(store.get(KEY).unwrap().as_deref(), Some("150520259100"));
    }

    #[test]
    fn test_stop_at_first_seen_drops_out_of_order_notice() {
        let (mut tracker, _) = tracker_at(100);
        let result = tracker.classify(notices(&[105, 103, 99, 150])).unwrap();

        assert_eq!(ordinals(&result.new_notices), vec![105, 103]);
        assert!(!result.notices[3].is_new);
        assert_eq!(tracker.watermark(), 105);
    }

    #[test]
    fn test_full_scan_keeps_out_of_order_notice() {
        let (tracker, _) = tracker_at(100);
        let mut tracker = tracker.with_scan_mode(ScanMode::FullScan);
        let result = tracker.classify(notices(&[105, 103, 99, 150])).unwrap();

        assert_eq!(ordinals(&result.new_notices), vec![105, 103, 150]);
        assert!(!result.notices[2].is_new);
        assert_eq!(tracker.watermark(), 150);
    }

    #[test]
    fn test_detect_is_idempotent() {
        let (tracker, store) = tracker_at(100);
        let input = notices(&[120, 110, 90]);

        let first = tracker.detect(&input);
        let second = tracker.detect(&input);

        assert_eq!(first, second);
        assert_eq!(tracker.watermark(), 100);
        assert!(store.get(KEY).unwrap().is_none());
    }

    #[test]
    fn test_watermark_is_monotonic() {
        let (mut tracker, store) = tracker_at(200);

        let result = tracker.classify(notices(&[150, 120])).unwrap();
        assert!(!result.has_new());
        assert_eq!(tracker.watermark(), 200);
        assert!(store.get(KEY).unwrap().is_none());

        let result = tracker.classify(notices(&[210, 205])).unwrap();
        assert_eq!(result.max_new_ordinal(), Some(210));
        assert_eq!(tracker.watermark(), 210);

        let result = tracker.classify(notices(&[210, 205])).unwrap();
        assert!(!result.has_new());
        assert_eq!(tracker.watermark(), 210);
    }

    #[test]
    fn test_unparsable_links_are_not_new() {
        let (mut tracker, _) = tracker_at(DEFAULT_WATERMARK);
        let mut input = vec![Notice::new(1, "No link", None)];
        input.push(Notice::new(2, "Bad link", Some("https://mmmut.ac.in/view".into())));

        let result = tracker.classify(input).unwrap();
        assert!(!result.has_new());
        assert_eq!(tracker.watermark(), DEFAULT_WATERMARK);
    }

    #[test]
    fn test_empty_input() {
        let (mut tracker, _) = tracker_at(1);
        let result = tracker.classify(Vec::new()).unwrap();
        assert!(result.notices.is_empty());
        assert!(!result.has_new());
    }

    #[test]
    fn test_persist_failure_keeps_watermark() {
        let store = Arc::new(FlakyStore::new(u32::MAX));
        let mut tracker = NoveltyTracker::load(store.clone(), KEY, 100)
            .unwrap()
            .with_persist_retries(2);

        let err = tracker.classify(notices(&[101])).unwrap_err();
        assert!(matches!(err, AppError::Persistence { .. }));
        assert_eq!(tracker.watermark(), 100);
        assert_eq!(*store.failures.lock().unwrap(), u32::MAX - 3);

        // Still new on the next attempt.
        assert!(tracker.detect(&notices(&[101])).has_new());
    }

    #[test]
    fn test_persist_retry_recovers() {
        let store = Arc::new(FlakyStore::new(1));
        let mut tracker = NoveltyTracker::load(store.clone(), KEY, 100)
            .unwrap()
            .with_persist_retries(1);

        let result = tracker.classify(notices(&[101])).unwrap();
        assert!(result.has_new());
        assert_eq!(tracker.watermark(), 101);
        assert_eq!(store.get(KEY).unwrap().as_deref(), Some("101"));
    }

    #[test]
    fn test_from_config() {
        let config = MonitorConfig {
            full_scan: true,
            initial_watermark: 7,
            ..MonitorConfig::default()
        };
        let tracker = NoveltyTracker::from_config(Arc::new(MemoryStore::new()), &config).unwrap();
        assert_eq!(tracker.scan_mode(), ScanMode::FullScan);
        assert_eq!(tracker.watermark(), 7);
    }
}
