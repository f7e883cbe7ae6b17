//! Periodic notice monitoring.
//!
//! Each poll runs fetch → extract → classify → notify. The loop never gives
//! up: fetch failures become empty polls, and persistence failures are
//! logged and retried on the next tick.
//!
//! ## Cancellation
//!
//! Every `start`/`stop` bumps a generation counter. A poll remembers the
//! generation it was started under and, after its fetch completes, checks
//! it again under the state lock before classifying. `stop` takes the same
//! lock, so once it returns no stale poll can touch the watermark or reach
//! the observers.

use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::Result;
use crate::models::Config;
use crate::pipeline::observers::{NoticeObserver, ObserverRegistry, Subscription};
use crate::pipeline::tracker::{Classification, NoveltyTracker};
use crate::services::{HtmlFetcher, NoticeExtractor};
use crate::storage::KeyValueStore;

/// Lifecycle state of the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Running { interval: Duration },
}

/// Counters accumulated across polls.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct PollStats {
    pub polls: u64,
    pub fetch_failures: u64,
    pub persist_failures: u64,
    pub notices_delivered: u64,
}

struct Ticker {
    interval: Duration,
    task: JoinHandle<()>,
}

struct PollState {
    generation: u64,
    tracker: NoveltyTracker,
    ticker: Option<Ticker>,
    stats: PollStats,
}

impl PollState {
    /// Invalidate in-flight polls and cancel the timer.
    fn retire(&mut self) -> u64 {
        self.generation += 1;
        if let Some(ticker) = self.ticker.take() {
            ticker.task.abort();
            log::info!("Stopped notice monitoring");
        }
        self.generation
    }
}

struct Inner {
    fetcher: Arc<dyn HtmlFetcher>,
    extractor: NoticeExtractor,
    fetch_url: String,
    observers: ObserverRegistry,
    state: Mutex<PollState>,
}

/// Polls the notice page and reports new notices to observers.
///
/// Cloning yields another handle to the same monitor.
#[derive(Clone)]
pub struct NoticeMonitor {
    inner: Arc<Inner>,
}

impl NoticeMonitor {
    pub fn new(
        fetcher: Arc<dyn HtmlFetcher>,
        extractor: NoticeExtractor,
        tracker: NoveltyTracker,
        fetch_url: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                extractor,
                fetch_url: fetch_url.into(),
                observers: ObserverRegistry::new(),
                state: Mutex::new(PollState {
                    generation: 0,
                    tracker,
                    ticker: None,
                    stats: PollStats::default(),
                }),
            }),
        }
    }

    /// Wire a monitor from configuration.
    pub fn from_config(
        config: &Config,
        fetcher: Arc<dyn HtmlFetcher>,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        let extractor = NoticeExtractor::from_config(&config.source)?;
        let tracker = NoveltyTracker::from_config(store, &config.monitor)?;
        Ok(Self::new(
            fetcher,
            extractor,
            tracker,
            config.source.fetch_url(),
        ))
    }

    pub fn observers(&self) -> &ObserverRegistry {
        &self.inner.observers
    }

    /// Register an observer for new notices.
    pub fn subscribe(&self, observer: Arc<dyn NoticeObserver>) -> Subscription {
        self.inner.observers.subscribe(observer)
    }

    /// Start polling every `interval`.
    ///
    /// Any running cadence is cancelled first. One poll runs immediately,
    /// before this returns; the timer fires from `interval` later on.
    pub async fn start(&self, interval: Duration) -> MonitorHandle {
        let interval = interval.max(Duration::from_millis(1));
        let generation = self.inner.state.lock().await.retire();

        log::info!("Starting notice monitoring every {:?}", interval);

        match self.poll(generation).await {
            Ok(Some(result)) => log::info!("Initial notices fetched: {}", result.notices.len()),
            Ok(None) => {}
            Err(e) => log::error!("Initial poll failed: {}", e),
        }

        let mut state = self.inner.state.lock().await;
        if state.generation == generation {
            let weak = Arc::downgrade(&self.inner);
            let task = tokio::spawn(run_ticker(weak, generation, interval));
            state.ticker = Some(Ticker { interval, task });
        } else {
            log::debug!("Monitoring was stopped during the initial poll");
        }

        MonitorHandle {
            monitor: self.clone(),
            generation,
        }
    }

    /// Stop polling. Safe to call repeatedly.
    pub async fn stop(&self) {
        self.inner.state.lock().await.retire();
    }

    /// Run one poll now, outside the timer.
    ///
    /// Fetch failures yield an empty classification; persistence failures
    /// are returned.
    pub async fn poll_now(&self) -> Result<Classification> {
        let generation = self.inner.state.lock().await.generation;
        Ok(self.poll(generation).await?.unwrap_or_default())
    }

    pub async fn state(&self) -> MonitorState {
        match &self.inner.state.lock().await.ticker {
            Some(ticker) if !ticker.task.is_finished() => MonitorState::Running {
                interval: ticker.interval,
            },
            _ => MonitorState::Idle,
        }
    }

    /// Current watermark.
    pub async fn watermark(&self) -> u64 {
        self.inner.state.lock().await.tracker.watermark()
    }

    pub async fn stats(&self) -> PollStats {
        self.inner.state.lock().await.stats
    }

    /// One poll under `generation`; `Ok(None)` if it went stale.
    async fn poll(&self, generation: u64) -> Result<Option<Classification>> {
        let fetched = self.inner.fetcher.fetch(&self.inner.fetch_url).await;
        let notices = fetched.map(|html| self.inner.extractor.extract(&html));

        let mut state = self.inner.state.lock().await;
        if state.generation != generation {
            log::debug!("Discarding poll from stopped generation {}", generation);
            return Ok(None);
        }
        state.stats.polls += 1;

        let notices = match notices {
            Ok(notices) => notices,
            Err(e) => {
                state.stats.fetch_failures += 1;
                log::warn!("Error fetching notices: {}", e);
                return Ok(Some(Classification::default()));
            }
        };

        let result = match state.tracker.classify(notices) {
            Ok(result) => result,
            Err(e) => {
                state.stats.persist_failures += 1;
                return Err(e);
            }
        };

        if result.has_new() {
            log::info!("New notices found: {}", result.new_notices.len());
            self.inner.observers.notify(&result.new_notices);
            state.stats.notices_delivered += result.new_notices.len() as u64;
        }

        Ok(Some(result))
    }
}

async fn run_ticker(monitor: Weak<Inner>, generation: u64, interval: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let Some(inner) = monitor.upgrade() else {
            break;
        };
        let monitor = NoticeMonitor { inner };

        log::debug!("Checking for new notices...");
        match monitor.poll(generation).await {
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(e) => log::error!("Poll failed, will retry next tick: {}", e),
        }
    }
}

/// Cancellation handle returned by [`NoticeMonitor::start`].
pub struct MonitorHandle {
    monitor: NoticeMonitor,
    generation: u64,
}

impl MonitorHandle {
    /// Stop the cadence this handle started.
    ///
    /// Does nothing if the monitor has since been stopped or restarted.
    pub async fn stop(&self) {
        let mut state = self.monitor.inner.state.lock().await;
        if state.generation == self.generation {
            state.retire();
        }
    }

    pub fn monitor(&self) -> &NoticeMonitor {
        &self.monitor
    }
}
