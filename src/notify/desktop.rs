//! Desktop notification support.
//!
//! Uses `notify-send` on Linux and `osascript` on macOS. Delivery is best
//! effort: failures are logged, never propagated.

use std::process::Command;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::error::{AppError, Result};
use crate::models::Notice;
use crate::pipeline::NoticeObserver;

/// Titles listed in the body before it is cut short.
const MAX_LISTED: usize = 5;

type Sender = Arc<dyn Fn(&str, &str) -> std::result::Result<(), String> + Send + Sync>;

/// Observer that raises a native desktop notification.
///
/// The notifier process runs on the runtime's blocking pool, so the poll
/// that found the notices never waits for it.
#[derive(Clone)]
pub struct DesktopObserver {
    runtime: Handle,
    send: Sender,
}

impl DesktopObserver {
    /// Create a desktop observer. Must be called inside a tokio runtime.
    pub fn new() -> Result<Self> {
        Self::with_sender(send_desktop_notification)
    }

    /// Create an observer that delivers through `send` instead of the
    /// platform notifier.
    pub fn with_sender<F>(send: F) -> Result<Self>
    where
        F: Fn(&str, &str) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        let runtime = Handle::try_current()
            .map_err(|e| AppError::config(format!("desktop notifier needs a tokio runtime: {e}")))?;
        Ok(Self {
            runtime,
            send: Arc::new(send),
        })
    }

    /// Title and body for a batch of new notices.
    pub fn message(notices: &[Notice]) -> (String, String) {
        let title = match notices.len() {
            1 => "New examination notice".to_string(),
            n => format!("{n} new examination notices"),
        };

        let mut lines: Vec<String> = notices
            .iter()
            .take(MAX_LISTED)
            .map(|n| n.format("• {title}"))
            .collect();
        if notices.len() > MAX_LISTED {
            lines.push(format!("…and {} more", notices.len() - MAX_LISTED));
        }

        (title, lines.join("\n"))
    }
}

impl NoticeObserver for DesktopObserver {
    fn on_new_notices(&self, notices: &[Notice]) {
        let (title, body) = Self::message(notices);
        let send = Arc::clone(&self.send);
        self.runtime.spawn_blocking(move || {
            if let Err(e) = send(&title, &body) {
                log::warn!("Desktop notification failed: {e}");
            }
        });
    }
}

/// Send a desktop notification with the platform's tool.
pub fn send_desktop_notification(title: &str, body: &str) -> std::result::Result<(), String> {
    let output = if cfg!(target_os = "macos") {
        let script = format!(
            r#"display notification "{}" with title "{}""#,
            escape_applescript(body),
            escape_applescript(title)
        );
        Command::new("osascript").arg("-e").arg(&script).output()
    } else {
        Command::new("notify-send")
            .arg("--app-name=notice-monitor")
            .arg(title)
            .arg(body)
            .output()
    };

    let output = output.map_err(|e| format!("could not launch notifier: {e}"))?;
    if output.status.success() {
        Ok(())
    } else {
        Err(format!("notifier exited with: {}", output.status))
    }
}

fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
