//! Observers for new notices, plus the subscription side channel.
//!
//! Each observer is an interchangeable [`NoticeObserver`] registered on the
//! monitor's registry.

mod console;
mod desktop;
mod subscribe;
mod webhook;

use std::sync::Arc;

pub use console::{ConsoleObserver, render_notices};
pub use desktop::{DesktopObserver, send_desktop_notification};
pub use subscribe::SubscriptionClient;
pub use webhook::{EmailWebhook, render_html};

use crate::error::Result;
use crate::models::Config;
use crate::pipeline::NoticeObserver;

/// Build the observers enabled in `[notify]`.
///
/// Must be called inside a tokio runtime when the desktop or webhook
/// observer is enabled.
pub fn observers_from_config(config: &Config) -> Result<Vec<Arc<dyn NoticeObserver>>> {
    let mut observers: Vec<Arc<dyn NoticeObserver>> = Vec::new();

    if config.notify.console {
        observers.push(Arc::new(ConsoleObserver));
    }
    if config.notify.desktop {
        observers.push(Arc::new(DesktopObserver::new()?));
    }
    if let Some(endpoint) = &config.notify.webhook_url {
        observers.push(Arc::new(EmailWebhook::new(
            &config.crawler,
            endpoint,
            config.notify.subject.clone(),
        )?));
    }

    Ok(observers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_console_only() {
        let observers = observers_from_config(&Config::default()).unwrap();
        assert_eq!(observers.len(), 1);
    }

    #[tokio::test]
    async fn test_all_observers_enabled() {
        let mut config = Config::default();
        config.notify.desktop = true;
        config.notify.webhook_url = Some("https://mail.example/send".to_string());

        let observers = observers_from_config(&config).unwrap();
        assert_eq!(observers.len(), 3);
    }
}
