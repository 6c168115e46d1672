//! Long-running mode: a cycle on a fixed schedule, plus one whenever the
//! trigger file shows up.

use crate::config::WatchSettings;
use crate::monitor::Monitor;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, instrument, warn};

/// Run cycles until `shutdown` resolves.
///
/// Cycles never overlap: a tick or trigger is only looked at after the
/// previous cycle returned, and ticks missed meanwhile are delayed rather
/// than replayed in a burst. `shutdown` is polled during a cycle as well, so
/// an interrupt abandons the cycle in flight instead of waiting for it.
#[instrument(level = "info", skip_all, fields(interval_secs = settings.interval_secs))]
pub async fn watch<F>(monitor: &Monitor, settings: &WatchSettings, shutdown: F)
where
    F: Future<Output = ()>,
{
    let mut schedule = interval(Duration::from_secs(settings.interval_secs.max(1)));
    schedule.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut trigger_poll = interval(Duration::from_secs(settings.trigger_poll_secs.max(1)));
    trigger_poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let trigger_file = settings.trigger_file.as_deref().map(Path::new);

    if let Some(path) = trigger_file {
        info!(path = %path.display(), "Watching trigger file");
    }

    tokio::pin!(shutdown);
    loop {
        let reason = tokio::select! {
            _ = schedule.tick() => Some("schedule"),
            _ = trigger_poll.tick(), if trigger_file.is_some() => match trigger_file {
                Some(path) if take_trigger(path).await => Some("trigger"),
                _ => None,
            },
            _ = &mut shutdown => {
                info!("Interrupted; stopping watch loop");
                return;
            }
        };
        let Some(reason) = reason else {
            continue;
        };

        tokio::select! {
            _ = run_logged(monitor, reason) => {}
            _ = &mut shutdown => {
                warn!(%reason, "Interrupted during a cycle; stopping watch loop");
                return;
            }
        }
    }
}

async fn run_logged(monitor: &Monitor, reason: &str) {
    info!(%reason, "Starting cycle");
    match monitor.run_cycle().await {
        Ok(report) => info!(%reason, inserted = report.inserted, "Cycle finished"),
        Err(e) => error!(%reason, error = %e, "Cycle failed; waiting for the next one"),
    }
}

/// Consume the trigger file. Returns whether a cycle was requested.
pub async fn take_trigger(path: &Path) -> bool {
    match tokio::fs::try_exists(path).await {
        Ok(true) => {}
        Ok(false) => return false,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not check trigger file");
            return false;
        }
    }
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(
            path = %path.display(),
            error = %e,
            "Could not remove trigger file; ignoring trigger"
        );
        return false;
    }
    info!(path = %path.display(), "Trigger file found");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchSettings;
    use crate::error::Result;
    use crate::models::NewsCandidate;
    use crate::outputs::ExportSink;
    use crate::scrapers::{ExtractorRegistry, PageExtractor, PageFetcher};
    use crate::store::Store;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{Notify, oneshot};

    /// Signals when a fetch starts, then hangs far longer than any test.
    #[derive(Clone)]
    struct StalledExtractor {
        started: Arc<Notify>,
    }

    #[async_trait]
    impl PageExtractor for StalledExtractor {
        fn media(&self) -> &str {
            "Stalled"
        }

        fn base_url(&self) -> &str {
            "https://stalled.example.com/"
        }

        async fn fetch(
            &self,
            _url: &str,
            _region: Option<&str>,
            _limit: usize,
        ) -> Vec<NewsCandidate> {
            self.started.notify_one();
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Vec::new()
        }
    }

    #[derive(Default)]
    struct CountingSink {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ExportSink for CountingSink {
        async fn export(&self, _store: &Store) -> Result<usize> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        }
    }

    fn settings() -> WatchSettings {
        WatchSettings {
            interval_secs: 3600,
            trigger_file: None,
            trigger_poll_secs: 1,
        }
    }

    fn monitor(store: Store, registry: ExtractorRegistry, sink: Arc<CountingSink>) -> Monitor {
        let fetcher = PageFetcher::new(&FetchSettings::default()).unwrap();
        Monitor::new(store, registry, fetcher, sink)
    }

    #[tokio::test]
    async fn test_interrupt_during_cycle_stops_watch() {
        let store = Store::in_memory().await.unwrap();
        store
            .add_source("https://stalled.example.com/", "Stalled", None, None)
            .await
            .unwrap();

        let started = Arc::new(Notify::new());
        let extractor = StalledExtractor {
            started: started.clone(),
        };
        let mut registry = ExtractorRegistry::new();
        registry.register("Stalled", move |_| Box::new(extractor.clone()));
        let sink = Arc::new(CountingSink::default());
        let monitor = monitor(store, registry, sink.clone());

        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            started.notified().await;
            let _ = tx.send(());
        });

        let stopped = tokio::time::timeout(
            Duration::from_secs(10),
            watch(&monitor, &settings(), async {
                let _ = rx.await;
            }),
        )
        .await;

        assert!(stopped.is_ok(), "watch kept waiting on the stalled cycle");
        // The cycle was abandoned before reaching the export step.
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_interrupt_between_cycles_stops_watch() {
        let store = Store::in_memory().await.unwrap();
        let sink = Arc::new(CountingSink::default());
        let monitor = monitor(store, ExtractorRegistry::new(), sink.clone());

        let stopped = tokio::time::timeout(
            Duration::from_secs(10),
            watch(&monitor, &settings(), async {
                tokio::time::sleep(Duration::from_millis(300)).await;
            }),
        )
        .await;

        assert!(stopped.is_ok());
        // Only the immediate first tick ran; the next one is an hour away.
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_trigger_file_requests_one_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let trigger = dir.path().join("run_now.flag");

        let store = Store::in_memory().await.unwrap();
        let sink = Arc::new(CountingSink::default());
        let monitor = monitor(store, ExtractorRegistry::new(), sink.clone());
        let settings = WatchSettings {
            trigger_file: Some(trigger.to_string_lossy().into_owned()),
            ..settings()
        };

        tokio::fs::write(&trigger, b"").await.unwrap();
        let stopped = tokio::time::timeout(
            Duration::from_secs(10),
            watch(&monitor, &settings, async {
                tokio::time::sleep(Duration::from_millis(2500)).await;
            }),
        )
        .await;

        assert!(stopped.is_ok());
        assert!(!trigger.exists());
        // The scheduled first tick plus the triggered cycle.
        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_take_trigger_consumes_file() {
        let dir = tempfile::tempdir().unwrap();
        let trigger = dir.path().join("run_now.flag");

        assert!(!take_trigger(&trigger).await);
        tokio::fs::write(&trigger, b"").await.unwrap();
        assert!(take_trigger(&trigger).await);
        assert!(!trigger.exists());
        assert!(!take_trigger(&trigger).await);
    }
}
