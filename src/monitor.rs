//! The monitoring cycle.
//!
//! One cycle walks through these states:
//!
//! ```text
//! Idle -> LoadingConfig -> Expanding -> Dispatching -> Aggregating -> Exporting -> Idle
//! ```
//!
//! 1. **LoadingConfig**: read active sources and keywords in one snapshot
//! 2. **Expanding**: turn every source into fetch targets
//! 3. **Dispatching**: run extract, filter and persist per target, at most
//!    `concurrency` targets at a time, each in its own task
//! 4. **Aggregating**: fold per-target outcomes into a [`CycleReport`]
//! 5. **Exporting**: hand the store to the export sink
//!
//! Only a config load failure fails the cycle. A target that errors or
//! panics is logged and counted; its siblings carry on. An export failure is
//! logged and reported through [`CycleReport::exported`].

use crate::config::DEFAULT_CONCURRENCY;
use crate::error::{MonitorError, Result};
use crate::expander::expand;
use crate::filter::filter_by_keywords;
use crate::models::FetchTarget;
use crate::outputs::ExportSink;
use crate::scrapers::{ExtractorRegistry, PageFetcher};
use crate::store::{SaveReport, Store};
use crate::utils::truncate_for_log;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    LoadingConfig,
    Expanding,
    Dispatching,
    Aggregating,
    Exporting,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleState::Idle => "idle",
            CycleState::LoadingConfig => "loading_config",
            CycleState::Expanding => "expanding",
            CycleState::Dispatching => "dispatching",
            CycleState::Aggregating => "aggregating",
            CycleState::Exporting => "exporting",
        };
        f.write_str(name)
    }
}

/// Summary of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub targets: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Targets whose media has no registered extractor.
    pub skipped: usize,
    pub fetched: usize,
    /// Candidates left after keyword filtering.
    pub kept: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub exported: bool,
    pub elapsed_ms: u64,
}

/// What happened to a single target.
#[derive(Debug)]
enum TargetOutcome {
    Saved {
        fetched: usize,
        kept: usize,
        report: SaveReport,
    },
    Skipped,
    Failed,
}

pub struct Monitor {
    store: Store,
    registry: Arc<ExtractorRegistry>,
    fetcher: PageFetcher,
    sink: Arc<dyn ExportSink>,
    concurrency: usize,
    limit: usize,
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("registry", &self.registry)
            .field("concurrency", &self.concurrency)
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

impl Monitor {
    pub fn new(
        store: Store,
        registry: ExtractorRegistry,
        fetcher: PageFetcher,
        sink: Arc<dyn ExportSink>,
    ) -> Self {
        let limit = fetcher.settings().limit;
        Self {
            store,
            registry: Arc::new(registry),
            fetcher,
            sink,
            concurrency: DEFAULT_CONCURRENCY,
            limit,
        }
    }

    /// Maximum number of targets processed at once (at least 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Run one full cycle.
    ///
    /// # Errors
    ///
    /// [`MonitorError::ConfigLoad`] when active sources or keywords cannot be
    /// read. Nothing else fails the cycle.
    #[instrument(level = "info", skip_all, fields(concurrency = self.concurrency))]
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let started = Instant::now();
        let mut report = CycleReport::default();

        enter(CycleState::LoadingConfig);
        let (sources, keywords) = self.store.load_cycle_config().await.map_err(|e| {
            error!(error = %e, "Could not load sources and keywords; aborting cycle");
            MonitorError::ConfigLoad(e)
        })?;
        info!(
            sources = sources.len(),
            keywords = keywords.len(),
            "Loaded monitoring config"
        );

        enter(CycleState::Expanding);
        let targets: Vec<FetchTarget> = sources.iter().flat_map(expand).collect();
        report.targets = targets.len();
        info!(targets = targets.len(), "Expanded sources into targets");

        enter(CycleState::Dispatching);
        let keywords = Arc::new(keywords);
        let outcomes: Vec<TargetOutcome> = stream::iter(targets)
            .map(|target| {
                let media = target.media.clone();
                let region = target.region_label().to_string();
                let handle = tokio::spawn(run_target(
                    self.store.clone(),
                    Arc::clone(&self.registry),
                    self.fetcher.clone(),
                    target,
                    Arc::clone(&keywords),
                    self.limit,
                ));
                async move {
                    match handle.await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            error!(%media, %region, error = %e, "Target task panicked");
                            TargetOutcome::Failed
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        enter(CycleState::Aggregating);
        for outcome in outcomes {
            match outcome {
                TargetOutcome::Saved {
                    fetched,
                    kept,
                    report: saved,
                } => {
                    report.succeeded += 1;
                    report.fetched += fetched;
                    report.kept += kept;
                    report.inserted += saved.inserted;
                    report.duplicates += saved.duplicates;
                }
                TargetOutcome::Skipped => report.skipped += 1,
                TargetOutcome::Failed => report.failed += 1,
            }
        }

        enter(CycleState::Exporting);
        report.exported = match self.sink.export(&self.store).await {
            Ok(rows) => {
                debug!(rows, "Snapshot exported");
                true
            }
            Err(e) => {
                error!(error = %e, "Export failed; cycle result stands");
                false
            }
        };

        report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        enter(CycleState::Idle);
        info!(
            targets = report.targets,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            inserted = report.inserted,
            duplicates = report.duplicates,
            elapsed_ms = report.elapsed_ms,
            "Cycle complete"
        );
        Ok(report)
    }

    /// Export the snapshot without running a cycle.
    pub async fn export(&self) -> Result<usize> {
        self.sink.export(&self.store).await
    }
}

fn enter(state: CycleState) {
    info!(%state, "Cycle state");
}

/// Extract, filter and persist one target.
async fn run_target(
    store: Store,
    registry: Arc<ExtractorRegistry>,
    fetcher: PageFetcher,
    target: FetchTarget,
    keywords: Arc<Vec<String>>,
    limit: usize,
) -> TargetOutcome {
    let factory = match registry.resolve(&target.media) {
        Ok(factory) => factory,
        Err(e) => {
            error!(media = %target.media, url = %target.url, error = %e, "Skipping target");
            return TargetOutcome::Skipped;
        }
    };
    let extractor = factory(&fetcher);

    let candidates = extractor
        .fetch(&target.url, target.region.as_deref(), limit)
        .await;
    let fetched = candidates.len();
    let kept_candidates = filter_by_keywords(candidates, &keywords);
    let kept = kept_candidates.len();
    if let Some(first) = kept_candidates.first() {
        debug!(
            media = %target.media,
            title = %truncate_for_log(&first.title, 80),
            "First kept candidate"
        );
    }

    match store
        .save_candidates(
            kept_candidates,
            target.locality.as_deref(),
            target.region.as_deref(),
        )
        .await
    {
        Ok(saved) => {
            info!(
                media = %target.media,
                region = target.region_label(),
                fetched,
                kept,
                inserted = saved.inserted,
                duplicates = saved.duplicates,
                "Target done"
            );
            TargetOutcome::Saved {
                fetched,
                kept,
                report: saved,
            }
        }
        Err(e) => {
            error!(
                media = %target.media,
                region = target.region_label(),
                error = %e,
                "Saving articles failed"
            );
            TargetOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchSettings;
    use crate::models::NewsCandidate;
    use crate::scrapers::PageExtractor;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone)]
    struct StaticExtractor {
        media: &'static str,
        items: Vec<NewsCandidate>,
    }

    #[async_trait]
    impl PageExtractor for StaticExtractor {
        fn media(&self) -> &str {
            self.media
        }

        fn base_url(&self) -> &str {
            "https://example.com/"
        }

        async fn fetch(
            &self,
            _url: &str,
            _region: Option<&str>,
            limit: usize,
        ) -> Vec<NewsCandidate> {
            self.items.iter().take(limit).cloned().collect()
        }
    }

    struct PanickingExtractor;

    #[async_trait]
    impl PageExtractor for PanickingExtractor {
        fn media(&self) -> &str {
            "Broken"
        }

        fn base_url(&self) -> &str {
            "https://broken.example.com/"
        }

        async fn fetch(
            &self,
            _url: &str,
            _region: Option<&str>,
            _limit: usize,
        ) -> Vec<NewsCandidate> {
            panic!("extractor blew up");
        }
    }

    /// Closes the store's pool mid-cycle so the save step fails.
    struct PoolClosingExtractor {
        store: Store,
    }

    #[async_trait]
    impl PageExtractor for PoolClosingExtractor {
        fn media(&self) -> &str {
            "Closer"
        }

        fn base_url(&self) -> &str {
            "https://closer.example.com/"
        }

        async fn fetch(
            &self,
            _url: &str,
            _region: Option<&str>,
            _limit: usize,
        ) -> Vec<NewsCandidate> {
            self.store.pool().close().await;
            vec![NewsCandidate::new("Notícia perdida", "https://closer.example.com/1", "Closer")]
        }
    }

    struct CountingSink {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingSink {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl ExportSink for CountingSink {
        async fn export(&self, store: &Store) -> Result<usize> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(MonitorError::Export {
                    path: "/nowhere/news.csv".to_string(),
                    source: std::io::Error::other("disk full"),
                });
            }
            Ok(store.article_count().await? as usize)
        }
    }

    fn candidate(title: &str, url: &str) -> NewsCandidate {
        NewsCandidate::new(title, url, "Fake")
    }

    fn register_static(
        registry: &mut ExtractorRegistry,
        media: &'static str,
        items: Vec<NewsCandidate>,
    ) {
        let extractor = StaticExtractor { media, items };
        registry.register(media, move |_| Box::new(extractor.clone()));
    }

    fn monitor(store: &Store, registry: ExtractorRegistry, sink: Arc<CountingSink>) -> Monitor {
        let fetcher = PageFetcher::new(&FetchSettings::default()).unwrap();
        Monitor::new(store.clone(), registry, fetcher, sink).with_concurrency(3)
    }

    #[tokio::test]
    async fn test_cycle_filters_and_persists() {
        let store = Store::in_memory().await.unwrap();
        store
            .add_source("https://fake.example.com/", "Fake", Some("sp"), Some("Campinas"))
            .await
            .unwrap();
        store.add_keyword("Enchente").await.unwrap();

        let mut registry = ExtractorRegistry::new();
        register_static(
            &mut registry,
            "Fake",
            vec![
                candidate("Enchente em SP", "https://fake.example.com/1"),
                candidate("Festival de cinema", "https://fake.example.com/2"),
            ],
        );

        let sink = CountingSink::new(false);
        let report = monitor(&store, registry, sink.clone()).run_cycle().await.unwrap();

        assert_eq!(report.targets, 1);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.fetched, 2);
        assert_eq!(report.kept, 1);
        assert_eq!(report.inserted, 1);
        assert!(report.exported);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);

        let stored = store.articles_for_export().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].region.as_deref(), Some("SP"));
        assert_eq!(stored[0].locality.as_deref(), Some("Campinas"));
    }

    #[tokio::test]
    async fn test_failures_are_isolated_per_target() {
        let store = Store::in_memory().await.unwrap();
        store.add_source("https://broken.example.com/", "Broken", None, None).await.unwrap();
        store.add_source("https://empty.example.com/", "Empty", None, None).await.unwrap();
        store.add_source("https://unknown.example.com/", "Unknown", None, None).await.unwrap();
        store.add_source("https://fake.example.com/", "Fake", None, None).await.unwrap();

        let mut registry = ExtractorRegistry::new();
        registry.register("Broken", |_| Box::new(PanickingExtractor));
        register_static(&mut registry, "Empty", Vec::new());
        register_static(
            &mut registry,
            "Fake",
            vec![
                candidate("Primeira notícia", "https://fake.example.com/a"),
                candidate("Segunda notícia", "https://fake.example.com/b"),
            ],
        );

        let report = monitor(&store, registry, CountingSink::new(false))
            .run_cycle()
            .await
            .unwrap();

        assert_eq!(report.targets, 4);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.inserted, 2);
        assert_eq!(store.article_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_overlapping_targets_store_each_url_once() {
        let store = Store::in_memory().await.unwrap();
        for region in ["SP", "RJ", "MG", "BA"] {
            let url = format!("https://fake.example.com/{}", region.to_lowercase());
            store
                .add_source(&url, "Fake", Some(region), None)
                .await
                .unwrap();
        }

        let mut registry = ExtractorRegistry::new();
        register_static(
            &mut registry,
            "Fake",
            vec![candidate("Manchete nacional repetida", "https://fake.example.com/shared")],
        );

        let report = monitor(&store, registry, CountingSink::new(false))
            .run_cycle()
            .await
            .unwrap();

        assert_eq!(report.targets, 4);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.duplicates, 3);
        assert_eq!(store.article_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_export_failure_does_not_fail_cycle() {
        let store = Store::in_memory().await.unwrap();
        let sink = CountingSink::new(true);

        let report = monitor(&store, ExtractorRegistry::new(), sink.clone())
            .run_cycle()
            .await
            .unwrap();

        assert_eq!(report.targets, 0);
        assert!(!report.exported);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_save_failure_counts_as_failed_target() {
        let store = Store::in_memory().await.unwrap();
        store.add_source("https://closer.example.com/", "Closer", None, None).await.unwrap();

        let mut registry = ExtractorRegistry::new();
        let closing = store.clone();
        registry.register("Closer", move |_| {
            Box::new(PoolClosingExtractor {
                store: closing.clone(),
            })
        });

        let report = monitor(&store, registry, CountingSink::new(false))
            .run_cycle()
            .await
            .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.succeeded, 0);
        // The sink reads from the closed pool as well.
        assert!(!report.exported);
    }

    #[tokio::test]
    async fn test_config_load_failure_fails_cycle() {
        let store = Store::in_memory().await.unwrap();
        store.pool().close().await;
        let sink = CountingSink::new(false);

        let err = monitor(&store, ExtractorRegistry::new(), sink.clone())
            .run_cycle()
            .await
            .unwrap_err();

        assert!(matches!(err, MonitorError::ConfigLoad(_)));
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cycle_state_names() {
        assert_eq!(CycleState::LoadingConfig.to_string(), "loading_config");
        assert_eq!(CycleState::Idle.to_string(), "idle");
    }
}
