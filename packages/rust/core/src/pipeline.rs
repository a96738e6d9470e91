//! End-to-end pipeline: document → segment → extract → enrich → tag →
//! persist.
//!
//! Phases run strictly in sequence; a phase failure aborts the run. Within
//! the enrichment and tagging phases each place is isolated: one place's
//! failure is recorded on that place and the run continues. The refresh
//! decision for every place is computed once, before the enrichment loop,
//! as an explicit [`RefreshDecision`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use placebook_enrich::{Enricher, EnricherOptions, PlaceLookup};
use placebook_extract::extract_places;
use placebook_model::CompletionBackend;
use placebook_shared::{
    Catalog, CatalogMetadata, EnrichmentStats, EnrichmentStatus, PARSER_VERSION, Place,
    PlacebookError, Result,
};
use placebook_store::{CatalogStore, backup_key, snapshot_key};
use placebook_tags::synthesize;

use crate::source::DocumentSource;

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Document identifier passed to the document source.
    pub document_id: String,
    /// Free-text location disambiguator (e.g. a region name), used verbatim
    /// in prompts and lookup queries.
    pub location_context: String,
    /// Force every place through enrichment regardless of prior status.
    pub full_refresh: bool,
    /// Version stamp for `enrichmentStatus`; a mismatch makes a place stale.
    pub enrichment_version: String,
    /// Storage key for the latest catalog.
    pub catalog_key: String,
    /// Fixed delay between outbound lookup calls.
    pub rate_limit: Duration,
    /// Maximum search results requested per lookup query.
    pub max_results: u8,
}

/// Aggregate outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub total_places: usize,
    pub enriched_places: usize,
    pub skipped_places: usize,
    pub failed_places: usize,
    /// Outbound lookup calls made (search + details).
    pub lookup_calls: usize,
    pub catalog_key: String,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Segmenting,
    Extracting,
    Enriching,
    Tagging,
    Persisting,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Segmenting => "segmenting",
            Self::Extracting => "extracting",
            Self::Enriching => "enriching",
            Self::Tagging => "tagging",
            Self::Persisting => "persisting",
        };
        f.write_str(name)
    }
}

/// One progress event emitted during a run.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a phase or on a notable step within it.
    fn event(&self, event: &ProgressEvent);
    /// Per-place progress within the enrichment and tagging phases.
    fn place_progress(&self, current: usize, total: usize, detail: &str);
    /// Called once when the run completes successfully.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn event(&self, _event: &ProgressEvent) {}
    fn place_progress(&self, _current: usize, _total: usize, _detail: &str) {}
    fn done(&self, _summary: &RunSummary) {}
}

// ---------------------------------------------------------------------------
// Refresh decision
// ---------------------------------------------------------------------------

/// Why a place does or does not go through enrichment this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshDecision {
    /// Prior entity is current; carry it forward unchanged.
    Skip,
    /// No usable prior enrichment exists.
    Fresh,
    /// Prior enrichment was produced under a different version.
    StaleVersion,
    /// Full refresh requested by the caller.
    Forced,
}

impl RefreshDecision {
    /// Compute the decision for one place against the previously stored
    /// catalog. This is the pipeline's primary cost control: re-running on
    /// an unchanged document performs zero lookup calls.
    pub fn decide(prior: Option<&Place>, version: &str, full_refresh: bool) -> Self {
        if full_refresh {
            return Self::Forced;
        }
        let Some(prior) = prior else {
            return Self::Fresh;
        };
        if !prior.enrichment_status.enriched {
            return Self::Fresh;
        }
        if prior.enrichment_status.enrichment_version.as_deref() != Some(version) {
            return Self::StaleVersion;
        }
        Self::Skip
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// The pipeline orchestrator. Holds the external collaborators; each call
/// to [`Pipeline::run`] is one isolated run with its own enrichment cache.
pub struct Pipeline {
    source: Arc<dyn DocumentSource>,
    model: Arc<dyn CompletionBackend>,
    lookup: Arc<dyn PlaceLookup>,
    store: Arc<dyn CatalogStore>,
    config: RunConfig,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        model: Arc<dyn CompletionBackend>,
        lookup: Arc<dyn PlaceLookup>,
        store: Arc<dyn CatalogStore>,
        config: RunConfig,
    ) -> Self {
        Self {
            source,
            model,
            lookup,
            store,
            config,
        }
    }

    /// Run the full pipeline and return the persisted catalog.
    #[instrument(skip_all, fields(document = %self.config.document_id, full_refresh = self.config.full_refresh))]
    pub async fn run(&self, progress: &dyn ProgressReporter) -> Result<Catalog> {
        let start = Instant::now();

        // --- Fetch & segment ---
        self.report(progress, Phase::Segmenting, "Fetching source document");
        let document = self.source.fetch(&self.config.document_id).await?;
        info!(title = %document.title, revision = %document.revision_id, "document fetched");

        self.report(progress, Phase::Segmenting, "Segmenting document");
        let sections = placebook_segment::segment(&document.content);

        // --- Previous catalog for skip decisions ---
        let prior_by_id = self.load_previous().await;

        // --- Extract ---
        self.report(progress, Phase::Extracting, "Extracting place candidates");
        let mut places = extract_places(
            self.model.as_ref(),
            &sections,
            &self.config.location_context,
        )
        .await?;
        info!(count = places.len(), "places extracted");

        // One decision per place, computed before any enrichment branching.
        let decisions: Vec<RefreshDecision> = places
            .iter()
            .map(|place| {
                RefreshDecision::decide(
                    prior_by_id.get(&place.id),
                    &self.config.enrichment_version,
                    self.config.full_refresh,
                )
            })
            .collect();

        // --- Enrich ---
        self.report(progress, Phase::Enriching, "Enriching places");
        let mut enricher = Enricher::new(
            self.lookup.clone(),
            EnricherOptions {
                location_context: self.config.location_context.clone(),
                enrichment_version: self.config.enrichment_version.clone(),
                rate_limit: self.config.rate_limit,
                max_results: self.config.max_results,
            },
        );

        let mut stats = EnrichmentStats::default();
        let total = places.len();

        for (i, (place, decision)) in places.iter_mut().zip(&decisions).enumerate() {
            progress.place_progress(i + 1, total, &place.name);

            if *decision == RefreshDecision::Skip {
                if let Some(prior) = prior_by_id.get(&place.id) {
                    *place = prior.clone();
                    stats.skipped_places += 1;
                    continue;
                }
            }

            match enricher.enrich(place).await {
                Ok(()) if place.enrichment_status.enriched => stats.enriched_places += 1,
                Ok(()) => stats.failed_places += 1,
                Err(e) => {
                    warn!(place = %place.id, error = %e, "enrichment failed");
                    place.enrichment_status = EnrichmentStatus::failed(
                        &self.config.enrichment_version,
                        e.to_string(),
                    );
                    stats.failed_places += 1;
                }
            }
        }

        let attempted = total - stats.skipped_places;
        if attempted > 0 && stats.failed_places * 2 > attempted {
            warn!(
                failed = stats.failed_places,
                attempted,
                "more than half of attempted enrichments failed"
            );
        }

        // --- Tag ---
        self.report(progress, Phase::Tagging, "Synthesizing tags");
        for (i, (place, decision)) in places.iter_mut().zip(&decisions).enumerate() {
            progress.place_progress(i + 1, total, &place.name);

            // Carried-forward places keep their tags; absent tags are still
            // synthesized so additive improvements don't require a refresh.
            if *decision == RefreshDecision::Skip && !place.tags.is_empty() {
                continue;
            }

            let outcome = synthesize(self.model.as_ref(), place).await;
            place.tags = outcome.tags;
            if let Some(hours) = outcome.hours {
                place.hours = Some(hours);
            }
        }

        // --- Build & validate catalog ---
        let catalog = self.build_catalog(&document.id, &document.title, places, stats);
        for issue in catalog.validate() {
            warn!(%issue, "catalog validation issue");
        }

        // --- Persist ---
        self.report(progress, Phase::Persisting, "Persisting catalog");
        self.persist(&catalog).await?;

        let summary = RunSummary {
            total_places: catalog.places.len(),
            enriched_places: stats.enriched_places,
            skipped_places: stats.skipped_places,
            failed_places: stats.failed_places,
            lookup_calls: enricher.lookup_calls(),
            catalog_key: self.config.catalog_key.clone(),
            elapsed: start.elapsed(),
        };
        progress.done(&summary);

        info!(
            total = summary.total_places,
            enriched = summary.enriched_places,
            skipped = summary.skipped_places,
            failed = summary.failed_places,
            lookup_calls = summary.lookup_calls,
            elapsed_ms = summary.elapsed.as_millis(),
            "pipeline run complete"
        );

        Ok(catalog)
    }

    fn report(&self, progress: &dyn ProgressReporter, phase: Phase, message: &str) {
        progress.event(&ProgressEvent {
            phase,
            message: message.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Load the previously stored catalog, keyed by place id. Any load
    /// problem means no skip decisions are possible, not a failed run.
    async fn load_previous(&self) -> HashMap<String, Place> {
        let data = match self.store.download(&self.config.catalog_key).await {
            Ok(Some(data)) => data,
            Ok(None) => return HashMap::new(),
            Err(e) => {
                warn!(error = %e, "could not load previous catalog, treating as absent");
                return HashMap::new();
            }
        };

        match serde_json::from_slice::<Catalog>(&data) {
            Ok(catalog) => catalog
                .places
                .into_iter()
                .map(|place| (place.id.clone(), place))
                .collect(),
            Err(e) => {
                warn!(error = %e, "previous catalog is unreadable, treating as absent");
                HashMap::new()
            }
        }
    }

    fn build_catalog(
        &self,
        source_id: &str,
        source_title: &str,
        places: Vec<Place>,
        stats: EnrichmentStats,
    ) -> Catalog {
        let mut categories: Vec<String> = Vec::new();
        for place in &places {
            if !categories.contains(&place.category) {
                categories.push(place.category.clone());
            }
        }

        Catalog {
            metadata: CatalogMetadata {
                generated_at: Utc::now(),
                source_id: source_id.to_string(),
                source_title: source_title.to_string(),
                total_places: places.len(),
                categories,
                enrichment_stats: stats,
                parser_version: PARSER_VERSION.to_string(),
            },
            places,
        }
    }

    /// Persist with the backup-before-overwrite discipline plus the
    /// always-on snapshot of this run's output.
    async fn persist(&self, catalog: &Catalog) -> Result<()> {
        let payload = serde_json::to_vec_pretty(catalog)
            .map_err(|e| PlacebookError::Persistence(format!("serialize catalog: {e}")))?;

        let now_ms = Utc::now().timestamp_millis();
        let key = &self.config.catalog_key;

        if let Some(existing) = self.store.download(key).await? {
            let backup = backup_key(key, now_ms);
            self.store.upload(&backup, &existing).await?;
            info!(key = %backup, "previous catalog backed up");
        }

        self.store.upload(key, &payload).await?;
        self.store
            .upload(&snapshot_key(key, now_ms), &payload)
            .await?;

        info!(key = %key, bytes = payload.len(), "catalog persisted");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use placebook_enrich::{PlaceDetails, SearchHit};
    use placebook_model::MockCompletion;
    use placebook_shared::SourceConfidence;
    use placebook_store::LocalStore;
    use std::sync::Mutex;

    use crate::source::SourceDocument;

    const GUIDE: &str = "\
## Restaurants & Food

**Blue Moon Cafe** - https://bluemooncafe.com
Amazing breakfast spot on the harbor!

## Things To Do

**Lighthouse Tour** - great at sunset.
";

    // -- collaborator doubles ------------------------------------------------

    struct StaticSource(String);

    #[async_trait]
    impl DocumentSource for StaticSource {
        async fn fetch(&self, id: &str) -> Result<SourceDocument> {
            Ok(SourceDocument {
                id: id.to_string(),
                title: "Test Guide".into(),
                content: self.0.clone(),
                revision_id: "rev-1".into(),
            })
        }
    }

    #[derive(Default)]
    struct ScriptedLookup {
        fail_search: bool,
        search_calls: Mutex<usize>,
        detail_calls: Mutex<usize>,
    }

    impl ScriptedLookup {
        fn total_calls(&self) -> usize {
            *self.search_calls.lock().unwrap() + *self.detail_calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl PlaceLookup for ScriptedLookup {
        async fn search(&self, query: &str, _max: u8) -> Result<Vec<SearchHit>> {
            *self.search_calls.lock().unwrap() += 1;
            if self.fail_search {
                return Err(PlacebookError::Enrichment("quota exceeded".into()));
            }
            Ok(vec![SearchHit {
                external_id: format!("ext-{}", query.len()),
                name: query.split(' ').next().unwrap_or("").to_string(),
                address: Some("1 Harbor St".into()),
                rating: Some(4.5),
                price_tier: Some("PRICE_LEVEL_MODERATE".into()),
                types: vec!["cafe".into()],
            }])
        }

        async fn details(&self, external_id: &str) -> Result<PlaceDetails> {
            *self.detail_calls.lock().unwrap() += 1;
            Ok(PlaceDetails {
                external_id: external_id.to_string(),
                name: None,
                address: Some("1 Harbor Street".into()),
                phone: Some("(920) 555-0101".into()),
                website: Some("https://example.com".into()),
                rating: Some(4.6),
                price_tier: Some("PRICE_LEVEL_MODERATE".into()),
                types: vec!["cafe".into(), "restaurant".into()],
                coordinates: None,
                weekday_hours: vec![],
            })
        }
    }

    fn extraction_json() -> String {
        r#"[
            {"name": "Blue Moon Cafe", "type": "dining",
             "description": "Amazing breakfast spot",
             "origText": "**Blue Moon Cafe** - https://bluemooncafe.com\nAmazing breakfast spot on the harbor!",
             "category": "Restaurants & Food"},
            {"name": "Lighthouse Tour", "type": "activity",
             "origText": "**Lighthouse Tour** - great at sunset.",
             "category": "Things To Do"}
        ]"#
        .to_string()
    }

    fn tag_json() -> String {
        r#"["cafe", "harbor view"]"#.to_string()
    }

    fn run_config() -> RunConfig {
        RunConfig {
            document_id: "guide-1".into(),
            location_context: "Door County".into(),
            full_refresh: false,
            enrichment_version: "2.0".into(),
            catalog_key: "catalog.json".into(),
            rate_limit: Duration::ZERO,
            max_results: 5,
        }
    }

    fn pipeline_with(
        model: Arc<dyn CompletionBackend>,
        lookup: Arc<ScriptedLookup>,
        store: Arc<LocalStore>,
        config: RunConfig,
    ) -> Pipeline {
        Pipeline::new(
            Arc::new(StaticSource(GUIDE.into())),
            model,
            lookup,
            store,
            config,
        )
    }

    fn list_files(root: &std::path::Path) -> Vec<String> {
        let mut files = Vec::new();
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            for entry in std::fs::read_dir(&dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    files.push(
                        path.strip_prefix(root)
                            .unwrap()
                            .to_string_lossy()
                            .to_string(),
                    );
                }
            }
        }
        files.sort();
        files
    }

    // -- tests ---------------------------------------------------------------

    #[tokio::test]
    async fn first_run_extracts_enriches_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::new(dir.path()));
        let lookup = Arc::new(ScriptedLookup::default());
        let model = Arc::new(MockCompletion::new(vec![
            Ok(extraction_json()),
            Ok(tag_json()),
            Ok(tag_json()),
        ]));

        let pipeline = pipeline_with(model, lookup.clone(), store.clone(), run_config());
        let catalog = pipeline.run(&SilentProgress).await.unwrap();

        assert_eq!(catalog.places.len(), 2);
        assert_eq!(catalog.metadata.enrichment_stats.enriched_places, 2);
        assert_eq!(catalog.metadata.enrichment_stats.skipped_places, 0);
        assert_eq!(
            catalog.metadata.categories,
            vec!["Restaurants & Food", "Things To Do"]
        );

        let cafe = &catalog.places[0];
        assert_eq!(cafe.id, "blue-moon-cafe");
        assert_eq!(cafe.address.as_deref(), Some("1 Harbor Street"));
        assert_eq!(
            cafe.enrichment_status.source_confidence,
            Some(SourceConfidence::High)
        );
        assert_eq!(cafe.tags, vec!["cafe", "harbor view"]);

        // Latest key and snapshot both written, no backup on first run.
        let files = list_files(dir.path());
        assert!(files.contains(&"catalog.json".to_string()));
        assert!(files.iter().any(|f| f.starts_with("snapshots/")));
        assert_eq!(files.len(), 2);
    }

    #[tokio::test]
    async fn second_run_skips_enrichment_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::new(dir.path()));
        let lookup = Arc::new(ScriptedLookup::default());
        let model = Arc::new(MockCompletion::new(vec![
            Ok(extraction_json()),
            Ok(tag_json()),
            Ok(tag_json()),
            // Second run: extraction only; tags are carried forward.
            Ok(extraction_json()),
        ]));

        let pipeline = pipeline_with(model, lookup.clone(), store.clone(), run_config());
        let first = pipeline.run(&SilentProgress).await.unwrap();
        let calls_after_first = lookup.total_calls();

        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = pipeline.run(&SilentProgress).await.unwrap();

        // Idempotence: zero lookup calls on the unchanged document.
        assert_eq!(lookup.total_calls(), calls_after_first);
        assert_eq!(second.metadata.enrichment_stats.skipped_places, 2);
        assert_eq!(second.metadata.enrichment_stats.enriched_places, 0);
        assert_eq!(second.places, first.places);
    }

    #[tokio::test]
    async fn full_refresh_forces_re_enrichment() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::new(dir.path()));
        let lookup = Arc::new(ScriptedLookup::default());
        let model = Arc::new(MockCompletion::new(vec![
            Ok(extraction_json()),
            Ok(tag_json()),
            Ok(tag_json()),
            Ok(extraction_json()),
            Ok(tag_json()),
            Ok(tag_json()),
        ]));

        let pipeline = pipeline_with(
            model.clone(),
            lookup.clone(),
            store.clone(),
            run_config(),
        );
        pipeline.run(&SilentProgress).await.unwrap();
        let calls_after_first = lookup.total_calls();

        let mut config = run_config();
        config.full_refresh = true;
        let refresh_pipeline = pipeline_with(model, lookup.clone(), store, config);
        tokio::time::sleep(Duration::from_millis(5)).await;
        let catalog = refresh_pipeline.run(&SilentProgress).await.unwrap();

        assert!(lookup.total_calls() > calls_after_first);
        assert_eq!(catalog.metadata.enrichment_stats.enriched_places, 2);
        assert_eq!(catalog.metadata.enrichment_stats.skipped_places, 0);
    }

    #[tokio::test]
    async fn every_overwrite_leaves_exactly_one_backup() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::new(dir.path()));
        let lookup = Arc::new(ScriptedLookup::default());
        let model = Arc::new(MockCompletion::new(vec![
            Ok(extraction_json()),
            Ok(tag_json()),
            Ok(tag_json()),
            Ok(extraction_json()),
            Ok(extraction_json()),
        ]));

        let pipeline = pipeline_with(model, lookup, store, run_config());
        pipeline.run(&SilentProgress).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        pipeline.run(&SilentProgress).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        pipeline.run(&SilentProgress).await.unwrap();

        let files = list_files(dir.path());
        let backups: Vec<_> = files
            .iter()
            .filter(|f| f.starts_with("catalog-") && f.ends_with(".json"))
            .collect();
        let snapshots: Vec<_> = files
            .iter()
            .filter(|f| f.starts_with("snapshots/"))
            .collect();

        // Three runs: two overwrites, so two backups; one snapshot per run.
        assert_eq!(backups.len(), 2);
        assert_eq!(snapshots.len(), 3);
    }

    #[tokio::test]
    async fn extraction_failure_aborts_without_persisting() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::new(dir.path()));
        let lookup = Arc::new(ScriptedLookup::default());
        let model = Arc::new(MockCompletion::new(vec![Ok("[]".into())]));

        let pipeline = pipeline_with(model, lookup, store.clone(), run_config());
        let err = pipeline.run(&SilentProgress).await.unwrap_err();

        assert!(matches!(err, PlacebookError::Extraction(_)));
        assert!(!store.exists("catalog.json").await.unwrap());
    }

    #[tokio::test]
    async fn per_place_failures_do_not_abort_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::new(dir.path()));
        let lookup = Arc::new(ScriptedLookup {
            fail_search: true,
            ..Default::default()
        });
        let model = Arc::new(MockCompletion::new(vec![
            Ok(extraction_json()),
            Ok(tag_json()),
            Ok(tag_json()),
        ]));

        let pipeline = pipeline_with(model, lookup, store.clone(), run_config());
        let catalog = pipeline.run(&SilentProgress).await.unwrap();

        assert_eq!(catalog.metadata.enrichment_stats.failed_places, 2);
        assert_eq!(catalog.metadata.enrichment_stats.enriched_places, 0);
        for place in &catalog.places {
            assert!(!place.enrichment_status.enriched);
            assert!(place.enrichment_status.reason.is_some());
        }
        // The run still persisted its extraction work.
        assert!(store.exists("catalog.json").await.unwrap());
    }

    #[tokio::test]
    async fn skipped_place_with_no_tags_is_retagged() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::new(dir.path()));
        let lookup = Arc::new(ScriptedLookup::default());

        // Seed a prior catalog: both places enriched under the current
        // version, but the cafe has no tags (e.g. written by an older run).
        let mut cafe = Place::extracted(
            "Blue Moon Cafe",
            "**Blue Moon Cafe** - https://bluemooncafe.com\nAmazing breakfast spot on the harbor!",
            "Restaurants & Food",
        );
        cafe.id = "blue-moon-cafe".into();
        cafe.enrichment_status = EnrichmentStatus::enriched("2.0", SourceConfidence::High);
        let mut tour = Place::extracted(
            "Lighthouse Tour",
            "**Lighthouse Tour** - great at sunset.",
            "Things To Do",
        );
        tour.id = "lighthouse-tour".into();
        tour.enrichment_status = EnrichmentStatus::enriched("2.0", SourceConfidence::High);
        tour.tags = vec!["tour".into()];

        let prior = Catalog {
            metadata: CatalogMetadata {
                generated_at: Utc::now(),
                source_id: "guide-1".into(),
                source_title: "Test Guide".into(),
                total_places: 2,
                categories: vec!["Restaurants & Food".into(), "Things To Do".into()],
                enrichment_stats: EnrichmentStats::default(),
                parser_version: PARSER_VERSION.into(),
            },
            places: vec![cafe, tour],
        };
        store
            .upload("catalog.json", &serde_json::to_vec(&prior).unwrap())
            .await
            .unwrap();

        // Extraction, then exactly one tag call for the tagless cafe.
        let model = Arc::new(MockCompletion::new(vec![
            Ok(extraction_json()),
            Ok(tag_json()),
        ]));
        let mock = model.clone();

        let pipeline = pipeline_with(model, lookup.clone(), store, run_config());
        let catalog = pipeline.run(&SilentProgress).await.unwrap();

        // Both places skipped enrichment; only the tagless one was retagged.
        assert_eq!(lookup.total_calls(), 0);
        assert_eq!(catalog.metadata.enrichment_stats.skipped_places, 2);
        assert_eq!(mock.call_count(), 2);
        assert_eq!(catalog.places[0].tags, vec!["cafe", "harbor view"]);
        assert_eq!(catalog.places[1].tags, vec!["tour"]);
    }

    #[tokio::test]
    async fn protected_fields_survive_enrich_and_tag() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::new(dir.path()));
        let lookup = Arc::new(ScriptedLookup::default());
        let model = Arc::new(MockCompletion::new(vec![
            Ok(extraction_json()),
            Ok(tag_json()),
            Ok(tag_json()),
        ]));

        let pipeline = pipeline_with(model, lookup, store, run_config());
        let catalog = pipeline.run(&SilentProgress).await.unwrap();

        let cafe = &catalog.places[0];
        assert_eq!(cafe.name, "Blue Moon Cafe");
        assert_eq!(cafe.category, "Restaurants & Food");
        assert_eq!(
            cafe.orig_text,
            "**Blue Moon Cafe** - https://bluemooncafe.com\nAmazing breakfast spot on the harbor!"
        );
        assert_eq!(cafe.id, "blue-moon-cafe");
    }

    #[tokio::test]
    async fn progress_events_carry_phases_in_order() {
        struct RecordingProgress(Mutex<Vec<Phase>>);
        impl ProgressReporter for RecordingProgress {
            fn event(&self, event: &ProgressEvent) {
                self.0.lock().unwrap().push(event.phase);
            }
            fn place_progress(&self, _c: usize, _t: usize, _d: &str) {}
            fn done(&self, _s: &RunSummary) {}
        }

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::new(dir.path()));
        let lookup = Arc::new(ScriptedLookup::default());
        let model = Arc::new(MockCompletion::new(vec![
            Ok(extraction_json()),
            Ok(tag_json()),
            Ok(tag_json()),
        ]));

        let recorder = RecordingProgress(Mutex::new(Vec::new()));
        let pipeline = pipeline_with(model, lookup, store, run_config());
        pipeline.run(&recorder).await.unwrap();

        let phases = recorder.0.into_inner().unwrap();
        let mut deduped = phases.clone();
        deduped.dedup();
        assert_eq!(
            deduped,
            vec![
                Phase::Segmenting,
                Phase::Extracting,
                Phase::Enriching,
                Phase::Tagging,
                Phase::Persisting
            ]
        );
    }

    #[test]
    fn refresh_decisions() {
        let version = "2.0";
        let mut prior = Place::extracted("A", "text", "Dining");
        prior.id = "a".into();

        // No prior entity.
        assert_eq!(
            RefreshDecision::decide(None, version, false),
            RefreshDecision::Fresh
        );
        // Prior exists but never enriched.
        assert_eq!(
            RefreshDecision::decide(Some(&prior), version, false),
            RefreshDecision::Fresh
        );
        // Enriched under the current version.
        prior.enrichment_status = EnrichmentStatus::enriched(version, SourceConfidence::High);
        assert_eq!(
            RefreshDecision::decide(Some(&prior), version, false),
            RefreshDecision::Skip
        );
        // Enriched under an older version.
        assert_eq!(
            RefreshDecision::decide(Some(&prior), "3.0", false),
            RefreshDecision::StaleVersion
        );
        // Full refresh overrides everything.
        assert_eq!(
            RefreshDecision::decide(Some(&prior), version, true),
            RefreshDecision::Forced
        );
    }
}
