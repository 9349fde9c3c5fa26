//! Test harness for isolated pipeline runs.
//!
//! The `TestHarness` wires the real source adapters to a `FixtureTransport`
//! that replays pages from `tests/fixtures`, keyed by the exact URL each
//! adapter would request. Cards go to an in-memory store unless a test
//! asks for the SQLite database.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use lexideck::config::{load_config, Config};
use lexideck::normalize::{NormalizeOptions, TableLemmatizer};
use lexideck::sources::{FixtureTransport, RawResponse, TransportError};
use lexideck::{
    CardStore, FetchPipeline, MemoryStore, Normalizer, PipelineConfig, SearchTerm, SourceAdapter,
    SourceRegistry,
};

/// Absolute path of a file under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", name, e))
}

/// Isolated environment for one integration test.
pub struct TestHarness {
    /// Scratch directory for files written by the test.
    temp_dir: TempDir,
    pub config: Config,
    pub registry: SourceRegistry,
    pub transport: Arc<FixtureTransport>,
    pub store: Arc<dyn CardStore>,
}

impl TestHarness {
    /// Harness using `tests/fixtures/config.json` and a memory store.
    pub fn new() -> Self {
        let config =
            load_config(fixture_path("config.json")).expect("Fixture config should load");
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
            config,
            registry: SourceRegistry::builtin(),
            transport: Arc::new(FixtureTransport::new()),
            store: Arc::new(MemoryStore::new()),
        }
    }

    /// Replaces the card store, e.g. with a SQLite database.
    pub fn with_store(mut self, store: Arc<dyn CardStore>) -> Self {
        self.store = store;
        self
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `content` to a file in the scratch directory.
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, content).expect("Failed to write test file");
        path
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::from_config(&self.config)
    }

    /// Adapter for a configured source, built with its config settings.
    pub fn adapter(&self, name: &str) -> Box<dyn SourceAdapter> {
        let settings = self
            .config
            .sources
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.settings.clone())
            .unwrap_or_default();
        self.registry
            .build(name, &settings)
            .unwrap_or_else(|e| panic!("Failed to build adapter {}: {}", name, e))
    }

    /// URL the named adapter requests for `phrase`.
    pub fn url_for(&self, source: &str, phrase: &str) -> String {
        let request = self.pipeline_config().request(SearchTerm::new(phrase));
        self.adapter(source)
            .build_request(&request)
            .unwrap_or_else(|e| panic!("Failed to build request for {}: {}", source, e))
            .url
    }

    /// Records a fixture file as the answer of `source` for `phrase`.
    pub fn record(&self, source: &str, phrase: &str, fixture: &str) -> &Self {
        self.transport
            .insert(self.url_for(source, phrase), RawResponse::ok(read_fixture(fixture)));
        self
    }

    /// Makes every request of `source` fail as if the host timed out.
    pub fn fail_source(&self, source: &str) -> &Self {
        let url = self.url_for(source, "x");
        let prefix = url.split('?').next().unwrap_or(&url).to_string();
        self.transport
            .fail_prefix(prefix.clone(), TransportError::Timeout { url: prefix });
        self
    }

    /// Records the linguee, reverso and dicio pages for "começar". No image
    /// page is recorded.
    pub fn record_comecar(&self) -> &Self {
        self.record("linguee", "começar", "linguee_comecar.json")
            .record("reverso", "começar", "reverso_comecar.html")
            .record("dicio", "começar", "dicio_comecar.html")
    }

    pub fn normalizer(&self) -> Arc<Normalizer> {
        let lemmatizer = TableLemmatizer::from_tsv(&read_fixture("lemmas.tsv"));
        Arc::new(Normalizer::new(
            NormalizeOptions::default(),
            Arc::new(lemmatizer),
        ))
    }

    /// Pipeline over all configured sources.
    pub fn pipeline(&self) -> FetchPipeline {
        let names: Vec<String> = self.config.sources.iter().map(|s| s.name.clone()).collect();
        let adapters = names.iter().map(|name| self.adapter(name)).collect();
        self.pipeline_with(adapters)
    }

    /// Pipeline over an explicit adapter list, keeping the harness config.
    pub fn pipeline_with(&self, adapters: Vec<Box<dyn SourceAdapter>>) -> FetchPipeline {
        FetchPipeline::new(
            adapters,
            self.transport.clone(),
            self.store.clone(),
            Arc::new(self.pipeline_config()),
        )
        .expect("Failed to build pipeline")
        .with_normalizer(self.normalizer())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
