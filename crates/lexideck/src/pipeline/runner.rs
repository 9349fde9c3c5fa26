use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::Config;
use crate::db::CardStore;
use crate::error::ConfigError;
use crate::merge::merge;
use crate::normalize::{tag_word, Normalizer};
use crate::record::{Field, FieldRecord, FieldValue, SearchTerm};
use crate::sources::{
    FetchError, FetchRequest, HttpTransport, SourceAdapter, SourceId, SourceRegistry, Transport,
};

use super::config::PipelineConfig;
use super::context::FetchContext;
use super::error::{PipelineError, PipelineWarning};

/// Turns one phrase into a merged record. The work queue calls this from
/// its worker thread and stores the record itself.
pub trait PhraseProcessor: Send + Sync {
    fn process(&self, phrase: &SearchTerm) -> Result<FieldRecord, PipelineError>;
}

pub struct FetchPipeline {
    config: Arc<PipelineConfig>,
    adapters: Vec<Box<dyn SourceAdapter>>,
    transport: Arc<dyn Transport>,
    store: Arc<dyn CardStore>,
    normalizer: Option<Arc<Normalizer>>,
    runtime: tokio::runtime::Runtime,
}

impl FetchPipeline {
    /// Production constructor: builds adapters and the HTTP transport from
    /// config.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn CardStore>,
    ) -> Result<Self, crate::error::LexiError> {
        let registry = SourceRegistry::builtin();
        let adapters = config
            .sources
            .iter()
            .map(|source| registry.build(&source.name, &source.settings))
            .collect::<Result<Vec<_>, _>>()?;
        let transport = HttpTransport::new(&config.http).map_err(ConfigError::from)?;

        let pipeline = Self::new(
            adapters,
            Arc::new(transport),
            store,
            Arc::new(PipelineConfig::from_config(config)),
        )?;
        Ok(pipeline)
    }

    pub fn new(
        adapters: Vec<Box<dyn SourceAdapter>>,
        transport: Arc<dyn Transport>,
        store: Arc<dyn CardStore>,
        config: Arc<PipelineConfig>,
    ) -> Result<Self, PipelineError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| PipelineError::Runtime(format!("Failed to build runtime: {}", e)))?;

        Ok(Self {
            config,
            adapters,
            transport,
            store,
            normalizer: None,
            runtime,
        })
    }

    /// Enables highlighting of the phrase inside example sentences.
    pub fn with_normalizer(mut self, normalizer: Arc<Normalizer>) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn source_ids(&self) -> Vec<SourceId> {
        self.adapters.iter().map(|a| a.id()).collect()
    }

    /// Run the full pipeline for a single phrase and store the result.
    pub fn run(&self, phrase: &SearchTerm) -> Result<FieldRecord, PipelineError> {
        let record = self.fetch(phrase)?;

        let _step = info_span!("store", phrase = %phrase).entered();
        self.step_store(phrase, &record)?;
        Ok(record)
    }

    /// Cached record or a fresh fetch-and-merge. Nothing is written back.
    pub fn fetch(&self, phrase: &SearchTerm) -> Result<FieldRecord, PipelineError> {
        let _fetch_span = info_span!("fetch", phrase = %phrase).entered();

        // Step 1: Cached card
        {
            let _step = info_span!("cache_lookup").entered();
            if let Some(record) = self.step_cached(phrase)? {
                debug!("Using stored base data");
                return Ok(record);
            }
        }

        let mut ctx = FetchContext::new(self.config.request(phrase.clone()));

        // Step 2: Query all sources concurrently
        {
            let _step = info_span!("fan_out", sources = self.adapters.len()).entered();
            self.step_fan_out(&mut ctx);
        }

        // Step 3: Required/optional policy
        {
            let _step = info_span!("apply_policy").entered();
            self.step_apply_policy(&mut ctx)?;
        }

        // Step 4: Merge in priority order
        let mut record = {
            let _step = info_span!("merge", partials = ctx.partials.len()).entered();
            self.step_merge(&ctx)?
        };

        // Step 5: Highlight examples
        if self.config.highlight_examples {
            let _step = info_span!("highlight").entered();
            self.step_highlight(&mut record, phrase);
        }

        info!(
            fields = record.len(),
            warnings = ctx.warnings.len(),
            "Fetched phrase"
        );
        Ok(record)
    }

    fn step_cached(&self, phrase: &SearchTerm) -> Result<Option<FieldRecord>, PipelineError> {
        Ok(self
            .store
            .get_card(phrase)?
            .and_then(|card| card.base_data))
    }

    fn step_fan_out(&self, ctx: &mut FetchContext) {
        let request = &ctx.request;
        let transport = self.transport.as_ref();
        let timeout = self.config.request_timeout;

        let calls = self.adapters.iter().map(|adapter| {
            let source_id = adapter.id();
            let span = info_span!("source", source = %source_id);
            async move {
                let result =
                    match tokio::time::timeout(timeout, adapter.fetch(transport, request)).await {
                        Ok(result) => result,
                        Err(_) => Err(FetchError::Transport {
                            source_id: source_id.clone(),
                            message: format!("timed out after {}s", timeout.as_secs()),
                            retryable: true,
                        }),
                    };
                (source_id, result)
            }
            .instrument(span)
        });
        let results = self.runtime.block_on(join_all(calls));

        for (source_id, result) in results {
            match result {
                Ok(record) => {
                    debug!(source = %source_id, fields = record.len(), "Source returned data");
                    ctx.partials.push((source_id, record));
                }
                Err(e) => ctx.failures.push(e),
            }
        }
        ctx.failures
            .sort_by_key(|failure| self.config.rank(failure.source_id()));
    }

    fn step_apply_policy(&self, ctx: &mut FetchContext) -> Result<(), PipelineError> {
        for failure in &ctx.failures {
            let source_id = failure.source_id();
            if self.config.is_required(source_id) {
                if failure.is_no_match() {
                    let suggestions = self.suggestions_for(source_id, &ctx.request);
                    return Err(PipelineError::NoMatch {
                        source_id: source_id.clone(),
                        suggestions,
                    });
                }
                return Err(PipelineError::Fetch(failure.clone()));
            }

            if failure.is_no_match() {
                info!(source = %source_id, "Source has no match");
            } else {
                warn!(source = %source_id, error = %failure, "Source failed");
            }
            ctx.warnings.push(PipelineWarning::SourceFailed {
                source_id: source_id.clone(),
                error: failure.to_string(),
            });
        }

        if ctx.partials.is_empty() {
            return Err(PipelineError::AllSourcesFailed {
                failures: std::mem::take(&mut ctx.failures),
            });
        }
        Ok(())
    }

    /// Asks the failing source for alternative spellings. Errors only cost
    /// the suggestions.
    fn suggestions_for(&self, source_id: &SourceId, request: &FetchRequest) -> Vec<String> {
        let Some(adapter) = self.adapters.iter().find(|a| &a.id() == source_id) else {
            return Vec::new();
        };
        let lookup = tokio::time::timeout(
            self.config.request_timeout,
            adapter.suggest(self.transport.as_ref(), request),
        );
        match self.runtime.block_on(lookup) {
            Ok(Ok(suggestions)) => suggestions,
            Ok(Err(e)) => {
                debug!(source = %source_id, error = %e, "Suggestion lookup failed");
                Vec::new()
            }
            Err(_) => {
                debug!(source = %source_id, "Suggestion lookup timed out");
                Vec::new()
            }
        }
    }

    fn step_merge(&self, ctx: &FetchContext) -> Result<FieldRecord, PipelineError> {
        let mut record = merge(&ctx.partials, &self.config.priority)?;
        record.drop_unchanged_suggestions(&ctx.request.phrase);
        Ok(record)
    }

    fn step_highlight(&self, record: &mut FieldRecord, phrase: &SearchTerm) {
        let Some(normalizer) = &self.normalizer else {
            return;
        };
        if let Some(FieldValue::List(examples)) = record.get_mut(Field::Example.as_str()) {
            for example in examples.iter_mut().flatten() {
                *example = tag_word(example, phrase.as_str(), normalizer);
            }
        }
    }

    fn step_store(&self, phrase: &SearchTerm, record: &FieldRecord) -> Result<(), PipelineError> {
        self.store.add_card(phrase)?;
        self.store.set_base_data(phrase, record)?;
        Ok(())
    }
}

impl PhraseProcessor for FetchPipeline {
    fn process(&self, phrase: &SearchTerm) -> Result<FieldRecord, PipelineError> {
        self.fetch(phrase)
    }
}
