use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use docqa_core::chunking::split_chunks;
use docqa_core::{loader, Chunk, Config, Embedder, Error, Generator, Result, Settings};
use docqa_index::IndexHandle;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};

use crate::format::{context_text, format_results};
use crate::retriever::Retriever;

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub location: PathBuf,
    pub files: usize,
    pub chunks: usize,
    pub dim: usize,
    pub model_id: String,
    pub generation: u64,
    pub elapsed: Duration,
}

/// Result of one query. Failures are reported in `error`, never as a panic.
#[derive(Debug)]
pub struct Answer {
    pub query: String,
    pub chunks: Vec<Chunk>,
    pub formatted_text: String,
    pub answer: Option<String>,
    pub error: Option<Error>,
}

/// Ingestion and query front door.
///
/// Holds one embedder for the whole process and one [`Retriever`] per index
/// location; ingesting into a location drops its retriever.
pub struct Pipeline {
    embedder: Arc<dyn Embedder>,
    generator: Option<Box<dyn Generator>>,
    settings: Settings,
    retrievers: Mutex<HashMap<PathBuf, Arc<Retriever>>>,
}

impl Pipeline {
    pub fn new(embedder: Arc<dyn Embedder>, generator: Option<Box<dyn Generator>>, settings: Settings) -> Self {
        Self { embedder, generator, settings, retrievers: Mutex::new(HashMap::new()) }
    }

    /// Builds the embedder and generator named in `settings`.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let embedder = docqa_embed::embedder_from_settings(&settings.embedding)?;
        let generator = docqa_llm::generator_from_settings(&settings.generator)?;
        Ok(Self::new(embedder, generator, settings))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Loads `input` (a file or directory), embeds and indexes it at
    /// `location`. Returns `false` when nothing was persisted.
    pub fn ingest(&self, input: &Path, location: &Path) -> bool {
        match self.ingest_report(input, location) {
            Ok(report) => {
                info!(
                    location = %report.location.display(),
                    files = report.files,
                    chunks = report.chunks,
                    generation = report.generation,
                    elapsed_ms = report.elapsed.as_millis(),
                    "ingestion complete"
                );
                true
            }
            Err(e) => {
                error!(input = %input.display(), location = %location.display(), error = %e, "ingestion failed");
                false
            }
        }
    }

    pub fn ingest_report(&self, input: &Path, location: &Path) -> Result<IngestReport> {
        let started = Instant::now();
        let files = if input.is_dir() { loader::list_supported_files(input).len() } else { 1 };
        let chunks = split_chunks(loader::load_path(input), &self.settings.chunking);
        if chunks.is_empty() {
            warn!(input = %input.display(), "no document chunks loaded");
            return Err(Error::EmptyIndex);
        }
        info!(input = %input.display(), files, chunks = chunks.len(), model = self.embedder.model_id(), "embedding chunks");

        let handle = self.embed_and_build(chunks)?;
        let info = docqa_index::persist(&handle, location)?;
        self.invalidate(location);

        Ok(IngestReport {
            location: location.to_path_buf(),
            files,
            chunks: info.count,
            dim: info.dim,
            model_id: info.model_id,
            generation: info.generation,
            elapsed: started.elapsed(),
        })
    }

    fn embed_and_build(&self, chunks: Vec<Chunk>) -> Result<IndexHandle> {
        let total = chunks.len();
        let batch_size = self.settings.embedding.batch_size.max(1);
        let pb = progress_bar(total, self.settings.ingest.progress);

        let mut handle: Option<IndexHandle> = None;
        let mut rest = chunks.into_iter();
        loop {
            let batch: Vec<Chunk> = rest.by_ref().take(batch_size).collect();
            if batch.is_empty() {
                break;
            }
            let texts: Vec<String> = batch.iter().map(|c| c.content().to_string()).collect();
            let vectors = self.embedder.embed_batch(&texts)?;
            if vectors.len() != batch.len() {
                return Err(Error::Encoding(format!(
                    "embedder returned {} vectors for {} inputs",
                    vectors.len(),
                    batch.len()
                )));
            }
            let entries: Vec<(Vec<f32>, Chunk)> = vectors.into_iter().zip(batch).collect();
            let added = entries.len() as u64;
            match handle.as_mut() {
                Some(h) => h.append(entries)?,
                None => {
                    handle = Some(docqa_index::build(
                        self.embedder.model_id(),
                        self.settings.index.metric,
                        entries,
                    )?);
                }
            }
            pb.inc(added);
        }
        pb.finish_and_clear();
        handle.ok_or(Error::EmptyIndex)
    }

    /// Retrieves the top `k` chunks for `query` from `location`, formats them
    /// and, when a generator is configured, asks it for an answer.
    pub fn answer(&self, query: &str, location: &Path, k: usize) -> Answer {
        let (chunks, mut error) = match self.search(query, location, k) {
            Ok(chunks) => (chunks, None),
            Err(e) => {
                error!(location = %location.display(), error = %e, "query failed");
                (Vec::new(), Some(e))
            }
        };
        let formatted_text = format_results(&chunks);

        let mut answer = None;
        if let Some(generator) = self.generator.as_deref().filter(|_| !chunks.is_empty()) {
            match generator.generate(query, &context_text(&chunks)) {
                Ok(text) => answer = Some(text),
                Err(e) => {
                    warn!(generator = generator.name(), error = %e, "answer generation failed");
                    error = Some(e);
                }
            }
        }

        Answer { query: query.to_string(), chunks, formatted_text, answer, error }
    }

    fn search(&self, query: &str, location: &Path, k: usize) -> Result<Vec<Chunk>> {
        let hits = self.retriever(location).try_retrieve(query, k)?;
        Ok(hits.into_iter().map(|h| h.chunk).collect())
    }

    /// The retriever for `location`, created on first use.
    pub fn retriever(&self, location: &Path) -> Arc<Retriever> {
        let mut retrievers = self.retrievers.lock().unwrap_or_else(PoisonError::into_inner);
        let retriever = retrievers
            .entry(location.to_path_buf())
            .or_insert_with(|| Arc::new(Retriever::new(Arc::clone(&self.embedder), location)));
        Arc::clone(retriever)
    }

    /// The index at `location`, from cache or freshly loaded.
    pub fn handle(&self, location: &Path) -> Result<Arc<IndexHandle>> {
        self.retriever(location).handle()
    }

    /// Forgets the cached index for `location`.
    pub fn invalidate(&self, location: &Path) {
        self.retrievers.lock().unwrap_or_else(PoisonError::into_inner).remove(location);
    }
}

fn progress_bar(total: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total as u64);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%)",
    )
    .map(|s| s.progress_chars("#>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

/// Ingests `input` into `location` using `model_name` for embeddings and the
/// rest of the settings from the current configuration.
pub fn ingest(input: &Path, location: &Path, model_name: &str) -> bool {
    let mut settings = match Config::load().and_then(|c| c.settings()) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "could not load configuration");
            return false;
        }
    };
    settings.embedding.model = model_name.to_string();
    let embedder = match docqa_embed::embedder_from_settings(&settings.embedding) {
        Ok(embedder) => embedder,
        Err(e) => {
            error!(model = model_name, error = %e, "could not load embedding model");
            return false;
        }
    };
    Pipeline::new(embedder, None, settings).ingest(input, location)
}
