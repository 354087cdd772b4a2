use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::Metric;

pub const DEFAULT_EMBED_MODEL: &str = "all-MiniLM-L6-v2";
pub const DEFAULT_INDEX_LOCATION: &str = "doc_index";

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Loads configuration relative to the current directory.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Merges, in increasing precedence: built-in defaults, `config.toml`,
    /// `config.<env>.toml` (env from `RUST_ENV`, default `dev`) and
    /// `APP_*` environment variables (`__` separates nested keys).
    pub fn load_from(dir: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("failed to get '{key}': {e}")))
    }

    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub embedding: EmbeddingSettings,
    pub index: IndexSettings,
    pub retrieval: RetrievalSettings,
    pub chunking: ChunkingSettings,
    pub generator: GeneratorSettings,
    pub ingest: IngestSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.embedding.model.trim().is_empty() {
            return Err(Error::InvalidConfig("embedding.model must not be empty".into()));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size must be at least 1".into()));
        }
        if self.embedding.max_len == 0 {
            return Err(Error::InvalidConfig("embedding.max_len must be at least 1".into()));
        }
        if self.embedding.backend == EmbeddingBackend::Hash && self.embedding.hash_dim == 0 {
            return Err(Error::InvalidConfig("embedding.hash_dim must be at least 1".into()));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be at least 1".into()));
        }
        if self.index.location.trim().is_empty() {
            return Err(Error::InvalidConfig("index.location must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Sentence-embedding transformer loaded from local weights.
    #[default]
    Bert,
    /// Deterministic token-hashing embedder; no model files needed.
    Hash,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    pub model: String,
    /// Directory holding one sub-directory per model name.
    pub models_dir: String,
    /// Token budget per input; longer inputs are truncated.
    pub max_len: usize,
    pub batch_size: usize,
    pub hash_dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Bert,
            model: DEFAULT_EMBED_MODEL.to_string(),
            models_dir: "models".to_string(),
            max_len: 256,
            batch_size: 32,
            hash_dim: 384,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub location: String,
    pub metric: Metric,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { location: DEFAULT_INDEX_LOCATION.to_string(), metric: Metric::Euclidean }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// `max_chars == 0` keeps one chunk per document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub max_chars: usize,
    pub overlap_words: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    /// Retrieval only.
    #[default]
    #[serde(rename = "none", alias = "disabled")]
    Disabled,
    Placeholder,
    Ollama,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    pub kind: GeneratorKind,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            kind: GeneratorKind::Disabled,
            model: "llama3".to_string(),
            base_url: "http://localhost:11434".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub progress: bool,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self { progress: true }
    }
}

/// Expands `$VAR`/`${VAR}` and a leading `~`. The result is not canonicalized.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Like [`expand_path`], then joins relative results onto `base`.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
