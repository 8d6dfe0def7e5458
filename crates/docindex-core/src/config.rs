//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `docindex.toml` + `docindex.<env>.toml` + `DOCINDEX_*`
//! env vars. Provides helpers to expand `~` and `${VAR}` and to resolve relative
//! paths against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::types::{FieldDefinition, IndexSchema};

/// Location string selecting the in-memory index.
pub const IN_MEMORY_LOCATION: &str = ":memory:";

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Load config files from `dir` instead of the working directory.
    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("docindex.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("docindex.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("docindex.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("docindex.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("DOCINDEX_").split("__"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract and validate the full typed settings tree.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
        settings.index_schema()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub index: IndexSettings,
    pub analyzer: AnalyzerSettings,
    pub search: SearchSettings,
    pub schema: Vec<FieldDefinition>,
}

impl Settings {
    pub fn index_schema(&self) -> crate::Result<IndexSchema> {
        IndexSchema::new(self.schema.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Filesystem path, or `:memory:`.
    pub location: String,
    pub writer_heap_bytes: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { location: "./data/index".to_string(), writer_heap_bytes: 50_000_000 }
    }
}

impl IndexSettings {
    /// `None` for the in-memory sentinel, else the expanded path.
    pub fn path(&self) -> Option<PathBuf> {
        if self.location == IN_MEMORY_LOCATION { None } else { Some(expand_path(&self.location)) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerSettings {
    pub stop_words: Vec<String>,
    pub max_token_length: usize,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self { stop_words: Vec::new(), max_token_length: 40 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_limit: usize,
    pub fulltext_field: String,
    /// Zero disables the deadline.
    pub timeout_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { default_limit: 10, fulltext_field: "content".to_string(), timeout_ms: 0 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
