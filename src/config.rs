//! Configuration module for candimatch.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `CM_` and use double underscores
//! to separate nested levels:
//! - `CM_SEARCH__DEFAULT_TOP_K=5` sets `search.default_top_k`
//! - `CM_EMBEDDING__MODEL=AllMiniLML6V2` sets `embedding.model`
//! - `CM_DATA_DIR=/srv/matching` sets `data_dir`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MatchError, MatchResult};
use crate::vector::DEFAULT_PARALLEL_MIN_ROWS;

const CONFIG_DIR: &str = ".candimatch";
const CONFIG_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory that relative artifact paths are resolved against
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Workspace root directory (where .candimatch is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Global debug mode
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

/// Locations of the catalog, raw embeddings and index artifacts.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ArtifactsConfig {
    #[serde(default = "default_catalog")]
    pub catalog: PathBuf,

    #[serde(default = "default_embeddings")]
    pub embeddings: PathBuf,

    #[serde(default = "default_index")]
    pub index: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SearchConfig {
    /// Result count when a request does not name one
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Stores with at least this many rows are scored in parallel
    #[serde(default = "default_parallel_min_rows")]
    pub parallel_min_rows: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmbeddingConfig {
    /// fastembed model name
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Where downloaded model weights are cached
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Texts per embedding call during precompute
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_true")]
    pub show_download_progress: bool,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_catalog() -> PathBuf {
    PathBuf::from("candidates.json")
}
fn default_embeddings() -> PathBuf {
    PathBuf::from("candidate_embeddings.bin")
}
fn default_index() -> PathBuf {
    PathBuf::from("candidates.index")
}
fn default_top_k() -> usize {
    10
}
fn default_parallel_min_rows() -> usize {
    DEFAULT_PARALLEL_MIN_ROWS
}
fn default_embedding_model() -> String {
    "BGEBaseENV15".to_string()
}
fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("candimatch")
        .join("models")
}
fn default_batch_size() -> usize {
    32
}
fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            data_dir: default_data_dir(),
            workspace_root: None,
            debug: false,
            artifacts: ArtifactsConfig::default(),
            search: SearchConfig::default(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
            embeddings: default_embeddings(),
            index: default_index(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            parallel_min_rows: default_parallel_min_rows(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            cache_dir: default_cache_dir(),
            batch_size: default_batch_size(),
            show_download_progress: true,
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        Self::figment(&config_path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref()).extract().map_err(Box::new)
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            // Double underscore separates nested levels; single underscores
            // stay inside field names
            .merge(Env::prefixed("CM_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
    }

    /// Find the settings file by looking for a .candimatch directory
    /// from the current directory up to the filesystem root
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Get the workspace root directory (where .candimatch is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Rejects settings no command can run with.
    pub fn validate(&self) -> MatchResult<()> {
        if self.embedding.batch_size == 0 {
            return Err(MatchError::Config {
                reason: "embedding.batch_size must be at least 1".to_string(),
            });
        }
        crate::vector::parse_embedding_model(&self.embedding.model)?;
        Ok(())
    }

    /// Directory artifacts live in, anchored at the workspace root when relative.
    pub fn data_dir(&self) -> PathBuf {
        match &self.workspace_root {
            Some(root) if self.data_dir.is_relative() => root.join(&self.data_dir),
            _ => self.data_dir.clone(),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir().join(path)
        }
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.resolve(&self.artifacts.catalog)
    }

    pub fn embeddings_path(&self) -> PathBuf {
        self.resolve(&self.artifacts.embeddings)
    }

    pub fn index_path(&self) -> PathBuf {
        self.resolve(&self.artifacts.index)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file with helpful comments
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        Self::init_config_file_in(Path::new("."), force)
    }

    /// Like [`Settings::init_config_file`], rooted at `root` instead of the
    /// current directory.
    pub fn init_config_file_in(
        root: &Path,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = root.join(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = format!(
            r#"# candimatch configuration file

# Version of the configuration schema
version = 1

# Directory holding the artifacts (relative to the workspace root)
data_dir = "data"

# Global debug mode
debug = false

[artifacts]
# Candidate catalog: JSON array of {{"id", "profile_text"}} objects
catalog = "candidates.json"

# Raw embeddings written by 'candimatch precompute'
embeddings = "candidate_embeddings.bin"

# Flat inner-product index read by search
index = "candidates.index"

[search]
# Result count when a request does not name one
default_top_k = 10

# Stores with at least this many rows are scored in parallel
parallel_min_rows = {}

[embedding]
# fastembed model used for candidate profiles and requirement text
model = "BGEBaseENV15"

# Where model weights are downloaded
cache_dir = '{}'

# Texts per embedding call during precompute
batch_size = 32

show_download_progress = true
"#,
            DEFAULT_PARALLEL_MIN_ROWS,
            default_cache_dir().display()
        );

        std::fs::write(&config_path, template)?;
        Ok(config_path)
    }
}
