//! Embedding generation for candidate profiles and requirement text.
//!
//! The matching core treats the embedding model as an opaque function from
//! text to a fixed-dimension vector. [`EmbeddingGenerator`] is that seam;
//! [`FastEmbedGenerator`] is the local ONNX implementation shipped with the
//! CLI. Whatever a generator returns is L2-normalized by the core before it
//! is stored or searched, so implementations need not normalize.

use std::path::PathBuf;
use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::error::{MatchError, MatchResult};
use crate::vector::VectorDimension;

/// Trait for generating embeddings from text.
///
/// Implementations of this trait should be thread-safe and
/// capable of handling batch processing efficiently.
pub trait EmbeddingGenerator: Send + Sync {
    /// Generate embeddings for multiple texts, one per input, in order.
    fn generate_embeddings(&self, texts: &[&str]) -> MatchResult<Vec<Vec<f32>>>;

    /// Get the dimension of embeddings produced by this generator.
    #[must_use]
    fn dimension(&self) -> VectorDimension;

    /// Name recorded in index manifests.
    fn model_name(&self) -> &str;

    /// Embeds a single text.
    fn embed(&self, text: &str) -> MatchResult<Vec<f32>> {
        self.generate_embeddings(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| MatchError::Embedding("model returned no embedding".to_string()))
    }
}

/// FastEmbed implementation backed by a local ONNX model.
pub struct FastEmbedGenerator {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimension: VectorDimension,
}

impl std::fmt::Debug for FastEmbedGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedGenerator")
            .field("model", &self.model_name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl FastEmbedGenerator {
    /// Create a generator for `model`, caching weights under `cache_dir`.
    ///
    /// # Errors
    /// Returns an error if the model fails to initialize or download.
    pub fn new(
        model: EmbeddingModel,
        cache_dir: PathBuf,
        show_download_progress: bool,
    ) -> MatchResult<Self> {
        let model_name = model_to_string(&model);
        let mut text_model = TextEmbedding::try_new(
            InitOptions::new(model)
                .with_cache_dir(cache_dir)
                .with_show_download_progress(show_download_progress),
        )
        .map_err(|e| {
            MatchError::Embedding(format!(
                "Failed to initialize embedding model {model_name}: {e}. Ensure you have internet connection for first-time model download"
            ))
        })?;

        // Probe once to learn the output dimension
        let probe = text_model
            .embed(vec!["dimension probe"], None)
            .map_err(|e| MatchError::Embedding(e.to_string()))?;
        let dim = probe.first().map_or(0, Vec::len);
        let dimension = VectorDimension::new(dim)
            .map_err(|_| MatchError::Embedding(format!("{model_name} produced empty vectors")))?;

        Ok(Self {
            model: Mutex::new(text_model),
            model_name,
            dimension,
        })
    }
}

impl EmbeddingGenerator for FastEmbedGenerator {
    fn generate_embeddings(&self, texts: &[&str]) -> MatchResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let text_strings: Vec<String> = texts.iter().map(|&s| s.to_string()).collect();

        let embeddings = self
            .model
            .lock()
            .map_err(|_| {
                MatchError::Embedding(
                    "Failed to acquire embedding model lock - model may be poisoned".to_string(),
                )
            })?
            .embed(text_strings, None)
            .map_err(|e| MatchError::Embedding(format!("Failed to generate embeddings: {e}")))?;

        for embedding in &embeddings {
            self.dimension.validate_vector(embedding)?;
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Parses a configured model name into a fastembed model.
pub fn parse_embedding_model(name: &str) -> MatchResult<EmbeddingModel> {
    match name {
        "AllMiniLML6V2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "AllMiniLML12V2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "BGESmallENV15" => Ok(EmbeddingModel::BGESmallENV15),
        "BGEBaseENV15" => Ok(EmbeddingModel::BGEBaseENV15),
        "BGELargeENV15" => Ok(EmbeddingModel::BGELargeENV15),
        "MultilingualE5Small" => Ok(EmbeddingModel::MultilingualE5Small),
        "MultilingualE5Base" => Ok(EmbeddingModel::MultilingualE5Base),
        other => Err(MatchError::Config {
            reason: format!(
                "unknown embedding model '{other}'. Supported: AllMiniLML6V2, AllMiniLML12V2, BGESmallENV15, BGEBaseENV15, BGELargeENV15, MultilingualE5Small, MultilingualE5Base"
            ),
        }),
    }
}

/// Stable name for a fastembed model, the inverse of [`parse_embedding_model`].
pub fn model_to_string(model: &EmbeddingModel) -> String {
    match model {
        EmbeddingModel::AllMiniLML6V2 => "AllMiniLML6V2".to_string(),
        EmbeddingModel::AllMiniLML12V2 => "AllMiniLML12V2".to_string(),
        EmbeddingModel::BGESmallENV15 => "BGESmallENV15".to_string(),
        EmbeddingModel::BGEBaseENV15 => "BGEBaseENV15".to_string(),
        EmbeddingModel::BGELargeENV15 => "BGELargeENV15".to_string(),
        EmbeddingModel::MultilingualE5Small => "MultilingualE5Small".to_string(),
        EmbeddingModel::MultilingualE5Base => "MultilingualE5Base".to_string(),
        other => format!("{other:?}"),
    }
}

/// Mock embedding generator for testing.
///
/// Produces deterministic bag-of-words vectors: each word is hashed into a
/// bucket, so texts sharing vocabulary score higher than unrelated ones.
#[cfg(test)]
pub struct MockEmbeddingGenerator {
    dimension: VectorDimension,
}

#[cfg(test)]
impl MockEmbeddingGenerator {
    #[must_use]
    pub fn with_dimension(dimension: VectorDimension) -> Self {
        Self { dimension }
    }
}

#[cfg(test)]
impl EmbeddingGenerator for MockEmbeddingGenerator {
    fn generate_embeddings(&self, texts: &[&str]) -> MatchResult<Vec<Vec<f32>>> {
        let dim = self.dimension.get();
        Ok(texts
            .iter()
            .map(|text| {
                let mut embedding = vec![0.0; dim];
                for word in text.split_whitespace() {
                    let bucket = word
                        .to_lowercase()
                        .bytes()
                        .fold(17usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize))
                        % dim;
                    embedding[bucket] += 1.0;
                }
                embedding
            })
            .collect())
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
