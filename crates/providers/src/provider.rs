//! The capability contract shared by all generation backends.

use aigc_core::task::{Task, TaskKind};
use aigc_core::types::AssetRef;
use async_trait::async_trait;

use crate::error::ProviderError;

/// A generation backend.
///
/// Each call may block for seconds on network I/O. Implementations never
/// see or touch the task record; they take inputs and return an asset
/// reference. A missing or blank required input is an
/// [`ProviderError::InvalidInput`], never an empty success.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    async fn generate_text_to_image(&self, prompt: &str) -> Result<AssetRef, ProviderError>;

    async fn generate_image_to_image(
        &self,
        source: &str,
        prompt: &str,
    ) -> Result<AssetRef, ProviderError>;

    async fn remove_background(&self, source: &str) -> Result<AssetRef, ProviderError>;

    async fn swap_face(&self, source: &str, prompt: &str) -> Result<AssetRef, ProviderError>;
}

/// The capability call a task maps to, with its inputs checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    TextToImage { prompt: String },
    ImageToImage { source: AssetRef, prompt: String },
    RemoveBackground { source: AssetRef },
    FaceSwap { source: AssetRef, prompt: String },
}

impl GenerationRequest {
    /// Build the request for `task`'s kind from its prompt and input asset.
    pub fn from_task(task: &Task) -> Result<Self, ProviderError> {
        let prompt = || require("prompt", task.prompt()).map(str::to_string);
        let source = || require("input asset", task.input_asset()).map(str::to_string);

        Ok(match task.kind() {
            TaskKind::TextToImage => Self::TextToImage { prompt: prompt()? },
            TaskKind::ImageToImage => Self::ImageToImage {
                source: source()?,
                prompt: prompt()?,
            },
            TaskKind::BatchMatting => Self::RemoveBackground { source: source()? },
            TaskKind::FaceSwap => Self::FaceSwap {
                source: source()?,
                prompt: prompt()?,
            },
        })
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            Self::TextToImage { .. } => TaskKind::TextToImage,
            Self::ImageToImage { .. } => TaskKind::ImageToImage,
            Self::RemoveBackground { .. } => TaskKind::BatchMatting,
            Self::FaceSwap { .. } => TaskKind::FaceSwap,
        }
    }

    /// Invoke the matching capability on `provider`.
    pub async fn dispatch(
        &self,
        provider: &dyn GenerationProvider,
    ) -> Result<AssetRef, ProviderError> {
        match self {
            Self::TextToImage { prompt } => provider.generate_text_to_image(prompt).await,
            Self::ImageToImage { source, prompt } => {
                provider.generate_image_to_image(source, prompt).await
            }
            Self::RemoveBackground { source } => provider.remove_background(source).await,
            Self::FaceSwap { source, prompt } => provider.swap_face(source, prompt).await,
        }
    }
}

/// Return `value` if it is present and not blank.
pub fn require<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, ProviderError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ProviderError::InvalidInput(format!("missing {field}"))),
    }
}
