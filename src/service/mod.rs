//! Contracts for the remote generative-image and chat collaborators.
//!
//! Each operation takes a fixed request struct. Failures are opaque (`anyhow`); the editor
//! collapses them into one error per operation category.

pub(crate) mod prompt;

use async_trait::async_trait;

/// Output framing requested from the service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AspectRatio {
    /// 16:9 landscape, the only thumbnail framing.
    #[default]
    Widescreen,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Widescreen => "16:9",
        }
    }
}

/// Restyle one composed raster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditRequest {
    /// Composed thumbnail as PNG.
    pub image_png: Vec<u8>,
    /// Full instruction text.
    pub instruction: String,
    pub aspect_ratio: AspectRatio,
}

/// Produce a background raster from text alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
}

/// One coaching question, optionally with the current composition attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub image_png: Option<Vec<u8>>,
}

/// Remote image edit, background generation and coach chat.
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Returns encoded image bytes of the same aspect ratio.
    async fn edit(&self, req: EditRequest) -> anyhow::Result<Vec<u8>>;
    /// Returns encoded image bytes.
    async fn generate(&self, req: GenerateRequest) -> anyhow::Result<Vec<u8>>;
    /// Returns the coach's reply.
    async fn converse(&self, req: ChatRequest) -> anyhow::Result<String>;
}
