/// Wine label detection through an external vision model.

pub mod client;
pub mod prompt;

pub use client::VisionModelClient;

use crate::error::AppError;
use crate::postprocess::mapping::NormalizedBox;
use async_trait::async_trait;

#[async_trait]
pub trait LabelDetector: Send + Sync {
    /// Locate labels in an image given as a data URI.
    ///
    /// An unparsable model reply yields an empty list. Only transport and
    /// service failures are errors.
    async fn detect(&self, image_data_uri: &str) -> Result<Vec<NormalizedBox>, AppError>;
}
