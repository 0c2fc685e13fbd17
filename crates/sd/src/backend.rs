//! The text-to-image backend seam.
//!
//! The pipeline producer only sees [`TextToImage`]: a prompt plus fixed
//! parameters in, one saveable image out. The HTTP implementation lives
//! in [`crate::api`]; tests substitute their own.

use std::path::Path;

use serde::Serialize;

use restyle_core::config::GenerationParams;

use crate::api::SdApiError;

/// One generation request forwarded to the sidecar.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub steps: u32,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl GenerationRequest {
    /// Build a request for `prompt` with the run's fixed parameters.
    pub fn from_params(prompt: impl Into<String>, params: &GenerationParams) -> Self {
        Self {
            prompt: prompt.into(),
            steps: params.steps,
            width: params.width,
            height: params.height,
            seed: params.seed,
        }
    }
}

/// A generated image held in memory until it is persisted.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    bytes: Vec<u8>,
}

impl GeneratedImage {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Write the image to `path`. The parent directory must exist.
    pub async fn save(&self, path: &Path) -> Result<(), SdApiError> {
        tokio::fs::write(path, &self.bytes).await?;
        Ok(())
    }
}

/// Generation backend contract: prompt and parameters in, one image out.
#[async_trait::async_trait]
pub trait TextToImage: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, SdApiError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_copies_run_parameters() {
        let params = GenerationParams {
            steps: 25,
            width: 640,
            height: 512,
            seed: Some(20),
        };
        let request = GenerationRequest::from_params("a cat", &params);
        assert_eq!(request.prompt, "a cat");
        assert_eq!(request.steps, 25);
        assert_eq!(request.width, 640);
        assert_eq!(request.height, 512);
        assert_eq!(request.seed, Some(20));
    }

    #[test]
    fn unseeded_request_omits_the_seed_field() {
        let request = GenerationRequest::from_params("a cat", &GenerationParams::default());
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("seed").is_none());
    }

    #[tokio::test]
    async fn save_writes_the_raw_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let image = GeneratedImage::from_bytes(vec![1, 2, 3]);
        image.save(&path).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
    }
}
