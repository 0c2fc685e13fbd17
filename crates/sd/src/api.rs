//! REST client for the text-to-image sidecar's HTTP endpoint.
//!
//! Wraps `POST /v1/txt2img` using [`reqwest`]. The sidecar answers a
//! successful request with the PNG bytes of exactly one image; anything
//! else surfaces as an [`SdApiError`].

use image::GenericImageView;

use crate::backend::{GeneratedImage, GenerationRequest, TextToImage};

/// HTTP client for a single sidecar instance.
pub struct SdApi {
    client: reqwest::Client,
    api_url: String,
}

/// Errors from the sidecar REST layer.
#[derive(Debug, thiserror::Error)]
pub enum SdApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The sidecar returned a non-2xx status code.
    #[error("Sidecar API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response body did not decode as an image.
    #[error("Sidecar returned an undecodable image payload: {0}")]
    Decode(String),

    /// The request body failed to serialize.
    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SdApi {
    /// Create a new client for a sidecar instance.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://host:7860`.
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling across multiple sidecars).
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self { client, api_url }
    }

    /// Base HTTP API URL (e.g. `http://host:7860`).
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Generate one image.
    ///
    /// Sends `POST /v1/txt2img` with the request JSON plus a fresh
    /// `request_id` so sidecar logs can be correlated with ours.
    /// Returns the validated PNG bytes.
    pub async fn txt2image(&self, request: &GenerationRequest) -> Result<Vec<u8>, SdApiError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let mut body = serde_json::to_value(request)?;
        body["request_id"] = serde_json::Value::String(request_id.clone());

        tracing::debug!(
            request_id = %request_id,
            prompt = %request.prompt,
            steps = request.steps,
            "Submitting generation request",
        );

        let response = self
            .client
            .post(format!("{}/v1/txt2img", self.api_url))
            .json(&body)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?.to_vec();
        let (width, height) = decoded_dimensions(&bytes)?;

        if width != request.width || height != request.height {
            tracing::warn!(
                request_id = %request_id,
                width,
                height,
                "Sidecar returned an image with unexpected dimensions",
            );
        }

        Ok(bytes)
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`SdApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, SdApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(SdApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// Decode-check an image payload and return its pixel dimensions.
fn decoded_dimensions(bytes: &[u8]) -> Result<(u32, u32), SdApiError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| SdApiError::Decode(e.to_string()))?;
    Ok(decoded.dimensions())
}

#[async_trait::async_trait]
impl TextToImage for SdApi {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, SdApiError> {
        let bytes = self.txt2image(request).await?;
        Ok(GeneratedImage::from_bytes(bytes))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::new(width, height);
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn valid_png_payload_decodes_with_dimensions() {
        let bytes = png_bytes(16, 8);
        assert_eq!(decoded_dimensions(&bytes).unwrap(), (16, 8));
    }

    #[test]
    fn garbage_payload_is_a_decode_error() {
        let err = decoded_dimensions(b"definitely not a png").unwrap_err();
        assert!(matches!(err, SdApiError::Decode(_)));
    }
}
