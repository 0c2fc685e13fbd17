//! REST client for the embedding sidecar.
//!
//! Uploads an image via `POST /v1/embed` (multipart) and returns the
//! pooled embedding vector. The sidecar owns the vision-transformer
//! model; this client only validates the response shape.

use std::path::Path;

use serde::Deserialize;

use restyle_core::similarity;

/// HTTP client for a single embedding sidecar instance.
pub struct EmbedApi {
    client: reqwest::Client,
    api_url: String,
}

/// Response returned by the `/v1/embed` endpoint.
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Errors from the embedding REST layer.
#[derive(Debug, thiserror::Error)]
pub enum EmbedApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The sidecar returned a non-2xx status code.
    #[error("Embedding API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The sidecar answered with a vector of the wrong width.
    #[error(transparent)]
    Contract(#[from] restyle_core::CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EmbedApi {
    /// Create a new client for an embedding sidecar.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://host:7861`.
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
        }
    }

    /// Base HTTP API URL.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Upload the image at `path` and return its pooled embedding.
    pub async fn embed_file(&self, path: &Path) -> Result<Vec<f32>, EmbedApiError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Requesting embedding");

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/octet-stream")?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let response = self
            .client
            .post(format!("{}/v1/embed", self.api_url))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(EmbedApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed = response.json::<EmbedResponse>().await?;
        similarity::validate_embedding_dimension(&parsed.embedding)?;
        Ok(parsed.embedding)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
