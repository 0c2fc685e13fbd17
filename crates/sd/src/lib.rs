//! HTTP client for the text-to-image sidecar server.
//!
//! The sidecar owns model loading and inference; this crate only speaks
//! its request/response contract. [`TextToImage`] is the seam the
//! pipeline generates through, and [`SdApi`] is its HTTP implementation.

pub mod api;
pub mod backend;

pub use api::{SdApi, SdApiError};
pub use backend::{GeneratedImage, GenerationRequest, TextToImage};
