//! Style-similarity checker library.
//!
//! Scores how close two images are in style by comparing their pooled
//! vision-transformer embeddings. The embeddings come from the external
//! embedding sidecar ([`embed::EmbedApi`]); the cosine math lives in
//! `restyle_core::similarity`.

pub mod embed;

pub use embed::{EmbedApi, EmbedApiError};
