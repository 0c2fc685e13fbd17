//! `restyle-checker` -- style similarity scorer for a pair of images.
//!
//! Usage: `restyle-checker <image> <reference>`
//!
//! Both images are sent to the embedding sidecar and the cosine
//! similarity of their pooled embeddings is printed to stdout, one
//! number in `[-1, 1]`.
//!
//! # Environment variables
//!
//! | Variable        | Required | Default | Description              |
//! |-----------------|----------|---------|--------------------------|
//! | `EMBED_API_URL` | yes      | --      | Embedding sidecar URL    |

use std::path::Path;

use anyhow::Context;

use restyle_checker::EmbedApi;
use restyle_core::similarity;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "restyle_checker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [image, reference] = args.as_slice() else {
        eprintln!("Usage: restyle-checker <image> <reference>");
        std::process::exit(2);
    };

    let api_url = std::env::var("EMBED_API_URL").unwrap_or_else(|_| {
        tracing::error!("EMBED_API_URL environment variable is required");
        std::process::exit(2);
    });

    match score(&api_url, Path::new(image), Path::new(reference)).await {
        Ok(similarity) => println!("{similarity:.6}"),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Similarity check failed");
            std::process::exit(1);
        }
    }
}

/// Embed both images and return their cosine similarity.
async fn score(api_url: &str, image: &Path, reference: &Path) -> anyhow::Result<f64> {
    for path in [image, reference] {
        let (width, height) = image::image_dimensions(path)
            .with_context(|| format!("cannot read image {}", path.display()))?;
        tracing::info!(path = %path.display(), width, height, "Loaded image");
    }

    let api = EmbedApi::new(api_url.to_string());
    let a = api
        .embed_file(image)
        .await
        .with_context(|| format!("embedding failed for {}", image.display()))?;
    let b = api
        .embed_file(reference)
        .await
        .with_context(|| format!("embedding failed for {}", reference.display()))?;

    Ok(similarity::cosine_similarity(&a, &b)?)
}
