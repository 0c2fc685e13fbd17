//! `restyle-smoke` -- one-shot generation sanity check.
//!
//! Submits a fixed prompt twice with fixed seeds and writes both images
//! to disk. Run it after (re)deploying the sidecar to confirm the
//! generation path end to end before launching a batch.
//!
//! # Environment variables
//!
//! | Variable     | Required | Default | Description                 |
//! |--------------|----------|---------|-----------------------------|
//! | `SD_API_URL` | yes      | --      | Sidecar base URL            |
//! | `SMOKE_DIR`  | no       | `.`     | Where the images are written|

use std::path::PathBuf;

use restyle_core::config::GenerationParams;
use restyle_sd::{GenerationRequest, SdApi, TextToImage};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SMOKE_PROMPT: &str = "a photo of cute dog";
const SMOKE_SEEDS: [u64; 2] = [20, 30];

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "restyle_sd=info,restyle_smoke=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let api_url = std::env::var("SD_API_URL").unwrap_or_else(|_| {
        tracing::error!("SD_API_URL environment variable is required");
        std::process::exit(2);
    });
    let out_dir = PathBuf::from(std::env::var("SMOKE_DIR").unwrap_or_else(|_| ".".to_string()));

    let api = SdApi::new(api_url);
    let params = GenerationParams::default();

    for (i, seed) in SMOKE_SEEDS.into_iter().enumerate() {
        let mut request = GenerationRequest::from_params(SMOKE_PROMPT, &params);
        request.seed = Some(seed);

        let image = match api.generate(&request).await {
            Ok(image) => image,
            Err(e) => {
                tracing::error!(seed, error = %e, "Smoke generation failed");
                std::process::exit(1);
            }
        };

        let path = out_dir.join(format!("smoke_{i}.png"));
        if let Err(e) = image.save(&path).await {
            tracing::error!(path = %path.display(), error = %e, "Failed to write smoke image");
            std::process::exit(1);
        }
        tracing::info!(seed, path = %path.display(), "Smoke image written");
    }
}
