//! `restyle-batch` -- batch style-transfer production driver.
//!
//! Enumerates style datasets, generates one image per prompt through
//! the text-to-image sidecar, and runs the external style-transfer
//! command for each, queued across devices (`pipeline` mode) or inline
//! on one device (`serial` mode). Prints the run report as JSON and
//! exits non-zero when the run aborted or any transfer failed.
//!
//! Configuration is environment-driven; see `restyle_batch::env` for
//! the variable table.

use restyle_batch::env::{load_settings, BatchMode};
use restyle_pipeline::{run_pipeline, run_serial};
use restyle_sd::SdApi;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "restyle_batch=info,restyle_pipeline=info,restyle_sd=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut settings = match load_settings(|name| std::env::var(name).ok()) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(2);
        }
    };

    // Pin the seed before the run starts so the log line is enough to
    // reproduce it.
    let seed = settings
        .run
        .generation
        .seed
        .unwrap_or_else(|| rand::random());
    settings.run.generation.seed = Some(seed);

    if let Err(e) = match settings.mode {
        BatchMode::Pipeline => settings.run.validate_for_pipeline(),
        BatchMode::Serial => settings.run.validate(),
    } {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(2);
    }

    tracing::info!(
        mode = ?settings.mode,
        api_url = %settings.api_url,
        styles = settings.run.style_count,
        devices = ?settings.run.devices,
        seed,
        "Starting restyle-batch",
    );

    let backend = SdApi::new(settings.api_url.clone());

    let result = match settings.mode {
        BatchMode::Pipeline => run_pipeline(&settings.run, &backend).await,
        BatchMode::Serial => run_serial(&settings.run, &backend).await,
    };

    match result {
        Ok(report) => {
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::error!(error = %e, "Failed to serialize run report"),
            }
            if report.is_clean() {
                tracing::info!(summary = %report.summary(), "Run complete");
            } else {
                tracing::error!(summary = %report.summary(), "Run finished with failures");
                std::process::exit(1);
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Run aborted");
            std::process::exit(1);
        }
    }
}
