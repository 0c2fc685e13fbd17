//! Environment-driven configuration for the batch driver.
//!
//! All parameters come from environment variables, read once at startup
//! into an immutable [`BatchSettings`]. The lookup is injected so tests
//! can feed a plain map instead of mutating the process environment.

use std::path::PathBuf;
use std::time::Duration;

use restyle_core::config::{
    GenerationParams, OverwritePolicy, RunConfig, TransferSpec, DEFAULT_DEVICE_ENV,
    DEFAULT_HEIGHT, DEFAULT_STEPS, DEFAULT_TRANSFER_PROGRAM, DEFAULT_WIDTH,
    DEFAULT_YIELD_INTERVAL_MS,
};
use restyle_core::CoreError;

/// Default number of style indices, matching the reference datasets.
pub const DEFAULT_STYLE_COUNT: u32 = 28;

/// Default device list: one generation device plus three workers.
pub const DEFAULT_DEVICES: &str = "0,1,2,3";

/// Which driver to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// Queued producer/worker pipeline across all configured devices.
    Pipeline,
    /// Sequential generate-then-transfer on a single device.
    Serial,
}

impl BatchMode {
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "pipeline" => Ok(Self::Pipeline),
            "serial" => Ok(Self::Serial),
            other => Err(CoreError::Validation(format!(
                "Unknown batch mode '{other}'. Valid modes: pipeline, serial"
            ))),
        }
    }
}

/// Everything the batch driver needs, resolved from the environment.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub mode: BatchMode,
    /// Base URL of the text-to-image sidecar.
    pub api_url: String,
    pub run: RunConfig,
}

/// Resolve [`BatchSettings`] through `lookup`.
///
/// | Variable            | Required | Default                | Description                              |
/// |---------------------|----------|------------------------|------------------------------------------|
/// | `SD_API_URL`        | yes      | --                     | Sidecar base URL, e.g. `http://host:7860`|
/// | `DATASET_ROOT`      | yes      | --                     | Style dataset root                       |
/// | `SAVE_DIR`          | yes      | --                     | Output tree root                         |
/// | `BATCH_MODE`        | no       | `pipeline`             | `pipeline` or `serial`                   |
/// | `STYLE_COUNT`       | no       | `28`                   | Style indices to enumerate               |
/// | `DEVICES`           | no       | `0,1,2,3`              | Comma-separated device indices           |
/// | `GEN_STEPS`         | no       | `50`                   | Denoising steps per image                |
/// | `GEN_WIDTH`         | no       | `512`                  | Image width                              |
/// | `GEN_HEIGHT`        | no       | `512`                  | Image height                             |
/// | `GEN_SEED`          | no       | random per run         | Fixed generation seed                    |
/// | `TRANSFER_PROGRAM`  | no       | `python3`              | Transfer interpreter/executable          |
/// | `TRANSFER_SCRIPT`   | no       | --                     | Transfer script path                     |
/// | `DEVICE_ENV`        | no       | `CUDA_VISIBLE_DEVICES` | Device-visibility variable               |
/// | `YIELD_INTERVAL_MS` | no       | `100`                  | Producer pause between orders            |
/// | `OVERWRITE_POLICY`  | no       | `overwrite`            | `overwrite` or `refuse`                  |
pub fn load_settings(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<BatchSettings, CoreError> {
    let mode = match lookup("BATCH_MODE") {
        Some(raw) => BatchMode::parse(&raw)?,
        None => BatchMode::Pipeline,
    };

    let api_url = required(&lookup, "SD_API_URL")?;
    let dataset_root = PathBuf::from(required(&lookup, "DATASET_ROOT")?);
    let save_dir = PathBuf::from(required(&lookup, "SAVE_DIR")?);

    let run = RunConfig {
        dataset_root,
        save_dir,
        style_count: parsed(&lookup, "STYLE_COUNT", DEFAULT_STYLE_COUNT)?,
        devices: parse_devices(
            &lookup("DEVICES").unwrap_or_else(|| DEFAULT_DEVICES.to_string()),
        )?,
        generation: GenerationParams {
            steps: parsed(&lookup, "GEN_STEPS", DEFAULT_STEPS)?,
            width: parsed(&lookup, "GEN_WIDTH", DEFAULT_WIDTH)?,
            height: parsed(&lookup, "GEN_HEIGHT", DEFAULT_HEIGHT)?,
            seed: optional_parsed(&lookup, "GEN_SEED")?,
        },
        transfer: TransferSpec {
            program: lookup("TRANSFER_PROGRAM")
                .unwrap_or_else(|| DEFAULT_TRANSFER_PROGRAM.to_string()),
            script: lookup("TRANSFER_SCRIPT").map(PathBuf::from),
            device_env: lookup("DEVICE_ENV").unwrap_or_else(|| DEFAULT_DEVICE_ENV.to_string()),
        },
        yield_interval: Duration::from_millis(parsed(
            &lookup,
            "YIELD_INTERVAL_MS",
            DEFAULT_YIELD_INTERVAL_MS,
        )?),
        overwrite: match lookup("OVERWRITE_POLICY") {
            Some(raw) => OverwritePolicy::parse(&raw)?,
            None => OverwritePolicy::Overwrite,
        },
    };

    run.validate()?;

    Ok(BatchSettings { mode, api_url, run })
}

// ---------------------------------------------------------------------------
// Lookup helpers
// ---------------------------------------------------------------------------

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<String, CoreError> {
    lookup(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            CoreError::Validation(format!("{name} environment variable is required"))
        })
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, CoreError> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CoreError::Validation(format!("{name} has an invalid value: '{raw}'"))),
    }
}

fn optional_parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, CoreError> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CoreError::Validation(format!("{name} has an invalid value: '{raw}'"))),
    }
}

/// Parse a comma-separated device list like `0,1,2,3`.
fn parse_devices(raw: &str) -> Result<Vec<u32>, CoreError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>().map_err(|_| {
                CoreError::Validation(format!("DEVICES contains an invalid device index: '{s}'"))
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
