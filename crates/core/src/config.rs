//! Run configuration: generation parameters, device assignment, and the
//! style-transfer command spec.
//!
//! Built once at process start (from the environment, see `restyle-batch`)
//! and passed by reference to every component. Nothing in here is mutated
//! after construction.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default number of denoising steps per generated image.
pub const DEFAULT_STEPS: u32 = 50;

/// Default generated image width in pixels.
pub const DEFAULT_WIDTH: u32 = 512;

/// Default generated image height in pixels.
pub const DEFAULT_HEIGHT: u32 = 512;

/// Default pause after each enqueued order, letting workers run.
pub const DEFAULT_YIELD_INTERVAL_MS: u64 = 100;

/// Default environment variable used to pin a transfer process to one device.
pub const DEFAULT_DEVICE_ENV: &str = "CUDA_VISIBLE_DEVICES";

/// Default interpreter for the transfer script.
pub const DEFAULT_TRANSFER_PROGRAM: &str = "python3";

// ---------------------------------------------------------------------------
// Generation parameters
// ---------------------------------------------------------------------------

/// Parameters forwarded to the text-to-image sidecar for every prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    pub steps: u32,
    pub width: u32,
    pub height: u32,
    /// Fixed seed for reproducible runs; `None` lets the caller pick one.
    pub seed: Option<u64>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            seed: None,
        }
    }
}

impl GenerationParams {
    /// Validate step count and image dimensions.
    ///
    /// Dimensions must be positive multiples of 8; the latent-space
    /// downscaling of the diffusion sidecar rejects anything else.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.steps == 0 {
            return Err(CoreError::Validation(
                "Generation step count must be at least 1".to_string(),
            ));
        }
        for (label, value) in [("width", self.width), ("height", self.height)] {
            if value == 0 {
                return Err(CoreError::Validation(format!(
                    "Generation {label} must be positive"
                )));
            }
            if value % 8 != 0 {
                return Err(CoreError::Validation(format!(
                    "Generation {label} must be a multiple of 8, got {value}"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Transfer command spec
// ---------------------------------------------------------------------------

/// How to invoke the external style-transfer script.
///
/// The work order supplies the per-item flags; this spec supplies the
/// interpreter, the script path, and the device-visibility variable name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferSpec {
    /// Program to execute, e.g. `python3`.
    pub program: String,
    /// Script passed as the first argument. `None` when `program` is the
    /// transfer executable itself.
    pub script: Option<PathBuf>,
    /// Environment variable carrying the assigned device index.
    pub device_env: String,
}

impl Default for TransferSpec {
    fn default() -> Self {
        Self {
            program: DEFAULT_TRANSFER_PROGRAM.to_string(),
            script: None,
            device_env: DEFAULT_DEVICE_ENV.to_string(),
        }
    }
}

impl TransferSpec {
    /// Validate the program name and device variable.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.program.trim().is_empty() {
            return Err(CoreError::Validation(
                "Transfer program must not be empty".to_string(),
            ));
        }
        if self.device_env.is_empty()
            || !self
                .device_env
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(CoreError::Validation(format!(
                "Device environment variable name '{}' is not a valid identifier",
                self.device_env
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Overwrite policy
// ---------------------------------------------------------------------------

/// What to do when a generated image would replace an existing file.
///
/// Two prompts that render to the same filename, or a re-run over an old
/// `save_dir`, hit this path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwritePolicy {
    /// Silently replace the existing file.
    Overwrite,
    /// Abort the run instead of replacing anything.
    Refuse,
}

impl OverwritePolicy {
    /// Parse from a config string (`overwrite` / `refuse`).
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "overwrite" => Ok(Self::Overwrite),
            "refuse" => Ok(Self::Refuse),
            other => Err(CoreError::Validation(format!(
                "Unknown overwrite policy '{other}'. Valid policies: overwrite, refuse"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overwrite => "overwrite",
            Self::Refuse => "refuse",
        }
    }
}

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Immutable configuration for one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Root of the style dataset; style `i` lives under `{:02}` of it.
    pub dataset_root: PathBuf,
    /// Root of the output tree; per-style directories are created inside.
    pub save_dir: PathBuf,
    /// Number of style indices to enumerate, starting at 0.
    pub style_count: u32,
    /// All compute devices available to the run. The first is reserved
    /// for the generation sidecar; the rest each get one transfer worker.
    pub devices: Vec<u32>,
    pub generation: GenerationParams,
    pub transfer: TransferSpec,
    /// Producer pause after each enqueued order.
    pub yield_interval: Duration,
    pub overwrite: OverwritePolicy,
}

impl RunConfig {
    /// Devices that get a transfer worker (everything but the first).
    pub fn worker_devices(&self) -> &[u32] {
        if self.devices.len() > 1 {
            &self.devices[1..]
        } else {
            &[]
        }
    }

    /// Validate the parts shared by both driver modes.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.style_count == 0 {
            return Err(CoreError::Validation(
                "Style count must be at least 1".to_string(),
            ));
        }
        if self.devices.is_empty() {
            return Err(CoreError::Validation(
                "At least one device must be configured".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::with_capacity(self.devices.len());
        for device in &self.devices {
            if !seen.insert(device) {
                return Err(CoreError::Validation(format!(
                    "Device {device} listed more than once"
                )));
            }
        }
        self.generation.validate()?;
        self.transfer.validate()?;
        Ok(())
    }

    /// Validate for the queued pipeline mode, which needs at least one
    /// worker device beyond the generation device.
    pub fn validate_for_pipeline(&self) -> Result<(), CoreError> {
        self.validate()?;
        if self.worker_devices().is_empty() {
            return Err(CoreError::Validation(format!(
                "Pipeline mode needs at least 2 devices, got {}",
                self.devices.len()
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
