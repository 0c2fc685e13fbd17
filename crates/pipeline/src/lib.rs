//! The generation/transfer production pipeline.
//!
//! One producer task enumerates styles and prompts, generates a content
//! image per prompt through the [`restyle_sd::TextToImage`] backend, and
//! enqueues a transfer order for each. A pool of workers, one per
//! non-primary compute device, consumes the orders and runs the
//! external style-transfer command, device-pinned via the configured
//! environment variable. Every subprocess outcome is captured and
//! aggregated into a [`report::RunReport`].

use std::path::PathBuf;

use restyle_core::CoreError;
use restyle_sd::SdApiError;

pub mod producer;
pub mod queue;
pub mod report;
pub mod run;
pub mod worker;

pub use queue::{work_queue, QueueItem, QueueReceiver, QueueSender};
pub use report::{RunReport, TransferOutcome};
pub use run::{run_pipeline, run_serial};

/// Errors that abort a batch run.
///
/// Transfer subprocess failures are deliberately absent: a non-zero exit
/// is recorded in the run report and the run continues.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Generation failed for style {style_index} prompt '{prompt_id}': {source}")]
    Generation {
        style_index: u32,
        prompt_id: String,
        #[source]
        source: SdApiError,
    },

    #[error("Failed to save generated image {path}: {source}")]
    SaveImage {
        path: PathBuf,
        #[source]
        source: SdApiError,
    },

    #[error("Work queue closed before all orders were submitted")]
    QueueClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
