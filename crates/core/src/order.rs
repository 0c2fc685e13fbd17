//! Work orders for the style-transfer stage.
//!
//! A [`WorkOrder`] fully describes one external transfer invocation: it
//! is created by the generation producer, crosses the work queue once,
//! and is turned into an executable [`TransferCommand`] by the consuming
//! worker. Orders are never mutated after construction.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::TransferSpec;

/// One queued style-transfer invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    /// Style/reference dataset index this order belongs to.
    pub style_index: u32,
    /// Identifier of the prompt within its prompt set.
    pub prompt_id: String,
    /// Generated content image the transfer reads.
    pub content_image: PathBuf,
    /// Root of the style dataset (the transfer script resolves the
    /// reference images for `style_index` inside it).
    pub style_folder: PathBuf,
    /// Directory the transfer writes its result into.
    pub output_dir: PathBuf,
    /// Filename of the transfer result inside `output_dir`.
    pub result_filename: String,
}

impl WorkOrder {
    /// Build the executable command for this order.
    pub fn transfer_command(&self, spec: &TransferSpec) -> TransferCommand {
        let mut args = Vec::with_capacity(11);
        if let Some(script) = &spec.script {
            args.push(script.display().to_string());
        }
        args.push("--cnt_fn".to_string());
        args.push(self.content_image.display().to_string());
        args.push("--sty_folder".to_string());
        args.push(self.style_folder.display().to_string());
        args.push("--sty_no".to_string());
        args.push(self.style_index.to_string());
        args.push("--save_dir".to_string());
        args.push(self.output_dir.display().to_string());
        args.push("--result_fn".to_string());
        args.push(self.result_filename.clone());

        TransferCommand {
            program: spec.program.clone(),
            args,
        }
    }
}

/// A fully-formed external invocation: program plus argument vector.
///
/// Arguments are kept as a vector rather than a shell string so the
/// worker can spawn the process without going through a shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl TransferCommand {
    /// One-line rendering for logs.
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.contains(' ') {
                line.push('"');
                line.push_str(arg);
                line.push('"');
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
