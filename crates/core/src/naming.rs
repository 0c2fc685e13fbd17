//! Dataset and output path conventions.
//!
//! Style `i` reads from `<dataset_root>/<i formatted {:02}>/prompt.json`
//! and writes under `<save_dir>/<i formatted {:02}>/`. Generated images
//! are named after the prompt text verbatim, so prompts double as
//! filenames and must be checked before use.

use std::path::{Path, PathBuf};

use crate::error::CoreError;

/// Longest prompt accepted as an output filename stem. Keeps the final
/// `<prompt>.png` under common filesystem name limits.
pub const MAX_PROMPT_LEN: usize = 200;

/// Directory name for a style index, zero-padded to two digits.
pub fn style_dir_name(style_index: u32) -> String {
    format!("{style_index:02}")
}

/// Path to the prompt set for a style index.
pub fn prompt_set_path(dataset_root: &Path, style_index: u32) -> PathBuf {
    dataset_root
        .join(style_dir_name(style_index))
        .join("prompt.json")
}

/// Per-style output directory under the save root.
pub fn style_output_dir(save_dir: &Path, style_index: u32) -> PathBuf {
    save_dir.join(style_dir_name(style_index))
}

/// Filename of both the generated content image and the transfer result.
pub fn image_filename(prompt: &str) -> String {
    format!("{prompt}.png")
}

/// Full path of the generated content image for a prompt.
pub fn content_image_path(save_dir: &Path, style_index: u32, prompt: &str) -> PathBuf {
    style_output_dir(save_dir, style_index).join(image_filename(prompt))
}

/// Check that a prompt is usable as a filename stem.
///
/// Prompts become filenames verbatim, so path separators, NUL bytes, and
/// overlong text would escape the output directory or fail at write time.
pub fn validate_prompt_text(prompt: &str) -> Result<(), CoreError> {
    if prompt.trim().is_empty() {
        return Err(CoreError::Validation(
            "Prompt must not be empty".to_string(),
        ));
    }
    if prompt.len() > MAX_PROMPT_LEN {
        return Err(CoreError::Validation(format!(
            "Prompt exceeds {MAX_PROMPT_LEN} bytes and cannot be used as a filename"
        )));
    }
    if prompt.contains(['/', '\\', '\0']) {
        return Err(CoreError::Validation(format!(
            "Prompt '{prompt}' contains a path separator or NUL byte"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
