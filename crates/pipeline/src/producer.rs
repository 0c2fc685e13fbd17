//! Generation producer: enumerate styles, generate one image per
//! prompt, enqueue one transfer order per image.
//!
//! The producer is strictly sequential. Prompt-set and generation
//! failures abort the whole run; only the transfer stage downstream is
//! allowed to fail per-item.

use std::path::PathBuf;

use restyle_core::config::{OverwritePolicy, RunConfig};
use restyle_core::order::WorkOrder;
use restyle_core::prompts::{self, PromptEntry, PromptSet};
use restyle_core::{naming, CoreError};
use restyle_sd::{GenerationRequest, TextToImage};

use crate::queue::QueueSender;
use crate::PipelineError;

/// Run the full enumerate→generate→enqueue loop.
///
/// Consumes the queue sender: after the last prompt of the last style it
/// enqueues one closure sentinel per worker. Returns the number of
/// orders submitted. On error the sender is dropped unsent, which ends
/// the queue and lets the workers drain and terminate.
pub async fn produce(
    config: &RunConfig,
    backend: &dyn TextToImage,
    queue: QueueSender,
    worker_count: usize,
) -> Result<usize, PipelineError> {
    let mut submitted = 0usize;

    for style_index in 0..config.style_count {
        let (prompt_set, _output_dir) = load_style(config, style_index).await?;

        for entry in prompt_set.entries() {
            let order = generate_one(config, backend, style_index, entry).await?;
            queue.submit(order)?;
            submitted += 1;

            // Let the workers make progress before the next generation.
            tokio::time::sleep(config.yield_interval).await;
        }
    }

    tracing::info!(
        submitted,
        worker_count,
        "All prompts exhausted, signaling shutdown",
    );
    queue.shutdown(worker_count)?;

    Ok(submitted)
}

/// Load the prompt set for a style and make sure its output directory
/// exists. Shared by the pipeline and serial drivers.
pub(crate) async fn load_style(
    config: &RunConfig,
    style_index: u32,
) -> Result<(PromptSet, PathBuf), PipelineError> {
    let path = naming::prompt_set_path(&config.dataset_root, style_index);
    let prompt_set = prompts::load_prompt_set(&path).await?;
    tracing::info!(style_index, prompts = prompt_set.len(), "Loaded prompt set");

    let output_dir = naming::style_output_dir(&config.save_dir, style_index);
    tokio::fs::create_dir_all(&output_dir).await?;

    Ok((prompt_set, output_dir))
}

/// Generate and persist one image, returning the transfer order for it.
pub(crate) async fn generate_one(
    config: &RunConfig,
    backend: &dyn TextToImage,
    style_index: u32,
    entry: &PromptEntry,
) -> Result<WorkOrder, PipelineError> {
    let content_image = naming::content_image_path(&config.save_dir, style_index, &entry.text);

    if config.overwrite == OverwritePolicy::Refuse
        && tokio::fs::try_exists(&content_image).await?
    {
        return Err(CoreError::WouldOverwrite(content_image).into());
    }

    tracing::info!(
        style_index,
        prompt_id = %entry.id,
        prompt = %entry.text,
        "Running prompt",
    );

    let request = GenerationRequest::from_params(&entry.text, &config.generation);
    let image = backend
        .generate(&request)
        .await
        .map_err(|source| PipelineError::Generation {
            style_index,
            prompt_id: entry.id.clone(),
            source,
        })?;

    image
        .save(&content_image)
        .await
        .map_err(|source| PipelineError::SaveImage {
            path: content_image.clone(),
            source,
        })?;

    Ok(WorkOrder {
        style_index,
        prompt_id: entry.id.clone(),
        content_image,
        style_folder: config.dataset_root.clone(),
        output_dir: naming::style_output_dir(&config.save_dir, style_index),
        result_filename: naming::image_filename(&entry.text),
    })
}
