//! Batch drivers: the queued multi-device pipeline and the single-device
//! serial fallback.

use chrono::Utc;

use restyle_core::config::RunConfig;
use restyle_sd::TextToImage;

use crate::producer::{self, generate_one};
use crate::queue::work_queue;
use crate::report::RunReport;
use crate::worker::{run_transfer, run_worker, WorkerContext};
use crate::PipelineError;

/// Run the full pipeline: one producer, one worker per non-primary
/// device, all multiplexed on the current runtime.
///
/// Returns the run report once the producer has finished and every
/// worker has terminated. Synchronous failures (prompt sets, generation,
/// image persistence) abort the run after the workers have drained.
pub async fn run_pipeline(
    config: &RunConfig,
    backend: &dyn TextToImage,
) -> Result<RunReport, PipelineError> {
    config.validate_for_pipeline()?;

    let started_at = Utc::now();
    let (tx, rx) = work_queue();

    let worker_devices = config.worker_devices();
    tracing::info!(
        styles = config.style_count,
        workers = worker_devices.len(),
        devices = ?worker_devices,
        "Starting pipeline run",
    );

    let mut handles = Vec::with_capacity(worker_devices.len());
    for (worker_id, device) in worker_devices.iter().enumerate() {
        let ctx = WorkerContext {
            worker_id,
            device: *device,
            spec: config.transfer.clone(),
        };
        handles.push(tokio::spawn(run_worker(ctx, rx.clone())));
    }
    drop(rx);

    // On error `produce` drops the sender early, the queue ends, and the
    // join below still completes; the error is surfaced afterwards.
    let produced = producer::produce(config, backend, tx, handles.len()).await;

    let mut transfers = Vec::new();
    for (worker_id, joined) in futures::future::join_all(handles).await.into_iter().enumerate() {
        match joined {
            Ok(outcomes) => transfers.extend(outcomes),
            Err(e) => tracing::error!(worker_id, error = %e, "Worker task panicked"),
        }
    }

    let submitted = produced?;
    let report = RunReport {
        started_at,
        finished_at: Utc::now(),
        images_generated: submitted,
        orders_submitted: submitted,
        transfers,
    };
    tracing::info!(summary = %report.summary(), "Pipeline run finished");
    Ok(report)
}

/// Serial driver: same enumeration and generation, but every transfer
/// command runs inline on the first configured device instead of going
/// through the queue.
pub async fn run_serial(
    config: &RunConfig,
    backend: &dyn TextToImage,
) -> Result<RunReport, PipelineError> {
    config.validate()?;

    let started_at = Utc::now();
    let ctx = WorkerContext {
        worker_id: 0,
        device: config.devices[0],
        spec: config.transfer.clone(),
    };
    tracing::info!(
        styles = config.style_count,
        device = ctx.device,
        "Starting serial run",
    );

    let mut generated = 0usize;
    let mut transfers = Vec::new();

    for style_index in 0..config.style_count {
        let (prompt_set, _output_dir) = producer::load_style(config, style_index).await?;

        for entry in prompt_set.entries() {
            let order = generate_one(config, backend, style_index, entry).await?;
            generated += 1;
            transfers.push(run_transfer(&ctx, &order).await);
        }
    }

    let report = RunReport {
        started_at,
        finished_at: Utc::now(),
        images_generated: generated,
        orders_submitted: generated,
        transfers,
    };
    tracing::info!(summary = %report.summary(), "Serial run finished");
    Ok(report)
}
