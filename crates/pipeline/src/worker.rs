//! Transfer workers: consume orders, run the external command, record
//! the outcome.
//!
//! Each worker owns one compute device for the whole run and pins every
//! spawned process to it via the configured environment variable. A
//! failing subprocess is logged and recorded, never escalated; the
//! worker immediately asks for its next item.

use std::time::Instant;

use tokio::process::Command;

use restyle_core::config::TransferSpec;
use restyle_core::order::{TransferCommand, WorkOrder};

use crate::queue::{QueueItem, QueueReceiver};
use crate::report::TransferOutcome;

/// Per-worker immutable context.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    /// 0-based index within the worker pool.
    pub worker_id: usize,
    /// Device this worker's subprocesses are pinned to.
    pub device: u32,
    pub spec: TransferSpec,
}

/// Worker loop: dequeue until this worker's closure sentinel arrives.
///
/// Returns every outcome this worker produced. A `None` from the queue
/// (producer dropped on the abort path) terminates the loop the same
/// way a sentinel does.
pub async fn run_worker(ctx: WorkerContext, queue: QueueReceiver) -> Vec<TransferOutcome> {
    let mut outcomes = Vec::new();
    loop {
        match queue.recv().await {
            Some(QueueItem::Job(order)) => {
                let outcome = run_transfer(&ctx, &order).await;
                outcomes.push(outcome);
            }
            Some(QueueItem::Shutdown) => {
                tracing::info!(
                    worker_id = ctx.worker_id,
                    device = ctx.device,
                    consumed = outcomes.len(),
                    "Worker received shutdown signal",
                );
                break;
            }
            None => {
                tracing::warn!(
                    worker_id = ctx.worker_id,
                    device = ctx.device,
                    "Work queue closed without a shutdown signal",
                );
                break;
            }
        }
    }
    outcomes
}

/// Execute one order's transfer command on this worker's device.
pub async fn run_transfer(ctx: &WorkerContext, order: &WorkOrder) -> TransferOutcome {
    let command = order.transfer_command(&ctx.spec);

    tracing::info!(
        worker_id = ctx.worker_id,
        device = ctx.device,
        style_index = order.style_index,
        prompt_id = %order.prompt_id,
        command = %command.display(),
        "Consumed transfer order",
    );

    let outcome = execute_command(ctx, order, &command).await;

    if !outcome.stdout.is_empty() {
        tracing::info!(worker_id = ctx.worker_id, "Stdout: {}", outcome.stdout.trim());
    }
    if !outcome.stderr.is_empty() {
        tracing::info!(worker_id = ctx.worker_id, "Stderr: {}", outcome.stderr.trim());
    }
    if !outcome.success() {
        tracing::error!(
            worker_id = ctx.worker_id,
            device = ctx.device,
            style_index = order.style_index,
            prompt_id = %order.prompt_id,
            exit_code = ?outcome.exit_code,
            "Transfer command failed",
        );
    }

    outcome
}

/// Spawn the command, wait for it, and capture both streams in full.
///
/// A spawn failure (program not found, permission denied) is folded into
/// the outcome with the error text in `stderr`, and the worker carries
/// on either way.
async fn execute_command(
    ctx: &WorkerContext,
    order: &WorkOrder,
    command: &TransferCommand,
) -> TransferOutcome {
    let start = Instant::now();

    let result = Command::new(&command.program)
        .args(&command.args)
        .env(&ctx.spec.device_env, ctx.device.to_string())
        .output()
        .await;

    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(output) => TransferOutcome {
            style_index: order.style_index,
            prompt_id: order.prompt_id.clone(),
            worker_id: ctx.worker_id,
            device: ctx.device,
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms,
        },
        Err(e) => TransferOutcome {
            style_index: order.style_index,
            prompt_id: order.prompt_id.clone(),
            worker_id: ctx.worker_id,
            device: ctx.device,
            exit_code: None,
            stdout: String::new(),
            stderr: format!("failed to spawn '{}': {e}", command.program),
            duration_ms,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
