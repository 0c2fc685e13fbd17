//! End-to-end pipeline tests.
//!
//! The generation backend is a stub that returns deterministic bytes,
//! and the transfer command is swapped for small POSIX programs
//! (`true`, `false`, `echo`), so these tests exercise the real queue,
//! producer, and worker paths without any sidecar.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use assert_matches::assert_matches;

use restyle_core::config::{GenerationParams, OverwritePolicy, RunConfig, TransferSpec};
use restyle_core::CoreError;
use restyle_pipeline::{run_pipeline, run_serial, PipelineError};
use restyle_sd::{GeneratedImage, GenerationRequest, SdApiError, TextToImage};

/// Deterministic in-memory generation backend.
struct StubBackend {
    calls: AtomicUsize,
}

impl StubBackend {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TextToImage for StubBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, SdApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GeneratedImage::from_bytes(
            format!("png:{}", request.prompt).into_bytes(),
        ))
    }
}

/// Backend whose every request fails.
struct BrokenBackend;

#[async_trait::async_trait]
impl TextToImage for BrokenBackend {
    async fn generate(&self, _request: &GenerationRequest) -> Result<GeneratedImage, SdApiError> {
        Err(SdApiError::Decode("stub failure".to_string()))
    }
}

fn config(dataset_root: &Path, save_dir: &Path, devices: Vec<u32>, program: &str) -> RunConfig {
    RunConfig {
        dataset_root: dataset_root.to_path_buf(),
        save_dir: save_dir.to_path_buf(),
        style_count: 1,
        devices,
        generation: GenerationParams::default(),
        transfer: TransferSpec {
            program: program.to_string(),
            script: None,
            device_env: "CUDA_VISIBLE_DEVICES".to_string(),
        },
        yield_interval: Duration::from_millis(1),
        overwrite: OverwritePolicy::Overwrite,
    }
}

fn write_prompts(dataset_root: &Path, style_index: u32, json: &str) {
    let dir = dataset_root.join(format!("{style_index:02}"));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("prompt.json"), json).unwrap();
}

#[tokio::test]
async fn single_prompt_produces_one_image_and_one_transfer() {
    let dataset = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_prompts(dataset.path(), 0, r#"{"0": "a cat"}"#);

    let backend = StubBackend::new();
    let cfg = config(dataset.path(), out.path(), vec![0, 1], "true");
    let report = run_pipeline(&cfg, &backend).await.unwrap();

    let image = out.path().join("00").join("a cat.png");
    assert_eq!(std::fs::read(&image).unwrap(), b"png:a cat");

    assert_eq!(backend.calls(), 1);
    assert_eq!(report.images_generated, 1);
    assert_eq!(report.orders_submitted, 1);
    assert_eq!(report.transfers.len(), 1);
    assert_eq!(report.transfers[0].style_index, 0);
    assert_eq!(report.transfers[0].prompt_id, "0");
    assert!(report.is_clean());
}

#[tokio::test]
async fn transfer_command_references_the_generated_image() {
    let dataset = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_prompts(dataset.path(), 0, r#"{"0": "a cat"}"#);

    let backend = StubBackend::new();
    // `echo` prints the order flags, exposing the exact command line.
    let cfg = config(dataset.path(), out.path(), vec![0, 1], "echo");
    let report = run_pipeline(&cfg, &backend).await.unwrap();

    let stdout = &report.transfers[0].stdout;
    assert!(stdout.contains("--cnt_fn"));
    assert!(stdout.contains("00/a cat.png"));
    assert!(stdout.contains("--sty_no 0"));
    assert!(stdout.contains("--result_fn a cat.png"));
}

#[tokio::test]
async fn every_order_is_consumed_exactly_once() {
    let dataset = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_prompts(
        dataset.path(),
        0,
        r#"{"0": "a cat", "1": "a dog", "2": "a fox"}"#,
    );
    write_prompts(
        dataset.path(),
        1,
        r#"{"0": "a boat", "1": "a tree", "2": "a lake"}"#,
    );

    let backend = StubBackend::new();
    let mut cfg = config(dataset.path(), out.path(), vec![0, 1, 2, 3], "true");
    cfg.style_count = 2;
    let report = run_pipeline(&cfg, &backend).await.unwrap();

    assert_eq!(backend.calls(), 6);
    assert_eq!(report.orders_submitted, 6);
    assert_eq!(report.transfers.len(), 6);

    let mut keys: Vec<(u32, String)> = report
        .transfers
        .iter()
        .map(|t| (t.style_index, t.prompt_id.clone()))
        .collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 6, "an order was duplicated or lost");

    // All three workers were used or at least terminated cleanly.
    assert!(report.is_clean());
}

#[tokio::test]
async fn missing_prompt_set_aborts_before_enqueueing_that_style() {
    let dataset = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_prompts(dataset.path(), 0, r#"{"0": "a cat"}"#);
    // Style 1 has no prompt.json.

    let backend = StubBackend::new();
    let mut cfg = config(dataset.path(), out.path(), vec![0, 1], "true");
    cfg.style_count = 2;

    let result = tokio::time::timeout(Duration::from_secs(30), run_pipeline(&cfg, &backend))
        .await
        .expect("run must not deadlock on the abort path");

    assert_matches!(
        result,
        Err(PipelineError::Core(CoreError::PromptSetIo { .. }))
    );
    // Style 0 completed before the abort.
    assert!(out.path().join("00").join("a cat.png").exists());
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn failing_transfers_are_reported_not_fatal() {
    let dataset = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_prompts(dataset.path(), 0, r#"{"0": "a cat", "1": "a dog"}"#);

    let backend = StubBackend::new();
    let cfg = config(dataset.path(), out.path(), vec![0, 1], "false");

    let report = tokio::time::timeout(Duration::from_secs(30), run_pipeline(&cfg, &backend))
        .await
        .expect("a failing transfer must not deadlock the worker")
        .unwrap();

    assert_eq!(report.transfers.len(), 2);
    assert_eq!(report.failed_transfers(), 2);
    assert!(!report.is_clean());
}

#[tokio::test]
async fn generation_failure_aborts_the_run() {
    let dataset = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_prompts(dataset.path(), 0, r#"{"0": "a cat"}"#);

    let cfg = config(dataset.path(), out.path(), vec![0, 1], "true");
    let result = run_pipeline(&cfg, &BrokenBackend).await;

    assert_matches!(
        result,
        Err(PipelineError::Generation { style_index: 0, .. })
    );
}

#[tokio::test]
async fn refuse_policy_aborts_instead_of_overwriting() {
    let dataset = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_prompts(dataset.path(), 0, r#"{"0": "a cat"}"#);

    let existing = out.path().join("00");
    std::fs::create_dir_all(&existing).unwrap();
    std::fs::write(existing.join("a cat.png"), b"old run").unwrap();

    let backend = StubBackend::new();
    let mut cfg = config(dataset.path(), out.path(), vec![0, 1], "true");
    cfg.overwrite = OverwritePolicy::Refuse;

    let result = run_pipeline(&cfg, &backend).await;
    assert_matches!(
        result,
        Err(PipelineError::Core(CoreError::WouldOverwrite(_)))
    );
    // The old file is untouched.
    assert_eq!(
        std::fs::read(out.path().join("00").join("a cat.png")).unwrap(),
        b"old run"
    );
}

#[tokio::test]
async fn serial_driver_produces_the_same_outputs() {
    let dataset = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_prompts(dataset.path(), 0, r#"{"0": "a cat", "1": "a dog"}"#);

    let backend = StubBackend::new();
    let cfg = config(dataset.path(), out.path(), vec![1], "true");
    let report = run_serial(&cfg, &backend).await.unwrap();

    assert!(out.path().join("00").join("a cat.png").exists());
    assert!(out.path().join("00").join("a dog.png").exists());
    assert_eq!(report.images_generated, 2);
    assert_eq!(report.orders_submitted, 2);
    assert_eq!(report.transfers.len(), 2);
    assert!(report.is_clean());
    // Everything ran on the single configured device.
    assert!(report.transfers.iter().all(|t| t.device == 1));
}
