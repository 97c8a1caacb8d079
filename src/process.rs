//! Batch orchestration: one source, many transforms.
//!
//! The source is decoded exactly once. Every transform then gets its own
//! clone of the decode handle, so transforms never see each other's queued
//! steps. Each clone runs Composer → Dispatcher on the rayon pool.
//!
//! ## Failure model
//!
//! ```text
//! source fails to decode   → ProcessError::Decode, nothing written
//! one transform fails      → Err(TransformFailure) in its slot, others unaffected
//! ```
//!
//! Outcomes come back in request order regardless of completion order.
//!
//! ## Progress
//!
//! Pass a channel sender to receive a [`ProcessEvent`] per finished
//! transform; the CLI prints them from a separate thread as they arrive.

use crate::compose::compose;
use crate::compress::{NativeRecompressor, Recompressor};
use crate::config::{ProcessingConfig, effective_threads};
use crate::dispatch::{TransformError, dispatch};
use crate::imaging::{OutputFormat, Pipeline, TransformArgs};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to decode source image {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },
}

/// One output to produce: where it goes and how it is made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRequest {
    pub output_path: PathBuf,
    pub args: TransformArgs,
}

/// Batch-wide switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Omit the embedded ICC profile and ancillary chunks.
    pub strip_metadata: bool,
    /// Re-encode JPEG output through mozjpeg.
    pub use_mozjpeg: bool,
}

/// A transform that did not produce its output.
#[derive(Error, Debug)]
#[error("{path}: {error}", path = .request.output_path.display())]
pub struct TransformFailure {
    pub request: TransformRequest,
    #[source]
    pub error: TransformError,
}

pub type TransformOutcome = Result<TransformRequest, TransformFailure>;

/// Progress events emitted during a batch.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    BatchStarted {
        source: PathBuf,
        transform_count: usize,
    },
    TransformFinished {
        /// Position in the request list (0-based).
        index: usize,
        output_path: PathBuf,
        format: OutputFormat,
        status: TransformStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformStatus {
    Written,
    Failed(String),
}

/// Run `requests` against `source` with the in-process re-compressors.
pub fn process_batch(
    source: &Path,
    requests: &[TransformRequest],
    options: &BatchOptions,
) -> Result<Vec<TransformOutcome>, ProcessError> {
    process_batch_with(&NativeRecompressor, source, requests, options, None)
}

/// Run a batch with a specific re-compressor (allows testing with mock).
pub fn process_batch_with(
    recompressor: &impl Recompressor,
    source: &Path,
    requests: &[TransformRequest],
    options: &BatchOptions,
    events: Option<Sender<ProcessEvent>>,
) -> Result<Vec<TransformOutcome>, ProcessError> {
    let handle = Pipeline::open(source).map_err(|e| ProcessError::Decode {
        path: source.to_path_buf(),
        message: e.to_string(),
    })?;
    log::info!(
        "{}: {} transform(s), strip_metadata={}, mozjpeg={}",
        source.display(),
        requests.len(),
        options.strip_metadata,
        options.use_mozjpeg
    );

    if let Some(tx) = &events {
        tx.send(ProcessEvent::BatchStarted {
            source: source.to_path_buf(),
            transform_count: requests.len(),
        })
        .ok();
    }

    let outcomes = requests
        .par_iter()
        .enumerate()
        .map_with(events, |events, (index, request)| {
            let outcome = run_transform(&handle, request, recompressor, options);

            let status = match &outcome {
                Ok(_) => TransformStatus::Written,
                Err(failure) => {
                    log::warn!("{failure}");
                    TransformStatus::Failed(failure.error.to_string())
                }
            };
            if let Some(tx) = events {
                tx.send(ProcessEvent::TransformFinished {
                    index,
                    output_path: request.output_path.clone(),
                    format: request.args.to_format,
                    status,
                })
                .ok();
            }
            outcome
        })
        .collect();

    Ok(outcomes)
}

fn run_transform(
    handle: &Pipeline,
    request: &TransformRequest,
    recompressor: &impl Recompressor,
    options: &BatchOptions,
) -> TransformOutcome {
    let pipeline = handle.clone().keep_metadata(!options.strip_metadata);
    let composed = compose(pipeline, &request.args, options.use_mozjpeg);
    dispatch(composed, request, recompressor, options).map_err(|error| TransformFailure {
        request: request.clone(),
        error,
    })
}

/// Size the global rayon pool from processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
/// Only the first call in a process has any effect; later calls return `false`.
pub fn init_thread_pool(processing: &ProcessingConfig) -> bool {
    let threads = effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .is_ok()
}
