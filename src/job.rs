//! One upscale invocation: engine setup, tiled run, result encoding.

use std::any::TypeId;
use std::path::PathBuf;
use std::time::Instant;

use iced::futures::SinkExt;
use iced::{subscription, Subscription};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::cancel::{CancelOnDrop, CancellationToken};
use crate::error::Result;
use crate::logging::{log_error, log_message};
use crate::progress::PatchEvent;
use crate::source::ImageSource;
use crate::tiling::{upscale_tiled, PatchGrid, TilingOptions};
use crate::upscaler::{engine_for, ModelInfo};

#[derive(Debug, Clone)]
pub struct UpscaleRequest {
    pub id: u64,
    pub source: ImageSource,
    pub model: ModelInfo,
    pub tiling: TilingOptions,
    pub models_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub enum JobEvent {
    Started { rows: u32, columns: u32 },
    /// One or more patches, oldest first.
    Patches(Vec<PatchEvent>),
    Finished(std::result::Result<ImageSource, String>),
}

pub fn run(request: &UpscaleRequest, cancel: &CancellationToken, emit: &mut dyn FnMut(JobEvent)) -> Result<ImageSource> {
    let start = Instant::now();
    let label = request
        .source
        .origin()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "image".to_string());
    log_message(&format!("=== Upscaling {} with {} ===", label, request.model.name));

    let mut engine = engine_for(&request.model, &request.models_dir)?;
    log_message(&format!("Engine ready: {} ({}x)", engine.name(), engine.scale()));

    let (w, h) = request.source.dimensions();
    let grid = PatchGrid::new(w, h, request.tiling);
    emit(JobEvent::Started {
        rows: grid.rows(),
        columns: grid.columns(),
    });

    let output = upscale_tiled(
        request.source.image().as_ref(),
        request.tiling,
        engine.as_mut(),
        cancel,
        &mut |event| emit(JobEvent::Patches(vec![event])),
    )?;
    let result = ImageSource::from_image(output)?;

    let (out_w, out_h) = result.dimensions();
    log_message(&format!(
        "✓ {}x{} -> {}x{} in {:.2}s",
        w,
        h,
        out_w,
        out_h,
        start.elapsed().as_secs_f32()
    ));
    Ok(result)
}

/// Like [`run`], but always finishes with a `Finished` event.
pub fn execute(request: &UpscaleRequest, cancel: &CancellationToken, emit: &mut dyn FnMut(JobEvent)) {
    let result = run(request, cancel, &mut *emit).map_err(|e| {
        log_error(&format!("✗ Upscale failed: {}", e));
        e.to_string()
    });
    emit(JobEvent::Finished(result));
}

/// Upper bound on patches folded into one message.
const MAX_BATCH: usize = 256;

/// Fold patch events already queued behind `first` into it, so a worker that
/// outpaces the UI costs one redraw per batch rather than one per patch.
/// Returns the batch and the first non-patch event pulled off the queue, if any.
fn coalesce(first: JobEvent, rx: &mut UnboundedReceiver<JobEvent>) -> (JobEvent, Option<JobEvent>) {
    let JobEvent::Patches(mut batch) = first else {
        return (first, None);
    };
    while batch.len() < MAX_BATCH {
        match rx.try_recv() {
            Ok(JobEvent::Patches(more)) => batch.extend(more),
            Ok(other) => return (JobEvent::Patches(batch), Some(other)),
            Err(_) => break,
        }
    }
    (JobEvent::Patches(batch), None)
}

/// Runs `request` on a blocking worker and streams its events. Dropping the
/// subscription cancels the worker at the next patch boundary.
pub fn subscription(request: UpscaleRequest) -> Subscription<(u64, JobEvent)> {
    struct Upscale;
    let id = request.id;

    subscription::channel((TypeId::of::<Upscale>(), id), 100, move |mut output| async move {
        let cancel = CancellationToken::new();
        let _guard = CancelOnDrop(cancel.clone());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let worker = tokio::task::spawn_blocking(move || {
            execute(&request, &cancel, &mut |event| {
                let _ = tx.send(event);
            })
        });

        let mut held = None;
        loop {
            let next = match held.take() {
                Some(event) => event,
                None => match rx.recv().await {
                    Some(event) => event,
                    None => break,
                },
            };
            let (event, rest) = coalesce(next, &mut rx);
            held = rest;
            let _ = output.send((id, event)).await;
        }
        if let Err(e) = worker.await {
            log_error(&format!("Task join error: {}", e));
            let _ = output.send((id, JobEvent::Finished(Err(e.to_string())))).await;
        }

        loop {
            iced::futures::future::pending::<()>().await;
        }
    })
}
