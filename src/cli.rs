// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for barcode scanning
//!
//! This module provides command-line functionality for:
//! - Scanning a fixed sequence of images
//! - Watching a looping image feed until interrupted
//! - Printing the effective configuration

use barcode_scanner::app::frame_processor::BarcodeEvent;
use barcode_scanner::backends::camera::format_converters::load_yuv420;
use barcode_scanner::backends::camera::types::YuvFrame;
use barcode_scanner::constants::EVENT_DRAIN_TIMEOUT;
use barcode_scanner::errors::AppError;
use barcode_scanner::{Config, ScanSession};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Feed images through a scan session and print every event
///
/// Frames use the configured orientation and interval.
pub fn scan(
    images: &[PathBuf],
    repeat: u32,
    config: Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let frames = load_frames(images)?;
    let interval = config.frame_interval();

    let rt = tokio::runtime::Runtime::new()?;
    let (sender, receiver) = mpsc::unbounded_channel();
    let printer = rt.spawn(print_events(receiver));

    let session = ScanSession::new(config)?;
    session.start_scanning(Arc::new(sender));

    for round in 0..repeat {
        debug!(round, "Feeding image list");
        for frame in &frames {
            submit(&session, frame);
            std::thread::sleep(interval);
        }
    }

    // Let the worker finish the last frame before tearing down
    std::thread::sleep(EVENT_DRAIN_TIMEOUT);
    session.close();

    drain(&rt, printer)
}

/// Loop images through a scan session until Ctrl-C
pub fn watch(images: &[PathBuf], config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let frames = load_frames(images)?;
    let interval = config.frame_interval();

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(false, Ordering::SeqCst);
    })?;

    let rt = tokio::runtime::Runtime::new()?;
    let (sender, receiver) = mpsc::unbounded_channel();
    let printer = rt.spawn(print_events(receiver));

    let session = ScanSession::new(config)?;
    session.start_scanning(Arc::new(sender));
    println!("Watching {} image(s), press Ctrl-C to stop", frames.len());

    'feed: loop {
        for frame in &frames {
            if !running.load(Ordering::SeqCst) {
                break 'feed;
            }
            submit(&session, frame);
            std::thread::sleep(interval);
        }
    }

    info!("Interrupted, shutting down");
    session.close();
    drain(&rt, printer)
}

/// Print the effective configuration as JSON
pub fn print_config(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(config)?);
    if let Some(path) = Config::default_path() {
        debug!(path = %path.display(), "Default config location");
    }
    Ok(())
}

fn submit(session: &ScanSession, frame: &YuvFrame) {
    if !session.submit_frame(frame) {
        debug!("Frame not accepted by scanner");
    }
}

/// Print sink events until every sender is gone
async fn print_events(mut receiver: mpsc::UnboundedReceiver<BarcodeEvent>) {
    while let Some(event) = receiver.recv().await {
        let line = serde_json::json!({
            "id": event.id,
            "value": event.value,
            "received_at": Local::now().to_rfc3339(),
        });
        println!("{}", line);
    }
}

/// Wait for the printer to see the channel close
fn drain(
    rt: &tokio::runtime::Runtime,
    printer: JoinHandle<()>,
) -> Result<(), Box<dyn std::error::Error>> {
    match rt.block_on(async { tokio::time::timeout(EVENT_DRAIN_TIMEOUT, printer).await }) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err("Timed out waiting for barcode events".into()),
    }
}

/// Load all images up front so decoding does not pace the feed
fn load_frames(paths: &[PathBuf]) -> Result<Vec<YuvFrame>, Box<dyn std::error::Error>> {
    let mut frames = Vec::with_capacity(paths.len());
    for path in paths {
        let frame = load_frame(path)?;
        info!(
            path = %path.display(),
            width = frame.width,
            height = frame.height,
            "Loaded frame"
        );
        frames.push(frame);
    }
    Ok(frames)
}

fn load_frame(path: &Path) -> Result<YuvFrame, AppError> {
    load_yuv420(path).map_err(|e| AppError::Image(format!("{}: {}", path.display(), e)))
}
