//! annotate_stream - video mode.
//!
//! Feeds frames from a directory (or a `stub://WxH/N` source) through the
//! video pipeline and writes every presented frame as `frame_<n>.png`.
//! With `--nonblocking`, frames that arrive while the worker is busy are
//! dropped instead of waited on. Unreadable frame files are skipped. Ctrl-C
//! stops reading new frames; frames already accepted are still written.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use detection_overlay::{open_source, OverlayConfig, PresentedFrame, SubmitError, VideoPipeline};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(
    name = "annotate_stream",
    about = "Annotate a sequence of frames with detector output"
)]
struct Args {
    /// Directory of frames, or stub://WxH/N for synthetic frames
    #[arg(long, value_name = "SOURCE")]
    frames: String,

    /// Output directory for annotated frames
    #[arg(long, value_name = "DIR")]
    out: PathBuf,

    /// Drop frames while the pipeline is busy instead of waiting
    #[arg(long)]
    nonblocking: bool,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

#[derive(Debug, Default)]
struct Presented {
    written: u64,
    fallbacks: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = ui::Ui::from_args(Some(&args.ui), std::io::stderr().is_terminal());

    let config = OverlayConfig::load()?;
    let model = {
        let _stage = ui.stage("Initialize model");
        config.initialize_model()
    };
    let mut source = open_source(&args.frames)?;
    log::info!("reading frames from {}", source.describe());

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;

    let (pipeline, presented) =
        VideoPipeline::spawn(&model, config.build_resolver()?, config.build_renderer()?)?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;
    }

    let out_dir = args.out.clone();
    let progress = ui.frame_counter();
    let presenter = std::thread::spawn(move || present(presented, &out_dir, progress));

    let mut submitted = 0u64;
    let mut dropped = 0u64;
    while !stop.load(Ordering::SeqCst) {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                log::error!("frame source failed: {:#}", e);
                break;
            }
        };
        let result = if args.nonblocking {
            pipeline.try_submit(frame)
        } else {
            pipeline.submit(frame)
        };
        match result {
            Ok(()) => submitted += 1,
            Err(SubmitError::Busy(_)) => dropped += 1,
            Err(SubmitError::Closed(_)) => {
                log::warn!("pipeline closed; no more frames will be submitted");
                break;
            }
        }
    }
    if stop.load(Ordering::SeqCst) {
        log::info!("interrupted; finishing frames in flight");
    }

    let processed = pipeline.finish()?;
    let summary = presenter
        .join()
        .map_err(|_| anyhow!("presentation thread panicked"))??;

    log::info!(
        "{} frames submitted, {} dropped, {} processed, {} written ({} unannotated) to {}",
        submitted,
        dropped,
        processed,
        summary.written,
        summary.fallbacks,
        args.out.display()
    );
    Ok(())
}

/// Presentation side: writes each message in arrival order.
fn present(
    presented: Receiver<PresentedFrame>,
    out_dir: &Path,
    mut progress: ui::FrameProgress,
) -> Result<Presented> {
    let mut summary = Presented::default();
    for frame in presented {
        let path = out_dir.join(format!("frame_{}.png", frame.frame_number));
        frame
            .image
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        summary.written += 1;
        if !frame.annotated {
            summary.fallbacks += 1;
        }
        log::debug!(
            "frame {}: {} detections -> {}",
            frame.frame_number,
            frame.detections,
            path.display()
        );
        progress.update(frame.frame_number);
    }
    progress.finish();
    Ok(summary)
}
