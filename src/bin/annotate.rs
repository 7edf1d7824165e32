//! annotate - draw detections over a single image.
//!
//! Loads the image upright (EXIF orientation applied), runs the configured
//! detector once, and writes the annotated result as PNG. A frame dropped
//! because inference failed is logged and nothing is written.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use detection_overlay::{load_upright, OverlayConfig, StillPipeline};

#[path = "../ui.rs"]
#[allow(dead_code)]
mod ui;

#[derive(Parser, Debug)]
#[command(name = "annotate", about = "Annotate one image with detector output")]
struct Args {
    /// Source image (PNG or JPEG)
    #[arg(long, value_name = "PATH")]
    input: PathBuf,

    /// Where to write the annotated PNG
    #[arg(long, value_name = "PATH")]
    output: PathBuf,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
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
    let mut pipeline = StillPipeline::new(
        model,
        config.build_resolver()?,
        config.build_renderer()?,
    );

    let image = {
        let _stage = ui.stage("Load image");
        load_upright(&args.input)?
    };

    let annotated = {
        let _stage = ui.stage("Annotate");
        pipeline.annotate(&image)?
    };

    let Some(annotated) = annotated else {
        log::warn!(
            "no annotated image for {}; nothing written",
            args.input.display()
        );
        return Ok(());
    };

    {
        let _stage = ui.stage("Write output");
        annotated
            .save(&args.output)
            .with_context(|| format!("failed to write {}", args.output.display()))?;
    }
    log::info!("wrote {}", args.output.display());
    Ok(())
}
