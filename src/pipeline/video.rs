use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{anyhow, Result};
use image::RgbaImage;
use thiserror::Error;

use super::{annotate_once, FrameCounter};
use crate::detect::{ModelInit, SharedBackend};
use crate::error::OverlayResult;
use crate::frame::Frame;
use crate::render::OverlayRenderer;
use crate::resolve::DetectionResolver;

const PRESENT_SLOTS: usize = 1;

/// Message from the pipeline worker to the presentation side.
#[derive(Debug)]
pub struct PresentedFrame {
    /// Frame counter value after this frame, starting at 1.
    pub frame_number: u64,
    /// Annotated image, or the untouched source when `annotated` is false.
    pub image: RgbaImage,
    pub annotated: bool,
    pub detections: usize,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    /// The worker is still processing the previous frame.
    #[error("pipeline is busy with the previous frame")]
    Busy(Frame),
    /// The worker has stopped.
    #[error("pipeline worker has stopped")]
    Closed(Frame),
}

impl SubmitError {
    /// The frame that was not accepted.
    pub fn into_frame(self) -> Frame {
        match self {
            Self::Busy(frame) | Self::Closed(frame) => frame,
        }
    }
}

/// Video pipeline: one background worker, one frame in flight.
///
/// Frames reach the worker through a rendezvous channel, so nothing is queued
/// on the input side: `submit` waits for the worker to become idle and
/// `try_submit` hands the frame back instead. Results leave in submission order
/// through a one-slot channel; the worker does not take another frame while the
/// previous result is still waiting in that slot.
///
/// The presentation side must keep receiving (or drop the receiver) for
/// `finish` to return.
pub struct VideoPipeline {
    input: Option<SyncSender<Frame>>,
    counter: Arc<FrameCounter>,
    join: Option<JoinHandle<()>>,
}

impl VideoPipeline {
    /// Start the worker. Fails with `ModelUnavailable` if there is no model.
    pub fn spawn(
        model: &ModelInit,
        resolver: DetectionResolver,
        renderer: OverlayRenderer,
    ) -> OverlayResult<(Self, Receiver<PresentedFrame>)> {
        let backend = model.backend()?;
        let counter = Arc::new(FrameCounter::new());
        let (input, frames) = mpsc::sync_channel::<Frame>(0);
        let (present, presented) = mpsc::sync_channel(PRESENT_SLOTS);

        let worker = Worker {
            backend,
            resolver,
            renderer,
            counter: counter.clone(),
        };
        let join = std::thread::spawn(move || worker.run(frames, present));

        Ok((
            Self {
                input: Some(input),
                counter,
                join: Some(join),
            },
            presented,
        ))
    }

    /// Submit a frame, waiting until the worker is free to take it.
    pub fn submit(&self, frame: Frame) -> Result<(), SubmitError> {
        match &self.input {
            Some(input) => input.send(frame).map_err(|e| SubmitError::Closed(e.0)),
            None => Err(SubmitError::Closed(frame)),
        }
    }

    /// Submit a frame only if the worker is idle right now.
    pub fn try_submit(&self, frame: Frame) -> Result<(), SubmitError> {
        match &self.input {
            Some(input) => input.try_send(frame).map_err(|e| match e {
                TrySendError::Full(frame) => SubmitError::Busy(frame),
                TrySendError::Disconnected(frame) => SubmitError::Closed(frame),
            }),
            None => Err(SubmitError::Closed(frame)),
        }
    }

    /// Shared handle to the frame counter, for display.
    pub fn counter(&self) -> Arc<FrameCounter> {
        self.counter.clone()
    }

    pub fn frames_processed(&self) -> u64 {
        self.counter.get()
    }

    /// Stop accepting frames, wait for the worker, return the frame count.
    pub fn finish(mut self) -> Result<u64> {
        self.shutdown()?;
        Ok(self.counter.get())
    }

    fn shutdown(&mut self) -> Result<()> {
        self.input.take();
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("pipeline worker thread panicked"))?;
        }
        Ok(())
    }
}

impl Drop for VideoPipeline {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!("{}", e);
        }
    }
}

struct Worker {
    backend: SharedBackend,
    resolver: DetectionResolver,
    renderer: OverlayRenderer,
    counter: Arc<FrameCounter>,
}

impl Worker {
    fn run(mut self, frames: Receiver<Frame>, present: SyncSender<PresentedFrame>) {
        for frame in frames {
            let frame_number = self.counter.increment();
            let presented = self.process(frame_number, frame);
            if present.send(presented).is_err() {
                log::info!("presentation side closed; stopping pipeline worker");
                break;
            }
        }
        log::debug!("pipeline worker exiting after {} frames", self.counter.get());
    }

    fn process(&mut self, frame_number: u64, frame: Frame) -> PresentedFrame {
        match annotate_once(
            &self.backend,
            &mut self.resolver,
            &self.renderer,
            &frame.image,
        ) {
            Ok(annotated) => {
                log::debug!(
                    "frame {}: {} detections, {:?} since submit",
                    frame_number,
                    annotated.detections,
                    frame.submitted_at.elapsed()
                );
                PresentedFrame {
                    frame_number,
                    image: annotated.image,
                    annotated: true,
                    detections: annotated.detections,
                }
            }
            Err(e) => {
                log::warn!(
                    "frame {}: {}; presenting unannotated frame",
                    frame_number,
                    e
                );
                PresentedFrame {
                    frame_number,
                    image: frame.image,
                    annotated: false,
                    detections: 0,
                }
            }
        }
    }
}
