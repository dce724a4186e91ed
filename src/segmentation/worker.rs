use super::types::{SegmentationError, SegmentationProvider};
use crate::compose::Frame;
use crate::state::{ModelStatus, SharedState};
use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const RESET_AFTER_FAILURES: u32 = 10;

/// Capped exponential delay after consecutive transient failures
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Option<Duration>,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: None,
        }
    }

    /// Record a failure and return how long to wait before retrying
    pub fn failure(&mut self) -> Duration {
        let next = match self.current {
            None => self.initial,
            Some(current) => (current * 2).min(self.max),
        };
        self.current = Some(next);
        next
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(10), Duration::from_secs(1))
    }
}

/// Background segmentation loop.
///
/// Brings the provider up on its own thread, then repeatedly segments the
/// newest frame offered by the display loop and publishes the mask into the
/// shared state. At most one request is in flight at a time.
pub struct SegmentationWorker {
    frames: Sender<Arc<Frame>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SegmentationWorker {
    pub fn spawn<P, F>(state: Arc<SharedState>, init: F) -> Result<Self>
    where
        P: SegmentationProvider + 'static,
        F: FnOnce() -> Result<P, SegmentationError> + Send + 'static,
    {
        let (frames, frame_rx) = crossbeam_channel::bounded(1);
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("segmentation".into())
            .spawn(move || run_worker(state, init, frame_rx, worker_stop))
            .context("Failed to spawn segmentation thread")?;

        Ok(Self {
            frames,
            stop,
            handle: Some(handle),
        })
    }

    /// Hand the current frame to the worker. Dropped if it is still busy.
    pub fn offer(&self, frame: Arc<Frame>) -> bool {
        match self.frames.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Ask the loop to exit and wait for it
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Segmentation thread panicked");
            }
        }
    }
}

impl Drop for SegmentationWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker<P, F>(state: Arc<SharedState>, init: F, frames: Receiver<Arc<Frame>>, stop: Arc<AtomicBool>)
where
    P: SegmentationProvider,
    F: FnOnce() -> Result<P, SegmentationError>,
{
    let mut provider = match init() {
        Ok(provider) => provider,
        Err(err) => {
            tracing::error!("{}", err);
            state.set_status(ModelStatus::Unavailable);
            return;
        }
    };
    let (input_width, input_height) = provider.input_size();
    tracing::info!("Segmentation ready, model input {}x{}", input_width, input_height);
    state.set_status(ModelStatus::Ready);

    let mut backoff = Backoff::default();
    let mut segmented = 0u64;
    let mut failures = 0u32;

    while let Some(frame) = recv_latest_frame(&frames, &stop) {
        let result = provider.segment(&frame).and_then(|mask| {
            if mask.dimensions() == frame.dimensions() {
                Ok(mask)
            } else {
                let (width, height) = frame.dimensions();
                Err(SegmentationError::MaskShape {
                    width,
                    height,
                    len: mask.labels().len(),
                })
            }
        });

        match result {
            Ok(mask) => {
                backoff.reset();
                failures = 0;
                tracing::trace!(person_cells = mask.person_count(), "Mask ready");
                state.publish_mask(mask);
                segmented += 1;
                if segmented % 100 == 0 {
                    tracing::debug!("Published {} masks", segmented);
                }
            }
            Err(err) => {
                let delay = backoff.failure();
                failures += 1;
                tracing::warn!("{}; retrying in {:?}", err, delay);
                // start the recurrent state over after a long failure streak
                if failures == RESET_AFTER_FAILURES {
                    provider.reset_state();
                }
                thread::sleep(delay);
            }
        }
    }

    tracing::info!("Segmentation loop stopped");
}

/// Block until a frame arrives, then skip ahead to the newest one queued.
/// Returns `None` once stopped or when the display side hangs up.
fn recv_latest_frame(frames: &Receiver<Arc<Frame>>, stop: &AtomicBool) -> Option<Arc<Frame>> {
    loop {
        if stop.load(Ordering::Acquire) {
            return None;
        }
        match frames.recv_timeout(POLL_INTERVAL) {
            Ok(mut frame) => {
                while let Ok(newer) = frames.try_recv() {
                    frame = newer;
                }
                return Some(frame);
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return None,
        }
    }
}
