use super::completion::{completion, Completion};
use super::types::{CameraBehavior, CaptureRequest, PhotoFiles, PhotoStage, PreviewParams};
use super::{CaptureEngine, PhotoStages};
use crate::config::SimulationConfig;
use crate::error::EngineError;
use crate::resolution::ResolutionChangeRequest;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info};
use uuid::Uuid;

const HDR_FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Scripted result of one simulated engine operation
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Report success after the delay
    Succeed { after: Duration },
    /// Report the error code after the delay
    Fail { code: i32, after: Duration },
    /// Refuse the call synchronously
    Reject { message: String },
    /// Accept the call and never answer
    Hang,
}

impl Outcome {
    pub fn succeed_after(ms: u64) -> Self {
        Outcome::Succeed {
            after: Duration::from_millis(ms),
        }
    }

    pub fn fail_after(code: i32, ms: u64) -> Self {
        Outcome::Fail {
            code,
            after: Duration::from_millis(ms),
        }
    }

    pub fn reject<S: Into<String>>(message: S) -> Self {
        Outcome::Reject {
            message: message.into(),
        }
    }
}

/// Calls received by the simulated engine, in order
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    TakePhoto { request_id: Uuid },
    PickPhoto { path: PathBuf },
    StartVideo { path: PathBuf },
    StopRecord { flush_preview: bool, continue_record: bool },
    ChangeResolution { values: [u32; 4], force: bool },
    RestorePreview,
    LockPreviewFps(bool),
    ApplyPreview(PreviewParams),
}

#[derive(Debug, Default)]
struct Scripts {
    photo: VecDeque<Outcome>,
    pick: VecDeque<Outcome>,
    start: VecDeque<Outcome>,
    stop: VecDeque<Outcome>,
    resolution: VecDeque<Outcome>,
    restore: VecDeque<Outcome>,
}

/// In-process engine double with scripted timing and failures
pub struct SimulatedEngine {
    photo_latency: Duration,
    record_latency: Duration,
    resolution_latency: Duration,
    shot_interval: Duration,
    scripts: Mutex<Scripts>,
    calls: Mutex<Vec<EngineCall>>,
    hdr_skip_frames: Arc<AtomicU32>,
}

impl SimulatedEngine {
    /// Engine that answers every call successfully and immediately
    pub fn new() -> Self {
        Self {
            photo_latency: Duration::ZERO,
            record_latency: Duration::ZERO,
            resolution_latency: Duration::ZERO,
            shot_interval: Duration::ZERO,
            scripts: Mutex::new(Scripts::default()),
            calls: Mutex::new(Vec::new()),
            hdr_skip_frames: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            photo_latency: Duration::from_millis(config.photo_latency_ms),
            record_latency: Duration::from_millis(config.record_latency_ms),
            resolution_latency: Duration::from_millis(config.resolution_latency_ms),
            shot_interval: Duration::from_millis(config.photo_latency_ms / 4),
            ..Self::new()
        }
    }

    pub fn script_photo(&self, outcome: Outcome) -> &Self {
        self.scripts.lock().photo.push_back(outcome);
        self
    }

    pub fn script_pick(&self, outcome: Outcome) -> &Self {
        self.scripts.lock().pick.push_back(outcome);
        self
    }

    pub fn script_start(&self, outcome: Outcome) -> &Self {
        self.scripts.lock().start.push_back(outcome);
        self
    }

    pub fn script_stop(&self, outcome: Outcome) -> &Self {
        self.scripts.lock().stop.push_back(outcome);
        self
    }

    pub fn script_resolution(&self, outcome: Outcome) -> &Self {
        self.scripts.lock().resolution.push_back(outcome);
        self
    }

    pub fn script_restore(&self, outcome: Outcome) -> &Self {
        self.scripts.lock().restore.push_back(outcome);
        self
    }

    /// Calls received so far
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    pub fn set_hdr_skip_frames(&self, frames: u32) {
        self.hdr_skip_frames.store(frames, Ordering::SeqCst);
    }

    fn record(&self, call: EngineCall) {
        debug!("Simulated engine call: {:?}", call);
        self.calls.lock().push(call);
    }

    fn next(queue: &mut VecDeque<Outcome>, latency: Duration) -> Outcome {
        queue
            .pop_front()
            .unwrap_or(Outcome::Succeed { after: latency })
    }

    fn settle<T: Send + 'static>(
        outcome: Outcome,
        value: T,
    ) -> Result<Completion<T>, EngineError> {
        let (handle, completion) = completion();
        match outcome {
            Outcome::Reject { message } => return Err(EngineError::unknown(message)),
            Outcome::Succeed { after } => {
                tokio::spawn(async move {
                    sleep(after).await;
                    handle.succeed(value);
                });
            }
            Outcome::Fail { code, after } => {
                tokio::spawn(async move {
                    sleep(after).await;
                    handle.fail(EngineError::with_message(code, "simulated failure"));
                });
            }
            Outcome::Hang => {
                tokio::spawn(async move {
                    let _handle = handle;
                    std::future::pending::<()>().await;
                });
            }
        }
        Ok(completion)
    }

    fn drain_hdr_frames(&self) {
        let counter = Arc::clone(&self.hdr_skip_frames);
        tokio::spawn(async move {
            while counter.load(Ordering::SeqCst) > 0 {
                sleep(HDR_FRAME_INTERVAL).await;
                let _ = counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                    n.checked_sub(1)
                });
            }
        });
    }
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureEngine for SimulatedEngine {
    fn take_photo(&self, request: &CaptureRequest) -> Result<PhotoStages, EngineError> {
        self.record(EngineCall::TakePhoto {
            request_id: request.id,
        });
        let outcome = Self::next(&mut self.scripts.lock().photo, self.photo_latency);
        if let Outcome::Reject { message } = &outcome {
            return Err(EngineError::unknown(message.clone()));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let shots = request.hdr_count.max(1);
        let completions = request.format.files_per_shot();
        let files = PhotoFiles::unstitched(&request.output_path());
        let shot_interval = self.shot_interval;

        if request.is_hdr() && matches!(outcome, Outcome::Succeed { .. }) {
            // The burst leaves frames behind for the preview to discard
            self.hdr_skip_frames
                .fetch_add(request.hdr_count, Ordering::SeqCst);
        }

        tokio::spawn(async move {
            for index in 0..shots {
                let _ = sender.send(PhotoStage::Started { index });
                if index + 1 < shots {
                    sleep(shot_interval).await;
                }
            }
            let _ = sender.send(PhotoStage::CaptureEnded);

            let (error_code, after) = match outcome {
                Outcome::Succeed { after } => (0, after),
                Outcome::Fail { code, after } => (code, after),
                _ => {
                    std::future::pending::<()>().await;
                    return;
                }
            };
            sleep(after).await;
            for _ in 0..completions {
                let _ = sender.send(PhotoStage::Completed {
                    error_code,
                    files: files.clone(),
                });
            }
        });

        if request.is_hdr() {
            self.drain_hdr_frames();
        }

        Ok(receiver)
    }

    fn pick_photo(
        &self,
        path: &Path,
        width: u32,
        height: u32,
    ) -> Result<Completion<PathBuf>, EngineError> {
        self.record(EngineCall::PickPhoto {
            path: path.to_path_buf(),
        });
        debug!("Simulated screen photo {}x{}", width, height);
        let outcome = Self::next(&mut self.scripts.lock().pick, self.photo_latency);
        Self::settle(outcome, path.to_path_buf())
    }

    fn start_video(&self, request: &CaptureRequest) -> Result<Completion, EngineError> {
        let path = request.output_path();
        info!("Simulated recording into {}", path.display());
        self.record(EngineCall::StartVideo { path });
        let outcome = Self::next(&mut self.scripts.lock().start, self.record_latency);
        Self::settle(outcome, ())
    }

    fn stop_record(
        &self,
        flush_preview: bool,
        continue_record: bool,
    ) -> Result<Completion, EngineError> {
        self.record(EngineCall::StopRecord {
            flush_preview,
            continue_record,
        });
        let outcome = Self::next(&mut self.scripts.lock().stop, self.record_latency);
        Self::settle(outcome, ())
    }

    fn change_camera_resolution(
        &self,
        request: &ResolutionChangeRequest,
    ) -> Result<Completion<CameraBehavior>, EngineError> {
        self.record(EngineCall::ChangeResolution {
            values: request.to_values(),
            force: request.force_change,
        });
        let outcome = Self::next(&mut self.scripts.lock().resolution, self.resolution_latency);
        Self::settle(outcome, CameraBehavior::Switch)
    }

    fn restore_preview(&self) -> Result<Completion, EngineError> {
        self.record(EngineCall::RestorePreview);
        let outcome = Self::next(&mut self.scripts.lock().restore, self.resolution_latency);
        Self::settle(outcome, ())
    }

    fn set_lock_default_preview_fps(&self, lock: bool) {
        self.record(EngineCall::LockPreviewFps(lock));
    }

    fn apply_preview_params(&self, params: &PreviewParams) {
        self.record(EngineCall::ApplyPreview(*params));
    }

    fn hdr_skip_frames(&self) -> u32 {
        self.hdr_skip_frames.load(Ordering::SeqCst)
    }
}
