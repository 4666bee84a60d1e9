use super::listener::{OperationListener, PhotoListener, ScreenPhotoListener};
use crate::context::PanoContext;
use crate::dispatch::{Dispatcher, SerialQueue};
use crate::engine::{
    stamp_metadata, CaptureEngine, CaptureRequest, MetadataProvider, PhotoFiles, PhotoStage,
    PhotoStages,
};
use crate::error::{error_code, EngineError};
use crate::events::{EventBus, PanoEvent};
use crate::failure::CaptureFailureTracker;
use crate::hdr::HdrFrameSync;
use crate::timeout::TimeoutGuard;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const PHOTO_ERROR: &str = "take photo error";
pub const PHOTO_TIMEOUT_ERROR: &str = "take photo timeout";

/// Engine codes that end a capture no matter how many files were expected
fn is_fatal(code: i32) -> bool {
    matches!(
        code,
        error_code::NOT_INIT | error_code::CAMERA_NOT_OPENED | error_code::CAMERA_SESSION_NOT_CREATE
    )
}

/// Serializes photo captures and supervises each with a deadline
pub struct CaptureOrchestrator {
    engine: Arc<dyn CaptureEngine>,
    metadata: Option<Arc<dyn MetadataProvider>>,
    dispatcher: Dispatcher,
    event_bus: EventBus,
    hdr: HdrFrameSync,
    capture_queue: SerialQueue,
    screen_queue: SerialQueue,
    timeout: Duration,
    failures: Mutex<CaptureFailureTracker>,
}

impl CaptureOrchestrator {
    pub fn new(context: &PanoContext) -> Self {
        Self {
            engine: Arc::clone(&context.engine),
            metadata: context.metadata.clone(),
            dispatcher: context.dispatcher.clone(),
            event_bus: context.event_bus.clone(),
            hdr: context.hdr_sync(),
            capture_queue: SerialQueue::new("capture"),
            screen_queue: SerialQueue::new("screen-photo"),
            timeout: context.config.capture.timeout(),
            failures: Mutex::new(context.failure_tracker()),
        }
    }

    /// Take a photo; the listener gets exactly one terminal callback
    pub fn take_photo(&self, request: CaptureRequest, listener: Arc<dyn PhotoListener>) {
        info!("Taking photo {} ({})", request.id, request.resolution);

        let engine = Arc::clone(&self.engine);
        let metadata = self.metadata.clone();
        let dispatcher = self.dispatcher.clone();
        let event_bus = self.event_bus.clone();
        let timeout = self.timeout;

        self.capture_queue.execute(move || {
            let mut request = request;
            stamp_metadata(&mut request, metadata.as_deref());
            let is_hdr = request.is_hdr();
            let request_id = request.id;

            let guard = {
                let dispatcher = dispatcher.clone();
                let event_bus = event_bus.clone();
                let listener = Arc::clone(&listener);
                TimeoutGuard::new(format!("photo {}", request_id), timeout, move || {
                    event_bus.publish(PanoEvent::PhotoFinished {
                        request_id,
                        success: false,
                        timed_out: true,
                    });
                    dispatcher.post(move || listener.on_take_error(is_hdr, PHOTO_TIMEOUT_ERROR));
                })
            };

            {
                let listener = Arc::clone(&listener);
                dispatcher.post(move || listener.on_take_start());
            }
            event_bus.publish(PanoEvent::PhotoStarted {
                request_id,
                hdr: is_hdr,
            });

            match engine.take_photo(&request) {
                Ok(stages) => {
                    let watch = PhotoWatch {
                        request_id,
                        is_hdr,
                        expected: request.format.files_per_shot(),
                        guard,
                        listener,
                        dispatcher,
                        event_bus,
                    };
                    tokio::spawn(watch.run(stages));
                }
                Err(e) => {
                    error!("Engine refused photo {}: {}", request_id, e);
                    let message = format!(
                        "{}({},{})",
                        PHOTO_ERROR,
                        error_code::UN_KNOWN,
                        e.message.unwrap_or_default()
                    );
                    let watch = PhotoWatch {
                        request_id,
                        is_hdr,
                        expected: 1,
                        guard,
                        listener,
                        dispatcher,
                        event_bus,
                    };
                    watch.finish_with_error(message);
                }
            }
        });
    }

    /// Grab the current preview frame into `path`
    pub fn take_screen_photo(
        &self,
        path: PathBuf,
        width: u32,
        height: u32,
        listener: Arc<dyn ScreenPhotoListener>,
    ) {
        debug!("Taking screen photo {}x{} into {}", width, height, path.display());

        let engine = Arc::clone(&self.engine);
        let dispatcher = self.dispatcher.clone();

        self.screen_queue.execute(move || {
            let completion = match engine.pick_photo(&path, width, height) {
                Ok(completion) => completion,
                Err(e) => {
                    error!("Screen photo into {} failed: {}", path.display(), e);
                    dispatcher.post(move || listener.on_screen_photo_error(error_code::UN_KNOWN));
                    return;
                }
            };

            tokio::spawn(async move {
                match completion.wait().await {
                    Ok(path) => {
                        dispatcher.post(move || listener.on_screen_photo_success(path));
                    }
                    Err(e) => {
                        warn!("Screen photo failed: {}", e);
                        dispatcher.post(move || listener.on_screen_photo_error(e.code));
                    }
                }
            });
        });
    }

    /// Resume the normal preview once pending HDR frames are drained
    pub fn restore_preview(&self, listener: Arc<dyn OperationListener>) {
        let hdr = self.hdr.clone();
        let dispatcher = self.dispatcher.clone();

        let completion = match self.engine.restore_preview() {
            Ok(completion) => completion,
            Err(e) => {
                error!("Engine refused to restore preview: {}", e);
                dispatcher.post(move || listener.on_error(e));
                return;
            }
        };

        tokio::spawn(async move {
            match hdr.wait(completion).await {
                Ok(()) => {
                    debug!("Preview restored");
                    dispatcher.post(move || listener.on_success());
                }
                Err(e) => {
                    warn!("Restoring preview failed: {}", e);
                    dispatcher.post(move || listener.on_error(e));
                }
            }
        });
    }

    /// Feed one engine capture failure into the tracker.
    ///
    /// Returns false once the failures look systemic; the caller should stop
    /// retrying and can fetch the error from [`Self::capture_failure_error`].
    pub fn on_capture_failed(&self) -> bool {
        let mut failures = self.failures.lock();
        if failures.check_failed() {
            return true;
        }

        let info = failures.last_error_info().unwrap_or_default().to_string();
        self.event_bus.publish(PanoEvent::CaptureFailurePattern {
            info,
            failed_count: failures.failed_count(),
        });
        false
    }

    pub fn capture_failure_error(&self) -> Option<EngineError> {
        self.failures.lock().failure_error()
    }

    pub fn reset_capture_failures(&self) {
        self.failures.lock().reset();
    }
}

/// Follows the stage events of one photo until its terminal notification
struct PhotoWatch {
    request_id: Uuid,
    is_hdr: bool,
    expected: u32,
    guard: TimeoutGuard,
    listener: Arc<dyn PhotoListener>,
    dispatcher: Dispatcher,
    event_bus: EventBus,
}

impl PhotoWatch {
    async fn run(self, mut stages: PhotoStages) {
        let mut completed = 0;

        loop {
            let stage = tokio::select! {
                stage = stages.recv() => stage,
                _ = self.guard.terminated() => {
                    debug!("Photo {} finished, no longer following the engine", self.request_id);
                    return;
                }
            };
            let stage = match stage {
                Some(stage) => stage,
                None => break,
            };
            if self.guard.is_terminated() {
                debug!("Ignoring {:?} for finished photo {}", stage, self.request_id);
                return;
            }

            match stage {
                PhotoStage::Started { index } => {
                    self.guard.notify_start();
                    let listener = Arc::clone(&self.listener);
                    self.dispatcher.post(move || listener.on_take_shot(index));
                }
                PhotoStage::CaptureEnded => {
                    let listener = Arc::clone(&self.listener);
                    self.dispatcher.post(move || listener.on_take_end());
                }
                PhotoStage::Completed { error_code, files } => {
                    completed += 1;
                    if !is_fatal(error_code) && completed < self.expected {
                        debug!(
                            "Photo {} wrote file {}/{}",
                            self.request_id, completed, self.expected
                        );
                        continue;
                    }
                    if error_code == error_code::SUCCESS {
                        self.finish_with_success(files);
                    } else {
                        warn!("Photo {} failed with code {}", self.request_id, error_code);
                        self.finish_with_error(format!("{} ({})", PHOTO_ERROR, error_code));
                    }
                    return;
                }
            }
        }

        if !self.guard.is_terminated() {
            warn!("Engine closed photo {} without completing it", self.request_id);
            self.finish_with_error(format!("{} ({})", PHOTO_ERROR, error_code::UN_KNOWN));
        }
    }

    fn finish_with_success(&self, files: PhotoFiles) {
        self.guard.complete(|| {
            info!("Photo {} done: {:?}", self.request_id, files.unstitched);
            self.event_bus.publish(PanoEvent::PhotoFinished {
                request_id: self.request_id,
                success: true,
                timed_out: false,
            });
            let listener = Arc::clone(&self.listener);
            let is_hdr = self.is_hdr;
            self.dispatcher
                .post(move || listener.on_take_success(is_hdr, files.stitched, files.unstitched));
        });
    }

    fn finish_with_error(&self, message: String) {
        self.guard.complete(|| {
            self.event_bus.publish(PanoEvent::PhotoFinished {
                request_id: self.request_id,
                success: false,
                timed_out: false,
            });
            let listener = Arc::clone(&self.listener);
            let is_hdr = self.is_hdr;
            self.dispatcher
                .post(move || listener.on_take_error(is_hdr, &message));
        });
    }
}
