use super::session::RecordSession;
use crate::context::PanoContext;
use crate::dispatch::{Dispatcher, SerialQueue};
use crate::engine::{stamp_metadata, CaptureEngine, CaptureRequest, MetadataProvider};
use crate::error::{error_code, EngineError};
use crate::events::{EventBus, PanoEvent};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Caller side of a recording
pub trait RecordListener: Send + Sync {
    fn on_record_start(&self, request: &CaptureRequest);

    fn on_record_stop(&self, path: Option<PathBuf>);

    fn on_record_error(&self, error: EngineError, path: Option<PathBuf>);
}

/// Serializes record start/stop and hides errors caused by a caller's stop
pub struct RecordOrchestrator {
    control: RecordControl,
    metadata: Option<Arc<dyn MetadataProvider>>,
    queue: SerialQueue,
    session: Arc<Mutex<Arc<RecordSession>>>,
}

#[derive(Clone)]
struct RecordControl {
    engine: Arc<dyn CaptureEngine>,
    dispatcher: Dispatcher,
    event_bus: EventBus,
    flush_preview: bool,
}

impl RecordOrchestrator {
    pub fn new(context: &PanoContext) -> Self {
        Self {
            control: RecordControl {
                engine: Arc::clone(&context.engine),
                dispatcher: context.dispatcher.clone(),
                event_bus: context.event_bus.clone(),
                flush_preview: context.config.record.flush_preview,
            },
            metadata: context.metadata.clone(),
            queue: SerialQueue::new("record"),
            session: Arc::new(Mutex::new(Arc::new(RecordSession::new()))),
        }
    }

    pub fn start_record(&self, request: CaptureRequest, listener: Arc<dyn RecordListener>) {
        info!("Starting record into {}", request.output_path().display());

        let control = self.control.clone();
        let metadata = self.metadata.clone();
        let current = Arc::clone(&self.session);

        self.queue.execute(move || {
            let session = Arc::new(RecordSession::new());
            *current.lock() = Arc::clone(&session);

            let mut request = request;
            stamp_metadata(&mut request, metadata.as_deref());

            let completion = match control.engine.start_video(&request) {
                Ok(completion) => completion,
                Err(e) => {
                    let message = format!("startVideo error: {}", e.message.unwrap_or_default());
                    let error = EngineError::with_message(error_code::ERROR_ON_START, message);
                    control.fail_start(&session, listener, error);
                    return;
                }
            };

            tokio::spawn(async move {
                match completion.wait().await {
                    Ok(()) => {
                        let path = request.output_path();
                        info!("Recording {} started: {}", session.id(), path.display());
                        session.set_output_path(path.clone());
                        control.event_bus.publish(PanoEvent::RecordStarted {
                            path: Some(path.display().to_string()),
                        });
                        control
                            .dispatcher
                            .post(move || listener.on_record_start(&request));
                    }
                    Err(e) => control.fail_start(&session, listener, e),
                }
            });
        });
    }

    /// Stop the active recording; `continue_recording` rolls over to a new file
    pub fn stop_record(&self, continue_recording: bool, listener: Arc<dyn RecordListener>) {
        info!("Stopping record (continue: {})", continue_recording);

        let control = self.control.clone();
        let current = Arc::clone(&self.session);

        self.queue.execute(move || {
            let session = current.lock().clone();
            if session.request_stop() {
                debug!("Stop already requested for recording {}", session.id());
            }

            let completion = match control
                .engine
                .stop_record(control.flush_preview, continue_recording)
            {
                Ok(completion) => completion,
                Err(e) => {
                    control.fail_stop(&session, listener, e);
                    return;
                }
            };

            tokio::spawn(async move {
                match completion.wait().await {
                    Ok(()) => {
                        session.clear_stop();
                        let path = session.output_path();
                        info!("Recording {} stopped: {:?}", session.id(), path);
                        control.event_bus.publish(PanoEvent::RecordStopped {
                            path: path.as_ref().map(|p| p.display().to_string()),
                        });
                        control.dispatcher.post(move || listener.on_record_stop(path));
                    }
                    Err(e) => control.fail_stop(&session, listener, e),
                }
            });
        });
    }

    /// Output path of the current recording, once the engine confirmed it
    pub fn last_output_path(&self) -> Option<PathBuf> {
        self.session.lock().output_path()
    }

    pub fn is_stop_requested(&self) -> bool {
        self.session.lock().is_stop_requested()
    }
}

impl RecordControl {
    fn fail_start(
        &self,
        session: &RecordSession,
        listener: Arc<dyn RecordListener>,
        error: EngineError,
    ) {
        if session.is_stop_requested() {
            info!(
                "Ignoring start error of recording {} after stop request: {}",
                session.id(),
                error
            );
            self.event_bus
                .publish(PanoEvent::RecordErrorSuppressed { code: error.code });
            return;
        }

        error!("Recording {} failed to start: {}", session.id(), error);
        self.event_bus
            .publish(PanoEvent::RecordFailed { code: error.code });
        let path = session.output_path();
        self.dispatcher
            .post(move || listener.on_record_error(error, path));
        self.force_stop();
    }

    fn fail_stop(&self, session: &RecordSession, listener: Arc<dyn RecordListener>, error: EngineError) {
        session.clear_stop();
        error!("Stopping recording {} failed: {}", session.id(), error);
        self.event_bus.publish(PanoEvent::RecordFailed {
            code: error_code::ERROR_ON_STOP,
        });
        let path = session.output_path();
        let error = EngineError {
            code: error_code::ERROR_ON_STOP,
            message: error.message,
        };
        self.dispatcher
            .post(move || listener.on_record_error(error, path));
    }

    /// Leave the engine idle after a failed start
    fn force_stop(&self) {
        match self.engine.stop_record(self.flush_preview, false) {
            Ok(completion) => {
                tokio::spawn(async move {
                    if let Err(e) = completion.wait().await {
                        warn!("Forced stop after start failure failed: {}", e);
                    }
                });
            }
            Err(e) => warn!("Engine refused forced stop: {}", e),
        }
    }
}
