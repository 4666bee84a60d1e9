use super::policy::ResolutionPolicy;
use super::request::ResolutionChangeRequest;
use crate::context::PanoContext;
use crate::dispatch::Dispatcher;
use crate::engine::{CameraBehavior, CaptureEngine};
use crate::error::EngineError;
use crate::events::{EventBus, PanoEvent};
use crate::surface::{RenderSurface, SurfaceSizeSynchronizer, SurfaceTarget};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Caller side of a resolution switch
pub trait ResolutionListener: Send + Sync {
    /// Called with the normalized request before the surface is touched
    fn fill_params(&self, _camera_id: u32, _width: u32, _height: u32, _fps: u32) {}

    fn on_success(&self, behavior: CameraBehavior);

    fn on_error(&self, code: i32, message: &str);
}

/// Resizes the render surface, then switches the engine resolution
pub struct ResolutionChangeCoordinator {
    engine: Arc<dyn CaptureEngine>,
    surface: Arc<dyn RenderSurface>,
    synchronizer: SurfaceSizeSynchronizer,
    dispatcher: Dispatcher,
    event_bus: EventBus,
    cancel: Mutex<CancellationToken>,
}

impl ResolutionChangeCoordinator {
    pub fn new(context: &PanoContext, surface: Arc<dyn RenderSurface>) -> Self {
        Self {
            engine: Arc::clone(&context.engine),
            surface,
            synchronizer: SurfaceSizeSynchronizer::from_config(&context.config.surface),
            dispatcher: context.dispatcher.clone(),
            event_bus: context.event_bus.clone(),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Start a switch; the listener hears the outcome on the delivery context
    pub fn change_resolution(
        &self,
        request: ResolutionChangeRequest,
        policy: ResolutionPolicy,
        listener: Arc<dyn ResolutionListener>,
    ) -> JoinHandle<()> {
        info!("Changing resolution to {} ({})", request, policy.name());

        listener.fill_params(request.camera_id, request.width, request.height, request.fps);
        self.engine
            .set_lock_default_preview_fps(policy.lock_default_preview_fps());

        let engine = Arc::clone(&self.engine);
        let surface = Arc::clone(&self.surface);
        let synchronizer = self.synchronizer.clone();
        let dispatcher = self.dispatcher.clone();
        let event_bus = self.event_bus.clone();
        let cancel = self.cancel.lock().child_token();

        tokio::spawn(async move {
            let target = SurfaceTarget::from_aspect(policy.aspect());
            if let Err(e) = synchronizer.resize(surface.as_ref(), target, &cancel).await {
                warn!("Surface resize for {} failed: {}", request, e);
                deliver_error(&dispatcher, &event_bus, listener, e.to_engine_error());
                return;
            }

            let completion = match engine.change_camera_resolution(&request) {
                Ok(completion) => completion,
                Err(e) => {
                    error!("Engine refused resolution change {}: {}", request, e);
                    deliver_error(&dispatcher, &event_bus, listener, e);
                    return;
                }
            };

            match completion.wait().await {
                Ok(behavior) => {
                    info!("Resolution changed to {} ({:?})", request, behavior);
                    engine.apply_preview_params(&policy.preview_params(&request));
                    event_bus.publish(PanoEvent::ResolutionChanged {
                        camera_id: request.camera_id,
                        width: request.width,
                        height: request.height,
                        fps: request.fps,
                    });
                    dispatcher.post(move || listener.on_success(behavior));
                }
                Err(e) => {
                    error!("Resolution change {} failed: {}", request, e);
                    deliver_error(&dispatcher, &event_bus, listener, e);
                }
            }
        })
    }

    /// Abort switches still waiting for the surface
    pub fn cancel_pending(&self) {
        let previous = std::mem::replace(&mut *self.cancel.lock(), CancellationToken::new());
        previous.cancel();
    }
}

fn deliver_error(
    dispatcher: &Dispatcher,
    event_bus: &EventBus,
    listener: Arc<dyn ResolutionListener>,
    error: EngineError,
) {
    event_bus.publish(PanoEvent::ResolutionFailed { code: error.code });
    dispatcher.post(move || {
        let message = error.message.clone().unwrap_or_default();
        listener.on_error(error.code, &message);
    });
}
