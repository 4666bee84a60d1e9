use crate::config::PanocapConfig;
use crate::dispatch::Dispatcher;
use crate::engine::{CaptureEngine, MetadataProvider};
use crate::events::EventBus;
use crate::failure::CaptureFailureTracker;
use crate::hdr::HdrFrameSync;
use std::sync::Arc;

/// Shared collaborators every orchestrator is built from
#[derive(Clone)]
pub struct PanoContext {
    pub engine: Arc<dyn CaptureEngine>,
    pub metadata: Option<Arc<dyn MetadataProvider>>,
    pub dispatcher: Dispatcher,
    pub event_bus: EventBus,
    pub config: Arc<PanocapConfig>,
}

impl PanoContext {
    /// Must be called inside a tokio runtime (the dispatcher spawns its worker)
    pub fn new(engine: Arc<dyn CaptureEngine>, config: PanocapConfig) -> Self {
        Self {
            engine,
            metadata: None,
            dispatcher: Dispatcher::new(),
            event_bus: EventBus::default(),
            config: Arc::new(config),
        }
    }

    pub fn with_metadata(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.metadata = Some(provider);
        self
    }

    /// Tracker with the configured thresholds
    pub fn failure_tracker(&self) -> CaptureFailureTracker {
        CaptureFailureTracker::with_config(self.config.failure.clone())
    }

    pub fn hdr_sync(&self) -> HdrFrameSync {
        HdrFrameSync::new(Arc::clone(&self.engine), self.config.hdr.poll_interval())
    }
}
