pub mod capture;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod events;
pub mod failure;
pub mod hdr;
pub mod record;
pub mod resolution;
pub mod surface;
pub mod timeout;

pub use capture::{CaptureOrchestrator, OperationListener, PhotoListener, ScreenPhotoListener};
pub use config::PanocapConfig;
pub use context::PanoContext;
pub use dispatch::{Dispatcher, SerialQueue};
pub use engine::{
    CameraBehavior, CaptureEngine, CaptureRequest, Completion, MediaFormat, MetadataProvider,
    SimulatedEngine,
};
pub use error::{error_code, EngineError, PanocapError, Result};
pub use events::{EventBus, EventFilter, PanoEvent, TimedEvent};
pub use failure::CaptureFailureTracker;
pub use hdr::HdrFrameSync;
pub use record::{RecordListener, RecordOrchestrator};
pub use resolution::{
    ResolutionChangeCoordinator, ResolutionChangeRequest, ResolutionListener, ResolutionPolicy,
};
pub use surface::{
    AspectRatio, RenderSurface, SimulatedSurface, SurfaceSize, SurfaceSizeSynchronizer,
};
pub use timeout::TimeoutGuard;
