mod completion;
mod sim;
mod types;

pub use completion::{completion, Completion, CompletionHandle};
pub use sim::{EngineCall, Outcome, SimulatedEngine};
pub use types::{
    CameraBehavior, CaptureKind, CaptureRequest, LensCorrectionMode, MediaFormat, PhotoFiles,
    PhotoStage, PreviewParams,
};

use crate::error::EngineError;
use crate::resolution::ResolutionChangeRequest;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Stage events of one photo capture
pub type PhotoStages = mpsc::UnboundedReceiver<PhotoStage>;

/// Capabilities the orchestration layer needs from the capture engine.
///
/// Every dispatch method returns `Err` when the engine refuses the call
/// synchronously. Otherwise the answer arrives later through the returned
/// [`Completion`] (or stage stream), possibly much later, possibly never.
pub trait CaptureEngine: Send + Sync {
    fn take_photo(&self, request: &CaptureRequest) -> Result<PhotoStages, EngineError>;

    /// Grab the current preview frame into `path`
    fn pick_photo(
        &self,
        path: &Path,
        width: u32,
        height: u32,
    ) -> Result<Completion<PathBuf>, EngineError>;

    fn start_video(&self, request: &CaptureRequest) -> Result<Completion, EngineError>;

    fn stop_record(
        &self,
        flush_preview: bool,
        continue_record: bool,
    ) -> Result<Completion, EngineError>;

    fn change_camera_resolution(
        &self,
        request: &ResolutionChangeRequest,
    ) -> Result<Completion<CameraBehavior>, EngineError>;

    /// Resume the normal preview after a large or HDR capture
    fn restore_preview(&self) -> Result<Completion, EngineError>;

    fn set_lock_default_preview_fps(&self, lock: bool);

    fn apply_preview_params(&self, params: &PreviewParams);

    /// Frames the engine still has to discard for an in-flight HDR burst
    fn hdr_skip_frames(&self) -> u32;
}

/// Source of the metadata stamped onto captured media
pub trait MetadataProvider: Send + Sync {
    fn artist(&self) -> Option<String>;
    fn software_version(&self) -> Option<String>;
}

/// Fixed metadata values
#[derive(Debug, Clone, Default)]
pub struct StaticMetadata {
    pub artist: Option<String>,
    pub software_version: Option<String>,
}

impl MetadataProvider for StaticMetadata {
    fn artist(&self) -> Option<String> {
        self.artist.clone()
    }

    fn software_version(&self) -> Option<String> {
        self.software_version.clone()
    }
}

/// Stamp artist and software version onto a request before dispatch
pub fn stamp_metadata(request: &mut CaptureRequest, provider: Option<&dyn MetadataProvider>) {
    if let Some(provider) = provider {
        request.artist = provider.artist();
        request.software_version = provider.software_version();
    }
}
