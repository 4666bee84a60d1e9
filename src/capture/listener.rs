use crate::error::EngineError;
use std::path::PathBuf;

/// Caller side of a photo capture.
///
/// Exactly one of `on_take_success` or `on_take_error` is called per request.
pub trait PhotoListener: Send + Sync {
    /// The request was accepted and is about to reach the engine
    fn on_take_start(&self) {}

    /// Shot `index` began; HDR captures report one per exposure
    fn on_take_shot(&self, _index: u32) {}

    /// Exposure finished; processing continues in the engine
    fn on_take_end(&self) {}

    fn on_take_success(&self, is_hdr: bool, stitched: Option<PathBuf>, unstitched: Option<PathBuf>);

    fn on_take_error(&self, is_hdr: bool, message: &str);
}

pub trait ScreenPhotoListener: Send + Sync {
    fn on_screen_photo_success(&self, path: PathBuf);

    fn on_screen_photo_error(&self, code: i32);
}

/// Plain success or error outcome of an engine operation
pub trait OperationListener: Send + Sync {
    fn on_success(&self);

    fn on_error(&self, error: EngineError);
}
