mod listener;
mod orchestrator;
#[cfg(test)]
mod tests;

pub use listener::{OperationListener, PhotoListener, ScreenPhotoListener};
pub use orchestrator::{CaptureOrchestrator, PHOTO_ERROR, PHOTO_TIMEOUT_ERROR};
