use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// State shared by the start and stop paths of one recording.
///
/// A fresh session is created for every start, so a stop request or an
/// output path never leaks into the next recording.
#[derive(Debug)]
pub struct RecordSession {
    id: Uuid,
    stop_requested: AtomicBool,
    last_output_path: Mutex<Option<PathBuf>>,
}

impl RecordSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            stop_requested: AtomicBool::new(false),
            last_output_path: Mutex::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Mark the session as being stopped by the caller; returns the previous value
    pub fn request_stop(&self) -> bool {
        self.stop_requested.swap(true, Ordering::SeqCst)
    }

    pub fn clear_stop(&self) {
        self.stop_requested.store(false, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    pub fn set_output_path(&self, path: PathBuf) {
        *self.last_output_path.lock() = Some(path);
    }

    pub fn output_path(&self) -> Option<PathBuf> {
        self.last_output_path.lock().clone()
    }
}

impl Default for RecordSession {
    fn default() -> Self {
        Self::new()
    }
}
