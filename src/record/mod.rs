mod orchestrator;
mod session;

pub use orchestrator::{RecordListener, RecordOrchestrator};
pub use session::RecordSession;
