mod coordinator;
mod policy;
mod request;
#[cfg(test)]
mod tests;

pub use coordinator::{ResolutionChangeCoordinator, ResolutionListener};
pub use policy::ResolutionPolicy;
pub use request::{ResolutionChangeRequest, MAIN_CAMERA_ID, PANORAMA_CAMERA_ID, SUB_CAMERA_ID};
