mod fit;
mod sim;
mod sync;

pub use fit::{AspectRatio, SurfaceSize};
pub use sim::SimulatedSurface;
pub use sync::{RenderSurface, ResizeOutcome, SurfaceLayout, SurfaceSizeSynchronizer, SurfaceTarget};
