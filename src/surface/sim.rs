use super::fit::{AspectRatio, SurfaceSize};
use super::sync::{RenderSurface, SurfaceLayout};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug)]
struct SurfaceState {
    observed: SurfaceSize,
    parent: Option<SurfaceSize>,
    layout: SurfaceLayout,
    tag: Option<AspectRatio>,
    generation: u64,
}

/// Render surface whose size catches up with a layout request after a delay
#[derive(Debug, Clone)]
pub struct SimulatedSurface {
    state: Arc<Mutex<SurfaceState>>,
    settle_after: Option<Duration>,
}

impl SimulatedSurface {
    /// Surface filling `parent`, applying layouts after `settle_after`
    pub fn new(parent: SurfaceSize, settle_after: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(SurfaceState {
                observed: parent,
                parent: Some(parent),
                layout: SurfaceLayout::MatchParent,
                tag: None,
                generation: 0,
            })),
            settle_after: Some(settle_after),
        }
    }

    /// Surface that never applies a layout request
    pub fn frozen(parent: SurfaceSize) -> Self {
        Self {
            settle_after: None,
            ..Self::new(parent, Duration::ZERO)
        }
    }

    /// Remove the surface from its parent
    pub fn detach(&self) {
        self.state.lock().parent = None;
    }

    pub fn set_parent_size(&self, parent: SurfaceSize) {
        self.state.lock().parent = Some(parent);
    }

    fn target_size(state: &SurfaceState) -> SurfaceSize {
        match state.layout {
            SurfaceLayout::MatchParent => state.parent.unwrap_or(state.observed),
            SurfaceLayout::Fixed(size) => size,
        }
    }
}

impl RenderSurface for SimulatedSurface {
    fn observed_size(&self) -> SurfaceSize {
        self.state.lock().observed
    }

    fn parent_size(&self) -> Option<SurfaceSize> {
        self.state.lock().parent
    }

    fn layout(&self) -> SurfaceLayout {
        self.state.lock().layout
    }

    fn set_layout(&self, layout: SurfaceLayout) {
        let generation = {
            let mut state = self.state.lock();
            state.layout = layout;
            state.generation += 1;
            state.generation
        };

        let delay = match self.settle_after {
            Some(delay) => delay,
            None => return,
        };
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            sleep(delay).await;
            let mut state = state.lock();
            // A newer layout request supersedes this one
            if state.generation == generation {
                state.observed = Self::target_size(&state);
            }
        });
    }

    fn tag(&self) -> Option<AspectRatio> {
        self.state.lock().tag
    }

    fn set_tag(&self, tag: AspectRatio) {
        self.state.lock().tag = Some(tag);
    }
}
