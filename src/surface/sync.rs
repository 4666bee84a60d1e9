use super::fit::{AspectRatio, SurfaceSize};
use crate::config::SurfaceConfig;
use crate::error::{PanocapError, Result};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Requested layout of a render surface inside its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceLayout {
    MatchParent,
    Fixed(SurfaceSize),
}

/// The on-screen target the camera preview renders into
pub trait RenderSurface: Send + Sync {
    /// Size the surface currently has on screen
    fn observed_size(&self) -> SurfaceSize;

    /// Size of the parent container, `None` once the surface is detached
    fn parent_size(&self) -> Option<SurfaceSize>;

    fn layout(&self) -> SurfaceLayout;

    /// Request a new layout; the observed size follows asynchronously
    fn set_layout(&self, layout: SurfaceLayout);

    /// Aspect the surface last settled at
    fn tag(&self) -> Option<AspectRatio>;

    fn set_tag(&self, tag: AspectRatio);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceTarget {
    /// Panoramic output: the surface fills its parent
    FillParent,
    /// Largest centered box of the ratio inside the parent
    Fit(AspectRatio),
}

impl SurfaceTarget {
    pub fn from_aspect(aspect: AspectRatio) -> Self {
        if aspect.is_panorama() {
            SurfaceTarget::FillParent
        } else {
            SurfaceTarget::Fit(aspect)
        }
    }

    pub fn aspect(&self) -> AspectRatio {
        match self {
            SurfaceTarget::FillParent => AspectRatio::PANORAMA,
            SurfaceTarget::Fit(aspect) => *aspect,
        }
    }

    pub fn layout_for(&self, parent: SurfaceSize) -> SurfaceLayout {
        match self {
            SurfaceTarget::FillParent => SurfaceLayout::MatchParent,
            SurfaceTarget::Fit(aspect) => SurfaceLayout::Fixed(aspect.fit_within(parent)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeOutcome {
    /// Surface already tagged with the requested aspect
    Unchanged,
    /// Observed size matched the target after `polls` waits
    Settled { polls: u32 },
    /// Parent went away before the size settled
    Detached,
}

/// Drives a surface resize and returns once it is observable on screen
#[derive(Debug, Clone)]
pub struct SurfaceSizeSynchronizer {
    poll_interval: Duration,
    wait_timeout: Option<Duration>,
}

impl SurfaceSizeSynchronizer {
    pub fn new(poll_interval: Duration, wait_timeout: Option<Duration>) -> Self {
        Self {
            poll_interval,
            wait_timeout,
        }
    }

    pub fn from_config(config: &SurfaceConfig) -> Self {
        Self::new(config.poll_interval(), config.wait_timeout())
    }

    /// Lay the surface out for `target` and wait until the new size shows.
    ///
    /// Waits indefinitely unless a wait timeout is configured; `cancel`
    /// aborts a pending wait with [`PanocapError::SurfaceCancelled`].
    pub async fn resize(
        &self,
        surface: &dyn RenderSurface,
        target: SurfaceTarget,
        cancel: &CancellationToken,
    ) -> Result<ResizeOutcome> {
        let aspect = target.aspect();
        if surface.tag() == Some(aspect) {
            debug!("Surface already laid out for {}, nothing to do", aspect);
            return Ok(ResizeOutcome::Unchanged);
        }

        let parent = match surface.parent_size() {
            Some(parent) => parent,
            None => {
                warn!("Surface has no parent, skipping resize to {}", aspect);
                return Ok(ResizeOutcome::Detached);
            }
        };

        let layout = target.layout_for(parent);
        info!("Resizing surface to {:?} for aspect {} (parent {})", layout, aspect, parent);
        surface.set_layout(layout);

        let started = Instant::now();
        let mut polls = 0;
        loop {
            let parent = match surface.parent_size() {
                Some(parent) => parent,
                None => {
                    debug!("Surface detached while waiting for {:?}", layout);
                    return Ok(ResizeOutcome::Detached);
                }
            };
            let expected = match layout {
                SurfaceLayout::MatchParent => parent,
                SurfaceLayout::Fixed(size) => size,
            };
            if surface.observed_size() == expected {
                debug!("Surface settled at {} after {} polls", expected, polls);
                // Tagged only once settled so an aborted wait is retried in full
                surface.set_tag(aspect);
                return Ok(ResizeOutcome::Settled { polls });
            }

            if let Some(limit) = self.wait_timeout {
                if started.elapsed() >= limit {
                    warn!(
                        "Surface stuck at {} instead of {}",
                        surface.observed_size(),
                        expected
                    );
                    return Err(PanocapError::SurfaceTimeout {
                        width: expected.width,
                        height: expected.height,
                        waited_ms: started.elapsed().as_millis() as u64,
                    });
                }
            }

            if polls == 0 {
                debug!("Waiting for surface size change to finish");
            }
            polls += 1;
            tokio::select! {
                _ = cancel.cancelled() => return Err(PanocapError::SurfaceCancelled),
                _ = sleep(self.poll_interval) => {}
            }
        }
    }
}

impl Default for SurfaceSizeSynchronizer {
    fn default() -> Self {
        Self::from_config(&SurfaceConfig::default())
    }
}
