use crate::engine::{CaptureEngine, Completion};
use crate::error::EngineError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Holds back a success until the engine has drained its HDR skip-frames
#[derive(Clone)]
pub struct HdrFrameSync {
    engine: Arc<dyn CaptureEngine>,
    poll_interval: Duration,
}

impl HdrFrameSync {
    pub fn new(engine: Arc<dyn CaptureEngine>, poll_interval: Duration) -> Self {
        Self {
            engine,
            poll_interval,
        }
    }

    /// Forward `result`; successes wait for the skip-frame counter to reach zero
    pub async fn settle<T>(&self, result: Result<T, EngineError>) -> Result<T, EngineError> {
        if result.is_ok() {
            self.wait_drained().await;
        }
        result
    }

    /// Await an engine completion and settle it
    pub async fn wait<T>(&self, completion: Completion<T>) -> Result<T, EngineError> {
        self.settle(completion.wait().await).await
    }

    /// Poll until no HDR skip-frames remain; returns the number of polls
    pub async fn wait_drained(&self) -> u32 {
        let mut polls = 0;
        loop {
            let pending = self.engine.hdr_skip_frames();
            if pending == 0 {
                break;
            }
            if polls == 0 {
                debug!("Waiting for {} HDR skip-frames to drain", pending);
            }
            polls += 1;
            sleep(self.poll_interval).await;
        }
        polls
    }
}
