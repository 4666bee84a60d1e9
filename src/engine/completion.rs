use crate::error::EngineError;
use tokio::sync::oneshot;

/// Create a linked completion pair for one engine operation
pub fn completion<T>() -> (CompletionHandle<T>, Completion<T>) {
    let (sender, receiver) = oneshot::channel();
    (CompletionHandle { sender }, Completion { receiver })
}

/// Engine side of an asynchronous operation; resolves it exactly once
#[derive(Debug)]
pub struct CompletionHandle<T = ()> {
    sender: oneshot::Sender<Result<T, EngineError>>,
}

impl<T> CompletionHandle<T> {
    pub fn succeed(self, value: T) {
        self.resolve(Ok(value));
    }

    pub fn fail(self, error: EngineError) {
        self.resolve(Err(error));
    }

    pub fn resolve(self, result: Result<T, EngineError>) {
        // The waiting side may already be gone
        let _ = self.sender.send(result);
    }
}

/// Orchestrator side of an asynchronous operation
#[derive(Debug)]
pub struct Completion<T = ()> {
    receiver: oneshot::Receiver<Result<T, EngineError>>,
}

impl<T> Completion<T> {
    /// A completion that is already resolved
    pub fn ready(result: Result<T, EngineError>) -> Self {
        let (handle, completion) = completion();
        handle.resolve(result);
        completion
    }

    /// Wait for the engine's answer; a dropped handle counts as an unknown error
    pub async fn wait(self) -> Result<T, EngineError> {
        match self.receiver.await {
            Ok(result) => result,
            Err(_) => Err(EngineError::unknown("engine dropped the completion")),
        }
    }
}
