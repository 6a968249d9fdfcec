use futures::channel::oneshot::Receiver;
use thiserror::Error;

/// Why a task's result could not be obtained.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum JoinError {
    /// The task has not finished; its result slot is still unset.
    #[error("task result is unset")]
    NoResult,

    /// The task was dropped or cancelled and will never produce a result.
    #[error("task handle is no longer valid")]
    Invalid,
}

/// Owning handle to a spawned task's result slot.
///
/// Dropping the handle detaches the task: it keeps running on the
/// executor, but its result is delivered to nobody.
pub struct JoinHandle<T> {
    receiver: Receiver<T>,
}

impl<T> JoinHandle<T> {
    pub(crate) fn new(receiver: Receiver<T>) -> Self {
        Self { receiver }
    }

    /// Non-blocking result check.
    pub fn try_join(&mut self) -> Result<T, JoinError> {
        match self.receiver.try_recv() {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(JoinError::NoResult),
            Err(_) => Err(JoinError::Invalid),
        }
    }

    /// Suspend until the task finishes and take its result.
    pub async fn join(self) -> Result<T, JoinError> {
        self.receiver.await.map_err(|_| JoinError::Invalid)
    }
}
