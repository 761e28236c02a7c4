//! Channel backed handles for in-flight loads

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use super::{AssetError, AssetResult, ResourceHandle};

/// Poll result of a [`PendingLoad`]
#[derive(Debug)]
pub enum LoadStatus<T> {
    /// Still loading
    Pending,
    /// Finished successfully
    Ready(T),
    /// Finished with an error
    Failed(AssetError),
}

/// A load that completes exactly once
///
/// There is no cancellation; dropping the handle discards the result.
#[derive(Debug)]
pub struct PendingLoad<T> {
    handle: ResourceHandle,
    receiver: Receiver<AssetResult<T>>,
}

/// Sending half of a [`PendingLoad`]
#[derive(Debug)]
pub struct LoadCompleter<T> {
    sender: Sender<AssetResult<T>>,
}

impl<T> LoadCompleter<T> {
    /// Deliver the result; ignored if the pending side was dropped
    pub fn complete(self, result: AssetResult<T>) {
        let _ = self.sender.send(result);
    }
}

impl<T> PendingLoad<T> {
    /// Create a pending load and the completer that resolves it
    pub fn channel(handle: ResourceHandle) -> (LoadCompleter<T>, Self) {
        let (sender, receiver) = mpsc::channel();
        (LoadCompleter { sender }, Self { handle, receiver })
    }

    /// Already resolved load
    pub fn resolved(handle: ResourceHandle, result: AssetResult<T>) -> Self {
        let (completer, pending) = Self::channel(handle);
        completer.complete(result);
        pending
    }

    /// Run `load` on a worker thread
    pub fn spawn<F>(handle: ResourceHandle, load: F) -> Self
    where
        T: Send + 'static,
        F: FnOnce() -> AssetResult<T> + Send + 'static,
    {
        let (completer, pending) = Self::channel(handle.clone());
        let spawned = thread::Builder::new()
            .name(format!("asset-load:{handle}"))
            .spawn(move || completer.complete(load()));

        match spawned {
            Ok(_) => pending,
            Err(e) => Self::resolved(handle, Err(AssetError::LoadFailed(format!("failed to spawn loader thread: {e}")))),
        }
    }

    /// Resource this load belongs to
    pub fn handle(&self) -> &ResourceHandle {
        &self.handle
    }

    /// Non-blocking check for completion
    pub fn poll(&mut self) -> LoadStatus<T> {
        match self.receiver.try_recv() {
            Ok(Ok(value)) => LoadStatus::Ready(value),
            Ok(Err(e)) => LoadStatus::Failed(e),
            Err(TryRecvError::Empty) => LoadStatus::Pending,
            Err(TryRecvError::Disconnected) => LoadStatus::Failed(AssetError::LoadFailed(format!(
                "loader for {} went away without a result",
                self.handle
            ))),
        }
    }

    /// Block until the load finishes
    pub fn wait(self) -> AssetResult<T> {
        self.receiver.recv().map_err(|_| {
            AssetError::LoadFailed(format!("loader for {} went away without a result", self.handle))
        })?
    }
}
