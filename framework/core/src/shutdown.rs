use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::{Receiver, Sender};
use tokio::sync::Mutex;

/// Broadcasts a stop signal to every fetch loop and in-flight request of a run.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Sender<()>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            sender: tokio::sync::broadcast::channel(1).0,
        }
    }

    pub fn shutdown(&self) {
        if let Err(e) = self.sender.send(()) {
            // Nothing is running, so there is nothing to stop.
            log::debug!("No run is listening for the shutdown signal: {e:?}");
        }
    }

    /// Only listeners created before [ShutdownHandle::shutdown] is called will observe the signal.
    pub fn new_listener(&self) -> DelegatedShutdownListener {
        DelegatedShutdownListener::new(self.sender.subscribe())
    }
}

#[derive(Clone, Debug)]
pub struct DelegatedShutdownListener {
    receiver: Arc<Mutex<Receiver<()>>>,
}

impl DelegatedShutdownListener {
    pub(crate) fn new(receiver: Receiver<()>) -> Self {
        Self {
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Point in time check for the shutdown signal. Once this has returned true the signal is
    /// consumed, so callers should remember the answer.
    ///
    /// A listener that lagged has missed at least one signal, which counts as a shutdown.
    pub fn should_shutdown(&mut self) -> bool {
        match self.receiver.try_lock() {
            Ok(mut guard) => match guard.try_recv() {
                Ok(_) | Err(TryRecvError::Closed) | Err(TryRecvError::Lagged(_)) => true,
                Err(TryRecvError::Empty) => false,
            },
            Err(_) => false,
        }
    }

    /// Wait until the shutdown signal arrives. Safe to race against other futures with
    /// `tokio::select!` so that in-flight work is dropped when a run is stopped.
    pub async fn wait_for_shutdown(&mut self) {
        let mut receiver = self.receiver.lock().await;
        match receiver.recv().await {
            Ok(()) | Err(RecvError::Closed) => {}
            Err(RecvError::Lagged(skipped)) => {
                log::trace!("Shutdown listener lagged by {skipped} signals");
            }
        }
    }
}

#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct ShutdownSignalError {
    msg: String,
}

impl Default for ShutdownSignalError {
    fn default() -> Self {
        Self {
            msg: "Run cancelled by shutdown signal".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listener_sees_signal_once() {
        let handle = ShutdownHandle::new();
        let mut listener = handle.new_listener();

        assert!(!listener.should_shutdown());
        handle.shutdown();
        assert!(listener.should_shutdown());
        assert!(!listener.should_shutdown());
    }

    #[test]
    fn repeated_signal_still_stops() {
        let handle = ShutdownHandle::new();
        let mut listener = handle.new_listener();

        handle.shutdown();
        handle.shutdown();
        assert!(listener.should_shutdown());
    }

    #[test]
    fn late_listener_misses_signal() {
        let handle = ShutdownHandle::new();
        handle.shutdown();

        let mut listener = handle.new_listener();
        assert!(!listener.should_shutdown());
    }

    #[tokio::test]
    async fn wait_returns_after_signal() {
        let handle = ShutdownHandle::new();
        let mut listener = handle.new_listener();

        let waiter = tokio::spawn(async move { listener.wait_for_shutdown().await });
        handle.shutdown();

        tokio::time::timeout(std::time::Duration::from_secs(5), waiter)
            .await
            .expect("listener did not observe shutdown")
            .unwrap();
    }
}
