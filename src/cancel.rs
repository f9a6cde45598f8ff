//! Cooperative cancellation for scan passes.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

/// Cloneable flag, polled by the engine once per completed height.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    flag: Arc<AtomicBool>,
}

impl CancelSignal {
    /// Signal that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The current height still completes.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether [`Self::cancel`] was called on this signal or a clone.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Set this signal on SIGINT (ctrl-c). Must be called inside a tokio
    /// runtime.
    pub fn listen_for_ctrl_c(&self) -> tokio::task::JoinHandle<()> {
        let signal = self.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("received SIGINT, finishing current block");
                    signal.cancel();
                }
                Err(e) => warn!(error = %e, "could not install SIGINT handler"),
            }
        })
    }
}
