//! Cooperative cancellation and Ctrl+C handling.
//!
//! A [`StopSignal`] wraps a shared `AtomicBool`. The walker checks it between
//! entries, the pipeline checks it before dispatching each file, and every
//! worker checks it before starting a file. Setting it never interrupts work
//! that has already started and never rolls back recorded results.
//!
//! # Usage
//!
//! ```rust,no_run
//! use mediadupe::signal::install_handler;
//!
//! let stop = install_handler().expect("Failed to install signal handler");
//!
//! // Hand clones to the pipeline; Ctrl+C or `request_stop()` flips them all.
//! let worker_view = stop.clone();
//! if worker_view.is_stop_requested() {
//!     return;
//! }
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Exit code for SIGINT (Ctrl+C) interruption.
/// This follows Unix convention: 128 + signal number (SIGINT = 2).
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Shared, idempotent stop flag.
///
/// Cloning is cheap and every clone observes the same flag. `StopSignal` is
/// `Send` and `Sync`, so it can be moved into worker closures freely.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    /// Create a new signal with no stop requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a stop has been requested.
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request a stop. Safe to call any number of times from any thread.
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Get a clone of the underlying flag.
    ///
    /// Useful for handing the flag to code that only knows about atomics,
    /// such as the Ctrl+C closure.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Clear the flag so the signal can be reused for a new scan.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_SIGNAL: OnceLock<StopSignal> = OnceLock::new();

/// Install a Ctrl+C handler that requests a stop on interrupt.
///
/// Call once, early in the application startup. If a handler is already
/// installed (tests calling `run_app()` repeatedly), the existing signal is
/// reset and returned. If another library owns the Ctrl+C hook, an unhooked
/// signal is returned that still honours manual `request_stop()` calls.
///
/// # Errors
///
/// Never fails in practice; the `Result` is kept so callers handle a future
/// strict mode uniformly.
pub fn install_handler() -> Result<StopSignal, SignalError> {
    if let Some(signal) = GLOBAL_SIGNAL.get() {
        signal.reset();
        return Ok(signal.clone());
    }

    let signal = StopSignal::new();
    let flag = signal.get_flag();

    match ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);

        let _ = writeln!(
            std::io::stderr(),
            "\nInterrupted. Finishing files in progress..."
        );
        let _ = std::io::stderr().flush();

        log::info!("Stop signal received");
    }) {
        Ok(()) => {
            let _ = GLOBAL_SIGNAL.set(signal.clone());
            Ok(signal)
        }
        Err(_) => {
            if let Some(existing) = GLOBAL_SIGNAL.get() {
                existing.reset();
                Ok(existing.clone())
            } else {
                log::debug!("Ctrl+C handler already registered, using unhooked stop signal");
                let fallback = StopSignal::new();
                let _ = GLOBAL_SIGNAL.set(fallback.clone());
                Ok(fallback)
            }
        }
    }
}
