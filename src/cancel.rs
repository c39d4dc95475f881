//! Interrupt handling.
//!
//! Ctrl-C never interrupts a record in flight: the signal only sets a flag,
//! and the engine polls that flag between records. A second Ctrl-C exits the
//! process immediately.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::*;

use crate::error::{PurgeError, Result};

/// Exit status used when a second interrupt forces the process down
pub const FORCED_EXIT_CODE: i32 = 130;

/// Shared stop request, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Turns the process interrupt signal into a [`StopFlag`].
#[derive(Debug, Default)]
pub struct CancellationController {
    flag: StopFlag,
    activated: AtomicBool,
}

impl CancellationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to hand to the engine
    pub fn flag(&self) -> StopFlag {
        self.flag.clone()
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flag.is_stop_requested()
    }

    /// True once the Ctrl-C listener is installed
    pub fn is_active(&self) -> bool {
        self.activated.load(Ordering::SeqCst)
    }

    /// Install the Ctrl-C listener. Must be called from within a tokio runtime.
    ///
    /// Calling it again is a no-op.
    pub fn activate(&self) -> Result<()> {
        if self.activated.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            self.activated.store(false, Ordering::SeqCst);
            PurgeError::Config(format!("no async runtime for signal handling: {}", e))
        })?;

        let flag = self.flag.clone();
        handle.spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    log::error!("Failed to listen for ctrl+c signal: {}", e);
                    return;
                }
                if flag.is_stop_requested() {
                    log::warn!("Second interrupt, exiting without finishing current record");
                    eprintln!("\n{}", "Interrupted again, exiting.".red());
                    std::process::exit(FORCED_EXIT_CODE);
                } else {
                    log::info!("Stop requested by interrupt");
                    eprintln!("\n{}", "Stop requested, finishing current record...".yellow());
                    flag.request_stop();
                }
            }
        });

        log::debug!("Interrupt listener installed");
        Ok(())
    }
}
