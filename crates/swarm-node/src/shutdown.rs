//! Double-Ctrl+C shutdown controller: the first signal asks the work loop
//! to drain gracefully, a second forces an immediate exit. Same shape as
//! the teacher's `ShutdownController`, reimplemented on the `ctrlc` crate
//! instead of `tokio::signal::ctrl_c()` since this node has no async
//! runtime.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownEvent {
    Graceful,
    Immediate,
}

pub struct ShutdownController {
    forced: AtomicU8,
    requested: AtomicBool,
}

impl ShutdownController {
    pub fn new() -> Arc<Self> {
        Arc::new(ShutdownController {
            forced: AtomicU8::new(0),
            requested: AtomicBool::new(false),
        })
    }

    /// Records one Ctrl+C press, returning which event it represents.
    fn bump(&self) -> ShutdownEvent {
        self.requested.store(true, Ordering::SeqCst);
        if self.forced.fetch_add(1, Ordering::SeqCst) == 0 {
            ShutdownEvent::Graceful
        } else {
            ShutdownEvent::Immediate
        }
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Installs the Ctrl+C handler. Returns an error if a handler is already
/// installed in this process (only one may be registered per process).
pub fn install(controller: Arc<ShutdownController>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        let event = controller.bump();
        match event {
            ShutdownEvent::Graceful => {
                swarm_core::log_warn!("received interrupt, draining in-flight work (press again to force exit)");
            }
            ShutdownEvent::Immediate => {
                swarm_core::log_warn!("received second interrupt, exiting immediately");
                std::process::exit(130);
            }
        }
    })
}
