//! Double-Ctrl+C shutdown controller, same shape as the node's (see
//! `swarm-node/src/shutdown.rs`) and grounded in the same teacher file.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

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

    fn bump(&self) {
        self.requested.store(true, Ordering::SeqCst);
        if self.forced.fetch_add(1, Ordering::SeqCst) > 0 {
            swarm_core::log_warn!("received second interrupt, exiting immediately");
            std::process::exit(130);
        }
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

pub fn install(controller: Arc<ShutdownController>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        controller.bump();
        swarm_core::log_warn!("received interrupt, finishing in-flight connections (press again to force exit)");
    })
}
