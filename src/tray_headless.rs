//! Headless keep-alive loop for non-Windows builds.
//!
//! No tray icon is available; the loop blocks the main thread until exit is
//! requested (Ctrl+C in console mode).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::poller::PollerHandle;

static SHOULD_EXIT: AtomicBool = AtomicBool::new(false);

/// Checks if exit was requested
pub fn should_exit() -> bool {
    SHOULD_EXIT.load(Ordering::SeqCst)
}

/// Requests exit (callable from outside)
pub fn request_exit() {
    SHOULD_EXIT.store(true, Ordering::SeqCst);
}

/// Blocks the main thread until exit is requested.
pub fn run(config: Arc<Config>, _poller: PollerHandle) -> Result<(), String> {
    info!(
        "{}: no system tray on this platform, running headless",
        config.app_name
    );

    while !should_exit() {
        thread::sleep(Duration::from_millis(200));
    }

    Ok(())
}
