//! Headless popup fallback for non-Windows builds.
//!
//! Logs the notification and keeps the registry entry alive for the display
//! window so the supervision bookkeeping behaves the same everywhere.

use std::thread;
use std::time::Duration;
use tracing::info;

use super::PopupContent;

pub(super) fn spawn(content: PopupContent) {
    thread::spawn(move || {
        info!("[{}] {}", content.title, content.body.replace('\n', " "));
        if let Some(url) = &content.detail_url {
            info!("Details: {}", url);
        }
        thread::sleep(Duration::from_millis(super::AUTO_CLOSE_MS as u64));
        super::unregister(content.id);
    });
}

pub(super) fn request_close(_surface: usize) {
    // No native surface to close; the entry expires with its display window.
}
