//! Dashboard Navigation
//!
//! Opens the web dashboard (and per-alert deep links) in the default browser.

use tracing::{info, warn};

/// Opens a URL with the platform's default handler. Fire-and-forget.
pub fn open_url(url: &str) {
    info!("Opening {}", url);
    if let Err(e) = spawn_opener(url) {
        warn!("Could not open {}: {}", url, e);
    }
}

#[cfg(windows)]
fn spawn_opener(url: &str) -> std::io::Result<()> {
    std::process::Command::new("explorer.exe")
        .arg(url)
        .spawn()
        .map(|_| ())
}

#[cfg(target_os = "macos")]
fn spawn_opener(url: &str) -> std::io::Result<()> {
    std::process::Command::new("open").arg(url).spawn().map(|_| ())
}

#[cfg(not(any(windows, target_os = "macos")))]
fn spawn_opener(url: &str) -> std::io::Result<()> {
    std::process::Command::new("xdg-open")
        .arg(url)
        .spawn()
        .map(|_| ())
}
