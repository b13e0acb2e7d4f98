//! Alert Notifications
//!
//! Dispatches one popup surface per notification and supervises the open set
//! so the controller can dismiss everything on exit. The Win32 surface lives
//! in `popup_windows.rs`; other platforms get a logging fallback.

use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::alert::Alert;
use crate::config::Config;

#[cfg(windows)]
#[path = "popup_windows.rs"]
mod popup;
#[cfg(not(windows))]
#[path = "popup_headless.rs"]
mod popup;

/// Popups close themselves after this long if the user takes no action.
pub(crate) const AUTO_CLOSE_MS: u32 = 15_000;

/// Everything a popup surface needs to render itself.
pub struct PopupContent {
    pub id: u64,
    pub title: String,
    pub body: String,
    /// Dashboard deep link; present only for real alerts, and the reason a
    /// "View Details" button appears.
    pub detail_url: Option<String>,
    /// Stacking slot at spawn time (0 = bottom-most corner position).
    pub slot: usize,
}

static NEXT_POPUP_ID: AtomicU64 = AtomicU64::new(1);

lazy_static! {
    // Popup id -> native surface handle (0 until the window exists).
    static ref OPEN_POPUPS: Mutex<HashMap<u64, usize>> = Mutex::new(HashMap::new());
}

/// Shows the popup for a newly detected alert.
pub fn show_alert(config: &Config, alert: &Alert) {
    let detail_url = config.alert_url(&alert.key());
    show(alert.title(), alert.body(), Some(detail_url));
}

/// Startup popup confirming the monitor is live.
pub fn show_startup(config: &Config) {
    show(
        format!("{} Active", config.app_name),
        "The LOLBin detection system is now running in the background. \
         You will be notified of any suspicious activity."
            .to_string(),
        None,
    );
}

/// Informational popup (About, etc.) without a deep link.
pub fn show_info(title: String, body: String) {
    show(title, body, None);
}

fn show(title: String, body: String, detail_url: Option<String>) {
    let id = NEXT_POPUP_ID.fetch_add(1, Ordering::SeqCst);

    let slot = {
        let mut open = OPEN_POPUPS.lock();
        let slot = open.len();
        open.insert(id, 0);
        slot
    };

    popup::spawn(PopupContent {
        id,
        title,
        body,
        detail_url,
        slot,
    });
}

/// Posts a close request to every outstanding popup. Called on exit.
pub fn dismiss_all() {
    let surfaces: Vec<usize> = OPEN_POPUPS.lock().values().copied().collect();
    if !surfaces.is_empty() {
        tracing::info!("Dismissing {} open notifications", surfaces.len());
    }
    for surface in surfaces {
        popup::request_close(surface);
    }
}

/// Called by the platform surface once its native window exists.
pub(crate) fn register_surface(id: u64, surface: usize) {
    if let Some(slot) = OPEN_POPUPS.lock().get_mut(&id) {
        *slot = surface;
    }
}

/// Called by the platform surface when it is torn down.
pub(crate) fn unregister(id: u64) {
    OPEN_POPUPS.lock().remove(&id);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_count() -> usize {
        OPEN_POPUPS.lock().len()
    }

    // Single test: the registry is process-global, so parallel test
    // functions would observe each other's entries.
    #[test]
    fn registry_tracks_the_popup_lifecycle() {
        let base = open_count();

        let id_a = NEXT_POPUP_ID.fetch_add(1, Ordering::SeqCst);
        let id_b = NEXT_POPUP_ID.fetch_add(1, Ordering::SeqCst);
        OPEN_POPUPS.lock().insert(id_a, 0);
        OPEN_POPUPS.lock().insert(id_b, 0);
        assert_eq!(open_count(), base + 2);

        // Surface attaches once the window is created.
        register_surface(id_a, 42);
        assert_eq!(OPEN_POPUPS.lock().get(&id_a), Some(&42));

        // A surface for an already-closed popup is ignored.
        register_surface(9_999_999, 7);
        assert_eq!(open_count(), base + 2);

        unregister(id_a);
        unregister(id_b);
        assert_eq!(open_count(), base);

        // Dismissing with nothing open is a no-op.
        dismiss_all();
    }
}
