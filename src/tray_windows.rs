//! System Tray Controller
//!
//! Persistent tray icon with the monitor's context menu. Its message loop
//! runs on the main thread and is the process keep-alive.

use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{error, info};
use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, POINT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Shell::{
    Shell_NotifyIconW, NIF_ICON, NIF_MESSAGE, NIF_TIP, NIM_ADD, NIM_DELETE, NOTIFYICONDATAW,
};
use windows::Win32::UI::WindowsAndMessaging::*;

use crate::config::Config;
use crate::poller::PollerHandle;
use crate::{dashboard, icon, notifier};

const WM_TRAYICON: u32 = WM_USER + 1;

const ID_TRAY_DASHBOARD: u32 = 1001;
const ID_TRAY_CHECK_NOW: u32 = 1002;
const ID_TRAY_ABOUT: u32 = 1003;
const ID_TRAY_EXIT: u32 = 1004;

static MESSAGE_THREAD_ID: OnceCell<u32> = OnceCell::new();

/// Config and poller handle for menu dispatch.
struct TrayContext {
    config: Arc<Config>,
    poller: PollerHandle,
}

static CONTEXT: OnceCell<TrayContext> = OnceCell::new();

/// Requests exit (callable from outside, e.g. the CTRL+C handler)
pub fn request_exit() {
    unsafe {
        if let Some(&thread_id) = MESSAGE_THREAD_ID.get() {
            let _ = PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
        }
    }
}

/// Creates the tray icon and blocks on its message loop until exit.
pub fn run(config: Arc<Config>, poller: PollerHandle) -> Result<(), String> {
    CONTEXT
        .set(TrayContext { config, poller })
        .map_err(|_| "tray controller started twice".to_string())?;

    unsafe {
        let instance = GetModuleHandleW(None).map_err(|e| format!("GetModuleHandle: {}", e))?;

        let class_name = w!("LolbinMonitorTray");
        let wc = WNDCLASSW {
            lpfnWndProc: Some(tray_window_proc),
            hInstance: instance.into(),
            lpszClassName: class_name,
            ..Default::default()
        };

        let atom = RegisterClassW(&wc);
        if atom == 0 {
            // Class already exists - OK
        }

        let hwnd = CreateWindowExW(
            WINDOW_EX_STYLE(0),
            class_name,
            w!("LOLBin Monitor Tray"),
            WINDOW_STYLE(0),
            0,
            0,
            0,
            0,
            None,
            None,
            instance,
            None,
        )
        .map_err(|e| format!("CreateWindowExW: {}", e))?;

        let _ = MESSAGE_THREAD_ID.set(GetCurrentThreadId());

        add_tray_icon(hwnd)?;

        info!("Tray icon created");

        // Message Loop (blocks the main thread until exit)
        let mut msg = MSG::default();
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            let _ = DispatchMessageW(&msg);
        }

        remove_tray_icon(hwnd);
    }

    Ok(())
}

/// Adds the tray icon
unsafe fn add_tray_icon(hwnd: HWND) -> Result<(), String> {
    let ctx = CONTEXT.get().ok_or("tray context not set")?;

    // Shield icon rendered at the configured size; stock icon as fallback.
    let icon = icon::create_icon(ctx.config.icon_size_px)
        .unwrap_or_else(|| LoadIconW(None, IDI_APPLICATION).unwrap_or_default());

    let mut nid = NOTIFYICONDATAW {
        cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
        hWnd: hwnd,
        uID: 1,
        uFlags: NIF_ICON | NIF_MESSAGE | NIF_TIP,
        uCallbackMessage: WM_TRAYICON,
        hIcon: icon,
        ..Default::default()
    };

    // Set tooltip
    let tip = format!("{} - monitoring for suspicious activity", ctx.config.app_name);
    let tip_wide: Vec<u16> = tip.encode_utf16().collect();
    for (i, &c) in tip_wide.iter().enumerate() {
        if i < 127 {
            nid.szTip[i] = c;
        }
    }

    if !Shell_NotifyIconW(NIM_ADD, &nid).as_bool() {
        return Err("Shell_NotifyIconW ADD failed".to_string());
    }

    Ok(())
}

/// Removes the tray icon
unsafe fn remove_tray_icon(hwnd: HWND) {
    let nid = NOTIFYICONDATAW {
        cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
        hWnd: hwnd,
        uID: 1,
        ..Default::default()
    };
    let _ = Shell_NotifyIconW(NIM_DELETE, &nid);
}

/// Shows the context menu
unsafe fn show_context_menu(hwnd: HWND) {
    let menu = CreatePopupMenu().unwrap_or_default();

    let _ = AppendMenuW(
        menu,
        MF_STRING,
        ID_TRAY_DASHBOARD as usize,
        w!("Open Dashboard"),
    );
    let _ = AppendMenuW(
        menu,
        MF_STRING,
        ID_TRAY_CHECK_NOW as usize,
        w!("Check for Alerts Now"),
    );
    let _ = AppendMenuW(menu, MF_STRING, ID_TRAY_ABOUT as usize, w!("About"));
    let _ = AppendMenuW(menu, MF_SEPARATOR, 0, PCWSTR::null());
    let _ = AppendMenuW(menu, MF_STRING, ID_TRAY_EXIT as usize, w!("Exit"));

    // Get cursor position
    let mut pt = POINT::default();
    let _ = GetCursorPos(&mut pt);

    // Bring window to foreground (needed for correct menu behavior)
    let _ = SetForegroundWindow(hwnd);

    // Show menu
    let _ = TrackPopupMenu(
        menu,
        TPM_BOTTOMALIGN | TPM_LEFTALIGN,
        pt.x,
        pt.y,
        0,
        hwnd,
        None,
    );

    let _ = DestroyMenu(menu);
}

/// About popup body, including the advisory last-check time.
fn about_body(ctx: &TrayContext) -> String {
    let last_check = ctx
        .poller
        .last_check()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());

    format!(
        "{} Tray App\nVersion {}\n\nMonitoring for suspicious activity.\nLast check: {}",
        ctx.config.app_name,
        env!("CARGO_PKG_VERSION"),
        last_check
    )
}

/// Handles a context menu selection.
fn handle_menu_command(cmd: u32) {
    let Some(ctx) = CONTEXT.get() else {
        error!("Tray command {} before context was set", cmd);
        return;
    };

    match cmd {
        ID_TRAY_DASHBOARD => dashboard::open_url(&ctx.config.dashboard_url),
        ID_TRAY_CHECK_NOW => ctx.poller.check_now(),
        ID_TRAY_ABOUT => notifier::show_info(
            format!("About {}", ctx.config.app_name),
            about_body(ctx),
        ),
        ID_TRAY_EXIT => {
            info!("Exit requested via tray menu");
            unsafe { PostQuitMessage(0) };
        }
        _ => {}
    }
}

/// Window Procedure for tray messages
unsafe extern "system" fn tray_window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_TRAYICON => {
            let event = (lparam.0 & 0xFFFF) as u32;
            if event == WM_LBUTTONDBLCLK {
                // Double-click: straight to the dashboard
                if let Some(ctx) = CONTEXT.get() {
                    dashboard::open_url(&ctx.config.dashboard_url);
                }
            } else if event == WM_RBUTTONUP {
                // Right-click: Context menu
                show_context_menu(hwnd);
            }
            LRESULT(0)
        }

        WM_COMMAND => {
            handle_menu_command((wparam.0 & 0xFFFF) as u32);
            LRESULT(0)
        }

        WM_DESTROY => {
            remove_tray_icon(hwnd);
            PostQuitMessage(0);
            LRESULT(0)
        }

        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}
