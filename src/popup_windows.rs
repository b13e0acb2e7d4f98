//! Alert Popup Windows
//!
//! Transient always-on-top surfaces in the bottom-right screen corner.
//! Each popup runs its own message loop thread, auto-closes after 15 seconds,
//! and offers Dismiss / View Details buttons.

use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::thread;
use tracing::error;
use windows::core::w;
use windows::Win32::Foundation::{COLORREF, HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, CreatePen, CreateRoundRectRgn, CreateSolidBrush, DeleteObject, DrawTextW,
    EndPaint, FillRect, RoundRect, SelectObject, SetBkMode, SetTextColor, SetWindowRgn,
    DT_CENTER, DT_END_ELLIPSIS, DT_SINGLELINE, DT_VCENTER, DT_WORDBREAK, HGDIOBJ, PAINTSTRUCT,
    PS_SOLID, TRANSPARENT,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::*;

use super::PopupContent;
use crate::dashboard;

// Layout constants
const POPUP_WIDTH: i32 = 400;
const POPUP_HEIGHT: i32 = 200;
const MARGIN_RIGHT: i32 = 20;
const MARGIN_BOTTOM: i32 = 50;
const STACK_GAP: i32 = 10;
const HEADER_HEIGHT: i32 = 35;
const BTN_WIDTH: i32 = 95;
const BTN_HEIGHT: i32 = 24;
const BTN_MARGIN: i32 = 12;
const CORNER_RADIUS: i32 = 12;

const AUTO_CLOSE_TIMER_ID: usize = 1;

// Colors (BGR Format!)
const COLOR_ALERT: u32 = 0x000000FF; // Red header for alerts
const COLOR_INFO: u32 = 0x00228B22; // Green header for info popups
const COLOR_TEXT: u32 = 0x00FFFFFF; // White
const COLOR_BODY_BG: u32 = 0x00202020; // Dark gray body
const COLOR_BUTTON_BG: u32 = 0x00333333; // Button background

lazy_static! {
    // HWND -> content, for painting and hit testing.
    static ref CONTENT: Mutex<HashMap<isize, PopupContent>> = Mutex::new(HashMap::new());
}

/// Spawns the popup on its own thread (own message loop).
pub(super) fn spawn(content: PopupContent) {
    thread::spawn(move || {
        if let Err(e) = create_popup(content) {
            error!("Popup window error: {}", e);
        }
    });
}

/// Asks an open popup to close. Safe to call with a not-yet-attached surface.
pub(super) fn request_close(surface: usize) {
    if surface != 0 {
        unsafe {
            let _ = PostMessageW(HWND(surface as *mut _), WM_CLOSE, WPARAM(0), LPARAM(0));
        }
    }
}

/// Creates the popup window and runs its message loop until it is destroyed.
fn create_popup(content: PopupContent) -> Result<(), String> {
    unsafe {
        let instance = GetModuleHandleW(None).map_err(|e| format!("GetModuleHandle: {}", e))?;

        let class_name = w!("LolbinMonitorPopup");
        let wc = WNDCLASSW {
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(popup_proc),
            hInstance: instance.into(),
            hCursor: LoadCursorW(None, IDC_ARROW).unwrap_or_default(),
            lpszClassName: class_name,
            ..Default::default()
        };
        let atom = RegisterClassW(&wc);
        if atom == 0 {
            // Class already exists - OK
        }

        // Bottom-right corner; concurrent popups stack upward.
        let screen_w = GetSystemMetrics(SM_CXSCREEN);
        let screen_h = GetSystemMetrics(SM_CYSCREEN);
        let x = screen_w - POPUP_WIDTH - MARGIN_RIGHT;
        let y = (screen_h
            - POPUP_HEIGHT
            - MARGIN_BOTTOM
            - content.slot as i32 * (POPUP_HEIGHT + STACK_GAP))
            .max(0);

        let hwnd = CreateWindowExW(
            WS_EX_TOPMOST | WS_EX_TOOLWINDOW | WS_EX_LAYERED,
            class_name,
            w!("LOLBin Monitor"),
            WS_POPUP,
            x,
            y,
            POPUP_WIDTH,
            POPUP_HEIGHT,
            None,
            None,
            instance,
            None,
        )
        .map_err(|e| format!("CreateWindowExW: {}", e))?;

        let id = content.id;
        CONTENT.lock().insert(hwnd.0 as isize, content);
        super::register_surface(id, hwnd.0 as usize);

        // Rounded corners
        let rgn = CreateRoundRectRgn(
            0,
            0,
            POPUP_WIDTH + 1,
            POPUP_HEIGHT + 1,
            CORNER_RADIUS,
            CORNER_RADIUS,
        );
        let _ = SetWindowRgn(hwnd, rgn, true);

        let _ = SetLayeredWindowAttributes(hwnd, COLORREF(0), 230, LWA_ALPHA);

        // Show without stealing focus from whatever the user is doing.
        let _ = ShowWindow(hwnd, SW_SHOWNOACTIVATE);
        let _ = SetWindowPos(
            hwnd,
            HWND_TOPMOST,
            x,
            y,
            POPUP_WIDTH,
            POPUP_HEIGHT,
            SWP_SHOWWINDOW | SWP_NOACTIVATE,
        );

        let _ = SetTimer(hwnd, AUTO_CLOSE_TIMER_ID, super::AUTO_CLOSE_MS, None);

        let mut msg = MSG::default();
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            let _ = DispatchMessageW(&msg);
        }
    }

    Ok(())
}

/// Button rectangles for the current content: (dismiss, view_details).
fn button_rects(has_details: bool) -> (RECT, Option<RECT>) {
    let btn_y = POPUP_HEIGHT - BTN_HEIGHT - BTN_MARGIN;
    let dismiss = RECT {
        left: POPUP_WIDTH - BTN_WIDTH - BTN_MARGIN,
        top: btn_y,
        right: POPUP_WIDTH - BTN_MARGIN,
        bottom: btn_y + BTN_HEIGHT,
    };
    let details = has_details.then(|| RECT {
        left: dismiss.left - BTN_WIDTH - 8,
        top: btn_y,
        right: dismiss.left - 8,
        bottom: btn_y + BTN_HEIGHT,
    });
    (dismiss, details)
}

fn hit(rect: &RECT, x: i32, y: i32) -> bool {
    x >= rect.left && x <= rect.right && y >= rect.top && y <= rect.bottom
}

/// Draws a rounded button with centered text
unsafe fn draw_button(hdc: windows::Win32::Graphics::Gdi::HDC, rect: &RECT, text: &str) {
    let brush = CreateSolidBrush(COLORREF(COLOR_BUTTON_BG));
    let pen = CreatePen(PS_SOLID, 1, COLORREF(COLOR_BUTTON_BG));

    let old_brush = SelectObject(hdc, brush);
    let old_pen = SelectObject(hdc, pen);

    let _ = RoundRect(hdc, rect.left, rect.top, rect.right, rect.bottom, 6, 6);

    SelectObject(hdc, old_brush);
    SelectObject(hdc, old_pen);
    let _ = DeleteObject(HGDIOBJ(brush.0));
    let _ = DeleteObject(HGDIOBJ(pen.0));

    let _ = SetTextColor(hdc, COLORREF(COLOR_TEXT));
    let mut text_wide: Vec<u16> = text.encode_utf16().collect();
    let mut text_rect = *rect;
    let _ = DrawTextW(
        hdc,
        &mut text_wide,
        &mut text_rect,
        DT_CENTER | DT_VCENTER | DT_SINGLELINE,
    );
}

/// Window Procedure for popup windows
unsafe extern "system" fn popup_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_PAINT => {
            let mut ps = PAINTSTRUCT::default();
            let hdc = BeginPaint(hwnd, &mut ps);

            let mut rect = RECT::default();
            let _ = GetClientRect(hwnd, &mut rect);

            let content = CONTENT.lock();
            if let Some(popup) = content.get(&(hwnd.0 as isize)) {
                // Body background
                let body_brush = CreateSolidBrush(COLORREF(COLOR_BODY_BG));
                let _ = FillRect(hdc, &rect, body_brush);
                let _ = DeleteObject(HGDIOBJ(body_brush.0));

                // Header: red for alerts, green for info
                let header_rect = RECT {
                    left: 0,
                    top: 0,
                    right: rect.right,
                    bottom: HEADER_HEIGHT,
                };
                let header_color = if popup.detail_url.is_some() {
                    COLOR_ALERT
                } else {
                    COLOR_INFO
                };
                let header_brush = CreateSolidBrush(COLORREF(header_color));
                let _ = FillRect(hdc, &header_rect, header_brush);
                let _ = DeleteObject(HGDIOBJ(header_brush.0));

                let _ = SetBkMode(hdc, TRANSPARENT);

                // Title
                let _ = SetTextColor(hdc, COLORREF(COLOR_TEXT));
                let mut title_wide: Vec<u16> = popup.title.encode_utf16().collect();
                let mut title_rect = RECT {
                    left: 12,
                    top: 0,
                    right: rect.right - 12,
                    bottom: HEADER_HEIGHT,
                };
                let _ = DrawTextW(
                    hdc,
                    &mut title_wide,
                    &mut title_rect,
                    DT_VCENTER | DT_SINGLELINE | DT_END_ELLIPSIS,
                );

                // Body text (word-wrapped, above the button row)
                let mut body_wide: Vec<u16> = popup.body.encode_utf16().collect();
                let mut body_rect = RECT {
                    left: 12,
                    top: HEADER_HEIGHT + 10,
                    right: rect.right - 12,
                    bottom: POPUP_HEIGHT - BTN_HEIGHT - BTN_MARGIN - 8,
                };
                let _ = DrawTextW(
                    hdc,
                    &mut body_wide,
                    &mut body_rect,
                    DT_WORDBREAK | DT_END_ELLIPSIS,
                );

                // Buttons
                let (dismiss, details) = button_rects(popup.detail_url.is_some());
                draw_button(hdc, &dismiss, "Dismiss");
                if let Some(details) = details {
                    draw_button(hdc, &details, "View Details");
                }
            }
            drop(content);

            let _ = EndPaint(hwnd, &ps);
            LRESULT(0)
        }

        WM_LBUTTONDOWN => {
            let x = (lparam.0 & 0xFFFF) as i16 as i32;
            let y = ((lparam.0 >> 16) & 0xFFFF) as i16 as i32;

            let detail_url = {
                let content = CONTENT.lock();
                content
                    .get(&(hwnd.0 as isize))
                    .and_then(|popup| popup.detail_url.clone())
            };

            let (dismiss, details) = button_rects(detail_url.is_some());

            if hit(&dismiss, x, y) {
                let _ = DestroyWindow(hwnd);
            } else if let (Some(details_rect), Some(url)) = (details, detail_url) {
                if hit(&details_rect, x, y) {
                    dashboard::open_url(&url);
                    let _ = DestroyWindow(hwnd);
                }
            }
            LRESULT(0)
        }

        WM_TIMER => {
            // Auto-close after the display window elapses
            if wparam.0 == AUTO_CLOSE_TIMER_ID {
                let _ = DestroyWindow(hwnd);
            }
            LRESULT(0)
        }

        WM_DESTROY => {
            let _ = KillTimer(hwnd, AUTO_CLOSE_TIMER_ID);
            if let Some(popup) = CONTENT.lock().remove(&(hwnd.0 as isize)) {
                super::unregister(popup.id);
            }
            PostQuitMessage(0);
            LRESULT(0)
        }

        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}
