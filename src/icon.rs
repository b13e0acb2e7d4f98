//! Tray Icon Rendering
//!
//! Draws the alert shield (red shield, white exclamation mark) into an RGBA
//! buffer at the configured size, and converts it to an `HICON` on Windows.

/// Shield fill (RGBA).
const SHIELD_COLOR: [u8; 4] = [200, 0, 0, 255];
/// Exclamation-mark fill (RGBA).
const DETAIL_COLOR: [u8; 4] = [255, 255, 255, 255];

/// Renders the shield icon as a tightly packed RGBA buffer (`size * size * 4`).
///
/// Geometry is defined on a 64-unit canvas and scaled, so any tray icon size
/// works.
pub fn render_shield(size: u32) -> Vec<u8> {
    let s = size.max(1) as f32 / 64.0;
    let size = size.max(1);

    // Shield outline on the 64-unit canvas.
    let shield: [(f32, f32); 6] = [
        (32.0 * s, 5.0 * s),
        (59.0 * s, 20.0 * s),
        (54.0 * s, 54.0 * s),
        (32.0 * s, 59.0 * s),
        (10.0 * s, 54.0 * s),
        (5.0 * s, 20.0 * s),
    ];

    // Exclamation bar and dot.
    let bar = (27.0 * s, 16.0 * s, 37.0 * s, 42.0 * s);
    let dot_center = (32.0 * s, 52.0 * s);
    let dot_radius = 5.0 * s;

    let mut rgba = vec![0u8; (size * size * 4) as usize];
    for py in 0..size {
        for px in 0..size {
            let x = px as f32 + 0.5;
            let y = py as f32 + 0.5;

            let color = if in_bar(bar, x, y) || in_dot(dot_center, dot_radius, x, y) {
                Some(DETAIL_COLOR)
            } else if inside_polygon(&shield, x, y) {
                Some(SHIELD_COLOR)
            } else {
                None
            };

            if let Some(c) = color {
                let i = ((py * size + px) * 4) as usize;
                rgba[i..i + 4].copy_from_slice(&c);
            }
        }
    }

    rgba
}

fn in_bar(bar: (f32, f32, f32, f32), x: f32, y: f32) -> bool {
    x >= bar.0 && x <= bar.2 && y >= bar.1 && y <= bar.3
}

fn in_dot(center: (f32, f32), radius: f32, x: f32, y: f32) -> bool {
    let dx = x - center.0;
    let dy = y - center.1;
    dx * dx + dy * dy <= radius * radius
}

/// Even-odd ray casting.
fn inside_polygon(points: &[(f32, f32)], x: f32, y: f32) -> bool {
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (xi, yi) = points[i];
        let (xj, yj) = points[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Builds an `HICON` from the rendered shield. Returns `None` if any GDI call
/// fails; callers fall back to the stock application icon.
#[cfg(windows)]
pub fn create_icon(size: u32) -> Option<windows::Win32::UI::WindowsAndMessaging::HICON> {
    use windows::Win32::Graphics::Gdi::{CreateBitmap, DeleteObject, HGDIOBJ};
    use windows::Win32::UI::WindowsAndMessaging::{CreateIconIndirect, ICONINFO};

    let size = size.max(1);
    let rgba = render_shield(size);

    // GDI wants BGRA.
    let bgra: Vec<u8> = rgba
        .chunks_exact(4)
        .flat_map(|px| [px[2], px[1], px[0], px[3]])
        .collect();

    // Monochrome AND mask, rows padded to 16 bits. All zero: transparency
    // comes from the alpha channel.
    let mask_stride = ((size + 15) / 16 * 2) as usize;
    let mask = vec![0u8; mask_stride * size as usize];

    unsafe {
        let color = CreateBitmap(
            size as i32,
            size as i32,
            1,
            32,
            Some(bgra.as_ptr() as *const _),
        );
        let mono = CreateBitmap(
            size as i32,
            size as i32,
            1,
            1,
            Some(mask.as_ptr() as *const _),
        );

        let info = ICONINFO {
            fIcon: true.into(),
            xHotspot: 0,
            yHotspot: 0,
            hbmMask: mono,
            hbmColor: color,
        };
        let icon = CreateIconIndirect(&info).ok();

        let _ = DeleteObject(HGDIOBJ(color.0));
        let _ = DeleteObject(HGDIOBJ(mono.0));

        icon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(buf: &[u8], size: u32, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * size + x) * 4) as usize;
        [buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]
    }

    #[test]
    fn buffer_is_tightly_packed_rgba() {
        assert_eq!(render_shield(64).len(), 64 * 64 * 4);
        assert_eq!(render_shield(16).len(), 16 * 16 * 4);
    }

    #[test]
    fn corners_are_transparent() {
        let buf = render_shield(64);
        assert_eq!(pixel(&buf, 64, 1, 1)[3], 0);
        assert_eq!(pixel(&buf, 64, 62, 62)[3], 0);
    }

    #[test]
    fn shield_body_is_red() {
        let buf = render_shield(64);
        assert_eq!(pixel(&buf, 64, 8, 22), SHIELD_COLOR);
        assert_eq!(pixel(&buf, 64, 32, 10), SHIELD_COLOR);
    }

    #[test]
    fn exclamation_mark_is_white() {
        let buf = render_shield(64);
        // Bar.
        assert_eq!(pixel(&buf, 64, 32, 30), DETAIL_COLOR);
        // Dot.
        assert_eq!(pixel(&buf, 64, 32, 52), DETAIL_COLOR);
    }

    #[test]
    fn scales_to_other_sizes() {
        let buf = render_shield(32);
        // Bar midpoint on the scaled canvas.
        assert_eq!(pixel(&buf, 32, 16, 15), DETAIL_COLOR);
        assert_eq!(pixel(&buf, 32, 1, 1)[3], 0);
    }
}
