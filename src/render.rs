//! Frame overlays: hand skeleton, boxes, polygons and caption text. All
//! primitives write straight into the frame's RGBA buffer and silently clip
//! at the edges.

use std::sync::OnceLock;

use ab_glyph::{FontVec, PxScale};
use image::Rgba;
use imageproc::drawing::{draw_text_mut, text_size};

use crate::types::Frame;

/// Landmark index pairs forming the hand skeleton.
pub const HAND_CONNECTIONS: &[(usize, usize)] = &[
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (0, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    (0, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
    (5, 9),
    (9, 13),
    (13, 17),
];

pub const COLOR_RED: [u8; 4] = [220, 38, 38, 255];
pub const COLOR_BLUE: [u8; 4] = [37, 99, 235, 255];
pub const COLOR_GREEN: [u8; 4] = [16, 185, 129, 255];
pub const COLOR_SKELETON_LINE: [u8; 4] = [56, 189, 248, 255];
pub const COLOR_SKELETON_POINT: [u8; 4] = [248, 113, 113, 255];

const SKELETON_LINE_THICKNESS: i32 = 4;
const BOX_THICKNESS: i32 = 3;

pub fn draw_skeleton(frame: &mut Frame, points: &[(f32, f32)]) {
    if points.len() < 2 {
        return;
    }

    for &(a, b) in HAND_CONNECTIONS {
        if let (Some(pa), Some(pb)) = (points.get(a), points.get(b)) {
            draw_line(frame, pa, pb, COLOR_SKELETON_LINE, SKELETON_LINE_THICKNESS);
        }
    }

    let point_radius = (SKELETON_LINE_THICKNESS / 2).max(2) + 1;
    for &(x, y) in points {
        draw_circle(frame, (x as i32, y as i32), point_radius, COLOR_SKELETON_POINT);
    }
}

/// Axis-aligned rectangle given by center and extents, any coordinate space
/// already converted to pixels by the caller.
pub fn draw_center_rect(frame: &mut Frame, cx: f32, cy: f32, w: f32, h: f32, color: [u8; 4]) {
    let x1 = cx - w / 2.0;
    let y1 = cy - h / 2.0;
    let x2 = cx + w / 2.0;
    let y2 = cy + h / 2.0;
    draw_rect(frame, x1, y1, x2, y2, color, BOX_THICKNESS);
}

pub fn draw_rect(
    frame: &mut Frame,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    color: [u8; 4],
    thickness: i32,
) {
    draw_line(frame, &(x1, y1), &(x2, y1), color, thickness);
    draw_line(frame, &(x2, y1), &(x2, y2), color, thickness);
    draw_line(frame, &(x2, y2), &(x1, y2), color, thickness);
    draw_line(frame, &(x1, y2), &(x1, y1), color, thickness);
}

/// Closed polygon through the given corners.
pub fn draw_polygon(frame: &mut Frame, corners: &[(f32, f32)], color: [u8; 4]) {
    if corners.len() < 2 {
        return;
    }
    for i in 0..corners.len() {
        let a = corners[i];
        let b = corners[(i + 1) % corners.len()];
        draw_line(frame, &a, &b, color, BOX_THICKNESS);
    }
}

pub fn draw_line(frame: &mut Frame, p0: &(f32, f32), p1: &(f32, f32), color: [u8; 4], thickness: i32) {
    let (mut x0, mut y0) = (p0.0 as i32, p0.1 as i32);
    let (x1, y1) = (p1.0 as i32, p1.1 as i32);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let radius = (thickness.max(1) - 1) / 2;

    loop {
        put_pixel_safe(frame, x0, y0, color);
        if radius > 0 {
            for ox in -radius..=radius {
                for oy in -radius..=radius {
                    if ox == 0 && oy == 0 {
                        continue;
                    }
                    if ox.abs() + oy.abs() <= radius {
                        put_pixel_safe(frame, x0 + ox, y0 + oy, color);
                    }
                }
            }
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

pub fn draw_circle(frame: &mut Frame, center: (i32, i32), radius: i32, color: [u8; 4]) {
    let (cx, cy) = center;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel_safe(frame, cx + dx, cy + dy, color);
            }
        }
    }
}

fn put_pixel_safe(frame: &mut Frame, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 {
        return;
    }
    let (ux, uy) = (x as u32, y as u32);
    if ux >= frame.width || uy >= frame.height {
        return;
    }
    let idx = ((uy * frame.width + ux) as usize) * 4;
    if idx + 3 < frame.rgba.len() {
        frame.rgba[idx..idx + 4].copy_from_slice(&color);
    }
}

/// Draws caption text at a pixel position. A no-op with a one-time warning
/// when no usable font is present on the host.
pub fn draw_label(frame: &mut Frame, text: &str, pos: (i32, i32), color: [u8; 4], scale: f32) {
    let Some(font) = label_font() else {
        return;
    };
    let Some(mut image) = frame.take_image() else {
        return;
    };
    draw_text_mut(
        &mut image,
        Rgba(color),
        pos.0,
        pos.1,
        PxScale::from(scale),
        font,
        text,
    );
    frame.rgba = image.into_raw();
}

///// Picks a text scale that fills a target box: grows while the text stays
/// under 80% of the box in both dimensions, then shrinks while it overflows
/// either dimension.
pub fn fit_label_scale(text: &str, box_w: f32, box_h: f32) -> f32 {
    let Some(font) = label_font() else {
        return 16.0;
    };
    search_scale(
        |scale| text_size(PxScale::from(scale), font, text),
        box_w,
        box_h,
    )
}

fn search_scale(measure: impl Fn(f32) -> (u32, u32), box_w: f32, box_h: f32) -> f32 {
    let mut scale = 8.0f32;
    loop {
        let (w, h) = measure(scale + 2.0);
        if (w as f32) >= box_w * 0.8 || (h as f32) >= box_h * 0.8 || scale >= 512.0 {
            break;
        }
        scale += 2.0;
    }
    loop {
        let (w, h) = measure(scale);
        if ((w as f32) <= box_w && (h as f32) <= box_h) || scale <= 4.0 {
            break;
        }
        scale -= 2.0;
    }
    scale
}

const FONT_ENV_VAR: &str = "HANDLENS_FONT";

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

fn label_font() -> Option<&'static FontVec> {
    static FONT: OnceLock<Option<FontVec>> = OnceLock::new();
    FONT.get_or_init(|| {
        let mut candidates: Vec<String> = Vec::new();
        if let Ok(path) = std::env::var(FONT_ENV_VAR) {
            candidates.push(path);
        }
        candidates.extend(FONT_CANDIDATES.iter().map(|s| s.to_string()));

        for path in &candidates {
            if let Ok(bytes) = std::fs::read(path) {
                if let Ok(font) = FontVec::try_from_vec(bytes) {
                    return Some(font);
                }
            }
        }
        log::warn!(
            "no usable caption font found (set {FONT_ENV_VAR} to a .ttf path); text overlays disabled"
        );
        None
    })
    .as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn blank_frame(w: u32, h: u32) -> Frame {
        Frame::from_image(RgbaImage::from_pixel(w, h, image::Rgba([0, 0, 0, 255])), 0)
    }

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * frame.width + x) as usize) * 4;
        frame.rgba[idx..idx + 4].try_into().unwrap()
    }

    #[test]
    fn line_endpoints_are_painted() {
        let mut frame = blank_frame(20, 20);
        draw_line(&mut frame, &(2.0, 2.0), &(17.0, 17.0), COLOR_GREEN, 1);
        assert_eq!(pixel(&frame, 2, 2), COLOR_GREEN);
        assert_eq!(pixel(&frame, 17, 17), COLOR_GREEN);
        assert_eq!(pixel(&frame, 0, 19), [0, 0, 0, 255]);
    }

    #[test]
    fn drawing_clips_outside_the_frame() {
        let mut frame = blank_frame(10, 10);
        let before = frame.rgba.len();
        draw_line(&mut frame, &(-5.0, -5.0), &(30.0, 30.0), COLOR_RED, 3);
        draw_circle(&mut frame, (9, 9), 4, COLOR_BLUE);
        assert_eq!(frame.rgba.len(), before);
    }

    #[test]
    fn skeleton_needs_two_points() {
        let mut frame = blank_frame(10, 10);
        let untouched = frame.rgba.clone();
        draw_skeleton(&mut frame, &[(5.0, 5.0)]);
        assert_eq!(frame.rgba, untouched);
    }

    #[test]
    fn polygon_closes_back_to_start() {
        let mut frame = blank_frame(30, 30);
        let quad = [(5.0, 5.0), (25.0, 5.0), (25.0, 25.0), (5.0, 25.0)];
        draw_polygon(&mut frame, &quad, COLOR_GREEN);
        // Left edge comes from the closing segment.
        assert_eq!(pixel(&frame, 5, 15), COLOR_GREEN);
    }

    #[test]
    fn scale_growth_stays_under_eighty_percent_of_both_dimensions() {
        // Text twice as wide as tall, so the box height is the tight bound.
        let measure = |scale: f32| ((scale * 2.0) as u32, scale as u32);

        let scale = search_scale(measure, 1000.0, 100.0);
        let (w, h) = measure(scale);
        assert!((h as f32) < 100.0 * 0.8, "height {h} overshoots the box");
        assert!((w as f32) <= 1000.0);

        // Wide boxes are still width-bounded.
        let scale = search_scale(measure, 200.0, 1000.0);
        let (w, _) = measure(scale);
        assert!((w as f32) <= 200.0);
        assert!(scale >= 4.0);
    }
}
