//! QR code decoding adapter.

use rqrr::PreparedImage;

use crate::types::Frame;

/// One decoded code with its corner quad in pixel space, ordered from the
/// top-left corner clockwise.
#[derive(Clone, Debug)]
pub struct QrDetection {
    pub text: String,
    pub corners: [(f32, f32); 4],
}

/// Score attached to decoded codes; decoding is all-or-nothing, so a decoded
/// payload carries a fixed near-certain score.
pub const QR_SCORE: f32 = 0.99;

/// Locates and decodes every readable code in the frame. Grids that are
/// found but fail to decode are logged and skipped.
pub fn decode_codes(frame: &Frame) -> Vec<QrDetection> {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let rgba = &frame.rgba;

    let mut prepared = PreparedImage::prepare_from_greyscale(width, height, |x, y| {
        let idx = (y * width + x) * 4;
        let r = rgba[idx] as u32;
        let g = rgba[idx + 1] as u32;
        let b = rgba[idx + 2] as u32;
        // ITU-R BT.601 luma weights.
        ((r * 299 + g * 587 + b * 114) / 1000) as u8
    });

    let mut detections = Vec::new();
    for grid in prepared.detect_grids() {
        let bounds = grid.bounds;
        match grid.decode() {
            Ok((_meta, text)) => detections.push(QrDetection {
                text,
                corners: [
                    (bounds[0].x as f32, bounds[0].y as f32),
                    (bounds[1].x as f32, bounds[1].y as f32),
                    (bounds[2].x as f32, bounds[2].y as f32),
                    (bounds[3].x as f32, bounds[3].y as f32),
                ],
            }),
            Err(err) => log::warn!("located a code grid but failed to decode it: {err}"),
        }
    }
    detections
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn blank_frame_has_no_codes() {
        let image = RgbaImage::from_pixel(64, 64, image::Rgba([255, 255, 255, 255]));
        let frame = Frame::from_image(image, 0);
        assert!(decode_codes(&frame).is_empty());
    }
}
