//! ONNX handpose adapter: letterboxes the frame, runs the estimator and
//! decodes 21 landmarks plus confidence and handedness scores.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;
use ndarray::Array4;
use ort::session::Session;
use ort::value::Tensor;
use rayon::prelude::*;

use super::{HandDetector, MIN_CONFIDENCE, load_session};
use crate::types::{Frame, Hand, HandLandmarks, Handedness, NUM_HAND_LANDMARKS};

/// Square side of the estimator's input plane.
pub const INPUT_SIZE: u32 = 224;

pub struct OrtHandDetector {
    session: Session,
}

impl OrtHandDetector {
    pub fn load(model_path: &Path) -> crate::error::Result<Self> {
        let session = load_session(model_path)?;
        log::info!("handpose estimator ready using {}", model_path.display());
        Ok(Self { session })
    }
}

impl HandDetector for OrtHandDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Hand>> {
        let (input, letterbox) = prepare_input(frame, INPUT_SIZE)?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("failed to run ORT session")?;

        if outputs.len() < 1 {
            return Err(anyhow!("model returned no outputs"));
        }

        let coords = outputs[0].try_extract_array::<f32>()?;
        let flattened: Vec<f32> = coords.iter().copied().collect();
        let raw = decode_landmarks(&flattened)?;

        let confidence = if outputs.len() > 1 {
            outputs[1]
                .try_extract_array::<f32>()
                .ok()
                .and_then(|arr| arr.iter().next().copied())
                .unwrap_or(0.0)
        } else {
            0.0
        };
        if confidence < MIN_CONFIDENCE {
            return Ok(Vec::new());
        }

        let handedness_score = if outputs.len() > 2 {
            outputs[2]
                .try_extract_array::<f32>()
                .ok()
                .and_then(|arr| arr.iter().next().copied())
                .unwrap_or(0.0)
        } else {
            0.0
        };

        let pixel_points = project_landmarks(&raw, &letterbox);
        let normalized: Vec<[f32; 3]> = pixel_points
            .iter()
            .zip(&raw)
            .map(|(&(px, py), &[_, _, z])| {
                [
                    px / letterbox.orig_w.max(1) as f32,
                    py / letterbox.orig_h.max(1) as f32,
                    z,
                ]
            })
            .collect();
        let landmarks = HandLandmarks::from_points(&normalized)
            .ok_or_else(|| anyhow!("estimator produced fewer than {NUM_HAND_LANDMARKS} points"))?;

        Ok(vec![Hand {
            landmarks,
            pixel_points,
            handedness: Handedness::from_score(handedness_score),
            confidence,
        }])
    }
}

/// Scale and padding of the letterbox a frame went through, needed to map
/// estimator coordinates back into the original pixel grid.
#[derive(Clone, Debug)]
pub struct LetterboxInfo {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_w: u32,
    pub orig_h: u32,
}

/// Resizes the frame to fit a square input plane, pads the short side with
/// black and normalizes to NHWC float in [0, 1].
pub fn prepare_input(frame: &Frame, target_size: u32) -> Result<(Array4<f32>, LetterboxInfo)> {
    let expected_len = (frame.width as usize)
        .saturating_mul(frame.height as usize)
        .saturating_mul(4);
    if frame.rgba.len() != expected_len {
        return Err(anyhow!(
            "frame buffer size mismatch: got {}, expected {}",
            frame.rgba.len(),
            expected_len
        ));
    }

    let scale = target_size as f32 / (frame.width.max(frame.height) as f32);
    let new_w = (frame.width as f32 * scale).round().max(1.0) as u32;
    let new_h = (frame.height as f32 * scale).round().max(1.0) as u32;

    let src_image = fir::images::Image::from_vec_u8(
        frame.width,
        frame.height,
        frame.rgba.clone(),
        fir::PixelType::U8x4,
    )?;
    let mut dst_image = fir::images::Image::new(new_w, new_h, fir::PixelType::U8x4);
    let mut resizer = fir::Resizer::new();
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    resizer
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .context("fast resize failed")?;
    let resized = dst_image.into_vec();

    let pad_x = ((target_size as i64 - new_w as i64) / 2).max(0) as usize;
    let pad_y = ((target_size as i64 - new_h as i64) / 2).max(0) as usize;
    let mut canvas = vec![0u8; (target_size as usize) * (target_size as usize) * 4];
    for px in canvas.chunks_mut(4) {
        px[3] = 255;
    }
    let dst_stride = target_size as usize * 4;
    let src_stride = new_w as usize * 4;
    for row in 0..(new_h as usize) {
        let dst_offset = (pad_y + row) * dst_stride + pad_x * 4;
        let src_offset = row * src_stride;
        canvas[dst_offset..dst_offset + src_stride]
            .copy_from_slice(&resized[src_offset..src_offset + src_stride]);
    }

    let normalized: Vec<f32> = canvas
        .par_chunks_exact(4)
        .flat_map_iter(|px| {
            [
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
            ]
        })
        .collect();
    let input = Array4::<f32>::from_shape_vec(
        (1, target_size as usize, target_size as usize, 3),
        normalized,
    )
    .map_err(|err| anyhow!("failed to build input tensor: {err}"))?;

    let letterbox = LetterboxInfo {
        scale,
        pad_x: pad_x as f32,
        pad_y: pad_y as f32,
        orig_w: frame.width,
        orig_h: frame.height,
    };

    Ok((input, letterbox))
}

pub fn decode_landmarks(flat: &[f32]) -> Result<Vec<[f32; 3]>> {
    if flat.len() < NUM_HAND_LANDMARKS * 3 {
        return Err(anyhow!(
            "unexpected landmarks length: got {}, need {}",
            flat.len(),
            NUM_HAND_LANDMARKS * 3
        ));
    }

    let mut landmarks = Vec::with_capacity(NUM_HAND_LANDMARKS);
    for chunk in flat.chunks_exact(3).take(NUM_HAND_LANDMARKS) {
        landmarks.push([chunk[0], chunk[1], chunk[2]]);
    }
    Ok(landmarks)
}

/// Maps estimator-plane coordinates back into original pixel space, clamped
/// to the frame.
pub fn project_landmarks(landmarks: &[[f32; 3]], letterbox: &LetterboxInfo) -> Vec<(f32, f32)> {
    landmarks
        .iter()
        .map(|[x, y, _z]| {
            let px = (x - letterbox.pad_x) / letterbox.scale;
            let py = (y - letterbox.pad_y) / letterbox.scale;
            (
                px.clamp(0.0, (letterbox.orig_w.saturating_sub(1)) as f32),
                py.clamp(0.0, (letterbox.orig_h.saturating_sub(1)) as f32),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::RgbaImage;

    #[test]
    fn letterbox_centers_a_wide_frame() {
        let image = RgbaImage::from_pixel(100, 50, image::Rgba([255, 0, 0, 255]));
        let frame = Frame::from_image(image, 0);
        let (input, letterbox) = prepare_input(&frame, 224).unwrap();

        assert_eq!(input.shape(), &[1, 224, 224, 3]);
        assert_relative_eq!(letterbox.scale, 2.24, epsilon = 1e-6);
        assert_eq!(letterbox.pad_x, 0.0);
        assert_eq!(letterbox.pad_y, 56.0);

        // The padded band is black, the payload band is red.
        assert_eq!(input[[0, 0, 0, 0]], 0.0);
        assert_relative_eq!(input[[0, 112, 112, 0]], 1.0);
        assert_eq!(input[[0, 112, 112, 1]], 0.0);
    }

    #[test]
    fn projection_inverts_the_letterbox() {
        let letterbox = LetterboxInfo {
            scale: 2.24,
            pad_x: 0.0,
            pad_y: 56.0,
            orig_w: 100,
            orig_h: 50,
        };
        let projected = project_landmarks(&[[112.0, 112.0, 0.0]], &letterbox);
        assert_relative_eq!(projected[0].0, 50.0, epsilon = 1e-3);
        assert_relative_eq!(projected[0].1, 25.0, epsilon = 1e-3);
    }

    #[test]
    fn short_landmark_vectors_are_rejected() {
        assert!(decode_landmarks(&[0.0; 10]).is_err());
        let decoded = decode_landmarks(&[0.5; 63]).unwrap();
        assert_eq!(decoded.len(), NUM_HAND_LANDMARKS);
    }
}
