//! Facial-expression classifier adapter. Runs a single ONNX classifier over
//! the whole frame; localization is left to the model-free frame rect.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use image::imageops::FilterType;
use ndarray::Array4;
use ort::session::Session;
use ort::value::Tensor;

use super::load_session;
use crate::types::Frame;

/// Classifier input side (square, single-channel).
const EMOTION_INPUT_SIZE: u32 = 48;

/// Output class order of the FER-style expression model.
pub const EMOTION_LABELS: [&str; 7] = [
    "angry", "disgust", "fear", "happy", "sad", "surprise", "neutral",
];

pub struct EmotionClassifier {
    session: Session,
}

impl EmotionClassifier {
    pub fn load(model_path: &Path) -> crate::error::Result<Self> {
        let session = load_session(model_path)?;
        log::info!("emotion classifier ready using {}", model_path.display());
        Ok(Self { session })
    }

    /// Classifies the dominant expression in the frame, returning the label
    /// and its softmax probability.
    pub fn classify(&mut self, frame: &Frame) -> Result<(&'static str, f32)> {
        let input = prepare_gray_input(frame)?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("failed to run ORT session")?;

        if outputs.len() < 1 {
            return Err(anyhow!("model returned no outputs"));
        }
        let logits = outputs[0].try_extract_array::<f32>()?;
        let scores: Vec<f32> = logits.iter().copied().collect();
        if scores.len() < EMOTION_LABELS.len() {
            return Err(anyhow!(
                "unexpected class count: got {}, need {}",
                scores.len(),
                EMOTION_LABELS.len()
            ));
        }

        let probs = softmax(&scores[..EMOTION_LABELS.len()]);
        let (best, score) = probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, &p)| (i, p))
            .ok_or_else(|| anyhow!("empty probability vector"))?;

        Ok((EMOTION_LABELS[best], score))
    }
}

fn prepare_gray_input(frame: &Frame) -> Result<Array4<f32>> {
    let image = frame
        .to_image()
        .ok_or_else(|| anyhow!("frame buffer size mismatch"))?;
    let gray = image::DynamicImage::ImageRgba8(image)
        .resize_exact(EMOTION_INPUT_SIZE, EMOTION_INPUT_SIZE, FilterType::Triangle)
        .to_luma8();

    let pixels: Vec<f32> = gray.into_raw().into_iter().map(|p| p as f32 / 255.0).collect();
    Array4::from_shape_vec(
        (1, 1, EMOTION_INPUT_SIZE as usize, EMOTION_INPUT_SIZE as usize),
        pixels,
    )
    .map_err(|err| anyhow!("failed to build input tensor: {err}"))
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
