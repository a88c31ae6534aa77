//! Text recognition adapter over the ocrs engine.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ocrs::{ImageSource, OcrEngine, OcrEngineParams, TextItem};
use rten::Model;

use crate::types::Frame;

/// Reported per-line score. The engine does not expose calibrated line
/// confidences, so a fixed value is used.
const LINE_SCORE: f32 = 0.9;

/// One recognized text line with its rotated bounding quad, corners in
/// pixel space ordered top-left, top-right, bottom-right, bottom-left.
#[derive(Clone, Debug)]
pub struct TextDetection {
    pub text: String,
    pub corners: [(f32, f32); 4],
    pub score: f32,
}

pub struct TextRecognizer {
    engine: OcrEngine,
}

impl TextRecognizer {
    /// Loads the detection and recognition models from `models_dir`, falling
    /// back to the conventional `~/.cache/ocrs` location.
    pub fn load(models_dir: Option<&Path>) -> crate::error::Result<Self> {
        Ok(Self {
            engine: build_engine(models_dir)?,
        })
    }

    /// Detects and recognizes all text lines in a frame. Lines that fail
    /// recognition are skipped.
    pub fn recognize(&self, frame: &Frame) -> Result<Vec<TextDetection>> {
        let source = ImageSource::from_bytes(&frame.rgba, (frame.width, frame.height))?;
        let input = self.engine.prepare_input(source)?;

        let words = self.engine.detect_words(&input)?;
        let lines = self.engine.find_text_lines(&input, &words);
        let recognized = self.engine.recognize_text(&input, &lines)?;

        let mut detections = Vec::new();
        for line in recognized.into_iter().flatten() {
            let text = line.to_string();
            if text.trim().is_empty() {
                continue;
            }
            let corners = line.rotated_rect().corners();
            detections.push(TextDetection {
                text,
                corners: [
                    (corners[0].x, corners[0].y),
                    (corners[1].x, corners[1].y),
                    (corners[2].x, corners[2].y),
                    (corners[3].x, corners[3].y),
                ],
                score: LINE_SCORE,
            });
        }
        Ok(detections)
    }
}

fn build_engine(models_dir: Option<&Path>) -> Result<OcrEngine> {
    let dir = match models_dir {
        Some(dir) => dir.to_path_buf(),
        None => default_models_dir()?,
    };
    let detection_path = dir.join("text-detection.rten");
    let recognition_path = dir.join("text-recognition.rten");

    if !detection_path.exists() || !recognition_path.exists() {
        anyhow::bail!(
            "text models not found; expected:\n  - {}\n  - {}",
            detection_path.display(),
            recognition_path.display()
        );
    }

    let detection_model = Model::load_file(&detection_path)
        .with_context(|| format!("loading {}", detection_path.display()))?;
    let recognition_model = Model::load_file(&recognition_path)
        .with_context(|| format!("loading {}", recognition_path.display()))?;

    let engine = OcrEngine::new(OcrEngineParams {
        detection_model: Some(detection_model),
        recognition_model: Some(recognition_model),
        ..Default::default()
    })?;
    log::info!("text recognizer ready using models from {}", dir.display());
    Ok(engine)
}

fn default_models_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("cannot locate home directory for default model path")?;
    Ok(Path::new(&home).join(".cache/ocrs"))
}
