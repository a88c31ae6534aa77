//! Detector adapters. Each adapter wraps one external inference engine and
//! exposes the crate's own types; classifier and runner code never touches
//! engine-specific tensors.

pub mod emotion;
pub mod hand;
pub mod ocr;
pub mod qr;

use std::path::Path;

use anyhow::Context;
use ort::session::{Session, builder::GraphOptimizationLevel};

use crate::types::{Frame, Hand};

/// Hands whose confidence falls below this are treated as absent.
pub const MIN_CONFIDENCE: f32 = 0.2;

/// Shared ONNX session setup for the landmark and expression adapters.
pub(crate) fn load_session(model_path: &Path) -> anyhow::Result<Session> {
    Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(2)?
        .commit_from_file(model_path)
        .with_context(|| format!("failed to load ORT session from {}", model_path.display()))
}

/// The seam between frame processing and landmark estimation. An empty
/// result is the normal "no hand in frame" outcome, not an error.
pub trait HandDetector {
    fn detect(&mut self, frame: &Frame) -> anyhow::Result<Vec<Hand>>;
}
