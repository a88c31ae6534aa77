//! The per-frame pipeline loop shared by every subcommand: pull a frame,
//! detect, classify, annotate, draw, persist, optionally display.

use std::path::PathBuf;

use serde_json::json;

use crate::annotate::{Assembler, DEFAULT_SCORE};
use crate::classify::{
    GestureThresholds, aggregate_raised, classify_rps, classify_word_gesture,
    count_extended_fingers, geometric_handedness, is_hand_raised,
};
use crate::detect::emotion::EmotionClassifier;
use crate::detect::ocr::TextRecognizer;
use crate::detect::{HandDetector, qr};
use crate::error::Result;
use crate::geometry::{BoxGeometry, centroid_and_box, orientation_degrees};
use crate::render;
use crate::sink::Sink;
use crate::source::{FrameSource, SourceMedium};
use crate::types::{Frame, Hand, HandLandmark, Handedness};

#[cfg(feature = "viewer")]
use crate::viewer::Viewer;

const CAPTION_SCALE: f32 = 24.0;
const CAPTION_ORIGIN: (i32, i32) = (50, 50);
const CAPTION_LINE_STEP: i32 = 40;

#[derive(Clone, Debug)]
pub struct RunOptions {
    pub input: String,
    pub output: Option<PathBuf>,
    pub no_image: bool,
    pub json: bool,
    pub play: bool,
}

/// One subcommand's per-frame work: annotate the batch and draw overlays.
pub trait FrameProcessor {
    fn process(&mut self, frame: &mut Frame, batch: &mut Assembler);
}

pub fn run(opts: &RunOptions, processor: impl FrameProcessor) -> Result<()> {
    let source = FrameSource::open(&opts.input)?;
    run_stream(source, opts, processor)
}

/// Drives a processor over an already-open source. Separated from [`run`] so
/// tests can inject pre-decoded frames.
pub fn run_stream(
    mut source: FrameSource,
    opts: &RunOptions,
    mut processor: impl FrameProcessor,
) -> Result<()> {
    let streaming = source.medium() != SourceMedium::Still;
    let output = opts.output.clone().unwrap_or_else(|| {
        PathBuf::from(if streaming { "output.gif" } else { "output.png" })
    });

    if opts.play && !cfg!(feature = "viewer") {
        log::warn!("viewer support is not compiled in; ignoring --play");
    }
    #[cfg(feature = "viewer")]
    let mut viewer: Option<Viewer> = None;
    #[cfg(feature = "viewer")]
    let mut held_frame: Option<Frame> = None;

    let mut sink = Sink::new(&output, !opts.no_image, opts.json, streaming);
    let mut batch = Assembler::new();

    while let Some(mut frame) = source.next_frame()? {
        processor.process(&mut frame, &mut batch);
        sink.push_frame(&frame)?;

        #[cfg(feature = "viewer")]
        if opts.play {
            if viewer.is_none() {
                viewer = Some(Viewer::open("handlens", frame.width, frame.height)?);
            }
            if let Some(window) = viewer.as_mut() {
                if !window.show(&frame)? {
                    log::info!("display cancelled, stopping stream");
                    break;
                }
            }
            if holds_final_frame(source.medium(), opts.play) {
                held_frame = Some(frame);
            }
        }
    }

    // A still image stays on screen until the window is dismissed.
    #[cfg(feature = "viewer")]
    if let (Some(window), Some(frame)) = (viewer.as_mut(), held_frame.as_ref()) {
        while window.show(frame)? {}
    }

    sink.finish(batch.records())
}

/// Still inputs keep their window open after the single frame is shown;
/// streams close as soon as the last frame has been displayed.
#[cfg(any(feature = "viewer", test))]
fn holds_final_frame(medium: SourceMedium, play: bool) -> bool {
    play && medium == SourceMedium::Still
}

#[derive(Clone, Copy, Debug)]
pub enum HandMode {
    Fingers,
    Gesture(GestureThresholds),
    Raise,
    Rps,
}

pub struct HandProcessor<D> {
    mode: HandMode,
    detector: D,
}

impl<D: HandDetector> HandProcessor<D> {
    pub fn new(mode: HandMode, detector: D) -> Self {
        Self { mode, detector }
    }
}

impl<D: HandDetector> FrameProcessor for HandProcessor<D> {
    fn process(&mut self, frame: &mut Frame, batch: &mut Assembler) {
        let hands = match self.detector.detect(frame) {
            Ok(hands) => hands,
            Err(err) => {
                log::warn!("detection failed on frame {}: {err:#}", frame.index);
                Vec::new()
            }
        };

        for hand in &hands {
            render::draw_skeleton(frame, &hand.pixel_points);
            let pixel_geom = centroid_and_box(&hand.pixel_points);
            render::draw_center_rect(
                frame,
                pixel_geom.cx,
                pixel_geom.cy,
                pixel_geom.w,
                pixel_geom.h,
                render::COLOR_GREEN,
            );
        }

        match self.mode {
            HandMode::Gesture(thresholds) => annotate_gestures(frame, &hands, &thresholds, batch),
            HandMode::Fingers => annotate_finger_counts(frame, &hands, batch),
            HandMode::Raise => annotate_raised_hands(frame, &hands, batch),
            HandMode::Rps => annotate_rps(frame, &hands, batch),
        }
    }
}

/// Normalized-space box and wrist-to-middle-tip orientation of one hand; the
/// uniform record geometry for every hand mode.
fn hand_record_geometry(hand: &Hand) -> (BoxGeometry, f32) {
    let normalized: Vec<(f32, f32)> = hand.landmarks.iter().map(|p| (p.x, p.y)).collect();
    let geom = centroid_and_box(&normalized);
    let wrist = hand.landmarks[HandLandmark::Wrist];
    let middle = hand.landmarks[HandLandmark::MiddleTip];
    let rotation = orientation_degrees((wrist.x, wrist.y), (middle.x, middle.y));
    (geom, rotation)
}

fn annotate_gestures(
    frame: &mut Frame,
    hands: &[Hand],
    thresholds: &GestureThresholds,
    batch: &mut Assembler,
) {
    for (i, hand) in hands.iter().enumerate() {
        let label = classify_word_gesture(&hand.landmarks, thresholds)
            .map(|g| g.label().to_string());
        let (geom, rotation) = hand_record_geometry(hand);
        batch.push(geom, label.clone(), DEFAULT_SCORE, rotation);

        // Captions appear only for matched gestures.
        if let Some(label) = &label {
            let caption = format!("{} hand {}", hand.handedness.label(), label);
            render::draw_label(
                frame,
                &caption,
                (
                    CAPTION_ORIGIN.0,
                    CAPTION_ORIGIN.1 + CAPTION_LINE_STEP * i as i32,
                ),
                render::COLOR_GREEN,
                CAPTION_SCALE,
            );
        }
    }
}

fn annotate_finger_counts(frame: &mut Frame, hands: &[Hand], batch: &mut Assembler) {
    let mut sides = Vec::with_capacity(hands.len());

    for hand in hands {
        let side = geometric_handedness(&hand.landmarks);
        let count = count_extended_fingers(&hand.landmarks);
        sides.push((side, count));

        let caption = if count > 0 {
            count.to_string()
        } else {
            "nothing".to_string()
        };
        let (geom, rotation) = hand_record_geometry(hand);
        batch.push(geom, Some(caption.clone()), DEFAULT_SCORE, rotation);

        let color = match side {
            Handedness::Right => render::COLOR_RED,
            _ => render::COLOR_BLUE,
        };
        let wrist = hand
            .pixel_points
            .first()
            .copied()
            .unwrap_or((CAPTION_ORIGIN.0 as f32, CAPTION_ORIGIN.1 as f32));
        render::draw_label(
            frame,
            &caption,
            (wrist.0 as i32, wrist.1 as i32),
            color,
            CAPTION_SCALE,
        );
    }

    log::info!("finger summary: {}", finger_summary(&sides));
}

/// Per-frame finger summary. Each side reports the count of the last hand
/// seen on that side, or null when no hand appeared there.
fn finger_summary(sides: &[(Handedness, u8)]) -> serde_json::Value {
    let mut left: Option<u8> = None;
    let mut right: Option<u8> = None;
    for &(side, count) in sides {
        match side {
            Handedness::Right => right = Some(count),
            _ => left = Some(count),
        }
    }
    json!({
        "Number_of_fingers_left": left,
        "Number_of_fingers_right": right,
        "Hand_detected": !sides.is_empty(),
    })
}

fn annotate_raised_hands(frame: &mut Frame, hands: &[Hand], batch: &mut Assembler) {
    let mut states = Vec::with_capacity(hands.len());
    for hand in hands {
        let raised = is_hand_raised(&hand.landmarks);
        states.push((hand.handedness, raised));

        let label = raised.then(|| "raised".to_string());
        let (geom, rotation) = hand_record_geometry(hand);
        batch.push(geom, label, DEFAULT_SCORE, rotation);
    }

    let banner = aggregate_raised(states).banner();
    if !banner.is_empty() {
        render::draw_label(
            frame,
            banner,
            CAPTION_ORIGIN,
            render::COLOR_GREEN,
            CAPTION_SCALE,
        );
        log::info!("raise state: {banner}");
    }
}

fn annotate_rps(frame: &mut Frame, hands: &[Hand], batch: &mut Assembler) {
    let mut summary = Vec::with_capacity(hands.len());
    for (i, hand) in hands.iter().enumerate() {
        let label = classify_rps(&hand.landmarks).map(|s| s.label().to_string());
        let (geom, rotation) = hand_record_geometry(hand);
        batch.push(geom, label.clone(), DEFAULT_SCORE, rotation);

        if let Some(label) = &label {
            let caption = format!("{} Hand: {}", hand.handedness.label(), label);
            render::draw_label(
                frame,
                &caption,
                (
                    CAPTION_ORIGIN.0,
                    CAPTION_ORIGIN.1 + CAPTION_LINE_STEP * i as i32,
                ),
                render::COLOR_GREEN,
                CAPTION_SCALE,
            );
        }
        summary.push(json!({
            "handedness": hand.handedness.label(),
            "gesture": label,
        }));
    }

    if !summary.is_empty() {
        log::info!("rps summary: {}", json!({ "hands": summary }));
    }
}

pub struct OcrProcessor {
    recognizer: TextRecognizer,
}

impl OcrProcessor {
    pub fn new(recognizer: TextRecognizer) -> Self {
        Self { recognizer }
    }
}

impl FrameProcessor for OcrProcessor {
    fn process(&mut self, frame: &mut Frame, batch: &mut Assembler) {
        let detections = match self.recognizer.recognize(frame) {
            Ok(detections) => detections,
            Err(err) => {
                log::warn!("text recognition failed on frame {}: {err:#}", frame.index);
                Vec::new()
            }
        };

        for det in detections {
            let [tl, tr, br, _bl] = det.corners;
            // Box fields are whole pixels, as downstream consumers expect.
            let geom = BoxGeometry {
                cx: ((tl.0 + br.0) / 2.0).floor(),
                cy: ((tl.1 + br.1) / 2.0).floor(),
                w: (br.0 - tl.0).floor().max(0.0),
                h: (br.1 - tl.1).floor().max(0.0),
            };
            let rotation = orientation_degrees(tl, tr);
            batch.push(geom, Some(det.text.clone()), det.score, rotation);

            render::draw_polygon(frame, &det.corners, render::COLOR_GREEN);
            let scale = render::fit_label_scale(&det.text, geom.w, geom.h);
            render::draw_label(
                frame,
                &det.text,
                (tl.0 as i32, tl.1 as i32),
                render::COLOR_RED,
                scale,
            );
        }
    }
}

/// QR decoding has no model state; the processor is a unit struct.
pub struct QrProcessor;

impl FrameProcessor for QrProcessor {
    fn process(&mut self, frame: &mut Frame, batch: &mut Assembler) {
        for code in qr::decode_codes(frame) {
            let geom = centroid_and_box(&code.corners);
            batch.push(geom, Some(code.text.clone()), qr::QR_SCORE, 0.0);

            render::draw_polygon(frame, &code.corners, render::COLOR_GREEN);
            render::draw_label(
                frame,
                &code.text,
                (code.corners[0].0 as i32, code.corners[0].1 as i32),
                render::COLOR_RED,
                CAPTION_SCALE,
            );
        }
    }
}

pub struct EmotionProcessor {
    classifier: EmotionClassifier,
}

impl EmotionProcessor {
    pub fn new(classifier: EmotionClassifier) -> Self {
        Self { classifier }
    }
}

impl FrameProcessor for EmotionProcessor {
    fn process(&mut self, frame: &mut Frame, batch: &mut Assembler) {
        let (label, score) = match self.classifier.classify(frame) {
            Ok(result) => result,
            Err(err) => {
                log::warn!(
                    "emotion classification failed on frame {}: {err:#}",
                    frame.index
                );
                return;
            }
        };

        let geom = BoxGeometry {
            cx: frame.width as f32 / 2.0,
            cy: frame.height as f32 / 2.0,
            w: frame.width as f32,
            h: frame.height as f32,
        };
        batch.push(geom, Some(label.to_string()), score, 0.0);
        render::draw_label(
            frame,
            label,
            CAPTION_ORIGIN,
            render::COLOR_GREEN,
            CAPTION_SCALE,
        );
    }
}
