//! Landmark-driven per-frame classification utilities: finger counting,
//! word-gesture recognition, hand-raise detection, rock/paper/scissors,
//! text recognition, code decoding and face-emotion labeling, all sharing
//! one frame pipeline and one annotation record.

pub mod annotate;
pub mod classify;
#[cfg(feature = "camera-nokhwa")]
pub mod convert;
pub mod detect;
pub mod error;
pub mod geometry;
pub mod render;
pub mod runner;
pub mod server;
pub mod sink;
pub mod source;
pub mod types;
#[cfg(feature = "viewer")]
pub mod viewer;

pub use annotate::{Annotation, Assembler};
pub use error::{Error, Result};
pub use types::{Frame, Hand, HandLandmark, HandLandmarks, Handedness, Point};
