//! The uniform annotation record shared by every tool, and the per-batch
//! assembler that keeps record numbering contiguous.

use serde::{Deserialize, Serialize};

use crate::geometry::BoxGeometry;

/// Score reported when a detector has no confidence signal of its own.
pub const DEFAULT_SCORE: f32 = 1.0;

/// One labeled region within a frame. `cx`/`cy`/`w`/`h` share a coordinate
/// space chosen by the producing tool (normalized for hand tools, pixels for
/// text/code/face tools); `rotation` is in degrees. A `None` label means no
/// cascade rule matched and serializes to JSON `null`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(rename = "Number")]
    pub number: u32,
    pub box_cx: f32,
    pub box_cy: f32,
    pub box_w: f32,
    pub box_h: f32,
    pub label: Option<String>,
    pub score: f32,
    pub rotation: f32,
}

/// Accumulates the annotations of one batch (one input, all frames), handing
/// out contiguous 1-based record numbers in emission order.
#[derive(Debug, Default)]
pub struct Assembler {
    records: Vec<Annotation>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record, assigning the next number. Values are rounded the
    /// way they appear in output: box fields to 2 decimals, score to 3,
    /// rotation to 2.
    pub fn push(
        &mut self,
        geom: BoxGeometry,
        label: Option<String>,
        score: f32,
        rotation: f32,
    ) -> &Annotation {
        let number = self.records.len() as u32 + 1;
        self.records.push(Annotation {
            number,
            box_cx: round2(geom.cx),
            box_cy: round2(geom.cy),
            box_w: round2(geom.w),
            box_h: round2(geom.h),
            label,
            score: round3(score),
            rotation: round2(rotation),
        });
        self.records.last().unwrap()
    }

    pub fn records(&self) -> &[Annotation] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<Annotation> {
        self.records
    }
}

pub fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

pub fn round3(v: f32) -> f32 {
    (v * 1000.0).round() / 1000.0
}
