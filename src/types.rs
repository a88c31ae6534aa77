use std::ops::Index;

use image::RgbaImage;

/// One decoded image, RGBA8, tagged with its position in the source stream.
#[derive(Clone, Debug)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// 0-based sequence index within the owning frame source.
    pub index: u64,
}

impl Frame {
    pub fn from_image(image: RgbaImage, index: u64) -> Self {
        let (width, height) = image.dimensions();
        Self {
            rgba: image.into_raw(),
            width,
            height,
            index,
        }
    }

    /// Consumes the pixel buffer and rebuilds it as an [`RgbaImage`].
    /// Returns `None` if the buffer length does not match the dimensions.
    pub fn take_image(&mut self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, std::mem::take(&mut self.rgba))
    }

    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.rgba.clone())
    }
}

/// A 3-component coordinate. Whether it lives in normalized [0, 1] landmark
/// space or pixel space depends on the producing detector; callers must not
/// compare points across spaces.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

pub const NUM_HAND_LANDMARKS: usize = 21;

/// MediaPipe hand landmark indices. The positional semantics are fixed by the
/// estimator model; classifier rules address landmarks through this enum only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum HandLandmark {
    Wrist = 0,
    ThumbCmc = 1,
    ThumbMcp = 2,
    ThumbIp = 3,
    ThumbTip = 4,
    IndexMcp = 5,
    IndexPip = 6,
    IndexDip = 7,
    IndexTip = 8,
    MiddleMcp = 9,
    MiddlePip = 10,
    MiddleDip = 11,
    MiddleTip = 12,
    RingMcp = 13,
    RingPip = 14,
    RingDip = 15,
    RingTip = 16,
    PinkyMcp = 17,
    PinkyPip = 18,
    PinkyDip = 19,
    PinkyTip = 20,
}

/// The ordered 21-point landmark set for one detected hand, in normalized
/// image space (x, y in [0, 1], smaller y is higher in the frame).
#[derive(Clone, Debug, PartialEq)]
pub struct HandLandmarks {
    points: [Point; NUM_HAND_LANDMARKS],
}

impl HandLandmarks {
    pub fn new(points: [Point; NUM_HAND_LANDMARKS]) -> Self {
        Self { points }
    }

    /// Builds a landmark set from detector output. Returns `None` when fewer
    /// than 21 points were produced; extra points are ignored.
    pub fn from_points(points: &[[f32; 3]]) -> Option<Self> {
        if points.len() < NUM_HAND_LANDMARKS {
            return None;
        }
        let mut out = [Point::default(); NUM_HAND_LANDMARKS];
        for (dst, src) in out.iter_mut().zip(points) {
            *dst = Point::new(src[0], src[1], src[2]);
        }
        Some(Self { points: out })
    }

    pub fn points(&self) -> &[Point; NUM_HAND_LANDMARKS] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.points.iter()
    }
}

impl Index<HandLandmark> for HandLandmarks {
    type Output = Point;

    fn index(&self, landmark: HandLandmark) -> &Point {
        &self.points[landmark as usize]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
    Unknown,
}

impl Handedness {
    /// Maps the estimator's handedness score to a side, with 0.0 reserved
    /// for "no signal".
    pub fn from_score(score: f32) -> Self {
        if score >= 0.5 {
            Handedness::Right
        } else if score > 0.0 {
            Handedness::Left
        } else {
            Handedness::Unknown
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Handedness::Left => "Left",
            Handedness::Right => "Right",
            Handedness::Unknown => "Unknown",
        }
    }
}

/// One detected hand within a frame. Lives only for the duration of a single
/// pipeline pass; there is no identity continuity across frames.
#[derive(Clone, Debug)]
pub struct Hand {
    /// Landmarks in normalized image space; the classifier input.
    pub landmarks: HandLandmarks,
    /// The same landmarks projected into pixel space, for rendering.
    pub pixel_points: Vec<(f32, f32)>,
    pub handedness: Handedness,
    pub confidence: f32,
}
