//! Rule-based landmark classifiers.
//!
//! Every mode is the same pattern: an explicit, ordered list of
//! `(predicate, label)` pairs evaluated top to bottom, where the first
//! predicate that holds decides the label and no later rule is consulted.
//! The predicates are not mutually exclusive near decision boundaries, so
//! the evaluation order is part of the contract — reordering rules changes
//! observable output.

use crate::geometry::euclidean_distance;
use crate::types::{HandLandmark::*, HandLandmarks, Handedness};

/// Tunable constants for the word-gesture cascade. Only the index-direction
/// threshold is exposed on the CLI; the margins are fixed calibration values.
#[derive(Clone, Copy, Debug)]
pub struct GestureThresholds {
    /// Minimum index-tip displacement (dominant axis) for a pointing label.
    pub direction: f32,
    /// Extra margin a digit must clear to count as firmly extended/curled.
    pub extend_margin: f32,
    /// Maximum thumb-tip-to-index-tip distance for the pinch rule.
    pub pinch_max: f32,
    /// Slack applied to the relaxed thumb/ring tests.
    pub relax_margin: f32,
}

impl Default for GestureThresholds {
    fn default() -> Self {
        Self {
            direction: 0.06,
            extend_margin: 0.02,
            pinch_max: 0.05,
            relax_margin: 0.03,
        }
    }
}

impl GestureThresholds {
    pub fn with_direction(direction: f32) -> Self {
        Self {
            direction,
            ..Self::default()
        }
    }
}

/// Labels of the word-gesture cascade. `label()` yields the exact strings
/// emitted in annotation records and on-frame captions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WordGesture {
    Nothing,
    PointingRight,
    PointingLeft,
    PointingDown,
    PointingUp,
    Bad,
    TwoFingers,
    Promise,
    Like,
    Dislike,
    Ok,
}

impl WordGesture {
    pub fn label(&self) -> &'static str {
        match self {
            WordGesture::Nothing => "nothing",
            WordGesture::PointingRight => "Index pointing right",
            WordGesture::PointingLeft => "Index pointing left",
            WordGesture::PointingDown => "Index pointing down",
            WordGesture::PointingUp => "Index pointing up",
            WordGesture::Bad => "bad",
            WordGesture::TwoFingers => "Hold up two fingers",
            WordGesture::Promise => "promise",
            WordGesture::Like => "like",
            WordGesture::Dislike => "dislike",
            WordGesture::Ok => "ok",
        }
    }
}

type GesturePredicate = fn(&HandLandmarks, &GestureThresholds) -> bool;

/// The word-gesture cascade, in evaluation order.
///
/// The pinch rule labels `promise` while the trailing ring-extended rule
/// labels `ok`; the pair looks swapped, but this mirrors the shipped
/// behavior and is kept until the product owner rules otherwise.
const WORD_GESTURE_RULES: [(GesturePredicate, WordGesture); 11] = [
    (all_digits_down, WordGesture::Nothing),
    (index_pointing_right, WordGesture::PointingRight),
    (index_pointing_left, WordGesture::PointingLeft),
    (index_pointing_down, WordGesture::PointingDown),
    (index_pointing_up, WordGesture::PointingUp),
    (only_middle_extended, WordGesture::Bad),
    (index_and_middle_extended, WordGesture::TwoFingers),
    (thumb_index_pinch, WordGesture::Promise),
    (thumb_up_ring_curled, WordGesture::Like),
    (thumb_and_ring_relaxed, WordGesture::Dislike),
    (ring_extended, WordGesture::Ok),
];

/// Runs the word-gesture cascade; `None` means no rule matched.
pub fn classify_word_gesture(
    landmarks: &HandLandmarks,
    thresholds: &GestureThresholds,
) -> Option<WordGesture> {
    WORD_GESTURE_RULES
        .iter()
        .find(|(predicate, _)| predicate(landmarks, thresholds))
        .map(|&(_, gesture)| gesture)
}

fn index_direction(lm: &HandLandmarks) -> (f32, f32) {
    (
        lm[IndexTip].x - lm[IndexMcp].x,
        lm[IndexTip].y - lm[IndexMcp].y,
    )
}

/// Every fingertip sits below its reference joint (hand fully curled or
/// upside down).
fn all_digits_down(lm: &HandLandmarks, _t: &GestureThresholds) -> bool {
    lm[ThumbTip].y > lm[ThumbIp].y
        && lm[IndexTip].y > lm[IndexPip].y
        && lm[MiddleTip].y > lm[MiddlePip].y
        && lm[RingTip].y > lm[RingPip].y
        && lm[PinkyTip].y > lm[PinkyPip].y
}

fn index_pointing_right(lm: &HandLandmarks, t: &GestureThresholds) -> bool {
    let (dx, dy) = index_direction(lm);
    dx.abs() > t.direction && dx > dy.abs()
}

fn index_pointing_left(lm: &HandLandmarks, t: &GestureThresholds) -> bool {
    let (dx, dy) = index_direction(lm);
    dx.abs() > t.direction && dx < -dy.abs()
}

fn index_pointing_down(lm: &HandLandmarks, t: &GestureThresholds) -> bool {
    let (dx, dy) = index_direction(lm);
    dy.abs() > t.direction && dy > dx.abs()
}

fn index_pointing_up(lm: &HandLandmarks, t: &GestureThresholds) -> bool {
    let (dx, dy) = index_direction(lm);
    dy.abs() > t.direction && dy < -dx.abs()
}

fn only_middle_extended(lm: &HandLandmarks, _t: &GestureThresholds) -> bool {
    lm[MiddleTip].y < lm[MiddlePip].y
        && lm[IndexTip].y > lm[IndexPip].y
        && lm[RingTip].y > lm[RingPip].y
        && lm[PinkyTip].y > lm[PinkyPip].y
}

fn index_and_middle_extended(lm: &HandLandmarks, t: &GestureThresholds) -> bool {
    lm[IndexTip].y < lm[IndexPip].y - t.extend_margin
        && lm[MiddleTip].y < lm[MiddlePip].y - t.extend_margin
        && lm[RingTip].y > lm[RingPip].y + t.extend_margin
        && lm[PinkyTip].y > lm[PinkyPip].y + t.extend_margin
}

fn thumb_index_pinch(lm: &HandLandmarks, t: &GestureThresholds) -> bool {
    euclidean_distance(lm[ThumbTip], lm[IndexTip]) < t.pinch_max && lm[RingTip].y > lm[RingPip].y
}

fn thumb_up_ring_curled(lm: &HandLandmarks, _t: &GestureThresholds) -> bool {
    lm[ThumbTip].y < lm[ThumbIp].y && lm[RingTip].y > lm[RingPip].y
}

fn thumb_and_ring_relaxed(lm: &HandLandmarks, t: &GestureThresholds) -> bool {
    lm[ThumbTip].y > lm[ThumbIp].y - t.relax_margin
        && lm[RingTip].y > lm[RingPip].y - t.relax_margin
}

fn ring_extended(lm: &HandLandmarks, _t: &GestureThresholds) -> bool {
    lm[RingTip].y < lm[RingPip].y
}

/// Handedness inferred from landmark geometry alone (pinky knuckle right of
/// the index knuckle in image space means a right hand facing the camera).
/// The finger counter uses this instead of the estimator's handedness output.
pub fn geometric_handedness(lm: &HandLandmarks) -> Handedness {
    if lm[PinkyMcp].x > lm[IndexMcp].x {
        Handedness::Right
    } else {
        Handedness::Left
    }
}

/// Number of extended digits, 0 to 5. The thumb test compares x against the
/// IP joint in the direction that depends on which hand is shown; the other
/// digits extend when the tip rises above the PIP joint.
pub fn count_extended_fingers(lm: &HandLandmarks) -> u8 {
    let mut count = 0;

    let thumb_open_x = match geometric_handedness(lm) {
        Handedness::Right => lm[ThumbTip].x < lm[ThumbIp].x,
        _ => lm[ThumbTip].x > lm[ThumbIp].x,
    };
    if thumb_open_x && lm[ThumbTip].y < lm[ThumbIp].y {
        count += 1;
    }

    for (tip, pip) in [
        (IndexTip, IndexPip),
        (MiddleTip, MiddlePip),
        (RingTip, RingPip),
        (PinkyTip, PinkyPip),
    ] {
        if lm[tip].y < lm[pip].y {
            count += 1;
        }
    }

    count
}

/// Normalized wrist height above which a hand counts as raised.
pub const RAISED_WRIST_MAX_Y: f32 = 0.5;

pub fn is_hand_raised(lm: &HandLandmarks) -> bool {
    lm[Wrist].y < RAISED_WRIST_MAX_Y
}

/// Aggregate raise state across all hands detected in one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaisedHands {
    Both,
    LeftOnly,
    RightOnly,
    None,
}

impl RaisedHands {
    /// On-frame banner text; empty when nothing is raised.
    pub fn banner(&self) -> &'static str {
        match self {
            RaisedHands::Both => "Both hands",
            RaisedHands::LeftOnly => "Raised left hand",
            RaisedHands::RightOnly => "Raised right hand",
            RaisedHands::None => "",
        }
    }
}

/// Folds per-hand (side, raised) pairs into the frame-level raise state.
pub fn aggregate_raised(hands: impl IntoIterator<Item = (Handedness, bool)>) -> RaisedHands {
    let mut left = false;
    let mut right = false;
    for (side, raised) in hands {
        if raised {
            match side {
                Handedness::Left => left = true,
                // Unknown sides count as right, matching the binary
                // left-or-right split of the estimator output.
                Handedness::Right | Handedness::Unknown => right = true,
            }
        }
    }
    match (left, right) {
        (true, true) => RaisedHands::Both,
        (true, false) => RaisedHands::LeftOnly,
        (false, true) => RaisedHands::RightOnly,
        (false, false) => RaisedHands::None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RpsShape {
    Rock,
    Scissors,
    Paper,
}

impl RpsShape {
    pub fn label(&self) -> &'static str {
        match self {
            RpsShape::Rock => "Rock (Hammer)",
            RpsShape::Scissors => "Scissors",
            RpsShape::Paper => "Paper",
        }
    }
}

type RpsPredicate = fn(&HandLandmarks) -> bool;

/// Rock/paper/scissors cascade, in evaluation order. The thumb is ignored;
/// only the four finger tip/PIP comparisons participate.
const RPS_RULES: [(RpsPredicate, RpsShape); 3] = [
    (rps_rock, RpsShape::Rock),
    (rps_scissors, RpsShape::Scissors),
    (rps_paper, RpsShape::Paper),
];

pub fn classify_rps(landmarks: &HandLandmarks) -> Option<RpsShape> {
    RPS_RULES
        .iter()
        .find(|(predicate, _)| predicate(landmarks))
        .map(|&(_, shape)| shape)
}

fn rps_rock(lm: &HandLandmarks) -> bool {
    lm[IndexTip].y > lm[IndexPip].y
        && lm[MiddleTip].y > lm[MiddlePip].y
        && lm[RingTip].y > lm[RingPip].y
        && lm[PinkyTip].y > lm[PinkyPip].y
}

fn rps_scissors(lm: &HandLandmarks) -> bool {
    lm[IndexTip].y < lm[IndexPip].y
        && lm[MiddleTip].y < lm[MiddlePip].y
        && lm[RingTip].y > lm[RingPip].y
        && lm[PinkyTip].y > lm[PinkyPip].y
}

fn rps_paper(lm: &HandLandmarks) -> bool {
    lm[IndexTip].y < lm[IndexPip].y
        && lm[MiddleTip].y < lm[MiddlePip].y
        && lm[RingTip].y < lm[RingPip].y
        && lm[PinkyTip].y < lm[PinkyPip].y
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HandLandmark, Point};

    /// A right hand with every digit curled: each tip sits below its
    /// reference joint and the index tip barely moves from its knuckle.
    fn curled_hand() -> HandLandmarks {
        let coords: [[f32; 3]; 21] = [
            [0.50, 0.90, 0.0], // wrist
            [0.42, 0.85, 0.0], // thumb cmc
            [0.40, 0.80, 0.0], // thumb mcp
            [0.40, 0.75, 0.0], // thumb ip
            [0.41, 0.78, 0.0], // thumb tip (below ip)
            [0.46, 0.60, 0.0], // index mcp
            [0.46, 0.55, 0.0], // index pip
            [0.46, 0.58, 0.0], // index dip
            [0.46, 0.62, 0.0], // index tip (below pip)
            [0.50, 0.58, 0.0], // middle mcp
            [0.50, 0.53, 0.0], // middle pip
            [0.50, 0.56, 0.0], // middle dip
            [0.50, 0.60, 0.0], // middle tip
            [0.54, 0.60, 0.0], // ring mcp
            [0.54, 0.55, 0.0], // ring pip
            [0.54, 0.58, 0.0], // ring dip
            [0.54, 0.62, 0.0], // ring tip
            [0.58, 0.62, 0.0], // pinky mcp
            [0.58, 0.58, 0.0], // pinky pip
            [0.58, 0.60, 0.0], // pinky dip
            [0.58, 0.63, 0.0], // pinky tip
        ];
        HandLandmarks::from_points(&coords).unwrap()
    }

    fn with(landmark: HandLandmark, point: (f32, f32), base: &HandLandmarks) -> HandLandmarks {
        let mut points = *base.points();
        points[landmark as usize] = Point::new(point.0, point.1, 0.0);
        HandLandmarks::new(points)
    }

    #[test]
    fn fully_curled_hand_counts_zero_and_reads_nothing() {
        let hand = curled_hand();
        assert_eq!(count_extended_fingers(&hand), 0);
        assert_eq!(
            classify_word_gesture(&hand, &GestureThresholds::default()),
            Some(WordGesture::Nothing)
        );
    }

    #[test]
    fn nothing_rule_wins_over_later_matching_rules() {
        // Index tip far to the right but still below its PIP joint: the
        // pointing-right rule would match on displacement alone, yet the
        // earlier all-down rule takes precedence.
        let hand = with(HandLandmark::IndexTip, (0.60, 0.60), &curled_hand());
        assert_eq!(
            classify_word_gesture(&hand, &GestureThresholds::default()),
            Some(WordGesture::Nothing)
        );
    }

    #[test]
    fn index_direction_labels() {
        let t = GestureThresholds::default();
        let base = curled_hand();

        let right = with(HandLandmark::IndexTip, (0.60, 0.50), &base);
        assert_eq!(
            classify_word_gesture(&right, &t),
            Some(WordGesture::PointingRight)
        );

        let left = with(HandLandmark::IndexTip, (0.32, 0.50), &base);
        assert_eq!(
            classify_word_gesture(&left, &t),
            Some(WordGesture::PointingLeft)
        );

        let up = with(HandLandmark::IndexTip, (0.46, 0.40), &base);
        assert_eq!(
            classify_word_gesture(&up, &t),
            Some(WordGesture::PointingUp)
        );
    }

    #[test]
    fn direction_threshold_is_configurable() {
        // Displacement of 0.04 is below the default threshold but above a
        // caller-supplied 0.03. The PIP joint moves too so the all-down rule
        // does not swallow the pose.
        let hand = with(HandLandmark::IndexTip, (0.46, 0.56), &curled_hand());
        let hand = with(HandLandmark::IndexPip, (0.46, 0.58), &hand);
        let dy = hand[IndexTip].y - hand[IndexMcp].y;
        assert!(dy < 0.0 && dy.abs() < 0.06);

        assert_eq!(
            classify_word_gesture(&hand, &GestureThresholds::with_direction(0.03)),
            Some(WordGesture::PointingUp)
        );
        assert_ne!(
            classify_word_gesture(&hand, &GestureThresholds::default()),
            Some(WordGesture::PointingUp)
        );
    }

    #[test]
    fn middle_finger_alone_is_bad() {
        let hand = with(HandLandmark::MiddleTip, (0.50, 0.45), &curled_hand());
        assert_eq!(
            classify_word_gesture(&hand, &GestureThresholds::default()),
            Some(WordGesture::Bad)
        );
    }

    #[test]
    fn pinch_yields_promise_and_ring_alone_yields_ok() {
        let t = GestureThresholds::default();

        // Thumb tip touching the index tip, ring curled.
        let pinch = with(HandLandmark::ThumbTip, (0.46, 0.63), &curled_hand());
        assert_eq!(classify_word_gesture(&pinch, &t), Some(WordGesture::Promise));

        // Ring extended alone reaches the tail rule, which reads "ok".
        let ring = with(HandLandmark::RingTip, (0.54, 0.45), &curled_hand());
        assert_eq!(classify_word_gesture(&ring, &t), Some(WordGesture::Ok));
    }

    #[test]
    fn thumb_up_is_like_and_pinky_alone_is_dislike() {
        let t = GestureThresholds::default();

        let like = with(HandLandmark::ThumbTip, (0.41, 0.70), &curled_hand());
        assert_eq!(classify_word_gesture(&like, &t), Some(WordGesture::Like));

        // A lone raised pinky defeats the all-down rule without triggering
        // any earlier positive rule, falling through to the relaxed test.
        let pinky = with(HandLandmark::PinkyTip, (0.58, 0.50), &curled_hand());
        assert_eq!(classify_word_gesture(&pinky, &t), Some(WordGesture::Dislike));
    }

    #[test]
    fn finger_count_tracks_extended_digits() {
        let base = curled_hand();
        assert_eq!(geometric_handedness(&base), Handedness::Right);

        let one = with(HandLandmark::IndexTip, (0.46, 0.45), &base);
        assert_eq!(count_extended_fingers(&one), 1);

        let two = with(HandLandmark::MiddleTip, (0.50, 0.43), &one);
        assert_eq!(count_extended_fingers(&two), 2);

        // Right-hand thumb: tip left of the IP joint and above it.
        let three = with(HandLandmark::ThumbTip, (0.38, 0.70), &two);
        assert_eq!(count_extended_fingers(&three), 3);
    }

    #[test]
    fn rps_shapes() {
        let base = curled_hand();
        assert_eq!(classify_rps(&base), Some(RpsShape::Rock));

        let scissors = with(
            HandLandmark::MiddleTip,
            (0.50, 0.43),
            &with(HandLandmark::IndexTip, (0.46, 0.45), &base),
        );
        assert_eq!(classify_rps(&scissors), Some(RpsShape::Scissors));

        let paper = with(
            HandLandmark::PinkyTip,
            (0.58, 0.48),
            &with(
                HandLandmark::RingTip,
                (0.54, 0.45),
                &with(
                    HandLandmark::MiddleTip,
                    (0.50, 0.43),
                    &with(HandLandmark::IndexTip, (0.46, 0.45), &base),
                ),
            ),
        );
        assert_eq!(classify_rps(&paper), Some(RpsShape::Paper));
    }

    #[test]
    fn rps_mixed_digits_match_no_shape() {
        // Index extended, middle curled, ring extended, pinky curled: fails
        // every rule, including the scissors boundary.
        let hand = with(
            HandLandmark::RingTip,
            (0.54, 0.45),
            &with(HandLandmark::IndexTip, (0.46, 0.45), &curled_hand()),
        );
        assert_eq!(classify_rps(&hand), None);
    }

    #[test]
    fn raise_aggregation() {
        use Handedness::*;
        assert_eq!(aggregate_raised([]), RaisedHands::None);
        assert_eq!(
            aggregate_raised([(Left, true), (Right, true)]),
            RaisedHands::Both
        );
        assert_eq!(aggregate_raised([(Left, true)]), RaisedHands::LeftOnly);
        assert_eq!(
            aggregate_raised([(Right, true), (Left, false)]),
            RaisedHands::RightOnly
        );
        assert_eq!(
            aggregate_raised([(Left, false), (Right, false)]),
            RaisedHands::None
        );
    }

    #[test]
    fn wrist_height_decides_raised() {
        let lowered = curled_hand();
        assert!(!is_hand_raised(&lowered));

        let raised = with(HandLandmark::Wrist, (0.50, 0.30), &lowered);
        assert!(is_hand_raised(&raised));
    }
}
