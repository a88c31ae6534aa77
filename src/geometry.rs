//! Small geometry helpers shared by every classifier mode. All functions are
//! space-agnostic: they operate in whatever coordinate space the caller's
//! points share.

use crate::types::Point;

/// Axis-aligned bounding geometry of a point set: centroid plus extents.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoxGeometry {
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
}

/// Centroid and axis-aligned box of a point set. The centroid is the mean of
/// all coordinates; width and height are the x/y extents. Fewer than two
/// points degenerate to a zero-size box.
pub fn centroid_and_box(points: &[(f32, f32)]) -> BoxGeometry {
    if points.is_empty() {
        return BoxGeometry::default();
    }

    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;

    for &(x, y) in points {
        sum_x += x;
        sum_y += y;
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    let n = points.len() as f32;
    let (w, h) = if points.len() < 2 {
        (0.0, 0.0)
    } else {
        (max_x - min_x, max_y - min_y)
    };

    BoxGeometry {
        cx: sum_x / n,
        cy: sum_y / n,
        w,
        h,
    }
}

/// Angle of the vector `b - a` in degrees, in (-180, 180]. Which two points
/// define the orientation is a per-mode decision, not a universal one.
pub fn orientation_degrees(a: (f32, f32), b: (f32, f32)) -> f32 {
    (b.1 - a.1).atan2(b.0 - a.0).to_degrees()
}

/// Straight-line 3-D distance. Both points must share a coordinate space.
pub fn euclidean_distance(a: Point, b: Point) -> f32 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let dz = a.z - b.z;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn box_extents_are_non_negative_and_centroid_is_inside() {
        let points = [(0.2, 0.8), (0.6, 0.1), (0.4, 0.5), (0.9, 0.3)];
        let geom = centroid_and_box(&points);

        assert!(geom.w >= 0.0 && geom.h >= 0.0);
        assert!(geom.cx >= 0.2 && geom.cx <= 0.9);
        assert!(geom.cy >= 0.1 && geom.cy <= 0.8);
        assert_relative_eq!(geom.w, 0.7, epsilon = 1e-6);
        assert_relative_eq!(geom.h, 0.7, epsilon = 1e-6);
    }

    #[test]
    fn degenerate_point_sets_have_zero_extent() {
        assert_eq!(centroid_and_box(&[]), BoxGeometry::default());

        let single = centroid_and_box(&[(0.3, 0.4)]);
        assert_eq!(single.w, 0.0);
        assert_eq!(single.h, 0.0);
        assert_relative_eq!(single.cx, 0.3);
        assert_relative_eq!(single.cy, 0.4);
    }

    #[test]
    fn orientation_is_antisymmetric() {
        let a = (0.1, 0.2);
        let b = (0.7, 0.9);
        // Swapping the endpoints flips the angle by exactly a half turn.
        assert_relative_eq!(
            orientation_degrees(a, b),
            orientation_degrees(b, a) + 180.0,
            epsilon = 1e-4
        );

        let c = (0.5, 0.2);
        let d = (0.5, 0.7);
        // Straight down is +90, straight up is -90.
        assert_relative_eq!(orientation_degrees(c, d), 90.0, epsilon = 1e-4);
        assert_relative_eq!(orientation_degrees(d, c), -90.0, epsilon = 1e-4);
    }

    #[test]
    fn orientation_stays_in_half_open_range() {
        let samples = [
            ((0.0, 0.0), (1.0, 0.0)),
            ((0.0, 0.0), (-1.0, 0.0)),
            ((0.0, 0.0), (-1.0, -0.0001)),
            ((0.0, 0.0), (0.0, 1.0)),
        ];
        for (a, b) in samples {
            let deg = orientation_degrees(a, b);
            assert!(deg > -180.0 && deg <= 180.0, "out of range: {deg}");
        }
    }

    #[test]
    fn distance_matches_pythagoras() {
        let a = Point::new(0.0, 0.0, 0.0);
        let b = Point::new(3.0, 4.0, 0.0);
        assert_relative_eq!(euclidean_distance(a, b), 5.0);

        let c = Point::new(1.0, 2.0, 2.0);
        assert_relative_eq!(euclidean_distance(Point::default(), c), 3.0);
    }
}
