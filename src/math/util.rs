use super::{Point2d, Vector2d};
use std::f64::consts::PI;

/// The heading of a vector in radians, measured anticlockwise from the x-axis.
pub fn heading(vec: Vector2d) -> f64 {
    vec.y.atan2(vec.x)
}

/// Wraps an angle into the interval `[-PI, PI]`.
pub fn normalize_angle(mut angle: f64) -> f64 {
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Intersects two lines, each given by a point and a heading in radians.
///
/// Returns `None` if the lines are (nearly) parallel.
pub fn intersect_lines(p1: Point2d, theta1: f64, p2: Point2d, theta2: f64) -> Option<Point2d> {
    // Each line in the form a*x + b*y = c
    let (a1, b1) = (-theta1.sin(), theta1.cos());
    let c1 = a1 * p1.x + b1 * p1.y;
    let (a2, b2) = (-theta2.sin(), theta2.cos());
    let c2 = a2 * p2.x + b2 * p2.y;

    let det = a1 * b2 - a2 * b1;
    if det.abs() < 1e-5 {
        return None;
    }
    Some(Point2d::new(
        (c1 * b2 - c2 * b1) / det,
        (a1 * c2 - a2 * c1) / det,
    ))
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn angles_wrap() {
        assert_approx_eq!(normalize_angle(3.0 * PI / 2.0), -PI / 2.0);
        assert_approx_eq!(normalize_angle(-3.0 * PI / 2.0), PI / 2.0);
        assert_approx_eq!(normalize_angle(0.25), 0.25);
    }

    #[test]
    fn perpendicular_lines_intersect() {
        let p = intersect_lines(
            Point2d::new(-10.0, 0.0),
            0.0,
            Point2d::new(0.0, 10.0),
            FRAC_PI_2,
        )
        .unwrap();
        assert_approx_eq!(p.x, 0.0);
        assert_approx_eq!(p.y, 0.0);
    }

    #[test]
    fn parallel_lines_do_not_intersect() {
        let p = intersect_lines(Point2d::new(0.0, 0.0), 0.0, Point2d::new(0.0, 5.0), PI);
        assert!(p.is_none());
    }
}
