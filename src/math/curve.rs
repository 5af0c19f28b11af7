use super::{Point2d, Vector2d};
use crate::util::Interval;
use cgmath::prelude::*;

/// A parametric curve in 2D space.
pub trait ParametricCurve2d {
    /// Samples the parametric curve.
    fn sample(&self, t: f64) -> Point2d;

    /// Returns the minimum and maximum t-values that define the bounds of the curve.
    fn bounds(&self) -> Interval<f64> {
        Interval::new(0.0, 1.0)
    }

    /// Samples the derivative of the parametric curve.
    ///
    /// The default implementation approximates the derivative by sampling
    /// two very nearby points along the curve.
    fn sample_dt(&self, t: f64) -> Vector2d {
        let delta = self.bounds().length() * 0.0001;
        let p1 = self.sample(t);
        let p2 = self.sample(t + delta);
        (p2 - p1) / delta
    }
}

impl<T: ParametricCurve2d + ?Sized> ParametricCurve2d for &T {
    fn sample(&self, t: f64) -> Point2d {
        (**self).sample(t)
    }

    fn bounds(&self) -> Interval<f64> {
        (**self).bounds()
    }

    fn sample_dt(&self, t: f64) -> Vector2d {
        (**self).sample_dt(t)
    }
}

/// Samples the curve at `count + 1` evenly spaced parameter values and returns
/// each parameter alongside the polyline length accumulated up to it.
pub fn cumulative_lengths(curve: &impl ParametricCurve2d, count: usize) -> Vec<(f64, f64)> {
    let bounds = curve.bounds();
    let count = count.max(1);
    let mut samples = Vec::with_capacity(count + 1);
    let mut last = curve.sample(bounds.min);
    let mut length = 0.0;
    samples.push((bounds.min, 0.0));
    for i in 1..=count {
        let t = bounds.lerp(i as f64 / count as f64);
        let point = curve.sample(t);
        length += point.distance(last);
        samples.push((t, length));
        last = point;
    }
    samples
}
