use crate::math::{
    cumulative_lengths, heading, CubicBezier2d, LineSegment2d, ParametricCurve2d, Point2d,
    QuadraticBezier2d, Vector2d,
};
use cgmath::prelude::*;

/// The target spacing of the arc length samples, in m.
const SAMPLE_SPACING: f64 = 0.5;

/// The minimum number of arc length samples taken along a curved segment.
const MIN_SAMPLES: usize = 32;

/// The shape of a segment's centre line.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SegmentGeometry {
    Line(LineSegment2d),
    Quadratic(QuadraticBezier2d),
    Cubic(CubicBezier2d),
}

impl SegmentGeometry {
    /// The control points of the geometry, from start to end.
    pub fn points(&self) -> &[Point2d] {
        match self {
            Self::Line(line) => line.points(),
            Self::Quadratic(curve) => curve.points(),
            Self::Cubic(curve) => curve.points(),
        }
    }

    /// The first control point.
    pub fn start(&self) -> Point2d {
        self.points()[0]
    }

    /// The last control point.
    pub fn end(&self) -> Point2d {
        *self.points().last().unwrap_or(&Point2d::new(0.0, 0.0))
    }

    fn as_curve(&self) -> &dyn ParametricCurve2d {
        match self {
            Self::Line(line) => line,
            Self::Quadratic(curve) => curve,
            Self::Cubic(curve) => curve,
        }
    }
}

/// A segment centre line parameterised by normalised arc length.
#[derive(Clone, Debug)]
pub struct SegmentCurve {
    geometry: SegmentGeometry,
    length: f64,
    /// Pairs of (curve parameter, arc length up to that parameter).
    samples: Vec<(f64, f64)>,
}

impl SegmentCurve {
    pub fn new(geometry: SegmentGeometry) -> Self {
        let count = match geometry {
            SegmentGeometry::Line(_) => 1,
            _ => {
                let hull: f64 = geometry
                    .points()
                    .windows(2)
                    .map(|w| w[0].distance(w[1]))
                    .sum();
                usize::max(MIN_SAMPLES, (hull / SAMPLE_SPACING).ceil() as usize)
            }
        };
        let samples = cumulative_lengths(&geometry.as_curve(), count);
        let length = samples.last().map(|s| s.1).unwrap_or(0.0);
        Self {
            geometry,
            length,
            samples,
        }
    }

    /// The geometry this curve was built from.
    pub fn geometry(&self) -> &SegmentGeometry {
        &self.geometry
    }

    /// The arc length of the curve.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Samples the point at the given fraction of the arc length.
    pub fn point_at(&self, progress: f64) -> Point2d {
        self.geometry.as_curve().sample(self.param_at(progress))
    }

    /// The heading in radians at the given fraction of the arc length.
    pub fn heading_at(&self, progress: f64) -> f64 {
        let t = self.param_at(progress);
        let tangent = self.geometry.as_curve().sample_dt(t);
        if tangent.magnitude2() > 1e-12 {
            return heading(tangent);
        }
        // Degenerate control points, fall back to the chord around `t`
        let curve = self.geometry.as_curve();
        let chord: Vector2d = curve.sample(f64::min(t + 1e-3, 1.0)) - curve.sample(f64::max(t - 1e-3, 0.0));
        heading(chord)
    }

    /// Maps a fraction of the arc length onto the curve parameter.
    fn param_at(&self, progress: f64) -> f64 {
        let target = progress.clamp(0.0, 1.0) * self.length;
        let idx = self.samples.partition_point(|(_, s)| *s < target);
        if idx == 0 {
            return self.samples[0].0;
        }
        if idx >= self.samples.len() {
            return self.samples[self.samples.len() - 1].0;
        }
        let (t0, s0) = self.samples[idx - 1];
        let (t1, s1) = self.samples[idx];
        if s1 - s0 <= f64::EPSILON {
            t0
        } else {
            t0 + (t1 - t0) * (target - s0) / (s1 - s0)
        }
    }
}
