use crate::SegmentId;

/// The length of road occupied by an obstacle, in m.
const OBSTACLE_LENGTH: f64 = 2.0;

/// The width of an obstacle, in m.
const OBSTACLE_WIDTH: f64 = 2.0;

/// A temporary blockage of a segment, such as an accident.
/// Vehicles treat it as a stationary vehicle until it expires.
#[derive(Clone, Debug)]
pub struct Obstacle {
    /// The segment the obstacle is on.
    segment: SegmentId,
    /// The distance from the start of the segment in m.
    pos: f64,
    /// How long the obstacle lasts in s.
    duration: f64,
    /// The time since the obstacle was created in s.
    elapsed: f64,
}

impl Obstacle {
    /// Creates a new obstacle.
    pub fn new(segment: SegmentId, pos: f64, duration: f64) -> Self {
        Self {
            segment,
            pos,
            duration,
            elapsed: 0.0,
        }
    }

    pub fn segment(&self) -> SegmentId {
        self.segment
    }

    pub fn pos(&self) -> f64 {
        self.pos
    }

    pub fn length(&self) -> f64 {
        OBSTACLE_LENGTH
    }

    pub fn width(&self) -> f64 {
        OBSTACLE_WIDTH
    }

    /// The time left before the obstacle clears, in s.
    pub fn remaining(&self) -> f64 {
        f64::max(self.duration - self.elapsed, 0.0)
    }

    /// Whether the obstacle is still blocking the segment.
    pub fn is_active(&self) -> bool {
        self.elapsed < self.duration
    }

    /// Advances the obstacle's timer.
    pub fn update(&mut self, dt: f64) {
        self.elapsed += dt;
    }
}
