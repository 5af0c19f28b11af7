/// What a [Lead] stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "debug", derive(serde::Serialize))]
pub enum LeadKind {
    Vehicle,
    Obstacle,
    Light,
    StopLine,
}

/// A vehicle, stop line or other object a vehicle may need to follow or stop
/// before reaching, as seen by one particular following vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lead {
    /// The longitudinal position of the lead in m.
    pub pos: f64,
    /// The velocity of the lead in m/s.
    pub vel: f64,
    /// The length subtracted from `pos` to get the net gap, in m.
    pub len: f64,
    /// What the lead stands for.
    pub kind: LeadKind,
}

impl Lead {
    /// A vehicle ahead.
    pub fn vehicle(pos: f64, vel: f64, len: f64) -> Self {
        Self {
            pos,
            vel,
            len,
            kind: LeadKind::Vehicle,
        }
    }

    /// A stationary obstacle occupying `len` metres of road.
    pub fn obstacle(pos: f64, len: f64) -> Self {
        Self {
            pos,
            vel: 0.0,
            len,
            kind: LeadKind::Obstacle,
        }
    }

    /// A red light. The follower's own length is used so that it stops with
    /// its front bumper behind the light.
    pub fn light(pos: f64, follower_len: f64) -> Self {
        Self {
            pos,
            vel: 0.0,
            len: follower_len,
            kind: LeadKind::Light,
        }
    }

    /// A virtual stop line at the end of an intersection approach.
    pub fn stop_line(pos: f64, len: f64) -> Self {
        Self {
            pos,
            vel: 0.0,
            len,
            kind: LeadKind::StopLine,
        }
    }

    /// The net gap between a follower at `pos` and this lead.
    pub fn gap_from(&self, pos: f64) -> f64 {
        self.pos - pos - self.len
    }

    /// Picks whichever of the two leads is nearer by position.
    pub fn nearer(self, other: Option<Lead>) -> Lead {
        match other {
            Some(other) if other.pos < self.pos => other,
            _ => self,
        }
    }
}
