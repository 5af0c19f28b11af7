use crate::SegmentId;

/// The state of a traffic light.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LightState {
    #[default]
    Red,
    Green,
}

impl LightState {
    /// The opposite state.
    pub fn toggled(self) -> Self {
        match self {
            LightState::Red => LightState::Green,
            LightState::Green => LightState::Red,
        }
    }
}

/// A two-phase traffic light that alternates between red and green.
#[derive(Clone, Debug)]
pub struct TrafficLight {
    /// The segment the light controls.
    segment: SegmentId,
    /// The distance of the stop line from the start of the segment in m.
    pos: f64,
    /// The duration of each phase in s.
    cycle_time: f64,
    /// The current state.
    state: LightState,
    /// The time since the current state was entered, in s.
    since: f64,
}

impl TrafficLight {
    /// Creates a new traffic light.
    pub fn new(segment: SegmentId, pos: f64, cycle_time: f64, initial: LightState) -> Self {
        Self {
            segment,
            pos,
            cycle_time,
            state: initial,
            since: 0.0,
        }
    }

    pub fn segment(&self) -> SegmentId {
        self.segment
    }

    pub fn pos(&self) -> f64 {
        self.pos
    }

    pub fn cycle_time(&self) -> f64 {
        self.cycle_time
    }

    pub fn state(&self) -> LightState {
        self.state
    }

    /// Whether the light is stopping traffic, which is only the case while red.
    pub fn is_active(&self) -> bool {
        self.state == LightState::Red
    }

    /// Advances the traffic light timing by `dt` seconds.
    pub fn update(&mut self, dt: f64) {
        self.since += dt;
        if self.since >= self.cycle_time {
            self.since = 0.0;
            self.state = self.state.toggled();
        }
    }
}
