use self::acceleration::{AccelerationModel, ModelParams};
use crate::lead::Lead;
use crate::{SegmentId, VehicleId};

mod acceleration;

/// The idle engine speed in rpm.
const IDLE_RPM: f64 = 800.0;

/// The kind of vehicle. Only affects how the vehicle is drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum VehicleClass {
    #[default]
    Car,
    Truck,
    Bus,
    Motorcycle,
}

/// The vehicle's drive train. Only affects the reported emissions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EngineType {
    #[default]
    Combustion,
    Diesel,
    Hybrid,
    Electric,
}

/// A simulated vehicle.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's ID
    id: VehicleId,
    /// The vehicle's length in m.
    length: f64,
    /// The vehicle's width in m.
    width: f64,
    /// The kind of vehicle.
    class: VehicleClass,
    /// The vehicle's drive train.
    engine: EngineType,
    /// The acceleration model
    model: AccelerationModel,
    /// The position of the vehicle along its current segment, in m.
    pos: f64,
    /// The velocity in m/s.
    vel: f64,
    /// The acceleration in m/s^2 to apply during the next step.
    acc: f64,
    /// The segments the vehicle will travel along.
    path: Vec<SegmentId>,
    /// The index into `path` of the segment the vehicle is on.
    road_index: usize,
    /// Whether the vehicle is being forced to a halt.
    stopped: bool,
    /// The engine speed in rpm.
    rpm: f64,
    /// The instantaneous CO<sub>2</sub> emissions in g/km.
    co2: f64,
}

/// The attributes of a simulated vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VehicleAttributes {
    /// The vehicle length in m.
    pub length: f64,
    /// The vehicle width in m.
    pub width: f64,
    /// The free-flow velocity of the vehicle, in m/s.
    pub max_vel: f64,
    /// The maximum acceleration of the vehicle, in m/s^2.
    pub max_acc: f64,
    /// The maximum deceleration of the vehicle, a positive number in m/s^2.
    pub max_dec: f64,
    /// The minimum gap to keep to the vehicle ahead, in m.
    pub min_gap: f64,
    /// The desired time headway, in s.
    pub time_headway: f64,
    /// The kind of vehicle.
    pub class: VehicleClass,
    /// The vehicle's drive train.
    pub engine: EngineType,
}

impl Default for VehicleAttributes {
    fn default() -> Self {
        Self {
            length: 4.0,
            width: 2.0,
            max_vel: 16.6,
            max_acc: 1.44,
            max_dec: 4.61,
            min_gap: 4.0,
            time_headway: 1.0,
            class: VehicleClass::Car,
            engine: EngineType::Combustion,
        }
    }
}

impl Vehicle {
    /// Creates a new vehicle at the start of the first segment of its path.
    pub(crate) fn new(id: VehicleId, attributes: &VehicleAttributes, path: Vec<SegmentId>) -> Self {
        Self {
            id,
            length: attributes.length,
            width: attributes.width,
            class: attributes.class,
            engine: attributes.engine,
            model: AccelerationModel::new(&ModelParams {
                max_acceleration: attributes.max_acc,
                max_deceleration: attributes.max_dec,
                min_gap: attributes.min_gap,
                time_headway: attributes.time_headway,
                max_velocity: attributes.max_vel,
            }),
            pos: 0.0,
            vel: 0.0,
            acc: 0.0,
            path,
            road_index: 0,
            stopped: false,
            rpm: IDLE_RPM,
            co2: 0.0,
        }
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The vehicle's length in m.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// The vehicle's width in m.
    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn class(&self) -> VehicleClass {
        self.class
    }

    pub fn engine(&self) -> EngineType {
        self.engine
    }

    /// The position of the vehicle along its current segment, in m.
    pub fn pos(&self) -> f64 {
        self.pos
    }

    /// The position of the vehicle's front bumper along its current segment, in m.
    pub fn pos_front(&self) -> f64 {
        self.pos + self.length
    }

    /// The vehicle's velocity in m/s.
    pub fn vel(&self) -> f64 {
        self.vel
    }

    /// The vehicle's acceleration in m/s^2.
    pub fn acc(&self) -> f64 {
        self.acc
    }

    /// The vehicle's free-flow velocity in m/s.
    pub fn max_vel(&self) -> f64 {
        self.model.max_vel()
    }

    /// The minimum gap the vehicle keeps to the vehicle ahead, in m.
    pub fn min_gap(&self) -> f64 {
        self.model.min_gap()
    }

    /// The segments the vehicle plans to travel along.
    pub fn path(&self) -> &[SegmentId] {
        &self.path
    }

    /// The index into [`Self::path`] of the segment the vehicle is currently on.
    pub fn road_index(&self) -> usize {
        self.road_index
    }

    /// The segment the vehicle is currently on.
    pub fn segment_id(&self) -> Option<SegmentId> {
        self.path.get(self.road_index).copied()
    }

    /// Whether the vehicle is being forced to a halt.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// The engine speed in rpm.
    pub fn rpm(&self) -> f64 {
        self.rpm
    }

    /// The instantaneous CO<sub>2</sub> emissions in g/km.
    pub fn co2_emissions(&self) -> f64 {
        self.co2
    }

    /// This vehicle as seen by the vehicle following it.
    pub fn as_lead(&self) -> Lead {
        Lead::vehicle(self.pos, self.vel, self.length)
    }

    pub(crate) fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }

    pub(crate) fn set_state(&mut self, pos: f64, vel: f64) {
        self.pos = pos;
        self.vel = vel;
    }

    /// Advances the vehicle by one time step, then updates its acceleration
    /// to follow the given lead.
    ///
    /// # Parameters
    /// * `lead` - The nearest vehicle or barrier ahead, if any
    /// * `dt` - The time step in seconds
    pub(crate) fn update(&mut self, lead: Option<Lead>, dt: f64) {
        self.integrate(dt);

        self.acc = match lead {
            Some(lead) => self.model.follow(self.vel, lead.gap_from(self.pos), lead.vel),
            None => self.model.free_road(self.vel),
        };
        if self.stopped {
            self.acc = self.model.emergency_stop(self.vel);
        }

        self.update_telemetry();
    }

    /// Integrates the vehicle's position and velocity, never letting it reverse.
    fn integrate(&mut self, dt: f64) {
        if self.vel + self.acc * dt < 0.0 {
            self.pos -= 0.5 * self.vel * self.vel / self.acc;
            self.vel = 0.0;
        } else {
            self.pos += self.vel * dt + 0.5 * self.acc * dt * dt;
            self.vel += self.acc * dt;
        }
    }

    /// Moves the vehicle onto the next segment of its path.
    /// Returns the new segment, or `None` if the path is complete.
    pub(crate) fn advance(&mut self) -> Option<SegmentId> {
        self.road_index += 1;
        self.pos = 0.0;
        self.segment_id()
    }

    /// Updates the cosmetic engine readings.
    fn update_telemetry(&mut self) {
        self.rpm = if self.vel > 0.1 {
            IDLE_RPM + 150.0 * self.vel
        } else {
            IDLE_RPM
        };
        self.co2 = match self.engine {
            EngineType::Electric => 0.0,
            _ => 2.0 + 10.0 * f64::max(self.acc, 0.0) + 0.5 * self.vel,
        };
    }
}
