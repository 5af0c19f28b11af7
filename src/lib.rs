//! A microscopic traffic simulation.
//!
//! Vehicles follow each other along parametric road segments using an
//! intelligent-driver-style car following law. Intersections derive their
//! connecting segments from the roads registered with them and control entry
//! with stop signs, right-of-way and traffic lights.

pub use cgmath;
pub use decoration::{Shape, StaticObject};
pub use generator::{GeneratorAttributes, Route, VehicleGenerator, VehicleTemplate};
pub use intersection::{Intersection, IntersectionAttributes};
pub use lead::{Lead, LeadKind};
pub use light::{LightState, TrafficLight};
pub use network::{RoutingError, Topology};
pub use obstacle::Obstacle;
pub use segment::{Category, Segment, SegmentAttributes, SegmentCurve, SegmentGeometry};
pub use simulation::{Simulation, SimulationConfig};
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use util::Interval;
pub use vehicle::{EngineType, Vehicle, VehicleAttributes, VehicleClass};

#[cfg(feature = "debug")]
mod debug;
mod decoration;
mod generator;
mod intersection;
mod lead;
mod light;
pub mod math;
mod network;
mod obstacle;
mod segment;
mod simulation;
mod util;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
    /// Unique ID of an [Obstacle].
    pub struct ObstacleId;
    /// Unique ID of a [TrafficLight].
    pub struct TrafficLightId;
    /// Unique ID of an [Intersection].
    pub struct IntersectionId;
}

/// Index of a [Segment] in the network.
///
/// Segments are never removed, so an ID stays valid for the lifetime of the simulation
/// and IDs are ordered the same way the segments were added.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentId(usize);

impl SegmentId {
    /// Creates an ID from a raw segment index.
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The index of the segment.
    pub const fn index(self) -> usize {
        self.0
    }
}

type VehicleSet = SlotMap<VehicleId, Vehicle>;
