#[cfg(feature = "debug")]
use crate::debug::{debug_denied, debug_lead, take_debug_frame};
use crate::decoration::StaticObject;
use crate::generator::{GeneratorAttributes, Route, VehicleGenerator};
use crate::intersection::{Intersection, IntersectionAttributes};
use crate::lead::{Lead, LeadKind};
use crate::light::TrafficLight;
use crate::math::Point2d;
use crate::network::{RoutingError, Topology};
use crate::obstacle::Obstacle;
use crate::segment::{Segment, SegmentAttributes};
use crate::vehicle::{Vehicle, VehicleAttributes};
use crate::{IntersectionId, ObstacleId, SegmentId, TrafficLightId, VehicleId, VehicleSet};
use log::{debug, warn};
use once_cell::unsync::OnceCell;
use slotmap::SlotMap;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Vehicles within this distance of the end of an intersection approach, in m,
/// must be granted clearance before entering the intersection.
const CLEARANCE_DISTANCE: f64 = 15.0;

/// The global parameters of a simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulationConfig {
    /// The time step in seconds.
    pub dt: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { dt: 1.0 / 60.0 }
    }
}

/// The virtual stop line at the end of an intersection approach.
#[derive(Clone, Copy, Debug)]
struct StopLine {
    /// The index in the segment's queue of the first vehicle refused clearance.
    first: usize,
    /// The length subtracted from the line's position when computing gaps.
    len: f64,
}

/// A traffic simulation.
#[derive(Default)]
pub struct Simulation {
    config: SimulationConfig,
    /// The road segments, indexed by [SegmentId].
    segments: Vec<Segment>,
    /// The vehicles being simulated.
    vehicles: VehicleSet,
    /// The temporary obstacles.
    obstacles: SlotMap<ObstacleId, Obstacle>,
    /// The traffic lights.
    lights: SlotMap<TrafficLightId, TrafficLight>,
    /// The intersections.
    intersections: SlotMap<IntersectionId, Intersection>,
    /// The vehicle generators.
    generators: Vec<VehicleGenerator>,
    /// The decorative objects.
    static_objects: Vec<StaticObject>,
    /// The network topology, built on demand and discarded when a segment is added.
    topology: OnceCell<Topology>,
    /// The simulated time in s.
    t: f64,
    /// The current frame of simulation.
    frame: usize,
    /// The number of vehicles that have reached the end of their path.
    completed_trips: usize,
    /// Debugging information from the previously simulated frame.
    #[cfg(feature = "debug")]
    debug: serde_json::Value,
}

impl Simulation {
    /// Creates a new simulation with the default time step.
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a new simulation with the given configuration.
    pub fn with_config(config: SimulationConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Adds a segment to the network.
    pub fn add_segment(&mut self, attributes: &SegmentAttributes) -> SegmentId {
        let id = SegmentId::new(self.segments.len());
        self.segments.push(Segment::new(id, attributes));
        self.topology = OnceCell::new();
        id
    }

    /// Adds an intersection. Roads are registered with it afterwards.
    pub fn add_intersection(&mut self, attributes: &IntersectionAttributes) -> IntersectionId {
        self.intersections
            .insert_with_key(|id| Intersection::new(id, attributes))
    }

    /// Registers a road leading into the intersection.
    pub fn add_incoming(&mut self, intersection: IntersectionId, road: SegmentId) {
        if !self.has_segment(road) {
            warn!("Cannot add unknown segment {:?} as an incoming road", road);
            return;
        }
        let Some(inter) = self.intersections.get_mut(intersection) else {
            warn!("Unknown intersection {:?}", intersection);
            return;
        };
        inter.add_incoming(road);
        self.segments[road.index()].set_approach(intersection);
    }

    /// Registers a road leading out of the intersection.
    pub fn add_outgoing(&mut self, intersection: IntersectionId, road: SegmentId) {
        if !self.has_segment(road) {
            warn!("Cannot add unknown segment {:?} as an outgoing road", road);
            return;
        }
        match self.intersections.get_mut(intersection) {
            Some(inter) => inter.add_outgoing(road),
            None => warn!("Unknown intersection {:?}", intersection),
        }
    }

    /// Builds a connecting segment from each incoming road to each outgoing road
    /// of the intersection, returning the new segments.
    pub fn build_intersection(&mut self, intersection: IntersectionId) -> Vec<SegmentId> {
        let Some(inter) = self.intersections.get(intersection) else {
            warn!("Unknown intersection {:?}", intersection);
            return vec![];
        };
        let connectors = inter
            .unbuilt_connections()
            .into_iter()
            .map(|(from, to)| {
                let attribs =
                    inter.connector_attributes(&self.segments[from.index()], &self.segments[to.index()]);
                (from, to, attribs)
            })
            .collect::<Vec<_>>();

        connectors
            .into_iter()
            .map(|(from, to, attribs)| {
                let id = self.add_segment(&attribs);
                self.intersections[intersection].add_connector(from, to, id);
                id
            })
            .collect()
    }

    /// Puts a stop sign at the end of an incoming road.
    pub fn add_stop_sign(&mut self, intersection: IntersectionId, road: SegmentId) {
        let Some(inter) = self.intersections.get_mut(intersection) else {
            warn!("Unknown intersection {:?}", intersection);
            return;
        };
        if !inter.incoming().contains(&road) {
            warn!(
                "Cannot add a stop sign to {:?}, which doesn't lead into intersection '{}'",
                road,
                inter.name()
            );
            return;
        }
        inter.add_stop_sign(road);
    }

    /// Works out which roads give way to which at the intersection.
    /// Should be called after all roads and stop signs have been added.
    pub fn calculate_priorities(&mut self, intersection: IntersectionId) {
        match self.intersections.get_mut(intersection) {
            Some(inter) => inter.calculate_priorities(&self.segments),
            None => warn!("Unknown intersection {:?}", intersection),
        }
    }

    /// Puts a traffic light at the end of every incoming road of the intersection.
    /// Roads running north-south start green, and roads running east-west start red.
    pub fn set_traffic_lights(
        &mut self,
        intersection: IntersectionId,
        cycle_time: f64,
    ) -> Vec<TrafficLightId> {
        let Some(inter) = self.intersections.get(intersection) else {
            warn!("Unknown intersection {:?}", intersection);
            return vec![];
        };
        inter
            .light_placements(&self.segments)
            .into_iter()
            .map(|(road, pos, state)| {
                self.lights
                    .insert(TrafficLight::new(road, pos, cycle_time, state))
            })
            .collect()
    }

    /// Places an obstacle on a segment for `duration` seconds.
    pub fn add_obstacle(&mut self, segment: SegmentId, pos: f64, duration: f64) -> Option<ObstacleId> {
        if !self.has_segment(segment) {
            warn!("Cannot place an obstacle on unknown segment {:?}", segment);
            return None;
        }
        Some(self.obstacles.insert(Obstacle::new(segment, pos, duration)))
    }

    /// Adds a traffic light to the simulation.
    pub fn add_traffic_light(&mut self, light: TrafficLight) -> Option<TrafficLightId> {
        if !self.has_segment(light.segment()) {
            warn!("Cannot place a traffic light on unknown segment {:?}", light.segment());
            return None;
        }
        Some(self.lights.insert(light))
    }

    /// Adds a vehicle at the start of the first segment of `path`.
    pub fn add_vehicle(&mut self, attributes: &VehicleAttributes, path: Vec<SegmentId>) -> Option<VehicleId> {
        self.add_vehicle_at(attributes, path, 0.0, 0.0)
    }

    /// Adds a vehicle part way along the first segment of `path`, travelling at `vel`.
    pub fn add_vehicle_at(
        &mut self,
        attributes: &VehicleAttributes,
        path: Vec<SegmentId>,
        pos: f64,
        vel: f64,
    ) -> Option<VehicleId> {
        let Some(first) = path.first().copied() else {
            warn!("Cannot add a vehicle with an empty path");
            return None;
        };
        if let Some(unknown) = path.iter().find(|id| !self.has_segment(**id)) {
            warn!("Cannot add a vehicle whose path includes unknown segment {:?}", unknown);
            return None;
        }

        let vehicle_id = self.vehicles.insert_with_key(|id| {
            let mut vehicle = Vehicle::new(id, attributes, path);
            vehicle.set_state(pos, vel);
            vehicle
        });
        self.segments[first.index()].insert_vehicle(&self.vehicles, vehicle_id);
        Some(vehicle_id)
    }

    /// Adds a vehicle generator, resolving the routes of its templates.
    ///
    /// Templates whose route can't be resolved are never spawned.
    pub fn add_vehicle_generator(&mut self, attributes: &GeneratorAttributes) {
        let paths = attributes
            .templates
            .iter()
            .map(|template| self.resolve_route(&template.route))
            .collect();
        self.generators
            .push(VehicleGenerator::new(attributes, paths));
    }

    /// Adds a decorative object.
    pub fn add_static_object(&mut self, object: StaticObject) {
        self.static_objects.push(object);
    }

    /// Sets the `stopped` attribute of a vehicle. A stopped vehicle brakes hard
    /// until it comes to a halt, and stays put until it is no longer stopped.
    pub fn set_vehicle_stopped(&mut self, vehicle_id: VehicleId, stopped: bool) {
        match self.vehicles.get_mut(vehicle_id) {
            Some(vehicle) => vehicle.set_stopped(stopped),
            None => warn!("Unknown vehicle {:?}", vehicle_id),
        }
    }

    /// Advances the simulation by one time step.
    pub fn update(&mut self) {
        let dt = self.config.dt;
        self.update_controls(dt);
        let stop_lines = self.check_clearances();
        self.update_vehicles(&stop_lines, dt);
        self.advance_vehicles();
        self.spawn_vehicles();
        self.t += dt;
        self.frame += 1;

        #[cfg(feature = "debug")]
        {
            self.debug = take_debug_frame();
        }
    }

    /// Advances the simulation by `steps` time steps.
    pub fn run(&mut self, steps: usize) {
        for _ in 0..steps {
            self.update();
        }
    }

    /// Finds the shortest path between the segments with the given names.
    /// Returns an empty path if there is none.
    pub fn find_shortest_path(&self, start: &str, end: &str) -> Result<Vec<SegmentId>, RoutingError> {
        self.topology().find_shortest_path(start, end)
    }

    /// The connectivity of the network.
    pub fn topology(&self) -> &Topology {
        self.topology.get_or_init(|| Topology::build(&self.segments))
    }

    /// The simulated time in s.
    pub fn time(&self) -> f64 {
        self.t
    }

    /// Gets the current simulation frame index.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// The time step in s.
    pub fn dt(&self) -> f64 {
        self.config.dt
    }

    /// The number of vehicles that have reached the end of their path and left the simulation.
    pub fn completed_trips(&self) -> usize {
        self.completed_trips
    }

    /// Returns an iterator over all the segments in the network.
    pub fn iter_segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    pub fn get_segment(&self, segment_id: SegmentId) -> Option<&Segment> {
        self.segments.get(segment_id.index())
    }

    /// Returns an iterator over all the vehicles in the simulation.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    pub fn get_vehicle(&self, vehicle_id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(vehicle_id)
    }

    /// Returns an iterator over the obstacles that haven't yet expired.
    pub fn iter_obstacles(&self) -> impl Iterator<Item = (ObstacleId, &Obstacle)> {
        self.obstacles.iter()
    }

    /// Returns an iterator over all the traffic lights in the simulation.
    pub fn iter_lights(&self) -> impl Iterator<Item = (TrafficLightId, &TrafficLight)> {
        self.lights.iter()
    }

    pub fn get_light(&self, light_id: TrafficLightId) -> Option<&TrafficLight> {
        self.lights.get(light_id)
    }

    pub fn iter_intersections(&self) -> impl Iterator<Item = (IntersectionId, &Intersection)> {
        self.intersections.iter()
    }

    pub fn get_intersection(&self, intersection_id: IntersectionId) -> Option<&Intersection> {
        self.intersections.get(intersection_id)
    }

    pub fn iter_generators(&self) -> impl Iterator<Item = &VehicleGenerator> {
        self.generators.iter()
    }

    pub fn iter_static_objects(&self) -> impl Iterator<Item = &StaticObject> {
        self.static_objects.iter()
    }

    /// The world position of a vehicle's rear bumper and its heading in radians.
    pub fn vehicle_pose(&self, vehicle_id: VehicleId) -> Option<(Point2d, f64)> {
        let vehicle = self.vehicles.get(vehicle_id)?;
        let segment = self.get_segment(vehicle.segment_id()?)?;
        let progress = if segment.length() > 0.0 {
            vehicle.pos() / segment.length()
        } else {
            0.0
        };
        Some((segment.point_at(progress), segment.heading_at(progress)))
    }

    /// Gets the debugging information for the previously simulated frame as JSON array.
    #[cfg(feature = "debug")]
    pub fn debug(&mut self) -> serde_json::Value {
        self.debug.clone()
    }

    fn has_segment(&self, segment_id: SegmentId) -> bool {
        segment_id.index() < self.segments.len()
    }

    /// Turns a template route into a path, or an empty path if it can't be resolved.
    fn resolve_route(&self, route: &Route) -> Vec<SegmentId> {
        match route {
            Route::Path(path) => {
                if let Some(unknown) = path.iter().find(|id| !self.has_segment(**id)) {
                    warn!("Route includes unknown segment {:?}", unknown);
                    return vec![];
                }
                path.clone()
            }
            Route::Between { start, end } => match self.find_shortest_path(start, end) {
                Ok(path) => {
                    if path.is_empty() {
                        warn!("No path from '{}' to '{}'", start, end);
                    }
                    path
                }
                Err(err) => {
                    warn!("Cannot route from '{}' to '{}': {}", start, end, err);
                    vec![]
                }
            },
        }
    }

    /// Advances the obstacle and traffic light timers, and removes expired obstacles.
    fn update_controls(&mut self, dt: f64) {
        for (_, obstacle) in &mut self.obstacles {
            obstacle.update(dt);
        }
        for (_, light) in &mut self.lights {
            light.update(dt);
        }
        self.obstacles.retain(|_, obstacle| obstacle.is_active());
    }

    /// Asks each intersection whether the vehicles nearing it may enter,
    /// before any vehicle has moved this frame.
    fn check_clearances(&mut self) -> HashMap<SegmentId, StopLine> {
        let mut stop_lines = HashMap::new();

        for segment in &self.segments {
            let Some(inter) = segment
                .approach()
                .and_then(|id| self.intersections.get_mut(id))
            else {
                continue;
            };

            for (idx, vehicle_id) in segment.vehicles().enumerate() {
                let vehicle = &self.vehicles[vehicle_id];
                if segment.length() - vehicle.pos() >= CLEARANCE_DISTANCE {
                    break;
                }
                if !inter.check_clearance(vehicle, segment.id(), &self.segments, &self.vehicles) {
                    #[cfg(feature = "debug")]
                    debug_denied(vehicle_id, vehicle.pos());

                    // Vehicles at a stop sign pull up with their front bumper at the line
                    let len = if inter.has_stop_sign(segment.id()) {
                        vehicle.length()
                    } else {
                        0.0
                    };
                    stop_lines.insert(segment.id(), StopLine { first: idx, len });
                    break;
                }
            }
        }

        stop_lines
    }

    /// The obstacles and red lights on each segment.
    /// The length of a red light is filled in for each follower.
    fn barriers(&self) -> Vec<SmallVec<[Lead; 2]>> {
        let mut barriers = vec![SmallVec::new(); self.segments.len()];
        for obstacle in self.obstacles.values() {
            barriers[obstacle.segment().index()].push(Lead::obstacle(obstacle.pos(), obstacle.length()));
        }
        for light in self.lights.values().filter(|light| light.is_active()) {
            barriers[light.segment().index()].push(Lead::light(light.pos(), 0.0));
        }
        barriers
    }

    /// Applies the car following model to every vehicle, segment by segment from front to back.
    fn update_vehicles(&mut self, stop_lines: &HashMap<SegmentId, StopLine>, dt: f64) {
        let barriers = self.barriers();

        for segment in &self.segments {
            let stop_line = stop_lines.get(&segment.id());
            let mut ahead: Option<Lead> = None;

            for (idx, vehicle_id) in segment.vehicles().enumerate() {
                let vehicle = &mut self.vehicles[vehicle_id];
                let front = vehicle.pos_front();

                let barrier = barriers[segment.id().index()]
                    .iter()
                    .filter(|barrier| barrier.pos > front)
                    .min_by(|a, b| a.pos.total_cmp(&b.pos))
                    .map(|barrier| match barrier.kind {
                        LeadKind::Light => Lead::light(barrier.pos, vehicle.length()),
                        _ => *barrier,
                    });
                let line = stop_line
                    .filter(|line| idx >= line.first)
                    .map(|line| Lead::stop_line(segment.length(), line.len))
                    .filter(|line| line.pos > front);
                let lead = [ahead, barrier, line]
                    .into_iter()
                    .flatten()
                    .reduce(|nearest, other| nearest.nearer(Some(other)));

                #[cfg(feature = "debug")]
                debug_lead(vehicle_id, vehicle.pos(), lead);

                vehicle.update(lead, dt);

                if let Some(inter) = segment
                    .approach()
                    .and_then(|id| self.intersections.get_mut(id))
                {
                    inter.observe_departure(vehicle);
                }

                ahead = Some(vehicle.as_lead());
            }
        }
    }

    /// Moves vehicles that have reached the end of their segment onto the next
    /// segment of their path, or removes them if their path is complete.
    fn advance_vehicles(&mut self) {
        for idx in 0..self.segments.len() {
            let segment = &mut self.segments[idx];
            let Some(vehicle_id) = segment.head() else {
                continue;
            };
            if self.vehicles[vehicle_id].pos() < segment.length() {
                continue;
            }
            segment.pop_head();

            if let Some(inter) = segment
                .approach()
                .and_then(|id| self.intersections.get_mut(id))
            {
                inter.release(vehicle_id);
            }

            match self.vehicles[vehicle_id].advance() {
                Some(next) => self.segments[next.index()].push_tail(vehicle_id),
                None => {
                    self.vehicles.remove(vehicle_id);
                    self.completed_trips += 1;
                    debug!("Vehicle {:?} completed its trip at t={:.2}", vehicle_id, self.t);
                }
            }
        }
    }

    /// Gives each generator the chance to spawn a vehicle.
    fn spawn_vehicles(&mut self) {
        for idx in 0..self.generators.len() {
            let spawn = self.generators[idx].poll(self.t, &self.segments, &self.vehicles);
            if let Some((attributes, path)) = spawn {
                if let Some(vehicle_id) = self.add_vehicle(&attributes, path) {
                    debug!("Spawned vehicle {:?} at t={:.2}", vehicle_id, self.t);
                }
            }
        }
    }
}
