use crate::light::LightState;
use crate::math::{intersect_lines, normalize_angle, Point2d};
use crate::util::Interval;
use crate::{Category, IntersectionId, Segment, SegmentAttributes, SegmentId, Vehicle, VehicleId, VehicleSet};
use itertools::iproduct;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Connections whose headings differ by less than this many radians are built as straight lines.
const STRAIGHT_THRESHOLD: f64 = 0.1;

/// A free road yields to another free road whose heading is offset from its own
/// by an angle in this range, i.e. one approaching from its right.
const YIELD_WINDOW: Interval<f64> = Interval::new(0.5, 2.5);

/// How far back from the junction to look for vehicles with priority, in m.
const SCAN_DISTANCE: f64 = 40.0;

/// Vehicles slower than this, in m/s, have come to a stop at a stop sign.
const STOP_SPEED: f64 = 0.5;

/// Vehicles with priority slower than this, in m/s, are not considered to be approaching.
const APPROACH_SPEED: f64 = 0.5;

/// A vehicle that has stopped at a stop sign has moved off again once faster than this, in m/s.
const RESUME_SPEED: f64 = 2.0;

/// The distance of automatically placed traffic lights from the end of the road, in m.
const LIGHT_SETBACK: f64 = 2.0;

/// The attributes of an intersection.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntersectionAttributes {
    /// The name of the intersection, used to name its connecting segments.
    pub name: String,
    /// The centre of the intersection.
    pub centre: Point2d,
    /// The radius of the intersection area.
    pub radius: f64,
}

/// A junction joining a set of incoming roads to a set of outgoing roads.
#[derive(Clone, Debug)]
pub struct Intersection {
    id: IntersectionId,
    name: String,
    centre: Point2d,
    radius: f64,
    /// The roads leading into the intersection.
    incoming: Vec<SegmentId>,
    /// The roads leading out of the intersection.
    outgoing: Vec<SegmentId>,
    /// The connecting segment built for each (incoming, outgoing) pair.
    connectors: BTreeMap<(SegmentId, SegmentId), SegmentId>,
    /// The incoming roads with a stop sign.
    stop_signs: BTreeSet<SegmentId>,
    /// The roads each incoming road must give way to.
    priorities: BTreeMap<SegmentId, Vec<SegmentId>>,
    /// The vehicles that have come to a full stop at a stop sign.
    stopped: HashSet<VehicleId>,
}

impl Intersection {
    pub(crate) fn new(id: IntersectionId, attribs: &IntersectionAttributes) -> Self {
        Self {
            id,
            name: attribs.name.clone(),
            centre: attribs.centre,
            radius: attribs.radius,
            incoming: vec![],
            outgoing: vec![],
            connectors: BTreeMap::new(),
            stop_signs: BTreeSet::new(),
            priorities: BTreeMap::new(),
            stopped: HashSet::new(),
        }
    }

    pub fn id(&self) -> IntersectionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn centre(&self) -> Point2d {
        self.centre
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn incoming(&self) -> &[SegmentId] {
        &self.incoming
    }

    pub fn outgoing(&self) -> &[SegmentId] {
        &self.outgoing
    }

    /// The connecting segment between an incoming and an outgoing road, once built.
    pub fn connector(&self, from: SegmentId, to: SegmentId) -> Option<SegmentId> {
        self.connectors.get(&(from, to)).copied()
    }

    /// All the connecting segments, keyed by (incoming, outgoing) road.
    pub fn connectors(&self) -> impl Iterator<Item = ((SegmentId, SegmentId), SegmentId)> + '_ {
        self.connectors.iter().map(|(k, v)| (*k, *v))
    }

    pub fn has_stop_sign(&self, road: SegmentId) -> bool {
        self.stop_signs.contains(&road)
    }

    /// The roads that vehicles on `road` must give way to.
    pub fn priorities(&self, road: SegmentId) -> &[SegmentId] {
        self.priorities.get(&road).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the vehicle has been seen standing at a stop sign.
    pub fn has_stopped(&self, vehicle: VehicleId) -> bool {
        self.stopped.contains(&vehicle)
    }

    pub(crate) fn add_incoming(&mut self, road: SegmentId) {
        if !self.incoming.contains(&road) {
            self.incoming.push(road);
        }
    }

    pub(crate) fn add_outgoing(&mut self, road: SegmentId) {
        if !self.outgoing.contains(&road) {
            self.outgoing.push(road);
        }
    }

    pub(crate) fn add_stop_sign(&mut self, road: SegmentId) {
        self.stop_signs.insert(road);
    }

    /// The (incoming, outgoing) pairs that don't have a connecting segment yet.
    pub(crate) fn unbuilt_connections(&self) -> Vec<(SegmentId, SegmentId)> {
        iproduct!(&self.incoming, &self.outgoing)
            .map(|(from, to)| (*from, *to))
            .filter(|pair| !self.connectors.contains_key(pair))
            .collect()
    }

    /// The attributes of the segment connecting the end of `from` to the start of `to`.
    pub(crate) fn connector_attributes(&self, from: &Segment, to: &Segment) -> SegmentAttributes {
        let start = from.point_at(1.0);
        let end = to.point_at(0.0);
        let heading_in = from.heading_at(1.0);
        let heading_out = to.heading_at(0.0);

        let attribs = if normalize_angle(heading_in - heading_out).abs() < STRAIGHT_THRESHOLD {
            SegmentAttributes::line(start, end)
        } else {
            let control = intersect_lines(start, heading_in, end, heading_out)
                .unwrap_or_else(|| Point2d::new(0.5 * (start.x + end.x), 0.5 * (start.y + end.y)));
            SegmentAttributes::quadratic(start, control, end)
        };

        attribs
            .with_name(format!("{}_from_{}_to_{}", self.name, from.label(), to.label()))
            .with_category(Category::Intersection)
    }

    pub(crate) fn add_connector(&mut self, from: SegmentId, to: SegmentId, connector: SegmentId) {
        self.connectors.insert((from, to), connector);
    }

    /// Works out which incoming roads each incoming road must give way to.
    ///
    /// Roads with a stop sign give way to every other road. Other roads give way
    /// to roads without a stop sign that approach from their right.
    pub(crate) fn calculate_priorities(&mut self, segments: &[Segment]) {
        let headings = self
            .incoming
            .iter()
            .map(|id| (*id, segments[id.index()].heading_at(1.0)))
            .collect::<Vec<_>>();

        self.priorities = headings
            .iter()
            .map(|(road, heading)| {
                let others = headings.iter().filter(|(other, _)| other != road);
                let yields_to: Vec<SegmentId> = if self.has_stop_sign(*road) {
                    others.map(|(other, _)| *other).collect()
                } else {
                    others
                        .filter(|(other, _)| !self.has_stop_sign(*other))
                        .filter(|(_, other_heading)| {
                            YIELD_WINDOW.contains_strictly(normalize_angle(other_heading - heading))
                        })
                        .map(|(other, _)| *other)
                        .collect()
                };
                (*road, yields_to)
            })
            .collect();
    }

    /// Decides whether a vehicle approaching the intersection along `road` may proceed.
    ///
    /// On a stop sign road the vehicle must first have come to a stop. After that,
    /// or straight away on other roads, it may go unless a vehicle on a road it gives
    /// way to is moving within [`SCAN_DISTANCE`] of the junction.
    pub(crate) fn check_clearance(
        &mut self,
        vehicle: &Vehicle,
        road: SegmentId,
        segments: &[Segment],
        vehicles: &VehicleSet,
    ) -> bool {
        if self.has_stop_sign(road) && !self.stopped.contains(&vehicle.id()) {
            if vehicle.vel() < STOP_SPEED {
                self.stopped.insert(vehicle.id());
            } else {
                return false;
            }
        }

        !self.priorities(road).iter().any(|other| {
            let segment = &segments[other.index()];
            segment.vehicles().any(|id| {
                let other = &vehicles[id];
                segment.length() - other.pos() < SCAN_DISTANCE && other.vel() > APPROACH_SPEED
            })
        })
    }

    /// Forgets that the vehicle stopped at a stop sign once it has moved off.
    pub(crate) fn observe_departure(&mut self, vehicle: &Vehicle) {
        if vehicle.vel() > RESUME_SPEED {
            self.stopped.remove(&vehicle.id());
        }
    }

    /// Forgets the vehicle entirely.
    pub(crate) fn release(&mut self, vehicle: VehicleId) {
        self.stopped.remove(&vehicle);
    }

    /// Where to put a traffic light on each incoming road, and its initial state.
    ///
    /// Roads running mostly vertically start green and those running mostly
    /// horizontally start red, so the two groups alternate.
    pub(crate) fn light_placements(&self, segments: &[Segment]) -> Vec<(SegmentId, f64, LightState)> {
        self.incoming
            .iter()
            .map(|id| {
                let road = &segments[id.index()];
                let heading = road.heading_at(1.0);
                let state = if heading.sin().abs() > heading.cos().abs() {
                    LightState::Green
                } else {
                    LightState::Red
                };
                let pos = f64::max(road.length() - LIGHT_SETBACK, 0.0);
                (*id, pos, state)
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::VehicleAttributes;
    use assert_approx_eq::assert_approx_eq;

    fn segments(attribs: Vec<SegmentAttributes>) -> Vec<Segment> {
        attribs
            .iter()
            .enumerate()
            .map(|(i, a)| Segment::new(SegmentId::new(i), a))
            .collect()
    }

    fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> SegmentAttributes {
        SegmentAttributes::line(Point2d::new(x1, y1), Point2d::new(x2, y2))
    }

    fn intersection() -> Intersection {
        Intersection::new(
            IntersectionId::default(),
            &IntersectionAttributes {
                name: "x".into(),
                centre: Point2d::new(0.0, 0.0),
                radius: 10.0,
            },
        )
    }

    #[test]
    fn straight_through_is_a_line() {
        let segs = segments(vec![line(-100.0, 0.0, -10.0, 0.0), line(10.0, 0.0, 100.0, 0.0)]);
        let attribs = intersection().connector_attributes(&segs[0], &segs[1]);
        assert!(matches!(attribs.geometry, crate::SegmentGeometry::Line(_)));
        assert_eq!(attribs.category, Category::Intersection);
        assert_eq!(attribs.name.as_deref(), Some("x_from_0_to_1"));
    }

    #[test]
    fn turn_uses_tangent_intersection() {
        // West approach turning north
        let segs = segments(vec![line(-100.0, 0.0, -10.0, 0.0), line(0.0, 10.0, 0.0, 100.0)]);
        let attribs = intersection().connector_attributes(&segs[0], &segs[1]);
        let points = attribs.geometry.points().to_vec();
        assert_eq!(points.len(), 3);
        assert_approx_eq!(points[1].x, 0.0);
        assert_approx_eq!(points[1].y, 0.0);
    }

    #[test]
    fn yields_to_the_right() {
        // Eastbound, northbound and westbound approaches
        let segs = segments(vec![
            line(-100.0, 0.0, -10.0, 0.0),
            line(0.0, -100.0, 0.0, -10.0),
            line(100.0, 0.0, 10.0, 0.0),
        ]);
        let ids = [0, 1, 2].map(SegmentId::new);
        let mut inter = intersection();
        ids.iter().for_each(|id| inter.add_incoming(*id));
        inter.calculate_priorities(&segs);

        // Northbound traffic approaches eastbound traffic from the right
        assert_eq!(inter.priorities(ids[0]), &[ids[1]]);
        // Westbound traffic approaches northbound traffic from the right
        assert_eq!(inter.priorities(ids[1]), &[ids[2]]);
        // Nothing approaches westbound traffic from the right, and opposing traffic is ignored
        assert!(inter.priorities(ids[2]).is_empty());
    }

    #[test]
    fn stop_signs_yield_to_everyone() {
        let segs = segments(vec![
            line(-100.0, 0.0, -10.0, 0.0),
            line(0.0, -100.0, 0.0, -10.0),
            line(100.0, 0.0, 10.0, 0.0),
        ]);
        let ids = [0, 1, 2].map(SegmentId::new);
        let mut inter = intersection();
        ids.iter().for_each(|id| inter.add_incoming(*id));
        inter.add_stop_sign(ids[1]);
        inter.calculate_priorities(&segs);

        assert_eq!(inter.priorities(ids[1]), &[ids[0], ids[2]]);
        // The stop sign road no longer counts as approaching from the right
        assert!(inter.priorities(ids[0]).is_empty());
    }

    /// An eastbound free road and a northbound stop sign road, both incoming.
    fn stop_sign_crossing() -> (Intersection, Vec<Segment>) {
        let segs = segments(vec![line(-100.0, 0.0, -10.0, 0.0), line(0.0, -100.0, 0.0, -10.0)]);
        let mut inter = intersection();
        inter.add_incoming(SegmentId::new(0));
        inter.add_incoming(SegmentId::new(1));
        inter.add_stop_sign(SegmentId::new(1));
        inter.calculate_priorities(&segs);
        (inter, segs)
    }

    fn place(vehicles: &mut VehicleSet, segs: &mut [Segment], road: usize, pos: f64, vel: f64) -> VehicleId {
        let id = vehicles.insert_with_key(|id| {
            Vehicle::new(id, &VehicleAttributes::default(), vec![SegmentId::new(road)])
        });
        vehicles[id].set_state(pos, vel);
        segs[road].insert_vehicle(vehicles, id);
        id
    }

    #[test]
    fn stop_sign_requires_a_stop_then_a_gap() {
        let (mut inter, mut segs) = stop_sign_crossing();
        let mut vehicles = VehicleSet::default();
        let minor = place(&mut vehicles, &mut segs, 1, 85.0, 1.0);
        let major = place(&mut vehicles, &mut segs, 0, 70.0, 5.0);
        let road = SegmentId::new(1);

        // Rolling up to the line is not a stop
        assert!(!inter.check_clearance(&vehicles[minor], road, &segs, &vehicles));
        assert!(!inter.has_stopped(minor));

        // Stopped, but a vehicle with priority is moving 20m from the junction
        vehicles[minor].set_state(85.0, 0.3);
        assert!(!inter.check_clearance(&vehicles[minor], road, &segs, &vehicles));
        assert!(inter.has_stopped(minor));

        // The vehicle with priority is waiting itself
        vehicles[major].set_state(70.0, 0.4);
        assert!(inter.check_clearance(&vehicles[minor], road, &segs, &vehicles));

        // Already stopped, so pulling away is fine while the other road is clear
        vehicles[minor].set_state(86.0, 1.5);
        assert!(inter.check_clearance(&vehicles[minor], road, &segs, &vehicles));

        // Moving traffic beyond the scan distance is ignored
        vehicles[major].set_state(45.0, 5.0);
        assert!(inter.check_clearance(&vehicles[minor], road, &segs, &vehicles));
        vehicles[major].set_state(51.0, 5.0);
        assert!(!inter.check_clearance(&vehicles[minor], road, &segs, &vehicles));
    }

    #[test]
    fn free_road_ignores_stop_sign_traffic() {
        let (mut inter, mut segs) = stop_sign_crossing();
        let mut vehicles = VehicleSet::default();
        let major = place(&mut vehicles, &mut segs, 0, 85.0, 8.0);
        place(&mut vehicles, &mut segs, 1, 80.0, 8.0);
        assert!(inter.check_clearance(&vehicles[major], SegmentId::new(0), &segs, &vehicles));
        assert!(!inter.has_stopped(major));
    }

    #[test]
    fn stop_record_clears_once_moving_off() {
        let (mut inter, mut segs) = stop_sign_crossing();
        let mut vehicles = VehicleSet::default();
        let minor = place(&mut vehicles, &mut segs, 1, 88.0, 0.0);
        assert!(inter.check_clearance(&vehicles[minor], SegmentId::new(1), &segs, &vehicles));
        assert!(inter.has_stopped(minor));

        vehicles[minor].set_state(88.5, 1.5);
        inter.observe_departure(&vehicles[minor]);
        assert!(inter.has_stopped(minor));

        // Still on the approach, but fast enough to have left the stop behind
        vehicles[minor].set_state(89.0, 2.5);
        inter.observe_departure(&vehicles[minor]);
        assert!(!inter.has_stopped(minor));
        assert_eq!(segs[1].vehicles().next(), Some(minor));

        // A fresh stop is needed before going again
        assert!(!inter.check_clearance(&vehicles[minor], SegmentId::new(1), &segs, &vehicles));
    }

    #[test]
    fn release_forgets_the_vehicle() {
        let (mut inter, mut segs) = stop_sign_crossing();
        let mut vehicles = VehicleSet::default();
        let minor = place(&mut vehicles, &mut segs, 1, 88.0, 0.0);
        inter.check_clearance(&vehicles[minor], SegmentId::new(1), &segs, &vehicles);
        inter.release(minor);
        assert!(!inter.has_stopped(minor));
    }

    #[test]
    fn vertical_roads_start_green() {
        let segs = segments(vec![line(-100.0, 0.0, -10.0, 0.0), line(0.0, -100.0, 0.0, -10.0)]);
        let mut inter = intersection();
        inter.add_incoming(SegmentId::new(0));
        inter.add_incoming(SegmentId::new(1));
        let placements = inter.light_placements(&segs);
        assert_eq!(placements[0].0, SegmentId::new(0));
        assert_approx_eq!(placements[0].1, 88.0);
        assert_eq!(placements[0].2, LightState::Red);
        assert_eq!(placements[1].2, LightState::Green);
    }
}
