//! Tests of a four way crossing.

use assert_approx_eq::assert_approx_eq;
use road_sim::{
    math::Point2d, Category, IntersectionAttributes, IntersectionId, LightState,
    SegmentAttributes, SegmentId, Simulation, VehicleAttributes,
};

struct Cross {
    sim: Simulation,
    centre: IntersectionId,
    west_in: SegmentId,
    east_out: SegmentId,
    south_in: SegmentId,
    north_in: SegmentId,
    north_out: SegmentId,
    east_in: SegmentId,
}

fn line(x1: f64, y1: f64, x2: f64, y2: f64, name: &str) -> SegmentAttributes {
    SegmentAttributes::line(Point2d::new(x1, y1), Point2d::new(x2, y2)).with_name(name)
}

/// Builds a crossing with 90m approaches, keeping to the right.
fn cross() -> Cross {
    let mut sim = Simulation::new();
    let west_in = sim.add_segment(&line(-100.0, -2.0, -10.0, -2.0, "west_in"));
    let west_out = sim.add_segment(&line(-10.0, 2.0, -100.0, 2.0, "west_out"));
    let east_in = sim.add_segment(&line(100.0, 2.0, 10.0, 2.0, "east_in"));
    let east_out = sim.add_segment(&line(10.0, -2.0, 100.0, -2.0, "east_out"));
    let south_in = sim.add_segment(&line(2.0, -100.0, 2.0, -10.0, "south_in"));
    let south_out = sim.add_segment(&line(-2.0, -10.0, -2.0, -100.0, "south_out"));
    let north_in = sim.add_segment(&line(-2.0, 100.0, -2.0, 10.0, "north_in"));
    let north_out = sim.add_segment(&line(2.0, 10.0, 2.0, 100.0, "north_out"));

    let centre = sim.add_intersection(&IntersectionAttributes {
        name: "centre".into(),
        centre: Point2d::new(0.0, 0.0),
        radius: 10.0,
    });
    for road in [west_in, east_in, south_in, north_in] {
        sim.add_incoming(centre, road);
    }
    for road in [west_out, east_out, south_out, north_out] {
        sim.add_outgoing(centre, road);
    }
    let connectors = sim.build_intersection(centre);
    assert_eq!(connectors.len(), 16);

    Cross {
        sim,
        centre,
        west_in,
        east_out,
        south_in,
        north_in,
        north_out,
        east_in,
    }
}

/// Test that turning connectors bend through the point where the roads' tangents meet.
#[test]
fn connectors_follow_the_roads() {
    let cross = cross();
    let inter = cross.sim.get_intersection(cross.centre).unwrap();

    let turn = inter.connector(cross.west_in, cross.north_out).unwrap();
    let turn = cross.sim.get_segment(turn).unwrap();
    assert_eq!(turn.name(), Some("centre_from_west_in_to_north_out"));
    assert_eq!(turn.category(), &Category::Intersection);
    let points = turn.points();
    assert_eq!(points.len(), 3);
    assert_approx_eq!(points[1].x, 2.0);
    assert_approx_eq!(points[1].y, -2.0);

    let straight = inter.connector(cross.west_in, cross.east_out).unwrap();
    let straight = cross.sim.get_segment(straight).unwrap();
    assert_eq!(straight.points().len(), 2);
    assert_approx_eq!(straight.length(), 20.0);
}

/// Test that connectors take part in routing.
#[test]
fn routes_pass_through_connectors() {
    let cross = cross();
    let path = cross.sim.find_shortest_path("west_in", "north_out").unwrap();
    let connector = cross
        .sim
        .get_intersection(cross.centre)
        .unwrap()
        .connector(cross.west_in, cross.north_out)
        .unwrap();
    assert_eq!(path, [cross.west_in, connector, cross.north_out]);
}

/// Test that stop sign roads give way to everyone, and free roads only to each other.
#[test]
fn stop_signs_set_priorities() {
    let mut cross = cross();
    cross.sim.add_stop_sign(cross.centre, cross.south_in);
    cross.sim.add_stop_sign(cross.centre, cross.north_in);
    // Not an incoming road, so ignored
    cross.sim.add_stop_sign(cross.centre, cross.east_out);
    cross.sim.calculate_priorities(cross.centre);

    let inter = cross.sim.get_intersection(cross.centre).unwrap();
    assert!(!inter.has_stop_sign(cross.east_out));
    assert!(inter.priorities(cross.west_in).is_empty());
    assert!(inter.priorities(cross.east_in).is_empty());
    assert_eq!(
        inter.priorities(cross.north_in),
        &[cross.west_in, cross.east_in, cross.south_in]
    );
    assert_eq!(
        inter.priorities(cross.south_in),
        &[cross.west_in, cross.east_in, cross.north_in]
    );
}

/// Test that a vehicle at a stop sign halts, then waits for crossing traffic to pass.
#[test]
fn stop_sign_vehicle_waits_its_turn() {
    let mut cross = cross();
    cross.sim.add_stop_sign(cross.centre, cross.south_in);
    cross.sim.add_stop_sign(cross.centre, cross.north_in);
    cross.sim.calculate_priorities(cross.centre);

    let attribs = VehicleAttributes::default();
    let path = cross.sim.find_shortest_path("west_in", "east_out").unwrap();
    let free = cross.sim.add_vehicle_at(&attribs, path, 20.0, 8.0).unwrap();
    let path = cross.sim.find_shortest_path("south_in", "north_out").unwrap();
    let minor = cross.sim.add_vehicle_at(&attribs, path, 60.0, 6.0).unwrap();

    let mut min_vel = f64::INFINITY;
    let mut crossed = false;
    for _ in 0..60 * 40 {
        cross.sim.update();
        let Some(vehicle) = cross.sim.get_vehicle(minor) else {
            crossed = true;
            break;
        };
        if vehicle.segment_id() == Some(cross.south_in) {
            min_vel = min_vel.min(vehicle.vel());
        } else {
            // The free road vehicle must be clear of its approach
            let free_road = cross.sim.get_vehicle(free).and_then(|v| v.segment_id());
            assert_ne!(free_road, Some(cross.west_in));
        }
        if vehicle.segment_id() == Some(cross.north_out) {
            crossed = true;
        }
    }

    assert!(min_vel < 0.5);
    assert!(crossed);
    let inter = cross.sim.get_intersection(cross.centre).unwrap();
    assert!(!inter.has_stopped(minor));
}

/// Test that a refused vehicle on a road without a stop sign is only held until
/// its front bumper reaches the end of the road.
#[test]
fn refused_free_road_vehicle_still_enters() {
    let mut cross = cross();
    cross.sim.calculate_priorities(cross.centre);

    // Creeps up the road from the right, slowly enough to stay within scan range
    let crawler = VehicleAttributes {
        max_vel: 1.0,
        ..Default::default()
    };
    let path = cross.sim.find_shortest_path("south_in", "north_out").unwrap();
    let priority = cross.sim.add_vehicle_at(&crawler, path, 55.0, 1.0).unwrap();
    let path = cross.sim.find_shortest_path("west_in", "east_out").unwrap();
    let free = cross
        .sim
        .add_vehicle_at(&VehicleAttributes::default(), path, 60.0, 8.0)
        .unwrap();

    let mut entered = false;
    for _ in 0..60 * 15 {
        cross.sim.update();
        let vehicle = cross.sim.get_vehicle(free).unwrap();
        if vehicle.segment_id() != Some(cross.west_in) {
            entered = true;
            break;
        }
    }
    assert!(entered);

    // The vehicle with priority was still approaching the whole time
    let vehicle = cross.sim.get_vehicle(priority).unwrap();
    assert_eq!(vehicle.segment_id(), Some(cross.south_in));
    assert!(vehicle.vel() > 0.5);
}

/// Test that automatically placed lights start green on north-south roads.
#[test]
fn lights_alternate_by_direction() {
    let mut cross = cross();
    let lights = cross.sim.set_traffic_lights(cross.centre, 10.0);
    assert_eq!(lights.len(), 4);

    for id in lights {
        let light = cross.sim.get_light(id).unwrap();
        let vertical = light.segment() == cross.south_in || light.segment() == cross.north_in;
        let expected = if vertical {
            LightState::Green
        } else {
            LightState::Red
        };
        assert_eq!(light.state(), expected);
        assert_approx_eq!(light.pos(), 88.0);
    }
}

/// Test that traffic held at a red light moves off on green.
#[test]
fn vehicles_wait_for_green() {
    let mut cross = cross();
    cross.sim.set_traffic_lights(cross.centre, 10.0);
    let path = cross.sim.find_shortest_path("west_in", "east_out").unwrap();
    let veh = cross
        .sim
        .add_vehicle_at(&VehicleAttributes::default(), path, 40.0, 8.0)
        .unwrap();

    cross.sim.run(60 * 9);
    let vehicle = cross.sim.get_vehicle(veh).unwrap();
    assert_eq!(vehicle.segment_id(), Some(cross.west_in));
    assert!(vehicle.pos_front() < 88.0);
    assert!(vehicle.vel() < 0.1);

    cross.sim.run(60 * 10);
    let vehicle = cross.sim.get_vehicle(veh).unwrap();
    assert_ne!(vehicle.segment_id(), Some(cross.west_in));
}
