use anyhow::{ensure, Result};
use clap::{Parser, ValueEnum};
use log::info;
use road_sim::math::Point2d;
use road_sim::{
    GeneratorAttributes, IntersectionAttributes, LightState, Route, SegmentAttributes, SegmentId,
    Simulation, SimulationConfig, TrafficLight, VehicleAttributes, VehicleClass, VehicleTemplate,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Scenario {
    /// A single straight road with a traffic light half way along
    Light,
    /// A four way crossing with stop signs on the north and south approaches
    Cross,
    /// A four way crossing controlled by traffic lights
    Signals,
}

#[derive(Parser)]
#[command(name = "road-sim")]
#[command(about = "Runs one of the demo road networks headlessly")]
struct Cli {
    /// The network to simulate
    #[arg(long, value_enum, default_value = "cross")]
    scenario: Scenario,

    /// Number of ticks to simulate
    #[arg(long, default_value = "3600")]
    ticks: usize,

    /// Time step per tick in seconds
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f64,

    /// Seed for the vehicle generators
    #[arg(long, default_value = "0")]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    ensure!(cli.dt > 0.0, "time step must be positive, got {}", cli.dt);

    let mut sim = Simulation::with_config(SimulationConfig { dt: cli.dt });
    match cli.scenario {
        Scenario::Light => build_light(&mut sim, cli.seed),
        Scenario::Cross => build_cross(&mut sim, cli.seed, false)?,
        Scenario::Signals => build_cross(&mut sim, cli.seed, true)?,
    }
    info!(
        "Simulating {:?} scenario: {} segments, {} ticks of {:.4}s",
        cli.scenario,
        sim.iter_segments().count(),
        cli.ticks,
        cli.dt
    );

    let ticks_per_report = usize::max((10.0 / cli.dt).round() as usize, 1);
    let mut remaining = cli.ticks;
    while remaining > 0 {
        let ticks = remaining.min(ticks_per_report);
        sim.run(ticks);
        remaining -= ticks;
        report(&sim);
    }

    Ok(())
}

/// Logs a summary of the current state of the simulation.
fn report(sim: &Simulation) {
    let count = sim.iter_vehicles().count();
    let mean_speed = if count > 0 {
        sim.iter_vehicles().map(|veh| veh.vel()).sum::<f64>() / count as f64
    } else {
        0.0
    };
    let co2 = sim.iter_vehicles().map(|veh| veh.co2_emissions()).sum::<f64>();
    info!(
        "t={:.1}s: {} vehicles, mean speed {:.2} m/s, {} trips completed, {:.1} g/km CO2",
        sim.time(),
        count,
        mean_speed,
        sim.completed_trips(),
        co2
    );
}

fn line(x1: f64, y1: f64, x2: f64, y2: f64, name: &str) -> SegmentAttributes {
    SegmentAttributes::line(Point2d::new(x1, y1), Point2d::new(x2, y2)).with_name(name)
}

fn build_light(sim: &mut Simulation, seed: u64) {
    let road = sim.add_segment(&line(0.0, 0.0, 200.0, 0.0, "main"));
    sim.add_traffic_light(TrafficLight::new(road, 100.0, 6.0, LightState::Red));
    sim.add_obstacle(road, 160.0, 20.0);
    sim.add_vehicle_generator(&GeneratorAttributes {
        rate: 15.0,
        templates: vec![VehicleTemplate {
            weight: 1.0,
            attributes: VehicleAttributes::default(),
            route: Route::Path(vec![road]),
        }],
        seed,
        speed_spread: Some(0.1),
    });
}

fn build_cross(sim: &mut Simulation, seed: u64, signals: bool) -> Result<()> {
    let roads = [
        line(-100.0, -2.0, -10.0, -2.0, "west_in"),
        line(-10.0, 2.0, -100.0, 2.0, "west_out"),
        line(100.0, 2.0, 10.0, 2.0, "east_in"),
        line(10.0, -2.0, 100.0, -2.0, "east_out"),
        line(2.0, -100.0, 2.0, -10.0, "south_in"),
        line(-2.0, -10.0, -2.0, -100.0, "south_out"),
        line(-2.0, 100.0, -2.0, 10.0, "north_in"),
        line(2.0, 10.0, 2.0, 100.0, "north_out"),
    ]
    .iter()
    .map(|attribs| sim.add_segment(attribs))
    .collect::<Vec<SegmentId>>();

    let centre = sim.add_intersection(&IntersectionAttributes {
        name: "centre".into(),
        centre: Point2d::new(0.0, 0.0),
        radius: 10.0,
    });
    for pair in roads.chunks(2) {
        sim.add_incoming(centre, pair[0]);
        sim.add_outgoing(centre, pair[1]);
    }
    sim.build_intersection(centre);

    if signals {
        sim.set_traffic_lights(centre, 20.0);
    } else {
        sim.add_stop_sign(centre, roads[4]);
        sim.add_stop_sign(centre, roads[6]);
    }
    sim.calculate_priorities(centre);

    let car = VehicleAttributes::default();
    let truck = VehicleAttributes {
        length: 8.0,
        max_vel: 12.0,
        max_acc: 1.0,
        class: VehicleClass::Truck,
        ..Default::default()
    };
    let flows = [
        ("west_in", ["east_out", "north_out"]),
        ("east_in", ["west_out", "south_out"]),
        ("south_in", ["north_out", "west_out"]),
        ("north_in", ["south_out", "east_out"]),
    ];
    for (idx, (start, ends)) in flows.iter().enumerate() {
        let mut templates = vec![];
        for end in ends {
            // Routes are resolved up front so that a broken network fails loudly
            let path = sim.find_shortest_path(start, end)?;
            ensure!(!path.is_empty(), "no path from {} to {}", start, end);
            templates.push(VehicleTemplate {
                weight: 3.0,
                attributes: car,
                route: Route::Path(path.clone()),
            });
            templates.push(VehicleTemplate {
                weight: 1.0,
                attributes: truck,
                route: Route::Path(path),
            });
        }
        sim.add_vehicle_generator(&GeneratorAttributes {
            rate: 8.0,
            templates,
            seed: seed.wrapping_add(idx as u64),
            speed_spread: Some(0.1),
        });
    }

    Ok(())
}
