//! Stochastic vehicle spawning.

use crate::{Segment, SegmentId, VehicleAttributes, VehicleSet};
use log::warn;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand_distr::Normal;

/// The bounds applied to a sampled free-flow velocity factor.
const SPEED_FACTOR_MIN: f64 = 0.75;
const SPEED_FACTOR_MAX: f64 = 1.25;

/// How a vehicle template chooses its path through the network.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Route {
    /// An explicit sequence of segments.
    Path(Vec<SegmentId>),
    /// The shortest path between two named segments, resolved when the generator is added.
    Between { start: String, end: String },
}

/// A kind of vehicle a generator can spawn.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleTemplate {
    /// The relative likelihood of this template being chosen.
    pub weight: f64,
    /// The attributes of the spawned vehicles.
    pub attributes: VehicleAttributes,
    /// The path the spawned vehicles take.
    pub route: Route,
}

/// The attributes of a vehicle generator.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeneratorAttributes {
    /// The number of vehicles to spawn per minute.
    pub rate: f64,
    /// The templates to choose between.
    pub templates: Vec<VehicleTemplate>,
    /// Seeds the generator's random number generator.
    pub seed: u64,
    /// The standard deviation of the factor applied to each spawned vehicle's
    /// free-flow velocity. No variation is applied if `None`.
    pub speed_spread: Option<f64>,
}

impl Default for GeneratorAttributes {
    fn default() -> Self {
        Self {
            rate: 20.0,
            templates: vec![],
            seed: 0,
            speed_spread: None,
        }
    }
}

/// Spawns vehicles onto the start of their paths at a fixed rate.
#[derive(Clone, Debug)]
pub struct VehicleGenerator {
    /// The number of vehicles to spawn per minute.
    rate: f64,
    /// The vehicle attributes and resolved path of each template.
    templates: Vec<(VehicleAttributes, Vec<SegmentId>)>,
    /// Picks a template, or `None` if no template can be spawned.
    weights: Option<WeightedIndex<f64>>,
    /// Samples the free-flow velocity factor.
    speed_factor: Option<Normal<f64>>,
    rng: StdRng,
    /// The time the last vehicle was spawned, in s.
    last_added: f64,
    /// The template chosen for the next vehicle.
    upcoming: Option<usize>,
}

impl VehicleGenerator {
    /// Creates a generator from its attributes, with each template's route already resolved to a path.
    pub(crate) fn new(attribs: &GeneratorAttributes, paths: Vec<Vec<SegmentId>>) -> Self {
        // Templates that lead nowhere are never chosen
        let weights = attribs
            .templates
            .iter()
            .zip(&paths)
            .map(|(template, path)| {
                if path.is_empty() {
                    0.0
                } else {
                    template.weight
                }
            })
            .collect::<Vec<_>>();
        let weights = WeightedIndex::new(weights)
            .map_err(|err| warn!("Generator has no templates that can be spawned: {}", err))
            .ok();

        let speed_factor = attribs.speed_spread.and_then(|stddev| {
            Normal::new(1.0, stddev)
                .map_err(|err| warn!("Invalid speed spread {}: {}", stddev, err))
                .ok()
        });

        let templates = attribs
            .templates
            .iter()
            .map(|template| template.attributes)
            .zip(paths)
            .collect();

        Self {
            rate: attribs.rate,
            templates,
            weights,
            speed_factor,
            rng: StdRng::seed_from_u64(attribs.seed),
            last_added: 0.0,
            upcoming: None,
        }
    }

    /// The number of vehicles spawned per minute.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// The resolved path of each template.
    pub fn paths(&self) -> impl Iterator<Item = &[SegmentId]> {
        self.templates.iter().map(|(_, path)| path.as_slice())
    }

    /// Decides whether to spawn a vehicle at time `now`.
    ///
    /// A vehicle is due once `60 / rate` seconds have passed since the last one, and is
    /// spawned as soon as the first segment of its path has room for it. Returns the
    /// attributes and path of the vehicle to spawn.
    pub(crate) fn poll(
        &mut self,
        now: f64,
        segments: &[Segment],
        vehicles: &VehicleSet,
    ) -> Option<(VehicleAttributes, Vec<SegmentId>)> {
        if self.rate <= 0.0 || now - self.last_added < 60.0 / self.rate {
            return None;
        }

        let idx = match self.upcoming {
            Some(idx) => idx,
            None => {
                let idx = self.weights.as_ref()?.sample(&mut self.rng);
                self.upcoming = Some(idx);
                idx
            }
        };

        let (attribs, path) = &self.templates[idx];
        let entry = &segments[path.first()?.index()];
        let has_room = entry
            .tail()
            .map_or(true, |id| vehicles[id].pos() > attribs.min_gap + attribs.length);
        if !has_room {
            return None;
        }

        let mut attribs = *attribs;
        if let Some(distr) = &self.speed_factor {
            let factor = distr
                .sample(&mut self.rng)
                .clamp(SPEED_FACTOR_MIN, SPEED_FACTOR_MAX);
            attribs.max_vel *= factor;
        }

        self.last_added = now;
        self.upcoming = None;
        Some((attribs, path.clone()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::Point2d;
    use crate::SegmentAttributes;

    fn road() -> Vec<Segment> {
        let attribs = SegmentAttributes::line(Point2d::new(0.0, 0.0), Point2d::new(100.0, 0.0));
        vec![Segment::new(SegmentId::new(0), &attribs)]
    }

    fn template(weight: f64) -> VehicleTemplate {
        VehicleTemplate {
            weight,
            attributes: VehicleAttributes::default(),
            route: Route::Path(vec![SegmentId::new(0)]),
        }
    }

    #[test]
    fn spawns_at_configured_rate() {
        let segments = road();
        let vehicles = VehicleSet::default();
        let attribs = GeneratorAttributes {
            rate: 30.0,
            templates: vec![template(1.0)],
            ..Default::default()
        };
        let mut generator = VehicleGenerator::new(&attribs, vec![vec![SegmentId::new(0)]]);
        assert!(generator.poll(1.0, &segments, &vehicles).is_none());
        assert!(generator.poll(2.0, &segments, &vehicles).is_some());
        assert!(generator.poll(3.5, &segments, &vehicles).is_none());
        assert!(generator.poll(4.0, &segments, &vehicles).is_some());
    }

    #[test]
    fn skips_templates_without_a_path() {
        let segments = road();
        let vehicles = VehicleSet::default();
        let attribs = GeneratorAttributes {
            rate: 60.0,
            templates: vec![template(100.0), template(1.0)],
            ..Default::default()
        };
        let mut generator = VehicleGenerator::new(&attribs, vec![vec![], vec![SegmentId::new(0)]]);
        for i in 1..20 {
            let (_, path) = generator.poll(i as f64, &segments, &vehicles).unwrap();
            assert_eq!(path, [SegmentId::new(0)]);
        }
    }

    #[test]
    fn never_spawns_without_a_path() {
        let segments = road();
        let vehicles = VehicleSet::default();
        let attribs = GeneratorAttributes {
            rate: 60.0,
            templates: vec![template(1.0)],
            ..Default::default()
        };
        let mut generator = VehicleGenerator::new(&attribs, vec![vec![]]);
        assert!(generator.poll(10.0, &segments, &vehicles).is_none());
    }

    #[test]
    fn speed_factor_is_bounded() {
        let segments = road();
        let vehicles = VehicleSet::default();
        let attribs = GeneratorAttributes {
            rate: 60.0,
            templates: vec![template(1.0)],
            seed: 7,
            speed_spread: Some(1.0),
        };
        let mut generator = VehicleGenerator::new(&attribs, vec![vec![SegmentId::new(0)]]);
        for i in 1..50 {
            let (veh, _) = generator.poll(i as f64, &segments, &vehicles).unwrap();
            assert!(veh.max_vel >= 16.6 * 0.75 - 1e-9);
            assert!(veh.max_vel <= 16.6 * 1.25 + 1e-9);
        }
    }
}
