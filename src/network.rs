//! Network topology and shortest-path routing.

use crate::{Segment, SegmentId};
use cgmath::MetricSpace;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;

/// The maximum distance between the end of one segment and the start of
/// another for the two to be considered connected.
const CONNECTION_TOLERANCE: f64 = 0.5;

/// Route lengths are measured in whole millimetres so they can be ordered exactly.
const COST_SCALE: f64 = 1000.0;

/// An error produced while routing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoutingError {
    /// No segment has the given name.
    SegmentNotFound(String),
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingError::SegmentNotFound(name) => write!(f, "segment '{}' not found", name),
        }
    }
}

impl std::error::Error for RoutingError {}

/// The connectivity of the segments in a network, derived from their geometry.
#[derive(Clone, Debug, Default)]
pub struct Topology {
    /// The segments that can be entered from the end of each segment.
    successors: Vec<SmallVec<[SegmentId; 4]>>,
    /// The cost of entering each segment.
    costs: Vec<u64>,
    /// Maps segment names to their IDs.
    names: HashMap<String, SegmentId>,
}

impl Topology {
    /// Builds the topology of the given segments. Two segments are connected
    /// when the end of the first coincides with the start of the second.
    pub fn build(segments: &[Segment]) -> Self {
        let names = segments
            .iter()
            .filter_map(|seg| seg.name().map(|name| (name.to_owned(), seg.id())))
            .collect();

        let successors = segments
            .iter()
            .map(|from| {
                let end = from.curve().geometry().end();
                segments
                    .iter()
                    .filter(|to| to.id() != from.id())
                    .filter(|to| end.distance(to.curve().geometry().start()) < CONNECTION_TOLERANCE)
                    .map(|to| to.id())
                    .collect()
            })
            .collect();

        // Lengths are scaled so that the sum of segment indices along any path can
        // break ties between equally long routes without outweighing a millimetre
        let tie_scale = (segments.len() as u64).saturating_mul(segments.len() as u64).max(1);
        let costs = segments
            .iter()
            .map(|seg| {
                let length = (seg.length() * COST_SCALE).round() as u64;
                length
                    .saturating_mul(tie_scale)
                    .saturating_add(seg.id().index() as u64)
            })
            .collect();

        Self {
            successors,
            costs,
            names,
        }
    }

    /// The segments that can be entered from the end of the given segment.
    pub fn successors(&self, id: SegmentId) -> &[SegmentId] {
        self.successors
            .get(id.index())
            .map(|s| s.as_slice())
            .unwrap_or(&[])
    }

    /// Looks up a segment by name.
    pub fn lookup(&self, name: &str) -> Result<SegmentId, RoutingError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| RoutingError::SegmentNotFound(name.to_owned()))
    }

    /// Finds the shortest sequence of segments leading from the segment named
    /// `start` to the segment named `end`, inclusive of both.
    ///
    /// The cost of a route is the total length of the segments entered after `start`.
    /// Between equally long routes, the one whose segments have the lowest sum of
    /// indices wins. Returns an empty path if `end` can't be reached from `start`.
    pub fn find_shortest_path(&self, start: &str, end: &str) -> Result<Vec<SegmentId>, RoutingError> {
        let start = self.lookup(start)?;
        let end = self.lookup(end)?;
        Ok(self.shortest_path_between(start, end))
    }

    /// Finds the shortest sequence of segments between two segments.
    pub fn shortest_path_between(&self, start: SegmentId, end: SegmentId) -> Vec<SegmentId> {
        let result = pathfinding::directed::dijkstra::dijkstra(
            &start,
            |id| {
                self.successors(*id)
                    .iter()
                    .map(|next| (*next, self.costs[next.index()]))
                    .collect::<SmallVec<[_; 4]>>()
            },
            |id| *id == end,
        );
        result.map(|(path, _)| path).unwrap_or_default()
    }
}
