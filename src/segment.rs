use crate::math::{CubicBezier2d, LineSegment2d, Point2d, QuadraticBezier2d};
use crate::{IntersectionId, SegmentId, VehicleId, VehicleSet};
pub use curve::{SegmentCurve, SegmentGeometry};
use std::collections::VecDeque;

mod curve;

/// The default maximum speed of a segment.
const DEFAULT_MAX_SPEED: f64 = 50.0;

/// A cosmetic tag describing what kind of road a segment is.
///
/// Tags without a variant of their own, such as "bus" or "dirt", are kept as [`Category::Other`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "String", into = "String"))]
pub enum Category {
    #[default]
    General,
    Intersection,
    Highway,
    Residential,
    Other(String),
}

impl Category {
    /// The tag as written in a network description.
    pub fn as_str(&self) -> &str {
        match self {
            Self::General => "general",
            Self::Intersection => "intersection",
            Self::Highway => "highway",
            Self::Residential => "residential",
            Self::Other(tag) => tag,
        }
    }
}

impl From<&str> for Category {
    fn from(tag: &str) -> Self {
        match tag {
            "general" => Self::General,
            "intersection" => Self::Intersection,
            "highway" => Self::Highway,
            "residential" => Self::Residential,
            _ => Self::Other(tag.to_string()),
        }
    }
}

impl From<String> for Category {
    fn from(tag: String) -> Self {
        match Self::from(tag.as_str()) {
            Self::Other(_) => Self::Other(tag),
            known => known,
        }
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

/// A single road segment that vehicles travel along in single file.
#[derive(Clone, Debug)]
pub struct Segment {
    /// The segment ID.
    id: SegmentId,
    /// The optional name used to refer to the segment when routing.
    name: Option<String>,
    /// The category of the segment.
    category: Category,
    /// The maximum speed.
    max_speed: f64,
    /// The centre line of the segment.
    curve: SegmentCurve,
    /// The vehicles on the segment, most advanced first.
    vehicles: VecDeque<VehicleId>,
    /// The intersection this segment leads into, if it's one of its incoming roads.
    approach: Option<IntersectionId>,
}

/// The attributes of a segment.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentAttributes {
    /// The shape of the segment's centre line.
    pub geometry: SegmentGeometry,
    /// An optional name used for routing.
    pub name: Option<String>,
    /// The category of the segment.
    pub category: Category,
    /// The maximum speed.
    pub max_speed: f64,
}

impl SegmentAttributes {
    /// A straight segment.
    pub fn line(start: Point2d, end: Point2d) -> Self {
        Self::new(SegmentGeometry::Line(LineSegment2d::from_ends(start, end)))
    }

    /// A quadratic bezier segment.
    pub fn quadratic(start: Point2d, control: Point2d, end: Point2d) -> Self {
        Self::new(SegmentGeometry::Quadratic(QuadraticBezier2d::new(&[
            start, control, end,
        ])))
    }

    /// A cubic bezier segment.
    pub fn cubic(start: Point2d, control1: Point2d, control2: Point2d, end: Point2d) -> Self {
        Self::new(SegmentGeometry::Cubic(CubicBezier2d::new(&[
            start, control1, control2, end,
        ])))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_max_speed(mut self, max_speed: f64) -> Self {
        self.max_speed = max_speed;
        self
    }

    fn new(geometry: SegmentGeometry) -> Self {
        Self {
            geometry,
            name: None,
            category: Category::General,
            max_speed: DEFAULT_MAX_SPEED,
        }
    }
}

impl Segment {
    /// Creates a new segment.
    pub(crate) fn new(id: SegmentId, attribs: &SegmentAttributes) -> Self {
        Self {
            id,
            name: attribs.name.clone(),
            category: attribs.category.clone(),
            max_speed: attribs.max_speed,
            curve: SegmentCurve::new(attribs.geometry),
            vehicles: VecDeque::new(),
            approach: None,
        }
    }

    /// Gets the segment's ID.
    pub fn id(&self) -> SegmentId {
        self.id
    }

    /// Gets the segment's name, if it has one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The name of the segment, or its index when it is unnamed.
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.id.index().to_string())
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    /// Gets the length of the segment.
    pub fn length(&self) -> f64 {
        self.curve.length()
    }

    /// Gets the segment's centre line.
    pub fn curve(&self) -> &SegmentCurve {
        &self.curve
    }

    /// The control points of the segment.
    pub fn points(&self) -> &[Point2d] {
        self.curve.geometry().points()
    }

    /// Samples the point at the given fraction of the segment's length.
    pub fn point_at(&self, progress: f64) -> Point2d {
        self.curve.point_at(progress)
    }

    /// The heading in radians at the given fraction of the segment's length.
    pub fn heading_at(&self, progress: f64) -> f64 {
        self.curve.heading_at(progress)
    }

    /// The vehicles on the segment, most advanced first.
    pub fn vehicles(&self) -> impl ExactSizeIterator<Item = VehicleId> + '_ {
        self.vehicles.iter().copied()
    }

    /// The intersection this segment leads into.
    pub fn approach(&self) -> Option<IntersectionId> {
        self.approach
    }

    pub(crate) fn set_approach(&mut self, intersection: IntersectionId) {
        self.approach = Some(intersection);
    }

    pub(crate) fn head(&self) -> Option<VehicleId> {
        self.vehicles.front().copied()
    }

    pub(crate) fn pop_head(&mut self) -> Option<VehicleId> {
        self.vehicles.pop_front()
    }

    /// Appends a vehicle entering from the start of the segment.
    pub(crate) fn push_tail(&mut self, id: VehicleId) {
        self.vehicles.push_back(id);
    }

    /// Inserts a vehicle at an arbitrary position, keeping the queue ordered.
    pub(crate) fn insert_vehicle(&mut self, vehicles: &VehicleSet, id: VehicleId) {
        let veh_pos = vehicles[id].pos();
        let idx = self
            .vehicles
            .iter()
            .position(|other| vehicles[*other].pos() < veh_pos)
            .unwrap_or(self.vehicles.len());
        self.vehicles.insert(idx, id);
    }

    /// The last vehicle to have entered the segment.
    pub(crate) fn tail(&self) -> Option<VehicleId> {
        self.vehicles.back().copied()
    }
}
