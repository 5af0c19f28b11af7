use crate::math::Point2d;

/// The outline of a [StaticObject].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Shape {
    #[default]
    Rectangle,
    Circle,
}

/// A decorative object, such as a building or a tree, that vehicles ignore.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StaticObject {
    /// The centre of the object.
    pub centre: Point2d,
    /// The width of the object, or its diameter if it is a circle.
    pub width: f64,
    pub height: f64,
    /// The RGB colour of the object.
    pub color: [u8; 3],
    pub shape: Shape,
}
