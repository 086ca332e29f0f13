// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GML geometry tree
//!
//! Geometry is modelled as a closed tagged union. Leaves (rings and
//! polygons) carry coordinates; every other node is structure only:
//!
//! ```text
//! Solid
//!  └─ exterior: CompositeSurface
//!      ├─ Polygon (exterior ring, interior rings)
//!      ├─ OrientableSurface(-) ─ Polygon
//!      └─ href "#shared-wall"
//! ```
//!
//! Any member slot may hold an `href` instead of an inline node. Those are
//! resolved later against the identity index.

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A 3D point. 2D input gets `z = 0.0`.
pub type Point = [f64; 3];

/// Coordinate dimension assumed when the document does not state one.
pub const DEFAULT_DIMENSION: usize = 3;

/// Minimum number of points in a closed ring.
pub const MIN_RING_POINTS: usize = 4;

#[cfg(feature = "serde")]
fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}

/// Orientation flag of an orientable surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Orientation {
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "+"))]
    Positive,
    #[cfg_attr(feature = "serde", serde(rename = "-"))]
    Negative,
}

impl Orientation {
    /// Whether this orientation flips the point order of the wrapped surface.
    #[inline]
    pub fn is_negative(self) -> bool {
        self == Orientation::Negative
    }
}

/// A linear ring given as a flat coordinate list (`x y z x y z ...`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ring {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Option<String>,
    pub coordinates: Vec<f64>,
    #[cfg_attr(feature = "serde", serde(default = "default_dimension"))]
    pub dimension: usize,
}

impl Ring {
    /// Create an unidentified 3D ring.
    pub fn new(coordinates: Vec<f64>) -> Self {
        Self {
            id: None,
            coordinates,
            dimension: DEFAULT_DIMENSION,
        }
    }

    /// Attach a document identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the coordinate dimension (2 or 3).
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Validate and convert the flat coordinate list into closed 3D points.
    ///
    /// An open ring is closed by repeating its first point. The result
    /// always has at least [`MIN_RING_POINTS`] entries.
    pub fn points(&self) -> Result<Vec<Point>> {
        if self.coordinates.is_empty() {
            return Err(Error::EmptyRing);
        }
        if self.dimension != 2 && self.dimension != 3 {
            return Err(Error::UnsupportedDimension(self.dimension));
        }
        if self.coordinates.len() % self.dimension != 0 {
            return Err(Error::DimensionMismatch {
                len: self.coordinates.len(),
                dimension: self.dimension,
            });
        }

        let mut points: Vec<Point> = self
            .coordinates
            .chunks_exact(self.dimension)
            .map(|c| {
                let z = if self.dimension == 3 { c[2] } else { 0.0 };
                [c[0], c[1], z]
            })
            .collect();

        if let (Some(first), Some(last)) = (points.first().copied(), points.last()) {
            if first != *last {
                points.push(first);
            }
        }

        if points.len() < MIN_RING_POINTS {
            return Err(Error::TooFewPoints(points.len()));
        }
        Ok(points)
    }
}

/// A planar surface bounded by one exterior and zero or more interior rings.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Polygon {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub exterior: Option<Ring>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub interiors: Vec<Ring>,
}

impl Polygon {
    pub fn new(exterior: Ring) -> Self {
        Self {
            id: None,
            exterior: Some(exterior),
            interiors: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_interior(mut self, ring: Ring) -> Self {
        self.interiors.push(ring);
        self
    }

    /// Number of rings (exterior plus interiors).
    pub fn ring_count(&self) -> usize {
        usize::from(self.exterior.is_some()) + self.interiors.len()
    }
}

/// A geometry slot: either an inline node or a reference to one elsewhere.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum GeometryProperty {
    Inline(Box<GeometryNode>),
    Href(String),
}

impl GeometryProperty {
    pub fn inline(node: GeometryNode) -> Self {
        GeometryProperty::Inline(Box::new(node))
    }

    pub fn href(href: impl Into<String>) -> Self {
        GeometryProperty::Href(href.into())
    }
}

impl From<GeometryNode> for GeometryProperty {
    fn from(node: GeometryNode) -> Self {
        GeometryProperty::inline(node)
    }
}

/// Orientation wrapper around another surface. Holds no shape of its own.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrientableSurface {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub orientation: Orientation,
    pub base: GeometryProperty,
}

impl OrientableSurface {
    pub fn new(orientation: Orientation, base: impl Into<GeometryProperty>) -> Self {
        Self {
            id: None,
            orientation,
            base: base.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Members of a composite, multi or patch-based aggregate.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aggregate {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub members: Vec<GeometryProperty>,
}

impl Aggregate {
    pub fn new<I, P>(members: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<GeometryProperty>,
    {
        Self {
            id: None,
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A volume bounded by an exterior shell. Interior shells (cavities) are
/// carried so they can be reported, not stored.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Solid {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub exterior: Option<GeometryProperty>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub interiors: Vec<GeometryProperty>,
}

impl Solid {
    pub fn new(exterior: impl Into<GeometryProperty>) -> Self {
        Self {
            id: None,
            exterior: Some(exterior.into()),
            interiors: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// One node of a GML geometry tree.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
pub enum GeometryNode {
    LinearRing(Ring),
    Polygon(Polygon),
    OrientableSurface(OrientableSurface),
    TexturedSurface(OrientableSurface),
    CompositeSurface(Aggregate),
    /// `gml:Surface` with polygon patches.
    Surface(Aggregate),
    TriangulatedSurface(Aggregate),
    Tin(Aggregate),
    Solid(Solid),
    CompositeSolid(Aggregate),
    MultiSurface(Aggregate),
    MultiSolid(Aggregate),
    MultiPolygon(Aggregate),
    GeometricComplex(Aggregate),
    /// Anything the parser could not map onto a supported type.
    Unsupported {
        #[cfg_attr(feature = "serde", serde(default))]
        id: Option<String>,
        type_name: String,
    },
}

impl GeometryNode {
    /// Document identifier of this node, if any.
    pub fn id(&self) -> Option<&str> {
        match self {
            GeometryNode::LinearRing(r) => r.id.as_deref(),
            GeometryNode::Polygon(p) => p.id.as_deref(),
            GeometryNode::OrientableSurface(o) | GeometryNode::TexturedSurface(o) => {
                o.id.as_deref()
            }
            GeometryNode::Solid(s) => s.id.as_deref(),
            GeometryNode::CompositeSurface(a)
            | GeometryNode::Surface(a)
            | GeometryNode::TriangulatedSurface(a)
            | GeometryNode::Tin(a)
            | GeometryNode::CompositeSolid(a)
            | GeometryNode::MultiSurface(a)
            | GeometryNode::MultiSolid(a)
            | GeometryNode::MultiPolygon(a)
            | GeometryNode::GeometricComplex(a) => a.id.as_deref(),
            GeometryNode::Unsupported { id, .. } => id.as_deref(),
        }
    }

    /// GML element name of this node.
    pub fn type_name(&self) -> &str {
        match self {
            GeometryNode::LinearRing(_) => "LinearRing",
            GeometryNode::Polygon(_) => "Polygon",
            GeometryNode::OrientableSurface(_) => "OrientableSurface",
            GeometryNode::TexturedSurface(_) => "TexturedSurface",
            GeometryNode::CompositeSurface(_) => "CompositeSurface",
            GeometryNode::Surface(_) => "Surface",
            GeometryNode::TriangulatedSurface(_) => "TriangulatedSurface",
            GeometryNode::Tin(_) => "Tin",
            GeometryNode::Solid(_) => "Solid",
            GeometryNode::CompositeSolid(_) => "CompositeSolid",
            GeometryNode::MultiSurface(_) => "MultiSurface",
            GeometryNode::MultiSolid(_) => "MultiSolid",
            GeometryNode::MultiPolygon(_) => "MultiPolygon",
            GeometryNode::GeometricComplex(_) => "GeometricComplex",
            GeometryNode::Unsupported { type_name, .. } => type_name,
        }
    }

    /// Leaf nodes carry coordinates directly.
    #[inline]
    pub fn is_primitive(&self) -> bool {
        matches!(self, GeometryNode::LinearRing(_) | GeometryNode::Polygon(_))
    }
}

impl From<Polygon> for GeometryNode {
    fn from(p: Polygon) -> Self {
        GeometryNode::Polygon(p)
    }
}

impl From<Solid> for GeometryNode {
    fn from(s: Solid) -> Self {
        GeometryNode::Solid(s)
    }
}

impl From<Polygon> for GeometryProperty {
    fn from(p: Polygon) -> Self {
        GeometryProperty::inline(GeometryNode::Polygon(p))
    }
}
