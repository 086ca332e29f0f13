// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! City objects: the top-level features of a CityGML document.
//!
//! Only the attributes that end up in storage are modelled. Geometry
//! properties are [`GeometryProperty`] values so that every slot can be an
//! inline tree or an href to geometry owned by another feature.

use crate::appearance::Appearance;
use crate::geometry::GeometryProperty;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Attributes shared by every city object.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CityObjectHeader {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub external_references: Vec<ExternalReference>,
    pub generic_attributes: Vec<GenericAttribute>,
    pub appearances: Vec<Appearance>,
}

impl CityObjectHeader {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }
}

/// Link to an object in an external information system.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExternalReference {
    pub information_system: Option<String>,
    pub name: Option<String>,
    pub uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GenericAttribute {
    pub name: String,
    pub value: GenericValue,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum GenericValue {
    String(String),
    Int(i64),
    Double(f64),
    Uri(String),
    Date(String),
    Measure { value: f64, uom: Option<String> },
    Geometry(GeometryProperty),
}

/// Postal address, inline or shared by href.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Address {
    pub id: Option<String>,
    pub street: Option<String>,
    pub house_number: Option<String>,
    pub po_box: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AddressProperty {
    Inline(Address),
    Href(String),
}

/// Prototype geometry placed by a transformation matrix and anchor point.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ImplicitGeometry {
    pub mime_type: Option<String>,
    /// URI of an external library object (e.g. a COLLADA model).
    pub library_object: Option<String>,
    pub relative_geometry: Option<GeometryProperty>,
    /// Row-major 4x4 matrix.
    pub transformation_matrix: Option<[f64; 16]>,
    pub reference_point: Option<[f64; 3]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ThematicSurfaceType {
    RoofSurface,
    WallSurface,
    GroundSurface,
    ClosureSurface,
    OuterCeilingSurface,
    OuterFloorSurface,
    FloorSurface,
    InteriorWallSurface,
    CeilingSurface,
}

impl ThematicSurfaceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThematicSurfaceType::RoofSurface => "RoofSurface",
            ThematicSurfaceType::WallSurface => "WallSurface",
            ThematicSurfaceType::GroundSurface => "GroundSurface",
            ThematicSurfaceType::ClosureSurface => "ClosureSurface",
            ThematicSurfaceType::OuterCeilingSurface => "OuterCeilingSurface",
            ThematicSurfaceType::OuterFloorSurface => "OuterFloorSurface",
            ThematicSurfaceType::FloorSurface => "FloorSurface",
            ThematicSurfaceType::InteriorWallSurface => "InteriorWallSurface",
            ThematicSurfaceType::CeilingSurface => "CeilingSurface",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OpeningType {
    Window,
    Door,
}

impl OpeningType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpeningType::Window => "Window",
            OpeningType::Door => "Door",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Opening {
    #[cfg_attr(feature = "serde", serde(default))]
    pub header: CityObjectHeader,
    pub opening_type: OpeningType,
    #[cfg_attr(feature = "serde", serde(default))]
    pub lod3_multi_surface: Option<GeometryProperty>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub lod4_multi_surface: Option<GeometryProperty>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub lod3_implicit: Option<ImplicitGeometry>,
    /// Door addresses.
    #[cfg_attr(feature = "serde", serde(default))]
    pub addresses: Vec<AddressProperty>,
}

/// Openings can be shared between the two boundary surfaces they pierce.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum OpeningProperty {
    Inline(Opening),
    Href(String),
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundarySurface {
    #[cfg_attr(feature = "serde", serde(default))]
    pub header: CityObjectHeader,
    pub surface_type: ThematicSurfaceType,
    #[cfg_attr(feature = "serde", serde(default))]
    pub lod2_multi_surface: Option<GeometryProperty>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub lod3_multi_surface: Option<GeometryProperty>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub lod4_multi_surface: Option<GeometryProperty>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub openings: Vec<OpeningProperty>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Room {
    pub header: CityObjectHeader,
    pub class: Option<String>,
    pub function: Option<String>,
    pub lod4_solid: Option<GeometryProperty>,
    pub lod4_multi_surface: Option<GeometryProperty>,
    pub boundary_surfaces: Vec<BoundarySurface>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Building {
    pub header: CityObjectHeader,
    pub class: Option<String>,
    pub function: Option<String>,
    pub usage: Option<String>,
    pub year_of_construction: Option<i32>,
    pub roof_type: Option<String>,
    pub measured_height: Option<f64>,
    pub storeys_above_ground: Option<u32>,
    pub lod1_solid: Option<GeometryProperty>,
    pub lod2_solid: Option<GeometryProperty>,
    pub lod3_solid: Option<GeometryProperty>,
    pub lod2_multi_surface: Option<GeometryProperty>,
    pub lod3_multi_surface: Option<GeometryProperty>,
    pub lod4_multi_surface: Option<GeometryProperty>,
    pub boundary_surfaces: Vec<BoundarySurface>,
    pub rooms: Vec<Room>,
    /// Building parts, stored as buildings below this one.
    pub parts: Vec<Building>,
    pub addresses: Vec<AddressProperty>,
}

/// TIN-based relief component.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TinRelief {
    pub header: CityObjectHeader,
    pub lod: u8,
    pub tin: Option<GeometryProperty>,
    pub max_length: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReliefFeature {
    pub header: CityObjectHeader,
    pub lod: u8,
    pub components: Vec<TinRelief>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolitaryVegetationObject {
    pub header: CityObjectHeader,
    pub class: Option<String>,
    pub species: Option<String>,
    pub height: Option<f64>,
    pub lod2_geometry: Option<GeometryProperty>,
    pub lod2_implicit: Option<ImplicitGeometry>,
}

/// A top-level feature of a city model.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
pub enum CityObject {
    Building(Building),
    ReliefFeature(ReliefFeature),
    SolitaryVegetationObject(SolitaryVegetationObject),
}

impl CityObject {
    pub fn header(&self) -> &CityObjectHeader {
        match self {
            CityObject::Building(b) => &b.header,
            CityObject::ReliefFeature(r) => &r.header,
            CityObject::SolitaryVegetationObject(v) => &v.header,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.header().id.as_deref()
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            CityObject::Building(_) => "Building",
            CityObject::ReliefFeature(_) => "ReliefFeature",
            CityObject::SolitaryVegetationObject(_) => "SolitaryVegetationObject",
        }
    }
}

/// A whole parsed document.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CityModel {
    pub features: Vec<CityObject>,
    /// Model-level appearances not owned by any feature.
    pub appearances: Vec<Appearance>,
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;
    use crate::geometry::GeometryNode;

    #[test]
    fn deserializes_building_with_href_geometry() {
        let json = r##"{
            "features": [{
                "type": "Building",
                "header": { "id": "bldg-1" },
                "lod2_solid": { "inline": {
                    "type": "Solid",
                    "exterior": { "href": "#shell-1" }
                }},
                "addresses": [{ "href": "#addr-1" }]
            }]
        }"##;

        let model: CityModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.features.len(), 1);
        let CityObject::Building(building) = &model.features[0] else {
            panic!("expected building");
        };
        assert_eq!(building.header.id.as_deref(), Some("bldg-1"));
        match building.lod2_solid.as_ref() {
            Some(GeometryProperty::Inline(node)) => match node.as_ref() {
                GeometryNode::Solid(solid) => assert_eq!(
                    solid.exterior,
                    Some(GeometryProperty::Href("#shell-1".into()))
                ),
                other => panic!("unexpected node {other:?}"),
            },
            other => panic!("unexpected property {other:?}"),
        }
    }
}
