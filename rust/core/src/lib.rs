// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # CityDB-Lite Core
//!
//! Parsed CityGML document model consumed by the importer.
//!
//! ## Overview
//!
//! - **Geometry**: a closed [`GeometryNode`] tagged union covering rings,
//!   polygons, orientation wrappers and every GML aggregate the importer
//!   stores. Geometry slots are [`GeometryProperty`] values, either inline
//!   or an `xlink:href`.
//! - **Features**: [`CityObject`] (buildings with rooms, boundary surfaces,
//!   openings and addresses; relief features; solitary vegetation).
//! - **Appearances**: materials and textures together with their target
//!   hrefs.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable (de)serialization of the document model

pub mod appearance;
pub mod error;
pub mod feature;
pub mod geometry;
pub mod href;

pub use appearance::{
    Appearance, GeoreferencedTexture, ParameterizedTexture, SurfaceData, SurfaceDataProperty,
    TexCoordList, TextureParameterization, TextureTarget, X3DMaterial,
};
pub use error::{Error, Result};
pub use feature::{
    Address, AddressProperty, BoundarySurface, Building, CityModel, CityObject, CityObjectHeader,
    ExternalReference, GenericAttribute, GenericValue, ImplicitGeometry, Opening, OpeningProperty,
    OpeningType, ReliefFeature, Room, SolitaryVegetationObject, ThematicSurfaceType, TinRelief,
};
pub use geometry::{
    Aggregate, GeometryNode, GeometryProperty, Orientation, OrientableSurface, Point, Polygon,
    Ring, Solid, DEFAULT_DIMENSION, MIN_RING_POINTS,
};
pub use href::{is_local_href, normalize_href};
