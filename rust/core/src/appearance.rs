// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Appearance model: themes, materials and textures with their targets.
//!
//! Targets are always hrefs into the geometry tree. Texture coordinates
//! target individual rings, everything else targets surfaces.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A themed collection of surface data.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Appearance {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub theme: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub surface_data: Vec<SurfaceDataProperty>,
}

/// Surface data embedded in an appearance or shared from another one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SurfaceDataProperty {
    Inline(SurfaceData),
    Href(String),
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
pub enum SurfaceData {
    X3DMaterial(X3DMaterial),
    ParameterizedTexture(ParameterizedTexture),
    GeoreferencedTexture(GeoreferencedTexture),
}

impl SurfaceData {
    pub fn id(&self) -> Option<&str> {
        match self {
            SurfaceData::X3DMaterial(m) => m.id.as_deref(),
            SurfaceData::ParameterizedTexture(t) => t.id.as_deref(),
            SurfaceData::GeoreferencedTexture(t) => t.id.as_deref(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            SurfaceData::X3DMaterial(_) => "X3DMaterial",
            SurfaceData::ParameterizedTexture(_) => "ParameterizedTexture",
            SurfaceData::GeoreferencedTexture(_) => "GeoreferencedTexture",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct X3DMaterial {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Option<String>,
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub is_front: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub diffuse_color: Option<[f64; 3]>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub transparency: Option<f64>,
    /// Surface hrefs.
    #[cfg_attr(feature = "serde", serde(default))]
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParameterizedTexture {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Option<String>,
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub is_front: bool,
    pub image_uri: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub mime_type: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub targets: Vec<TextureTarget>,
}

/// One surface a parameterized texture is mapped onto.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TextureTarget {
    pub uri: String,
    pub parameterization: TextureParameterization,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TextureParameterization {
    /// Per-ring texture coordinates.
    Coordinates(Vec<TexCoordList>),
    /// Row-major 3x4 world-to-texture matrix.
    WorldToTexture([f64; 12]),
}

/// Texture coordinates for a single ring.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TexCoordList {
    /// Ring href.
    pub ring: String,
    pub coordinates: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeoreferencedTexture {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Option<String>,
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub is_front: bool,
    pub image_uri: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub reference_point: Option<[f64; 2]>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub orientation: Option<[f64; 4]>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub targets: Vec<String>,
}

#[cfg(feature = "serde")]
fn default_true() -> bool {
    true
}
