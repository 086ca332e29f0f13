// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Storage rows
//!
//! One struct per importer kind. Foreign keys to other rows are
//! [`SurrogateId`]s; the ones that may be filled in later by the reference
//! resolver are addressable through [`Column`].

use crate::codec::SpatialGeometry;
use crate::ids::SurrogateId;
use crate::kind::ImporterKind;
use serde::Serialize;

/// A foreign-key column the reference resolver can patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Lod1Solid,
    Lod2Solid,
    Lod3Solid,
    Lod4Solid,
    Lod2MultiSurface,
    Lod3MultiSurface,
    Lod4MultiSurface,
    Lod2Geometry,
    Lod2ImplicitRep,
    Lod3ImplicitRep,
    Tin,
    RelativeGeometry,
    Address,
    GeometryValue,
}

impl Column {
    /// Storage column name.
    pub fn as_str(self) -> &'static str {
        match self {
            Column::Lod1Solid => "lod1_solid_id",
            Column::Lod2Solid => "lod2_solid_id",
            Column::Lod3Solid => "lod3_solid_id",
            Column::Lod4Solid => "lod4_solid_id",
            Column::Lod2MultiSurface => "lod2_multi_surface_id",
            Column::Lod3MultiSurface => "lod3_multi_surface_id",
            Column::Lod4MultiSurface => "lod4_multi_surface_id",
            Column::Lod2Geometry => "lod2_other_geom_id",
            Column::Lod2ImplicitRep => "lod2_implicit_rep_id",
            Column::Lod3ImplicitRep => "lod3_implicit_rep_id",
            Column::Tin => "tin_id",
            Column::RelativeGeometry => "relative_brep_id",
            Column::Address => "address_id",
            Column::GeometryValue => "geomval_id",
        }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deferred update of one column of an already written row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Patch {
    pub kind: ImporterKind,
    pub id: SurrogateId,
    pub column: Column,
    pub value: SurrogateId,
}

/// One node of a stored geometry tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SurfaceGeometryRecord {
    pub id: SurrogateId,
    pub external_id: Option<String>,
    pub parent_id: Option<SurrogateId>,
    pub root_id: SurrogateId,
    pub is_solid: bool,
    pub is_composite: bool,
    pub is_triangulated: bool,
    pub is_xlink: bool,
    pub is_reverse: bool,
    /// Geometry this placeholder stands in for.
    pub xlink_target: Option<SurrogateId>,
    pub payload: Option<SpatialGeometry>,
    pub city_object_id: Option<SurrogateId>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ImplicitGeometryRow {
    pub id: SurrogateId,
    pub mime_type: Option<String>,
    pub library_uri: Option<String>,
    pub relative_geometry_id: Option<SurrogateId>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CityObjectRow {
    pub id: SurrogateId,
    pub object_class: String,
    pub gmlid: String,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ExternalReferenceRow {
    pub id: SurrogateId,
    pub city_object_id: SurrogateId,
    pub information_system: Option<String>,
    pub name: Option<String>,
    pub uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GenericAttributeRow {
    pub id: SurrogateId,
    pub city_object_id: SurrogateId,
    pub name: String,
    pub data_type: &'static str,
    pub str_value: Option<String>,
    pub int_value: Option<i64>,
    pub real_value: Option<f64>,
    pub uri_value: Option<String>,
    pub date_value: Option<String>,
    pub unit: Option<String>,
    pub geometry_id: Option<SurrogateId>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AddressRow {
    pub id: SurrogateId,
    pub gmlid: String,
    pub street: Option<String>,
    pub house_number: Option<String>,
    pub po_box: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BuildingRow {
    pub id: SurrogateId,
    /// Enclosing building for building parts.
    pub parent_id: Option<SurrogateId>,
    pub root_id: SurrogateId,
    pub class: Option<String>,
    pub function: Option<String>,
    pub usage: Option<String>,
    pub year_of_construction: Option<i32>,
    pub roof_type: Option<String>,
    pub measured_height: Option<f64>,
    pub storeys_above_ground: Option<u32>,
    pub lod1_solid_id: Option<SurrogateId>,
    pub lod2_solid_id: Option<SurrogateId>,
    pub lod3_solid_id: Option<SurrogateId>,
    pub lod2_multi_surface_id: Option<SurrogateId>,
    pub lod3_multi_surface_id: Option<SurrogateId>,
    pub lod4_multi_surface_id: Option<SurrogateId>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RoomRow {
    pub id: SurrogateId,
    pub building_id: SurrogateId,
    pub class: Option<String>,
    pub function: Option<String>,
    pub lod4_solid_id: Option<SurrogateId>,
    pub lod4_multi_surface_id: Option<SurrogateId>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ThematicSurfaceRow {
    pub id: SurrogateId,
    pub object_class: &'static str,
    pub building_id: Option<SurrogateId>,
    pub room_id: Option<SurrogateId>,
    pub lod2_multi_surface_id: Option<SurrogateId>,
    pub lod3_multi_surface_id: Option<SurrogateId>,
    pub lod4_multi_surface_id: Option<SurrogateId>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct OpeningRow {
    pub id: SurrogateId,
    pub object_class: &'static str,
    pub address_id: Option<SurrogateId>,
    pub lod3_multi_surface_id: Option<SurrogateId>,
    pub lod4_multi_surface_id: Option<SurrogateId>,
    pub lod3_implicit_rep_id: Option<SurrogateId>,
    pub lod3_implicit_ref_point: Option<[f64; 3]>,
    pub lod3_implicit_transformation: Option<[f64; 16]>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct OpeningToThematicSurfaceRow {
    pub opening_id: SurrogateId,
    pub thematic_surface_id: SurrogateId,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AddressToBuildingRow {
    pub building_id: SurrogateId,
    pub address_id: SurrogateId,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AppearanceRow {
    pub id: SurrogateId,
    pub gmlid: String,
    pub theme: Option<String>,
    /// `None` for model-level appearances.
    pub city_object_id: Option<SurrogateId>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SurfaceDataRow {
    pub id: SurrogateId,
    pub gmlid: String,
    pub object_class: &'static str,
    pub is_front: bool,
    pub x3d_diffuse_color: Option<[f64; 3]>,
    pub x3d_transparency: Option<f64>,
    pub tex_image_uri: Option<String>,
    pub tex_mime_type: Option<String>,
    pub gt_reference_point: Option<[f64; 2]>,
    pub gt_orientation: Option<[f64; 4]>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AppearanceToSurfaceDataRow {
    pub appearance_id: SurrogateId,
    pub surface_data_id: SurrogateId,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TextureParamRow {
    pub surface_geometry_id: SurrogateId,
    pub surface_data_id: SurrogateId,
    pub is_texture_parametrization: bool,
    /// Row-major 3x4 matrix.
    pub world_to_texture: Option<[f64; 12]>,
    /// One `s t s t ...` list per ring, in stored ring order.
    pub texture_coordinates: Option<Vec<Vec<f64>>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ReliefFeatureRow {
    pub id: SurrogateId,
    pub lod: u8,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ReliefComponentRow {
    pub id: SurrogateId,
    pub object_class: &'static str,
    pub lod: u8,
    pub max_length: Option<f64>,
    pub tin_id: Option<SurrogateId>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ReliefFeatureToComponentRow {
    pub relief_feature_id: SurrogateId,
    pub relief_component_id: SurrogateId,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SolitaryVegetationRow {
    pub id: SurrogateId,
    pub class: Option<String>,
    pub species: Option<String>,
    pub height: Option<f64>,
    pub lod2_other_geom_id: Option<SurrogateId>,
    pub lod2_implicit_rep_id: Option<SurrogateId>,
    pub lod2_implicit_ref_point: Option<[f64; 3]>,
    pub lod2_implicit_transformation: Option<[f64; 16]>,
}

/// Generates `reference` / `reference_mut` for the patchable columns of a
/// row struct.
macro_rules! reference_columns {
    ($row:ty { $($column:ident => $field:ident),* $(,)? }) => {
        impl $row {
            /// Current value of a patchable column, `None` if unset or not
            /// a column of this row.
            #[allow(unreachable_patterns)]
            pub fn reference(&self, column: Column) -> Option<SurrogateId> {
                match column {
                    $(Column::$column => self.$field,)*
                    _ => None,
                }
            }

            #[allow(unreachable_patterns)]
            fn reference_mut(&mut self, column: Column) -> Option<&mut Option<SurrogateId>> {
                match column {
                    $(Column::$column => Some(&mut self.$field),)*
                    _ => None,
                }
            }
        }
    };
}

reference_columns!(SurfaceGeometryRecord {});
reference_columns!(ImplicitGeometryRow { RelativeGeometry => relative_geometry_id });
reference_columns!(CityObjectRow {});
reference_columns!(ExternalReferenceRow {});
reference_columns!(GenericAttributeRow { GeometryValue => geometry_id });
reference_columns!(AddressRow {});
reference_columns!(BuildingRow {
    Lod1Solid => lod1_solid_id,
    Lod2Solid => lod2_solid_id,
    Lod3Solid => lod3_solid_id,
    Lod2MultiSurface => lod2_multi_surface_id,
    Lod3MultiSurface => lod3_multi_surface_id,
    Lod4MultiSurface => lod4_multi_surface_id,
});
reference_columns!(RoomRow {
    Lod4Solid => lod4_solid_id,
    Lod4MultiSurface => lod4_multi_surface_id,
});
reference_columns!(ThematicSurfaceRow {
    Lod2MultiSurface => lod2_multi_surface_id,
    Lod3MultiSurface => lod3_multi_surface_id,
    Lod4MultiSurface => lod4_multi_surface_id,
});
reference_columns!(OpeningRow {
    Address => address_id,
    Lod3MultiSurface => lod3_multi_surface_id,
    Lod4MultiSurface => lod4_multi_surface_id,
    Lod3ImplicitRep => lod3_implicit_rep_id,
});
reference_columns!(OpeningToThematicSurfaceRow {});
reference_columns!(AddressToBuildingRow {});
reference_columns!(AppearanceRow {});
reference_columns!(SurfaceDataRow {});
reference_columns!(AppearanceToSurfaceDataRow {});
reference_columns!(TextureParamRow {});
reference_columns!(ReliefFeatureRow {});
reference_columns!(ReliefComponentRow { Tin => tin_id });
reference_columns!(ReliefFeatureToComponentRow {});
reference_columns!(SolitaryVegetationRow {
    Lod2Geometry => lod2_other_geom_id,
    Lod2ImplicitRep => lod2_implicit_rep_id,
});

/// A row of any importer kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Row {
    SurfaceGeometry(SurfaceGeometryRecord),
    ImplicitGeometry(ImplicitGeometryRow),
    CityObject(CityObjectRow),
    ExternalReference(ExternalReferenceRow),
    GenericAttribute(GenericAttributeRow),
    Address(AddressRow),
    Building(BuildingRow),
    Room(RoomRow),
    ThematicSurface(ThematicSurfaceRow),
    Opening(OpeningRow),
    OpeningToThematicSurface(OpeningToThematicSurfaceRow),
    AddressToBuilding(AddressToBuildingRow),
    Appearance(AppearanceRow),
    SurfaceData(SurfaceDataRow),
    AppearanceToSurfaceData(AppearanceToSurfaceDataRow),
    TextureParam(TextureParamRow),
    ReliefFeature(ReliefFeatureRow),
    ReliefComponent(ReliefComponentRow),
    ReliefFeatureToComponent(ReliefFeatureToComponentRow),
    SolitaryVegetation(SolitaryVegetationRow),
}

/// Applies `$body` to the inner struct of every variant.
macro_rules! each_row {
    ($row:expr, $inner:ident => $body:expr) => {
        match $row {
            Row::SurfaceGeometry($inner) => $body,
            Row::ImplicitGeometry($inner) => $body,
            Row::CityObject($inner) => $body,
            Row::ExternalReference($inner) => $body,
            Row::GenericAttribute($inner) => $body,
            Row::Address($inner) => $body,
            Row::Building($inner) => $body,
            Row::Room($inner) => $body,
            Row::ThematicSurface($inner) => $body,
            Row::Opening($inner) => $body,
            Row::OpeningToThematicSurface($inner) => $body,
            Row::AddressToBuilding($inner) => $body,
            Row::Appearance($inner) => $body,
            Row::SurfaceData($inner) => $body,
            Row::AppearanceToSurfaceData($inner) => $body,
            Row::TextureParam($inner) => $body,
            Row::ReliefFeature($inner) => $body,
            Row::ReliefComponent($inner) => $body,
            Row::ReliefFeatureToComponent($inner) => $body,
            Row::SolitaryVegetation($inner) => $body,
        }
    };
}

impl Row {
    pub fn kind(&self) -> ImporterKind {
        match self {
            Row::SurfaceGeometry(_) => ImporterKind::SurfaceGeometry,
            Row::ImplicitGeometry(_) => ImporterKind::ImplicitGeometry,
            Row::CityObject(_) => ImporterKind::CityObject,
            Row::ExternalReference(_) => ImporterKind::ExternalReference,
            Row::GenericAttribute(_) => ImporterKind::GenericAttribute,
            Row::Address(_) => ImporterKind::Address,
            Row::Building(_) => ImporterKind::Building,
            Row::Room(_) => ImporterKind::Room,
            Row::ThematicSurface(_) => ImporterKind::ThematicSurface,
            Row::Opening(_) => ImporterKind::Opening,
            Row::OpeningToThematicSurface(_) => ImporterKind::OpeningToThematicSurface,
            Row::AddressToBuilding(_) => ImporterKind::AddressToBuilding,
            Row::Appearance(_) => ImporterKind::Appearance,
            Row::SurfaceData(_) => ImporterKind::SurfaceData,
            Row::AppearanceToSurfaceData(_) => ImporterKind::AppearanceToSurfaceData,
            Row::TextureParam(_) => ImporterKind::TextureParam,
            Row::ReliefFeature(_) => ImporterKind::ReliefFeature,
            Row::ReliefComponent(_) => ImporterKind::ReliefComponent,
            Row::ReliefFeatureToComponent(_) => ImporterKind::ReliefFeatureToComponent,
            Row::SolitaryVegetation(_) => ImporterKind::SolitaryVegetation,
        }
    }

    /// Primary key, `None` for link tables and texture parameters.
    pub fn id(&self) -> Option<SurrogateId> {
        match self {
            Row::SurfaceGeometry(r) => Some(r.id),
            Row::ImplicitGeometry(r) => Some(r.id),
            Row::CityObject(r) => Some(r.id),
            Row::ExternalReference(r) => Some(r.id),
            Row::GenericAttribute(r) => Some(r.id),
            Row::Address(r) => Some(r.id),
            Row::Building(r) => Some(r.id),
            Row::Room(r) => Some(r.id),
            Row::ThematicSurface(r) => Some(r.id),
            Row::Opening(r) => Some(r.id),
            Row::Appearance(r) => Some(r.id),
            Row::SurfaceData(r) => Some(r.id),
            Row::ReliefFeature(r) => Some(r.id),
            Row::ReliefComponent(r) => Some(r.id),
            Row::SolitaryVegetation(r) => Some(r.id),
            Row::OpeningToThematicSurface(_)
            | Row::AddressToBuilding(_)
            | Row::AppearanceToSurfaceData(_)
            | Row::TextureParam(_)
            | Row::ReliefFeatureToComponent(_) => None,
        }
    }

    pub fn reference(&self, column: Column) -> Option<SurrogateId> {
        each_row!(self, r => r.reference(column))
    }

    /// Apply a patch to this row. Returns `false` if the row has no such
    /// column.
    pub fn apply(&mut self, column: Column, value: SurrogateId) -> bool {
        match each_row!(self, r => r.reference_mut(column)) {
            Some(slot) => {
                *slot = Some(value);
                true
            }
            None => false,
        }
    }

    pub fn as_surface_geometry(&self) -> Option<&SurfaceGeometryRecord> {
        match self {
            Row::SurfaceGeometry(r) => Some(r),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_applies_to_declared_column_only() {
        let mut row = Row::Building(BuildingRow {
            id: SurrogateId::new(7),
            root_id: SurrogateId::new(7),
            ..Default::default()
        });

        assert!(row.apply(Column::Lod2Solid, SurrogateId::new(42)));
        assert_eq!(row.reference(Column::Lod2Solid), Some(SurrogateId::new(42)));
        assert!(!row.apply(Column::Tin, SurrogateId::new(1)));
        assert_eq!(row.reference(Column::Tin), None);
    }

    #[test]
    fn link_rows_have_no_primary_key() {
        let row = Row::AddressToBuilding(AddressToBuildingRow::default());
        assert_eq!(row.id(), None);
        assert_eq!(row.kind(), ImporterKind::AddressToBuilding);
    }
}
