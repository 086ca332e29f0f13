// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::city_object::{geometry_property, import_city_object};
use super::implicit::import_implicit;
use super::FeatureImporter;
use crate::context::ImportContext;
use crate::error::Result;
use crate::ids::SurrogateId;
use crate::kind::ImporterKind;
use crate::rows::{Column, Row, SolitaryVegetationRow};
use citydb_lite_core::CityObject;

/// Solitary vegetation objects, typically trees placed as implicit
/// geometry.
pub struct VegetationImporter;

impl FeatureImporter for VegetationImporter {
    fn import(&self, feature: &CityObject, ctx: &mut ImportContext) -> Result<Option<SurrogateId>> {
        let CityObject::SolitaryVegetationObject(plant) = feature else {
            return Ok(None);
        };
        let kind = ImporterKind::SolitaryVegetation;
        let id = import_city_object(ctx, &plant.header, "SolitaryVegetationObject", kind)?;

        let mut row = SolitaryVegetationRow {
            id,
            class: plant.class.clone(),
            species: plant.species.clone(),
            height: plant.height,
            lod2_other_geom_id: geometry_property(
                ctx,
                plant.lod2_geometry.as_ref(),
                Some(id),
                id,
                kind,
                Column::Lod2Geometry,
            )?,
            ..Default::default()
        };
        if let Some(implicit) = &plant.lod2_implicit {
            row.lod2_implicit_rep_id = import_implicit(ctx, implicit, kind, id, Column::Lod2ImplicitRep)?;
            row.lod2_implicit_ref_point = implicit.reference_point;
            row.lod2_implicit_transformation = implicit.transformation_matrix;
        }
        ctx.add_row(Row::SolitaryVegetation(row))?;
        Ok(Some(id))
    }

    fn supported_types(&self) -> &'static [&'static str] {
        &["SolitaryVegetationObject"]
    }
}
