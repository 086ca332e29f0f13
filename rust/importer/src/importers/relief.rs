// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::city_object::{geometry_property, import_city_object};
use super::FeatureImporter;
use crate::context::ImportContext;
use crate::error::Result;
use crate::ids::SurrogateId;
use crate::kind::ImporterKind;
use crate::rows::{Column, ReliefComponentRow, ReliefFeatureRow, ReliefFeatureToComponentRow, Row};
use citydb_lite_core::{CityObject, ReliefFeature, TinRelief};

/// Relief features and their TIN components.
pub struct ReliefImporter;

impl FeatureImporter for ReliefImporter {
    fn import(&self, feature: &CityObject, ctx: &mut ImportContext) -> Result<Option<SurrogateId>> {
        match feature {
            CityObject::ReliefFeature(relief) => import_relief(ctx, relief).map(Some),
            _ => Ok(None),
        }
    }

    fn supported_types(&self) -> &'static [&'static str] {
        &["ReliefFeature"]
    }
}

fn import_relief(ctx: &mut ImportContext, relief: &ReliefFeature) -> Result<SurrogateId> {
    let id = import_city_object(ctx, &relief.header, "ReliefFeature", ImporterKind::ReliefFeature)?;
    ctx.add_row(Row::ReliefFeature(ReliefFeatureRow { id, lod: relief.lod }))?;

    for component in &relief.components {
        let component_id = import_tin(ctx, component)?;
        ctx.add_row(Row::ReliefFeatureToComponent(ReliefFeatureToComponentRow {
            relief_feature_id: id,
            relief_component_id: component_id,
        }))?;
    }
    Ok(id)
}

fn import_tin(ctx: &mut ImportContext, tin: &TinRelief) -> Result<SurrogateId> {
    let id = import_city_object(ctx, &tin.header, "TINRelief", ImporterKind::ReliefComponent)?;
    let tin_id = geometry_property(
        ctx,
        tin.tin.as_ref(),
        Some(id),
        id,
        ImporterKind::ReliefComponent,
        Column::Tin,
    )?;
    ctx.add_row(Row::ReliefComponent(ReliefComponentRow {
        id,
        object_class: "TINRelief",
        lod: tin.lod,
        max_length: tin.max_length,
        tin_id,
    }))?;
    Ok(id)
}
