// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Appearances and their surface data.
//!
//! Every link between surface data and the geometry it decorates is
//! deferred: targets are polygon or ring ids that may appear anywhere in
//! the document.

use crate::context::ImportContext;
use crate::error::Result;
use crate::identity::IdentityEntry;
use crate::ids::{Sequence, SurrogateId};
use crate::kind::ImporterKind;
use crate::rows::{AppearanceRow, AppearanceToSurfaceDataRow, Row, SurfaceDataRow};
use crate::xlink::{DeferredReferenceTask, LinkRowKind, TextureParamLink};
use citydb_lite_core::{Appearance, SurfaceData, SurfaceDataProperty, TextureParameterization};

const SURFACE_LEVEL: TextureParamLink = TextureParamLink {
    is_texture_parametrization: false,
    world_to_texture: None,
};

/// Store an appearance. `owner` is `None` for model-level appearances.
pub(crate) fn import_appearance(
    ctx: &mut ImportContext,
    appearance: &Appearance,
    owner: Option<SurrogateId>,
) -> Result<SurrogateId> {
    let id = ctx.next_id(Sequence::Appearance)?;
    let gmlid = appearance.id.clone().unwrap_or_else(|| ctx.generate_id());
    ctx.add_row(Row::Appearance(AppearanceRow {
        id,
        gmlid,
        theme: appearance.theme.clone(),
        city_object_id: owner,
    }))?;

    for property in &appearance.surface_data {
        match property {
            SurfaceDataProperty::Inline(data) => {
                let surface_data_id = import_surface_data(ctx, data)?;
                ctx.add_row(Row::AppearanceToSurfaceData(AppearanceToSurfaceDataRow {
                    appearance_id: id,
                    surface_data_id,
                }))?;
            }
            SurfaceDataProperty::Href(href) => {
                ctx.defer(DeferredReferenceTask::link(
                    LinkRowKind::AppearanceToSurfaceData,
                    id,
                    href,
                ))?;
            }
        }
    }
    Ok(id)
}

fn import_surface_data(ctx: &mut ImportContext, data: &SurfaceData) -> Result<SurrogateId> {
    let id = ctx.next_id(Sequence::SurfaceData)?;
    let mut row = SurfaceDataRow {
        id,
        gmlid: data.id().map_or_else(|| ctx.generate_id(), str::to_string),
        object_class: data.type_name(),
        ..Default::default()
    };
    let mut tasks = Vec::new();

    match data {
        SurfaceData::X3DMaterial(material) => {
            row.is_front = material.is_front;
            row.x3d_diffuse_color = material.diffuse_color;
            row.x3d_transparency = material.transparency;
            tasks.extend(
                material
                    .targets
                    .iter()
                    .map(|target| DeferredReferenceTask::texture_param(id, target, SURFACE_LEVEL)),
            );
        }
        SurfaceData::ParameterizedTexture(texture) => {
            row.is_front = texture.is_front;
            row.tex_image_uri = Some(texture.image_uri.clone());
            row.tex_mime_type = texture.mime_type.clone();
            for target in &texture.targets {
                match &target.parameterization {
                    TextureParameterization::WorldToTexture(matrix) => {
                        tasks.push(DeferredReferenceTask::texture_param(
                            id,
                            &target.uri,
                            TextureParamLink {
                                is_texture_parametrization: true,
                                world_to_texture: Some(*matrix),
                            },
                        ));
                    }
                    // addressed by ring, assembled per polygon
                    TextureParameterization::Coordinates(lists) => {
                        tasks.extend(lists.iter().map(|list| {
                            DeferredReferenceTask::texture_coordinates(
                                id,
                                &list.ring,
                                list.coordinates.clone(),
                            )
                        }));
                    }
                }
            }
        }
        SurfaceData::GeoreferencedTexture(texture) => {
            row.is_front = texture.is_front;
            row.tex_image_uri = Some(texture.image_uri.clone());
            row.gt_reference_point = texture.reference_point;
            row.gt_orientation = texture.orientation;
            tasks.extend(
                texture
                    .targets
                    .iter()
                    .map(|target| DeferredReferenceTask::texture_param(id, target, SURFACE_LEVEL)),
            );
        }
    }

    ctx.add_row(Row::SurfaceData(row))?;
    if let Some(gmlid) = data.id() {
        ctx.register(IdentityEntry::resolved(gmlid, id, id, ImporterKind::SurfaceData));
    }
    for task in tasks {
        ctx.defer(task)?;
    }
    Ok(id)
}
