// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Buildings, building parts, rooms, boundary surfaces and openings.

use super::city_object::{geometry_property, import_address, import_city_object};
use super::implicit::import_implicit;
use super::FeatureImporter;
use crate::context::ImportContext;
use crate::error::Result;
use crate::ids::SurrogateId;
use crate::kind::ImporterKind;
use crate::report::DiagnosticKind;
use crate::rows::{
    AddressToBuildingRow, BuildingRow, Column, OpeningRow, OpeningToThematicSurfaceRow, RoomRow, Row,
    ThematicSurfaceRow,
};
use crate::xlink::{DeferredReferenceTask, LinkRowKind};
use citydb_lite_core::{
    AddressProperty, BoundarySurface, Building, CityObject, GeometryProperty, Opening,
    OpeningProperty, Room,
};

pub struct BuildingImporter;

impl FeatureImporter for BuildingImporter {
    fn import(&self, feature: &CityObject, ctx: &mut ImportContext) -> Result<Option<SurrogateId>> {
        match feature {
            CityObject::Building(building) => import_building(ctx, building, None).map(Some),
            _ => Ok(None),
        }
    }

    fn supported_types(&self) -> &'static [&'static str] {
        &["Building"]
    }
}

/// `parent` is `(parent_id, root_id)` for building parts.
fn import_building(
    ctx: &mut ImportContext,
    building: &Building,
    parent: Option<(SurrogateId, SurrogateId)>,
) -> Result<SurrogateId> {
    let object_class = if parent.is_some() { "BuildingPart" } else { "Building" };
    let id = import_city_object(ctx, &building.header, object_class, ImporterKind::Building)?;
    let root_id = parent.map_or(id, |(_, root)| root);

    let slot = |ctx: &mut ImportContext, property: Option<&GeometryProperty>, column: Column| {
        geometry_property(ctx, property, Some(id), id, ImporterKind::Building, column)
    };
    let row = BuildingRow {
        id,
        parent_id: parent.map(|(parent_id, _)| parent_id),
        root_id,
        class: building.class.clone(),
        function: building.function.clone(),
        usage: building.usage.clone(),
        year_of_construction: building.year_of_construction,
        roof_type: building.roof_type.clone(),
        measured_height: building.measured_height,
        storeys_above_ground: building.storeys_above_ground,
        lod1_solid_id: slot(ctx, building.lod1_solid.as_ref(), Column::Lod1Solid)?,
        lod2_solid_id: slot(ctx, building.lod2_solid.as_ref(), Column::Lod2Solid)?,
        lod3_solid_id: slot(ctx, building.lod3_solid.as_ref(), Column::Lod3Solid)?,
        lod2_multi_surface_id: slot(ctx, building.lod2_multi_surface.as_ref(), Column::Lod2MultiSurface)?,
        lod3_multi_surface_id: slot(ctx, building.lod3_multi_surface.as_ref(), Column::Lod3MultiSurface)?,
        lod4_multi_surface_id: slot(ctx, building.lod4_multi_surface.as_ref(), Column::Lod4MultiSurface)?,
    };
    ctx.add_row(Row::Building(row))?;

    for surface in &building.boundary_surfaces {
        import_boundary_surface(ctx, surface, Some(id), None)?;
    }
    for room in &building.rooms {
        import_room(ctx, room, id)?;
    }
    for part in &building.parts {
        import_building(ctx, part, Some((id, root_id)))?;
    }

    for address in &building.addresses {
        match address {
            AddressProperty::Inline(address) => {
                let address_id = import_address(ctx, address)?;
                ctx.add_row(Row::AddressToBuilding(AddressToBuildingRow {
                    building_id: id,
                    address_id,
                }))?;
            }
            AddressProperty::Href(href) => {
                ctx.defer(DeferredReferenceTask::link(LinkRowKind::AddressToBuilding, id, href))?;
            }
        }
    }
    Ok(id)
}

fn import_room(ctx: &mut ImportContext, room: &Room, building_id: SurrogateId) -> Result<SurrogateId> {
    let id = import_city_object(ctx, &room.header, "Room", ImporterKind::Room)?;
    let row = RoomRow {
        id,
        building_id,
        class: room.class.clone(),
        function: room.function.clone(),
        lod4_solid_id: geometry_property(
            ctx,
            room.lod4_solid.as_ref(),
            Some(id),
            id,
            ImporterKind::Room,
            Column::Lod4Solid,
        )?,
        lod4_multi_surface_id: geometry_property(
            ctx,
            room.lod4_multi_surface.as_ref(),
            Some(id),
            id,
            ImporterKind::Room,
            Column::Lod4MultiSurface,
        )?,
    };
    ctx.add_row(Row::Room(row))?;

    for surface in &room.boundary_surfaces {
        import_boundary_surface(ctx, surface, None, Some(id))?;
    }
    Ok(id)
}

fn import_boundary_surface(
    ctx: &mut ImportContext,
    surface: &BoundarySurface,
    building_id: Option<SurrogateId>,
    room_id: Option<SurrogateId>,
) -> Result<SurrogateId> {
    let object_class = surface.surface_type.as_str();
    let id = import_city_object(ctx, &surface.header, object_class, ImporterKind::ThematicSurface)?;

    let slot = |ctx: &mut ImportContext, property: Option<&GeometryProperty>, column: Column| {
        geometry_property(ctx, property, Some(id), id, ImporterKind::ThematicSurface, column)
    };
    let row = ThematicSurfaceRow {
        id,
        object_class,
        building_id,
        room_id,
        lod2_multi_surface_id: slot(ctx, surface.lod2_multi_surface.as_ref(), Column::Lod2MultiSurface)?,
        lod3_multi_surface_id: slot(ctx, surface.lod3_multi_surface.as_ref(), Column::Lod3MultiSurface)?,
        lod4_multi_surface_id: slot(ctx, surface.lod4_multi_surface.as_ref(), Column::Lod4MultiSurface)?,
    };
    ctx.add_row(Row::ThematicSurface(row))?;

    for opening in &surface.openings {
        match opening {
            OpeningProperty::Inline(opening) => {
                let opening_id = import_opening(ctx, opening)?;
                ctx.add_row(Row::OpeningToThematicSurface(OpeningToThematicSurfaceRow {
                    opening_id,
                    thematic_surface_id: id,
                }))?;
            }
            OpeningProperty::Href(href) => {
                ctx.defer(DeferredReferenceTask::link(
                    LinkRowKind::OpeningToThematicSurface,
                    id,
                    href,
                ))?;
            }
        }
    }
    Ok(id)
}

fn import_opening(ctx: &mut ImportContext, opening: &Opening) -> Result<SurrogateId> {
    let object_class = opening.opening_type.as_str();
    let id = import_city_object(ctx, &opening.header, object_class, ImporterKind::Opening)?;

    let mut row = OpeningRow {
        id,
        object_class,
        lod3_multi_surface_id: geometry_property(
            ctx,
            opening.lod3_multi_surface.as_ref(),
            Some(id),
            id,
            ImporterKind::Opening,
            Column::Lod3MultiSurface,
        )?,
        lod4_multi_surface_id: geometry_property(
            ctx,
            opening.lod4_multi_surface.as_ref(),
            Some(id),
            id,
            ImporterKind::Opening,
            Column::Lod4MultiSurface,
        )?,
        ..Default::default()
    };

    if let Some(implicit) = &opening.lod3_implicit {
        row.lod3_implicit_rep_id =
            import_implicit(ctx, implicit, ImporterKind::Opening, id, Column::Lod3ImplicitRep)?;
        row.lod3_implicit_ref_point = implicit.reference_point;
        row.lod3_implicit_transformation = implicit.transformation_matrix;
    }

    // the opening table has a single address column
    match opening.addresses.first() {
        Some(AddressProperty::Inline(address)) => row.address_id = Some(import_address(ctx, address)?),
        Some(AddressProperty::Href(href)) => ctx.defer(DeferredReferenceTask::basic(
            ImporterKind::Opening,
            id,
            Column::Address,
            href,
            ImporterKind::Address,
        ))?,
        None => {}
    }
    if opening.addresses.len() > 1 {
        ctx.warn(
            DiagnosticKind::UnsupportedFeature,
            None,
            format!(
                "{object_class} {id}: {} addresses given, only the first is stored",
                opening.addresses.len()
            ),
        );
    }

    ctx.add_row(Row::Opening(row))?;
    Ok(id)
}
