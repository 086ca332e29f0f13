// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rows shared by every city object: the object itself, external
//! references, generic attributes, local appearances and addresses.

use super::appearance::import_appearance;
use crate::context::ImportContext;
use crate::decomposer::RootReference;
use crate::error::Result;
use crate::identity::IdentityEntry;
use crate::ids::{Sequence, SurrogateId};
use crate::kind::ImporterKind;
use crate::rows::{AddressRow, CityObjectRow, Column, ExternalReferenceRow, GenericAttributeRow, Row};
use crate::xlink::{DeferredReferenceTask, GeometryMemberLink};
use citydb_lite_core::{Address, CityObjectHeader, GenericAttribute, GenericValue, GeometryProperty};

/// Write the city object row for `header` and everything hanging off it.
/// The returned id is shared with the feature's own row; the identity is
/// registered under `kind` so references to it resolve to that row.
pub(crate) fn import_city_object(
    ctx: &mut ImportContext,
    header: &CityObjectHeader,
    object_class: &str,
    kind: ImporterKind,
) -> Result<SurrogateId> {
    let id = ctx.next_id(Sequence::CityObject)?;
    let gmlid = header.id.clone().unwrap_or_else(|| ctx.generate_id());
    ctx.add_row(Row::CityObject(CityObjectRow {
        id,
        object_class: object_class.to_string(),
        gmlid,
        name: header.name.clone(),
        description: header.description.clone(),
    }))?;
    if let Some(gmlid) = &header.id {
        ctx.register(IdentityEntry::resolved(gmlid, id, id, kind));
    }

    for reference in &header.external_references {
        let row = ExternalReferenceRow {
            id: ctx.next_id(Sequence::ExternalReference)?,
            city_object_id: id,
            information_system: reference.information_system.clone(),
            name: reference.name.clone(),
            uri: reference.uri.clone(),
        };
        ctx.add_row(Row::ExternalReference(row))?;
    }

    for attribute in &header.generic_attributes {
        generic_attribute(ctx, attribute, id)?;
    }

    if ctx.config().import_appearance {
        for appearance in &header.appearances {
            import_appearance(ctx, appearance, Some(id))?;
        }
    }
    Ok(id)
}

fn generic_attribute(ctx: &mut ImportContext, attribute: &GenericAttribute, owner: SurrogateId) -> Result<()> {
    let id = ctx.next_id(Sequence::GenericAttribute)?;
    let mut row = GenericAttributeRow {
        id,
        city_object_id: owner,
        name: attribute.name.clone(),
        ..Default::default()
    };
    match &attribute.value {
        GenericValue::String(value) => {
            row.data_type = "string";
            row.str_value = Some(value.clone());
        }
        GenericValue::Int(value) => {
            row.data_type = "int";
            row.int_value = Some(*value);
        }
        GenericValue::Double(value) => {
            row.data_type = "double";
            row.real_value = Some(*value);
        }
        GenericValue::Uri(value) => {
            row.data_type = "uri";
            row.uri_value = Some(value.clone());
        }
        GenericValue::Date(value) => {
            row.data_type = "date";
            row.date_value = Some(value.clone());
        }
        GenericValue::Measure { value, uom } => {
            row.data_type = "measure";
            row.real_value = Some(*value);
            row.unit = uom.clone();
        }
        GenericValue::Geometry(geometry) => {
            row.data_type = "geometry";
            row.geometry_id = geometry_property(
                ctx,
                Some(geometry),
                Some(owner),
                id,
                ImporterKind::GenericAttribute,
                Column::GeometryValue,
            )?;
        }
    }
    ctx.add_row(Row::GenericAttribute(row))
}

/// Store a geometry slot. Inline geometry is decomposed and its root id
/// returned; an href is deferred as a patch of `column` on `(kind, row)`.
/// `owner` is the city object the geometry belongs to, if any.
pub(crate) fn geometry_property(
    ctx: &mut ImportContext,
    property: Option<&GeometryProperty>,
    owner: Option<SurrogateId>,
    row: SurrogateId,
    kind: ImporterKind,
    column: Column,
) -> Result<Option<SurrogateId>> {
    match property {
        None => Ok(None),
        Some(GeometryProperty::Inline(node)) => match RootReference::of(node) {
            Some(reference) => {
                root_reference(ctx, &reference, owner, row, kind, column)?;
                Ok(None)
            }
            None => ctx.decompose(node, owner),
        },
        Some(GeometryProperty::Href(href)) => {
            ctx.defer(DeferredReferenceTask::basic(
                kind,
                row,
                column,
                href,
                ImporterKind::SurfaceGeometry,
            ))?;
            Ok(None)
        }
    }
}

/// A wrapped href in place of a whole geometry. Nothing is stored now:
/// the column is patched once the target is known, through a reversed
/// xlink root record when the wrappers flip the orientation.
fn root_reference(
    ctx: &mut ImportContext,
    reference: &RootReference<'_>,
    owner: Option<SurrogateId>,
    row: SurrogateId,
    kind: ImporterKind,
    column: Column,
) -> Result<()> {
    for alias in &reference.aliases {
        ctx.register(
            IdentityEntry::unresolved(*alias, ImporterKind::SurfaceGeometry)
                .reversed(reference.reverse)
                .mapped_to(Some(reference.href)),
        );
    }
    let task = if reference.reverse {
        let record_id = ctx.next_id(Sequence::SurfaceGeometry)?;
        let link = GeometryMemberLink {
            record_id,
            parent_id: None,
            root_id: record_id,
            reverse: true,
            city_object_id: owner,
        };
        DeferredReferenceTask::root_geometry(kind, row, column, link, reference.href)
    } else {
        DeferredReferenceTask::basic(kind, row, column, reference.href, ImporterKind::SurfaceGeometry)
    };
    ctx.defer(task)
}

pub(crate) fn import_address(ctx: &mut ImportContext, address: &Address) -> Result<SurrogateId> {
    let id = ctx.next_id(Sequence::Address)?;
    let gmlid = address.id.clone().unwrap_or_else(|| ctx.generate_id());
    ctx.add_row(Row::Address(AddressRow {
        id,
        gmlid,
        street: address.street.clone(),
        house_number: address.house_number.clone(),
        po_box: address.po_box.clone(),
        zip_code: address.zip_code.clone(),
        city: address.city.clone(),
        state: address.state.clone(),
        country: address.country.clone(),
    }))?;
    if let Some(gmlid) = &address.id {
        ctx.register(IdentityEntry::resolved(gmlid, id, id, ImporterKind::Address));
    }
    Ok(id)
}
