// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::city_object::geometry_property;
use crate::context::ImportContext;
use crate::error::Result;
use crate::ids::{Sequence, SurrogateId};
use crate::kind::ImporterKind;
use crate::report::DiagnosticKind;
use crate::rows::{Column, ImplicitGeometryRow, Row};
use crate::xlink::DeferredReferenceTask;
use citydb_lite_core::ImplicitGeometry;

/// Store an implicit geometry for `column` of `(kind, owner)`.
///
/// Library objects are shared by URI and resolved by the reference
/// resolver, which patches the column; `None` is returned for them.
/// Otherwise a template row is written around the relative geometry.
pub(crate) fn import_implicit(
    ctx: &mut ImportContext,
    implicit: &ImplicitGeometry,
    kind: ImporterKind,
    owner: SurrogateId,
    column: Column,
) -> Result<Option<SurrogateId>> {
    let library_object = implicit
        .library_object
        .as_deref()
        .map(str::trim)
        .filter(|uri| !uri.is_empty());
    if let Some(uri) = library_object {
        ctx.defer(DeferredReferenceTask::library_object(
            kind,
            owner,
            column,
            uri,
            implicit.mime_type.clone(),
        ))?;
        return Ok(None);
    }

    let Some(geometry) = &implicit.relative_geometry else {
        ctx.warn(
            DiagnosticKind::MalformedGeometry,
            None,
            format!("{kind} {owner}: implicit geometry has neither library object nor relative geometry"),
        );
        return Ok(None);
    };

    let id = ctx.next_id(Sequence::ImplicitGeometry)?;
    // templates belong to no city object
    let relative_geometry_id = geometry_property(
        ctx,
        Some(geometry),
        None,
        id,
        ImporterKind::ImplicitGeometry,
        Column::RelativeGeometry,
    )?;
    let row = ImplicitGeometryRow {
        id,
        mime_type: implicit.mime_type.clone(),
        relative_geometry_id,
        ..Default::default()
    };
    ctx.add_row(Row::ImplicitGeometry(row))?;
    Ok(Some(id))
}
