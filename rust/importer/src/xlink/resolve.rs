// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resolution of a single task against the shared indices.

use super::library::LibraryObjectRegistry;
use super::texcoord::TexCoordAssembler;
use super::{DeferredReferenceTask, GeometryMemberLink, LinkRowKind, TaskPayload};
use crate::error::Result;
use crate::identity::{IdentityEntry, IdentityIndex, RingIndex};
use crate::ids::{SequenceAllocator, SurrogateId};
use crate::rows::{
    AddressToBuildingRow, AppearanceToSurfaceDataRow, OpeningToThematicSurfaceRow, Patch, Row,
    SurfaceGeometryRecord, TextureParamRow,
};
use crate::sink::StorageSink;

/// What a hit produces.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Output {
    Patch(Patch),
    Row(Row),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Resolution {
    /// The target is known. May produce no output when the task only
    /// contributed to a pending aggregate (texture coordinates).
    Resolved(Vec<Output>),
    /// The target is not known yet.
    Miss,
    /// The target is known but can never satisfy this task.
    Mismatch(String),
}

pub(crate) struct ResolveContext<'a> {
    pub identities: &'a IdentityIndex,
    pub rings: &'a RingIndex,
    pub libraries: &'a LibraryObjectRegistry,
    pub textures: &'a TexCoordAssembler,
    pub allocator: &'a dyn SequenceAllocator,
    pub sink: &'a dyn StorageSink,
}

enum Lookup {
    Hit(SurrogateId, IdentityEntry),
    Miss,
    Mismatch(String),
}

impl ResolveContext<'_> {
    fn lookup(&self, task: &DeferredReferenceTask) -> Lookup {
        let Some(entry) = self.identities.resolve(&task.target_href) else {
            return Lookup::Miss;
        };
        if entry.kind != task.target_kind {
            return Lookup::Mismatch(format!(
                "#{} is a {}, expected a {}",
                task.target_href, entry.kind, task.target_kind
            ));
        }
        match entry.internal_id {
            Some(id) => Lookup::Hit(id, entry),
            None => Lookup::Miss,
        }
    }

    pub fn resolve(&self, task: &DeferredReferenceTask) -> Result<Resolution> {
        // these two never go through the identity index
        match &task.payload {
            TaskPayload::TextureCoordinates(coords) => return Ok(self.texture_coordinates(task, coords)),
            TaskPayload::LibraryObject { mime_type } => {
                return self.library_object(task, mime_type.as_deref())
            }
            _ => {}
        }

        let (target, entry) = match self.lookup(task) {
            Lookup::Hit(target, entry) => (target, entry),
            Lookup::Miss => return Ok(Resolution::Miss),
            Lookup::Mismatch(reason) => return Ok(Resolution::Mismatch(reason)),
        };

        let outputs = match &task.payload {
            TaskPayload::Basic => {
                let Some(column) = task.attribute else {
                    return Ok(Resolution::Mismatch("no column to patch".into()));
                };
                vec![Output::Patch(Patch {
                    kind: task.source_kind,
                    id: task.source_id,
                    column,
                    value: target,
                })]
            }
            TaskPayload::GeometryMember(link) => {
                vec![Output::Row(Row::SurfaceGeometry(xlink_record(link, target, &entry)))]
            }
            TaskPayload::RootGeometry(link) => {
                let Some(column) = task.attribute else {
                    return Ok(Resolution::Mismatch("no column to patch".into()));
                };
                vec![
                    Output::Row(Row::SurfaceGeometry(xlink_record(link, target, &entry))),
                    Output::Patch(Patch {
                        kind: task.source_kind,
                        id: task.source_id,
                        column,
                        value: link.record_id,
                    }),
                ]
            }
            TaskPayload::Link(kind) => vec![Output::Row(link_row(*kind, task.source_id, target))],
            TaskPayload::TextureParam(link) => vec![Output::Row(Row::TextureParam(TextureParamRow {
                surface_geometry_id: target,
                surface_data_id: task.source_id,
                is_texture_parametrization: link.is_texture_parametrization,
                world_to_texture: link.world_to_texture,
                texture_coordinates: None,
            }))],
            TaskPayload::TextureCoordinates(_) | TaskPayload::LibraryObject { .. } => {
                return Ok(Resolution::Miss)
            }
        };
        Ok(Resolution::Resolved(outputs))
    }

    fn texture_coordinates(&self, task: &DeferredReferenceTask, coords: &[f64]) -> Resolution {
        let Some(slot) = self.rings.get(&task.target_href) else {
            return Resolution::Miss;
        };
        let coords = if slot.reverse {
            reverse_pairs(coords)
        } else {
            coords.to_vec()
        };
        let outputs = self
            .textures
            .add(task.source_id, slot, coords)
            .map(|row| Output::Row(Row::TextureParam(row)))
            .into_iter()
            .collect();
        Resolution::Resolved(outputs)
    }

    fn library_object(
        &self,
        task: &DeferredReferenceTask,
        mime_type: Option<&str>,
    ) -> Result<Resolution> {
        let Some(column) = task.attribute else {
            return Ok(Resolution::Mismatch("no column to patch".into()));
        };
        let (id, _) = self.libraries.resolve_or_insert(
            &task.target_href,
            mime_type,
            self.allocator,
            self.sink,
        )?;
        Ok(Resolution::Resolved(vec![Output::Patch(Patch {
            kind: task.source_kind,
            id: task.source_id,
            column,
            value: id,
        })]))
    }
}

fn xlink_record(link: &GeometryMemberLink, target: SurrogateId, entry: &IdentityEntry) -> SurfaceGeometryRecord {
    SurfaceGeometryRecord {
        id: link.record_id,
        parent_id: link.parent_id,
        root_id: link.root_id,
        is_xlink: true,
        is_reverse: link.reverse ^ entry.reverse,
        xlink_target: Some(target),
        city_object_id: link.city_object_id,
        ..Default::default()
    }
}

fn link_row(kind: LinkRowKind, source: SurrogateId, target: SurrogateId) -> Row {
    match kind {
        LinkRowKind::AppearanceToSurfaceData => Row::AppearanceToSurfaceData(AppearanceToSurfaceDataRow {
            appearance_id: source,
            surface_data_id: target,
        }),
        LinkRowKind::AddressToBuilding => Row::AddressToBuilding(AddressToBuildingRow {
            building_id: source,
            address_id: target,
        }),
        LinkRowKind::OpeningToThematicSurface => {
            Row::OpeningToThematicSurface(OpeningToThematicSurfaceRow {
                opening_id: target,
                thematic_surface_id: source,
            })
        }
    }
}

/// Reverse the order of `s t` pairs.
fn reverse_pairs(coords: &[f64]) -> Vec<f64> {
    coords.chunks(2).rev().flatten().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::RingSlot;
    use crate::ids::AtomicSequenceAllocator;
    use crate::kind::ImporterKind;
    use crate::rows::Column;
    use crate::sink::MemorySink;
    use crate::xlink::GeometryMemberLink;

    struct Fixture {
        identities: IdentityIndex,
        rings: RingIndex,
        libraries: LibraryObjectRegistry,
        textures: TexCoordAssembler,
        allocator: AtomicSequenceAllocator,
        sink: MemorySink,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                identities: IdentityIndex::new(),
                rings: RingIndex::new(),
                libraries: LibraryObjectRegistry::new(),
                textures: TexCoordAssembler::new(),
                allocator: AtomicSequenceAllocator::new(),
                sink: MemorySink::new(),
            }
        }

        fn ctx(&self) -> ResolveContext<'_> {
            ResolveContext {
                identities: &self.identities,
                rings: &self.rings,
                libraries: &self.libraries,
                textures: &self.textures,
                allocator: &self.allocator,
                sink: &self.sink,
            }
        }
    }

    fn id(v: u64) -> SurrogateId {
        SurrogateId::new(v)
    }

    #[test]
    fn basic_miss_then_hit() {
        let fx = Fixture::new();
        let task = DeferredReferenceTask::basic(
            ImporterKind::Building,
            id(1),
            Column::Lod2Solid,
            "#solid",
            ImporterKind::SurfaceGeometry,
        );
        assert_eq!(fx.ctx().resolve(&task).unwrap(), Resolution::Miss);

        fx.identities.put(IdentityEntry::resolved(
            "solid",
            id(40),
            id(40),
            ImporterKind::SurfaceGeometry,
        ));
        assert_eq!(
            fx.ctx().resolve(&task).unwrap(),
            Resolution::Resolved(vec![Output::Patch(Patch {
                kind: ImporterKind::Building,
                id: id(1),
                column: Column::Lod2Solid,
                value: id(40),
            })])
        );
    }

    #[test]
    fn wrong_target_kind_is_a_mismatch() {
        let fx = Fixture::new();
        fx.identities
            .put(IdentityEntry::resolved("addr", id(3), id(3), ImporterKind::Address));
        let task = DeferredReferenceTask::basic(
            ImporterKind::Building,
            id(1),
            Column::Lod2Solid,
            "#addr",
            ImporterKind::SurfaceGeometry,
        );
        assert!(matches!(fx.ctx().resolve(&task).unwrap(), Resolution::Mismatch(_)));
    }

    #[test]
    fn geometry_member_combines_orientation() {
        let fx = Fixture::new();
        fx.identities.put(
            IdentityEntry::resolved("wall", id(9), id(8), ImporterKind::SurfaceGeometry)
                .reversed(true),
        );
        let task = DeferredReferenceTask::geometry_member(
            GeometryMemberLink {
                record_id: id(20),
                parent_id: Some(id(19)),
                root_id: id(18),
                reverse: true,
                city_object_id: None,
            },
            "#wall",
        );
        let Resolution::Resolved(outputs) = fx.ctx().resolve(&task).unwrap() else {
            panic!("expected hit");
        };
        let Output::Row(Row::SurfaceGeometry(record)) = &outputs[0] else {
            panic!("expected record");
        };
        assert!(record.is_xlink);
        assert!(!record.is_reverse);
        assert_eq!(record.xlink_target, Some(id(9)));
        assert_eq!(record.root_id, id(18));
    }

    #[test]
    fn root_geometry_stores_record_before_patching_owner() {
        let fx = Fixture::new();
        let link = GeometryMemberLink {
            record_id: id(30),
            parent_id: None,
            root_id: id(30),
            reverse: true,
            city_object_id: Some(id(1)),
        };
        let task = DeferredReferenceTask::root_geometry(
            ImporterKind::Building,
            id(1),
            Column::Lod2MultiSurface,
            link,
            "#roof",
        );
        assert_eq!(fx.ctx().resolve(&task).unwrap(), Resolution::Miss);

        fx.identities.put(IdentityEntry::resolved(
            "roof",
            id(12),
            id(12),
            ImporterKind::SurfaceGeometry,
        ));
        let Resolution::Resolved(outputs) = fx.ctx().resolve(&task).unwrap() else {
            panic!("expected hit");
        };
        assert_eq!(outputs.len(), 2);
        let Output::Row(Row::SurfaceGeometry(record)) = &outputs[0] else {
            panic!("expected record");
        };
        assert_eq!(record.id, id(30));
        assert_eq!(record.parent_id, None);
        assert_eq!(record.root_id, id(30));
        assert!(record.is_xlink && record.is_reverse);
        assert_eq!(record.xlink_target, Some(id(12)));
        assert_eq!(
            outputs[1],
            Output::Patch(Patch {
                kind: ImporterKind::Building,
                id: id(1),
                column: Column::Lod2MultiSurface,
                value: id(30),
            })
        );
    }

    #[test]
    fn reversed_ring_reverses_texture_pairs() {
        let fx = Fixture::new();
        fx.rings.insert(
            "ring",
            RingSlot {
                polygon_id: id(4),
                root_id: id(1),
                ordinal: 0,
                ring_count: 1,
                reverse: true,
            },
        );
        let task = DeferredReferenceTask::texture_coordinates(id(2), "#ring", vec![0.0, 0.1, 1.0, 0.2]);
        let Resolution::Resolved(outputs) = fx.ctx().resolve(&task).unwrap() else {
            panic!("expected hit");
        };
        let Output::Row(Row::TextureParam(row)) = &outputs[0] else {
            panic!("expected texture param");
        };
        assert_eq!(row.texture_coordinates, Some(vec![vec![1.0, 0.2, 0.0, 0.1]]));
        assert_eq!(row.surface_geometry_id, id(4));
    }
}
