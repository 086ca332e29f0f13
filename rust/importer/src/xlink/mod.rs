// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Deferred reference ("xlink") resolution
//!
//! References that cannot be written while a feature is imported become
//! [`DeferredReferenceTask`]s. They are sent to a fixed pool of worker
//! threads over a bounded channel and resolved against the shared
//! identity index once the referenced object is known.
//!
//! ```text
//! producer ──send──▶ [bounded queue] ──▶ worker 0..N ──▶ identity index
//!                                             │
//!                                             ├─ miss: retry queue / parked
//!                                             └─ hit:  patches + rows
//!                                                       (committed at drain)
//! ```

mod library;
mod pool;
mod resolve;
mod texcoord;

pub use library::LibraryObjectRegistry;
pub use pool::{ResolverDeps, ResolverSummary, XlinkPool, XlinkSender};
pub use texcoord::TexCoordAssembler;

use crate::ids::SurrogateId;
use crate::kind::ImporterKind;
use crate::rows::Column;
use citydb_lite_core::normalize_href;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveState {
    Queued,
    Resolving,
    Resolved,
    Unresolved,
}

/// Placement of a geometry member that is an href.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryMemberLink {
    /// Id reserved for the placeholder record.
    pub record_id: SurrogateId,
    pub parent_id: Option<SurrogateId>,
    pub root_id: SurrogateId,
    /// Orientation at the reference site.
    pub reverse: bool,
    pub city_object_id: Option<SurrogateId>,
}

/// Link tables filled once the href side is known. The source id is the
/// side that was already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRowKind {
    /// appearance → surface data
    AppearanceToSurfaceData,
    /// building → address
    AddressToBuilding,
    /// thematic surface → opening
    OpeningToThematicSurface,
}

impl LinkRowKind {
    pub fn importer_kind(self) -> ImporterKind {
        match self {
            LinkRowKind::AppearanceToSurfaceData => ImporterKind::AppearanceToSurfaceData,
            LinkRowKind::AddressToBuilding => ImporterKind::AddressToBuilding,
            LinkRowKind::OpeningToThematicSurface => ImporterKind::OpeningToThematicSurface,
        }
    }

    /// Kind of the object the href must point at.
    pub fn target_kind(self) -> ImporterKind {
        match self {
            LinkRowKind::AppearanceToSurfaceData => ImporterKind::SurfaceData,
            LinkRowKind::AddressToBuilding => ImporterKind::Address,
            LinkRowKind::OpeningToThematicSurface => ImporterKind::Opening,
        }
    }
}

/// Surface-level texture parameters (materials, georeferenced textures,
/// world-to-texture mappings).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureParamLink {
    pub is_texture_parametrization: bool,
    pub world_to_texture: Option<[f64; 12]>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskPayload {
    /// Patch `attribute` of the source row with the target's id.
    Basic,
    GeometryMember(GeometryMemberLink),
    /// Store a reversed xlink record as a tree root, then patch
    /// `attribute` of the source row with the record's id.
    RootGeometry(GeometryMemberLink),
    Link(LinkRowKind),
    TextureParam(TextureParamLink),
    /// `s t` pairs for one ring.
    TextureCoordinates(Vec<f64>),
    LibraryObject { mime_type: Option<String> },
}

impl TaskPayload {
    fn tag(&self) -> u8 {
        match self {
            TaskPayload::Basic => 0,
            TaskPayload::GeometryMember(_) => 1,
            TaskPayload::Link(_) => 2,
            TaskPayload::TextureParam(_) => 3,
            TaskPayload::TextureCoordinates(_) => 4,
            TaskPayload::LibraryObject { .. } => 5,
            TaskPayload::RootGeometry(_) => 6,
        }
    }
}

/// Identity of a task for duplicate suppression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskKey {
    source_kind: ImporterKind,
    source_id: SurrogateId,
    attribute: Option<Column>,
    target_href: String,
    payload: u8,
}

/// A reference waiting for its target.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredReferenceTask {
    pub source_id: SurrogateId,
    pub source_kind: ImporterKind,
    /// Normalized target identifier (library objects keep their URI).
    pub target_href: String,
    pub target_kind: ImporterKind,
    pub attribute: Option<Column>,
    pub payload: TaskPayload,
    /// Top-level feature that raised the task, for diagnostics.
    pub feature: Option<String>,
    pub attempts: u32,
    pub state: ResolveState,
}

impl DeferredReferenceTask {
    fn new(
        source_kind: ImporterKind,
        source_id: SurrogateId,
        target_href: String,
        target_kind: ImporterKind,
        attribute: Option<Column>,
        payload: TaskPayload,
    ) -> Self {
        Self {
            source_id,
            source_kind,
            target_href,
            target_kind,
            attribute,
            payload,
            feature: None,
            attempts: 0,
            state: ResolveState::Queued,
        }
    }

    /// Patch `column` of `(source_kind, source_id)` with the target's id.
    pub fn basic(
        source_kind: ImporterKind,
        source_id: SurrogateId,
        column: Column,
        href: &str,
        target_kind: ImporterKind,
    ) -> Self {
        Self::new(
            source_kind,
            source_id,
            normalize_href(href).to_string(),
            target_kind,
            Some(column),
            TaskPayload::Basic,
        )
    }

    /// Store an xlink placeholder record for an href geometry member.
    pub fn geometry_member(link: GeometryMemberLink, href: &str) -> Self {
        Self::new(
            ImporterKind::SurfaceGeometry,
            link.record_id,
            normalize_href(href).to_string(),
            ImporterKind::SurfaceGeometry,
            None,
            TaskPayload::GeometryMember(link),
        )
    }

    /// A whole geometry property that is a reversed reference. The
    /// placeholder becomes its own tree root and is written together with
    /// the patch of `column`, so the owning row never points at a record
    /// that was not stored.
    pub fn root_geometry(
        source_kind: ImporterKind,
        source_id: SurrogateId,
        column: Column,
        link: GeometryMemberLink,
        href: &str,
    ) -> Self {
        Self::new(
            source_kind,
            source_id,
            normalize_href(href).to_string(),
            ImporterKind::SurfaceGeometry,
            Some(column),
            TaskPayload::RootGeometry(link),
        )
    }

    pub fn link(kind: LinkRowKind, source_id: SurrogateId, href: &str) -> Self {
        Self::new(
            kind.importer_kind(),
            source_id,
            normalize_href(href).to_string(),
            kind.target_kind(),
            None,
            TaskPayload::Link(kind),
        )
    }

    pub fn texture_param(surface_data_id: SurrogateId, target: &str, link: TextureParamLink) -> Self {
        Self::new(
            ImporterKind::SurfaceData,
            surface_data_id,
            normalize_href(target).to_string(),
            ImporterKind::SurfaceGeometry,
            None,
            TaskPayload::TextureParam(link),
        )
    }

    pub fn texture_coordinates(surface_data_id: SurrogateId, ring: &str, coordinates: Vec<f64>) -> Self {
        Self::new(
            ImporterKind::SurfaceData,
            surface_data_id,
            normalize_href(ring).to_string(),
            ImporterKind::SurfaceGeometry,
            None,
            TaskPayload::TextureCoordinates(coordinates),
        )
    }

    /// Share one implicit geometry row per library object URI.
    pub fn library_object(
        source_kind: ImporterKind,
        source_id: SurrogateId,
        column: Column,
        uri: &str,
        mime_type: Option<String>,
    ) -> Self {
        Self::new(
            source_kind,
            source_id,
            uri.trim().to_string(),
            ImporterKind::ImplicitGeometry,
            Some(column),
            TaskPayload::LibraryObject { mime_type },
        )
    }

    pub fn with_feature(mut self, feature: Option<&str>) -> Self {
        self.feature = feature.map(str::to_string);
        self
    }

    pub fn key(&self) -> TaskKey {
        TaskKey {
            source_kind: self.source_kind,
            source_id: self.source_id,
            attribute: self.attribute,
            target_href: self.target_href.clone(),
            payload: self.payload.tag(),
        }
    }
}
