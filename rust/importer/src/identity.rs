// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Identity and ring indices
//!
//! The identity index maps document identifiers (`gml:id`) to the
//! surrogate ids they were stored under. It is written by the producer
//! thread and read concurrently by the resolver workers.
//!
//! The ring index maps ring identifiers to the polygon that owns them so
//! texture coordinates, which address rings, can be attached to the
//! stored polygon.

use crate::ids::SurrogateId;
use crate::kind::ImporterKind;
use citydb_lite_core::normalize_href;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;

pub(crate) type FxBuildHasher = BuildHasherDefault<FxHasher>;

/// Upper bound on `mapped_to` hops when resolving an href.
const MAX_MAPPING_DEPTH: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct IdentityEntry {
    pub external_id: String,
    /// `None` while the object is only known by reference.
    pub internal_id: Option<SurrogateId>,
    pub root_id: Option<SurrogateId>,
    /// Whether the stored point order is reversed relative to the document.
    pub reverse: bool,
    /// Identifier of the object this one is an alias of.
    pub mapped_to: Option<String>,
    pub kind: ImporterKind,
    /// Rings stored for a polygon.
    pub ring_count: Option<usize>,
}

impl IdentityEntry {
    /// Placeholder for an identifier that has been seen but not stored yet.
    pub fn unresolved(external_id: impl Into<String>, kind: ImporterKind) -> Self {
        Self {
            external_id: external_id.into(),
            internal_id: None,
            root_id: None,
            reverse: false,
            mapped_to: None,
            kind,
            ring_count: None,
        }
    }

    pub fn resolved(
        external_id: impl Into<String>,
        internal_id: SurrogateId,
        root_id: SurrogateId,
        kind: ImporterKind,
    ) -> Self {
        Self {
            internal_id: Some(internal_id),
            root_id: Some(root_id),
            ..Self::unresolved(external_id, kind)
        }
    }

    pub fn reversed(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn mapped_to(mut self, target: Option<&str>) -> Self {
        self.mapped_to = target.map(|t| normalize_href(t).to_string());
        self
    }

    pub fn with_ring_count(mut self, ring_count: usize) -> Self {
        self.ring_count = Some(ring_count);
        self
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.internal_id.is_some()
    }
}

/// Raised when a resolved entry is overwritten by one for a different
/// object: another root or another kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConflict {
    pub external_id: String,
    pub previous_kind: ImporterKind,
    pub previous_root: Option<SurrogateId>,
    pub new_kind: ImporterKind,
    pub new_root: Option<SurrogateId>,
}

impl IdentityConflict {
    fn between(previous: &IdentityEntry, entry: &IdentityEntry) -> Option<Self> {
        if !previous.is_resolved() {
            return None;
        }
        let other_root = matches!(
            (previous.root_id, entry.root_id),
            (Some(a), Some(b)) if a != b
        );
        (other_root || previous.kind != entry.kind).then(|| Self {
            external_id: entry.external_id.clone(),
            previous_kind: previous.kind,
            previous_root: previous.root_id,
            new_kind: entry.kind,
            new_root: entry.root_id,
        })
    }
}

/// Concurrent `gml:id` → surrogate id map.
#[derive(Debug, Default)]
pub struct IdentityIndex {
    entries: DashMap<String, IdentityEntry, FxBuildHasher>,
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-register an identifier. Existing entries are left untouched.
    pub fn reserve(&self, external_id: &str, kind: ImporterKind) {
        self.entries
            .entry(external_id.to_string())
            .or_insert_with(|| IdentityEntry::unresolved(external_id, kind));
    }

    /// Insert or overwrite an entry. The last write wins; overwriting a
    /// resolved entry with a different root or kind is reported.
    pub fn put(&self, entry: IdentityEntry) -> Option<IdentityConflict> {
        match self.entries.entry(entry.external_id.clone()) {
            Entry::Occupied(mut occupied) => {
                let conflict = IdentityConflict::between(occupied.get(), &entry);
                occupied.insert(entry);
                conflict
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
                None
            }
        }
    }

    pub fn get(&self, external_id: &str) -> Option<IdentityEntry> {
        self.entries.get(external_id).map(|e| e.value().clone())
    }

    /// Look up an href. Unresolved aliases are followed through
    /// `mapped_to`; the first resolved entry on the way is returned.
    pub fn resolve(&self, href: &str) -> Option<IdentityEntry> {
        let mut key = normalize_href(href).to_string();
        for _ in 0..MAX_MAPPING_DEPTH {
            let entry = self.get(&key)?;
            if entry.is_resolved() {
                return Some(entry);
            }
            key = entry.mapped_to?;
        }
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn unresolved_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_resolved()).count()
    }
}

/// Where a ring ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingSlot {
    pub polygon_id: SurrogateId,
    pub root_id: SurrogateId,
    /// Position among the polygon's stored rings (0 is the exterior).
    pub ordinal: usize,
    pub ring_count: usize,
    pub reverse: bool,
}

/// Concurrent ring id → [`RingSlot`] map.
#[derive(Debug, Default)]
pub struct RingIndex {
    slots: DashMap<String, RingSlot, FxBuildHasher>,
}

impl RingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, ring_id: &str, slot: RingSlot) {
        self.slots.insert(ring_id.to_string(), slot);
    }

    pub fn get(&self, href: &str) -> Option<RingSlot> {
        self.slots.get(normalize_href(href)).map(|s| *s.value())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(v: u64) -> SurrogateId {
        SurrogateId::new(v)
    }

    #[test]
    fn reserve_then_resolve() {
        let index = IdentityIndex::new();
        index.reserve("poly-1", ImporterKind::SurfaceGeometry);
        assert!(!index.get("poly-1").unwrap().is_resolved());
        assert!(index.resolve("#poly-1").is_none());

        let conflict = index.put(
            IdentityEntry::resolved("poly-1", id(5), id(1), ImporterKind::SurfaceGeometry)
                .with_ring_count(2),
        );
        assert!(conflict.is_none());
        let entry = index.resolve("#poly-1").unwrap();
        assert_eq!(entry.internal_id, Some(id(5)));
        assert_eq!(entry.ring_count, Some(2));
    }

    #[test]
    fn reserve_does_not_clobber_resolved_entry() {
        let index = IdentityIndex::new();
        index.put(IdentityEntry::resolved("a", id(1), id(1), ImporterKind::Address));
        index.reserve("a", ImporterKind::Address);
        assert!(index.get("a").unwrap().is_resolved());
    }

    #[test]
    fn overwrite_with_new_root_is_a_conflict() {
        let index = IdentityIndex::new();
        index.put(IdentityEntry::resolved("w", id(2), id(1), ImporterKind::SurfaceGeometry));
        let conflict = index
            .put(IdentityEntry::resolved("w", id(9), id(8), ImporterKind::SurfaceGeometry))
            .unwrap();
        assert_eq!(conflict.previous_root, Some(id(1)));
        assert_eq!(conflict.new_root, Some(id(8)));
        // last write wins
        assert_eq!(index.get("w").unwrap().internal_id, Some(id(9)));
    }

    #[test]
    fn overwrite_with_other_kind_is_a_conflict_even_with_equal_ids() {
        let index = IdentityIndex::new();
        // city objects and surface geometry count from 1 independently
        index.put(IdentityEntry::resolved("dup", id(1), id(1), ImporterKind::Building));
        let conflict = index
            .put(IdentityEntry::resolved("dup", id(1), id(1), ImporterKind::SurfaceGeometry))
            .unwrap();
        assert_eq!(conflict.previous_kind, ImporterKind::Building);
        assert_eq!(conflict.new_kind, ImporterKind::SurfaceGeometry);
        assert_eq!(index.get("dup").unwrap().kind, ImporterKind::SurfaceGeometry);

        // same object stored again is not a conflict
        assert!(index
            .put(IdentityEntry::resolved("dup", id(1), id(1), ImporterKind::SurfaceGeometry))
            .is_none());
    }

    #[test]
    fn unresolved_alias_follows_mapping() {
        let index = IdentityIndex::new();
        index.put(
            IdentityEntry::unresolved("alias", ImporterKind::SurfaceGeometry)
                .mapped_to(Some("#base")),
        );
        index.put(IdentityEntry::resolved("base", id(4), id(3), ImporterKind::SurfaceGeometry));
        assert_eq!(index.resolve("#alias").unwrap().external_id, "base");
    }

    #[test]
    fn mapping_loop_terminates() {
        let index = IdentityIndex::new();
        index.put(IdentityEntry::unresolved("a", ImporterKind::SurfaceGeometry).mapped_to(Some("b")));
        index.put(IdentityEntry::unresolved("b", ImporterKind::SurfaceGeometry).mapped_to(Some("a")));
        assert!(index.resolve("a").is_none());
    }

    #[test]
    fn ring_lookup_normalizes_href() {
        let rings = RingIndex::new();
        rings.insert(
            "ring-1",
            RingSlot {
                polygon_id: id(7),
                root_id: id(1),
                ordinal: 0,
                ring_count: 1,
                reverse: false,
            },
        );
        assert_eq!(rings.get("#ring-1").unwrap().polygon_id, id(7));
        assert!(rings.get("#ring-2").is_none());
    }
}
