// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::identity::RingSlot;
use crate::ids::SurrogateId;
use crate::rows::TextureParamRow;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

#[derive(Debug)]
struct PendingPolygon {
    rings: Vec<Option<Vec<f64>>>,
    filled: usize,
}

/// Collects per-ring texture coordinates until every ring of a polygon
/// has arrived, then emits one texture parameter row for the polygon.
#[derive(Debug, Default)]
pub struct TexCoordAssembler {
    pending: Mutex<FxHashMap<(SurrogateId, SurrogateId), PendingPolygon>>,
}

impl TexCoordAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record coordinates for the ring at `slot`. Returns the completed row
    /// once the last ring of the polygon is in.
    pub fn add(
        &self,
        surface_data_id: SurrogateId,
        slot: RingSlot,
        coordinates: Vec<f64>,
    ) -> Option<TextureParamRow> {
        if slot.ordinal >= slot.ring_count.max(1) {
            return None;
        }
        let key = (surface_data_id, slot.polygon_id);
        let mut pending = self.pending.lock();
        let entry = pending.entry(key).or_insert_with(|| PendingPolygon {
            rings: vec![None; slot.ring_count.max(1)],
            filled: 0,
        });

        let ring = entry.rings.get_mut(slot.ordinal)?;
        if ring.is_none() {
            entry.filled += 1;
        }
        *ring = Some(coordinates);

        if entry.filled < entry.rings.len() {
            return None;
        }
        let complete = pending.remove(&key)?;
        Some(row(surface_data_id, slot.polygon_id, complete))
    }

    /// Take every polygon still missing rings. Missing rings are empty.
    pub fn drain_incomplete(&self) -> Vec<TextureParamRow> {
        let mut pending = self.pending.lock();
        let mut rows: Vec<_> = pending
            .drain()
            .map(|((sd, polygon), p)| row(sd, polygon, p))
            .collect();
        rows.sort_by_key(|r| (r.surface_data_id, r.surface_geometry_id));
        rows
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}

fn row(surface_data_id: SurrogateId, polygon_id: SurrogateId, p: PendingPolygon) -> TextureParamRow {
    TextureParamRow {
        surface_geometry_id: polygon_id,
        surface_data_id,
        is_texture_parametrization: true,
        world_to_texture: None,
        texture_coordinates: Some(p.rings.into_iter().map(Option::unwrap_or_default).collect()),
    }
}
