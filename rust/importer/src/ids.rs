// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surrogate identifiers and the sequences that hand them out.

use crate::error::{ImportError, Result};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Storage-assigned row identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(transparent)]
pub struct SurrogateId(u64);

impl SurrogateId {
    #[inline]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SurrogateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical id sequences. All city object tables share one sequence, so a
/// building, its rooms and its openings never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Sequence {
    SurfaceGeometry,
    ImplicitGeometry,
    CityObject,
    ExternalReference,
    GenericAttribute,
    Address,
    Appearance,
    SurfaceData,
}

impl Sequence {
    pub const COUNT: usize = 8;

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sequence::SurfaceGeometry => "surface_geometry_seq",
            Sequence::ImplicitGeometry => "implicit_geometry_seq",
            Sequence::CityObject => "cityobject_seq",
            Sequence::ExternalReference => "external_ref_seq",
            Sequence::GenericAttribute => "cityobject_genericatt_seq",
            Sequence::Address => "address_seq",
            Sequence::Appearance => "appearance_seq",
            Sequence::SurfaceData => "surface_data_seq",
        }
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of surrogate ids. Ids within one sequence are unique and
/// strictly increasing in allocation order.
pub trait SequenceAllocator: Send + Sync {
    fn next(&self, sequence: Sequence) -> Result<SurrogateId>;
}

/// In-process allocator backed by one atomic counter per sequence.
#[derive(Debug)]
pub struct AtomicSequenceAllocator {
    counters: [AtomicU64; Sequence::COUNT],
}

impl AtomicSequenceAllocator {
    /// All sequences start at 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// All sequences start at `first`. Useful when appending to storage
    /// that already holds rows.
    pub fn starting_at(first: u64) -> Self {
        Self {
            counters: std::array::from_fn(|_| AtomicU64::new(first)),
        }
    }

    /// The id the next call to [`SequenceAllocator::next`] would return.
    pub fn peek(&self, sequence: Sequence) -> u64 {
        self.counters[sequence.index()].load(Ordering::Relaxed)
    }
}

impl Default for AtomicSequenceAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceAllocator for AtomicSequenceAllocator {
    fn next(&self, sequence: Sequence) -> Result<SurrogateId> {
        self.counters[sequence.index()]
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_add(1))
            .map(SurrogateId)
            .map_err(|_| ImportError::SequenceExhausted(sequence))
    }
}
