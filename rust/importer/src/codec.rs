// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry codec: flat ring coordinates to the storage's spatial type.

use citydb_lite_core::{Point, MIN_RING_POINTS};
use serde::Serialize;
use std::fmt::Write as _;
use thiserror::Error;

/// Encoded polygon as handed to storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpatialGeometry {
    pub srid: u32,
    /// Exterior ring first, then interiors. Every ring is closed.
    pub rings: Vec<Vec<Point>>,
}

impl SpatialGeometry {
    pub fn ring_count(&self) -> usize {
        self.rings.len()
    }

    pub fn point_count(&self) -> usize {
        self.rings.iter().map(Vec::len).sum()
    }

    /// Extended WKT, e.g. `SRID=4326;POLYGON Z ((0 0 0, ...))`.
    pub fn to_ewkt(&self) -> String {
        let mut out = format!("SRID={};POLYGON Z (", self.srid);
        for (i, ring) in self.rings.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push('(');
            for (j, [x, y, z]) in ring.iter().enumerate() {
                if j > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{x} {y} {z}");
            }
            out.push(')');
        }
        out.push(')');
        out
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("No rings to encode")]
    Empty,

    #[error("Expected {expected} rings, got {actual}")]
    RingCountMismatch { expected: usize, actual: usize },

    #[error("Ring {ring}: {len} coordinates is not a multiple of 3")]
    DimensionMismatch { ring: usize, len: usize },

    #[error("Ring {ring}: only {points} points")]
    TooFewPoints { ring: usize, points: usize },

    #[error("Ring {0} is not closed")]
    OpenRing(usize),
}

/// Converts closed 3D rings (flat `x y z` lists) into a [`SpatialGeometry`].
pub trait GeometryCodec: Send + Sync {
    fn encode(&self, rings: Vec<Vec<f64>>, ring_count: usize)
        -> Result<SpatialGeometry, CodecError>;
}

/// Default codec producing plain 3D polygons.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolygonCodec {
    srid: u32,
}

impl PolygonCodec {
    pub fn new(srid: u32) -> Self {
        Self { srid }
    }
}

impl GeometryCodec for PolygonCodec {
    fn encode(
        &self,
        rings: Vec<Vec<f64>>,
        ring_count: usize,
    ) -> Result<SpatialGeometry, CodecError> {
        if rings.is_empty() {
            return Err(CodecError::Empty);
        }
        if rings.len() != ring_count {
            return Err(CodecError::RingCountMismatch {
                expected: ring_count,
                actual: rings.len(),
            });
        }

        let mut encoded = Vec::with_capacity(rings.len());
        for (ring, coords) in rings.into_iter().enumerate() {
            if coords.len() % 3 != 0 {
                return Err(CodecError::DimensionMismatch {
                    ring,
                    len: coords.len(),
                });
            }
            let points: Vec<Point> = coords
                .chunks_exact(3)
                .map(|c| [c[0], c[1], c[2]])
                .collect();
            if points.len() < MIN_RING_POINTS {
                return Err(CodecError::TooFewPoints {
                    ring,
                    points: points.len(),
                });
            }
            if points.first() != points.last() {
                return Err(CodecError::OpenRing(ring));
            }
            encoded.push(points);
        }

        Ok(SpatialGeometry {
            srid: self.srid,
            rings: encoded,
        })
    }
}
