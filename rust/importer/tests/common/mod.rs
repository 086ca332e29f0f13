// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry and importer fixtures shared by the integration tests.

#![allow(dead_code)]

use citydb_lite_core::{
    Aggregate, Building, CityObject, CityObjectHeader, GeometryNode, GeometryProperty, Polygon,
    Ring, Solid,
};
use citydb_lite_importer::{Importer, ImporterConfig, MemorySink};
use std::sync::Arc;

pub fn config() -> ImporterConfig {
    ImporterConfig {
        batch_size: 16,
        xlink_workers: 2,
        xlink_queue_capacity: 64,
        ..Default::default()
    }
}

pub fn importer(config: ImporterConfig) -> (Importer, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let importer = Importer::new(config, sink.clone()).expect("importer");
    (importer, sink)
}

/// Closed ring through the given corners.
pub fn ring(corners: &[[f64; 3]]) -> Ring {
    let mut coordinates: Vec<f64> = corners.iter().flatten().copied().collect();
    if let Some(first) = corners.first() {
        coordinates.extend_from_slice(first);
    }
    Ring::new(coordinates)
}

/// Axis-aligned unit square at height `z`.
pub fn square(z: f64) -> Ring {
    ring(&[[0.0, 0.0, z], [1.0, 0.0, z], [1.0, 1.0, z], [0.0, 1.0, z]])
}

pub fn polygon(id: &str, exterior: Ring) -> Polygon {
    Polygon::new(exterior).with_id(id)
}

/// Ring with too few points to be stored.
pub fn degenerate() -> Ring {
    Ring::new(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0])
}

/// Six faces of the unit cube, ids `{prefix}-face-0..5`.
pub fn cube_faces(prefix: &str) -> Vec<Polygon> {
    let c = |x: f64, y: f64, z: f64| [x, y, z];
    let faces = [
        [c(0., 0., 0.), c(0., 1., 0.), c(1., 1., 0.), c(1., 0., 0.)],
        [c(0., 0., 1.), c(1., 0., 1.), c(1., 1., 1.), c(0., 1., 1.)],
        [c(0., 0., 0.), c(1., 0., 0.), c(1., 0., 1.), c(0., 0., 1.)],
        [c(1., 0., 0.), c(1., 1., 0.), c(1., 1., 1.), c(1., 0., 1.)],
        [c(1., 1., 0.), c(0., 1., 0.), c(0., 1., 1.), c(1., 1., 1.)],
        [c(0., 1., 0.), c(0., 0., 0.), c(0., 0., 1.), c(0., 1., 1.)],
    ];
    faces
        .iter()
        .enumerate()
        .map(|(i, corners)| polygon(&format!("{prefix}-face-{i}"), ring(corners)))
        .collect()
}

/// `Solid({prefix}-solid) -> CompositeSurface({prefix}-shell) -> 6 polygons`.
pub fn cube(prefix: &str) -> GeometryNode {
    let shell = Aggregate::new(cube_faces(prefix)).with_id(format!("{prefix}-shell"));
    Solid::new(GeometryNode::CompositeSurface(shell))
        .with_id(format!("{prefix}-solid"))
        .into()
}

pub fn multi_surface(id: &str, members: Vec<GeometryProperty>) -> GeometryNode {
    GeometryNode::MultiSurface(Aggregate {
        id: Some(id.to_string()),
        members,
    })
}

pub fn building(id: &str) -> Building {
    Building {
        header: CityObjectHeader::with_id(id),
        ..Default::default()
    }
}

pub fn feature(building: Building) -> CityObject {
    CityObject::Building(building)
}
