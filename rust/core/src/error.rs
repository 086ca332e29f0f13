// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for document model validation.

use thiserror::Error;

/// Result type alias for document model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while validating parsed document content.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A ring without a single coordinate.
    #[error("ring has no coordinates")]
    EmptyRing,

    /// The flat coordinate list does not split into whole points.
    #[error("coordinate count {len} is not a multiple of dimension {dimension}")]
    DimensionMismatch { len: usize, dimension: usize },

    /// Only 2D and 3D coordinates are understood.
    #[error("unsupported coordinate dimension {0}")]
    UnsupportedDimension(usize),

    /// A closed ring needs at least four points (three distinct + closing point).
    #[error("ring has {0} points, at least 4 are required")]
    TooFewPoints(usize),

    /// A polygon without an exterior boundary.
    #[error("polygon has no exterior ring")]
    MissingExterior,
}
