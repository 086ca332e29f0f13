// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::ids::Sequence;
use crate::kind::ImporterKind;
use crate::sink::WriteError;
use thiserror::Error;

/// Result type for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Errors that abort an import run.
///
/// Recoverable problems (malformed geometry, unresolved references,
/// identity conflicts) never surface here; they are recorded in the
/// [`ImportReport`](crate::report::ImportReport) instead.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to write {kind} rows: {source}")]
    Write {
        kind: ImporterKind,
        #[source]
        source: WriteError,
    },

    #[error("Sequence {0} exhausted")]
    SequenceExhausted(Sequence),

    #[error("Dependency cycle detected at importer kind {0}")]
    DependencyCycle(ImporterKind),

    #[error("Reference resolver is no longer accepting tasks")]
    ResolverDisconnected,

    #[error("Reference resolver worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("Failed to spawn resolver worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Import cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Feature {feature}: {source}")]
    Feature {
        feature: String,
        #[source]
        source: Box<ImportError>,
    },

    #[error("Geometry {path}: {source}")]
    Geometry {
        path: String,
        #[source]
        source: Box<ImportError>,
    },
}

impl ImportError {
    /// Attach the owning feature's identifier.
    pub fn in_feature(self, feature: impl Into<String>) -> Self {
        ImportError::Feature {
            feature: feature.into(),
            source: Box::new(self),
        }
    }

    /// Attach the geometry path at which the error occurred.
    pub fn at_path(self, path: impl Into<String>) -> Self {
        match self {
            // keep the innermost path only
            err @ ImportError::Geometry { .. } => err,
            err => ImportError::Geometry {
                path: path.into(),
                source: Box::new(err),
            },
        }
    }

    /// Whether this is (or wraps) a storage write failure.
    pub fn is_write_failure(&self) -> bool {
        match self {
            ImportError::Write { .. } => true,
            ImportError::Feature { source, .. } | ImportError::Geometry { source, .. } => {
                source.is_write_failure()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_wrapping_keeps_innermost_path() {
        let err = ImportError::Write {
            kind: ImporterKind::SurfaceGeometry,
            source: WriteError::Rejected("duplicate key".into()),
        }
        .at_path("Solid/CompositeSurface")
        .at_path("Solid")
        .in_feature("bldg-1");

        assert!(err.is_write_failure());
        let message = err.to_string();
        assert!(message.starts_with("Feature bldg-1: Geometry Solid/CompositeSurface"));
    }
}
