// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Import diagnostics.
//!
//! Everything that is skipped, dropped or left unresolved ends up here as
//! a structured entry. Each entry is also logged as a `tracing` warning.

use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Point list or ring structure unusable; the node was skipped.
    MalformedGeometry,
    /// Valid GML the storage model cannot represent; the part was dropped.
    UnsupportedGeometry,
    /// A feature type without a registered importer.
    UnsupportedFeature,
    /// An href that never matched a stored object of the expected kind.
    UnresolvedReference,
    /// A `gml:id` stored twice under different roots.
    IdentityConflict,
    /// Texture coordinates missing for some rings of a polygon.
    IncompleteTexture,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::MalformedGeometry => "malformed geometry",
            DiagnosticKind::UnsupportedGeometry => "unsupported geometry",
            DiagnosticKind::UnsupportedFeature => "unsupported feature",
            DiagnosticKind::UnresolvedReference => "unresolved reference",
            DiagnosticKind::IdentityConflict => "identity conflict",
            DiagnosticKind::IncompleteTexture => "incomplete texture",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// `gml:id` of the top-level feature being imported, if known.
    pub feature: Option<String>,
    /// Geometry path inside the feature, e.g. `Solid/CompositeSurface/Polygon[3]`.
    pub path: Option<String>,
    pub message: String,
}

/// Thread-safe diagnostics sink.
#[derive(Debug, Default)]
pub struct ImportReport {
    entries: Mutex<Vec<Diagnostic>>,
}

impl ImportReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, diagnostic: Diagnostic) {
        tracing::warn!(
            kind = diagnostic.kind.as_str(),
            feature = diagnostic.feature.as_deref().unwrap_or("-"),
            path = diagnostic.path.as_deref().unwrap_or("-"),
            "{}",
            diagnostic.message
        );
        self.entries.lock().push(diagnostic);
    }

    pub fn warn(
        &self,
        kind: DiagnosticKind,
        feature: Option<&str>,
        path: Option<&str>,
        message: impl Into<String>,
    ) {
        self.record(Diagnostic {
            kind,
            feature: feature.map(str::to_string),
            path: path.map(str::to_string),
            message: message.into(),
        });
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.lock().clone()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.lock().iter().filter(|d| d.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_kind() {
        let report = ImportReport::new();
        report.warn(DiagnosticKind::MalformedGeometry, Some("b1"), Some("Polygon"), "empty ring");
        report.warn(DiagnosticKind::UnresolvedReference, None, None, "#missing");
        report.warn(DiagnosticKind::MalformedGeometry, Some("b2"), None, "too few points");

        assert_eq!(report.len(), 3);
        assert_eq!(report.count(DiagnosticKind::MalformedGeometry), 2);
        assert_eq!(report.entries()[0].feature.as_deref(), Some("b1"));
    }
}
