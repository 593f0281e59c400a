//! Catalog value types: compositions, versions, and their pairings.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::Result;

/// A named application template published in the versions manifest.
///
/// Compositions are immutable once parsed and are replaced wholesale on
/// every manifest refresh; they carry no local mutable state.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Composition {
    /// Template name; doubles as the identity of the composition.
    pub name: String,
    /// Free-form description shown alongside the name.
    #[serde(default)]
    pub comment: String,
}

/// A release identifier selectable independently of any composition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Version {
    /// Version identifier; doubles as the identity of the version.
    pub ident: String,
    /// Free-form description shown alongside the identifier.
    #[serde(default)]
    pub comment: String,
}

/// The manifest wire document as published in the remote repository.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionsManifest {
    /// Deployable compositions.
    pub compositions: Vec<Composition>,
    /// Selectable versions.
    pub versions: Vec<Version>,
}

impl VersionsManifest {
    /// Parse the manifest from its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AppError::ManifestParse`] when the document is
    /// malformed.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Whether either list is empty, making the manifest unusable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.compositions.is_empty() || self.versions.is_empty()
    }
}

/// One selectable pairing of a composition with a version.
///
/// Pairings are derived, never persisted: the full cross-product is
/// regenerated from the current snapshot on every refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionVersion {
    /// The composition half of the pair.
    pub composition: Composition,
    /// The version half of the pair.
    pub version: Version,
}

impl CompositionVersion {
    /// Pair a composition with a version.
    #[must_use]
    pub fn new(composition: Composition, version: Version) -> Self {
        Self {
            composition,
            version,
        }
    }

    /// Engine-level project label derived from the pair.
    #[must_use]
    pub fn project_id(&self) -> String {
        derive_project_id(&self.composition.name, &self.version.ident)
    }

    /// Human-facing label, `<name> / <ident>`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} / {}", self.composition.name, self.version.ident)
    }
}

/// Derive the engine project label for a composition name and version
/// identifier.
///
/// Lower-cases `<name>-<ident>` and maps every character outside
/// `[a-z0-9_-]` to `-`. Total over arbitrary input, deterministic, and
/// idempotent: reapplying it to its own output is the identity.
#[must_use]
pub fn derive_project_id(composition: &str, version: &str) -> String {
    format!("{composition}-{version}")
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// A successfully parsed manifest together with its retrieval time.
///
/// Snapshots are replaced atomically by the catalog; a failed refresh never
/// installs one.
#[derive(Debug, Clone)]
pub struct ManifestSnapshot {
    /// Compositions from the parsed manifest.
    pub compositions: Vec<Composition>,
    /// Versions from the parsed manifest.
    pub versions: Vec<Version>,
    /// When the manifest was retrieved.
    pub fetched_at: DateTime<Utc>,
}

impl ManifestSnapshot {
    /// Snapshot a parsed manifest at the current instant.
    #[must_use]
    pub fn new(manifest: VersionsManifest) -> Self {
        Self {
            compositions: manifest.compositions,
            versions: manifest.versions,
            fetched_at: Utc::now(),
        }
    }

    /// The cross-product of compositions and versions, composition-major.
    #[must_use]
    pub fn pairs(&self) -> Vec<CompositionVersion> {
        self.compositions
            .iter()
            .flat_map(|composition| {
                self.versions
                    .iter()
                    .map(|version| CompositionVersion::new(composition.clone(), version.clone()))
            })
            .collect()
    }
}
