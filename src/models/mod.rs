//! Domain model module declarations.

pub mod container;
pub mod manifest;

pub use container::{classify_status, ContainerRecord, ContainerState};
pub use manifest::{
    derive_project_id, Composition, CompositionVersion, ManifestSnapshot, Version,
    VersionsManifest,
};
