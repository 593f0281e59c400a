//! Manifest state and pair selection.
//!
//! The catalog holds the last successfully parsed manifest snapshot and the
//! user's current composition/version selection. Refreshes run as queue
//! tasks; a failed refresh never replaces a valid snapshot.

use std::sync::{PoisonError, RwLock};

use crate::exec::QueueContext;
use crate::models::{CompositionVersion, ManifestSnapshot, VersionsManifest};
use crate::{AppError, Result};

/// Bundled development-mode manifest.
const DEV_MANIFEST: &str = include_str!("../fixtures/dev-manifest.json");

#[derive(Default)]
struct CatalogState {
    snapshot: Option<ManifestSnapshot>,
    selected: Option<CompositionVersion>,
}

/// The last good manifest snapshot plus the current pair selection.
#[derive(Default)]
pub struct ManifestCatalog {
    state: RwLock<CatalogState>,
}

impl ManifestCatalog {
    /// An empty catalog with no snapshot and no selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `raw` and, only when both lists are non-empty, atomically
    /// replace the snapshot and clear the pair selection. Returns the
    /// regenerated cross-product.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ManifestParse`] for a malformed document and
    /// [`AppError::ManifestEmpty`] when either list is empty; both leave
    /// the previous snapshot and selection untouched.
    pub fn install(&self, raw: &str) -> Result<Vec<CompositionVersion>> {
        let manifest = VersionsManifest::from_json(raw)?;
        if manifest.is_empty() {
            return Err(AppError::ManifestEmpty);
        }
        let snapshot = ManifestSnapshot::new(manifest);
        let pairs = snapshot.pairs();
        let mut state = self
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        state.snapshot = Some(snapshot);
        state.selected = None;
        Ok(pairs)
    }

    /// The current snapshot, if any refresh has succeeded.
    #[must_use]
    pub fn snapshot(&self) -> Option<ManifestSnapshot> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot
            .clone()
    }

    /// The cross-product of the current snapshot, composition-major; empty
    /// before the first successful refresh.
    #[must_use]
    pub fn pairs(&self) -> Vec<CompositionVersion> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot
            .as_ref()
            .map(ManifestSnapshot::pairs)
            .unwrap_or_default()
    }

    /// Record the user's pair selection.
    pub fn select(&self, pair: Option<CompositionVersion>) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .selected = pair;
    }

    /// The currently selected pair, if any.
    #[must_use]
    pub fn selected(&self) -> Option<CompositionVersion> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .selected
            .clone()
    }
}

/// Queue task: refresh the catalog from the bundled fixture (development
/// mode) or the remote manifest, then publish the new pairings.
///
/// # Errors
///
/// Propagates fetch and parse failures; the previous snapshot stays
/// installed.
pub async fn refresh(ctx: &mut QueueContext) -> Result<()> {
    let raw = if ctx.config.dev_mode {
        ctx.log.append("Loading bundled development manifest");
        DEV_MANIFEST.to_owned()
    } else {
        ctx.log.append(&format!(
            "Fetching manifest {}",
            ctx.config.remote.manifest_path
        ));
        ctx.fetcher
            .fetch_file(&ctx.config.remote.manifest_path)
            .await?
    };
    let pairs = ctx.catalog.install(&raw)?;
    ctx.log
        .append(&format!("Manifest loaded: {} selectable pairings", pairs.len()));
    ctx.ui.send(crate::events::UiEvent::Catalog(pairs));
    Ok(())
}
