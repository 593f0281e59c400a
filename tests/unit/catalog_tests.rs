//! Unit tests for manifest catalog state: install semantics, selection
//! lifecycle, and the development-mode refresh task.

use std::sync::Arc;

use tokio::sync::mpsc;

use compose_pilot::activity::ActivityLog;
use compose_pilot::catalog::{self, ManifestCatalog};
use compose_pilot::engine::ComposeEngine;
use compose_pilot::events::{UiEvent, UiSink};
use compose_pilot::exec::{ProcessRunner, QueueContext};
use compose_pilot::fetch::ArtifactFetcher;
use compose_pilot::models::CompositionVersion;
use compose_pilot::reconcile::ContainerView;
use compose_pilot::session::ComposeSession;
use compose_pilot::{AppError, Config};

const TWO_BY_TWO: &str = r#"{
  "compositions": [
    { "name": "alpha", "comment": "" },
    { "name": "beta", "comment": "" }
  ],
  "versions": [
    { "ident": "1.0", "comment": "" },
    { "ident": "2.0", "comment": "" }
  ]
}"#;

fn labels(pairs: &[CompositionVersion]) -> Vec<String> {
    pairs.iter().map(CompositionVersion::label).collect()
}

#[test]
fn a_fresh_catalog_is_empty() {
    let catalog = ManifestCatalog::new();
    assert!(catalog.snapshot().is_none());
    assert!(catalog.pairs().is_empty());
    assert!(catalog.selected().is_none());
}

#[test]
fn install_regenerates_the_composition_major_cross_product() {
    let catalog = ManifestCatalog::new();
    let pairs = catalog.install(TWO_BY_TWO).expect("valid manifest");
    assert_eq!(
        labels(&pairs),
        vec!["alpha / 1.0", "alpha / 2.0", "beta / 1.0", "beta / 2.0"]
    );
    assert_eq!(catalog.pairs(), pairs);
    assert!(catalog.snapshot().is_some());
}

#[test]
fn install_clears_the_prior_selection() {
    let catalog = ManifestCatalog::new();
    let pairs = catalog.install(TWO_BY_TWO).expect("valid manifest");
    catalog.select(pairs.first().cloned());
    assert!(catalog.selected().is_some());

    catalog.install(TWO_BY_TWO).expect("valid manifest");
    assert!(
        catalog.selected().is_none(),
        "a refresh invalidates the old selection"
    );
}

#[test]
fn a_malformed_manifest_keeps_the_previous_state() {
    let catalog = ManifestCatalog::new();
    let pairs = catalog.install(TWO_BY_TWO).expect("valid manifest");
    catalog.select(pairs.first().cloned());

    let err = catalog.install("{ not json").expect_err("malformed input");
    assert!(matches!(err, AppError::ManifestParse(_)), "got {err:?}");
    assert_eq!(catalog.pairs().len(), 4);
    assert_eq!(catalog.selected(), pairs.first().cloned());
}

#[test]
fn an_empty_manifest_keeps_the_previous_state() {
    let catalog = ManifestCatalog::new();
    let pairs = catalog.install(TWO_BY_TWO).expect("valid manifest");
    catalog.select(pairs.first().cloned());

    let err = catalog
        .install(r#"{ "compositions": [], "versions": [{ "ident": "1.0", "comment": "" }] }"#)
        .expect_err("empty composition list");
    assert!(matches!(err, AppError::ManifestEmpty), "got {err:?}");
    assert_eq!(catalog.pairs().len(), 4);
    assert_eq!(catalog.selected(), pairs.first().cloned());
}

fn dev_context() -> (QueueContext, mpsc::UnboundedReceiver<UiEvent>, tempfile::TempDir) {
    let scratch = tempfile::tempdir().expect("scratch root");
    let config = Arc::new(Config {
        dev_mode: true,
        scratch_root: Some(scratch.path().to_path_buf()),
        ..Config::default()
    });
    let (ui, events) = UiSink::channel();
    let log = Arc::new(ActivityLog::new(ui.clone(), None).expect("no log directory"));
    let runner = ProcessRunner::new(Arc::clone(&log));
    let ctx = QueueContext {
        session: ComposeSession::new(&config.scratch_root()),
        engine: ComposeEngine::new(&config, runner.clone()),
        fetcher: ArtifactFetcher::new(&config, runner, Arc::clone(&log)),
        catalog: Arc::new(ManifestCatalog::new()),
        containers: Arc::new(ContainerView::new()),
        log,
        ui,
        config,
    };
    (ctx, events, scratch)
}

#[tokio::test]
async fn development_refresh_loads_the_bundled_manifest() {
    let (mut ctx, mut events, _scratch) = dev_context();

    catalog::refresh(&mut ctx).await.expect("bundled manifest loads");

    let pairs = ctx.catalog.pairs();
    assert_eq!(
        labels(&pairs),
        vec![
            "web / latest",
            "web / 1.0.0",
            "worker / latest",
            "worker / 1.0.0"
        ]
    );

    let mut saw_catalog = false;
    let mut saw_loaded_line = false;
    while let Ok(event) = events.try_recv() {
        match event {
            UiEvent::Catalog(published) => {
                assert_eq!(published, pairs);
                saw_catalog = true;
            }
            UiEvent::Log(line) if line.ends_with("Manifest loaded: 4 selectable pairings") => {
                saw_loaded_line = true;
            }
            _ => {}
        }
    }
    assert!(saw_catalog, "catalog event published");
    assert!(saw_loaded_line, "load reported to the activity log");
}
