// Sync pipeline metrics as seen through the installed Prometheus recorder
//
// Installs the global recorder, so this binary holds a single test.

mod support;

use common::ingest::{download_laws, ingest_data_from_location};
use common::telemetry;
use support::{archive, MemoryLocation, MemoryStore, StaticSource};
use tempfile::TempDir;

#[tokio::test]
async fn sync_runs_are_visible_in_rendered_metrics() {
    let handle = telemetry::init_metrics().unwrap();

    let location = MemoryLocation::with(&[("gone", archive("GONE", "20200101000000"))]);
    let source = StaticSource::new(&[
        ("bgb", archive("BGB", "20200101000000")),
        ("hgb", archive("HGB", "20200101000000")),
    ]);
    download_laws(&location, &source, 250).await.unwrap();

    let store = MemoryStore::default();
    ingest_data_from_location(&store, &location, 250).await.unwrap();

    let rendered = handle.render();
    assert!(rendered.contains("gadi_laws_downloaded_total 2"), "got {}", rendered);
    assert!(rendered.contains("gadi_laws_ingested_total 2"), "got {}", rendered);
    assert!(rendered.contains("gadi_ingest_duration_seconds"), "got {}", rendered);

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("metrics.prom");
    telemetry::write_metrics_textfile(&handle, &path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("gadi_laws_ingested_total 2"));
}
