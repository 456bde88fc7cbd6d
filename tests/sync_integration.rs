//! End-to-end sync passes against a scripted remote.

mod support;

use std::path::Path;
use std::time::Duration;

use docmirror_core::convert::ConversionDispatcher;
use docmirror_core::driver::{RootOutcome, RootSpec, SyncDriver, SyncError, SyncSettings};
use docmirror_core::manifest::ManifestStore;
use docmirror_core::wait::{DownloadPolicy, WaitPolicy};
use docmirror_core::{DownloadOrchestrator, TraversalContext};
use serde_json::Value;
use support::{FakeConverter, Folder, ScriptedRemote, biology_tree};
use tempfile::TempDir;

fn driver(dir: &TempDir, remote: ScriptedRemote) -> SyncDriver<ScriptedRemote> {
    let mut settings = SyncSettings::new(dir.path().join("mirror"));
    settings.listing_policy = WaitPolicy::new(Duration::from_millis(1), 2);
    settings.ready_timeout = Duration::from_millis(50);
    SyncDriver::new(
        remote,
        ManifestStore::new(manifest_path(dir)),
        settings,
    )
    .with_orchestrator(DownloadOrchestrator::new(DownloadPolicy::new(
        Duration::from_millis(300),
        Duration::from_millis(10),
    )))
    .with_dispatcher(ConversionDispatcher::new(FakeConverter::default()))
}

fn manifest_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("manifest.json")
}

fn read_json(path: &Path) -> Value {
    let raw = std::fs::read_to_string(path).expect("read manifest");
    serde_json::from_str(&raw).expect("manifest is valid JSON")
}

fn without_last_sync(mut value: Value) -> Value {
    if let Value::Object(map) = &mut value {
        map.remove("lastSyncTime");
    }
    value
}

fn biology_roots() -> Vec<RootSpec> {
    vec![RootSpec::new("Biology", "remote://biology")]
}

#[tokio::test]
async fn test_sync_scenario_records_files_and_conversion() {
    let dir = TempDir::new().expect("temp dir");
    let remote = ScriptedRemote::new().with_root("remote://biology", biology_tree());
    let mut driver = driver(&dir, remote);

    let summary = driver.sync_all(&biology_roots()).await.expect("sync");

    assert!(summary.is_clean(), "summary: {summary:?}");
    let json = read_json(&manifest_path(&dir));
    let biology = &json["Biology"];
    assert!(biology["__FileData__"]["syllabus.pdf"].is_string());
    assert!(biology["Unit1"]["__FileData__"]["notes.docx"].is_string());
    assert!(biology["Unit1"]["__FileData__"]["notes.pdf"].is_string());
    assert!(json["lastSyncTime"].is_string());

    let mirror = dir.path().join("mirror").join("Biology");
    assert!(mirror.join("syllabus.pdf").is_file());
    assert!(mirror.join("Unit1").join("notes.docx").is_file());
    assert!(mirror.join("Unit1").join("notes.pdf").is_file());
}

#[tokio::test]
async fn test_second_sync_is_idempotent() {
    let dir = TempDir::new().expect("temp dir");
    let remote = ScriptedRemote::new().with_root("remote://biology", biology_tree());
    let mut driver = driver(&dir, remote);

    driver.sync_all(&biology_roots()).await.expect("first sync");
    let first = read_json(&manifest_path(&dir));
    driver.adapter_mut().triggers.clear();

    let summary = driver.sync_all(&biology_roots()).await.expect("second sync");

    assert!(driver.adapter().triggers.is_empty());
    assert_eq!(summary.totals().downloads_triggered, 0);
    assert_eq!(summary.totals().files_downloaded, 0);
    let second = read_json(&manifest_path(&dir));
    assert_eq!(without_last_sync(first), without_last_sync(second));
}

#[tokio::test]
async fn test_recorded_file_is_never_triggered_even_if_local_copy_is_gone() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(
        manifest_path(&dir),
        r#"{"Biology": {"__FileData__": {"syllabus.pdf": "2024-01-01 09:00:00"}}}"#,
    )
    .expect("seed manifest");
    let remote = ScriptedRemote::new().with_root("remote://biology", biology_tree());
    let mut driver = driver(&dir, remote);

    driver.sync_all(&biology_roots()).await.expect("sync");

    let triggers = &driver.adapter().triggers;
    assert!(
        !triggers.iter().any(|t| t.ends_with("/syllabus.pdf")),
        "triggers: {triggers:?}"
    );
    let json = read_json(&manifest_path(&dir));
    assert_eq!(
        json["Biology"]["__FileData__"]["syllabus.pdf"],
        "2024-01-01 09:00:00"
    );
}

#[tokio::test]
async fn test_drift_is_tolerated_with_exactly_one_event() {
    let dir = TempDir::new().expect("temp dir");
    let tree = Folder::new()
        .folder("Unit1", Folder::new().file("a.pdf"))
        .folder("Unit2", Folder::new().file("b.pdf"))
        .folder("Unit3", Folder::new().file("c.pdf"));
    let mut remote = ScriptedRemote::new().with_root("remote://biology", tree);
    remote.vanish_on_back = Some((Vec::new(), "Unit3".to_string()));
    let mut driver = driver(&dir, remote);

    let summary = driver.sync_all(&biology_roots()).await.expect("sync");

    let report = summary.root("Biology").expect("biology report");
    assert_eq!(report.outcome, RootOutcome::Completed);
    assert_eq!(report.walk.drift_events.len(), 1);
    assert_eq!(report.walk.drift_events[0].path, "Biology");
    assert_eq!(driver.adapter().entered, ["Unit1", "Unit2"]);

    let manifest = driver.store().load().await.expect("load");
    let root = TraversalContext::root("Biology");
    assert!(manifest.has_file(&root.child("Unit1"), "a.pdf"));
    assert!(manifest.has_file(&root.child("Unit2"), "b.pdf"));
}

#[tokio::test]
async fn test_stalled_download_times_out_alone_and_is_retried() {
    let dir = TempDir::new().expect("temp dir");
    let tree = Folder::new()
        .file("a.pdf")
        .file("big.zip")
        .file("c.pdf");
    let mut remote = ScriptedRemote::new().with_root("remote://biology", tree);
    remote.stalled.insert("big.zip".to_string());
    let mut driver = driver(&dir, remote);

    let summary = driver.sync_all(&biology_roots()).await.expect("first sync");

    assert_eq!(summary.totals().files_timed_out, 1);
    let root = TraversalContext::root("Biology");
    let manifest = driver.store().load().await.expect("load");
    assert!(manifest.has_file(&root, "a.pdf"));
    assert!(manifest.has_file(&root, "c.pdf"));
    assert!(!manifest.has_file(&root, "big.zip"));

    driver.adapter_mut().stalled.clear();
    driver.adapter_mut().triggers.clear();
    let summary = driver.sync_all(&biology_roots()).await.expect("second sync");

    assert_eq!(driver.adapter().triggers, ["remote://biology/big.zip"]);
    assert_eq!(summary.totals().files_timed_out, 0);
    let manifest = driver.store().load().await.expect("load");
    assert!(manifest.has_file(&root, "big.zip"));
}

#[tokio::test]
async fn test_unready_root_is_skipped_and_others_complete() {
    let dir = TempDir::new().expect("temp dir");
    let mut remote = ScriptedRemote::new()
        .with_root("remote://biology", biology_tree())
        .with_root("remote://history", Folder::new().file("essay.pdf"));
    remote.unready.insert("remote://biology".to_string());
    let mut driver = driver(&dir, remote);
    let roots = vec![
        RootSpec::new("Biology", "remote://biology"),
        RootSpec::new("History", "remote://history"),
    ];

    let summary = driver.sync_all(&roots).await.expect("sync");

    assert_eq!(
        summary.root("Biology").expect("biology").outcome,
        RootOutcome::NavigationTimeout
    );
    assert_eq!(
        summary.root("History").expect("history").outcome,
        RootOutcome::Completed
    );
    let manifest = driver.store().load().await.expect("load");
    assert!(manifest.has_file(&TraversalContext::root("History"), "essay.pdf"));
    assert!(manifest.root("Biology").is_none());
    let json = read_json(&manifest_path(&dir));
    assert!(json.get("Biology").is_none());
}

#[tokio::test]
async fn test_priority_root_limits_the_pass() {
    let dir = TempDir::new().expect("temp dir");
    let remote = ScriptedRemote::new()
        .with_root("remote://biology", biology_tree())
        .with_root("remote://history", Folder::new().file("essay.pdf"));
    let mut driver = driver(&dir, remote);
    let roots = vec![
        RootSpec::new("Biology", "remote://biology"),
        RootSpec::new("History", "remote://history"),
    ];

    let mut settings = driver.settings().clone();
    settings.priority_root = Some("History".to_string());
    let remote = driver.into_adapter();
    let mut driver = SyncDriver::new(remote, ManifestStore::new(manifest_path(&dir)), settings);

    let summary = driver.sync_all(&roots).await.expect("sync");

    assert_eq!(summary.roots.len(), 1);
    assert_eq!(summary.roots[0].label, "History");
    assert!(
        driver
            .adapter()
            .triggers
            .iter()
            .all(|t| t.starts_with("remote://history"))
    );
}

#[tokio::test]
async fn test_session_loss_aborts_run_after_saving_progress() {
    let dir = TempDir::new().expect("temp dir");
    let mut remote = ScriptedRemote::new()
        .with_root("remote://biology", biology_tree())
        .with_root("remote://history", Folder::new().file("essay.pdf"));
    remote.session_lost_at = Some("remote://history".to_string());
    let mut driver = driver(&dir, remote);
    let roots = vec![
        RootSpec::new("Biology", "remote://biology"),
        RootSpec::new("History", "remote://history"),
    ];

    let err = driver.sync_all(&roots).await.expect_err("session loss");

    assert!(matches!(err, SyncError::Session { ref root, .. } if root == "History"));
    let manifest = driver.store().load().await.expect("load");
    assert!(manifest.has_file(&TraversalContext::root("Biology"), "syllabus.pdf"));
}

#[tokio::test]
async fn test_unknown_manifest_keys_survive_a_sync() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(
        manifest_path(&dir),
        r#"{
            "SyncTime": "legacy",
            "Biology": {
                "__Meta__": {"owner": "lab-staff"},
                "pinned": true,
                "__FileData__": {}
            }
        }"#,
    )
    .expect("seed manifest");
    let remote = ScriptedRemote::new().with_root("remote://biology", biology_tree());
    let mut driver = driver(&dir, remote);

    driver.sync_all(&biology_roots()).await.expect("sync");

    let json = read_json(&manifest_path(&dir));
    assert_eq!(json["SyncTime"], "legacy");
    assert_eq!(json["Biology"]["__Meta__"]["owner"], "lab-staff");
    assert_eq!(json["Biology"]["pinned"], true);
    assert!(json["Biology"]["__FileData__"]["syllabus.pdf"].is_string());
}

#[tokio::test]
async fn test_failed_conversion_keeps_original_record() {
    let dir = TempDir::new().expect("temp dir");
    let remote = ScriptedRemote::new().with_root("remote://biology", biology_tree());
    let mut driver = driver(&dir, remote).with_dispatcher(ConversionDispatcher::new(
        FakeConverter {
            fail: true,
            ..FakeConverter::default()
        },
    ));

    let summary = driver.sync_all(&biology_roots()).await.expect("sync");

    assert_eq!(summary.totals().files_converted, 0);
    let json = read_json(&manifest_path(&dir));
    let unit = &json["Biology"]["Unit1"]["__FileData__"];
    assert!(unit["notes.docx"].is_string());
    assert!(unit.get("notes.pdf").is_none());
}

#[tokio::test]
async fn test_remote_pdf_with_converted_name_is_not_fetched_twice() {
    let dir = TempDir::new().expect("temp dir");
    let tree = Folder::new().file("notes.docx").file("notes.pdf");
    let remote = ScriptedRemote::new().with_root("remote://biology", tree);
    let mut driver = driver(&dir, remote);

    driver.sync_all(&biology_roots()).await.expect("first sync");
    driver.adapter_mut().triggers.clear();
    driver.sync_all(&biology_roots()).await.expect("second sync");

    assert!(driver.adapter().triggers.is_empty());
}
