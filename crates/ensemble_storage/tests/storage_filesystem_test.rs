//! Tests for the filesystem transcript store.

use chrono::{Duration, TimeZone, Utc};
use ensemble_core::{Event, Run, RunId, RunStatus};
use ensemble_storage::{FileSystemTranscriptStore, METADATA_FILE, TranscriptStore};
use futures_util::TryStreamExt;
use serde_json::json;
use tempfile::TempDir;

fn store(temp_dir: &TempDir) -> FileSystemTranscriptStore {
    FileSystemTranscriptStore::new(temp_dir.path()).unwrap()
}

#[tokio::test]
async fn test_append_and_load_preserves_order_and_fields() {
    let temp_dir = TempDir::new().unwrap();
    let store = store(&temp_dir);
    let run = Run::new("Web Research");
    store.create(&run.summary()).await.unwrap();

    let mut extra_event = Event::new("WebSurfer", "Clicked 'Docs'");
    extra_event.extra.insert("type".to_string(), json!("OrchestrationEvent"));
    extra_event.extra.insert("timestamp".to_string(), json!("2025-03-14T09:26:53"));
    let events = vec![
        Event::new("Orchestrator", "Plan: search, then read"),
        extra_event,
        Event::new("Coder", "```python\nprint(1)\n```"),
        Event::new("Orchestrator", "Still working, unicode ok: héllo ✓"),
    ];
    for event in &events {
        store.append(run.id(), event).await.unwrap();
    }

    let loaded = store.load(run.id()).await.unwrap();
    assert_eq!(loaded.skipped, 0);
    assert_eq!(loaded.run.events(), &events);
    assert_eq!(loaded.run.task(), "Web Research");
    assert_eq!(loaded.run.final_answer(), &None);
}

#[tokio::test]
async fn test_one_line_per_event() {
    let temp_dir = TempDir::new().unwrap();
    let store = store(&temp_dir);
    let run = Run::new("Multi line messages");
    store.create(&run.summary()).await.unwrap();

    store
        .append(run.id(), &Event::new("Coder", "line one\nline two"))
        .await
        .unwrap();
    store.append(run.id(), &Event::new("Coder", "third")).await.unwrap();

    let log = std::fs::read_to_string(temp_dir.path().join(run.id().as_str()).join("log.jsonl")).unwrap();
    assert_eq!(log.lines().count(), 2);
    assert!(log.ends_with('\n'));
}

#[tokio::test]
async fn test_list_newest_first() {
    let temp_dir = TempDir::new().unwrap();
    let store = store(&temp_dir);
    let earlier = Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap();
    let r1 = Run::new_at("First task", earlier);
    let r2 = Run::new_at("Second task", earlier + Duration::minutes(5));
    store.create(&r1.summary()).await.unwrap();
    store.create(&r2.summary()).await.unwrap();

    let listed: Vec<_> = store.list().try_collect().await.unwrap();
    let ids: Vec<&RunId> = listed.iter().map(|s| &s.id).collect();
    assert_eq!(ids, vec![r2.id(), r1.id()]);
    assert_eq!(listed[1].task, "First task");
    assert_eq!(listed[1].created_at, earlier);
}

#[tokio::test]
async fn test_list_is_restartable() {
    let temp_dir = TempDir::new().unwrap();
    let store = store(&temp_dir);
    let run = Run::new("Only run");
    store.create(&run.summary()).await.unwrap();

    let first: Vec<_> = store.list().try_collect().await.unwrap();
    let second: Vec<_> = store.list().try_collect().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
}

#[tokio::test]
async fn test_final_answer_derived_on_load() {
    let temp_dir = TempDir::new().unwrap();
    let store = store(&temp_dir);
    let run = Run::new("Answer me");
    store.create(&run.summary()).await.unwrap();

    store
        .append(run.id(), &Event::new("Orchestrator", "Final Answer: first"))
        .await
        .unwrap();
    store
        .append(run.id(), &Event::new("Orchestrator", "Final Answer:  42 "))
        .await
        .unwrap();
    store
        .append(run.id(), &Event::new("Coder", "Final Answer: not me"))
        .await
        .unwrap();

    let loaded = store.load(run.id()).await.unwrap();
    assert_eq!(loaded.run.final_answer().as_deref(), Some("42"));
}

#[tokio::test]
async fn test_malformed_line_is_skipped_and_counted() {
    let temp_dir = TempDir::new().unwrap();
    let store = store(&temp_dir);
    let run = Run::new("Torn write");
    store.create(&run.summary()).await.unwrap();

    let log = temp_dir.path().join(run.id().as_str()).join("log.jsonl");
    std::fs::write(
        &log,
        concat!(
            r#"{"source":"Orchestrator","message":"one"}"#,
            "\n",
            r#"{"source":"Coder","message":"#,
            "\n",
            "\n",
            r#"{"source":"Coder","message":"two"}"#,
            "\n"
        ),
    )
    .unwrap();

    let loaded = store.load(run.id()).await.unwrap();
    assert_eq!(loaded.skipped, 1);
    assert_eq!(loaded.run.events().len(), 2);
    assert_eq!(loaded.run.events()[1].message, "two");
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let store = store(&temp_dir);
    let run = Run::new("Short lived");
    store.create(&run.summary()).await.unwrap();
    store.append(run.id(), &Event::new("Coder", "hi")).await.unwrap();

    store.delete(run.id()).await.unwrap();
    assert!(!temp_dir.path().join(run.id().as_str()).exists());
    store.delete(run.id()).await.unwrap();

    let never: RunId = "20250101_deadbeef_never-existed".parse().unwrap();
    store.delete(&never).await.unwrap();

    let listed: Vec<_> = store.list().try_collect().await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_create_on_non_empty_location_fails() {
    let temp_dir = TempDir::new().unwrap();
    let store = store(&temp_dir);
    let run = Run::new("Collision");
    store.create(&run.summary()).await.unwrap();

    let err = store.create(&run.summary()).await.unwrap_err();
    assert!(matches!(
        err.store_kind(),
        Some(ensemble_error::StoreErrorKind::AlreadyExists(_))
    ));
}

#[tokio::test]
async fn test_create_on_empty_location_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    let store = store(&temp_dir);
    let run = Run::new("Pre-made directory");
    std::fs::create_dir(temp_dir.path().join(run.id().as_str())).unwrap();

    store.create(&run.summary()).await.unwrap();
    assert!(temp_dir.path().join(run.id().as_str()).join(METADATA_FILE).exists());
}

#[tokio::test]
async fn test_append_to_missing_run_fails() {
    let temp_dir = TempDir::new().unwrap();
    let store = store(&temp_dir);
    let missing: RunId = "20250101_deadbeef_missing".parse().unwrap();

    let err = store
        .append(&missing, &Event::new("Coder", "lost"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.store_kind(),
        Some(ensemble_error::StoreErrorKind::NotFound(_))
    ));
}

#[tokio::test]
async fn test_update_persists_status() {
    let temp_dir = TempDir::new().unwrap();
    let store = store(&temp_dir);
    let mut run = Run::new("Status tracking");
    store.create(&run.summary()).await.unwrap();

    run.start().unwrap();
    run.fail("engine exploded").unwrap();
    store.update(&run.summary()).await.unwrap();

    let listed: Vec<_> = store.list().try_collect().await.unwrap();
    assert_eq!(listed[0].status, RunStatus::Failed);
    assert_eq!(listed[0].failure.as_deref(), Some("engine exploded"));

    let loaded = store.load(run.id()).await.unwrap();
    assert_eq!(*loaded.run.status(), RunStatus::Failed);
}

#[tokio::test]
async fn test_legacy_directory_is_listed() {
    let temp_dir = TempDir::new().unwrap();
    let legacy = temp_dir.path().join("20240102_153000_1a2b3c4d_web research");
    std::fs::create_dir(&legacy).unwrap();
    std::fs::write(
        legacy.join("log.jsonl"),
        r#"{"source":"Orchestrator","message":"Final Answer: old news"}"#,
    )
    .unwrap();
    std::fs::create_dir(temp_dir.path().join("not-a-run")).unwrap();
    std::fs::write(temp_dir.path().join("stray.txt"), "ignore me").unwrap();

    let store = store(&temp_dir);
    let listed: Vec<_> = store.list().try_collect().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].task, "Web research");
    assert_eq!(
        listed[0].created_at,
        Utc.with_ymd_and_hms(2024, 1, 2, 15, 30, 0).unwrap()
    );
    assert_eq!(listed[0].status, RunStatus::Completed);

    let loaded = store.load(&listed[0].id).await.unwrap();
    assert_eq!(loaded.run.final_answer().as_deref(), Some("old news"));
}

#[tokio::test]
async fn test_files_lists_run_directory() {
    let temp_dir = TempDir::new().unwrap();
    let store = store(&temp_dir);
    let run = Run::new("Write a file");
    store.create(&run.summary()).await.unwrap();
    let dir = store.location(run.id()).unwrap();
    std::fs::write(dir.join("plot.png"), [0u8; 16]).unwrap();
    std::fs::create_dir(dir.join("nested")).unwrap();

    let files = store.files(run.id()).await.unwrap();
    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["plot.png", METADATA_FILE]);
    assert_eq!(files[0].size, 16);
}

#[tokio::test]
async fn test_concurrent_appends_keep_records_whole() {
    let temp_dir = TempDir::new().unwrap();
    let store = std::sync::Arc::new(store(&temp_dir));
    let run = Run::new("Busy run");
    store.create(&run.summary()).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..20 {
        let store = store.clone();
        let id = run.id().clone();
        handles.push(tokio::spawn(async move {
            store
                .append(&id, &Event::new("Coder", format!("event {}", i).repeat(50)))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let loaded = store.load(run.id()).await.unwrap();
    assert_eq!(loaded.skipped, 0);
    assert_eq!(loaded.run.events().len(), 20);
}

#[tokio::test]
async fn test_recreate_after_delete_with_racing_appends() {
    let temp_dir = TempDir::new().unwrap();
    let store = std::sync::Arc::new(store(&temp_dir));
    let run = Run::new("Recycled run");
    store.create(&run.summary()).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..10 {
        let store = store.clone();
        let id = run.id().clone();
        handles.push(tokio::spawn(async move {
            store.append(&id, &Event::new("Coder", format!("old {}", i))).await
        }));
    }
    store.delete(run.id()).await.unwrap();
    for handle in handles {
        // appends landing after the delete find the run gone
        if let Err(err) = handle.await.unwrap() {
            assert!(matches!(
                err.store_kind(),
                Some(ensemble_error::StoreErrorKind::NotFound(_))
            ));
        }
    }

    store.create(&run.summary()).await.unwrap();
    store
        .append(run.id(), &Event::new("Orchestrator", "fresh"))
        .await
        .unwrap();

    let loaded = store.load(run.id()).await.unwrap();
    assert_eq!(loaded.skipped, 0);
    assert_eq!(loaded.run.events().len(), 1);
    assert_eq!(loaded.run.events()[0].message, "fresh");
}
