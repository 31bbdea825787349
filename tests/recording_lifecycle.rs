//! Lifecycle tests against real child processes.
//!
//! `sh -c <script> capture` stands in for the capture tool, so the script sees
//! the usual arguments as `$1 <url> $2 <quality> $3 -o $4 <file>`.

#![cfg(unix)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use stream_recorder::recorder::{
    ExitOutcome, RecorderError, RecorderSettings, RecordingEvent, RecordingManager,
};
use tokio::sync::broadcast;

fn manager(dir: &Path, script: &str) -> RecordingManager {
    RecordingManager::new(RecorderSettings {
        recording_dir: dir.join("recordings"),
        program: "sh".to_string(),
        extra_args: vec!["-c".to_string(), script.to_string(), "capture".to_string()],
        quality: "best".to_string(),
    })
}

async fn next_event(rx: &mut broadcast::Receiver<RecordingEvent>) -> RecordingEvent {
    tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

#[tokio::test]
async fn test_process_writes_output_and_ends_on_its_own() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = manager(tmp.path(), r#"echo "$1 $2" > "$4""#);
    let mut events = manager.subscribe();

    let info = manager.start("twitch", "alice").await.unwrap();
    assert!(info
        .output_path
        .starts_with(tmp.path().join("recordings")));

    assert!(matches!(next_event(&mut events).await, RecordingEvent::Started(_)));
    match next_event(&mut events).await {
        RecordingEvent::Ended { info: ended, outcome } => {
            assert_eq!(ended.id, info.id);
            assert_eq!(outcome, ExitOutcome::Success);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    assert_eq!(manager.active_count().await, 0);
    let written = std::fs::read_to_string(&info.output_path).unwrap();
    assert_eq!(written.trim(), "twitch.tv/alice best");
}

#[tokio::test]
async fn test_crash_is_reported_with_exit_code() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = manager(tmp.path(), "exit 2");
    let mut events = manager.subscribe();

    manager.start("kick", "bob").await.unwrap();

    assert!(matches!(next_event(&mut events).await, RecordingEvent::Started(_)));
    match next_event(&mut events).await {
        RecordingEvent::Ended { outcome, .. } => {
            assert_eq!(outcome, ExitOutcome::Failed { code: Some(2) })
        }
        other => panic!("unexpected event: {other:?}"),
    }

    // A crashed recording can be started again explicitly.
    manager.start("kick", "bob").await.unwrap();
}

#[tokio::test]
async fn test_stop_terminates_running_process() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = Arc::new(manager(tmp.path(), "exec sleep 30"));
    let mut events = manager.subscribe();

    let info = manager.start("twitch", "alice").await.unwrap();
    assert!(info.pid.is_some());
    assert!(matches!(
        manager.start("twitch", "alice").await,
        Err(RecorderError::AlreadyRecording { .. })
    ));

    let stopped = manager.stop("twitch", "alice").await.unwrap();
    assert_eq!(stopped.id, info.id);
    assert_eq!(manager.active_count().await, 0);

    assert!(matches!(next_event(&mut events).await, RecordingEvent::Started(_)));
    assert!(matches!(next_event(&mut events).await, RecordingEvent::Stopped(_)));

    // The terminated process must not produce an Ended event.
    let late = tokio::time::timeout(Duration::from_millis(500), events.recv()).await;
    assert!(late.is_err(), "unexpected event after stop: {late:?}");
}

#[tokio::test]
async fn test_missing_program_is_a_spawn_error() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = RecordingManager::new(RecorderSettings {
        recording_dir: tmp.path().join("recordings"),
        program: "definitely-not-a-real-capture-tool".to_string(),
        extra_args: Vec::new(),
        quality: "best".to_string(),
    });

    let err = manager.start("twitch", "alice").await.unwrap_err();
    assert!(matches!(err, RecorderError::Spawn { .. }));
    assert!(manager.list().await.is_empty());
}

#[tokio::test]
async fn test_stop_all_on_shutdown() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = manager(tmp.path(), "exec sleep 30");

    manager.start("twitch", "alice").await.unwrap();
    manager.start("youtube", "carol").await.unwrap();

    assert_eq!(manager.stop_all(Duration::from_secs(5)).await, 2);
    assert!(manager.list().await.is_empty());
}

#[test]
fn test_shutdown_lets_capture_finish_its_file() {
    let tmp = tempfile::tempdir().unwrap();
    let script =
        r#"trap 'sleep 0.2; echo done > "$4"; exit 0' TERM; while true; do sleep 0.05; done"#;

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let info = runtime.block_on(async {
        let manager = manager(tmp.path(), script);
        let info = manager.start("twitch", "alice").await.unwrap();
        // Give the shell time to install its trap.
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(manager.stop_all(Duration::from_secs(5)).await, 1);
        info
    });
    // The service returns from main right after stop_all.
    drop(runtime);

    let written = std::fs::read_to_string(&info.output_path).unwrap();
    assert_eq!(written.trim(), "done");
}
