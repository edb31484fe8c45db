mod support;

use foldercreate::config::Settings;
use foldercreate::logging::{AgentLog, LogLevel};
use foldercreate::runtime::{ControlMessage, ControlSlot, LoopExit, PollLoop, QUEUE_SOURCE};
use foldercreate::status::{MgrStatus, StatusReporter, TaskStatus};
use foldercreate::shared::xml::parse_fragment;
use foldercreate::task::TaskClient;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;
use support::{broadcast, v1_payload, RecordingPublisher, ScriptedStore};
use tempfile::tempdir;

const MGR: &str = "Pub-10_FolderCreate";

fn settings() -> Settings {
    Settings {
        mgr_name: MGR.to_string(),
        ..Settings::default()
    }
}

fn poll_loop(state: &Path, settings: Settings, store: ScriptedStore) -> PollLoop<ScriptedStore> {
    let log = AgentLog::console(LogLevel::Debug);
    let task = TaskClient::new(store, &settings.mgr_name, log.clone());
    let status = StatusReporter::new(&state.join("Status.xml"), &settings.mgr_name, log.clone());
    PollLoop::new(settings, task, status, log, ControlSlot::new())
        .with_tick(Duration::from_millis(10))
}

fn stop_later(control: &ControlSlot, delay: Duration) -> thread::JoinHandle<()> {
    let control = control.clone();
    thread::spawn(move || {
        thread::sleep(delay);
        control.post(ControlMessage::Stop);
    })
}

fn status_field(state: &Path, path: &[&str]) -> String {
    let raw = fs::read_to_string(state.join("Status.xml")).expect("status file");
    document_field(&raw, path)
}

fn document_field(raw: &str, path: &[&str]) -> String {
    parse_fragment(raw)
        .expect("status xml")
        .select(path)
        .map(|element| element.inner_text())
        .unwrap_or_default()
}

#[test]
fn queue_is_drained_until_empty() {
    let state = tempdir().expect("state");
    let root = tempdir().expect("root");
    let first = v1_payload("1", root.path(), root.path(), r"2024\A");
    let second = v1_payload("2", root.path(), root.path(), r"2024\B");
    let mut poll = poll_loop(
        state.path(),
        settings(),
        ScriptedStore::with_tasks(&[&first, &second]),
    );

    assert!(poll.check_db_queue());

    assert!(root.path().join("2024/A").is_dir());
    assert!(root.path().join("2024/B").is_dir());
    let store = poll.task_client().store();
    assert_eq!(
        store.completions,
        vec![(1, 0, String::new()), (2, 0, String::new())]
    );
    assert_eq!(store.requests.len(), 3);
    assert_eq!(poll.status().snapshot().task_status, TaskStatus::NoTask);
    assert!(poll
        .status()
        .snapshot()
        .most_recent_job_info
        .ends_with("; Package 2"));
}

#[test]
fn failed_task_stops_draining_and_records_message() {
    let state = tempdir().expect("state");
    let scratch = tempdir().expect("scratch");
    let missing = scratch.path().join("missing");
    let failing = v1_payload("7", &missing, &missing, r"a\b");
    let never = v1_payload("8", scratch.path(), scratch.path(), "never");
    let mut poll = poll_loop(
        state.path(),
        settings(),
        ScriptedStore::with_tasks(&[&failing, &never]),
    );

    assert!(!poll.check_db_queue());

    let store = poll.task_client().store();
    assert_eq!(store.requests.len(), 1);
    assert_eq!(
        store.completions,
        vec![(1, 1, format!("Root directory {} not found", missing.display()))]
    );
    assert!(!scratch.path().join("never").exists());
    assert_eq!(poll.status().snapshot().task_status, TaskStatus::Failed);
}

#[test]
fn unparseable_payload_fails_the_task() {
    let state = tempdir().expect("state");
    let mut poll = poll_loop(
        state.path(),
        settings(),
        ScriptedStore::with_tasks(&["<root><package>1</package></root>"]),
    );

    assert!(!poll.check_db_queue());
    let (task_id, code, message) = &poll.task_client().store().completions[0];
    assert_eq!((*task_id, *code), (1, 1));
    assert!(message.starts_with("Exception parsing XML command string"));
}

#[test]
fn payload_can_be_processed_outside_the_queue() {
    let state = tempdir().expect("state");
    let root = tempdir().expect("root");
    let mut poll = poll_loop(state.path(), settings(), ScriptedStore::default());

    let created = poll
        .process_task_payload(&v1_payload("3", root.path(), root.path(), "x"), QUEUE_SOURCE)
        .expect("created");
    assert_eq!(created, root.path().join("x"));
    assert!(poll.task_client().store().completions.is_empty());
}

#[test]
fn shutdown_broadcast_stops_the_loop() {
    let state = tempdir().expect("state");
    let mut poll = poll_loop(state.path(), settings(), ScriptedStore::default());
    poll.control()
        .post(ControlMessage::Broadcast(broadcast(&[MGR], "Shutdown")));

    assert_eq!(poll.run(), LoopExit::Shutdown);
    assert!(poll.task_client().store().requests.is_empty());
    assert_eq!(status_field(state.path(), &["Manager", "MgrStatus"]), "Stopped");
}

#[test]
fn broadcast_for_other_managers_is_ignored() {
    let state = tempdir().expect("state");
    let mut poll = poll_loop(state.path(), settings(), ScriptedStore::default());
    poll.control().post(ControlMessage::Broadcast(broadcast(
        &["Pub-11_FolderCreate"],
        "Shutdown",
    )));
    let stopper = stop_later(poll.control(), Duration::from_millis(300));

    assert_eq!(poll.run(), LoopExit::Shutdown);
    stopper.join().expect("stopper");
    assert_eq!(poll.task_client().store().requests, vec![MGR]);
}

#[test]
fn read_config_applies_reloaded_perspective() {
    let state = tempdir().expect("state");
    let local = tempdir().expect("local");
    let shared = tempdir().expect("shared");
    let payload = v1_payload("4", local.path(), shared.path(), "reloaded");
    let mut poll = poll_loop(state.path(), settings(), ScriptedStore::with_tasks(&[&payload]))
        .with_reloader(Box::new(|| {
            Ok(Settings {
                perspective: "client".to_string(),
                debug_level: 3,
                ..settings()
            })
        }));
    poll.control()
        .post(ControlMessage::Broadcast(broadcast(&[MGR], "ReadConfig")));
    let stopper = stop_later(poll.control(), Duration::from_millis(300));

    assert_eq!(poll.run(), LoopExit::Shutdown);
    stopper.join().expect("stopper");
    assert!(shared.path().join("reloaded").is_dir());
    assert!(!local.path().join("reloaded").exists());
    assert_eq!(poll.settings().perspective, "client");
}

#[test]
fn read_config_that_deactivates_disables_the_manager() {
    let state = tempdir().expect("state");
    let mut poll = poll_loop(state.path(), settings(), ScriptedStore::default())
        .with_reloader(Box::new(|| {
            Ok(Settings {
                mgr_active: false,
                ..settings()
            })
        }));
    poll.control()
        .post(ControlMessage::Broadcast(broadcast(&[MGR], "readconfig")));

    assert_eq!(poll.run(), LoopExit::Disabled);
    assert_eq!(
        status_field(state.path(), &["Manager", "MgrStatus"]),
        "Disabled_MC"
    );
}

#[test]
fn inactive_manager_never_polls() {
    let state = tempdir().expect("state");
    let inactive = Settings {
        mgr_active: false,
        ..settings()
    };
    let mut poll = poll_loop(state.path(), inactive, ScriptedStore::with_tasks(&["<root/>"]));

    assert_eq!(poll.run(), LoopExit::Disabled);
    assert!(poll.task_client().store().requests.is_empty());
}

#[test]
fn pending_stop_is_honoured_even_if_a_broadcast_follows() {
    let state = tempdir().expect("state");
    let mut poll = poll_loop(state.path(), settings(), ScriptedStore::with_tasks(&["<root/>"]));
    poll.control().post(ControlMessage::Stop);
    poll.control().post(ControlMessage::Broadcast(broadcast(
        &["Pub-11_FolderCreate"],
        "Shutdown",
    )));

    assert_eq!(poll.run(), LoopExit::Shutdown);
    assert!(poll.task_client().store().requests.is_empty());
    assert_eq!(status_field(state.path(), &["Manager", "MgrStatus"]), "Stopped");
}

#[test]
fn heartbeat_republishes_status_with_fresh_timestamp() {
    let state = tempdir().expect("state");
    let idle = Settings {
        check_data_folder_create_queue: false,
        ..settings()
    };
    let publisher = RecordingPublisher::default();
    let mut poll = poll_loop(state.path(), idle, ScriptedStore::default())
        .with_tick(Duration::from_millis(1));
    poll.status_mut().snapshot_mut().mgr_status = MgrStatus::Running;
    poll.status_mut()
        .set_publisher(Some(Box::new(publisher.clone())));
    poll.status_mut().set_log_to_msg_queue(true);
    let stopper = stop_later(poll.control(), Duration::from_millis(600));

    assert_eq!(poll.run(), LoopExit::Shutdown);
    stopper.join().expect("stopper");
    assert!(poll.task_client().store().requests.is_empty());

    let documents = publisher.documents();
    let heartbeats: Vec<&String> = documents
        .iter()
        .filter(|raw| document_field(raw, &["Manager", "MgrStatus"]) == "Running")
        .collect();
    assert!(heartbeats.len() >= 2, "heartbeats: {}", heartbeats.len());
    let stamps: Vec<String> = heartbeats
        .iter()
        .map(|raw| document_field(raw, &["Manager", "LastUpdate"]))
        .collect();
    assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]), "{stamps:?}");
    let last = documents.last().expect("final document");
    assert_eq!(document_field(last, &["Manager", "MgrStatus"]), "Stopped");
}

#[test]
fn task_status_moves_through_requesting_running_and_no_task() {
    let state = tempdir().expect("state");
    let root = tempdir().expect("root");
    let payload = v1_payload("9", root.path(), root.path(), "traced");
    let publisher = RecordingPublisher::default();
    let mut poll = poll_loop(state.path(), settings(), ScriptedStore::with_tasks(&[&payload]));
    poll.status_mut()
        .set_publisher(Some(Box::new(publisher.clone())));
    poll.status_mut().set_log_to_msg_queue(true);

    assert!(poll.check_db_queue());

    let documents = publisher.documents();
    let mut transitions: Vec<String> = Vec::new();
    for raw in &documents {
        let status = document_field(raw, &["Task", "Status"]);
        if transitions.last() != Some(&status) {
            transitions.push(status);
        }
    }
    assert_eq!(
        transitions,
        vec!["Requesting", "Running", "No_Task", "Requesting"]
    );

    let running = documents
        .iter()
        .find(|raw| document_field(raw, &["Task", "Status"]) == "Running")
        .expect("running document");
    assert_eq!(document_field(running, &["TaskDetails", "Status"]), "Running_Tool");
    assert_eq!(document_field(running, &["TaskDetails", "Job"]), "1");
    assert_eq!(poll.status().snapshot().task_status, TaskStatus::NoTask);
}
