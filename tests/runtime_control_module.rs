use foldercreate::logging::{AgentLog, LogLevel};
use foldercreate::runtime::{
    bootstrap_state_root, poll_control_files, signal_stop, spawn_control_file_watcher,
    ControlMessage, ControlSlot, StatePaths,
};
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::tempdir;

#[test]
fn dropped_broadcast_file_is_consumed_once() {
    let dir = tempdir().expect("tempdir");
    let paths = StatePaths::new(dir.path());
    bootstrap_state_root(&paths).expect("bootstrap");
    fs::write(paths.broadcast_drop_path(), "<root><Message>Shutdown</Message></root>")
        .expect("drop");

    let slot = ControlSlot::new();
    let log = AgentLog::console(LogLevel::Debug);
    assert!(poll_control_files(&paths, &slot, &log));
    assert!(!paths.broadcast_drop_path().exists());
    assert_eq!(
        slot.take(),
        Some(ControlMessage::Broadcast(
            "<root><Message>Shutdown</Message></root>".to_string()
        ))
    );
    assert!(!poll_control_files(&paths, &slot, &log));
    assert!(!slot.is_pending());
}

#[test]
fn watcher_posts_stop_and_exits_on_flag() {
    let dir = tempdir().expect("tempdir");
    let paths = StatePaths::new(dir.path());
    bootstrap_state_root(&paths).expect("bootstrap");
    let slot = ControlSlot::new();
    let stop = Arc::new(AtomicBool::new(false));

    let watcher = spawn_control_file_watcher(
        paths.clone(),
        slot.clone(),
        Arc::clone(&stop),
        AgentLog::console(LogLevel::Debug),
    );
    signal_stop(&paths).expect("signal");

    let deadline = Instant::now() + Duration::from_secs(5);
    while !slot.is_pending() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(slot.take(), Some(ControlMessage::Stop));

    stop.store(true, Ordering::Relaxed);
    watcher.join().expect("watcher exits");
}

#[test]
fn stop_file_is_not_lost_to_a_later_broadcast_file() {
    let dir = tempdir().expect("tempdir");
    let paths = StatePaths::new(dir.path());
    bootstrap_state_root(&paths).expect("bootstrap");
    signal_stop(&paths).expect("signal");
    fs::write(paths.broadcast_drop_path(), "<root><Message>ReadConfig</Message></root>")
        .expect("drop");

    let slot = ControlSlot::new();
    let log = AgentLog::console(LogLevel::Debug);
    assert!(poll_control_files(&paths, &slot, &log));
    assert!(poll_control_files(&paths, &slot, &log));
    assert!(!paths.broadcast_drop_path().exists());
    assert_eq!(slot.take(), Some(ControlMessage::Stop));
    assert!(!slot.is_pending());
}
