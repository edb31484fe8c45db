use super::state_paths::StatePaths;
use super::worker_primitives::sleep_with_stop;
use crate::broker::{BrokerError, RestBroker};
use crate::logging::AgentLog;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const FILE_WATCH_INTERVAL: Duration = Duration::from_millis(500);
const BROKER_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    Broadcast(String),
    Stop,
}

/// Single-slot mailbox between control producers and the poll loop. A new
/// message replaces one that has not been taken yet, except that a pending
/// stop is never replaced by a broadcast.
#[derive(Debug, Clone, Default)]
pub struct ControlSlot {
    inner: Arc<Mutex<Option<ControlMessage>>>,
}

impl ControlSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&self, message: ControlMessage) {
        let mut slot = self.lock();
        if matches!(*slot, Some(ControlMessage::Stop))
            && matches!(message, ControlMessage::Broadcast(_))
        {
            return;
        }
        *slot = Some(message);
    }

    pub fn take(&self) -> Option<ControlMessage> {
        self.lock().take()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ControlMessage>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub fn poll_control_files(paths: &StatePaths, slot: &ControlSlot, log: &AgentLog) -> bool {
    let stop_path = paths.stop_signal_path();
    if stop_path.exists() {
        let _ = fs::remove_file(&stop_path);
        log.info("control.stop_file", "Stop file detected");
        slot.post(ControlMessage::Stop);
        return true;
    }

    let drop_path = paths.broadcast_drop_path();
    if !drop_path.is_file() {
        return false;
    }
    let text = match fs::read_to_string(&drop_path) {
        Ok(text) => text,
        Err(err) => {
            log.warn(
                "control.broadcast_file",
                &format!("Unable to read {}: {err}", drop_path.display()),
            );
            return false;
        }
    };
    if let Err(err) = fs::remove_file(&drop_path) {
        log.warn(
            "control.broadcast_file",
            &format!("Unable to remove {}: {err}", drop_path.display()),
        );
    }
    slot.post(ControlMessage::Broadcast(text));
    true
}

pub fn spawn_control_file_watcher(
    paths: StatePaths,
    slot: ControlSlot,
    stop: Arc<AtomicBool>,
    log: AgentLog,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            poll_control_files(&paths, &slot, &log);
            if !sleep_with_stop(&stop, FILE_WATCH_INTERVAL) {
                break;
            }
        }
    })
}

pub fn spawn_broadcast_listener(
    broker: RestBroker,
    slot: ControlSlot,
    stop: Arc<AtomicBool>,
    log: AgentLog,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut failures: u32 = 0;
        while !stop.load(Ordering::Relaxed) {
            match broker.receive_broadcast() {
                Ok(Some(text)) => {
                    failures = 0;
                    slot.post(ControlMessage::Broadcast(text));
                }
                Ok(None) => failures = 0,
                Err(BrokerError::Disposed) => break,
                Err(err) => {
                    failures += 1;
                    if failures == 1 || failures % 20 == 0 {
                        log.warn(
                            "control.broadcast_listener",
                            &format!("Broadcast receive failed (count = {failures}): {err}"),
                        );
                    }
                    if !sleep_with_stop(&stop, BROKER_RETRY_DELAY) {
                        break;
                    }
                }
            }
        }
    })
}
