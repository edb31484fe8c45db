use super::control::{spawn_broadcast_listener, spawn_control_file_watcher, ControlSlot};
use super::poll_loop::{LoopExit, PollLoop};
use super::state_paths::{bootstrap_state_root, StatePaths};
use super::RuntimeError;
use crate::broker::RestBroker;
use crate::config::{load_manager_settings, ConfigError, Settings};
use crate::logging::{AgentLog, LogLevel};
use crate::status::{StatusPublisher, StatusReporter};
use crate::task::{SqliteTaskStore, StoreError, TaskClient};
use std::fs;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;

pub const DEFAULT_LOG_FILE_BASE: &str = "FolderCreate";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOptions {
    pub paths: StatePaths,
    pub trace: bool,
}

pub struct Agent {
    paths: StatePaths,
    log: AgentLog,
    broker: Option<RestBroker>,
    poll: PollLoop<SqliteTaskStore>,
    workers: Vec<JoinHandle<()>>,
}

pub fn load_agent_settings(paths: &StatePaths, log: &AgentLog) -> Result<Settings, ConfigError> {
    let root = paths.root.clone();
    load_manager_settings(&paths.settings_file(), log, |settings| {
        SqliteTaskStore::open(&settings.database_path(&root))
    })
}

pub fn init_manager(options: &AgentOptions) -> Result<Agent, RuntimeError> {
    let paths = options.paths.clone();
    bootstrap_state_root(&paths)?;
    let _ = fs::remove_file(paths.stop_signal_path());

    let boot_log = AgentLog::new(&paths.logs_dir(), DEFAULT_LOG_FILE_BASE, LogLevel::Debug);
    let settings = match load_agent_settings(&paths, &boot_log) {
        Ok(settings) => settings,
        Err(ConfigError::DeactivatedLocally) => {
            boot_log.warn("agent.settings", "Manager deactivated locally");
            record_local_deactivation(&paths, &boot_log);
            return Err(ConfigError::DeactivatedLocally.into());
        }
        Err(err) => {
            boot_log.error("agent.settings", &format!("Unable to initialize manager settings: {err}"));
            return Err(err.into());
        }
    };

    let threshold = if options.trace {
        LogLevel::Debug
    } else {
        LogLevel::from_debug_level(settings.debug_level)
    };
    let log = AgentLog::new(&paths.logs_dir(), &settings.log_file_base, threshold);
    log.info(
        "agent.started",
        &format!(
            "=== Started Package Folder Creation Manager V{} ===",
            env!("CARGO_PKG_VERSION")
        ),
    );

    let mut status = StatusReporter::new(
        &settings.status_file_path(&paths.root),
        &settings.mgr_name,
        log.clone(),
    );

    let store = match open_task_store(&settings, &paths) {
        Ok(store) => store,
        Err(err) => {
            log.error("agent.store", &format!("Unable to open task store: {err}"));
            status.update_stopped(true);
            return Err(err.into());
        }
    };

    let broker = if settings.broker.is_configured() {
        match RestBroker::new(&settings.broker, &settings.mgr_name) {
            Ok(broker) => {
                log.debug("agent.broker", "Message handler initialized");
                Some(broker)
            }
            Err(err) => {
                log.error("agent.broker", &format!("Message handler init error: {err}"));
                status.update_stopped(true);
                return Err(err.into());
            }
        }
    } else {
        None
    };

    status.set_log_to_msg_queue(settings.log_status_to_message_queue);
    status.set_publisher(
        broker
            .clone()
            .map(|broker| Box::new(broker) as Box<dyn StatusPublisher>),
    );
    if let Err(err) = status.init_from_file() {
        log.error("agent.status", &format!("Exception reading status file: {err}"));
    }
    status.mark_started();
    log.debug("agent.status", "Status file init complete");

    let task = TaskClient::new(store, &settings.mgr_name, log.clone());
    let reload_paths = paths.clone();
    let reload_log = log.clone();
    let poll = PollLoop::new(settings, task, status, log.clone(), ControlSlot::new())
        .with_trace_mode(options.trace)
        .with_reloader(Box::new(move || {
            load_agent_settings(&reload_paths, &reload_log)
        }));

    Ok(Agent {
        paths,
        log,
        broker,
        poll,
        workers: Vec::new(),
    })
}

fn open_task_store(settings: &Settings, paths: &StatePaths) -> Result<SqliteTaskStore, StoreError> {
    let store = SqliteTaskStore::open(&settings.database_path(&paths.root))?;
    store.ensure_schema()?;
    Ok(store)
}

fn record_local_deactivation(paths: &StatePaths, log: &AgentLog) {
    let Ok(settings) = Settings::from_path(&paths.settings_file()) else {
        return;
    };
    let mut status = StatusReporter::new(
        &settings.status_file_path(&paths.root),
        &settings.mgr_name,
        log.clone(),
    );
    status.update_disabled(true);
}

impl Agent {
    pub fn settings(&self) -> &Settings {
        self.poll.settings()
    }

    pub fn run(mut self) -> LoopExit {
        let stop = self.poll.stop_flag();
        self.workers.push(spawn_control_file_watcher(
            self.paths.clone(),
            self.poll.control().clone(),
            stop.clone(),
            self.log.clone(),
        ));
        if let Some(broker) = &self.broker {
            self.workers.push(spawn_broadcast_listener(
                broker.clone(),
                self.poll.control().clone(),
                stop.clone(),
                self.log.clone(),
            ));
        }

        let exit = self.poll.run();
        self.shutdown();
        exit
    }

    pub fn run_once(mut self) -> bool {
        let drained = if self.poll.settings().mgr_active {
            self.poll.check_db_queue()
        } else {
            true
        };
        self.poll.finish();
        self.shutdown();
        drained
    }

    fn shutdown(&mut self) {
        self.poll.stop_flag().store(true, Ordering::Relaxed);
        if let Some(broker) = &self.broker {
            broker.dispose();
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                self.log.warn("agent.worker", "Control worker panicked");
            }
        }
    }
}
