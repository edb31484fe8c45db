use super::control::{ControlMessage, ControlSlot};
use super::worker_primitives::sleep_with_stop;
use crate::config::{ConfigError, Settings};
use crate::folders::{create_directory, FolderOutcome};
use crate::logging::{AgentLog, LogLevel};
use crate::shared::time::local_stamp;
use crate::status::{StatusReporter, TaskStatus, TaskStatusDetail};
use crate::task::{
    parse_broadcast_xml, parse_command_xml, BroadcastVerb, CloseOutType, EvalCode,
    RequestTaskResult, TaskClient, TaskStore,
};
use chrono::Local;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);
pub const HEARTBEAT_TICKS: u32 = 60;
pub const MANAGER_RUNNING_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
pub const QUEUE_SOURCE: &str = "folder_create_queue";

pub type SettingsReloader = Box<dyn FnMut() -> Result<Settings, ConfigError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Shutdown,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlOutcome {
    Continue,
    Exit,
}

pub struct PollLoop<S> {
    settings: Settings,
    task: TaskClient<S>,
    status: StatusReporter,
    log: AgentLog,
    control: ControlSlot,
    stop: Arc<AtomicBool>,
    reloader: Option<SettingsReloader>,
    tick: Duration,
    trace_mode: bool,
}

impl<S: TaskStore> PollLoop<S> {
    pub fn new(
        settings: Settings,
        task: TaskClient<S>,
        status: StatusReporter,
        log: AgentLog,
        control: ControlSlot,
    ) -> Self {
        Self {
            settings,
            task,
            status,
            log,
            control,
            stop: Arc::new(AtomicBool::new(false)),
            reloader: None,
            tick: TICK_INTERVAL,
            trace_mode: false,
        }
    }

    pub fn with_reloader(mut self, reloader: SettingsReloader) -> Self {
        self.reloader = Some(reloader);
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_trace_mode(mut self, trace_mode: bool) -> Self {
        self.trace_mode = trace_mode;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn status(&self) -> &StatusReporter {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut StatusReporter {
        &mut self.status
    }

    pub fn task_client(&self) -> &TaskClient<S> {
        &self.task
    }

    pub fn task_client_mut(&mut self) -> &mut TaskClient<S> {
        &mut self.task
    }

    pub fn control(&self) -> &ControlSlot {
        &self.control
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn run(&mut self) -> LoopExit {
        self.log.debug("poll_loop.start", "Starting poll loop");

        if !self.settings.check_data_folder_create_queue {
            self.log.warn(
                "poll_loop.queue_disabled",
                "Manager parameter CheckDataFolderCreateQueue is false; the database will not be contacted",
            );
        }

        let mut last_poll: Option<Instant> = None;
        let mut last_running_note = Instant::now();
        let mut ticks: u32 = 0;

        while self.settings.mgr_active && !self.stop.load(Ordering::Relaxed) {
            if let Some(message) = self.control.take() {
                if self.handle_control(message) == ControlOutcome::Exit {
                    break;
                }
            }

            ticks += 1;
            if ticks > HEARTBEAT_TICKS {
                ticks = 0;
                self.status.write_status_file();
                if last_running_note.elapsed() > MANAGER_RUNNING_INTERVAL {
                    last_running_note = Instant::now();
                    self.log.info("poll_loop.heartbeat", "Manager running");
                }
            }

            let poll_interval = Duration::from_secs(self.settings.poll_interval_seconds);
            let poll_due = last_poll.map_or(true, |at| at.elapsed() >= poll_interval);
            if self.settings.check_data_folder_create_queue && poll_due {
                self.check_db_queue();
                last_poll = Some(Instant::now());
            }

            if !sleep_with_stop(&self.stop, self.tick) {
                break;
            }
        }

        self.finish()
    }

    pub fn finish(&mut self) -> LoopExit {
        self.log.debug("poll_loop.exit", "Exiting poll loop");
        self.stop.store(true, Ordering::Relaxed);

        let exit = if self.settings.mgr_active {
            self.log.debug("poll_loop.shutdown", "Shutdown cmd received");
            self.status.mark_normal_shutdown();
            LoopExit::Shutdown
        } else {
            self.log.warn(
                "poll_loop.disabled",
                "Disabled via Manager Control database",
            );
            self.status.mark_disabled_by_manager_control();
            LoopExit::Disabled
        };

        self.log.info(
            "poll_loop.exiting",
            "=== Exiting Package Folder Creation Manager ===",
        );
        exit
    }

    pub fn check_db_queue(&mut self) -> bool {
        loop {
            self.status.snapshot_mut().task_status = TaskStatus::Requesting;
            self.status.write_status_file();
            match self.task.request_task() {
                RequestTaskResult::NoTaskFound => {
                    self.status.snapshot_mut().task_status = TaskStatus::NoTask;
                    return true;
                }
                RequestTaskResult::ResultError => {
                    self.status.snapshot_mut().task_status = TaskStatus::NoTask;
                    return false;
                }
                RequestTaskResult::TaskFound => {}
            }

            let task_id = self.task.task_id();
            self.status.snapshot_mut().task_status = TaskStatus::Running;
            self.status.snapshot_mut().job_number = task_id;

            let payload = self.task.task_parameters_xml().to_string();
            let result = self.process_task_payload(&payload, QUEUE_SOURCE);

            self.status.snapshot_mut().task_status = TaskStatus::Closing;
            match result {
                Ok(_) => {
                    self.task
                        .close_task(CloseOutType::Success, "", EvalCode::Success);
                    self.status.snapshot_mut().task_status = TaskStatus::NoTask;
                    self.status.write_status_file();
                }
                Err(message) => {
                    self.task
                        .close_task(CloseOutType::Failed, &message, EvalCode::Failed);
                    self.status.snapshot_mut().task_status = TaskStatus::Failed;
                    self.status.write_status_file();
                    return false;
                }
            }
        }
    }

    pub fn process_task_payload(&mut self, payload: &str, source: &str) -> Result<PathBuf, String> {
        let params = match parse_command_xml(payload) {
            Ok(params) => params,
            Err(err) => {
                let message = "Exception parsing XML command string".to_string();
                self.log.error(
                    "poll_loop.parse",
                    &format!("{message}: {payload}: {err}"),
                );
                self.status.snapshot_mut().task_status = TaskStatus::Failed;
                self.status.write_status_file();
                return Err(format!("{message}: {err}"));
            }
        };
        self.log.debug(
            "poll_loop.params",
            &format!(
                "Command parameters (v{}): {}",
                params.version(),
                params
                    .to_map()
                    .iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        );

        self.status.snapshot_mut().most_recent_job_info = format!(
            "{}; Package {}",
            local_stamp(Local::now()),
            params.package()
        );
        self.status
            .update_detail_and_write(TaskStatusDetail::RunningTool, 0.0);

        let outcome = create_directory(self.settings.perspective(), &params, source, &self.log);
        let snapshot = self.status.snapshot_mut();
        let (result, progress) = match outcome {
            FolderOutcome::Created { path } => {
                snapshot.job_number = 0;
                snapshot.task_status = TaskStatus::NoTask;
                (Ok(path), 100.0)
            }
            failed => {
                snapshot.task_status = TaskStatus::Failed;
                (Err(failed.error_message().unwrap_or_default()), 0.0)
            }
        };
        self.status
            .update_detail_and_write(TaskStatusDetail::NoTask, progress);
        result
    }

    fn handle_control(&mut self, message: ControlMessage) -> ControlOutcome {
        let text = match message {
            ControlMessage::Stop => {
                self.log.info("poll_loop.stop", "Stop signal received");
                return ControlOutcome::Exit;
            }
            ControlMessage::Broadcast(text) => text,
        };

        self.log.debug(
            "poll_loop.broadcast",
            &format!("Broadcast message received: {text}"),
        );
        let command = match parse_broadcast_xml(&text) {
            Ok(command) => command,
            Err(err) => {
                self.log.error(
                    "poll_loop.broadcast.parse",
                    &format!("Exception while parsing broadcast data: {err}"),
                );
                return ControlOutcome::Continue;
            }
        };

        if !command.applies_to(&self.settings.mgr_name) {
            self.log.debug(
                "poll_loop.broadcast.skip",
                "Received command not applicable to this manager instance",
            );
            return ControlOutcome::Continue;
        }

        match command.verb {
            BroadcastVerb::Shutdown => {
                self.log
                    .info("poll_loop.broadcast.shutdown", "Shutdown message received");
                ControlOutcome::Exit
            }
            BroadcastVerb::ReadConfig => {
                self.log.info(
                    "poll_loop.broadcast.read_config",
                    "Reload config message received",
                );
                self.reload_settings();
                if self.settings.mgr_active {
                    ControlOutcome::Continue
                } else {
                    ControlOutcome::Exit
                }
            }
            BroadcastVerb::Unknown(_) => {
                self.log.warn(
                    "poll_loop.broadcast.invalid",
                    &format!("Invalid broadcast command received: {text}"),
                );
                ControlOutcome::Continue
            }
        }
    }

    fn reload_settings(&mut self) {
        let result = match self.reloader.as_mut() {
            Some(reload) => reload(),
            None => {
                self.log.warn(
                    "poll_loop.reload",
                    "No settings source available; keeping current settings",
                );
                return;
            }
        };

        match result {
            Ok(settings) => {
                self.apply_settings(settings);
                self.log.info("poll_loop.reload", "Settings reloaded");
            }
            Err(err) => self.log.error(
                "poll_loop.reload",
                &format!("Unable to reload settings; keeping current settings: {err}"),
            ),
        }
    }

    fn apply_settings(&mut self, settings: Settings) {
        if !self.trace_mode {
            self.log
                .set_threshold(LogLevel::from_debug_level(settings.debug_level));
        }
        self.status
            .set_log_to_msg_queue(settings.log_status_to_message_queue);
        self.status.snapshot_mut().mgr_name = settings.mgr_name.clone();
        self.task.set_manager_name(&settings.mgr_name);
        self.settings = settings;
    }
}
