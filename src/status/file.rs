use super::publish::StatusPublisher;
use super::snapshot::{render_status_xml, MgrStatus, StatusSnapshot, TaskStatus, TaskStatusDetail};
use crate::logging::AgentLog;
use crate::shared::fs_atomic::{replace_file, temp_sibling_path, write_file_synced};
use crate::shared::xml::{parse_fragment, XmlError};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const MIN_FILE_WRITE_INTERVAL: Duration = Duration::from_secs(2);
const WRITE_FAILURE_LOG_THRESHOLD: u32 = 5;
const PUBLISH_FAILURE_LOG_THRESHOLD: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("failed to render status xml: {0}")]
    Render(String),
    #[error("failed to read status file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse status file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: XmlError,
    },
}

pub struct StatusReporter {
    path: PathBuf,
    snapshot: StatusSnapshot,
    log: AgentLog,
    publisher: Option<Box<dyn StatusPublisher>>,
    log_to_msg_queue: bool,
    last_file_write: Option<Instant>,
    write_failures: u32,
    publish_failures: u32,
}

impl StatusReporter {
    pub fn new(path: &Path, mgr_name: &str, log: AgentLog) -> Self {
        Self {
            path: path.to_path_buf(),
            snapshot: StatusSnapshot::new(mgr_name),
            log,
            publisher: None,
            log_to_msg_queue: false,
            last_file_write: None,
            write_failures: 0,
            publish_failures: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> &StatusSnapshot {
        &self.snapshot
    }

    pub fn snapshot_mut(&mut self) -> &mut StatusSnapshot {
        &mut self.snapshot
    }

    pub fn set_publisher(&mut self, publisher: Option<Box<dyn StatusPublisher>>) {
        self.publisher = publisher;
    }

    pub fn set_log_to_msg_queue(&mut self, enabled: bool) {
        self.log_to_msg_queue = enabled;
    }

    pub fn log_to_msg_queue(&self) -> bool {
        self.log_to_msg_queue
    }

    pub fn publish_failures(&self) -> u32 {
        self.publish_failures
    }

    pub fn write_failures(&self) -> u32 {
        self.write_failures
    }

    pub fn init_from_file(&mut self) -> Result<(), StatusError> {
        if !self.path.is_file() {
            return Ok(());
        }
        let raw = fs::read_to_string(&self.path).map_err(|source| StatusError::Read {
            path: self.path.display().to_string(),
            source,
        })?;
        let doc = parse_fragment(&raw).map_err(|source| StatusError::Parse {
            path: self.path.display().to_string(),
            source,
        })?;

        if let Some(message) = doc.select(&["Task", "TaskDetails", "MostRecentLogMessage"]) {
            let message = message.inner_text();
            if !message.contains("=== Started") && !message.contains("===== Closing") {
                self.snapshot.most_recent_log_message = message;
            }
        }
        if let Some(job_info) = doc.select(&["Task", "TaskDetails", "MostRecentJobInfo"]) {
            self.snapshot.most_recent_job_info = job_info.inner_text();
        }
        for error in doc.select_all(&["Manager", "RecentErrorMessages", "ErrMsg"]) {
            self.snapshot.errors.push(error.inner_text());
        }
        Ok(())
    }

    pub fn absorb_log_digest(&mut self) {
        let digest = self.log.take_digest();
        if let Some(message) = digest.most_recent {
            self.snapshot.most_recent_log_message = message;
        }
        for error in digest.errors {
            self.snapshot.errors.push(error);
        }
    }

    /// Renders the snapshot, writes it to disk at most once per
    /// [`MIN_FILE_WRITE_INTERVAL`] and publishes it when enabled.
    pub fn write_status_file(&mut self) {
        self.absorb_log_digest();
        let xml = match render_status_xml(&self.snapshot, Utc::now(), std::process::id()) {
            Ok(xml) => {
                self.write_to_disk(&xml);
                xml
            }
            Err(err) => {
                self.log.warn(
                    "status.render",
                    &format!("Error generating status info: {err}"),
                );
                String::new()
            }
        };

        if self.log_to_msg_queue {
            self.publish(&xml);
        }
    }

    pub fn write_status_file_now(&mut self) {
        self.last_file_write = None;
        self.write_status_file();
    }

    pub fn update_detail_and_write(&mut self, detail: TaskStatusDetail, percent_complete: f32) {
        self.snapshot.task_status_detail = detail;
        self.snapshot.progress = percent_complete;
        self.write_status_file();
    }

    pub fn update_stopped(&mut self, mgr_error: bool) {
        self.snapshot.clear_cached_info();
        self.snapshot.mgr_status = if mgr_error {
            MgrStatus::StoppedError
        } else {
            MgrStatus::Stopped
        };
        self.reset_task_state();
        self.write_status_file();
    }

    pub fn update_disabled(&mut self, disabled_locally: bool) {
        self.snapshot.clear_cached_info();
        self.snapshot.mgr_status = if disabled_locally {
            MgrStatus::DisabledLocal
        } else {
            MgrStatus::DisabledMc
        };
        self.reset_task_state();
        self.write_status_file();
    }

    pub fn mark_started(&mut self) {
        self.snapshot.task_start_time = Utc::now();
        self.set_idle_manager_status(MgrStatus::Running);
        self.write_status_file_now();
    }

    pub fn mark_normal_shutdown(&mut self) {
        self.set_idle_manager_status(MgrStatus::Stopped);
        self.write_status_file_now();
    }

    pub fn mark_disabled_by_manager_control(&mut self) {
        self.set_idle_manager_status(MgrStatus::DisabledMc);
        self.write_status_file_now();
    }

    fn set_idle_manager_status(&mut self, status: MgrStatus) {
        self.snapshot.mgr_status = status;
        self.snapshot.tool = "NA".to_string();
        self.snapshot.dataset = "NA".to_string();
        self.snapshot.current_operation.clear();
        self.reset_task_state();
    }

    fn reset_task_state(&mut self) {
        self.snapshot.task_status = TaskStatus::NoTask;
        self.snapshot.task_status_detail = TaskStatusDetail::NoTask;
    }

    fn write_to_disk(&mut self, xml: &str) -> bool {
        let now = Instant::now();
        if let Some(last) = self.last_file_write {
            if now.duration_since(last) < MIN_FILE_WRITE_INTERVAL {
                return false;
            }
        }
        self.last_file_write = Some(now);

        let temp_path = temp_sibling_path(&self.path);
        if !self.write_file(&temp_path, xml) {
            let target = self.path.clone();
            return self.write_file(&target, xml);
        }

        if let Err(err) = replace_file(&temp_path, &self.path) {
            self.log.warn(
                "status.replace",
                &format!(
                    "Unable to move temporary status file {} to {}: {err}",
                    temp_path.display(),
                    self.path.display()
                ),
            );
            let _ = fs::remove_file(&temp_path);
            return false;
        }
        true
    }

    fn write_file(&mut self, path: &Path, xml: &str) -> bool {
        match write_file_synced(path, xml.as_bytes()) {
            Ok(()) => {
                self.write_failures = 0;
                true
            }
            Err(err) => {
                self.write_failures += 1;
                if self.write_failures == WRITE_FAILURE_LOG_THRESHOLD
                    || (self.write_failures > WRITE_FAILURE_LOG_THRESHOLD
                        && self.write_failures % 10 == 0)
                {
                    self.log.warn(
                        "status.write",
                        &format!("Error writing status file {}: {err}", path.display()),
                    );
                }
                false
            }
        }
    }

    fn publish(&mut self, xml: &str) {
        let Some(publisher) = self.publisher.as_mut() else {
            return;
        };
        match publisher.publish_status(xml) {
            Ok(()) => self.publish_failures = 0,
            Err(err) => {
                self.publish_failures += 1;
                if self.publish_failures <= PUBLISH_FAILURE_LOG_THRESHOLD
                    || self.publish_failures % 20 == 0
                {
                    self.log.error(
                        "status.publish",
                        &format!(
                            "Exception sending status message to broker; count = {}: {err}",
                            self.publish_failures
                        ),
                    );
                }
            }
        }
    }
}
