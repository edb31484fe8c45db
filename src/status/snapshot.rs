use super::file::StatusError;
use crate::shared::time::{iso8601_millis, local_clock};
use chrono::{DateTime, Local, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::VecDeque;
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MgrStatus {
    #[default]
    Stopped,
    StoppedError,
    Running,
    DisabledLocal,
    DisabledMc,
}

impl MgrStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::StoppedError => "Stopped_Error",
            Self::Running => "Running",
            Self::DisabledLocal => "Disabled_Local",
            Self::DisabledMc => "Disabled_MC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskStatus {
    Stopped,
    Requesting,
    Running,
    Closing,
    Failed,
    #[default]
    NoTask,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Requesting => "Requesting",
            Self::Running => "Running",
            Self::Closing => "Closing",
            Self::Failed => "Failed",
            Self::NoTask => "No_Task",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskStatusDetail {
    RetrievingResources,
    RunningTool,
    PackagingResults,
    DeliveringResults,
    #[default]
    NoTask,
}

impl TaskStatusDetail {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RetrievingResources => "Retrieving_Resources",
            Self::RunningTool => "Running_Tool",
            Self::PackagingResults => "Packaging_Results",
            Self::DeliveringResults => "Delivering_Results",
            Self::NoTask => "No_Task",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorQueue {
    entries: VecDeque<String>,
}

impl ErrorQueue {
    pub const CAPACITY: usize = 4;

    pub fn push(&mut self, message: impl Into<String>) {
        self.entries.push_back(message.into());
        while self.entries.len() > Self::CAPACITY {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub mgr_name: String,
    pub mgr_status: MgrStatus,
    pub task_status: TaskStatus,
    pub task_status_detail: TaskStatusDetail,
    pub task_start_time: DateTime<Utc>,
    pub progress: f32,
    pub current_operation: String,
    pub tool: String,
    pub job_number: i64,
    pub job_step: i32,
    pub dataset: String,
    pub most_recent_job_info: String,
    pub most_recent_log_message: String,
    pub errors: ErrorQueue,
}

impl StatusSnapshot {
    pub fn new(mgr_name: &str) -> Self {
        Self {
            mgr_name: mgr_name.to_string(),
            mgr_status: MgrStatus::default(),
            task_status: TaskStatus::default(),
            task_status_detail: TaskStatusDetail::default(),
            task_start_time: Utc::now(),
            progress: 0.0,
            current_operation: String::new(),
            tool: String::new(),
            job_number: 0,
            job_step: 0,
            dataset: String::new(),
            most_recent_job_info: String::new(),
            most_recent_log_message: String::new(),
            errors: ErrorQueue::default(),
        }
    }

    pub fn clear_cached_info(&mut self) {
        self.progress = 0.0;
        self.dataset.clear();
        self.job_number = 0;
        self.job_step = 0;
        self.tool.clear();
    }

    pub fn run_time_hours(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = now.signed_duration_since(self.task_start_time);
        elapsed.num_milliseconds().max(0) as f64 / 3_600_000.0
    }
}

pub fn render_status_xml(
    snapshot: &StatusSnapshot,
    now: DateTime<Utc>,
    process_id: u32,
) -> Result<String, StatusError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    let run_time_hours = snapshot.run_time_hours(now);

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)),
    )?;
    comment(&mut writer, "Package Folder Create manager status")?;
    open(&mut writer, "Root")?;

    open(&mut writer, "Manager")?;
    element(&mut writer, "MgrName", &snapshot.mgr_name)?;
    element(&mut writer, "MgrStatus", snapshot.mgr_status.as_str())?;
    comment(
        &mut writer,
        &format!(
            "Local status log time: {}",
            local_clock(now.with_timezone(&Local))
        ),
    )?;
    comment(
        &mut writer,
        &format!(
            "Local last start time: {}",
            local_clock(snapshot.task_start_time.with_timezone(&Local))
        ),
    )?;
    element(&mut writer, "LastUpdate", &iso8601_millis(now))?;
    element(
        &mut writer,
        "LastStartTime",
        &iso8601_millis(snapshot.task_start_time),
    )?;
    element(&mut writer, "CPUUtilization", "0.0")?;
    element(&mut writer, "FreeMemoryMB", "0.0")?;
    element(&mut writer, "ProcessID", &process_id.to_string())?;
    open(&mut writer, "RecentErrorMessages")?;
    for message in snapshot.errors.iter() {
        element(&mut writer, "ErrMsg", message)?;
    }
    close(&mut writer, "RecentErrorMessages")?;
    close(&mut writer, "Manager")?;

    open(&mut writer, "Task")?;
    element(&mut writer, "Tool", &snapshot.tool)?;
    element(&mut writer, "Status", snapshot.task_status.as_str())?;
    element(&mut writer, "Duration", &format!("{run_time_hours:.2}"))?;
    element(
        &mut writer,
        "DurationMinutes",
        &format!("{:.1}", run_time_hours * 60.0),
    )?;
    element(&mut writer, "Progress", &format!("{:.2}", snapshot.progress))?;
    element(&mut writer, "CurrentOperation", &snapshot.current_operation)?;
    open(&mut writer, "TaskDetails")?;
    element(&mut writer, "Status", snapshot.task_status_detail.as_str())?;
    element(&mut writer, "Job", &snapshot.job_number.to_string())?;
    element(&mut writer, "Step", &snapshot.job_step.to_string())?;
    element(&mut writer, "Dataset", &snapshot.dataset)?;
    element(
        &mut writer,
        "MostRecentLogMessage",
        &snapshot.most_recent_log_message,
    )?;
    element(
        &mut writer,
        "MostRecentJobInfo",
        &snapshot.most_recent_job_info,
    )?;
    close(&mut writer, "TaskDetails")?;
    close(&mut writer, "Task")?;

    close(&mut writer, "Root")?;

    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|err| StatusError::Render(err.to_string()))
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn emit(writer: &mut XmlWriter, event: Event<'_>) -> Result<(), StatusError> {
    writer
        .write_event(event)
        .map_err(|err| StatusError::Render(err.to_string()))
}

fn open(writer: &mut XmlWriter, name: &str) -> Result<(), StatusError> {
    emit(writer, Event::Start(BytesStart::new(name)))
}

fn close(writer: &mut XmlWriter, name: &str) -> Result<(), StatusError> {
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn comment(writer: &mut XmlWriter, text: &str) -> Result<(), StatusError> {
    emit(
        writer,
        Event::Comment(BytesText::from_escaped(format!(" {text} "))),
    )
}

fn element(writer: &mut XmlWriter, name: &str, value: &str) -> Result<(), StatusError> {
    open(writer, name)?;
    // An empty text event keeps the closing tag on the same line.
    emit(writer, Event::Text(BytesText::new(value)))?;
    close(writer, name)
}
