use crate::shared::time::local_stamp;
use chrono::Local;
use std::collections::VecDeque;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }

    /// Maps the numeric `debug_level` setting: 4 is info, 5 is debug.
    pub fn from_debug_level(level: u8) -> Self {
        match level {
            0..=2 => Self::Error,
            3 => Self::Warn,
            4 => Self::Info,
            _ => Self::Debug,
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::Error => 2,
            Self::Warn => 3,
            Self::Info => 4,
            Self::Debug => 5,
        }
    }

    fn from_code(code: u8) -> Self {
        Self::from_debug_level(code)
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogDigest {
    pub most_recent: Option<String>,
    pub errors: VecDeque<String>,
}

impl LogDigest {
    pub const MAX_ERRORS: usize = 4;

    fn record(&mut self, level: LogLevel, entry: String) {
        if level == LogLevel::Error {
            self.errors.push_back(entry.clone());
            while self.errors.len() > Self::MAX_ERRORS {
                self.errors.pop_front();
            }
        }
        if !entry.contains("=== Started") && !entry.contains("===== Closing") {
            self.most_recent = Some(entry);
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentLog {
    log_dir: Option<PathBuf>,
    file_base: String,
    threshold: Arc<AtomicU8>,
    digest: Arc<Mutex<LogDigest>>,
}

impl AgentLog {
    pub fn new(log_dir: &Path, file_base: &str, threshold: LogLevel) -> Self {
        Self {
            log_dir: Some(log_dir.to_path_buf()),
            file_base: file_base.to_string(),
            threshold: Arc::new(AtomicU8::new(threshold.code())),
            digest: Arc::new(Mutex::new(LogDigest::default())),
        }
    }

    pub fn console(threshold: LogLevel) -> Self {
        Self {
            log_dir: None,
            file_base: String::new(),
            threshold: Arc::new(AtomicU8::new(threshold.code())),
            digest: Arc::new(Mutex::new(LogDigest::default())),
        }
    }

    pub fn threshold(&self) -> LogLevel {
        LogLevel::from_code(self.threshold.load(Ordering::Relaxed))
    }

    pub fn set_threshold(&self, level: LogLevel) {
        self.threshold.store(level.code(), Ordering::Relaxed);
    }

    pub fn current_log_path(&self) -> Option<PathBuf> {
        let dir = self.log_dir.as_ref()?;
        let date = Local::now().format("%Y-%m-%d");
        Some(dir.join(format!("{}_{date}.log", self.file_base)))
    }

    pub fn debug(&self, event: &str, message: &str) {
        self.log(LogLevel::Debug, event, message);
    }

    pub fn info(&self, event: &str, message: &str) {
        self.log(LogLevel::Info, event, message);
    }

    pub fn warn(&self, event: &str, message: &str) {
        self.log(LogLevel::Warn, event, message);
    }

    pub fn error(&self, event: &str, message: &str) {
        self.log(LogLevel::Error, event, message);
    }

    pub fn log(&self, level: LogLevel, event: &str, message: &str) {
        match level {
            LogLevel::Error => tracing::error!(event, "{message}"),
            LogLevel::Warn => tracing::warn!(event, "{message}"),
            LogLevel::Info => tracing::info!(event, "{message}"),
            LogLevel::Debug => tracing::debug!(event, "{message}"),
        }

        if level > self.threshold() {
            return;
        }

        let now = Local::now();
        let entry = format!("{}; {message}; {level}", local_stamp(now));
        self.digest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .record(level, entry);

        self.append_line(&serde_json::json!({
            "timestamp": now.to_rfc3339(),
            "level": level.as_str(),
            "event": event,
            "message": message,
        }));
    }

    pub fn take_digest(&self) -> LogDigest {
        std::mem::take(
            &mut *self
                .digest
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    fn append_line(&self, payload: &serde_json::Value) {
        let Some(path) = self.current_log_path() else {
            return;
        };
        let Ok(line) = serde_json::to_string(payload) else {
            return;
        };
        if let Some(parent) = path.parent() {
            if fs::create_dir_all(parent).is_err() {
                return;
            }
        }
        let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(path) else {
            return;
        };
        let _ = writeln!(file, "{line}");
    }
}
