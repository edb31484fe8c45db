use super::ConfigError;
use crate::folders::Perspective;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const COMPUTER_NAME_TOKEN: &str = "$ComputerName$";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BrokerSettings {
    #[serde(default)]
    pub uri: String,
    #[serde(default = "default_status_topic")]
    pub status_topic: String,
    #[serde(default = "default_broadcast_topic")]
    pub broadcast_topic: String,
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            uri: String::new(),
            status_topic: default_status_topic(),
            broadcast_topic: default_broadcast_topic(),
            poll_timeout_ms: default_poll_timeout_ms(),
        }
    }
}

impl BrokerSettings {
    pub fn is_configured(&self) -> bool {
        !self.uri.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default = "default_mgr_name")]
    pub mgr_name: String,
    #[serde(default = "default_true")]
    pub mgr_active_local: bool,
    #[serde(default)]
    pub using_defaults: bool,
    #[serde(default = "default_true")]
    pub mgr_active: bool,
    #[serde(default = "default_true")]
    pub check_data_folder_create_queue: bool,
    #[serde(default = "default_perspective")]
    pub perspective: String,
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_debug_level")]
    pub debug_level: u8,
    #[serde(default = "default_log_file_base")]
    pub log_file_base: String,
    #[serde(default)]
    pub status_file: Option<PathBuf>,
    #[serde(default)]
    pub log_status_to_message_queue: bool,
    #[serde(default)]
    pub broker: BrokerSettings,
    #[serde(default)]
    pub load_params_from_db: bool,
    #[serde(default = "default_db_params_retry_delay_ms")]
    pub db_params_retry_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mgr_name: default_mgr_name(),
            mgr_active_local: true,
            using_defaults: false,
            mgr_active: true,
            check_data_folder_create_queue: true,
            perspective: default_perspective(),
            database_path: None,
            poll_interval_seconds: default_poll_interval_seconds(),
            debug_level: default_debug_level(),
            log_file_base: default_log_file_base(),
            status_file: None,
            log_status_to_message_queue: false,
            broker: BrokerSettings::default(),
            load_params_from_db: false,
            db_params_retry_delay_ms: default_db_params_retry_delay_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_mgr_name() -> String {
    format!("{COMPUTER_NAME_TOKEN}_FolderCreate")
}

fn default_perspective() -> String {
    "server".to_string()
}

fn default_poll_interval_seconds() -> u64 {
    30
}

fn default_debug_level() -> u8 {
    4
}

fn default_log_file_base() -> String {
    "FolderCreate".to_string()
}

fn default_db_params_retry_delay_ms() -> u64 {
    5_000
}

fn default_status_topic() -> String {
    "Manager.Status".to_string()
}

fn default_broadcast_topic() -> String {
    "MgrCtl.Broadcast".to_string()
}

fn default_poll_timeout_ms() -> u64 {
    5_000
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut settings: Self =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        settings.mgr_name = resolve_computer_name(&settings.mgr_name);
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.using_defaults {
            return Err(ConfigError::DefaultsInUse);
        }
        if !self.mgr_active_local {
            return Err(ConfigError::DeactivatedLocally);
        }
        if self.mgr_name.trim().is_empty() {
            return Err(ConfigError::Settings(
                "`mgr_name` must be non-empty".to_string(),
            ));
        }
        if self.poll_interval_seconds == 0 {
            return Err(ConfigError::Settings(
                "`poll_interval_seconds` must be greater than 0".to_string(),
            ));
        }
        if self.log_file_base.trim().is_empty() {
            return Err(ConfigError::Settings(
                "`log_file_base` must be non-empty".to_string(),
            ));
        }
        if self.log_status_to_message_queue && !self.broker.is_configured() {
            return Err(ConfigError::Settings(
                "`broker.uri` is required when `log_status_to_message_queue` is true".to_string(),
            ));
        }
        Ok(())
    }

    pub fn perspective(&self) -> Perspective {
        Perspective::parse(&self.perspective)
    }

    pub fn database_path(&self, state_root: &Path) -> PathBuf {
        resolve_under(state_root, self.database_path.as_deref(), "foldercreate.db")
    }

    pub fn status_file_path(&self, state_root: &Path) -> PathBuf {
        resolve_under(state_root, self.status_file.as_deref(), "Status.xml")
    }

    pub fn apply_param(&mut self, name: &str, value: &str) -> Result<bool, ConfigError> {
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "mgrname" => self.mgr_name = resolve_computer_name(value),
            "mgractive" => self.mgr_active = parse_bool(name, value)?,
            "mgractive_local" => self.mgr_active_local = parse_bool(name, value)?,
            "checkdatafoldercreatequeue" => {
                self.check_data_folder_create_queue = parse_bool(name, value)?
            }
            "perspective" => self.perspective = value.to_string(),
            "connectionstring" => self.database_path = Some(PathBuf::from(value)),
            "logfilename" => self.log_file_base = value.to_string(),
            "debuglevel" => {
                self.debug_level = value.parse().map_err(|_| invalid_param(name, value))?
            }
            "logstatustomessagequeue" => {
                self.log_status_to_message_queue = parse_bool(name, value)?
            }
            "messagequeueuri" => self.broker.uri = value.to_string(),
            "broadcastqueuetopic" => self.broker.broadcast_topic = value.to_string(),
            "messagequeuetopicmgrstatus" => self.broker.status_topic = value.to_string(),
            _ => return Ok(false),
        }
        Ok(true)
    }
}

fn resolve_under(state_root: &Path, configured: Option<&Path>, default_name: &str) -> PathBuf {
    match configured {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => state_root.join(path),
        None => state_root.join(default_name),
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(invalid_param(name, value))
    }
}

fn invalid_param(name: &str, value: &str) -> ConfigError {
    ConfigError::InvalidParam {
        name: name.to_string(),
        value: value.to_string(),
    }
}

fn resolve_computer_name(raw: &str) -> String {
    if !raw.contains(COMPUTER_NAME_TOKEN) {
        return raw.to_string();
    }
    let host = ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.trim().is_empty())
        .or_else(|| {
            fs::read_to_string("/etc/hostname")
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        })
        .unwrap_or_else(|| "localhost".to_string());
    raw.replace(COMPUTER_NAME_TOKEN, host.trim())
}
