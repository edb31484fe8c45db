use crate::task::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode yaml for {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid yaml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("settings validation failed: {0}")]
    Settings(String),
    #[error("config file problem, default settings being used")]
    DefaultsInUse,
    #[error("manager deactivated locally")]
    DeactivatedLocally,
    #[error("invalid value `{value}` for manager parameter {name}")]
    InvalidParam { name: String, value: String },
    #[error("excessive failures attempting to retrieve manager settings from database after {attempts} attempts: {source}")]
    ParamsUnavailable {
        attempts: u32,
        #[source]
        source: StoreError,
    },
    #[error("unable to open manager parameter source: {0}")]
    ParamsSourceOpen(#[source] StoreError),
    #[error("settings not found for manager {0}")]
    NoParamsForManager(String),
}
