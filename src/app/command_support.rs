use crate::app::cli::GlobalOptions;
use crate::config::{ConfigError, Settings};
use crate::runtime::{bootstrap_state_root, default_state_root_path, StatePaths};
use crate::task::SqliteTaskStore;

pub fn map_config_err(err: ConfigError) -> String {
    err.to_string()
}

pub fn state_paths(options: &GlobalOptions) -> Result<StatePaths, String> {
    let root = match &options.state_root {
        Some(root) => root.clone(),
        None => default_state_root_path().map_err(|e| e.to_string())?,
    };
    Ok(StatePaths::new(root))
}

pub fn ensure_state_root(options: &GlobalOptions) -> Result<StatePaths, String> {
    let paths = state_paths(options)?;
    bootstrap_state_root(&paths).map_err(|e| e.to_string())?;
    Ok(paths)
}

pub fn read_settings(paths: &StatePaths) -> Result<Settings, String> {
    Settings::from_path(&paths.settings_file()).map_err(map_config_err)
}

pub fn open_store(paths: &StatePaths, settings: &Settings) -> Result<SqliteTaskStore, String> {
    let store =
        SqliteTaskStore::open(&settings.database_path(&paths.root)).map_err(|e| e.to_string())?;
    store.ensure_schema().map_err(|e| e.to_string())?;
    Ok(store)
}
