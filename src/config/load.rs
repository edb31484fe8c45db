use super::{ConfigError, Settings};
use crate::logging::AgentLog;
use crate::task::StoreError;
use std::path::Path;
use std::time::Duration;

pub const DB_PARAM_ATTEMPTS: u32 = 3;

pub trait ManagerParamSource {
    fn manager_params(&mut self, manager_name: &str) -> Result<Vec<(String, String)>, StoreError>;
}

pub fn load_manager_settings<P, F>(
    path: &Path,
    log: &AgentLog,
    open_params: F,
) -> Result<Settings, ConfigError>
where
    P: ManagerParamSource,
    F: FnOnce(&Settings) -> Result<P, StoreError>,
{
    let mut settings = Settings::from_path(path)?;
    settings.validate()?;

    if settings.load_params_from_db {
        let mut source = open_params(&settings).map_err(ConfigError::ParamsSourceOpen)?;
        overlay_manager_params(&mut settings, &mut source, log)?;
        settings.validate()?;
    }
    Ok(settings)
}

/// Replaces settings with matching manager parameters. Fetching is retried
/// up to [`DB_PARAM_ATTEMPTS`] times; returns how many parameters applied.
pub fn overlay_manager_params(
    settings: &mut Settings,
    source: &mut dyn ManagerParamSource,
    log: &AgentLog,
) -> Result<usize, ConfigError> {
    let delay = Duration::from_millis(settings.db_params_retry_delay_ms);
    let manager_name = settings.mgr_name.clone();

    let mut attempt = 0;
    let rows = loop {
        attempt += 1;
        match source.manager_params(&manager_name) {
            Ok(rows) => break rows,
            Err(err) => {
                let remaining = DB_PARAM_ATTEMPTS - attempt;
                log.error(
                    "config.db_params",
                    &format!(
                        "Exception getting manager settings from database: {err}, RetryCount = {remaining}"
                    ),
                );
                if remaining == 0 {
                    return Err(ConfigError::ParamsUnavailable {
                        attempts: attempt,
                        source: err,
                    });
                }
                std::thread::sleep(delay);
            }
        }
    };

    if rows.is_empty() {
        return Err(ConfigError::NoParamsForManager(manager_name));
    }

    let mut applied = 0;
    for (name, value) in &rows {
        if settings.apply_param(name, value)? {
            applied += 1;
        } else {
            log.debug(
                "config.db_params.ignored",
                &format!("Ignoring manager parameter {name}"),
            );
        }
    }
    Ok(applied)
}
