use crate::app::cli::GlobalOptions;
use crate::app::command_support::{ensure_state_root, map_config_err, open_store, read_settings};
use crate::config::{save_settings, Settings};
use crate::task::parse_command_xml;
use std::fs;

pub fn cmd_init_db(options: &GlobalOptions) -> Result<String, String> {
    let paths = ensure_state_root(options)?;
    let settings_path = paths.settings_file();
    let created_settings = !settings_path.exists();
    if created_settings {
        save_settings(&settings_path, &Settings::default()).map_err(map_config_err)?;
    }

    let settings = read_settings(&paths)?;
    let store = open_store(&paths, &settings)?;
    Ok(format!(
        "initialized\nsettings={}\nsettings_created={created_settings}\ndatabase={}",
        settings_path.display(),
        store.db_path().display()
    ))
}

pub fn cmd_enqueue(options: &GlobalOptions, args: &[String]) -> Result<String, String> {
    let payload = match args {
        [flag, path] if flag == "--file" => {
            fs::read_to_string(path).map_err(|e| format!("failed to read {path}: {e}"))?
        }
        [xml] => xml.clone(),
        _ => return Err("usage: enqueue <xml> | enqueue --file <path>".to_string()),
    };

    let params = parse_command_xml(&payload)
        .map_err(|e| format!("invalid folder create command: {e}"))?;

    let paths = ensure_state_root(options)?;
    let settings = read_settings(&paths)?;
    let store = open_store(&paths, &settings)?;
    let task_id = store.enqueue(&payload).map_err(|e| e.to_string())?;
    Ok(format!(
        "enqueued\ntask_id={task_id}\npackage={}\nversion={}",
        params.package(),
        params.version()
    ))
}

pub fn cmd_set_param(options: &GlobalOptions, args: &[String]) -> Result<String, String> {
    let (manager, name, value) = match args {
        [flag, manager, name, value] if flag == "--manager" => {
            (Some(manager.clone()), name, value)
        }
        [name, value] => (None, name, value),
        _ => return Err("usage: set-param [--manager <name>] <param> <value>".to_string()),
    };

    let paths = ensure_state_root(options)?;
    let settings = read_settings(&paths)?;
    let mut candidate = settings.clone();
    candidate.apply_param(name, value).map_err(map_config_err)?;

    let manager = manager.unwrap_or_else(|| settings.mgr_name.clone());
    let store = open_store(&paths, &settings)?;
    store
        .set_manager_param(&manager, name, value)
        .map_err(|e| e.to_string())?;
    Ok(format!("param saved\nmanager={manager}\n{name}={value}"))
}
