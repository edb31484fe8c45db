use crate::app::cli::GlobalOptions;
use crate::app::command_support::{ensure_state_root, open_store, read_settings};
use crate::runtime::{init_manager, signal_stop, AgentOptions, LoopExit, StatePaths};
use crate::shared::xml::parse_fragment;
use std::fs;

fn agent_options(options: &GlobalOptions, paths: StatePaths) -> AgentOptions {
    AgentOptions {
        paths,
        trace: options.trace,
    }
}

pub fn cmd_run(options: &GlobalOptions) -> Result<String, String> {
    let paths = ensure_state_root(options)?;
    let agent = init_manager(&agent_options(options, paths.clone())).map_err(|e| e.to_string())?;
    let mgr_name = agent.settings().mgr_name.clone();
    let exit = agent.run();
    let exit = match exit {
        LoopExit::Shutdown => "shutdown",
        LoopExit::Disabled => "disabled",
    };
    Ok(format!(
        "stopped\nmanager={mgr_name}\nstate_root={}\nexit={exit}",
        paths.root.display()
    ))
}

pub fn cmd_once(options: &GlobalOptions) -> Result<String, String> {
    let paths = ensure_state_root(options)?;
    let agent = init_manager(&agent_options(options, paths)).map_err(|e| e.to_string())?;
    let mgr_name = agent.settings().mgr_name.clone();
    let active = agent.settings().mgr_active;
    if agent.run_once() {
        Ok(format!("drained\nmanager={mgr_name}\nactive={active}"))
    } else {
        Err(format!(
            "queue processing stopped on a failure; see the status file and logs for {mgr_name}"
        ))
    }
}

pub fn cmd_stop(options: &GlobalOptions) -> Result<String, String> {
    let paths = ensure_state_root(options)?;
    signal_stop(&paths).map_err(|e| e.to_string())?;
    Ok(format!(
        "stop requested\nsignal={}",
        paths.stop_signal_path().display()
    ))
}

pub fn cmd_status(options: &GlobalOptions) -> Result<String, String> {
    let paths = ensure_state_root(options)?;
    let settings = read_settings(&paths)?;
    let status_path = settings.status_file_path(&paths.root);

    let mut lines = vec![
        format!("state_root={}", paths.root.display()),
        format!("manager={}", settings.mgr_name),
        format!("status_file={}", status_path.display()),
    ];

    if status_path.is_file() {
        let raw = fs::read_to_string(&status_path)
            .map_err(|e| format!("failed to read {}: {e}", status_path.display()))?;
        let doc = parse_fragment(&raw)
            .map_err(|e| format!("failed to parse {}: {e}", status_path.display()))?;
        let field = |path: &[&str]| {
            doc.select(path)
                .map(|element| element.inner_text())
                .unwrap_or_default()
        };
        lines.push(format!("mgr_status={}", field(&["Manager", "MgrStatus"])));
        lines.push(format!("last_update={}", field(&["Manager", "LastUpdate"])));
        lines.push(format!("task_status={}", field(&["Task", "Status"])));
        lines.push(format!(
            "most_recent_job_info={}",
            field(&["TaskDetails", "MostRecentJobInfo"])
        ));
        lines.push(format!(
            "recent_errors={}",
            doc.select_all(&["RecentErrorMessages", "ErrMsg"]).len()
        ));
    } else {
        lines.push("mgr_status=unknown".to_string());
    }

    let store = open_store(&paths, &settings)?;
    for (state, count) in store.queue_counts().map_err(|e| e.to_string())? {
        lines.push(format!("queue.{}={count}", state.as_str()));
    }
    Ok(lines.join("\n"))
}
