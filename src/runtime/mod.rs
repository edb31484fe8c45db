pub mod agent;
pub mod control;
pub mod poll_loop;
pub mod state_paths;
mod worker_primitives;

pub use crate::shared::errors::RuntimeError;
pub use agent::{init_manager, load_agent_settings, Agent, AgentOptions, DEFAULT_LOG_FILE_BASE};
pub use control::{
    poll_control_files, spawn_broadcast_listener, spawn_control_file_watcher, ControlMessage,
    ControlSlot,
};
pub use poll_loop::{
    LoopExit, PollLoop, SettingsReloader, HEARTBEAT_TICKS, QUEUE_SOURCE, TICK_INTERVAL,
};
pub use state_paths::{bootstrap_state_root, default_state_root_path, signal_stop, StatePaths};
