pub mod app;
pub mod broker;
pub mod config;
pub mod folders;
pub mod logging;
pub mod runtime;
pub mod shared;
pub mod status;
pub mod task;
