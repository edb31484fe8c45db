mod file;
mod publish;
mod snapshot;

pub use file::{StatusError, StatusReporter, MIN_FILE_WRITE_INTERVAL};
pub use publish::StatusPublisher;
pub use snapshot::{
    render_status_xml, ErrorQueue, MgrStatus, StatusSnapshot, TaskStatus, TaskStatusDetail,
};
