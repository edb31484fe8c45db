use super::StoreError;

pub const SP_NAME_REQUEST_TASK: &str = "request_folder_create_task";
pub const SP_NAME_SET_COMPLETE: &str = "set_folder_create_task_complete";

pub const RET_VAL_OK: i32 = 0;
pub const RET_VAL_TASK_NOT_AVAILABLE: i32 = 53000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTaskCall<'a> {
    pub processor_name: &'a str,
    pub info_only: bool,
    pub task_count_to_preview: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestTaskReply {
    pub return_code: i32,
    pub task_id: i64,
    pub parameters: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteTaskCall<'a> {
    pub task_id: i64,
    pub completion_code: i32,
    pub message: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcedureReply {
    pub return_code: i32,
    pub message: String,
}

/// The two queue procedures plus the database log the agent writes to.
///
/// `Err` is reserved for transport and driver failures; procedure-level
/// failures come back as a nonzero `return_code`.
pub trait TaskStore {
    fn describe(&self) -> String;

    fn request_task(&mut self, call: &RequestTaskCall<'_>) -> Result<RequestTaskReply, StoreError>;

    fn set_task_complete(
        &mut self,
        call: &CompleteTaskCall<'_>,
    ) -> Result<ProcedureReply, StoreError>;

    fn post_log_entry(
        &mut self,
        posted_by: &str,
        level: &str,
        message: &str,
    ) -> Result<(), StoreError>;
}

impl<T: TaskStore + ?Sized> TaskStore for Box<T> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn request_task(&mut self, call: &RequestTaskCall<'_>) -> Result<RequestTaskReply, StoreError> {
        (**self).request_task(call)
    }

    fn set_task_complete(
        &mut self,
        call: &CompleteTaskCall<'_>,
    ) -> Result<ProcedureReply, StoreError> {
        (**self).set_task_complete(call)
    }

    fn post_log_entry(
        &mut self,
        posted_by: &str,
        level: &str,
        message: &str,
    ) -> Result<(), StoreError> {
        (**self).post_log_entry(posted_by, level, message)
    }
}
