pub mod broadcast;
pub mod client;
pub mod error;
pub mod params;
pub mod sqlite_store;
pub mod store;

pub use broadcast::{parse_broadcast_xml, BroadcastCommand, BroadcastVerb};
pub use client::{CloseOutType, EvalCode, RequestTaskResult, TaskClient, TASK_COUNT_TO_PREVIEW};
pub use error::{ParseError, StoreError};
pub use params::{parse_command_xml, CommandParams, ParamMap, ParamsV0, ParamsV1};
pub use sqlite_store::{
    QueueRow, QueueState, SqliteTaskStore, RET_VAL_TASK_NOT_FOUND, RET_VAL_TASK_NOT_IN_PROGRESS,
};
pub use store::{
    CompleteTaskCall, ProcedureReply, RequestTaskCall, RequestTaskReply, TaskStore,
    RET_VAL_OK, RET_VAL_TASK_NOT_AVAILABLE, SP_NAME_REQUEST_TASK, SP_NAME_SET_COMPLETE,
};
