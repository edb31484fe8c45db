use super::store::{
    CompleteTaskCall, RequestTaskCall, TaskStore, RET_VAL_OK, RET_VAL_TASK_NOT_AVAILABLE,
    SP_NAME_REQUEST_TASK, SP_NAME_SET_COMPLETE,
};
use super::StoreError;
use crate::logging::AgentLog;

pub const TASK_COUNT_TO_PREVIEW: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestTaskResult {
    TaskFound,
    NoTaskFound,
    ResultError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutType {
    Success,
    Failed,
    NotReady,
    NeedToAbortProcessing,
}

impl CloseOutType {
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failed => 1,
            Self::NotReady => 2,
            Self::NeedToAbortProcessing => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvalCode {
    #[default]
    Success,
    Failed,
    NotEvaluated,
}

impl EvalCode {
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failed => 1,
            Self::NotEvaluated => 2,
        }
    }
}

#[derive(Debug)]
pub struct TaskClient<S> {
    store: S,
    manager_name: String,
    log: AgentLog,
    task_id: i64,
    parameters_xml: String,
    task_was_assigned: bool,
    connection_info_logged: bool,
}

impl<S: TaskStore> TaskClient<S> {
    pub fn new(store: S, manager_name: &str, log: AgentLog) -> Self {
        Self {
            store,
            manager_name: manager_name.to_string(),
            log,
            task_id: 0,
            parameters_xml: String::new(),
            task_was_assigned: false,
            connection_info_logged: false,
        }
    }

    pub fn manager_name(&self) -> &str {
        &self.manager_name
    }

    pub fn set_manager_name(&mut self, manager_name: &str) {
        self.manager_name = manager_name.to_string();
    }

    pub fn task_id(&self) -> i64 {
        self.task_id
    }

    pub fn task_parameters_xml(&self) -> &str {
        &self.parameters_xml
    }

    pub fn task_was_assigned(&self) -> bool {
        self.task_was_assigned
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn request_task(&mut self) -> RequestTaskResult {
        self.task_id = 0;
        self.parameters_xml.clear();

        let result = self.request_task_detailed();
        self.task_was_assigned = result == RequestTaskResult::TaskFound;
        result
    }

    fn request_task_detailed(&mut self) -> RequestTaskResult {
        let call = RequestTaskCall {
            processor_name: &self.manager_name,
            info_only: false,
            task_count_to_preview: TASK_COUNT_TO_PREVIEW,
        };

        if !self.connection_info_logged {
            self.log.debug(
                "task.request.connection",
                &format!(
                    "{SP_NAME_REQUEST_TASK} via {}; processor_name={}, info_only={}, task_count_to_preview={}",
                    self.store.describe(),
                    call.processor_name,
                    call.info_only,
                    call.task_count_to_preview
                ),
            );
            self.connection_info_logged = true;
        }

        let reply = match self.store.request_task(&call) {
            Ok(reply) => reply,
            Err(err) => {
                self.report_store_error(
                    "task.request.exception",
                    &format!("Exception requesting folder create task using {SP_NAME_REQUEST_TASK}"),
                    &err,
                );
                return RequestTaskResult::ResultError;
            }
        };

        match reply.return_code {
            RET_VAL_OK => {
                self.task_id = reply.task_id;
                self.parameters_xml = reply.parameters;
                RequestTaskResult::TaskFound
            }
            RET_VAL_TASK_NOT_AVAILABLE => RequestTaskResult::NoTaskFound,
            code => {
                self.log.error(
                    "task.request.failed",
                    &format!(
                        "{SP_NAME_REQUEST_TASK} execution error {code}; Message text = {}",
                        message_or_unknown(&reply.message)
                    ),
                );
                RequestTaskResult::ResultError
            }
        }
    }

    /// Releases the held task. Failures are logged, never raised; the held
    /// task id is cleared either way. Returns whether the store accepted it.
    pub fn close_task(&mut self, outcome: CloseOutType, message: &str, eval: EvalCode) -> bool {
        let task_id = self.task_id;
        if task_id == 0 {
            self.log.warn(
                "task.close.no_task",
                "close_task called while no task is held",
            );
            return false;
        }

        let accepted = self.set_task_complete(task_id, outcome, message, eval);
        if accepted {
            self.log.debug(
                "task.close.ok",
                &format!("Successfully set task complete in database, task_id {task_id}"),
            );
        } else {
            self.log.error(
                "task.close.failed",
                &format!("Error setting task complete in database, task_id {task_id}"),
            );
        }

        self.task_id = 0;
        self.parameters_xml.clear();
        self.task_was_assigned = false;
        accepted
    }

    fn set_task_complete(
        &mut self,
        task_id: i64,
        outcome: CloseOutType,
        message: &str,
        eval: EvalCode,
    ) -> bool {
        let call = CompleteTaskCall {
            task_id,
            completion_code: outcome.code(),
            message,
        };
        self.log.debug(
            "task.close.call",
            &format!(
                "Calling {SP_NAME_SET_COMPLETE}: task_id={task_id}, completion_code={}, eval_code={}",
                call.completion_code,
                eval.code()
            ),
        );

        match self.store.set_task_complete(&call) {
            Ok(reply) if reply.return_code == RET_VAL_OK => true,
            Ok(reply) => {
                self.log.error(
                    "task.close.procedure",
                    &format!(
                        "Error {} setting task complete: {}",
                        reply.return_code,
                        message_or_unknown(&reply.message)
                    ),
                );
                false
            }
            Err(err) => {
                self.report_store_error(
                    "task.close.exception",
                    &format!("Exception setting folder create task complete using {SP_NAME_SET_COMPLETE}"),
                    &err,
                );
                false
            }
        }
    }

    fn report_store_error(&mut self, event: &str, context: &str, err: &StoreError) {
        let message = format!("{context}: {err}");
        self.log.error(event, &message);
        if err.is_permission_denied() {
            if let Err(post_err) = self
                .store
                .post_log_entry(&self.manager_name, "Error", &message)
            {
                self.log.warn(
                    "task.db_log.failed",
                    &format!("Unable to mirror error to database log: {post_err}"),
                );
            }
        }
    }
}

fn message_or_unknown(message: &str) -> &str {
    if message.trim().is_empty() {
        "Unknown error"
    } else {
        message
    }
}
