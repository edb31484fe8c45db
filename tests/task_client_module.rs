mod support;

use foldercreate::logging::{AgentLog, LogLevel};
use foldercreate::task::{
    CloseOutType, EvalCode, ProcedureReply, RequestTaskReply, RequestTaskResult, StoreError,
    TaskClient,
};
use support::ScriptedStore;

fn client(store: ScriptedStore) -> TaskClient<ScriptedStore> {
    TaskClient::new(store, "Pub-10_FolderCreate", AgentLog::console(LogLevel::Debug))
}

#[test]
fn found_task_is_held_until_closed() {
    let mut task = client(ScriptedStore::with_tasks(&["<root/>"]));

    assert_eq!(task.request_task(), RequestTaskResult::TaskFound);
    assert_eq!(task.task_id(), 1);
    assert_eq!(task.task_parameters_xml(), "<root/>");
    assert!(task.task_was_assigned());
    assert_eq!(task.store().requests, vec!["Pub-10_FolderCreate"]);

    assert!(task.close_task(CloseOutType::Success, "", EvalCode::Success));
    assert_eq!(task.task_id(), 0);
    assert_eq!(task.task_parameters_xml(), "");
    assert!(!task.task_was_assigned());
    assert_eq!(task.store().completions, vec![(1, 0, String::new())]);
}

#[test]
fn empty_queue_reports_no_task() {
    let mut task = client(ScriptedStore::default());
    assert_eq!(task.request_task(), RequestTaskResult::NoTaskFound);
    assert_eq!(task.task_id(), 0);
    assert!(!task.task_was_assigned());
}

#[test]
fn unexpected_return_code_is_an_error() {
    let mut store = ScriptedStore::default();
    store.push_reply(Ok(RequestTaskReply {
        return_code: 50001,
        ..RequestTaskReply::default()
    }));
    let log = AgentLog::console(LogLevel::Debug);
    let mut task = TaskClient::new(store, "mgr", log.clone());

    assert_eq!(task.request_task(), RequestTaskResult::ResultError);
    let digest = log.take_digest();
    assert!(digest.errors[0].contains("execution error 50001"));
    assert!(digest.errors[0].contains("Unknown error"));
}

#[test]
fn permission_denied_is_mirrored_to_database_log() {
    let mut store = ScriptedStore::default();
    store.push_reply(Err(StoreError::Unavailable(
        "The EXECUTE permission was denied on the object".to_string(),
    )));
    store.push_reply(Err(StoreError::Unavailable("network down".to_string())));
    let mut task = client(store);

    assert_eq!(task.request_task(), RequestTaskResult::ResultError);
    assert_eq!(task.request_task(), RequestTaskResult::ResultError);

    let entries = &task.store().log_entries;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, "Pub-10_FolderCreate");
    assert_eq!(entries[0].1, "Error");
    assert!(entries[0].2.contains("permission was denied"));
}

#[test]
fn failed_close_clears_held_task() {
    let mut store = ScriptedStore::with_tasks(&["<root/>"]);
    store.complete_replies.push_back(Ok(ProcedureReply {
        return_code: 53101,
        message: String::new(),
    }));
    let mut task = client(store);

    assert_eq!(task.request_task(), RequestTaskResult::TaskFound);
    assert!(!task.close_task(CloseOutType::Failed, "boom", EvalCode::Failed));
    assert_eq!(task.task_id(), 0);
    assert_eq!(task.store().completions, vec![(1, 1, "boom".to_string())]);
}

#[test]
fn closing_without_task_does_not_touch_store() {
    let mut task = client(ScriptedStore::default());
    assert!(!task.close_task(CloseOutType::Success, "", EvalCode::default()));
    assert!(task.store().completions.is_empty());
}

#[test]
fn close_codes_match_procedure_contract() {
    assert_eq!(CloseOutType::Success.code(), 0);
    assert_eq!(CloseOutType::Failed.code(), 1);
    assert_eq!(CloseOutType::NotReady.code(), 2);
    assert_eq!(CloseOutType::NeedToAbortProcessing.code(), 3);
    assert_eq!(EvalCode::NotEvaluated.code(), 2);
}
