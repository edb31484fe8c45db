use foldercreate::config::ManagerParamSource;
use foldercreate::task::{
    CompleteTaskCall, QueueState, RequestTaskCall, SqliteTaskStore, TaskStore, RET_VAL_OK,
    RET_VAL_TASK_NOT_AVAILABLE, RET_VAL_TASK_NOT_FOUND, RET_VAL_TASK_NOT_IN_PROGRESS,
};
use tempfile::tempdir;

fn request(processor: &str) -> RequestTaskCall<'_> {
    RequestTaskCall {
        processor_name: processor,
        info_only: false,
        task_count_to_preview: 10,
    }
}

fn open_store(dir: &std::path::Path) -> SqliteTaskStore {
    let store = SqliteTaskStore::open(&dir.join("nested").join("queue.db")).expect("open");
    store.ensure_schema().expect("schema");
    store
}

#[test]
fn tasks_are_claimed_in_order_and_completed() {
    let dir = tempdir().expect("tempdir");
    let mut store = open_store(dir.path());
    let first = store.enqueue("<a/>").expect("first");
    let second = store.enqueue("<b/>").expect("second");

    let reply = store.request_task(&request("mgr-1")).expect("request");
    assert_eq!(reply.return_code, RET_VAL_OK);
    assert_eq!(reply.task_id, first);
    assert_eq!(reply.parameters, "<a/>");

    let row = store.task(first).expect("row").expect("exists");
    assert_eq!(row.state, QueueState::InProgress);
    assert_eq!(row.processor.as_deref(), Some("mgr-1"));

    let done = store
        .set_task_complete(&CompleteTaskCall {
            task_id: first,
            completion_code: 0,
            message: "",
        })
        .expect("complete");
    assert_eq!(done.return_code, RET_VAL_OK);
    assert_eq!(
        store.task(first).expect("row").expect("exists").state,
        QueueState::Complete
    );

    let reply = store.request_task(&request("mgr-1")).expect("request second");
    assert_eq!(reply.task_id, second);
    let failed = store
        .set_task_complete(&CompleteTaskCall {
            task_id: second,
            completion_code: 1,
            message: "Root directory /x not found",
        })
        .expect("fail");
    assert_eq!(failed.return_code, RET_VAL_OK);
    let row = store.task(second).expect("row").expect("exists");
    assert_eq!(row.state, QueueState::Failed);
    assert_eq!(row.completion_code, Some(1));
    assert_eq!(row.completion_message.as_deref(), Some("Root directory /x not found"));

    let empty = store.request_task(&request("mgr-1")).expect("request empty");
    assert_eq!(empty.return_code, RET_VAL_TASK_NOT_AVAILABLE);

    let counts = store.queue_counts().expect("counts");
    assert_eq!(counts, vec![(QueueState::Complete, 1), (QueueState::Failed, 1)]);
}

#[test]
fn completing_unknown_or_idle_task_returns_codes() {
    let dir = tempdir().expect("tempdir");
    let mut store = open_store(dir.path());
    let id = store.enqueue("<a/>").expect("enqueue");

    let missing = store
        .set_task_complete(&CompleteTaskCall {
            task_id: 999,
            completion_code: 0,
            message: "",
        })
        .expect("missing");
    assert_eq!(missing.return_code, RET_VAL_TASK_NOT_FOUND);

    let idle = store
        .set_task_complete(&CompleteTaskCall {
            task_id: id,
            completion_code: 0,
            message: "",
        })
        .expect("idle");
    assert_eq!(idle.return_code, RET_VAL_TASK_NOT_IN_PROGRESS);
}

#[test]
fn manager_params_and_log_entries_persist() {
    let dir = tempdir().expect("tempdir");
    let mut store = open_store(dir.path());
    store
        .set_manager_param("mgr-1", "perspective", "server")
        .expect("set");
    store
        .set_manager_param("mgr-1", "perspective", "client")
        .expect("overwrite");
    store
        .set_manager_param("mgr-2", "debuglevel", "5")
        .expect("other manager");

    let params = store.manager_params("mgr-1").expect("params");
    assert_eq!(params, vec![("perspective".to_string(), "client".to_string())]);

    store
        .post_log_entry("mgr-1", "Error", "permission was denied")
        .expect("post");
    assert_eq!(
        store.log_entries().expect("entries"),
        vec![("Error".to_string(), "permission was denied".to_string())]
    );
    assert!(store.describe().starts_with("sqlite:"));
}
