#![allow(dead_code)]

use foldercreate::broker::BrokerError;
use foldercreate::status::StatusPublisher;
use foldercreate::task::{
    CompleteTaskCall, ProcedureReply, RequestTaskCall, RequestTaskReply, StoreError, TaskStore,
    RET_VAL_OK, RET_VAL_TASK_NOT_AVAILABLE,
};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// In-memory queue that hands out scripted payloads and records every call.
#[derive(Debug, Default)]
pub struct ScriptedStore {
    pub pending: VecDeque<Result<RequestTaskReply, StoreError>>,
    pub requests: Vec<String>,
    pub completions: Vec<(i64, i32, String)>,
    pub complete_replies: VecDeque<Result<ProcedureReply, StoreError>>,
    pub log_entries: Vec<(String, String, String)>,
}

impl ScriptedStore {
    pub fn with_tasks(payloads: &[&str]) -> Self {
        let mut store = Self::default();
        for (index, payload) in payloads.iter().enumerate() {
            store.push_task(index as i64 + 1, payload);
        }
        store
    }

    pub fn push_task(&mut self, task_id: i64, payload: &str) {
        self.pending.push_back(Ok(RequestTaskReply {
            return_code: RET_VAL_OK,
            task_id,
            parameters: payload.to_string(),
            message: String::new(),
        }));
    }

    pub fn push_reply(&mut self, reply: Result<RequestTaskReply, StoreError>) {
        self.pending.push_back(reply);
    }
}

impl TaskStore for ScriptedStore {
    fn describe(&self) -> String {
        "scripted".to_string()
    }

    fn request_task(&mut self, call: &RequestTaskCall<'_>) -> Result<RequestTaskReply, StoreError> {
        self.requests.push(call.processor_name.to_string());
        self.pending.pop_front().unwrap_or_else(|| {
            Ok(RequestTaskReply {
                return_code: RET_VAL_TASK_NOT_AVAILABLE,
                message: "No tasks found".to_string(),
                ..RequestTaskReply::default()
            })
        })
    }

    fn set_task_complete(
        &mut self,
        call: &CompleteTaskCall<'_>,
    ) -> Result<ProcedureReply, StoreError> {
        self.completions
            .push((call.task_id, call.completion_code, call.message.to_string()));
        self.complete_replies
            .pop_front()
            .unwrap_or_else(|| Ok(ProcedureReply::default()))
    }

    fn post_log_entry(
        &mut self,
        posted_by: &str,
        level: &str,
        message: &str,
    ) -> Result<(), StoreError> {
        self.log_entries
            .push((posted_by.to_string(), level.to_string(), message.to_string()));
        Ok(())
    }
}

/// Publisher that keeps every document; optionally fails every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    pub published: Arc<Mutex<Vec<String>>>,
    pub fail: bool,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn documents(&self) -> Vec<String> {
        self.published.lock().expect("publisher lock").clone()
    }
}

impl StatusPublisher for RecordingPublisher {
    fn publish_status(&mut self, xml: &str) -> Result<(), BrokerError> {
        if self.fail {
            return Err(BrokerError::Request {
                url: "http://broker.invalid".to_string(),
                message: "connection refused".to_string(),
            });
        }
        self.published
            .lock()
            .expect("publisher lock")
            .push(xml.to_string());
        Ok(())
    }
}

pub fn v1_payload(package: &str, local: &Path, shared: &Path, folder: &str) -> String {
    format!(
        "<root><package>{package}</package><Path_Local_Root>{}</Path_Local_Root>\
         <Path_Shared_Root>{}</Path_Shared_Root><Path_Folder>{folder}</Path_Folder></root>",
        local.display(),
        shared.display()
    )
}

pub fn broadcast(managers: &[&str], message: &str) -> String {
    let machines: String = managers
        .iter()
        .map(|name| format!("<Manager>{name}</Manager>"))
        .collect();
    format!("<root><Managers>{machines}</Managers><Message>{message}</Message></root>")
}
