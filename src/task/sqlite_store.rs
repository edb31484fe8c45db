use super::store::{
    CompleteTaskCall, ProcedureReply, RequestTaskCall, RequestTaskReply, TaskStore, RET_VAL_OK,
    RET_VAL_TASK_NOT_AVAILABLE, SP_NAME_REQUEST_TASK, SP_NAME_SET_COMPLETE,
};
use super::StoreError;
use crate::config::ManagerParamSource;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const RET_VAL_TASK_NOT_FOUND: i32 = 53100;
pub const RET_VAL_TASK_NOT_IN_PROGRESS: i32 = 53101;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    New,
    InProgress,
    Complete,
    Failed,
}

impl QueueState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::New => 1,
            Self::InProgress => 2,
            Self::Complete => 3,
            Self::Failed => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::New),
            2 => Some(Self::InProgress),
            3 => Some(Self::Complete),
            4 => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRow {
    pub task_id: i64,
    pub parameters: String,
    pub state: QueueState,
    pub processor: Option<String>,
    pub completion_code: Option<i32>,
    pub completion_message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SqliteTaskStore {
    db_path: PathBuf,
}

impl SqliteTaskStore {
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::CreateParent {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let store = Self {
            db_path: db_path.to_path_buf(),
        };

        // Fail fast on an unopenable path.
        let _ = store.connect()?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        let connection = self.connect()?;
        connection
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS folder_create_queue (
                    task_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    parameters TEXT NOT NULL,
                    state INTEGER NOT NULL DEFAULT 1,
                    processor TEXT,
                    completion_code INTEGER,
                    completion_message TEXT,
                    created_at INTEGER NOT NULL,
                    started_at INTEGER,
                    finished_at INTEGER
                );

                CREATE TABLE IF NOT EXISTS manager_params (
                    manager_name TEXT NOT NULL,
                    param_name TEXT NOT NULL,
                    param_value TEXT NOT NULL,
                    PRIMARY KEY (manager_name, param_name)
                );

                CREATE TABLE IF NOT EXISTS log_entries (
                    entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    posted_by TEXT NOT NULL,
                    posting_time INTEGER NOT NULL,
                    type TEXT NOT NULL,
                    message TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_folder_create_queue_state
                    ON folder_create_queue(state, task_id);
                ",
            )
            .map_err(|source| StoreError::sql("ensure_schema", source))
    }

    pub fn enqueue(&self, parameters_xml: &str) -> Result<i64, StoreError> {
        let connection = self.connect()?;
        connection
            .execute(
                "INSERT INTO folder_create_queue (parameters, state, created_at)
                 VALUES (?1, ?2, strftime('%s','now'))",
                params![parameters_xml, QueueState::New.code()],
            )
            .map_err(|source| StoreError::sql("enqueue", source))?;
        Ok(connection.last_insert_rowid())
    }

    pub fn task(&self, task_id: i64) -> Result<Option<QueueRow>, StoreError> {
        let connection = self.connect()?;
        connection
            .query_row(
                "SELECT task_id, parameters, state, processor, completion_code, completion_message
                 FROM folder_create_queue WHERE task_id = ?1",
                params![task_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<i32>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()
            .map_err(|source| StoreError::sql("task", source))?
            .map(
                |(task_id, parameters, state, processor, completion_code, completion_message)| {
                    let state = QueueState::from_code(state).ok_or_else(|| {
                        StoreError::Unavailable(format!(
                            "task {task_id} has unknown queue state {state}"
                        ))
                    })?;
                    Ok(QueueRow {
                        task_id,
                        parameters,
                        state,
                        processor,
                        completion_code,
                        completion_message,
                    })
                },
            )
            .transpose()
    }

    pub fn set_manager_param(
        &self,
        manager_name: &str,
        param_name: &str,
        param_value: &str,
    ) -> Result<(), StoreError> {
        let connection = self.connect()?;
        connection
            .execute(
                "INSERT INTO manager_params (manager_name, param_name, param_value)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(manager_name, param_name) DO UPDATE SET param_value = excluded.param_value",
                params![manager_name, param_name, param_value],
            )
            .map_err(|source| StoreError::sql("set_manager_param", source))?;
        Ok(())
    }

    pub fn log_entries(&self) -> Result<Vec<(String, String)>, StoreError> {
        let connection = self.connect()?;
        let mut statement = connection
            .prepare("SELECT type, message FROM log_entries ORDER BY entry_id")
            .map_err(|source| StoreError::sql("log_entries", source))?;
        let rows = statement
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(|source| StoreError::sql("log_entries", source))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|source| StoreError::sql("log_entries", source))
    }

    pub fn queue_counts(&self) -> Result<Vec<(QueueState, i64)>, StoreError> {
        let connection = self.connect()?;
        let mut statement = connection
            .prepare("SELECT state, COUNT(*) FROM folder_create_queue GROUP BY state ORDER BY state")
            .map_err(|source| StoreError::sql("queue_counts", source))?;
        let rows = statement
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))
            .map_err(|source| StoreError::sql("queue_counts", source))?;
        let mut counts = Vec::new();
        for row in rows {
            let (code, count) = row.map_err(|source| StoreError::sql("queue_counts", source))?;
            if let Some(state) = QueueState::from_code(code) {
                counts.push((state, count));
            }
        }
        Ok(counts)
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let connection = Connection::open(&self.db_path).map_err(|source| StoreError::Open {
            path: self.db_path.display().to_string(),
            source,
        })?;
        connection
            .busy_timeout(BUSY_TIMEOUT)
            .map_err(|source| StoreError::Open {
                path: self.db_path.display().to_string(),
                source,
            })?;
        Ok(connection)
    }
}

impl TaskStore for SqliteTaskStore {
    fn describe(&self) -> String {
        format!("sqlite:{}", self.db_path.display())
    }

    fn request_task(&mut self, call: &RequestTaskCall<'_>) -> Result<RequestTaskReply, StoreError> {
        let mut connection = self.connect()?;
        let tx = connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|source| StoreError::sql(SP_NAME_REQUEST_TASK, source))?;

        let available: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM folder_create_queue WHERE state = ?1",
                params![QueueState::New.code()],
                |row| row.get(0),
            )
            .map_err(|source| StoreError::sql(SP_NAME_REQUEST_TASK, source))?;

        let candidate = tx
            .query_row(
                "SELECT task_id, parameters FROM folder_create_queue
                 WHERE state = ?1 ORDER BY task_id LIMIT 1",
                params![QueueState::New.code()],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(|source| StoreError::sql(SP_NAME_REQUEST_TASK, source))?;

        let Some((task_id, parameters)) = candidate else {
            return Ok(RequestTaskReply {
                return_code: RET_VAL_TASK_NOT_AVAILABLE,
                message: "No tasks found".to_string(),
                ..RequestTaskReply::default()
            });
        };

        if call.info_only {
            let preview = available.min(i64::from(call.task_count_to_preview));
            return Ok(RequestTaskReply {
                return_code: RET_VAL_OK,
                task_id: 0,
                parameters: String::new(),
                message: format!("{preview} of {available} queued tasks previewed"),
            });
        }

        tx.execute(
            "UPDATE folder_create_queue
             SET state = ?1, processor = ?2, started_at = strftime('%s','now')
             WHERE task_id = ?3",
            params![QueueState::InProgress.code(), call.processor_name, task_id],
        )
        .map_err(|source| StoreError::sql(SP_NAME_REQUEST_TASK, source))?;
        tx.commit()
            .map_err(|source| StoreError::sql(SP_NAME_REQUEST_TASK, source))?;

        Ok(RequestTaskReply {
            return_code: RET_VAL_OK,
            task_id,
            parameters,
            message: String::new(),
        })
    }

    fn set_task_complete(
        &mut self,
        call: &CompleteTaskCall<'_>,
    ) -> Result<ProcedureReply, StoreError> {
        let mut connection = self.connect()?;
        let tx = connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|source| StoreError::sql(SP_NAME_SET_COMPLETE, source))?;

        let state = tx
            .query_row(
                "SELECT state FROM folder_create_queue WHERE task_id = ?1",
                params![call.task_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map_err(|source| StoreError::sql(SP_NAME_SET_COMPLETE, source))?;

        match state.and_then(QueueState::from_code) {
            None => {
                return Ok(ProcedureReply {
                    return_code: RET_VAL_TASK_NOT_FOUND,
                    message: format!("Task {} not found in folder_create_queue", call.task_id),
                })
            }
            Some(QueueState::InProgress) => {}
            Some(other) => {
                return Ok(ProcedureReply {
                    return_code: RET_VAL_TASK_NOT_IN_PROGRESS,
                    message: format!(
                        "Task {} is not in progress (state {})",
                        call.task_id,
                        other.code()
                    ),
                })
            }
        }

        let final_state = if call.completion_code == 0 {
            QueueState::Complete
        } else {
            QueueState::Failed
        };
        tx.execute(
            "UPDATE folder_create_queue
             SET state = ?1, completion_code = ?2, completion_message = ?3,
                 finished_at = strftime('%s','now')
             WHERE task_id = ?4",
            params![
                final_state.code(),
                call.completion_code,
                call.message,
                call.task_id
            ],
        )
        .map_err(|source| StoreError::sql(SP_NAME_SET_COMPLETE, source))?;
        tx.commit()
            .map_err(|source| StoreError::sql(SP_NAME_SET_COMPLETE, source))?;

        Ok(ProcedureReply {
            return_code: RET_VAL_OK,
            message: String::new(),
        })
    }

    fn post_log_entry(
        &mut self,
        posted_by: &str,
        level: &str,
        message: &str,
    ) -> Result<(), StoreError> {
        let connection = self.connect()?;
        connection
            .execute(
                "INSERT INTO log_entries (posted_by, posting_time, type, message)
                 VALUES (?1, strftime('%s','now'), ?2, ?3)",
                params![posted_by, level, message],
            )
            .map_err(|source| StoreError::sql("post_log_entry", source))?;
        Ok(())
    }
}

impl ManagerParamSource for SqliteTaskStore {
    fn manager_params(&mut self, manager_name: &str) -> Result<Vec<(String, String)>, StoreError> {
        let connection = self.connect()?;
        let mut statement = connection
            .prepare(
                "SELECT param_name, param_value FROM manager_params
                 WHERE manager_name = ?1 ORDER BY param_name",
            )
            .map_err(|source| StoreError::sql("manager_params", source))?;
        let rows = statement
            .query_map(params![manager_name], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|source| StoreError::sql("manager_params", source))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|source| StoreError::sql("manager_params", source))
    }
}
