use std::sync::Mutex;

use mizan_core::types::ProcessingMode;
use rusqlite::Connection;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::types::{Checkpoint, CheckpointKey, StoredMessage, TaskRecord, TaskStatus, Thread};

/// Thread-safe store for threads, messages, checkpoints, and tasks.
///
/// Wraps a single SQLite connection in a `Mutex`. For high-concurrency
/// deployments consider a connection pool, but a Mutex is sufficient for the
/// single-node target.
pub struct SessionStore {
    db: Mutex<Connection>,
}

impl SessionStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    // ------------------------------------------------------------------
    // Threads
    // ------------------------------------------------------------------

    /// Return an existing thread or create a new one (upsert pattern).
    /// Pass `None` to mint a fresh thread id.
    #[instrument(skip(self))]
    pub fn get_or_create_thread(&self, thread_id: Option<&str>) -> Result<Thread> {
        if let Some(id) = thread_id {
            if let Some(thread) = self.get_thread(id)? {
                debug!("thread cache hit");
                return Ok(thread);
            }
        }

        let id = thread_id
            .map(String::from)
            .unwrap_or_else(|| Uuid::now_v7().to_string());
        let now = chrono::Utc::now().to_rfc3339();

        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT OR IGNORE INTO threads (thread_id, processing_mode, created_at, updated_at)
             VALUES (?1, NULL, ?2, ?2)",
            rusqlite::params![id, now],
        )?;

        // Read back — handles the race where two callers insert simultaneously
        let thread = db.query_row(
            "SELECT thread_id, processing_mode, created_at, updated_at
             FROM threads WHERE thread_id = ?1",
            rusqlite::params![id],
            row_to_thread,
        )?;

        Ok(thread)
    }

    /// Retrieve a thread by id, returning `None` if it does not exist.
    #[instrument(skip(self))]
    pub fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            "SELECT thread_id, processing_mode, created_at, updated_at
             FROM threads WHERE thread_id = ?1",
            rusqlite::params![thread_id],
            row_to_thread,
        ) {
            Ok(t) => Ok(Some(t)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    /// Record the mode this thread last ran in — read back next turn for
    /// sticky routing.
    #[instrument(skip(self))]
    pub fn set_processing_mode(&self, thread_id: &str, mode: ProcessingMode) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        let rows_changed = db.execute(
            "UPDATE threads SET processing_mode = ?1, updated_at = ?2 WHERE thread_id = ?3",
            rusqlite::params![mode.to_string(), now, thread_id],
        )?;
        if rows_changed == 0 {
            return Err(StoreError::ThreadNotFound {
                thread_id: thread_id.to_string(),
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Messages (append-only)
    // ------------------------------------------------------------------

    /// Append one message to a thread's history. Messages are immutable once
    /// persisted — there is deliberately no update path.
    #[instrument(skip(self, content, metadata))]
    pub fn append_message(
        &self,
        thread_id: &str,
        role: &str,
        content: &str,
        section_type: Option<&str>,
        metadata: serde_json::Value,
    ) -> Result<i64> {
        let now = chrono::Utc::now().to_rfc3339();
        let meta = serde_json::to_string(&metadata)?;
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO messages (thread_id, role, content, section_type, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![thread_id, role, content, section_type, meta, now],
        )?;
        Ok(db.last_insert_rowid())
    }

    /// Load the last `limit` messages of a thread, oldest first.
    #[instrument(skip(self))]
    pub fn get_history(&self, thread_id: &str, limit: usize) -> Result<Vec<StoredMessage>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, thread_id, role, content, section_type, metadata, created_at
             FROM (SELECT * FROM messages WHERE thread_id = ?1
                   ORDER BY id DESC LIMIT ?2)
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![thread_id, limit as i64],
            row_to_message,
        )?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ------------------------------------------------------------------
    // Checkpoints (append-only log)
    // ------------------------------------------------------------------

    /// Persist a new checkpoint. The log is append-only: a duplicate
    /// `(thread_id, namespace, checkpoint_id)` is rejected with
    /// `CheckpointExists`, never overwritten. A parent, when given, must
    /// already exist in the same thread/namespace.
    #[instrument(skip(self, state), fields(key = %key))]
    pub fn save_checkpoint(
        &self,
        key: &CheckpointKey,
        parent_checkpoint_id: Option<&str>,
        state: &serde_json::Value,
    ) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let state_json = serde_json::to_string(state)?;
        let db = self.db.lock().unwrap();

        if let Some(parent) = parent_checkpoint_id {
            let exists: bool = db.query_row(
                "SELECT EXISTS(SELECT 1 FROM checkpoints
                 WHERE thread_id = ?1 AND namespace = ?2 AND checkpoint_id = ?3)",
                rusqlite::params![key.thread_id, key.namespace, parent],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(StoreError::ParentNotFound {
                    parent_checkpoint_id: parent.to_string(),
                });
            }
        }

        let result = db.execute(
            "INSERT INTO checkpoints
             (thread_id, namespace, checkpoint_id, parent_checkpoint_id, state, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                key.thread_id,
                key.namespace,
                key.checkpoint_id,
                parent_checkpoint_id,
                state_json,
                now
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::CheckpointExists {
                    thread_id: key.thread_id.clone(),
                    namespace: key.namespace.clone(),
                    checkpoint_id: key.checkpoint_id.clone(),
                })
            }
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    /// Load the most recently saved checkpoint for a thread, or `None` when
    /// the thread has no checkpoints yet.
    #[instrument(skip(self))]
    pub fn latest_checkpoint(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            "SELECT thread_id, namespace, checkpoint_id, parent_checkpoint_id, state, created_at
             FROM checkpoints WHERE thread_id = ?1
             ORDER BY id DESC LIMIT 1",
            rusqlite::params![thread_id],
            row_to_checkpoint,
        ) {
            Ok(c) => Ok(Some(c?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    /// Create a new pending task and return its record.
    #[instrument(skip(self, input_data))]
    pub fn create_task(
        &self,
        agent_type: &str,
        input_data: serde_json::Value,
    ) -> Result<TaskRecord> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let input = serde_json::to_string(&input_data)?;
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO tasks (id, agent_type, status, input_data, progress, created_at, updated_at)
             VALUES (?1, ?2, 'pending', ?3, 0, ?4, ?4)",
            rusqlite::params![id, agent_type, input, now],
        )?;
        drop(db);
        self.get_task(&id)
    }

    /// Retrieve a task by id. Unknown ids surface as a typed not-found.
    #[instrument(skip(self))]
    pub fn get_task(&self, task_id: &str) -> Result<TaskRecord> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            "SELECT id, agent_type, status, input_data, output_data, error_message,
                    progress, created_at, updated_at, completed_at
             FROM tasks WHERE id = ?1",
            rusqlite::params![task_id],
            row_to_task,
        ) {
            Ok(t) => Ok(t?),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::TaskNotFound {
                task_id: task_id.to_string(),
            }),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    /// Move a task to `processing` and bump its progress.
    #[instrument(skip(self))]
    pub fn task_processing(&self, task_id: &str, progress: u8) -> Result<()> {
        self.update_task(task_id, TaskStatus::Processing, progress.min(100), None, None)
    }

    /// Complete a task with its output payload.
    #[instrument(skip(self, output_data))]
    pub fn task_completed(&self, task_id: &str, output_data: serde_json::Value) -> Result<()> {
        self.update_task(task_id, TaskStatus::Completed, 100, Some(output_data), None)
    }

    /// Fail a task with an error message.
    #[instrument(skip(self))]
    pub fn task_failed(&self, task_id: &str, error_message: &str) -> Result<()> {
        self.update_task(
            task_id,
            TaskStatus::Failed,
            0,
            None,
            Some(error_message.to_string()),
        )
    }

    fn update_task(
        &self,
        task_id: &str,
        status: TaskStatus,
        progress: u8,
        output_data: Option<serde_json::Value>,
        error_message: Option<String>,
    ) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let completed_at = matches!(status, TaskStatus::Completed | TaskStatus::Failed)
            .then(|| now.clone());
        let output = output_data.map(|v| v.to_string());
        let db = self.db.lock().unwrap();
        let rows_changed = db.execute(
            "UPDATE tasks SET status = ?1, progress = ?2,
                 output_data   = COALESCE(?3, output_data),
                 error_message = COALESCE(?4, error_message),
                 updated_at    = ?5,
                 completed_at  = COALESCE(?6, completed_at)
             WHERE id = ?7",
            rusqlite::params![
                status.to_string(),
                progress as i64,
                output,
                error_message,
                now,
                completed_at,
                task_id
            ],
        )?;
        if rows_changed == 0 {
            return Err(StoreError::TaskNotFound {
                task_id: task_id.to_string(),
            });
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------
// Row mappers
// ----------------------------------------------------------------------

fn row_to_thread(row: &rusqlite::Row<'_>) -> rusqlite::Result<Thread> {
    let mode: Option<String> = row.get(1)?;
    Ok(Thread {
        thread_id: row.get(0)?,
        // A malformed stored mode degrades to None rather than failing reads.
        processing_mode: mode.and_then(|m| m.parse().ok()),
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredMessage> {
    let meta: String = row.get(5)?;
    Ok(StoredMessage {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        role: row.get(2)?,
        content: row.get(3)?,
        section_type: row.get(4)?,
        metadata: serde_json::from_str(&meta).unwrap_or(serde_json::Value::Null),
        created_at: row.get(6)?,
    })
}

fn row_to_checkpoint(
    row: &rusqlite::Row<'_>,
) -> rusqlite::Result<std::result::Result<Checkpoint, serde_json::Error>> {
    let state: String = row.get(4)?;
    Ok(serde_json::from_str(&state).map(|state| Checkpoint {
        key: CheckpointKey {
            thread_id: row.get(0).unwrap_or_default(),
            namespace: row.get(1).unwrap_or_default(),
            checkpoint_id: row.get(2).unwrap_or_default(),
        },
        parent_checkpoint_id: row.get(3).unwrap_or_default(),
        state,
        created_at: row.get(5).unwrap_or_default(),
    }))
}

fn row_to_task(
    row: &rusqlite::Row<'_>,
) -> rusqlite::Result<std::result::Result<TaskRecord, serde_json::Error>> {
    let status: String = row.get(2)?;
    let input: String = row.get(3)?;
    let output: Option<String> = row.get(4)?;
    Ok(serde_json::from_str(&input).map(|input_data| TaskRecord {
        id: row.get(0).unwrap_or_default(),
        agent_type: row.get(1).unwrap_or_default(),
        status: status.parse().unwrap_or(TaskStatus::Pending),
        input_data,
        output_data: output.and_then(|o| serde_json::from_str(&o).ok()),
        error_message: row.get(5).unwrap_or_default(),
        progress: row.get::<_, i64>(6).unwrap_or(0).clamp(0, 100) as u8,
        created_at: row.get(7).unwrap_or_default(),
        updated_at: row.get(8).unwrap_or_default(),
        completed_at: row.get(9).unwrap_or_default(),
    }))
}
