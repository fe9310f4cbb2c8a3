use rusqlite::{Connection, Result};

/// Initialise all store tables. Safe to call on every startup (idempotent).
pub fn init_db(conn: &Connection) -> Result<()> {
    create_threads_table(conn)?;
    create_messages_table(conn)?;
    create_checkpoints_table(conn)?;
    create_tasks_table(conn)?;
    Ok(())
}

fn create_threads_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS threads (
            thread_id       TEXT PRIMARY KEY,
            processing_mode TEXT,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );",
    )
}

/// Messages are append-only: no UPDATE path exists anywhere in the store.
fn create_messages_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS messages (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            thread_id    TEXT NOT NULL,
            role         TEXT NOT NULL,
            content      TEXT NOT NULL,
            section_type TEXT,
            metadata     TEXT NOT NULL DEFAULT '{}',
            created_at   TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_messages_thread
            ON messages(thread_id, created_at);",
    )
}

/// Checkpoint log — the UNIQUE constraint is the append-only guarantee:
/// a duplicate `(thread_id, namespace, checkpoint_id)` insert fails instead
/// of overwriting.
fn create_checkpoints_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS checkpoints (
            id                   INTEGER PRIMARY KEY AUTOINCREMENT,
            thread_id            TEXT NOT NULL,
            namespace            TEXT NOT NULL,
            checkpoint_id        TEXT NOT NULL,
            parent_checkpoint_id TEXT,
            state                TEXT NOT NULL,
            created_at           TEXT NOT NULL,
            UNIQUE(thread_id, namespace, checkpoint_id)
        );
        CREATE INDEX IF NOT EXISTS idx_checkpoints_thread
            ON checkpoints(thread_id, id DESC);",
    )
}

fn create_tasks_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS tasks (
            id            TEXT PRIMARY KEY,
            agent_type    TEXT NOT NULL,
            status        TEXT NOT NULL DEFAULT 'pending',
            input_data    TEXT NOT NULL DEFAULT '{}',
            output_data   TEXT,
            error_message TEXT,
            progress      INTEGER NOT NULL DEFAULT 0,
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL,
            completed_at  TEXT
        );",
    )
}
