/// A schema step applied on open. `version` is written to `PRAGMA user_version`.
pub struct Migration {
    pub version: i64,
    pub sql: &'static str,
}

pub const CONVERSATION_SCHEMA_V1: Migration = Migration {
    version: 1,
    sql: "CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            thread_id TEXT NOT NULL,
            role TEXT NOT NULL,
            author TEXT NOT NULL DEFAULT '',
            content TEXT NOT NULL,
            prompt_tokens INTEGER NOT NULL DEFAULT 0,
            completion_tokens INTEGER NOT NULL DEFAULT 0,
            total_tokens INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_thread
            ON messages(thread_id, id);

        CREATE TABLE IF NOT EXISTS instruction (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            prompt TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
};

/// Tables dropped by a full reset. Re-created by re-running the schema.
pub const RESET_SQL: &str = "DROP TABLE IF EXISTS messages;
    DROP TABLE IF EXISTS instruction;";
