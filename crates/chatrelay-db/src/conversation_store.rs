use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chatrelay_common::{Error, Message, NewMessage, Result, Role, ThreadId, Usage};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{info, warn};

use crate::migrations::{CONVERSATION_SCHEMA_V1, RESET_SQL};

/// Durable per-thread message log plus the process-wide instruction record.
///
/// Messages are append-only. The instruction is a singleton shared by every
/// thread: setting it replaces the existing record instead of adding one.
pub trait ConversationStore: Send + Sync {
    /// Persist one row and return it with its assigned id.
    fn append(&self, message: NewMessage) -> Result<Message>;

    /// All rows for `thread_id` in creation order. Empty when the thread is new.
    fn list_by_thread(&self, thread_id: &ThreadId) -> Result<Vec<Message>>;

    /// Remove one row by id. Returns false when no such row exists.
    fn delete_message(&self, id: i64) -> Result<bool>;

    fn get_instruction(&self) -> Result<Option<String>>;

    /// Insert the instruction, or overwrite it if one is already stored.
    fn set_instruction(&self, text: &str) -> Result<()>;

    /// Drop and recreate all message and instruction storage. Irreversible.
    fn reset_all(&self) -> Result<()>;
}

pub struct SqliteConversationStore {
    conn: Mutex<Connection>,
}

impl SqliteConversationStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        info!("opening conversation store at {}", db_path.display());
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| Error::Database(format!("failed to open database: {e}")))?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Database(format!("failed to open in-memory database: {e}")))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Database("connection mutex poisoned".into()))
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.lock()?;
        apply_schema(&conn)
    }
}

fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(CONVERSATION_SCHEMA_V1.sql)
        .map_err(|e| Error::Database(format!("migration failed: {e}")))?;
    conn.pragma_update(None, "user_version", CONVERSATION_SCHEMA_V1.version)
        .map_err(|e| Error::Database(format!("failed to record schema version: {e}")))?;
    Ok(())
}

impl ConversationStore for SqliteConversationStore {
    fn append(&self, message: NewMessage) -> Result<Message> {
        let created_at = Utc::now();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO messages
                (thread_id, role, author, content, prompt_tokens, completion_tokens, total_tokens, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                message.thread_id.as_str(),
                message.role.as_str(),
                message.author,
                message.content,
                message.usage.prompt_tokens,
                message.usage.completion_tokens,
                message.usage.total_tokens,
                created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Error::Database(format!("failed to append message: {e}")))?;

        Ok(Message {
            id: conn.last_insert_rowid(),
            thread_id: message.thread_id,
            role: message.role,
            author: message.author,
            content: message.content,
            usage: message.usage,
            created_at,
        })
    }

    fn list_by_thread(&self, thread_id: &ThreadId) -> Result<Vec<Message>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, thread_id, role, author, content,
                        prompt_tokens, completion_tokens, total_tokens, created_at
                 FROM messages
                 WHERE thread_id = ?1
                 ORDER BY id ASC",
            )
            .map_err(|e| Error::Database(format!("failed to prepare message query: {e}")))?;

        let rows = stmt
            .query_map(params![thread_id.as_str()], |row| {
                let role_raw: String = row.get(2)?;
                let created_raw: String = row.get(8)?;
                Ok((
                    role_raw,
                    Message {
                        id: row.get(0)?,
                        thread_id: ThreadId::from_string(row.get::<_, String>(1)?),
                        role: Role::User,
                        author: row.get(3)?,
                        content: row.get(4)?,
                        usage: Usage {
                            prompt_tokens: row.get(5)?,
                            completion_tokens: row.get(6)?,
                            total_tokens: row.get(7)?,
                        },
                        created_at: parse_timestamp(&created_raw),
                    },
                ))
            })
            .map_err(|e| Error::Database(format!("failed to load messages: {e}")))?;

        let mut messages = Vec::new();
        for row in rows {
            let (role_raw, mut message) =
                row.map_err(|e| Error::Database(format!("failed to read message row: {e}")))?;
            message.role = role_raw.parse()?;
            messages.push(message);
        }
        Ok(messages)
    }

    fn delete_message(&self, id: i64) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn
            .execute("DELETE FROM messages WHERE id = ?1", params![id])
            .map_err(|e| Error::Database(format!("failed to delete message: {e}")))?;
        Ok(deleted > 0)
    }

    fn get_instruction(&self) -> Result<Option<String>> {
        let conn = self.lock()?;
        conn.query_row("SELECT prompt FROM instruction WHERE id = 1", [], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|e| Error::Database(format!("failed to read instruction: {e}")))
    }

    fn set_instruction(&self, text: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO instruction (id, prompt) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET
               prompt = excluded.prompt,
               updated_at = datetime('now')",
            params![text],
        )
        .map_err(|e| Error::Database(format!("failed to set instruction: {e}")))?;
        Ok(())
    }

    fn reset_all(&self) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(format!("failed to begin reset: {e}")))?;
        tx.execute_batch(RESET_SQL)
            .map_err(|e| Error::Database(format!("failed to drop tables: {e}")))?;
        apply_schema(&tx)?;
        tx.commit()
            .map_err(|e| Error::Database(format!("failed to commit reset: {e}")))?;
        warn!("conversation store reset: all messages and the instruction were removed");
        Ok(())
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("unparseable message timestamp '{raw}': {e}");
            DateTime::<Utc>::UNIX_EPOCH
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread(id: &str) -> ThreadId {
        ThreadId::from_string(id)
    }

    fn usage(total: u32) -> Usage {
        Usage {
            prompt_tokens: total / 2,
            completion_tokens: total - total / 2,
            total_tokens: total,
        }
    }

    #[test]
    fn append_then_list_returns_identical_row() {
        let store = SqliteConversationStore::in_memory().expect("in-memory store should open");
        let stored = store
            .append(
                NewMessage::new(thread("T1"), Role::User, "hi")
                    .with_author("alice")
                    .with_usage(usage(12)),
            )
            .unwrap();

        let listed = store.list_by_thread(&thread("T1")).unwrap();
        assert_eq!(listed, vec![stored.clone()]);
        assert_eq!(stored.author, "alice");
        assert_eq!(stored.usage, usage(12));
    }

    #[test]
    fn list_preserves_append_order_within_thread() {
        let store = SqliteConversationStore::in_memory().unwrap();
        store
            .append(NewMessage::new(thread("T1"), Role::System, "sys"))
            .unwrap();
        store
            .append(NewMessage::new(thread("T2"), Role::User, "other thread"))
            .unwrap();
        store
            .append(NewMessage::new(thread("T1"), Role::User, "question"))
            .unwrap();
        store
            .append(NewMessage::new(thread("T1"), Role::Assistant, "answer"))
            .unwrap();

        let contents: Vec<_> = store
            .list_by_thread(&thread("T1"))
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["sys", "question", "answer"]);
    }

    #[test]
    fn unknown_thread_lists_empty() {
        let store = SqliteConversationStore::in_memory().unwrap();
        assert!(store.list_by_thread(&thread("nobody")).unwrap().is_empty());
    }

    #[test]
    fn ids_are_monotonic_and_not_reused_after_delete() {
        let store = SqliteConversationStore::in_memory().unwrap();
        let a = store
            .append(NewMessage::new(thread("T1"), Role::User, "a"))
            .unwrap();
        let b = store
            .append(NewMessage::new(thread("T1"), Role::User, "b"))
            .unwrap();
        assert!(b.id > a.id);

        assert!(store.delete_message(b.id).unwrap());
        assert!(!store.delete_message(b.id).unwrap());

        let c = store
            .append(NewMessage::new(thread("T1"), Role::User, "c"))
            .unwrap();
        assert!(c.id > b.id);
    }

    #[test]
    fn instruction_absent_until_set() {
        let store = SqliteConversationStore::in_memory().unwrap();
        assert_eq!(store.get_instruction().unwrap(), None);
    }

    #[test]
    fn set_instruction_twice_keeps_single_latest_row() {
        let store = SqliteConversationStore::in_memory().unwrap();
        store.set_instruction("be concise").unwrap();
        store.set_instruction("be verbose").unwrap();

        assert_eq!(store.get_instruction().unwrap().as_deref(), Some("be verbose"));
        let rows: i64 = store
            .lock()
            .unwrap()
            .query_row("SELECT count(*) FROM instruction", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn reset_all_clears_every_thread_and_instruction() {
        let store = SqliteConversationStore::in_memory().unwrap();
        store.set_instruction("be concise").unwrap();
        for i in 0..50 {
            let id = if i % 2 == 0 { "T1" } else { "T2" };
            store
                .append(NewMessage::new(thread(id), Role::User, format!("msg {i}")))
                .unwrap();
        }

        store.reset_all().unwrap();

        assert!(store.list_by_thread(&thread("T1")).unwrap().is_empty());
        assert!(store.list_by_thread(&thread("T2")).unwrap().is_empty());
        assert_eq!(store.get_instruction().unwrap(), None);

        // Storage is usable again after the reset.
        store
            .append(NewMessage::new(thread("T1"), Role::User, "fresh"))
            .unwrap();
        assert_eq!(store.list_by_thread(&thread("T1")).unwrap().len(), 1);
    }

    #[test]
    fn schema_version_recorded() {
        let store = SqliteConversationStore::in_memory().unwrap();
        let version: i64 = store
            .lock()
            .unwrap()
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, CONVERSATION_SCHEMA_V1.version);
    }

    #[test]
    fn file_backed_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chats.db");

        {
            let store = SqliteConversationStore::open(&path).unwrap();
            store.set_instruction("stay on topic").unwrap();
            store
                .append(NewMessage::new(thread("T1"), Role::User, "persist me"))
                .unwrap();
        }

        let reopened = SqliteConversationStore::open(&path).unwrap();
        assert_eq!(
            reopened.get_instruction().unwrap().as_deref(),
            Some("stay on topic")
        );
        assert_eq!(reopened.list_by_thread(&thread("T1")).unwrap()[0].content, "persist me");
    }
}
