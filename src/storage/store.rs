//! SQLite-backed quote store.
//!
//! # Responsibilities
//! - Open the database and create the schema idempotently
//! - Insert one quote row under a deadline, all or nothing
//! - Read rows back for inspection
//!
//! # Design Decisions
//! - One connection behind a mutex; calls run on the blocking pool
//! - The insert runs in a transaction and commits only if it claims the
//!   commit before the deadline does; otherwise it rolls back
//! - SQLite's busy wait on the write path is capped by what is left of the
//!   deadline, so a lock held by another connection cannot stall the commit

use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, TransactionBehavior};

use crate::quoting::types::{Quote, StoredQuote};
use crate::resilience::Deadline;
use crate::storage::error::{StorageError, StorageResult};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS quotes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        bid TEXT NOT NULL,
        obtained_at TEXT NOT NULL
    );";

const INSERT_QUOTE: &str = "INSERT INTO quotes (bid, obtained_at) VALUES (?1, ?2)";

// Busy wait for reads and schema setup.
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const PENDING: u8 = 0;
const ABANDONED: u8 = 1;
const COMMITTING: u8 = 2;

/// Handle to the quote database. Cheap to clone and safe to share.
#[derive(Clone)]
pub struct QuoteStore {
    conn: Arc<Mutex<Connection>>,
}

impl QuoteStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StorageError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// In-memory database, mostly useful in tests.
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory().map_err(|source| StorageError::Open {
            path: ":memory:".to_string(),
            source,
        })?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)
            .map_err(StorageError::Schema)?;
        conn.execute_batch(SCHEMA).map_err(StorageError::Schema)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert `quote`, giving up once `deadline` passes.
    ///
    /// Returns the new row id. On any error no row is left behind.
    pub async fn insert(&self, deadline: Deadline, quote: &Quote) -> StorageResult<i64> {
        if deadline.is_expired() {
            return Err(StorageError::WriteTimeout(deadline.budget()));
        }

        let claim = Arc::new(AtomicU8::new(PENDING));
        let conn = self.conn.clone();
        let task_claim = claim.clone();
        let bid = quote.bid.clone();
        let obtained_at = format_timestamp(&quote.obtained_at);

        let mut task = tokio::task::spawn_blocking(move || {
            insert_row(&conn, &task_claim, &bid, &obtained_at, deadline)
        });

        match deadline.run(&mut task).await {
            Ok(joined) => joined.map_err(|e| StorageError::Write(e.to_string()))?,
            Err(elapsed) => {
                let abandoned = claim
                    .compare_exchange(PENDING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok();
                if abandoned {
                    Err(StorageError::WriteTimeout(elapsed.budget))
                } else {
                    // Commit was already claimed; its outcome is the result.
                    task.await
                        .map_err(|e| StorageError::Write(e.to_string()))?
                }
            }
        }
    }

    /// Most recently inserted quote, if any.
    pub async fn latest(&self) -> StorageResult<Option<StoredQuote>> {
        Ok(self.recent(1).await?.into_iter().next())
    }

    /// Up to `limit` quotes, newest first.
    pub async fn recent(&self, limit: usize) -> StorageResult<Vec<StoredQuote>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> StorageResult<Vec<StoredQuote>> {
            let conn = lock(&conn)?;
            let mut stmt = conn
                .prepare("SELECT id, bid, obtained_at FROM quotes ORDER BY id DESC LIMIT ?1")
                .map_err(read_error)?;
            let rows = stmt
                .query_map(params![limit as i64], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })
                .map_err(read_error)?;

            let mut quotes = Vec::new();
            for row in rows {
                let (id, bid, obtained_at) = row.map_err(read_error)?;
                quotes.push(StoredQuote {
                    id,
                    bid,
                    obtained_at: parse_timestamp(&obtained_at)?,
                });
            }
            Ok(quotes)
        })
        .await
        .map_err(|e| StorageError::Read(e.to_string()))?
    }

    /// Number of stored quotes.
    pub async fn count(&self) -> StorageResult<u64> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> StorageResult<u64> {
            let conn = lock(&conn)?;
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM quotes", [], |row| row.get(0))
                .map_err(read_error)?;
            Ok(count as u64)
        })
        .await
        .map_err(|e| StorageError::Read(e.to_string()))?
    }
}

fn lock(conn: &Mutex<Connection>) -> StorageResult<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|_| StorageError::Poisoned)
}

fn read_error(err: rusqlite::Error) -> StorageError {
    StorageError::Read(err.to_string())
}

fn insert_row(
    conn: &Mutex<Connection>,
    claim: &AtomicU8,
    bid: &str,
    obtained_at: &str,
    deadline: Deadline,
) -> StorageResult<i64> {
    let mut conn = conn
        .lock()
        .map_err(|_| StorageError::Write("connection lock poisoned".to_string()))?;

    // The caller may have given up while we waited for the lock.
    if claim.load(Ordering::Acquire) == ABANDONED {
        return Err(StorageError::WriteTimeout(deadline.budget()));
    }

    let result = write_row(&mut conn, claim, bid, obtained_at, deadline);
    if let Err(e) = conn.busy_timeout(DEFAULT_BUSY_TIMEOUT) {
        tracing::warn!(error = %e, "Failed to restore busy timeout");
    }
    result
}

fn write_row(
    conn: &mut Connection,
    claim: &AtomicU8,
    bid: &str,
    obtained_at: &str,
    deadline: Deadline,
) -> StorageResult<i64> {
    let write_error = |e: rusqlite::Error| classify_write(e, deadline);

    conn.busy_timeout(deadline.remaining()).map_err(write_error)?;
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(write_error)?;
    tx.execute(INSERT_QUOTE, params![bid, obtained_at])
        .map_err(write_error)?;
    let id = tx.last_insert_rowid();

    if claim
        .compare_exchange(PENDING, COMMITTING, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        // Dropping the transaction rolls it back.
        return Err(StorageError::WriteTimeout(deadline.budget()));
    }

    // Readers on other connections can hold the commit off; wait no longer
    // than the deadline allows. A failed commit rolls back on drop.
    tx.busy_timeout(deadline.remaining()).map_err(write_error)?;
    tx.commit().map_err(write_error)?;
    Ok(id)
}

// Busy and locked mean the capped busy wait ran out, i.e. the deadline did.
fn classify_write(err: rusqlite::Error, deadline: Deadline) -> StorageError {
    match err.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
            StorageError::WriteTimeout(deadline.budget())
        }
        _ => StorageError::Write(err.to_string()),
    }
}

fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StorageError::Read(format!("bad timestamp '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn quote(bid: &str) -> Quote {
        Quote::new(bid, Utc::now())
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let store = QuoteStore::open_in_memory().unwrap();
        let inserted = quote("5.25");

        let id = store
            .insert(Deadline::after(Duration::from_secs(1)), &inserted)
            .await
            .unwrap();

        let stored = store.latest().await.unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.bid, "5.25");
        // Stored with microsecond precision.
        assert_eq!(
            stored.obtained_at.timestamp_micros(),
            inserted.obtained_at.timestamp_micros()
        );
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ids_increase() {
        let store = QuoteStore::open_in_memory().unwrap();
        let deadline = Deadline::after(Duration::from_secs(1));

        let first = store.insert(deadline, &quote("5.10")).await.unwrap();
        let second = store.insert(deadline, &quote("5.20")).await.unwrap();

        assert!(second > first);
        let recent = store.recent(10).await.unwrap();
        let bids: Vec<_> = recent.iter().map(|q| q.bid.as_str()).collect();
        assert_eq!(bids, vec!["5.20", "5.10"]);
    }

    #[tokio::test]
    async fn test_expired_deadline_writes_nothing() {
        let store = QuoteStore::open_in_memory().unwrap();
        let expired = Deadline::after(Duration::ZERO);

        let err = store.insert(expired, &quote("5.25")).await.unwrap_err();

        assert!(matches!(err, StorageError::WriteTimeout(_)));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_timeout_while_waiting_for_lock_rolls_back() {
        let store = QuoteStore::open_in_memory().unwrap();
        let held = store.conn.clone();

        let guard_task = tokio::task::spawn_blocking(move || {
            let _guard = held.lock().unwrap();
            std::thread::sleep(Duration::from_millis(200));
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = store
            .insert(Deadline::after(Duration::from_millis(30)), &quote("5.25"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::WriteTimeout(_)));

        guard_task.await.unwrap();
        // Let the abandoned blocking insert observe the claim.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reader_on_other_connection_cannot_stall_commit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotes.db");
        let store = QuoteStore::open(&path).unwrap();

        // An open read transaction keeps a shared lock until it ends.
        let reader = Connection::open(&path).unwrap();
        reader.execute_batch("BEGIN").unwrap();
        let seen: i64 = reader
            .query_row("SELECT COUNT(*) FROM quotes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(seen, 0);

        let started = Instant::now();
        let err = store
            .insert(Deadline::after(Duration::from_millis(50)), &quote("5.25"))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::WriteTimeout(_)));
        assert!(started.elapsed() < Duration::from_secs(1));

        reader.execute_batch("COMMIT").unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_writer_on_other_connection_gives_write_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotes.db");
        let store = QuoteStore::open(&path).unwrap();

        let writer = Connection::open(&path).unwrap();
        writer.execute_batch("BEGIN IMMEDIATE").unwrap();

        let started = Instant::now();
        let err = store
            .insert(Deadline::after(Duration::from_millis(50)), &quote("5.25"))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::WriteTimeout(_)));
        assert!(started.elapsed() < Duration::from_secs(1));

        writer.execute_batch("ROLLBACK").unwrap();
        let id = store
            .insert(Deadline::after(Duration::from_secs(1)), &quote("5.30"))
            .await
            .unwrap();
        assert_eq!(store.latest().await.unwrap().unwrap().id, id);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_poisoned_connection_is_write_error() {
        let store = QuoteStore::open_in_memory().unwrap();
        let held = store.conn.clone();
        let _ = std::thread::spawn(move || {
            let _guard = held.lock().unwrap();
            panic!("panic while holding the connection");
        })
        .join();

        let err = store
            .insert(Deadline::after(Duration::from_secs(1)), &quote("5.25"))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Write(_)));
    }

    #[tokio::test]
    async fn test_missing_table_is_write_error() {
        let store = QuoteStore::open_in_memory().unwrap();
        store
            .conn
            .lock()
            .unwrap()
            .execute_batch("DROP TABLE quotes")
            .unwrap();

        let err = store
            .insert(Deadline::after(Duration::from_secs(1)), &quote("5.25"))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Write(_)));
        assert_eq!(err.kind(), "write");
    }

    #[tokio::test]
    async fn test_schema_creation_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotes.db");

        let store = QuoteStore::open(&path).unwrap();
        store
            .insert(Deadline::after(Duration::from_secs(1)), &quote("5.25"))
            .await
            .unwrap();
        drop(store);

        let reopened = QuoteStore::open(&path).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
    }

    #[test]
    fn test_open_fails_for_unreachable_path() {
        let err = QuoteStore::open("/nonexistent-dir/quotes.db").err().unwrap();
        assert!(matches!(err, StorageError::Open { .. }));
    }
}
