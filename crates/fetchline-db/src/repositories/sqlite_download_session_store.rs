//! `SQLite` implementation of the `DownloadSessionStorePort` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::path::PathBuf;

use fetchline_core::{
    DownloadSession, DownloadSessionStorePort, RepositoryError, SessionId, SessionState,
};

const SELECT_COLUMNS: &str = "SELECT id, kind, remote_url, local_path, total_bytes, \
     downloaded_bytes, state, error_message, created_at, updated_at FROM download_sessions";

/// `SQLite` implementation of the `DownloadSessionStorePort` trait.
///
/// Listing order is the insertion order of the first `save` for an id.
/// Later saves update progress in place; kind, URL and local path stay as
/// first stored.
pub struct SqliteDownloadSessionStore {
    pool: SqlitePool,
}

impl SqliteDownloadSessionStore {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DownloadSessionStorePort for SqliteDownloadSessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<DownloadSession>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_storage_error)?;

        row.as_ref().map(row_to_session).transpose()
    }

    async fn save(&self, session: &DownloadSession) -> Result<(), RepositoryError> {
        if session.state == SessionState::Deleted {
            return Err(RepositoryError::Constraint(format!(
                "Session '{}' is deleted and cannot be stored",
                session.id
            )));
        }

        let local_path = session.local_path.to_str().ok_or_else(|| {
            RepositoryError::Serialization(format!(
                "Local path of session '{}' is not valid UTF-8",
                session.id
            ))
        })?;
        let total_bytes = session.total_bytes.map(to_sql_int).transpose()?;
        let downloaded_bytes = to_sql_int(session.downloaded_bytes)?;

        sqlx::query(
            r"
            INSERT INTO download_sessions (
                id, kind, remote_url, local_path, total_bytes, downloaded_bytes,
                state, error_message, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                total_bytes = excluded.total_bytes,
                downloaded_bytes = excluded.downloaded_bytes,
                state = excluded.state,
                error_message = excluded.error_message,
                updated_at = excluded.updated_at
            ",
        )
        .bind(session.id.as_str())
        .bind(&session.kind)
        .bind(&session.remote_url)
        .bind(local_path)
        .bind(total_bytes)
        .bind(downloaded_bytes)
        .bind(session.state.as_str())
        .bind(session.error.as_deref())
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_storage_error)?;

        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM download_sessions WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_storage_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_all(&self, kind: &str) -> Result<Vec<DownloadSession>, RepositoryError> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} WHERE kind = ? ORDER BY seq ASC"))
            .bind(kind)
            .fetch_all(&self.pool)
            .await
            .map_err(map_storage_error)?;

        rows.iter().map(row_to_session).collect()
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM download_sessions")
            .fetch_one(&self.pool)
            .await
            .map_err(map_storage_error)?;

        Ok(from_sql_int(count))
    }

    async fn list_unfinished(&self) -> Result<Vec<DownloadSession>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE state != 'completed' ORDER BY seq ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_storage_error)?;

        rows.iter().map(row_to_session).collect()
    }
}

/// Convert a database row to a `DownloadSession`.
fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<DownloadSession, RepositoryError> {
    let id: String = row.try_get("id").map_err(map_column_error)?;
    let kind: String = row.try_get("kind").map_err(map_column_error)?;
    let remote_url: String = row.try_get("remote_url").map_err(map_column_error)?;
    let local_path: String = row.try_get("local_path").map_err(map_column_error)?;
    let total_bytes: Option<i64> = row.try_get("total_bytes").map_err(map_column_error)?;
    let downloaded_bytes: i64 = row.try_get("downloaded_bytes").map_err(map_column_error)?;
    let state: String = row.try_get("state").map_err(map_column_error)?;
    let error: Option<String> = row.try_get("error_message").map_err(map_column_error)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(map_column_error)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(map_column_error)?;

    let mut session = DownloadSession::new(remote_url, PathBuf::from(local_path))
        .with_id(id)
        .with_kind(kind);
    session.total_bytes = total_bytes.map(from_sql_int);
    session.downloaded_bytes = from_sql_int(downloaded_bytes);
    session.state = SessionState::parse(&state);
    session.error = error;
    session.created_at = created_at;
    session.updated_at = updated_at;

    Ok(session)
}

fn to_sql_int(value: u64) -> Result<i64, RepositoryError> {
    i64::try_from(value)
        .map_err(|_| RepositoryError::Serialization(format!("{value} does not fit in INTEGER")))
}

fn from_sql_int(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn map_storage_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Storage(e.to_string())
}

fn map_column_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Storage(format!("Column read error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TestDb;

    fn session(url: &str) -> DownloadSession {
        DownloadSession::new(url, format!("/tmp/{}", url.rsplit('/').next().unwrap()))
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let db = TestDb::new().await.unwrap();
        let store = db.session_store();

        let mut s = session("https://example.com/a.bin");
        s.total_bytes = Some(1000);
        s.downloaded_bytes = 400;
        s.state = SessionState::Paused;
        store.save(&s).await.unwrap();

        let loaded = store.load(&s.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, s.id);
        assert_eq!(loaded.remote_url, s.remote_url);
        assert_eq!(loaded.local_path, s.local_path);
        assert_eq!(loaded.total_bytes, Some(1000));
        assert_eq!(loaded.downloaded_bytes, 400);
        assert_eq!(loaded.state, SessionState::Paused);
    }

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let db = TestDb::new().await.unwrap();
        let store = db.session_store();

        assert!(store.load(&SessionId::new("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_total_roundtrips_as_none() {
        let db = TestDb::new().await.unwrap();
        let store = db.session_store();

        let s = session("https://example.com/stream");
        store.save(&s).await.unwrap();

        let loaded = store.load(&s.id).await.unwrap().unwrap();
        assert_eq!(loaded.total_bytes, None);
        assert!(loaded.error.is_none());
    }

    #[tokio::test]
    async fn test_update_keeps_insertion_order() {
        let db = TestDb::new().await.unwrap();
        let store = db.session_store();

        let mut first = session("https://example.com/1");
        let second = session("https://example.com/2");
        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();

        first.downloaded_bytes = 10;
        first.error = Some("reset".into());
        store.save(&first).await.unwrap();

        let list = store.list_all("default").await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, first.id);
        assert_eq!(list[0].downloaded_bytes, 10);
        assert_eq!(list[0].error.as_deref(), Some("reset"));
        assert_eq!(list[1].id, second.id);
    }

    #[tokio::test]
    async fn test_update_keeps_first_destination() {
        let db = TestDb::new().await.unwrap();
        let store = db.session_store();

        let first = session("https://example.com/dest.bin");
        store.save(&first).await.unwrap();

        let mut moved = DownloadSession::new(&first.remote_url, "/elsewhere/dest.bin").with_kind("video");
        moved.downloaded_bytes = 50;
        store.save(&moved).await.unwrap();

        let loaded = store.load(&first.id).await.unwrap().unwrap();
        assert_eq!(loaded.local_path, first.local_path);
        assert_eq!(loaded.kind, "default");
        assert_eq!(loaded.downloaded_bytes, 50);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_path_is_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let db = TestDb::new().await.unwrap();
        let store = db.session_store();

        let s = DownloadSession::new(
            "https://example.com/raw",
            PathBuf::from(OsStr::from_bytes(b"/tmp/bad\xff.bin")),
        );
        let err = store.save(&s).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Serialization(_)), "{err:?}");
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_filters_by_kind() {
        let db = TestDb::new().await.unwrap();
        let store = db.session_store();

        store.save(&session("https://example.com/a")).await.unwrap();
        store
            .save(&session("https://example.com/b").with_kind("video"))
            .await
            .unwrap();

        assert_eq!(store.list_all("default").await.unwrap().len(), 1);
        assert_eq!(store.list_all("video").await.unwrap().len(), 1);
        assert!(store.list_all("audio").await.unwrap().is_empty());
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_and_count() {
        let db = TestDb::new().await.unwrap();
        let store = db.session_store();

        let sessions: Vec<_> = ["x", "y", "z"]
            .iter()
            .map(|n| session(&format!("https://example.com/{n}")))
            .collect();
        for s in &sessions {
            store.save(s).await.unwrap();
        }

        assert!(store.delete(&sessions[1].id).await.unwrap());
        assert!(!store.delete(&sessions[1].id).await.unwrap());
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_list_unfinished_skips_completed() {
        let db = TestDb::new().await.unwrap();
        let store = db.session_store();

        let mut done = session("https://example.com/done");
        done.state = SessionState::Completed;
        let mut partial = session("https://example.com/partial");
        partial.state = SessionState::Downloading;
        store.save(&done).await.unwrap();
        store.save(&partial).await.unwrap();

        let unfinished = store.list_unfinished().await.unwrap();
        assert_eq!(unfinished.len(), 1);
        assert_eq!(unfinished[0].id, partial.id);
    }

    #[tokio::test]
    async fn test_deleted_state_is_rejected() {
        let db = TestDb::new().await.unwrap();
        let store = db.session_store();

        let mut s = session("https://example.com/gone");
        s.state = SessionState::Deleted;

        let err = store.save(&s).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Constraint(_)));
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
