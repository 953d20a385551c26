//! SQLite-based storage implementation

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use connect_core::ProviderName;
use rusqlite::{params, Connection as SqliteConnection, OptionalExtension, Row};
use uuid::Uuid;

use super::{Connection, Session, SessionId, SessionStore, StoreResult, User, UserId, UserStore};
use crate::error::WebError;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// SQLite-based store implementing both UserStore and SessionStore
pub struct SqliteStore {
    conn: Mutex<SqliteConnection>,
}

fn internal(e: rusqlite::Error) -> WebError {
    WebError::Internal(e.to_string())
}

/// Parse an RFC 3339 column, reporting corrupt values as a conversion failure
fn parse_timestamp(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn insert_user(
    conn: &SqliteConnection,
    email: &str,
    username: &str,
    name: Option<&str>,
) -> StoreResult<UserId> {
    let normalized = email.to_lowercase();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO users (email, username, name, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![normalized, username, name, now],
    )
    .map_err(|e| match unique_violation(&e) {
        Some(msg) if msg.contains("users.username") => WebError::UsernameTaken,
        Some(msg) if msg.contains("users.email") => WebError::EmailAlreadyExists,
        _ => internal(e),
    })?;

    Ok(UserId(conn.last_insert_rowid() as u64))
}

fn insert_connection(
    conn: &SqliteConnection,
    provider_name: ProviderName,
    provider_id: &str,
    user_id: UserId,
) -> StoreResult<Connection> {
    let created_at = Utc::now();

    conn.execute(
        "INSERT INTO connections (provider_name, provider_id, user_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            provider_name.as_str(),
            provider_id,
            user_id.0 as i64,
            created_at.to_rfc3339()
        ],
    )
    .map_err(|e| match unique_violation(&e) {
        Some(msg) if msg.contains("connections.provider_name") => {
            WebError::ConnectionAlreadyExists
        }
        _ => internal(e),
    })?;

    Ok(Connection {
        provider_name,
        provider_id: provider_id.to_string(),
        user_id,
        created_at,
    })
}

/// Map a UNIQUE violation to the domain error for the offending column
fn unique_violation(e: &rusqlite::Error) -> Option<&str> {
    match e {
        rusqlite::Error::SqliteFailure(err, Some(msg))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Some(msg.as_str())
        }
        _ => None,
    }
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: &str) -> Result<Self, WebError> {
        let conn = SqliteConnection::open(path).map_err(internal)?;
        Self::init(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, WebError> {
        let conn = SqliteConnection::open_in_memory().map_err(internal)?;
        Self::init(conn)
    }

    fn init(conn: SqliteConnection) -> Result<Self, WebError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(internal)?;

        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run database migrations
    fn migrate(conn: &SqliteConnection) -> Result<(), WebError> {
        let current_version = Self::get_schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(internal)?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    /// Get current schema version (0 if no schema exists)
    fn get_schema_version(conn: &SqliteConnection) -> Result<i32, WebError> {
        let table_exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
                [],
                |row| row.get(0),
            )
            .map_err(internal)?;

        if !table_exists {
            return Ok(0);
        }

        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })
        .map_err(internal)
    }

    /// Migration to version 1: initial schema
    fn migrate_v1(conn: &SqliteConnection) -> Result<(), WebError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                username TEXT NOT NULL UNIQUE,
                name TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS connections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                provider_name TEXT NOT NULL,
                provider_id TEXT NOT NULL,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                UNIQUE (provider_name, provider_id)
            );
            CREATE INDEX IF NOT EXISTS idx_connections_user_id ON connections(user_id);

            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                expiration_date TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            "#,
        )
        .map_err(internal)?;

        Ok(())
    }

    fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
        let id: i64 = row.get(0)?;
        let created_at: String = row.get(4)?;
        Ok(User {
            id: UserId(id as u64),
            email: row.get(1)?,
            username: row.get(2)?,
            name: row.get(3)?,
            created_at: parse_timestamp(4, &created_at)?,
        })
    }

    fn connection_from_row(row: &Row<'_>) -> rusqlite::Result<Connection> {
        let provider_name: String = row.get(0)?;
        let provider_name = provider_name.parse::<ProviderName>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let user_id: i64 = row.get(2)?;
        let created_at: String = row.get(3)?;
        Ok(Connection {
            provider_name,
            provider_id: row.get(1)?,
            user_id: UserId(user_id as u64),
            created_at: parse_timestamp(3, &created_at)?,
        })
    }

    fn query_user(&self, sql: &str, value: &str) -> StoreResult<Option<User>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(sql, params![value], Self::user_from_row)
            .optional()
            .map_err(internal)
    }
}

impl UserStore for SqliteStore {
    fn create_user(&self, email: &str, username: &str, name: Option<&str>) -> StoreResult<UserId> {
        let conn = self.conn.lock().unwrap();
        insert_user(&conn, email, username, name)
    }

    fn create_user_with_connection(
        &self,
        email: &str,
        username: &str,
        name: Option<&str>,
        provider_name: ProviderName,
        provider_id: &str,
    ) -> StoreResult<Connection> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(internal)?;

        let user_id = insert_user(&tx, email, username, name)?;
        let connection = insert_connection(&tx, provider_name, provider_id, user_id)?;

        tx.commit().map_err(internal)?;
        Ok(connection)
    }

    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.query_user(
            "SELECT id, email, username, name, created_at FROM users WHERE email = ?1",
            &email.to_lowercase(),
        )
    }

    fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.query_user(
            "SELECT id, email, username, name, created_at FROM users WHERE username = ?1",
            username,
        )
    }

    fn create_connection(
        &self,
        provider_name: ProviderName,
        provider_id: &str,
        user_id: UserId,
    ) -> StoreResult<Connection> {
        let conn = self.conn.lock().unwrap();
        insert_connection(&conn, provider_name, provider_id, user_id)
    }

    fn get_connection(
        &self,
        provider_name: ProviderName,
        provider_id: &str,
    ) -> StoreResult<Option<Connection>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT provider_name, provider_id, user_id, created_at FROM connections
             WHERE provider_name = ?1 AND provider_id = ?2",
            params![provider_name.as_str(), provider_id],
            Self::connection_from_row,
        )
        .optional()
        .map_err(internal)
    }

    fn list_connections(&self, user_id: UserId) -> StoreResult<Vec<Connection>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT provider_name, provider_id, user_id, created_at FROM connections
                 WHERE user_id = ?1 ORDER BY created_at ASC, id ASC",
            )
            .map_err(internal)?;

        let connections = stmt
            .query_map(params![user_id.0 as i64], Self::connection_from_row)
            .map_err(internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal)?;

        Ok(connections)
    }
}

impl SessionStore for SqliteStore {
    fn create(&self, user_id: UserId, expiration_date: DateTime<Utc>) -> StoreResult<Session> {
        let conn = self.conn.lock().unwrap();
        let session = Session {
            id: SessionId(Uuid::new_v4().to_string()),
            user_id,
            expiration_date,
            created_at: Utc::now(),
        };

        conn.execute(
            "INSERT INTO sessions (id, user_id, expiration_date, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id.0,
                user_id.0 as i64,
                session.expiration_date.to_rfc3339(),
                session.created_at.to_rfc3339(),
            ],
        )
        .map_err(internal)?;

        Ok(session)
    }

    fn get(&self, session_id: &SessionId) -> StoreResult<Option<Session>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, user_id, expiration_date, created_at FROM sessions WHERE id = ?1",
            params![session_id.0],
            |row| {
                let id: String = row.get(0)?;
                let user_id: i64 = row.get(1)?;
                let expiration_date: String = row.get(2)?;
                let created_at: String = row.get(3)?;
                Ok(Session {
                    id: SessionId(id),
                    user_id: UserId(user_id as u64),
                    expiration_date: parse_timestamp(2, &expiration_date)?,
                    created_at: parse_timestamp(3, &created_at)?,
                })
            },
        )
        .optional()
        .map_err(internal)
    }

    fn delete(&self, session_id: &SessionId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id.0])
            .map_err(internal)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn create_test_store() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        (store, dir) // Return dir to keep it alive
    }

    #[test]
    fn test_create_user_and_lookup() {
        let (store, _dir) = create_test_store();

        let user_id = store.create_user("kody@example.com", "kody", Some("Kody")).unwrap();

        let user = store
            .get_user_by_username("kody")
            .unwrap()
            .expect("User should exist");
        assert_eq!(user.id, user_id);
        assert_eq!(user.email, "kody@example.com");
        assert_eq!(user.name.as_deref(), Some("Kody"));
    }

    #[test]
    fn test_email_case_insensitive() {
        let (store, _dir) = create_test_store();

        store.create_user("Kody@Example.COM", "kody", None).unwrap();

        assert!(store.get_user_by_email("kody@example.com").unwrap().is_some());
        assert!(store.get_user_by_email("KODY@EXAMPLE.COM").unwrap().is_some());
    }

    #[test]
    fn test_duplicate_user_fields_rejected() {
        let (store, _dir) = create_test_store();
        store.create_user("kody@example.com", "kody", None).unwrap();

        let result = store.create_user("KODY@example.com", "someone", None);
        assert!(matches!(result, Err(WebError::EmailAlreadyExists)));

        let result = store.create_user("someone@example.com", "kody", None);
        assert!(matches!(result, Err(WebError::UsernameTaken)));
    }

    #[test]
    fn test_connection_roundtrip() {
        let (store, _dir) = create_test_store();
        let user_id = store.create_user("kody@example.com", "kody", None).unwrap();

        store.create_connection(ProviderName::GitHub, "1234", user_id).unwrap();

        let found = store
            .get_connection(ProviderName::GitHub, "1234")
            .unwrap()
            .expect("Connection should exist");
        assert_eq!(found.user_id, user_id);
        assert_eq!(found.provider_name, ProviderName::GitHub);

        assert!(store.get_connection(ProviderName::GitHub, "9999").unwrap().is_none());
        assert_eq!(store.list_connections(user_id).unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_connection_rejected() {
        let (store, _dir) = create_test_store();
        let first = store.create_user("a@example.com", "first", None).unwrap();
        let second = store.create_user("b@example.com", "second", None).unwrap();

        store.create_connection(ProviderName::GitHub, "1234", first).unwrap();
        let result = store.create_connection(ProviderName::GitHub, "1234", second);
        assert!(matches!(result, Err(WebError::ConnectionAlreadyExists)));
    }

    #[test]
    fn test_session_lifecycle() {
        let (store, _dir) = create_test_store();

        let user_id = store.create_user("kody@example.com", "kody", None).unwrap();
        let session = store.create(user_id, Utc::now() + Duration::days(30)).unwrap();

        let loaded = store.get(&session.id).unwrap().expect("Session should exist");
        assert_eq!(loaded.user_id, user_id);
        assert!(!loaded.is_expired());

        store.delete(&session.id).unwrap();
        assert!(store.get(&session.id).unwrap().is_none());
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let path = path.to_str().unwrap();

        let user_id = {
            let store = SqliteStore::open(path).unwrap();
            store.create_user("kody@example.com", "kody", None).unwrap()
        };

        let store = SqliteStore::open(path).unwrap();
        let user = store.get_user_by_email("kody@example.com").unwrap();
        assert_eq!(user.map(|u| u.id), Some(user_id));
    }

    #[test]
    fn test_user_with_connection_rolls_back() {
        let (store, _dir) = create_test_store();
        let owner = store.create_user("hannah@example.com", "hannah", None).unwrap();
        store.create_connection(ProviderName::GitHub, "1234", owner).unwrap();

        let result = store.create_user_with_connection(
            "kody@example.com",
            "kody",
            None,
            ProviderName::GitHub,
            "1234",
        );
        assert!(matches!(result, Err(WebError::ConnectionAlreadyExists)));
        // The user insert was rolled back with the failed connection
        assert!(store.get_user_by_email("kody@example.com").unwrap().is_none());

        let connection = store
            .create_user_with_connection("kody@example.com", "kody", None, ProviderName::GitHub, "5678")
            .unwrap();
        let user = store.get_user_by_username("kody").unwrap().unwrap();
        assert_eq!(connection.user_id, user.id);
        assert_eq!(store.list_connections(user.id).unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_timestamp_is_an_error() {
        let (store, _dir) = create_test_store();
        let user_id = store.create_user("kody@example.com", "kody", None).unwrap();
        let session = store.create(user_id, Utc::now() + Duration::days(1)).unwrap();

        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "UPDATE sessions SET expiration_date = 'not a date' WHERE id = ?1",
                params![session.id.0],
            )
            .unwrap();
        }

        assert!(matches!(store.get(&session.id), Err(WebError::Internal(_))));
    }
}
