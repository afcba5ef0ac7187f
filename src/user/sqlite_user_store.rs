use crate::sql_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnDelete, SqlType, Table, VersionedSchema, BASE_DB_VERSION,
    DEFAULT_TIMESTAMP,
};
use crate::user::auth::CredentialsHasher;
use crate::user::{
    AuthToken, AuthTokenValue, UserAuthCredentials, UserAuthCredentialsStore, UserAuthTokenStore,
    UserStore, UsernamePasswordCredentials,
};
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::info;

/// V 1
const USER_TABLE_V1: Table = Table {
    name: "user",
    columns: &[
        sql_column!("id", &SqlType::Integer, is_primary_key = true),
        sql_column!("handle", &SqlType::Text, non_null = true, is_unique = true),
        sql_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_user_handle", "handle")],
};

const USER_FK: ForeignKey = ForeignKey {
    foreign_table: "user",
    foreign_column: "id",
    on_delete: ForeignKeyOnDelete::Cascade,
};

const AUTH_TOKEN_TABLE_V1: Table = Table {
    name: "auth_token",
    columns: &[
        sql_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sql_column!("value", &SqlType::Text, non_null = true, is_unique = true),
        sql_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sql_column!("last_used", &SqlType::Integer),
    ],
    indices: &[("idx_auth_token_value", "value")],
};

const USER_PASSWORD_CREDENTIALS_TABLE_V1: Table = Table {
    name: "user_password_credentials",
    columns: &[
        sql_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sql_column!("salt", &SqlType::Text, non_null = true),
        sql_column!("hash", &SqlType::Text, non_null = true),
        sql_column!("hasher", &SqlType::Text, non_null = true),
        sql_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sql_column!("last_tried", &SqlType::Integer),
        sql_column!("last_used", &SqlType::Integer),
    ],
    indices: &[],
};

pub const USER_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[
        USER_TABLE_V1,
        AUTH_TOKEN_TABLE_V1,
        USER_PASSWORD_CREDENTIALS_TABLE_V1,
    ],
    migration: None,
}];

fn to_unix_secs(t: &SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn from_unix_secs(secs: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}

#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();

        let conn = Connection::open(path).context("Failed to open user database")?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;

        if is_new_db {
            info!("Creating new user database at {:?}", path);
            USER_VERSIONED_SCHEMAS.last().unwrap().create(&conn)?;
        } else {
            let raw_version: i64 = conn
                .query_row("PRAGMA user_version;", [], |row| row.get(0))
                .context("Failed to read database version")?;
            let db_version = raw_version - BASE_DB_VERSION as i64;

            if db_version < 1 {
                bail!("User database version {} is invalid (expected >= 1)", db_version);
            }

            let schema = USER_VERSIONED_SCHEMAS
                .iter()
                .find(|s| s.version == db_version as usize)
                .with_context(|| format!("Unknown user database version {}", db_version))?;
            schema.validate(&conn).with_context(|| {
                format!(
                    "User database schema validation failed for version {}",
                    db_version
                )
            })?;
        }

        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_auth_token(row: &rusqlite::Row) -> rusqlite::Result<AuthToken> {
        Ok(AuthToken {
            user_id: row.get::<_, i64>("user_id")? as usize,
            value: AuthTokenValue(row.get("value")?),
            created: from_unix_secs(row.get("created")?),
            last_used: row
                .get::<_, Option<i64>>("last_used")?
                .map(from_unix_secs),
        })
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, user_handle: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO user (handle) VALUES (?1)",
            params![user_handle],
        )
        .with_context(|| format!("Failed to create user {}", user_handle))?;
        Ok(conn.last_insert_rowid() as usize)
    }

    fn get_user_handle(&self, user_id: usize) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let handle = conn
            .query_row(
                "SELECT handle FROM user WHERE id = ?1",
                params![user_id as i64],
                |row| row.get(0),
            )
            .optional()?;
        Ok(handle)
    }

    fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>> {
        let conn = self.conn.lock().unwrap();
        let id: Option<i64> = conn
            .query_row(
                "SELECT id FROM user WHERE handle = ?1",
                params![user_handle],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.map(|id| id as usize))
    }

    fn get_all_user_handles(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT handle FROM user ORDER BY id")?;
        let handles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(handles)
    }
}

impl UserAuthCredentialsStore for SqliteUserStore {
    fn get_user_auth_credentials(&self, user_handle: &str) -> Result<Option<UserAuthCredentials>> {
        let conn = self.conn.lock().unwrap();

        let user_id: Option<i64> = conn
            .query_row(
                "SELECT id FROM user WHERE handle = ?1",
                params![user_handle],
                |row| row.get(0),
            )
            .optional()?;
        let user_id = match user_id {
            Some(id) => id,
            None => return Ok(None),
        };

        let mut stmt = conn.prepare(
            "SELECT salt, hash, hasher, created, last_tried, last_used
             FROM user_password_credentials WHERE user_id = ?1",
        )?;
        let username_password = stmt
            .query_row(params![user_id], |row| {
                let hasher_str: String = row.get("hasher")?;
                Ok((
                    row.get::<_, String>("salt")?,
                    row.get::<_, String>("hash")?,
                    hasher_str,
                    row.get::<_, i64>("created")?,
                    row.get::<_, Option<i64>>("last_tried")?,
                    row.get::<_, Option<i64>>("last_used")?,
                ))
            })
            .optional()?
            .map(
                |(salt, hash, hasher_str, created, last_tried, last_used)| {
                    Ok::<_, anyhow::Error>(UsernamePasswordCredentials {
                        user_id: user_id as usize,
                        salt,
                        hash,
                        hasher: CredentialsHasher::from_str(&hasher_str)?,
                        created: from_unix_secs(created),
                        last_tried: last_tried.map(from_unix_secs),
                        last_used: last_used.map(from_unix_secs),
                    })
                },
            )
            .transpose()?;

        Ok(Some(UserAuthCredentials {
            user_id: user_id as usize,
            username_password,
        }))
    }

    fn update_user_auth_credentials(&self, credentials: UserAuthCredentials) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM user_password_credentials WHERE user_id = ?1",
            params![credentials.user_id as i64],
        )?;

        if let Some(pw) = &credentials.username_password {
            tx.execute(
                "INSERT INTO user_password_credentials (user_id, salt, hash, hasher, created, last_tried, last_used)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    credentials.user_id as i64,
                    pw.salt,
                    pw.hash,
                    pw.hasher.to_string(),
                    to_unix_secs(&pw.created),
                    pw.last_tried.as_ref().map(to_unix_secs),
                    pw.last_used.as_ref().map(to_unix_secs),
                ],
            )
            .context("Failed to store password credentials")?;
        }

        tx.commit()?;
        Ok(())
    }
}

impl UserAuthTokenStore for SqliteUserStore {
    fn get_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, value, created, last_used FROM auth_token WHERE value = ?1",
        )?;
        let auth_token = stmt
            .query_row(params![token.0], Self::row_to_auth_token)
            .optional()?;
        Ok(auth_token)
    }

    fn delete_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let deleted = self.get_user_auth_token(token)?;
        if deleted.is_some() {
            let conn = self.conn.lock().unwrap();
            conn.execute("DELETE FROM auth_token WHERE value = ?1", params![token.0])?;
        }
        Ok(deleted)
    }

    fn update_user_auth_token_last_used_timestamp(&self, token: &AuthTokenValue) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE auth_token SET last_used = ?1 WHERE value = ?2",
            params![to_unix_secs(&SystemTime::now()), token.0],
        )?;
        Ok(())
    }

    fn add_user_auth_token(&self, token: AuthToken) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO auth_token (user_id, value, created, last_used) VALUES (?1, ?2, ?3, ?4)",
            params![
                token.user_id as i64,
                token.value.0,
                to_unix_secs(&token.created),
                token.last_used.as_ref().map(to_unix_secs),
            ],
        )
        .context("Failed to add auth token")?;
        Ok(())
    }
}
