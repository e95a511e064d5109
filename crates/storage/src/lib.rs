use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use shared::{
    domain::UserId,
    error::{ApiError, ApiException},
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

mod builds;
mod formations;
mod organizations;

pub use builds::{BuildFields, StoredBuild, StoredModule};
pub use formations::{
    FormationFields, FormationPatch, StoredContent, StoredFormation, StoredOption,
    StoredQuestion, StoredStep,
};
pub use organizations::{StoredMember, StoredOrganization, StoredTraining};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredUser {
    pub user_id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        // Every connection to `sqlite::memory:` opens its own database, so the
        // pool keeps exactly one alive for its whole lifetime.
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(connect_options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Inserts the user or refreshes its display name when one is given.
    pub async fn upsert_user(&self, email: &str, name: Option<&str>) -> Result<UserId> {
        let rec = sqlx::query(
            "INSERT INTO users (email, name, created_at) VALUES (?, ?, ?)
             ON CONFLICT(email) DO UPDATE SET name = COALESCE(excluded.name, users.name)
             RETURNING id",
        )
        .bind(email)
        .bind(name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(UserId(rec.get::<i64, _>(0)))
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<Option<StoredUser>> {
        let row = sqlx::query("SELECT id, email, name, created_at FROM users WHERE id = ?")
            .bind(user_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| StoredUser {
            user_id: UserId(r.get("id")),
            email: r.get("email"),
            name: r.get("name"),
            created_at: r.get("created_at"),
        }))
    }
}

/// Decodes one of the lowercase text enums stored in the schema.
fn parse_text<T>(value: String) -> Result<T>
where
    T: FromStr<Err = String>,
{
    value.parse::<T>().map_err(|err| anyhow!(err))
}

/// Wraps a caller-facing rejection so that it survives the trip through `anyhow`.
fn rejected(error: ApiError) -> anyhow::Error {
    ApiException::from(error).into()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.contains(":memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
