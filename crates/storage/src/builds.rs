use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use shared::{
    domain::{BuildId, ContentKind, FormationId, ModuleId},
    error::ApiError,
    protocol::ModuleInput,
};
use sqlx::{sqlite::SqliteRow, Row};

use crate::{parse_text, rejected, Storage};

/// Identity of a Unity build in blob storage.
#[derive(Debug, Clone)]
pub struct BuildFields {
    pub build_ref: String,
    pub container: String,
    pub path: String,
    pub name: String,
    pub version: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StoredBuild {
    pub build_id: BuildId,
    pub fields: BuildFields,
    pub formation_id: Option<FormationId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StoredModule {
    pub module_id: ModuleId,
    pub build_id: BuildId,
    pub module_key: String,
    pub title: String,
    pub kind: ContentKind,
    pub content_json: String,
    pub sort_order: i64,
}

const BUILD_COLUMNS: &str =
    "id, build_ref, container, path, name, version, formation_id, created_at, updated_at";
const MODULE_COLUMNS: &str = "id, build_id, module_key, title, kind, content_json, sort_order";

impl Storage {
    pub async fn list_builds(&self) -> Result<Vec<StoredBuild>> {
        let rows = sqlx::query(&format!("SELECT {BUILD_COLUMNS} FROM builds_3d ORDER BY build_ref"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(build_from_row).collect())
    }

    pub async fn get_build(&self, build_id: BuildId) -> Result<Option<StoredBuild>> {
        let row = sqlx::query(&format!("SELECT {BUILD_COLUMNS} FROM builds_3d WHERE id = ?"))
            .bind(build_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(build_from_row))
    }

    pub async fn build_for_formation(&self, formation_id: FormationId) -> Result<Option<StoredBuild>> {
        let row = sqlx::query(&format!(
            "SELECT {BUILD_COLUMNS} FROM builds_3d WHERE formation_id = ? ORDER BY id LIMIT 1"
        ))
        .bind(formation_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(build_from_row))
    }

    /// Records the build if needed and makes it the formation's only build.
    pub async fn link_build(&self, fields: &BuildFields, formation_id: FormationId) -> Result<BuildId> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE builds_3d SET formation_id = NULL, updated_at = ?
             WHERE formation_id = ? AND build_ref <> ?",
        )
        .bind(now)
        .bind(formation_id.0)
        .bind(&fields.build_ref)
        .execute(&mut *tx)
        .await?;

        let build_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO builds_3d (build_ref, container, path, name, version, formation_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(build_ref) DO UPDATE SET
                formation_id = excluded.formation_id,
                version = COALESCE(excluded.version, builds_3d.version),
                updated_at = excluded.updated_at
             RETURNING id",
        )
        .bind(&fields.build_ref)
        .bind(&fields.container)
        .bind(&fields.path)
        .bind(&fields.name)
        .bind(fields.version.as_deref())
        .bind(formation_id.0)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(BuildId(build_id))
    }

    /// Detaches the formation's build. The record and its modules are kept.
    pub async fn unlink_formation_build(&self, formation_id: FormationId) -> Result<bool> {
        let done = sqlx::query(
            "UPDATE builds_3d SET formation_id = NULL, updated_at = ? WHERE formation_id = ?",
        )
        .bind(Utc::now())
        .bind(formation_id.0)
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    pub async fn delete_build(&self, build_id: BuildId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM modules_3d WHERE build_id = ?")
            .bind(build_id.0)
            .execute(&mut *tx)
            .await?;
        let done = sqlx::query("DELETE FROM builds_3d WHERE id = ?")
            .bind(build_id.0)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(done.rows_affected() > 0)
    }

    pub async fn list_modules(&self, build_id: BuildId) -> Result<Vec<StoredModule>> {
        let rows = sqlx::query(&format!(
            "SELECT {MODULE_COLUMNS} FROM modules_3d WHERE build_id = ? ORDER BY sort_order, id"
        ))
        .bind(build_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(module_from_row).collect()
    }

    pub async fn get_module(&self, module_id: ModuleId) -> Result<Option<StoredModule>> {
        let row = sqlx::query(&format!("SELECT {MODULE_COLUMNS} FROM modules_3d WHERE id = ?"))
            .bind(module_id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(module_from_row).transpose()
    }

    /// Replace-all save of a build's modules, renumbered in input order.
    pub async fn replace_modules(&self, build_id: BuildId, modules: &[ModuleInput]) -> Result<()> {
        let mut seen = HashSet::new();
        for module in modules {
            if !seen.insert(module.module_key.as_str()) {
                return Err(rejected(ApiError::validation(format!(
                    "duplicate module key '{}'",
                    module.module_key
                ))));
            }
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM modules_3d WHERE build_id = ?")
            .bind(build_id.0)
            .execute(&mut *tx)
            .await?;

        for (order, module) in modules.iter().enumerate() {
            sqlx::query(
                "INSERT INTO modules_3d (build_id, module_key, title, kind, content_json, sort_order)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(build_id.0)
            .bind(&module.module_key)
            .bind(&module.title)
            .bind(module.kind.as_str())
            .bind(module.content.to_string())
            .bind(order as i64)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE builds_3d SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(build_id.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn update_module(
        &self,
        module_id: ModuleId,
        title: Option<&str>,
        content_json: Option<&str>,
    ) -> Result<bool> {
        let done = sqlx::query(
            "UPDATE modules_3d
             SET title = COALESCE(?, title), content_json = COALESCE(?, content_json)
             WHERE id = ?",
        )
        .bind(title)
        .bind(content_json)
        .bind(module_id.0)
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }
}

fn build_from_row(r: &SqliteRow) -> StoredBuild {
    StoredBuild {
        build_id: BuildId(r.get("id")),
        fields: BuildFields {
            build_ref: r.get("build_ref"),
            container: r.get("container"),
            path: r.get("path"),
            name: r.get("name"),
            version: r.get("version"),
        },
        formation_id: r.get::<Option<i64>, _>("formation_id").map(FormationId),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

fn module_from_row(r: &SqliteRow) -> Result<StoredModule> {
    Ok(StoredModule {
        module_id: ModuleId(r.get("id")),
        build_id: BuildId(r.get("build_id")),
        module_key: r.get("module_key"),
        title: r.get("title"),
        kind: parse_text(r.get("kind"))?,
        content_json: r.get("content_json"),
        sort_order: r.get("sort_order"),
    })
}

#[cfg(test)]
#[path = "tests/builds_tests.rs"]
mod tests;
