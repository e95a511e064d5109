use anyhow::Result;
use chrono::{DateTime, Utc};
use shared::domain::{FormationId, MemberRole, OrganizationId, UserId};
use sqlx::{sqlite::SqliteRow, Row};

use crate::{parse_text, Storage};

#[derive(Debug, Clone)]
pub struct StoredOrganization {
    pub organization_id: OrganizationId,
    pub name: String,
    pub description: Option<String>,
    pub owner_user_id: UserId,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StoredMember {
    pub user_id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StoredTraining {
    pub formation_id: FormationId,
    pub external_id: String,
    pub name: String,
    pub assigned_at: DateTime<Utc>,
}

const ORGANIZATION_COLUMNS: &str = "o.id, o.name, o.description, o.owner_user_id, o.created_at,
     (SELECT COUNT(*) FROM organization_members m WHERE m.organization_id = o.id) AS member_count";

impl Storage {
    /// Creates the organization with `owner` as its first member.
    pub async fn create_organization(
        &self,
        name: &str,
        description: Option<&str>,
        owner: UserId,
    ) -> Result<OrganizationId> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let organization_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO organizations (name, description, owner_user_id, created_at)
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(name)
        .bind(description)
        .bind(owner.0)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO organization_members (organization_id, user_id, role, joined_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(organization_id)
        .bind(owner.0)
        .bind(MemberRole::Owner.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(OrganizationId(organization_id))
    }

    pub async fn get_organization(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Option<StoredOrganization>> {
        let row = sqlx::query(&format!(
            "SELECT {ORGANIZATION_COLUMNS} FROM organizations o WHERE o.id = ?"
        ))
        .bind(organization_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(organization_from_row))
    }

    pub async fn list_organizations_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<(StoredOrganization, MemberRole)>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORGANIZATION_COLUMNS}, me.role AS my_role
             FROM organizations o
             INNER JOIN organization_members me ON me.organization_id = o.id
             WHERE me.user_id = ?
             ORDER BY lower(o.name), o.id"
        ))
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| Ok((organization_from_row(r), parse_text(r.get("my_role"))?)))
            .collect()
    }

    pub async fn update_organization(
        &self,
        organization_id: OrganizationId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<bool> {
        let done = sqlx::query(
            "UPDATE organizations
             SET name = COALESCE(?, name), description = COALESCE(?, description)
             WHERE id = ?",
        )
        .bind(name)
        .bind(description)
        .bind(organization_id.0)
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    pub async fn delete_organization(&self, organization_id: OrganizationId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM organization_trainings WHERE organization_id = ?")
            .bind(organization_id.0)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM organization_members WHERE organization_id = ?")
            .bind(organization_id.0)
            .execute(&mut *tx)
            .await?;
        let done = sqlx::query("DELETE FROM organizations WHERE id = ?")
            .bind(organization_id.0)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(done.rows_affected() > 0)
    }

    pub async fn member_role(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
    ) -> Result<Option<MemberRole>> {
        let role: Option<String> = sqlx::query_scalar(
            "SELECT role FROM organization_members WHERE organization_id = ? AND user_id = ?",
        )
        .bind(organization_id.0)
        .bind(user_id.0)
        .fetch_optional(&self.pool)
        .await?;
        role.map(parse_text).transpose()
    }

    pub async fn list_members(&self, organization_id: OrganizationId) -> Result<Vec<StoredMember>> {
        let rows = sqlx::query(
            "SELECT u.id, u.email, u.name, m.role, m.joined_at
             FROM organization_members m
             INNER JOIN users u ON u.id = m.user_id
             WHERE m.organization_id = ?
             ORDER BY lower(u.email) ASC",
        )
        .bind(organization_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|r| {
                Ok(StoredMember {
                    user_id: UserId(r.get("id")),
                    email: r.get("email"),
                    name: r.get("name"),
                    role: parse_text(r.get("role"))?,
                    joined_at: r.get("joined_at"),
                })
            })
            .collect()
    }

    /// Returns `false` when the user already belongs to the organization.
    pub async fn add_member(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
        role: MemberRole,
    ) -> Result<bool> {
        let done = sqlx::query(
            "INSERT INTO organization_members (organization_id, user_id, role, joined_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(organization_id, user_id) DO NOTHING",
        )
        .bind(organization_id.0)
        .bind(user_id.0)
        .bind(role.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    pub async fn update_member_role(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
        role: MemberRole,
    ) -> Result<bool> {
        let done = sqlx::query(
            "UPDATE organization_members SET role = ? WHERE organization_id = ? AND user_id = ?",
        )
        .bind(role.as_str())
        .bind(organization_id.0)
        .bind(user_id.0)
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    pub async fn remove_member(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
    ) -> Result<bool> {
        let done =
            sqlx::query("DELETE FROM organization_members WHERE organization_id = ? AND user_id = ?")
                .bind(organization_id.0)
                .bind(user_id.0)
                .execute(&self.pool)
                .await?;
        Ok(done.rows_affected() > 0)
    }

    pub async fn list_trainings(&self, organization_id: OrganizationId) -> Result<Vec<StoredTraining>> {
        let rows = sqlx::query(
            "SELECT f.id, f.external_id, f.name, t.assigned_at
             FROM organization_trainings t
             INNER JOIN formations f ON f.id = t.formation_id
             WHERE t.organization_id = ?
             ORDER BY t.id",
        )
        .bind(organization_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| StoredTraining {
                formation_id: FormationId(r.get("id")),
                external_id: r.get("external_id"),
                name: r.get("name"),
                assigned_at: r.get("assigned_at"),
            })
            .collect())
    }

    /// Returns `false` when the formation was already assigned.
    pub async fn assign_training(
        &self,
        organization_id: OrganizationId,
        formation_id: FormationId,
    ) -> Result<bool> {
        let done = sqlx::query(
            "INSERT INTO organization_trainings (organization_id, formation_id, assigned_at)
             VALUES (?, ?, ?)
             ON CONFLICT(organization_id, formation_id) DO NOTHING",
        )
        .bind(organization_id.0)
        .bind(formation_id.0)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    pub async fn unassign_training(
        &self,
        organization_id: OrganizationId,
        formation_id: FormationId,
    ) -> Result<bool> {
        let done = sqlx::query(
            "DELETE FROM organization_trainings WHERE organization_id = ? AND formation_id = ?",
        )
        .bind(organization_id.0)
        .bind(formation_id.0)
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }
}

fn organization_from_row(r: &SqliteRow) -> StoredOrganization {
    StoredOrganization {
        organization_id: OrganizationId(r.get("id")),
        name: r.get("name"),
        description: r.get("description"),
        owner_user_id: UserId(r.get("owner_user_id")),
        member_count: r.get("member_count"),
        created_at: r.get("created_at"),
    }
}

#[cfg(test)]
#[path = "tests/organizations_tests.rs"]
mod tests;
