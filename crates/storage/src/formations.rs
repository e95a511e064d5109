use std::collections::{HashMap, HashSet};

use anyhow::Result;
use chrono::{DateTime, Utc};
use shared::{
    domain::{ContentId, ContentKind, FormationId, OptionId, QuestionId, QuestionKind, StepId},
    error::ApiError,
    protocol::{ContentDocument, QuestionInput, StepInput},
};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};

use crate::{is_unique_violation, parse_text, rejected, Storage};

/// Column values of a formation row, as written on create/import/duplicate.
#[derive(Debug, Clone)]
pub struct FormationFields {
    pub external_id: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub duration_minutes: Option<i64>,
    pub category: Option<String>,
    pub is_public: bool,
}

/// `None` leaves a column untouched. An empty string clears an optional
/// text column.
#[derive(Debug, Clone, Default)]
pub struct FormationPatch {
    pub external_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub duration_minutes: Option<i64>,
    pub category: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct StoredFormation {
    pub formation_id: FormationId,
    pub fields: FormationFields,
    pub content_count: i64,
    pub build_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StoredContent {
    pub content_id: ContentId,
    pub formation_id: FormationId,
    pub kind: ContentKind,
    pub title: String,
    pub description: Option<String>,
    pub sort_order: i64,
}

#[derive(Debug, Clone)]
pub struct StoredStep {
    pub step_id: StepId,
    pub title: String,
    pub instruction: Option<String>,
    pub image_url: Option<String>,
    pub sort_order: i64,
}

#[derive(Debug, Clone)]
pub struct StoredQuestion {
    pub question_id: QuestionId,
    pub text: String,
    pub kind: QuestionKind,
    pub explanation: Option<String>,
    pub sort_order: i64,
    pub options: Vec<StoredOption>,
}

#[derive(Debug, Clone)]
pub struct StoredOption {
    pub option_id: OptionId,
    pub text: String,
    pub is_correct: bool,
    pub sort_order: i64,
}

const FORMATION_COLUMNS: &str = "f.id, f.external_id, f.name, f.description, f.image_url,
     f.duration_minutes, f.category, f.is_public, f.created_at, f.updated_at,
     (SELECT COUNT(*) FROM formation_contents c WHERE c.formation_id = f.id) AS content_count,
     (SELECT b.build_ref FROM builds_3d b WHERE b.formation_id = f.id ORDER BY b.id LIMIT 1) AS build_ref";

impl Storage {
    /// Newest first. `search` is a literal, case-insensitive substring of
    /// the name or external id, folded with Unicode rules.
    pub async fn list_formations(&self, search: Option<&str>) -> Result<Vec<StoredFormation>> {
        let rows = sqlx::query(&format!(
            "SELECT {FORMATION_COLUMNS} FROM formations f ORDER BY f.id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        let formations = rows.iter().map(formation_from_row);

        let Some(term) = search
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase)
        else {
            return Ok(formations.collect());
        };
        Ok(formations
            .filter(|formation| {
                formation.fields.name.to_lowercase().contains(&term)
                    || formation.fields.external_id.to_lowercase().contains(&term)
            })
            .collect())
    }

    pub async fn get_formation(&self, formation_id: FormationId) -> Result<Option<StoredFormation>> {
        let row = sqlx::query(&format!(
            "SELECT {FORMATION_COLUMNS} FROM formations f WHERE f.id = ?"
        ))
        .bind(formation_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(formation_from_row))
    }

    pub async fn external_id_in_use(&self, external_id: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM formations WHERE external_id = ?")
            .bind(external_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn create_formation(&self, fields: &FormationFields) -> Result<FormationId> {
        let mut conn = self.pool.acquire().await?;
        insert_formation(&mut conn, fields).await
    }

    pub async fn update_formation(
        &self,
        formation_id: FormationId,
        patch: &FormationPatch,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE formations SET
                external_id = COALESCE(?, external_id),
                name = COALESCE(?, name),
                description = CASE WHEN ? IS NULL THEN description ELSE NULLIF(?, '') END,
                image_url = CASE WHEN ? IS NULL THEN image_url ELSE NULLIF(?, '') END,
                duration_minutes = COALESCE(?, duration_minutes),
                category = CASE WHEN ? IS NULL THEN category ELSE NULLIF(?, '') END,
                is_public = COALESCE(?, is_public),
                updated_at = ?
             WHERE id = ?",
        )
        .bind(patch.external_id.as_deref())
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.image_url.as_deref())
        .bind(patch.image_url.as_deref())
        .bind(patch.duration_minutes)
        .bind(patch.category.as_deref())
        .bind(patch.category.as_deref())
        .bind(patch.is_public)
        .bind(Utc::now())
        .bind(formation_id.0)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.rows_affected() > 0),
            Err(err) if is_unique_violation(&err) => Err(rejected(ApiError::validation(
                "external id is already used by another formation",
            ))),
            Err(err) => Err(err.into()),
        }
    }

    /// Removes the formation and everything hanging off it. Linked builds are
    /// kept but unlinked.
    pub async fn delete_formation(&self, formation_id: FormationId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM formations WHERE id = ?")
            .bind(formation_id.0)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(false);
        }

        let content_ids: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM formation_contents WHERE formation_id = ?")
                .bind(formation_id.0)
                .fetch_all(&mut *tx)
                .await?;
        for content_id in content_ids {
            delete_content_children(&mut tx, ContentId(content_id)).await?;
        }

        sqlx::query("DELETE FROM formation_contents WHERE formation_id = ?")
            .bind(formation_id.0)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE builds_3d SET formation_id = NULL, updated_at = ? WHERE formation_id = ?")
            .bind(Utc::now())
            .bind(formation_id.0)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM organization_trainings WHERE formation_id = ?")
            .bind(formation_id.0)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM formations WHERE id = ?")
            .bind(formation_id.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Copies the formation with its contents, steps, questions and options
    /// in one transaction. Returns `None` when the source does not exist.
    pub async fn duplicate_formation(
        &self,
        formation_id: FormationId,
        external_id: &str,
        name: &str,
    ) -> Result<Option<FormationId>> {
        let mut tx = self.pool.begin().await?;

        let Some(source) = sqlx::query(&format!(
            "SELECT {FORMATION_COLUMNS} FROM formations f WHERE f.id = ?"
        ))
        .bind(formation_id.0)
        .fetch_optional(&mut *tx)
        .await?
        .as_ref()
        .map(formation_from_row) else {
            return Ok(None);
        };

        let fields = FormationFields {
            external_id: external_id.to_string(),
            name: name.to_string(),
            ..source.fields
        };
        let copy_id = insert_formation(&mut tx, &fields).await?;

        let contents = sqlx::query(
            "SELECT id, formation_id, kind, title, description, sort_order
             FROM formation_contents WHERE formation_id = ? ORDER BY sort_order, id",
        )
        .bind(formation_id.0)
        .fetch_all(&mut *tx)
        .await?;

        for row in contents {
            let content = content_from_row(&row)?;
            let copied_content = sqlx::query_scalar::<_, i64>(
                "INSERT INTO formation_contents (formation_id, kind, title, description, sort_order)
                 VALUES (?, ?, ?, ?, ?) RETURNING id",
            )
            .bind(copy_id.0)
            .bind(content.kind.as_str())
            .bind(&content.title)
            .bind(content.description.as_deref())
            .bind(content.sort_order)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO formation_steps (content_id, title, instruction, image_url, sort_order)
                 SELECT ?, title, instruction, image_url, sort_order
                 FROM formation_steps WHERE content_id = ? ORDER BY sort_order, id",
            )
            .bind(copied_content)
            .bind(content.content_id.0)
            .execute(&mut *tx)
            .await?;

            let questions: Vec<i64> = sqlx::query_scalar(
                "SELECT id FROM formation_questions WHERE content_id = ? ORDER BY sort_order, id",
            )
            .bind(content.content_id.0)
            .fetch_all(&mut *tx)
            .await?;
            for question_id in questions {
                let copied_question = sqlx::query_scalar::<_, i64>(
                    "INSERT INTO formation_questions (content_id, text, kind, explanation, sort_order)
                     SELECT ?, text, kind, explanation, sort_order
                     FROM formation_questions WHERE id = ? RETURNING id",
                )
                .bind(copied_content)
                .bind(question_id)
                .fetch_one(&mut *tx)
                .await?;

                sqlx::query(
                    "INSERT INTO formation_options (question_id, text, is_correct, sort_order)
                     SELECT ?, text, is_correct, sort_order
                     FROM formation_options WHERE question_id = ? ORDER BY sort_order, id",
                )
                .bind(copied_question)
                .bind(question_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(Some(copy_id))
    }

    /// Creates a formation with its whole content tree in one transaction.
    pub async fn import_formation(
        &self,
        fields: &FormationFields,
        contents: &[ContentDocument],
    ) -> Result<FormationId> {
        let mut tx = self.pool.begin().await?;
        let formation_id = insert_formation(&mut tx, fields).await?;

        for (order, content) in contents.iter().enumerate() {
            let content_id = sqlx::query_scalar::<_, i64>(
                "INSERT INTO formation_contents (formation_id, kind, title, description, sort_order)
                 VALUES (?, ?, ?, ?, ?) RETURNING id",
            )
            .bind(formation_id.0)
            .bind(content.kind.as_str())
            .bind(&content.title)
            .bind(content.description.as_deref())
            .bind(order as i64)
            .fetch_one(&mut *tx)
            .await?;

            insert_steps(&mut tx, ContentId(content_id), &content.steps).await?;
            insert_questions(&mut tx, ContentId(content_id), &content.questions).await?;
        }

        tx.commit().await?;
        Ok(formation_id)
    }

    pub async fn list_contents(&self, formation_id: FormationId) -> Result<Vec<StoredContent>> {
        let rows = sqlx::query(
            "SELECT id, formation_id, kind, title, description, sort_order
             FROM formation_contents WHERE formation_id = ? ORDER BY sort_order, id",
        )
        .bind(formation_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(content_from_row).collect()
    }

    pub async fn get_content(&self, content_id: ContentId) -> Result<Option<StoredContent>> {
        let row = sqlx::query(
            "SELECT id, formation_id, kind, title, description, sort_order
             FROM formation_contents WHERE id = ?",
        )
        .bind(content_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(content_from_row).transpose()
    }

    /// Appends a content at the end of the formation.
    pub async fn create_content(
        &self,
        formation_id: FormationId,
        kind: ContentKind,
        title: &str,
        description: Option<&str>,
    ) -> Result<ContentId> {
        let mut tx = self.pool.begin().await?;
        let next_order: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM formation_contents WHERE formation_id = ?",
        )
        .bind(formation_id.0)
        .fetch_one(&mut *tx)
        .await?;

        let content_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO formation_contents (formation_id, kind, title, description, sort_order)
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(formation_id.0)
        .bind(kind.as_str())
        .bind(title)
        .bind(description)
        .bind(next_order)
        .fetch_one(&mut *tx)
        .await?;
        touch_formation(&mut tx, formation_id).await?;

        tx.commit().await?;
        Ok(ContentId(content_id))
    }

    pub async fn update_content(
        &self,
        content_id: ContentId,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<bool> {
        let done = sqlx::query(
            "UPDATE formation_contents
             SET title = COALESCE(?, title), description = COALESCE(?, description)
             WHERE id = ?",
        )
        .bind(title)
        .bind(description)
        .bind(content_id.0)
        .execute(&self.pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Deletes a content and its children, then closes the gap it left in
    /// the formation's ordering. Returns the owning formation.
    pub async fn delete_content(&self, content_id: ContentId) -> Result<Option<FormationId>> {
        let mut tx = self.pool.begin().await?;

        let formation_id: Option<i64> =
            sqlx::query_scalar("SELECT formation_id FROM formation_contents WHERE id = ?")
                .bind(content_id.0)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(formation_id) = formation_id.map(FormationId) else {
            return Ok(None);
        };

        delete_content_children(&mut tx, content_id).await?;
        sqlx::query("DELETE FROM formation_contents WHERE id = ?")
            .bind(content_id.0)
            .execute(&mut *tx)
            .await?;
        resequence_contents(&mut tx, formation_id).await?;
        touch_formation(&mut tx, formation_id).await?;

        tx.commit().await?;
        Ok(Some(formation_id))
    }

    /// Rewrites the order of a formation's contents. `content_ids` must name
    /// every content of the formation exactly once.
    pub async fn reorder_contents(
        &self,
        formation_id: FormationId,
        content_ids: &[ContentId],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let current: HashSet<i64> =
            sqlx::query_scalar::<_, i64>("SELECT id FROM formation_contents WHERE formation_id = ?")
                .bind(formation_id.0)
                .fetch_all(&mut *tx)
                .await?
                .into_iter()
                .collect();
        let requested: HashSet<i64> = content_ids.iter().map(|id| id.0).collect();
        if requested.len() != content_ids.len() || requested != current {
            return Err(rejected(ApiError::validation(
                "content_ids must list every content of the formation exactly once",
            )));
        }

        for (order, content_id) in content_ids.iter().enumerate() {
            sqlx::query("UPDATE formation_contents SET sort_order = ? WHERE id = ?")
                .bind(order as i64)
                .bind(content_id.0)
                .execute(&mut *tx)
                .await?;
        }
        touch_formation(&mut tx, formation_id).await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn list_steps(&self, content_id: ContentId) -> Result<Vec<StoredStep>> {
        let rows = sqlx::query(
            "SELECT id, title, instruction, image_url, sort_order
             FROM formation_steps WHERE content_id = ? ORDER BY sort_order, id",
        )
        .bind(content_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| StoredStep {
                step_id: StepId(r.get("id")),
                title: r.get("title"),
                instruction: r.get("instruction"),
                image_url: r.get("image_url"),
                sort_order: r.get("sort_order"),
            })
            .collect())
    }

    pub async fn list_questions(&self, content_id: ContentId) -> Result<Vec<StoredQuestion>> {
        let rows = sqlx::query(
            "SELECT id, text, kind, explanation, sort_order
             FROM formation_questions WHERE content_id = ? ORDER BY sort_order, id",
        )
        .bind(content_id.0)
        .fetch_all(&self.pool)
        .await?;

        let option_rows = sqlx::query(
            "SELECT o.id, o.question_id, o.text, o.is_correct, o.sort_order
             FROM formation_options o
             INNER JOIN formation_questions q ON q.id = o.question_id
             WHERE q.content_id = ?
             ORDER BY o.sort_order, o.id",
        )
        .bind(content_id.0)
        .fetch_all(&self.pool)
        .await?;

        let mut options_by_question: HashMap<i64, Vec<StoredOption>> = HashMap::new();
        for r in option_rows {
            options_by_question
                .entry(r.get("question_id"))
                .or_default()
                .push(StoredOption {
                    option_id: OptionId(r.get("id")),
                    text: r.get("text"),
                    is_correct: r.get("is_correct"),
                    sort_order: r.get("sort_order"),
                });
        }

        rows.into_iter()
            .map(|r| {
                let question_id: i64 = r.get("id");
                Ok(StoredQuestion {
                    question_id: QuestionId(question_id),
                    text: r.get("text"),
                    kind: parse_text(r.get("kind"))?,
                    explanation: r.get("explanation"),
                    sort_order: r.get("sort_order"),
                    options: options_by_question.remove(&question_id).unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Replace-all save of a guide's steps.
    pub async fn replace_steps(&self, content_id: ContentId, steps: &[StepInput]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM formation_steps WHERE content_id = ?")
            .bind(content_id.0)
            .execute(&mut *tx)
            .await?;
        insert_steps(&mut tx, content_id, steps).await?;
        touch_formation_of_content(&mut tx, content_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Replace-all save of a quiz's questions and their options.
    pub async fn replace_questions(
        &self,
        content_id: ContentId,
        questions: &[QuestionInput],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        delete_questions(&mut tx, content_id).await?;
        insert_questions(&mut tx, content_id, questions).await?;
        touch_formation_of_content(&mut tx, content_id).await?;
        tx.commit().await?;
        Ok(())
    }
}

async fn insert_formation(
    conn: &mut SqliteConnection,
    fields: &FormationFields,
) -> Result<FormationId> {
    let now = Utc::now();
    let result = sqlx::query_scalar::<_, i64>(
        "INSERT INTO formations
            (external_id, name, description, image_url, duration_minutes, category, is_public, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING id",
    )
    .bind(&fields.external_id)
    .bind(&fields.name)
    .bind(fields.description.as_deref())
    .bind(fields.image_url.as_deref())
    .bind(fields.duration_minutes)
    .bind(fields.category.as_deref())
    .bind(fields.is_public)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await;

    match result {
        Ok(id) => Ok(FormationId(id)),
        Err(err) if is_unique_violation(&err) => Err(rejected(ApiError::validation(format!(
            "external id '{}' is already in use",
            fields.external_id
        )))),
        Err(err) => Err(err.into()),
    }
}

async fn insert_steps(
    conn: &mut SqliteConnection,
    content_id: ContentId,
    steps: &[StepInput],
) -> Result<()> {
    for (order, step) in steps.iter().enumerate() {
        sqlx::query(
            "INSERT INTO formation_steps (content_id, title, instruction, image_url, sort_order)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(content_id.0)
        .bind(&step.title)
        .bind(step.instruction.as_deref())
        .bind(step.image_url.as_deref())
        .bind(order as i64)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn insert_questions(
    conn: &mut SqliteConnection,
    content_id: ContentId,
    questions: &[QuestionInput],
) -> Result<()> {
    for (order, question) in questions.iter().enumerate() {
        let question_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO formation_questions (content_id, text, kind, explanation, sort_order)
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(content_id.0)
        .bind(&question.text)
        .bind(question.kind.as_str())
        .bind(question.explanation.as_deref())
        .bind(order as i64)
        .fetch_one(&mut *conn)
        .await?;

        for (option_order, option) in question.options.iter().enumerate() {
            sqlx::query(
                "INSERT INTO formation_options (question_id, text, is_correct, sort_order)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(question_id)
            .bind(&option.text)
            .bind(option.is_correct)
            .bind(option_order as i64)
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}

async fn delete_questions(conn: &mut SqliteConnection, content_id: ContentId) -> Result<()> {
    sqlx::query(
        "DELETE FROM formation_options
         WHERE question_id IN (SELECT id FROM formation_questions WHERE content_id = ?)",
    )
    .bind(content_id.0)
    .execute(&mut *conn)
    .await?;
    sqlx::query("DELETE FROM formation_questions WHERE content_id = ?")
        .bind(content_id.0)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn delete_content_children(conn: &mut SqliteConnection, content_id: ContentId) -> Result<()> {
    delete_questions(conn, content_id).await?;
    sqlx::query("DELETE FROM formation_steps WHERE content_id = ?")
        .bind(content_id.0)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn resequence_contents(conn: &mut SqliteConnection, formation_id: FormationId) -> Result<()> {
    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT id FROM formation_contents WHERE formation_id = ? ORDER BY sort_order, id",
    )
    .bind(formation_id.0)
    .fetch_all(&mut *conn)
    .await?;
    for (order, id) in ids.into_iter().enumerate() {
        sqlx::query("UPDATE formation_contents SET sort_order = ? WHERE id = ?")
            .bind(order as i64)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn touch_formation(conn: &mut SqliteConnection, formation_id: FormationId) -> Result<()> {
    sqlx::query("UPDATE formations SET updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(formation_id.0)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn touch_formation_of_content(conn: &mut SqliteConnection, content_id: ContentId) -> Result<()> {
    sqlx::query(
        "UPDATE formations SET updated_at = ?
         WHERE id = (SELECT formation_id FROM formation_contents WHERE id = ?)",
    )
    .bind(Utc::now())
    .bind(content_id.0)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn formation_from_row(r: &SqliteRow) -> StoredFormation {
    StoredFormation {
        formation_id: FormationId(r.get("id")),
        fields: FormationFields {
            external_id: r.get("external_id"),
            name: r.get("name"),
            description: r.get("description"),
            image_url: r.get("image_url"),
            duration_minutes: r.get("duration_minutes"),
            category: r.get("category"),
            is_public: r.get("is_public"),
        },
        content_count: r.get("content_count"),
        build_ref: r.get("build_ref"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

fn content_from_row(r: &SqliteRow) -> Result<StoredContent> {
    Ok(StoredContent {
        content_id: ContentId(r.get("id")),
        formation_id: FormationId(r.get("formation_id")),
        kind: parse_text(r.get("kind"))?,
        title: r.get("title"),
        description: r.get("description"),
        sort_order: r.get("sort_order"),
    })
}

#[cfg(test)]
#[path = "tests/formations_tests.rs"]
mod tests;
