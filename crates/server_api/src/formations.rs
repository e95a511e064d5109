use chrono::Utc;
use shared::{
    domain::{ContentKind, FormationId},
    error::ApiError,
    protocol::{
        ContentDetail, ContentDocument, CreateFormationRequest, FormationDetail, FormationDocument,
        FormationSummary, OptionInput, OptionPayload, QuestionInput, QuestionPayload, StepInput,
        StepPayload, UpdateFormationRequest, FORMATION_DOCUMENT_VERSION,
    },
};
use storage::{FormationFields, FormationPatch, StoredContent, StoredFormation};
use tracing::info;

use crate::{
    builds::build_summary,
    contents::{validate_questions, validate_steps},
    internal, optional_text, required_text, ApiContext,
};

pub async fn list_formations(
    ctx: &ApiContext,
    search: Option<&str>,
) -> Result<Vec<FormationSummary>, ApiError> {
    let formations = ctx
        .storage
        .list_formations(search)
        .await
        .map_err(internal)?;
    Ok(formations.into_iter().map(formation_summary).collect())
}

pub async fn create_formation(
    ctx: &ApiContext,
    req: CreateFormationRequest,
) -> Result<FormationSummary, ApiError> {
    let fields = formation_fields(ctx, req).await?;
    let formation_id = ctx
        .storage
        .create_formation(&fields)
        .await
        .map_err(internal)?;
    info!(%formation_id, external_id = %fields.external_id, "formation created");
    load_summary(ctx, formation_id).await
}

pub async fn get_formation(
    ctx: &ApiContext,
    formation_id: FormationId,
) -> Result<FormationDetail, ApiError> {
    let formation = load_summary(ctx, formation_id).await?;
    let stored = ctx
        .storage
        .list_contents(formation_id)
        .await
        .map_err(internal)?;
    let mut contents = Vec::with_capacity(stored.len());
    for content in stored {
        contents.push(content_detail(ctx, content).await?);
    }
    let build = ctx
        .storage
        .build_for_formation(formation_id)
        .await
        .map_err(internal)?
        .map(build_summary);

    Ok(FormationDetail {
        formation,
        contents,
        build,
    })
}

pub async fn update_formation(
    ctx: &ApiContext,
    formation_id: FormationId,
    req: UpdateFormationRequest,
) -> Result<FormationSummary, ApiError> {
    let name = req
        .name
        .as_deref()
        .map(|name| required_text(name, "name"))
        .transpose()?;
    let external_id = req
        .external_id
        .as_deref()
        .map(|external_id| required_text(external_id, "external_id"))
        .transpose()?;
    validate_duration(req.duration_minutes)?;

    let patch = FormationPatch {
        external_id,
        name,
        description: patch_text(req.description),
        image_url: patch_text(req.image_url),
        duration_minutes: req.duration_minutes,
        category: patch_text(req.category),
        is_public: req.is_public,
    };
    let updated = ctx
        .storage
        .update_formation(formation_id, &patch)
        .await
        .map_err(internal)?;
    if !updated {
        return Err(not_found(formation_id));
    }
    load_summary(ctx, formation_id).await
}

pub async fn delete_formation(ctx: &ApiContext, formation_id: FormationId) -> Result<(), ApiError> {
    let deleted = ctx
        .storage
        .delete_formation(formation_id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(not_found(formation_id));
    }
    info!(%formation_id, "formation deleted");
    Ok(())
}

/// Copies the formation tree under a timestamped external id.
pub async fn duplicate_formation(
    ctx: &ApiContext,
    formation_id: FormationId,
) -> Result<FormationSummary, ApiError> {
    let source = load_summary(ctx, formation_id).await?;
    let external_id = format!(
        "{}-copy-{}",
        source.external_id,
        Utc::now().timestamp_millis()
    );
    let name = format!("{} (copy)", source.name);

    let copy_id = ctx
        .storage
        .duplicate_formation(formation_id, &external_id, &name)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(formation_id))?;
    info!(%formation_id, %copy_id, %external_id, "formation duplicated");
    load_summary(ctx, copy_id).await
}

pub async fn export_formation(
    ctx: &ApiContext,
    formation_id: FormationId,
) -> Result<FormationDocument, ApiError> {
    let detail = get_formation(ctx, formation_id).await?;
    let summary = detail.formation;

    Ok(FormationDocument {
        version: FORMATION_DOCUMENT_VERSION,
        formation: CreateFormationRequest {
            external_id: Some(summary.external_id),
            name: summary.name,
            description: summary.description,
            image_url: summary.image_url,
            duration_minutes: summary.duration_minutes,
            category: summary.category,
            is_public: summary.is_public,
        },
        contents: detail
            .contents
            .into_iter()
            .map(|content| ContentDocument {
                kind: content.kind,
                title: content.title,
                description: content.description,
                steps: content
                    .steps
                    .into_iter()
                    .map(|step| StepInput {
                        title: step.title,
                        instruction: step.instruction,
                        image_url: step.image_url,
                    })
                    .collect(),
                questions: content
                    .questions
                    .into_iter()
                    .map(|question| QuestionInput {
                        text: question.text,
                        kind: question.kind,
                        explanation: question.explanation,
                        options: question
                            .options
                            .into_iter()
                            .map(|option| OptionInput {
                                text: option.text,
                                is_correct: option.is_correct,
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect(),
    })
}

/// Creates a formation from an exported document. Nothing is written unless
/// the whole document is valid.
pub async fn import_formation(
    ctx: &ApiContext,
    document: FormationDocument,
) -> Result<FormationSummary, ApiError> {
    if document.version != FORMATION_DOCUMENT_VERSION {
        return Err(ApiError::validation(format!(
            "unsupported formation document version {}",
            document.version
        )));
    }

    let mut contents = Vec::with_capacity(document.contents.len());
    for (index, content) in document.contents.into_iter().enumerate() {
        let title = required_text(&content.title, &format!("contents[{index}].title"))?;
        match content.kind {
            ContentKind::Guide if !content.questions.is_empty() => {
                return Err(ApiError::validation(format!(
                    "contents[{index}] is a guide and cannot carry questions"
                )));
            }
            ContentKind::Quiz if !content.steps.is_empty() => {
                return Err(ApiError::validation(format!(
                    "contents[{index}] is a quiz and cannot carry steps"
                )));
            }
            _ => {}
        }
        contents.push(ContentDocument {
            kind: content.kind,
            title,
            description: optional_text(content.description),
            steps: validate_steps(content.steps)?,
            questions: validate_questions(content.questions)?,
        });
    }

    let fields = formation_fields(ctx, document.formation).await?;
    let formation_id = ctx
        .storage
        .import_formation(&fields, &contents)
        .await
        .map_err(internal)?;
    info!(%formation_id, contents = contents.len(), "formation imported");
    load_summary(ctx, formation_id).await
}

async fn formation_fields(
    ctx: &ApiContext,
    req: CreateFormationRequest,
) -> Result<FormationFields, ApiError> {
    let name = required_text(&req.name, "name")?;
    validate_duration(req.duration_minutes)?;

    let external_id = match optional_text(req.external_id) {
        Some(external_id) => {
            if ctx
                .storage
                .external_id_in_use(&external_id)
                .await
                .map_err(internal)?
            {
                return Err(ApiError::validation(format!(
                    "external id '{external_id}' is already in use"
                )));
            }
            external_id
        }
        None => uuid::Uuid::new_v4().to_string(),
    };

    Ok(FormationFields {
        external_id,
        name,
        description: optional_text(req.description),
        image_url: optional_text(req.image_url),
        duration_minutes: req.duration_minutes,
        category: optional_text(req.category),
        is_public: req.is_public,
    })
}

/// Trimmed, with blank kept as `Some("")` so that it clears the column.
fn patch_text(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_string())
}

fn validate_duration(duration_minutes: Option<i64>) -> Result<(), ApiError> {
    match duration_minutes {
        Some(minutes) if minutes < 0 => Err(ApiError::validation(
            "duration_minutes cannot be negative",
        )),
        _ => Ok(()),
    }
}

pub(crate) async fn ensure_formation(
    ctx: &ApiContext,
    formation_id: FormationId,
) -> Result<StoredFormation, ApiError> {
    ctx.storage
        .get_formation(formation_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(formation_id))
}

async fn load_summary(
    ctx: &ApiContext,
    formation_id: FormationId,
) -> Result<FormationSummary, ApiError> {
    ensure_formation(ctx, formation_id)
        .await
        .map(formation_summary)
}

pub(crate) async fn content_detail(
    ctx: &ApiContext,
    content: StoredContent,
) -> Result<ContentDetail, ApiError> {
    let (steps, questions) = match content.kind {
        ContentKind::Guide => {
            let steps = ctx
                .storage
                .list_steps(content.content_id)
                .await
                .map_err(internal)?;
            (steps, Vec::new())
        }
        ContentKind::Quiz => {
            let questions = ctx
                .storage
                .list_questions(content.content_id)
                .await
                .map_err(internal)?;
            (Vec::new(), questions)
        }
    };

    Ok(ContentDetail {
        content_id: content.content_id,
        formation_id: content.formation_id,
        kind: content.kind,
        title: content.title,
        description: content.description,
        order: content.sort_order,
        steps: steps
            .into_iter()
            .map(|step| StepPayload {
                step_id: step.step_id,
                title: step.title,
                instruction: step.instruction,
                image_url: step.image_url,
                order: step.sort_order,
            })
            .collect(),
        questions: questions
            .into_iter()
            .map(|question| QuestionPayload {
                question_id: question.question_id,
                text: question.text,
                kind: question.kind,
                explanation: question.explanation,
                order: question.sort_order,
                options: question
                    .options
                    .into_iter()
                    .map(|option| OptionPayload {
                        option_id: option.option_id,
                        text: option.text,
                        is_correct: option.is_correct,
                        order: option.sort_order,
                    })
                    .collect(),
            })
            .collect(),
    })
}

fn formation_summary(formation: StoredFormation) -> FormationSummary {
    let fields = formation.fields;
    FormationSummary {
        formation_id: formation.formation_id,
        external_id: fields.external_id,
        name: fields.name,
        description: fields.description,
        image_url: fields.image_url,
        duration_minutes: fields.duration_minutes,
        category: fields.category,
        is_public: fields.is_public,
        content_count: formation.content_count,
        build_ref: formation.build_ref,
        created_at: formation.created_at,
        updated_at: formation.updated_at,
    }
}

pub(crate) fn not_found(formation_id: FormationId) -> ApiError {
    ApiError::not_found(format!("formation {formation_id} not found"))
}

#[cfg(test)]
#[path = "tests/formations_tests.rs"]
mod tests;
