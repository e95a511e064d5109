use shared::{
    domain::{ContentId, ContentKind, FormationId, QuestionKind},
    error::ApiError,
    protocol::{
        ContentDetail, CreateContentRequest, OptionInput, QuestionInput, ReorderContentsRequest,
        StepInput, UpdateContentRequest,
    },
};
use storage::StoredContent;
use tracing::{debug, info};

use crate::{
    formations::{content_detail, ensure_formation},
    internal, optional_text, required_text, ApiContext,
};

pub async fn create_content(
    ctx: &ApiContext,
    formation_id: FormationId,
    req: CreateContentRequest,
) -> Result<ContentDetail, ApiError> {
    ensure_formation(ctx, formation_id).await?;
    let title = required_text(&req.title, "title")?;
    let description = optional_text(req.description);

    let content_id = ctx
        .storage
        .create_content(formation_id, req.kind, &title, description.as_deref())
        .await
        .map_err(internal)?;
    info!(%formation_id, %content_id, kind = %req.kind, "content created");
    load_content(ctx, content_id).await
}

pub async fn update_content(
    ctx: &ApiContext,
    content_id: ContentId,
    req: UpdateContentRequest,
) -> Result<ContentDetail, ApiError> {
    let title = req
        .title
        .as_deref()
        .map(|title| required_text(title, "title"))
        .transpose()?;
    let description = optional_text(req.description);

    let updated = ctx
        .storage
        .update_content(content_id, title.as_deref(), description.as_deref())
        .await
        .map_err(internal)?;
    if !updated {
        return Err(not_found(content_id));
    }
    load_content(ctx, content_id).await
}

pub async fn delete_content(ctx: &ApiContext, content_id: ContentId) -> Result<(), ApiError> {
    let formation_id = ctx
        .storage
        .delete_content(content_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(content_id))?;
    info!(%formation_id, %content_id, "content deleted");
    Ok(())
}

/// Applies a drag-and-drop ordering and returns the contents in their new
/// order.
pub async fn reorder_contents(
    ctx: &ApiContext,
    formation_id: FormationId,
    req: ReorderContentsRequest,
) -> Result<Vec<ContentDetail>, ApiError> {
    ensure_formation(ctx, formation_id).await?;
    ctx.storage
        .reorder_contents(formation_id, &req.content_ids)
        .await
        .map_err(internal)?;
    debug!(%formation_id, count = req.content_ids.len(), "contents reordered");

    let stored = ctx
        .storage
        .list_contents(formation_id)
        .await
        .map_err(internal)?;
    let mut contents = Vec::with_capacity(stored.len());
    for content in stored {
        contents.push(content_detail(ctx, content).await?);
    }
    Ok(contents)
}

pub async fn replace_steps(
    ctx: &ApiContext,
    content_id: ContentId,
    steps: Vec<StepInput>,
) -> Result<ContentDetail, ApiError> {
    let content = ensure_content(ctx, content_id).await?;
    if content.kind != ContentKind::Guide {
        return Err(ApiError::validation("steps can only be saved on a guide"));
    }
    let steps = validate_steps(steps)?;

    ctx.storage
        .replace_steps(content_id, &steps)
        .await
        .map_err(internal)?;
    debug!(%content_id, count = steps.len(), "steps saved");
    content_detail(ctx, content).await
}

pub async fn replace_questions(
    ctx: &ApiContext,
    content_id: ContentId,
    questions: Vec<QuestionInput>,
) -> Result<ContentDetail, ApiError> {
    let content = ensure_content(ctx, content_id).await?;
    if content.kind != ContentKind::Quiz {
        return Err(ApiError::validation("questions can only be saved on a quiz"));
    }
    let questions = validate_questions(questions)?;

    ctx.storage
        .replace_questions(content_id, &questions)
        .await
        .map_err(internal)?;
    debug!(%content_id, count = questions.len(), "questions saved");
    content_detail(ctx, content).await
}

pub(crate) fn validate_steps(steps: Vec<StepInput>) -> Result<Vec<StepInput>, ApiError> {
    steps
        .into_iter()
        .enumerate()
        .map(|(index, step)| {
            Ok(StepInput {
                title: required_text(&step.title, &format!("steps[{index}].title"))?,
                instruction: optional_text(step.instruction),
                image_url: optional_text(step.image_url),
            })
        })
        .collect()
}

/// Every question needs text and two options. A single-choice question has
/// exactly one correct option, a multiple-choice one at least one.
pub(crate) fn validate_questions(
    questions: Vec<QuestionInput>,
) -> Result<Vec<QuestionInput>, ApiError> {
    questions
        .into_iter()
        .enumerate()
        .map(|(index, question)| {
            let text = required_text(&question.text, &format!("questions[{index}].text"))?;
            if question.options.len() < 2 {
                return Err(ApiError::validation(format!(
                    "questions[{index}] needs at least two options"
                )));
            }

            let options = question
                .options
                .into_iter()
                .enumerate()
                .map(|(option_index, option)| {
                    Ok(OptionInput {
                        text: required_text(
                            &option.text,
                            &format!("questions[{index}].options[{option_index}].text"),
                        )?,
                        is_correct: option.is_correct,
                    })
                })
                .collect::<Result<Vec<_>, ApiError>>()?;

            let correct = options.iter().filter(|option| option.is_correct).count();
            match question.kind {
                QuestionKind::Single if correct != 1 => {
                    return Err(ApiError::validation(format!(
                        "questions[{index}] is single choice and needs exactly one correct option"
                    )));
                }
                QuestionKind::Multiple if correct == 0 => {
                    return Err(ApiError::validation(format!(
                        "questions[{index}] needs at least one correct option"
                    )));
                }
                _ => {}
            }

            Ok(QuestionInput {
                text,
                kind: question.kind,
                explanation: optional_text(question.explanation),
                options,
            })
        })
        .collect()
}

async fn ensure_content(ctx: &ApiContext, content_id: ContentId) -> Result<StoredContent, ApiError> {
    ctx.storage
        .get_content(content_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(content_id))
}

async fn load_content(ctx: &ApiContext, content_id: ContentId) -> Result<ContentDetail, ApiError> {
    let content = ensure_content(ctx, content_id).await?;
    content_detail(ctx, content).await
}

fn not_found(content_id: ContentId) -> ApiError {
    ApiError::not_found(format!("content {content_id} not found"))
}

#[cfg(test)]
#[path = "tests/contents_tests.rs"]
mod tests;
