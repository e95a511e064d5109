use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{
    domain::{ContentId, FormationId},
    protocol::{
        ContentDetail, CreateContentRequest, CreateFormationRequest, FormationDetail,
        FormationDocument, FormationSummary, QuestionInput, ReorderContentsRequest, StepInput,
        UpdateContentRequest, UpdateFormationRequest,
    },
};

use super::{reject, ApiResult, JsonBody, PathParams, QueryParams, Rejection};
use crate::app_state::AppState;

#[derive(Debug, Deserialize)]
pub(crate) struct SearchQuery {
    search: Option<String>,
}

pub(crate) async fn list(
    State(state): State<Arc<AppState>>,
    QueryParams(q): QueryParams<SearchQuery>,
) -> ApiResult<Vec<FormationSummary>> {
    server_api::list_formations(&state.api, q.search.as_deref())
        .await
        .map(Json)
        .map_err(reject)
}

pub(crate) async fn create(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<CreateFormationRequest>,
) -> Result<(StatusCode, Json<FormationSummary>), Rejection> {
    let formation = server_api::create_formation(&state.api, req)
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(formation)))
}

pub(crate) async fn get(
    State(state): State<Arc<AppState>>,
    PathParams(formation_id): PathParams<i64>,
) -> ApiResult<FormationDetail> {
    server_api::get_formation(&state.api, FormationId(formation_id))
        .await
        .map(Json)
        .map_err(reject)
}

pub(crate) async fn update(
    State(state): State<Arc<AppState>>,
    PathParams(formation_id): PathParams<i64>,
    JsonBody(req): JsonBody<UpdateFormationRequest>,
) -> ApiResult<FormationSummary> {
    server_api::update_formation(&state.api, FormationId(formation_id), req)
        .await
        .map(Json)
        .map_err(reject)
}

pub(crate) async fn delete(
    State(state): State<Arc<AppState>>,
    PathParams(formation_id): PathParams<i64>,
) -> Result<StatusCode, Rejection> {
    server_api::delete_formation(&state.api, FormationId(formation_id))
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn duplicate(
    State(state): State<Arc<AppState>>,
    PathParams(formation_id): PathParams<i64>,
) -> Result<(StatusCode, Json<FormationSummary>), Rejection> {
    let copy = server_api::duplicate_formation(&state.api, FormationId(formation_id))
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(copy)))
}

pub(crate) async fn export(
    State(state): State<Arc<AppState>>,
    PathParams(formation_id): PathParams<i64>,
) -> ApiResult<FormationDocument> {
    server_api::export_formation(&state.api, FormationId(formation_id))
        .await
        .map(Json)
        .map_err(reject)
}

pub(crate) async fn import(
    State(state): State<Arc<AppState>>,
    JsonBody(document): JsonBody<FormationDocument>,
) -> Result<(StatusCode, Json<FormationSummary>), Rejection> {
    let formation = server_api::import_formation(&state.api, document)
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(formation)))
}

pub(crate) async fn create_content(
    State(state): State<Arc<AppState>>,
    PathParams(formation_id): PathParams<i64>,
    JsonBody(req): JsonBody<CreateContentRequest>,
) -> Result<(StatusCode, Json<ContentDetail>), Rejection> {
    let content = server_api::create_content(&state.api, FormationId(formation_id), req)
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(content)))
}

pub(crate) async fn reorder_contents(
    State(state): State<Arc<AppState>>,
    PathParams(formation_id): PathParams<i64>,
    JsonBody(req): JsonBody<ReorderContentsRequest>,
) -> ApiResult<Vec<ContentDetail>> {
    server_api::reorder_contents(&state.api, FormationId(formation_id), req)
        .await
        .map(Json)
        .map_err(reject)
}

pub(crate) async fn update_content(
    State(state): State<Arc<AppState>>,
    PathParams(content_id): PathParams<i64>,
    JsonBody(req): JsonBody<UpdateContentRequest>,
) -> ApiResult<ContentDetail> {
    server_api::update_content(&state.api, ContentId(content_id), req)
        .await
        .map(Json)
        .map_err(reject)
}

pub(crate) async fn delete_content(
    State(state): State<Arc<AppState>>,
    PathParams(content_id): PathParams<i64>,
) -> Result<StatusCode, Rejection> {
    server_api::delete_content(&state.api, ContentId(content_id))
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn replace_steps(
    State(state): State<Arc<AppState>>,
    PathParams(content_id): PathParams<i64>,
    JsonBody(steps): JsonBody<Vec<StepInput>>,
) -> ApiResult<ContentDetail> {
    server_api::replace_steps(&state.api, ContentId(content_id), steps)
        .await
        .map(Json)
        .map_err(reject)
}

pub(crate) async fn replace_questions(
    State(state): State<Arc<AppState>>,
    PathParams(content_id): PathParams<i64>,
    JsonBody(questions): JsonBody<Vec<QuestionInput>>,
) -> ApiResult<ContentDetail> {
    server_api::replace_questions(&state.api, ContentId(content_id), questions)
        .await
        .map(Json)
        .map_err(reject)
}
