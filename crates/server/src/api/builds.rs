use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{
    domain::{FormationId, ModuleId},
    protocol::{
        AssociateBuildRequest, BuildDetail, BuildListing, DeletedBuild, ModuleInput,
        ModulePayload, UpdateModuleRequest, UploadedBlob,
    },
};

use super::{reject, ApiResult, JsonBody, PathParams, QueryParams, Rejection};
use crate::app_state::AppState;

#[derive(Debug, Deserialize)]
pub(crate) struct ContainerQuery {
    container: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadQuery {
    container: Option<String>,
    path: String,
}

pub(crate) async fn list(
    State(state): State<Arc<AppState>>,
    QueryParams(q): QueryParams<ContainerQuery>,
) -> ApiResult<Vec<BuildListing>> {
    server_api::list_builds(&state.api, q.container.as_deref())
        .await
        .map(Json)
        .map_err(reject)
}

/// Raw request body, one build file per request.
pub(crate) async fn upload(
    State(state): State<Arc<AppState>>,
    QueryParams(q): QueryParams<UploadQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadedBlob>), Rejection> {
    let uploaded =
        server_api::upload_build_file(&state.api, q.container.as_deref(), &q.path, body.to_vec())
            .await
            .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(uploaded)))
}

pub(crate) async fn delete(
    State(state): State<Arc<AppState>>,
    PathParams(build_ref): PathParams<String>,
) -> ApiResult<DeletedBuild> {
    server_api::delete_build(&state.api, &build_ref)
        .await
        .map(Json)
        .map_err(reject)
}

pub(crate) async fn formation_build(
    State(state): State<Arc<AppState>>,
    PathParams(formation_id): PathParams<i64>,
) -> ApiResult<BuildDetail> {
    server_api::get_formation_build(&state.api, FormationId(formation_id))
        .await
        .map(Json)
        .map_err(reject)
}

pub(crate) async fn associate(
    State(state): State<Arc<AppState>>,
    PathParams(formation_id): PathParams<i64>,
    JsonBody(req): JsonBody<AssociateBuildRequest>,
) -> ApiResult<BuildDetail> {
    server_api::associate_build(&state.api, FormationId(formation_id), req)
        .await
        .map(Json)
        .map_err(reject)
}

pub(crate) async fn dissociate(
    State(state): State<Arc<AppState>>,
    PathParams(formation_id): PathParams<i64>,
) -> Result<StatusCode, Rejection> {
    server_api::dissociate_build(&state.api, FormationId(formation_id))
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn list_modules(
    State(state): State<Arc<AppState>>,
    PathParams(build_ref): PathParams<String>,
) -> ApiResult<Vec<ModulePayload>> {
    server_api::list_build_modules(&state.api, &build_ref)
        .await
        .map(Json)
        .map_err(reject)
}

pub(crate) async fn save_modules(
    State(state): State<Arc<AppState>>,
    PathParams(build_ref): PathParams<String>,
    JsonBody(modules): JsonBody<Vec<ModuleInput>>,
) -> ApiResult<Vec<ModulePayload>> {
    server_api::save_build_modules(&state.api, &build_ref, modules)
        .await
        .map(Json)
        .map_err(reject)
}

pub(crate) async fn get_module(
    State(state): State<Arc<AppState>>,
    PathParams(module_id): PathParams<i64>,
) -> ApiResult<ModulePayload> {
    server_api::get_module(&state.api, ModuleId(module_id))
        .await
        .map(Json)
        .map_err(reject)
}

pub(crate) async fn update_module(
    State(state): State<Arc<AppState>>,
    PathParams(module_id): PathParams<i64>,
    JsonBody(req): JsonBody<UpdateModuleRequest>,
) -> ApiResult<ModulePayload> {
    server_api::update_module(&state.api, ModuleId(module_id), req)
        .await
        .map(Json)
        .map_err(reject)
}
