use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use shared::{
    domain::{FormationId, OrganizationId, UserId},
    protocol::{
        AddMemberRequest, AssignTrainingRequest, CreateOrganizationRequest, MemberSummary,
        OrganizationSummary, TrainingSummary, UpdateMemberRequest, UpdateOrganizationRequest,
    },
};

use super::{reject, ApiResult, JsonBody, PathParams, QueryParams, Rejection, UserQuery};
use crate::app_state::AppState;

pub(crate) async fn list(
    State(state): State<Arc<AppState>>,
    QueryParams(q): QueryParams<UserQuery>,
) -> ApiResult<Vec<OrganizationSummary>> {
    server_api::list_organizations(&state.api, q.acting())
        .await
        .map(Json)
        .map_err(reject)
}

pub(crate) async fn create(
    State(state): State<Arc<AppState>>,
    QueryParams(q): QueryParams<UserQuery>,
    JsonBody(req): JsonBody<CreateOrganizationRequest>,
) -> Result<(StatusCode, Json<OrganizationSummary>), Rejection> {
    let organization = server_api::create_organization(&state.api, q.acting(), req)
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(organization)))
}

pub(crate) async fn get(
    State(state): State<Arc<AppState>>,
    PathParams(organization_id): PathParams<i64>,
    QueryParams(q): QueryParams<UserQuery>,
) -> ApiResult<OrganizationSummary> {
    server_api::get_organization(&state.api, q.acting(), OrganizationId(organization_id))
        .await
        .map(Json)
        .map_err(reject)
}

pub(crate) async fn update(
    State(state): State<Arc<AppState>>,
    PathParams(organization_id): PathParams<i64>,
    QueryParams(q): QueryParams<UserQuery>,
    JsonBody(req): JsonBody<UpdateOrganizationRequest>,
) -> ApiResult<OrganizationSummary> {
    server_api::update_organization(&state.api, q.acting(), OrganizationId(organization_id), req)
        .await
        .map(Json)
        .map_err(reject)
}

pub(crate) async fn delete(
    State(state): State<Arc<AppState>>,
    PathParams(organization_id): PathParams<i64>,
    QueryParams(q): QueryParams<UserQuery>,
) -> Result<StatusCode, Rejection> {
    server_api::delete_organization(&state.api, q.acting(), OrganizationId(organization_id))
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn list_members(
    State(state): State<Arc<AppState>>,
    PathParams(organization_id): PathParams<i64>,
    QueryParams(q): QueryParams<UserQuery>,
) -> ApiResult<Vec<MemberSummary>> {
    server_api::list_members(&state.api, q.acting(), OrganizationId(organization_id))
        .await
        .map(Json)
        .map_err(reject)
}

pub(crate) async fn add_member(
    State(state): State<Arc<AppState>>,
    PathParams(organization_id): PathParams<i64>,
    QueryParams(q): QueryParams<UserQuery>,
    JsonBody(req): JsonBody<AddMemberRequest>,
) -> Result<(StatusCode, Json<MemberSummary>), Rejection> {
    let member =
        server_api::add_member(&state.api, q.acting(), OrganizationId(organization_id), req)
            .await
            .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub(crate) async fn update_member(
    State(state): State<Arc<AppState>>,
    PathParams((organization_id, member_id)): PathParams<(i64, i64)>,
    QueryParams(q): QueryParams<UserQuery>,
    JsonBody(req): JsonBody<UpdateMemberRequest>,
) -> ApiResult<MemberSummary> {
    server_api::update_member(
        &state.api,
        q.acting(),
        OrganizationId(organization_id),
        UserId(member_id),
        req,
    )
    .await
    .map(Json)
    .map_err(reject)
}

pub(crate) async fn remove_member(
    State(state): State<Arc<AppState>>,
    PathParams((organization_id, member_id)): PathParams<(i64, i64)>,
    QueryParams(q): QueryParams<UserQuery>,
) -> Result<StatusCode, Rejection> {
    server_api::remove_member(
        &state.api,
        q.acting(),
        OrganizationId(organization_id),
        UserId(member_id),
    )
    .await
    .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn list_trainings(
    State(state): State<Arc<AppState>>,
    PathParams(organization_id): PathParams<i64>,
    QueryParams(q): QueryParams<UserQuery>,
) -> ApiResult<Vec<TrainingSummary>> {
    server_api::list_trainings(&state.api, q.acting(), OrganizationId(organization_id))
        .await
        .map(Json)
        .map_err(reject)
}

pub(crate) async fn assign_training(
    State(state): State<Arc<AppState>>,
    PathParams(organization_id): PathParams<i64>,
    QueryParams(q): QueryParams<UserQuery>,
    JsonBody(req): JsonBody<AssignTrainingRequest>,
) -> Result<(StatusCode, Json<TrainingSummary>), Rejection> {
    let training =
        server_api::assign_training(&state.api, q.acting(), OrganizationId(organization_id), req)
            .await
            .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(training)))
}

pub(crate) async fn unassign_training(
    State(state): State<Arc<AppState>>,
    PathParams((organization_id, formation_id)): PathParams<(i64, i64)>,
    QueryParams(q): QueryParams<UserQuery>,
) -> Result<StatusCode, Rejection> {
    server_api::unassign_training(
        &state.api,
        q.acting(),
        OrganizationId(organization_id),
        FormationId(formation_id),
    )
    .await
    .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}
