use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use shared::{
    domain::UserId,
    error::{ApiError, ErrorCode},
    protocol::{CreateUserRequest, UserSummary},
};
use tracing::{error, warn};

use crate::app_state::AppState;

pub(crate) mod builds;
pub(crate) mod formations;
pub(crate) mod organizations;

pub(crate) type ApiResult<T> = Result<Json<T>, Rejection>;

/// Error response of every handler: the mapped status and an `ApiError` body.
#[derive(Debug)]
pub(crate) struct Rejection {
    status: StatusCode,
    error: ApiError,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<JsonRejection> for Rejection {
    fn from(rejection: JsonRejection) -> Self {
        reject(ApiError::validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for Rejection {
    fn from(rejection: QueryRejection) -> Self {
        reject(ApiError::validation(rejection.body_text()))
    }
}

impl From<PathRejection> for Rejection {
    fn from(rejection: PathRejection) -> Self {
        reject(ApiError::validation(rejection.body_text()))
    }
}

/// `Json` whose malformed bodies come back as `validation` errors.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(Rejection))]
pub(crate) struct JsonBody<T>(pub(crate) T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Rejection))]
pub(crate) struct QueryParams<T>(pub(crate) T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Rejection))]
pub(crate) struct PathParams<T>(pub(crate) T);

/// The user an organization request acts for.
#[derive(Debug, Deserialize)]
pub(crate) struct UserQuery {
    user_id: i64,
}

impl UserQuery {
    pub(crate) fn acting(&self) -> UserId {
        UserId(self.user_id)
    }
}

pub(crate) fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn reject(err: ApiError) -> Rejection {
    let status = status_for(err.code);
    match err.code {
        ErrorCode::Internal => error!(message = %err.message, "request failed"),
        ErrorCode::Forbidden => warn!(message = %err.message, "request forbidden"),
        _ => {}
    }
    Rejection { status, error: err }
}

pub(crate) async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, Rejection> {
    state
        .api
        .storage
        .health_check()
        .await
        .map_err(|e| reject(ApiError::internal(format!("{e:#}"))))?;
    Ok("ok")
}

pub(crate) async fn create_user(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<CreateUserRequest>,
) -> ApiResult<UserSummary> {
    server_api::create_user(&state.api, req)
        .await
        .map(Json)
        .map_err(reject)
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
