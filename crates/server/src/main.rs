use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use server_api::ApiContext;
use storage::Storage;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;

use app_state::{blob_store_for, AppState};
use crate::config::{load_settings, prepare_database_url};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings()?;
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    let blobs = blob_store_for(&settings)?;

    let state = AppState {
        api: ApiContext {
            storage,
            blobs,
            default_container: settings.blob_container.clone(),
        },
        max_upload_bytes: settings.max_upload_bytes,
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.bind_addr))?;
    info!(
        %addr,
        backend = ?settings.blob_backend,
        container = %settings.blob_container,
        "server listening"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.max_upload_bytes;

    Router::new()
        .route("/healthz", get(api::healthz))
        .route("/users", post(api::create_user))
        .route(
            "/formations",
            get(api::formations::list).post(api::formations::create),
        )
        .route("/formations/import", post(api::formations::import))
        .route(
            "/formations/:formation_id",
            get(api::formations::get)
                .put(api::formations::update)
                .delete(api::formations::delete),
        )
        .route(
            "/formations/:formation_id/duplicate",
            post(api::formations::duplicate),
        )
        .route(
            "/formations/:formation_id/export",
            get(api::formations::export),
        )
        .route(
            "/formations/:formation_id/contents",
            post(api::formations::create_content),
        )
        .route(
            "/formations/:formation_id/contents/order",
            put(api::formations::reorder_contents),
        )
        .route(
            "/formations/:formation_id/build",
            get(api::builds::formation_build)
                .put(api::builds::associate)
                .delete(api::builds::dissociate),
        )
        .route(
            "/contents/:content_id",
            put(api::formations::update_content).delete(api::formations::delete_content),
        )
        .route(
            "/contents/:content_id/steps",
            put(api::formations::replace_steps),
        )
        .route(
            "/contents/:content_id/questions",
            put(api::formations::replace_questions),
        )
        .route("/builds", get(api::builds::list))
        .route(
            "/builds/upload",
            post(api::builds::upload)
                .layer::<_, Infallible>(DefaultBodyLimit::disable())
                .layer::<_, Infallible>(RequestBodyLimitLayer::new(upload_limit)),
        )
        .route(
            "/builds/:build_ref",
            axum::routing::delete(api::builds::delete),
        )
        .route(
            "/builds/:build_ref/modules",
            get(api::builds::list_modules).put(api::builds::save_modules),
        )
        .route(
            "/modules/:module_id",
            get(api::builds::get_module).put(api::builds::update_module),
        )
        .route(
            "/organizations",
            get(api::organizations::list).post(api::organizations::create),
        )
        .route(
            "/organizations/:organization_id",
            get(api::organizations::get)
                .put(api::organizations::update)
                .delete(api::organizations::delete),
        )
        .route(
            "/organizations/:organization_id/members",
            get(api::organizations::list_members).post(api::organizations::add_member),
        )
        .route(
            "/organizations/:organization_id/members/:member_id",
            put(api::organizations::update_member).delete(api::organizations::remove_member),
        )
        .route(
            "/organizations/:organization_id/trainings",
            get(api::organizations::list_trainings).post(api::organizations::assign_training),
        )
        .route(
            "/organizations/:organization_id/trainings/:formation_id",
            axum::routing::delete(api::organizations::unassign_training),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
