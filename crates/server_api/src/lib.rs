use std::sync::Arc;

use blob_store::BlobStore;
use shared::{
    error::{ApiError, ApiException},
    protocol::{CreateUserRequest, UserSummary},
};
use storage::Storage;

mod builds;
mod contents;
mod formations;
mod modules;
mod organizations;

pub use builds::{
    associate_build, delete_build, dissociate_build, get_formation_build, list_builds,
    upload_build_file,
};
pub use contents::{
    create_content, delete_content, reorder_contents, replace_questions, replace_steps,
    update_content,
};
pub use formations::{
    create_formation, delete_formation, duplicate_formation, export_formation, get_formation,
    import_formation, list_formations, update_formation,
};
pub use modules::{get_module, list_build_modules, save_build_modules, update_module};
pub use organizations::{
    add_member, assign_training, create_organization, delete_organization, get_organization,
    list_members, list_organizations, list_trainings, remove_member, unassign_training,
    update_member, update_organization,
};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub blobs: Arc<dyn BlobStore>,
    /// Container used when a request or build ref does not name one.
    pub default_container: String,
}

impl ApiContext {
    fn container<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .map(str::trim)
            .filter(|container| !container.is_empty())
            .unwrap_or(&self.default_container)
    }
}

pub async fn create_user(ctx: &ApiContext, req: CreateUserRequest) -> Result<UserSummary, ApiError> {
    let email = normalize_email(&req.email)?;
    let name = optional_text(req.name);
    let user_id = ctx
        .storage
        .upsert_user(&email, name.as_deref())
        .await
        .map_err(internal)?;
    let user = ctx
        .storage
        .get_user(user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::internal("user vanished after upsert"))?;
    Ok(UserSummary {
        user_id: user.user_id,
        email: user.email,
        name: user.name,
    })
}

fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(email)
        }
        _ => Err(ApiError::validation("a valid email is required")),
    }
}

/// Trims `value` and rejects it when nothing is left.
fn required_text(value: &str, field: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Rejections raised inside the data layer keep their code; anything else
/// is an internal failure.
fn internal(err: anyhow::Error) -> ApiError {
    match err.downcast::<ApiException>() {
        Ok(rejection) => rejection.into(),
        Err(err) => ApiError::internal(format!("{err:#}")),
    }
}

#[cfg(test)]
pub(crate) async fn test_context() -> (ApiContext, Arc<blob_store::MemoryBlobStore>) {
    let blobs = Arc::new(blob_store::MemoryBlobStore::new());
    let ctx = ApiContext {
        storage: Storage::new("sqlite::memory:").await.expect("db"),
        blobs: blobs.clone(),
        default_container: "builds".to_string(),
    };
    (ctx, blobs)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
