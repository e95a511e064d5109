use blob_store::resolve_build;
use shared::{
    domain::ModuleId,
    error::ApiError,
    protocol::{BuildSummary, ModuleInput, ModulePayload, UpdateModuleRequest},
};
use storage::StoredModule;
use tracing::info;

use crate::{builds::load_records, internal, required_text, ApiContext};

pub async fn list_build_modules(
    ctx: &ApiContext,
    build_ref: &str,
) -> Result<Vec<ModulePayload>, ApiError> {
    let build = find_record(ctx, build_ref).await?;
    let modules = ctx
        .storage
        .list_modules(build.build_id)
        .await
        .map_err(internal)?;
    module_payloads(modules)
}

/// Replace-all save of a build's modules.
pub async fn save_build_modules(
    ctx: &ApiContext,
    build_ref: &str,
    modules: Vec<ModuleInput>,
) -> Result<Vec<ModulePayload>, ApiError> {
    let build = find_record(ctx, build_ref).await?;
    let modules = modules
        .into_iter()
        .enumerate()
        .map(|(index, module)| {
            if !module.content.is_object() {
                return Err(ApiError::validation(format!(
                    "modules[{index}].content must be a JSON object"
                )));
            }
            Ok(ModuleInput {
                module_key: required_text(&module.module_key, &format!("modules[{index}].module_key"))?,
                title: required_text(&module.title, &format!("modules[{index}].title"))?,
                kind: module.kind,
                content: module.content,
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    ctx.storage
        .replace_modules(build.build_id, &modules)
        .await
        .map_err(internal)?;
    info!(build_ref = %build.build_ref, count = modules.len(), "modules saved");

    let saved = ctx
        .storage
        .list_modules(build.build_id)
        .await
        .map_err(internal)?;
    module_payloads(saved)
}

pub async fn get_module(ctx: &ApiContext, module_id: ModuleId) -> Result<ModulePayload, ApiError> {
    let module = ctx
        .storage
        .get_module(module_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(module_id))?;
    module_payload(module)
}

pub async fn update_module(
    ctx: &ApiContext,
    module_id: ModuleId,
    req: UpdateModuleRequest,
) -> Result<ModulePayload, ApiError> {
    let title = req
        .title
        .as_deref()
        .map(|title| required_text(title, "title"))
        .transpose()?;
    let content_json = match req.content {
        Some(content) if !content.is_object() => {
            return Err(ApiError::validation("content must be a JSON object"));
        }
        Some(content) => Some(content.to_string()),
        None => None,
    };

    let updated = ctx
        .storage
        .update_module(module_id, title.as_deref(), content_json.as_deref())
        .await
        .map_err(internal)?;
    if !updated {
        return Err(not_found(module_id));
    }
    get_module(ctx, module_id).await
}

/// Modules hang off the database record, so only recorded builds resolve.
async fn find_record(ctx: &ApiContext, build_ref: &str) -> Result<BuildSummary, ApiError> {
    let records = load_records(ctx).await?;
    resolve_build(build_ref, &records)
        .cloned()
        .ok_or_else(|| ApiError::not_found(format!("no build record for '{build_ref}'")))
}

pub(crate) fn module_payloads(modules: Vec<StoredModule>) -> Result<Vec<ModulePayload>, ApiError> {
    modules.into_iter().map(module_payload).collect()
}

fn module_payload(module: StoredModule) -> Result<ModulePayload, ApiError> {
    let content = serde_json::from_str(&module.content_json).map_err(|err| {
        ApiError::internal(format!(
            "module {} has unreadable content: {err}",
            module.module_id
        ))
    })?;
    Ok(ModulePayload {
        module_id: module.module_id,
        build_id: module.build_id,
        module_key: module.module_key,
        title: module.title,
        kind: module.kind,
        content,
        order: module.sort_order,
    })
}

fn not_found(module_id: ModuleId) -> ApiError {
    ApiError::not_found(format!("module {module_id} not found"))
}

#[cfg(test)]
#[path = "tests/modules_tests.rs"]
mod tests;
