use blob_store::{
    build::{file_name, format_build_ref, group_builds, parse_build_ref, split_build_blob},
    resolve_build, BuildFile,
};
use futures::future::try_join_all;
use shared::{
    domain::FormationId,
    error::ApiError,
    protocol::{
        AssociateBuildRequest, BuildDetail, BuildListing, BuildSummary, DeletedBuild, UploadedBlob,
    },
};
use storage::{BuildFields, StoredBuild};
use tracing::{info, warn};

use crate::{
    formations::ensure_formation, internal, modules::module_payloads, optional_text,
    required_text, ApiContext,
};

/// Groups the container's blobs into builds and marks the ones a formation
/// uses.
pub async fn list_builds(
    ctx: &ApiContext,
    container: Option<&str>,
) -> Result<Vec<BuildListing>, ApiError> {
    let container = ctx.container(container);
    let mut listings = load_listings(ctx, container).await?;
    let records = ctx.storage.list_builds().await.map_err(internal)?;

    for listing in &mut listings {
        listing.formation_id = records
            .iter()
            .find(|record| record.fields.build_ref == listing.build_ref)
            .and_then(|record| record.formation_id);
    }
    Ok(listings)
}

pub async fn upload_build_file(
    ctx: &ApiContext,
    container: Option<&str>,
    path: &str,
    body: Vec<u8>,
) -> Result<UploadedBlob, ApiError> {
    let container = ctx.container(container);
    let name = path.trim();
    if name.is_empty()
        || name.starts_with('/')
        || name.contains('\\')
        || name.split('/').any(|segment| segment.is_empty() || segment == "..")
    {
        return Err(ApiError::validation(format!("invalid blob path '{path}'")));
    }
    let Some((_, file)) = split_build_blob(name) else {
        return Err(ApiError::validation(format!(
            "'{name}' is not a build file, expected one of {}",
            BuildFile::ALL.map(BuildFile::suffix).join(", ")
        )));
    };
    if body.is_empty() {
        return Err(ApiError::validation("uploaded file is empty"));
    }

    let size_bytes = body.len() as u64;
    ctx.blobs
        .upload(container, name, body, file.content_headers())
        .await
        .map_err(internal)?;
    info!(%container, blob = %name, size_bytes, "build file uploaded");

    Ok(UploadedBlob {
        container: container.to_string(),
        name: name.to_string(),
        size_bytes,
    })
}

/// Deletes the four blobs of a build together with its database record and
/// modules. Blobs that are already gone are skipped.
pub async fn delete_build(ctx: &ApiContext, build_ref: &str) -> Result<DeletedBuild, ApiError> {
    let (requested_container, _) = parse_build_ref(build_ref.trim());
    let container = ctx.container(requested_container);
    let listings = load_listings(ctx, container).await?;
    let records = load_records(ctx).await?;

    let (container, path) = match resolve_build(build_ref, &listings) {
        Some(listing) => (listing.container.clone(), listing.path.clone()),
        None => match resolve_build(build_ref, &records) {
            Some(record) => (record.container.clone(), record.path.clone()),
            None => {
                return Err(ApiError::not_found(format!("build '{build_ref}' not found")));
            }
        },
    };
    let canonical = format_build_ref(&container, &path);

    let outcomes = try_join_all(BuildFile::ALL.map(|file| {
        let name = file.blob_name(&path);
        let container = container.as_str();
        async move {
            let deleted = ctx.blobs.delete(container, &name).await?;
            anyhow::Ok((name, deleted))
        }
    }))
    .await
    .map_err(internal)?;
    let deleted_blobs: Vec<String> = outcomes
        .into_iter()
        .filter_map(|(name, deleted)| deleted.then_some(name))
        .collect();

    let deleted_record = match records.iter().find(|record| record.build_ref == canonical) {
        Some(record) => ctx
            .storage
            .delete_build(record.build_id)
            .await
            .map_err(internal)?,
        None => false,
    };

    if deleted_blobs.len() < BuildFile::ALL.len() {
        warn!(build_ref = %canonical, deleted = deleted_blobs.len(), "some build files were already missing");
    }
    info!(build_ref = %canonical, deleted_record, "build deleted");

    Ok(DeletedBuild {
        build_ref: canonical,
        deleted_blobs,
        deleted_record,
    })
}

pub async fn get_formation_build(
    ctx: &ApiContext,
    formation_id: FormationId,
) -> Result<BuildDetail, ApiError> {
    ensure_formation(ctx, formation_id).await?;
    let build = ctx
        .storage
        .build_for_formation(formation_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| no_build(formation_id))?;
    build_detail(ctx, build).await
}

/// Links a build found in blob storage to the formation, replacing any
/// build it had before.
pub async fn associate_build(
    ctx: &ApiContext,
    formation_id: FormationId,
    req: AssociateBuildRequest,
) -> Result<BuildDetail, ApiError> {
    ensure_formation(ctx, formation_id).await?;
    let build_ref = required_text(&req.build_ref, "build_ref")?;

    let (requested_container, _) = parse_build_ref(&build_ref);
    let container = ctx.container(requested_container);
    let listings = load_listings(ctx, container).await?;
    let listing = resolve_build(&build_ref, &listings).ok_or_else(|| {
        ApiError::not_found(format!("build '{build_ref}' not found in container '{container}'"))
    })?;
    if !listing.complete {
        return Err(ApiError::validation(format!(
            "build '{}' is incomplete, missing {}",
            listing.build_ref,
            missing_files(listing).join(", ")
        )));
    }

    let fields = BuildFields {
        build_ref: listing.build_ref.clone(),
        container: listing.container.clone(),
        path: listing.path.clone(),
        name: file_name(&listing.path).to_string(),
        version: optional_text(req.version),
    };
    let build_id = ctx
        .storage
        .link_build(&fields, formation_id)
        .await
        .map_err(internal)?;
    info!(%formation_id, %build_id, build_ref = %fields.build_ref, "build associated");

    let build = ctx
        .storage
        .get_build(build_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::internal("build record vanished after linking"))?;
    build_detail(ctx, build).await
}

pub async fn dissociate_build(ctx: &ApiContext, formation_id: FormationId) -> Result<(), ApiError> {
    ensure_formation(ctx, formation_id).await?;
    let unlinked = ctx
        .storage
        .unlink_formation_build(formation_id)
        .await
        .map_err(internal)?;
    if !unlinked {
        return Err(no_build(formation_id));
    }
    info!(%formation_id, "build dissociated");
    Ok(())
}

async fn load_listings(ctx: &ApiContext, container: &str) -> Result<Vec<BuildListing>, ApiError> {
    let items = ctx.blobs.list(container).await.map_err(internal)?;
    Ok(group_builds(container, &items))
}

pub(crate) async fn load_records(ctx: &ApiContext) -> Result<Vec<BuildSummary>, ApiError> {
    let records = ctx.storage.list_builds().await.map_err(internal)?;
    Ok(records.into_iter().map(build_summary).collect())
}

async fn build_detail(ctx: &ApiContext, build: StoredBuild) -> Result<BuildDetail, ApiError> {
    let modules = ctx
        .storage
        .list_modules(build.build_id)
        .await
        .map_err(internal)?;
    Ok(BuildDetail {
        build: build_summary(build),
        modules: module_payloads(modules)?,
    })
}

fn missing_files(listing: &BuildListing) -> Vec<&'static str> {
    let files = listing.files;
    [
        (files.data, BuildFile::Data),
        (files.framework, BuildFile::Framework),
        (files.loader, BuildFile::Loader),
        (files.wasm, BuildFile::Wasm),
    ]
    .into_iter()
    .filter(|(present, _)| !present)
    .map(|(_, file)| file.suffix())
    .collect()
}

pub(crate) fn build_summary(build: StoredBuild) -> BuildSummary {
    let fields = build.fields;
    BuildSummary {
        build_id: build.build_id,
        build_ref: fields.build_ref,
        container: fields.container,
        path: fields.path,
        name: fields.name,
        version: fields.version,
        formation_id: build.formation_id,
        created_at: build.created_at,
        updated_at: build.updated_at,
    }
}

fn no_build(formation_id: FormationId) -> ApiError {
    ApiError::not_found(format!("formation {formation_id} has no associated build"))
}

#[cfg(test)]
#[path = "tests/builds_tests.rs"]
mod tests;
