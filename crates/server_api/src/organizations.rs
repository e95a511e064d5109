use shared::{
    domain::{FormationId, MemberRole, OrganizationId, UserId},
    error::ApiError,
    protocol::{
        AddMemberRequest, AssignTrainingRequest, CreateOrganizationRequest, MemberSummary,
        OrganizationSummary, TrainingSummary, UpdateMemberRequest, UpdateOrganizationRequest,
    },
};
use storage::{StoredMember, StoredOrganization, StoredTraining};
use tracing::info;

use crate::{
    formations::ensure_formation, internal, normalize_email, optional_text, required_text,
    ApiContext,
};

/// What the acting user needs: membership to read, owner or admin to change,
/// owner to delete.
#[derive(Debug, Clone, Copy)]
enum Access {
    Read,
    Manage,
    Own,
}

impl Access {
    fn allows(self, role: MemberRole) -> bool {
        match self {
            Access::Read => true,
            Access::Manage => role.can_manage(),
            Access::Own => role == MemberRole::Owner,
        }
    }
}

pub async fn list_organizations(
    ctx: &ApiContext,
    acting: UserId,
) -> Result<Vec<OrganizationSummary>, ApiError> {
    ensure_user(ctx, acting).await?;
    let organizations = ctx
        .storage
        .list_organizations_for_user(acting)
        .await
        .map_err(internal)?;
    Ok(organizations
        .into_iter()
        .map(|(organization, role)| organization_summary(organization, Some(role)))
        .collect())
}

pub async fn create_organization(
    ctx: &ApiContext,
    acting: UserId,
    req: CreateOrganizationRequest,
) -> Result<OrganizationSummary, ApiError> {
    ensure_user(ctx, acting).await?;
    let name = required_text(&req.name, "name")?;
    let description = optional_text(req.description);

    let organization_id = ctx
        .storage
        .create_organization(&name, description.as_deref(), acting)
        .await
        .map_err(internal)?;
    info!(%organization_id, owner = %acting, "organization created");
    load_summary(ctx, organization_id, MemberRole::Owner).await
}

pub async fn get_organization(
    ctx: &ApiContext,
    acting: UserId,
    organization_id: OrganizationId,
) -> Result<OrganizationSummary, ApiError> {
    let (organization, role) = authorize(ctx, organization_id, acting, Access::Read).await?;
    Ok(organization_summary(organization, Some(role)))
}

pub async fn update_organization(
    ctx: &ApiContext,
    acting: UserId,
    organization_id: OrganizationId,
    req: UpdateOrganizationRequest,
) -> Result<OrganizationSummary, ApiError> {
    let (_, role) = authorize(ctx, organization_id, acting, Access::Manage).await?;
    let name = req
        .name
        .as_deref()
        .map(|name| required_text(name, "name"))
        .transpose()?;
    let description = optional_text(req.description);

    ctx.storage
        .update_organization(organization_id, name.as_deref(), description.as_deref())
        .await
        .map_err(internal)?;
    load_summary(ctx, organization_id, role).await
}

pub async fn delete_organization(
    ctx: &ApiContext,
    acting: UserId,
    organization_id: OrganizationId,
) -> Result<(), ApiError> {
    authorize(ctx, organization_id, acting, Access::Own).await?;
    let deleted = ctx
        .storage
        .delete_organization(organization_id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(not_found(organization_id));
    }
    info!(%organization_id, "organization deleted");
    Ok(())
}

pub async fn list_members(
    ctx: &ApiContext,
    acting: UserId,
    organization_id: OrganizationId,
) -> Result<Vec<MemberSummary>, ApiError> {
    authorize(ctx, organization_id, acting, Access::Read).await?;
    let members = ctx
        .storage
        .list_members(organization_id)
        .await
        .map_err(internal)?;
    Ok(members
        .into_iter()
        .map(|member| member_summary(organization_id, member))
        .collect())
}

/// Adds a member by email, creating the user on first sight.
pub async fn add_member(
    ctx: &ApiContext,
    acting: UserId,
    organization_id: OrganizationId,
    req: AddMemberRequest,
) -> Result<MemberSummary, ApiError> {
    authorize(ctx, organization_id, acting, Access::Manage).await?;
    if req.role == MemberRole::Owner {
        return Err(ApiError::validation("the owner role cannot be granted"));
    }
    let email = normalize_email(&req.email)?;
    let name = optional_text(req.name);

    let user_id = ctx
        .storage
        .upsert_user(&email, name.as_deref())
        .await
        .map_err(internal)?;
    let added = ctx
        .storage
        .add_member(organization_id, user_id, req.role)
        .await
        .map_err(internal)?;
    if !added {
        return Err(ApiError::validation(format!(
            "{email} is already a member of this organization"
        )));
    }
    info!(%organization_id, %user_id, role = %req.role, "member added");
    load_member(ctx, organization_id, user_id).await
}

pub async fn update_member(
    ctx: &ApiContext,
    acting: UserId,
    organization_id: OrganizationId,
    member_id: UserId,
    req: UpdateMemberRequest,
) -> Result<MemberSummary, ApiError> {
    authorize(ctx, organization_id, acting, Access::Manage).await?;
    if req.role == MemberRole::Owner {
        return Err(ApiError::validation("the owner role cannot be granted"));
    }
    if member_role(ctx, organization_id, member_id).await? == MemberRole::Owner {
        return Err(ApiError::validation("the owner's role cannot be changed"));
    }

    ctx.storage
        .update_member_role(organization_id, member_id, req.role)
        .await
        .map_err(internal)?;
    info!(%organization_id, %member_id, role = %req.role, "member role changed");
    load_member(ctx, organization_id, member_id).await
}

pub async fn remove_member(
    ctx: &ApiContext,
    acting: UserId,
    organization_id: OrganizationId,
    member_id: UserId,
) -> Result<(), ApiError> {
    authorize(ctx, organization_id, acting, Access::Manage).await?;
    if member_role(ctx, organization_id, member_id).await? == MemberRole::Owner {
        return Err(ApiError::validation("the owner cannot be removed"));
    }

    ctx.storage
        .remove_member(organization_id, member_id)
        .await
        .map_err(internal)?;
    info!(%organization_id, %member_id, "member removed");
    Ok(())
}

pub async fn list_trainings(
    ctx: &ApiContext,
    acting: UserId,
    organization_id: OrganizationId,
) -> Result<Vec<TrainingSummary>, ApiError> {
    authorize(ctx, organization_id, acting, Access::Read).await?;
    let trainings = ctx
        .storage
        .list_trainings(organization_id)
        .await
        .map_err(internal)?;
    Ok(trainings
        .into_iter()
        .map(|training| training_summary(organization_id, training))
        .collect())
}

pub async fn assign_training(
    ctx: &ApiContext,
    acting: UserId,
    organization_id: OrganizationId,
    req: AssignTrainingRequest,
) -> Result<TrainingSummary, ApiError> {
    authorize(ctx, organization_id, acting, Access::Manage).await?;
    ensure_formation(ctx, req.formation_id).await?;

    let assigned = ctx
        .storage
        .assign_training(organization_id, req.formation_id)
        .await
        .map_err(internal)?;
    if !assigned {
        return Err(ApiError::validation(format!(
            "formation {} is already assigned",
            req.formation_id
        )));
    }
    info!(%organization_id, formation_id = %req.formation_id, "training assigned");

    let trainings = ctx
        .storage
        .list_trainings(organization_id)
        .await
        .map_err(internal)?;
    trainings
        .into_iter()
        .find(|training| training.formation_id == req.formation_id)
        .map(|training| training_summary(organization_id, training))
        .ok_or_else(|| ApiError::internal("training vanished after assignment"))
}

pub async fn unassign_training(
    ctx: &ApiContext,
    acting: UserId,
    organization_id: OrganizationId,
    formation_id: FormationId,
) -> Result<(), ApiError> {
    authorize(ctx, organization_id, acting, Access::Manage).await?;
    let removed = ctx
        .storage
        .unassign_training(organization_id, formation_id)
        .await
        .map_err(internal)?;
    if !removed {
        return Err(ApiError::not_found(format!(
            "formation {formation_id} is not assigned to organization {organization_id}"
        )));
    }
    info!(%organization_id, %formation_id, "training unassigned");
    Ok(())
}

/// 404 when the organization is missing, 403 when `acting` is not a member
/// or lacks the role `access` needs.
async fn authorize(
    ctx: &ApiContext,
    organization_id: OrganizationId,
    acting: UserId,
    access: Access,
) -> Result<(StoredOrganization, MemberRole), ApiError> {
    let organization = ctx
        .storage
        .get_organization(organization_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(organization_id))?;
    let role = ctx
        .storage
        .member_role(organization_id, acting)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            ApiError::forbidden(format!(
                "user {acting} is not a member of organization {organization_id}"
            ))
        })?;
    if !access.allows(role) {
        return Err(ApiError::forbidden(format!(
            "role {role} cannot perform this action"
        )));
    }
    Ok((organization, role))
}

async fn ensure_user(ctx: &ApiContext, user_id: UserId) -> Result<(), ApiError> {
    ctx.storage
        .get_user(user_id)
        .await
        .map_err(internal)?
        .map(|_| ())
        .ok_or_else(|| ApiError::not_found(format!("user {user_id} not found")))
}

async fn member_role(
    ctx: &ApiContext,
    organization_id: OrganizationId,
    member_id: UserId,
) -> Result<MemberRole, ApiError> {
    ctx.storage
        .member_role(organization_id, member_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            ApiError::not_found(format!(
                "user {member_id} is not a member of organization {organization_id}"
            ))
        })
}

async fn load_summary(
    ctx: &ApiContext,
    organization_id: OrganizationId,
    role: MemberRole,
) -> Result<OrganizationSummary, ApiError> {
    ctx.storage
        .get_organization(organization_id)
        .await
        .map_err(internal)?
        .map(|organization| organization_summary(organization, Some(role)))
        .ok_or_else(|| not_found(organization_id))
}

async fn load_member(
    ctx: &ApiContext,
    organization_id: OrganizationId,
    user_id: UserId,
) -> Result<MemberSummary, ApiError> {
    let members = ctx
        .storage
        .list_members(organization_id)
        .await
        .map_err(internal)?;
    members
        .into_iter()
        .find(|member| member.user_id == user_id)
        .map(|member| member_summary(organization_id, member))
        .ok_or_else(|| ApiError::internal(format!("member {user_id} vanished")))
}

fn organization_summary(
    organization: StoredOrganization,
    role: Option<MemberRole>,
) -> OrganizationSummary {
    OrganizationSummary {
        organization_id: organization.organization_id,
        name: organization.name,
        description: organization.description,
        owner_user_id: organization.owner_user_id,
        member_count: organization.member_count,
        role,
        created_at: organization.created_at,
    }
}

fn member_summary(organization_id: OrganizationId, member: StoredMember) -> MemberSummary {
    MemberSummary {
        organization_id,
        user_id: member.user_id,
        email: member.email,
        name: member.name,
        role: member.role,
        joined_at: member.joined_at,
    }
}

fn training_summary(organization_id: OrganizationId, training: StoredTraining) -> TrainingSummary {
    TrainingSummary {
        organization_id,
        formation_id: training.formation_id,
        external_id: training.external_id,
        name: training.name,
        assigned_at: training.assigned_at,
    }
}

fn not_found(organization_id: OrganizationId) -> ApiError {
    ApiError::not_found(format!("organization {organization_id} not found"))
}

#[cfg(test)]
#[path = "tests/organizations_tests.rs"]
mod tests;
