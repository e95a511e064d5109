use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    BuildId, ContentId, ContentKind, FormationId, MemberRole, ModuleId, OptionId, OrganizationId,
    QuestionId, QuestionKind, StepId, UserId,
};

/// Current version of the portable formation document.
pub const FORMATION_DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub user_id: UserId,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormationSummary {
    pub formation_id: FormationId,
    pub external_id: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub duration_minutes: Option<i64>,
    pub category: Option<String>,
    pub is_public: bool,
    pub content_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateFormationRequest {
    #[serde(default)]
    pub external_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

/// Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFormationRequest {
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormationDetail {
    #[serde(flatten)]
    pub formation: FormationSummary,
    pub contents: Vec<ContentDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDetail {
    pub content_id: ContentId,
    pub formation_id: FormationId,
    pub kind: ContentKind,
    pub title: String,
    pub description: Option<String>,
    pub order: i64,
    #[serde(default)]
    pub steps: Vec<StepPayload>,
    #[serde(default)]
    pub questions: Vec<QuestionPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepPayload {
    pub step_id: StepId,
    pub title: String,
    pub instruction: Option<String>,
    pub image_url: Option<String>,
    pub order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionPayload {
    pub question_id: QuestionId,
    pub text: String,
    pub kind: QuestionKind,
    pub explanation: Option<String>,
    pub order: i64,
    pub options: Vec<OptionPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionPayload {
    pub option_id: OptionId,
    pub text: String,
    pub is_correct: bool,
    pub order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContentRequest {
    pub kind: ContentKind,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateContentRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderContentsRequest {
    pub content_ids: Vec<ContentId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepInput {
    pub title: String,
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionInput {
    pub text: String,
    #[serde(default)]
    pub kind: QuestionKind,
    #[serde(default)]
    pub explanation: Option<String>,
    pub options: Vec<OptionInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionInput {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// Portable export of a formation tree, free of database ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormationDocument {
    pub version: u32,
    pub formation: CreateFormationRequest,
    #[serde(default)]
    pub contents: Vec<ContentDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDocument {
    pub kind: ContentKind,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepInput>,
    #[serde(default)]
    pub questions: Vec<QuestionInput>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFiles {
    pub data: bool,
    pub framework: bool,
    pub loader: bool,
    pub wasm: bool,
}

impl BuildFiles {
    pub fn is_complete(&self) -> bool {
        self.data && self.framework && self.loader && self.wasm
    }
}

/// A Unity WebGL build as seen in blob storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildListing {
    pub build_ref: String,
    pub container: String,
    pub path: String,
    pub name: String,
    pub files: BuildFiles,
    pub complete: bool,
    pub total_size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formation_id: Option<FormationId>,
}

/// A build as recorded in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSummary {
    pub build_id: BuildId,
    pub build_ref: String,
    pub container: String,
    pub path: String,
    pub name: String,
    pub version: Option<String>,
    pub formation_id: Option<FormationId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildDetail {
    #[serde(flatten)]
    pub build: BuildSummary,
    pub modules: Vec<ModulePayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociateBuildRequest {
    pub build_ref: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedBlob {
    pub container: String,
    pub name: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedBuild {
    pub build_ref: String,
    pub deleted_blobs: Vec<String>,
    pub deleted_record: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModulePayload {
    pub module_id: ModuleId,
    pub build_id: BuildId,
    pub module_key: String,
    pub title: String,
    pub kind: ContentKind,
    pub content: serde_json::Value,
    pub order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleInput {
    pub module_key: String,
    pub title: String,
    pub kind: ContentKind,
    #[serde(default = "empty_object")]
    pub content: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateModuleRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<serde_json::Value>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationSummary {
    pub organization_id: OrganizationId,
    pub name: String,
    pub description: Option<String>,
    pub owner_user_id: UserId,
    pub member_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<MemberRole>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOrganizationRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberSummary {
    pub organization_id: OrganizationId,
    pub user_id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddMemberRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_member_role")]
    pub role: MemberRole,
}

fn default_member_role() -> MemberRole {
    MemberRole::Member
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMemberRequest {
    pub role: MemberRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub organization_id: OrganizationId,
    pub formation_id: FormationId,
    pub external_id: String,
    pub name: String,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignTrainingRequest {
    pub formation_id: FormationId,
}
