use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        ColorPalette, DraftProject, FormField, NavLink, NavLinkField, ProjectType,
        ProjectTypeInfo, Section, SectionId, PALETTES, PROJECT_TYPES, SECTIONS,
    },
    error::FormError,
};

/// Collection every submitted project is written to.
pub const PROJECTS_COLLECTION: &str = "projects";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectColors {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
}

/// Creation time of a stored record.
///
/// Records built by the form carry `ServerAssigned`; the store replaces it
/// with its own clock at write time and reads come back as `At`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CreatedAt {
    #[default]
    ServerAssigned,
    At(DateTime<Utc>),
}

impl CreatedAt {
    pub fn is_server_assigned(&self) -> bool {
        matches!(self, CreatedAt::ServerAssigned)
    }
}

/// The normalized shape persisted to the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedProject {
    pub project_name: String,
    pub project_description: String,
    pub colors: ProjectColors,
    pub project_type: ProjectType,
    pub nav_links: Vec<NavLink>,
    pub sections: Vec<SectionId>,
    #[serde(rename = "logoURL")]
    pub logo_url: String,
    #[serde(default, skip_serializing_if = "CreatedAt::is_server_assigned")]
    pub created_at: CreatedAt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRecord {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredProject {
    pub id: String,
    #[serde(flatten)]
    pub record: SubmittedProject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionPhase {
    Idle,
    Submitting,
    Success { record_id: String },
    Failed { message: String },
}

impl SubmissionPhase {
    pub fn accepts_submit(&self) -> bool {
        matches!(self, SubmissionPhase::Idle | SubmissionPhase::Failed { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionPhase::Idle => "idle",
            SubmissionPhase::Submitting => "submitting",
            SubmissionPhase::Success { .. } => "success",
            SubmissionPhase::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Landing,
    Form,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Landing => "/",
            Route::Form => "/form",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrorView {
    pub field: FormField,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSnapshot {
    pub route: String,
    pub phase: SubmissionPhase,
    pub submit_enabled: bool,
    pub draft: DraftProject,
    pub field_errors: Vec<FieldErrorView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    #[serde(flatten)]
    pub form: FormSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    pub sections: &'static [Section],
    pub palettes: &'static [ColorPalette],
    pub project_types: &'static [ProjectTypeInfo],
}

impl Catalog {
    pub fn get() -> Self {
        Self {
            sections: &SECTIONS,
            palettes: &PALETTES,
            project_types: &PROJECT_TYPES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetFieldRequest {
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyPaletteRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateNavLinkRequest {
    pub field: NavLinkField,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleSectionResponse {
    pub section: SectionId,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub record_id: String,
    pub phase: SubmissionPhase,
}

pub fn field_error_views(errors: &[(FormField, FormError)]) -> Vec<FieldErrorView> {
    errors
        .iter()
        .map(|(field, error)| FieldErrorView {
            field: *field,
            message: error.to_string(),
        })
        .collect()
}
