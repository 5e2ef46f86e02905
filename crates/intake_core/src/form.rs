//! Form State Controller: the single owner of the draft project record.

use std::collections::BTreeMap;

use shared::{
    domain::{
        ColorPalette, DraftProject, FormField, NavLink, NavLinkField, ProjectType, SectionId,
    },
    error::{FormError, ValidationFailure},
    protocol::{CreatedAt, ProjectColors, SubmittedProject},
};

#[derive(Debug, Clone, Default)]
pub struct FormController {
    draft: DraftProject,
    field_errors: BTreeMap<FormField, FormError>,
}

impl FormController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a pre-filled draft. A draft without nav links gets the
    /// usual single empty pair.
    pub fn from_draft(mut draft: DraftProject) -> Self {
        if draft.nav_links.is_empty() {
            draft.nav_links.push(NavLink::default());
        }
        Self {
            draft,
            field_errors: BTreeMap::new(),
        }
    }

    pub fn draft(&self) -> &DraftProject {
        &self.draft
    }

    pub fn field_error(&self, field: FormField) -> Option<&FormError> {
        self.field_errors.get(&field)
    }

    pub fn field_errors(&self) -> Vec<(FormField, FormError)> {
        self.field_errors
            .iter()
            .map(|(field, error)| (*field, error.clone()))
            .collect()
    }

    /// Sets one scalar field.
    ///
    /// Blank required fields are recorded as `RequiredFieldMissing` against
    /// the field and still return `Ok`. Only an unparseable project type is
    /// refused, leaving the draft untouched.
    pub fn set_field(
        &mut self,
        field: FormField,
        value: impl Into<String>,
    ) -> Result<(), FormError> {
        let value = value.into();
        match field {
            FormField::ProjectName => self.draft.project_name = value,
            FormField::ProjectDescription => self.draft.project_description = value,
            FormField::PrimaryColor => self.draft.primary_color = value,
            FormField::SecondaryColor => self.draft.secondary_color = value,
            FormField::AccentColor => self.draft.accent_color = value,
            FormField::LogoUrl => self.draft.logo_url = value,
            FormField::ProjectType => {
                self.draft.project_type = value
                    .parse::<ProjectType>()
                    .map_err(|_| FormError::InvalidValue { field, value })?;
            }
        }

        if field.is_required() {
            self.check_required(field);
        }
        Ok(())
    }

    fn check_required(&mut self, field: FormField) {
        if self.draft.field_value(field).trim().is_empty() {
            self.field_errors
                .insert(field, FormError::RequiredFieldMissing { field });
        } else {
            self.field_errors.remove(&field);
        }
    }

    pub fn apply_palette(&mut self, palette: &ColorPalette) {
        self.draft.primary_color = palette.primary.to_string();
        self.draft.secondary_color = palette.secondary.to_string();
        self.draft.accent_color = palette.accent.to_string();
    }

    pub fn add_nav_link(&mut self) {
        self.draft.nav_links.push(NavLink::default());
    }

    /// Removes the pair at `index`. The last remaining pair is never removed.
    pub fn remove_nav_link(&mut self, index: usize) -> Result<NavLink, FormError> {
        let len = self.draft.nav_links.len();
        if index >= len {
            return Err(FormError::IndexOutOfRange { index, len });
        }
        if len == 1 {
            return Err(FormError::LastNavLink);
        }
        Ok(self.draft.nav_links.remove(index))
    }

    pub fn update_nav_link(
        &mut self,
        index: usize,
        field: NavLinkField,
        value: impl Into<String>,
    ) -> Result<(), FormError> {
        let len = self.draft.nav_links.len();
        let link = self
            .draft
            .nav_links
            .get_mut(index)
            .ok_or(FormError::IndexOutOfRange { index, len })?;
        match field {
            NavLinkField::Title => link.title = value.into(),
            NavLinkField::Url => link.url = value.into(),
        }
        Ok(())
    }

    /// Flips membership of `id`; returns whether it is selected afterwards.
    pub fn toggle_section(&mut self, id: SectionId) -> bool {
        if self.draft.selected_sections.remove(&id) {
            false
        } else {
            self.draft.selected_sections.insert(id);
            true
        }
    }

    pub fn is_selected(&self, id: SectionId) -> bool {
        self.draft.selected_sections.contains(&id)
    }

    /// Normalizes the draft into the persisted shape.
    ///
    /// Every missing required field is reported, not just the first.
    pub fn build_submission_record(&self) -> Result<SubmittedProject, ValidationFailure> {
        let errors: Vec<FormError> = FormField::REQUIRED
            .into_iter()
            .filter(|field| self.draft.field_value(*field).trim().is_empty())
            .map(|field| FormError::RequiredFieldMissing { field })
            .collect();
        if !errors.is_empty() {
            return Err(ValidationFailure { errors });
        }

        let draft = &self.draft;
        Ok(SubmittedProject {
            project_name: draft.project_name.trim().to_string(),
            project_description: draft.project_description.trim().to_string(),
            colors: ProjectColors {
                primary: draft.primary_color.clone(),
                secondary: draft.secondary_color.clone(),
                accent: draft.accent_color.clone(),
            },
            project_type: draft.project_type,
            nav_links: draft
                .nav_links
                .iter()
                .filter(|link| link.is_complete())
                .cloned()
                .collect(),
            sections: draft.selected_sections.iter().copied().collect(),
            logo_url: draft.logo_url.trim().to_string(),
            created_at: CreatedAt::ServerAssigned,
        })
    }

    /// Shows a failed build next to each offending field.
    pub fn record_validation_failure(&mut self, failure: &ValidationFailure) {
        for field in failure.missing_fields() {
            self.field_errors
                .insert(field, FormError::RequiredFieldMissing { field });
        }
    }

    pub fn reset(&mut self) {
        self.draft = DraftProject::default();
        self.field_errors.clear();
    }
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
