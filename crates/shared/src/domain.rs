use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PRIMARY_COLOR: &str = "#10b981";
pub const DEFAULT_SECONDARY_COLOR: &str = "#0d9488";
pub const DEFAULT_ACCENT_COLOR: &str = "#06b6d4";

/// Scalar fields of the draft that can be set one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormField {
    ProjectName,
    ProjectDescription,
    PrimaryColor,
    SecondaryColor,
    AccentColor,
    ProjectType,
    LogoUrl,
}

impl FormField {
    pub const REQUIRED: [FormField; 3] = [
        FormField::ProjectName,
        FormField::ProjectDescription,
        FormField::LogoUrl,
    ];

    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }

    pub fn is_color(self) -> bool {
        matches!(
            self,
            FormField::PrimaryColor | FormField::SecondaryColor | FormField::AccentColor
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FormField::ProjectName => "projectName",
            FormField::ProjectDescription => "projectDescription",
            FormField::PrimaryColor => "primaryColor",
            FormField::SecondaryColor => "secondaryColor",
            FormField::AccentColor => "accentColor",
            FormField::ProjectType => "projectType",
            FormField::LogoUrl => "logoUrl",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormField {
    type Err = UnknownIdentifier;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let field = match value.trim() {
            "projectName" => FormField::ProjectName,
            "projectDescription" => FormField::ProjectDescription,
            "primaryColor" => FormField::PrimaryColor,
            "secondaryColor" => FormField::SecondaryColor,
            "accentColor" => FormField::AccentColor,
            "projectType" => FormField::ProjectType,
            "logoUrl" | "logoURL" => FormField::LogoUrl,
            other => return Err(UnknownIdentifier(other.to_string())),
        };
        Ok(field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavLinkField {
    Title,
    Url,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink {
    pub title: String,
    pub url: String,
}

impl NavLink {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }

    /// Only pairs with both halves filled in are exported.
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty() && !self.url.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectType {
    #[default]
    #[serde(rename = "store")]
    Store,
    #[serde(rename = "store-dashboard", alias = "store_dashboard")]
    StoreDashboard,
}

impl ProjectType {
    pub const ALL: [ProjectType; 2] = [ProjectType::Store, ProjectType::StoreDashboard];

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectType::Store => "store",
            ProjectType::StoreDashboard => "store-dashboard",
        }
    }
}

impl FromStr for ProjectType {
    type Err = UnknownIdentifier;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "store" => Ok(ProjectType::Store),
            "store-dashboard" | "store_dashboard" => Ok(ProjectType::StoreDashboard),
            other => Err(UnknownIdentifier(other.to_string())),
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content blocks a project can opt into. The enum is the whole catalog.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SectionId {
    Hero,
    About,
    Services,
    Products,
    Testimonials,
    Contact,
    Faq,
    Team,
}

impl SectionId {
    pub const ALL: [SectionId; 8] = [
        SectionId::Hero,
        SectionId::About,
        SectionId::Services,
        SectionId::Products,
        SectionId::Testimonials,
        SectionId::Contact,
        SectionId::Faq,
        SectionId::Team,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionId::Hero => "hero",
            SectionId::About => "about",
            SectionId::Services => "services",
            SectionId::Products => "products",
            SectionId::Testimonials => "testimonials",
            SectionId::Contact => "contact",
            SectionId::Faq => "faq",
            SectionId::Team => "team",
        }
    }
}

impl FromStr for SectionId {
    type Err = UnknownIdentifier;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        SectionId::ALL
            .into_iter()
            .find(|id| id.as_str() == value)
            .ok_or_else(|| UnknownIdentifier(value.to_string()))
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown identifier '{0}'")]
pub struct UnknownIdentifier(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Section {
    pub id: SectionId,
    pub name: &'static str,
}

pub static SECTIONS: [Section; 8] = [
    Section {
        id: SectionId::Hero,
        name: "Hero",
    },
    Section {
        id: SectionId::About,
        name: "About us",
    },
    Section {
        id: SectionId::Services,
        name: "Our services",
    },
    Section {
        id: SectionId::Products,
        name: "Products",
    },
    Section {
        id: SectionId::Testimonials,
        name: "Testimonials",
    },
    Section {
        id: SectionId::Contact,
        name: "Contact us",
    },
    Section {
        id: SectionId::Faq,
        name: "FAQ",
    },
    Section {
        id: SectionId::Team,
        name: "Our team",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProjectTypeInfo {
    pub id: ProjectType,
    pub name: &'static str,
    pub description: &'static str,
}

pub static PROJECT_TYPES: [ProjectTypeInfo; 2] = [
    ProjectTypeInfo {
        id: ProjectType::Store,
        name: "Store only",
        description: "Storefront for customers",
    },
    ProjectTypeInfo {
        id: ProjectType::StoreDashboard,
        name: "Store + dashboard",
        description: "Storefront with a full admin dashboard",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorPalette {
    pub name: &'static str,
    pub primary: &'static str,
    pub secondary: &'static str,
    pub accent: &'static str,
}

pub static PALETTES: [ColorPalette; 6] = [
    ColorPalette {
        name: "Classic green",
        primary: "#10b981",
        secondary: "#0d9488",
        accent: "#06b6d4",
    },
    ColorPalette {
        name: "Professional blue",
        primary: "#3b82f6",
        secondary: "#2563eb",
        accent: "#1d4ed8",
    },
    ColorPalette {
        name: "Modern purple",
        primary: "#8b5cf6",
        secondary: "#7c3aed",
        accent: "#6d28d9",
    },
    ColorPalette {
        name: "Warm orange",
        primary: "#f97316",
        secondary: "#ea580c",
        accent: "#c2410c",
    },
    ColorPalette {
        name: "Elegant pink",
        primary: "#ec4899",
        secondary: "#db2777",
        accent: "#be185d",
    },
    ColorPalette {
        name: "Bold red",
        primary: "#ef4444",
        secondary: "#dc2626",
        accent: "#b91c1c",
    },
];

pub fn find_palette(name: &str) -> Option<&'static ColorPalette> {
    let name = name.trim();
    PALETTES
        .iter()
        .find(|palette| palette.name.eq_ignore_ascii_case(name))
}

/// `#` followed by exactly six hex digits.
pub fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit())
}

/// In-progress form data for one visit to the form view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DraftProject {
    pub project_name: String,
    pub project_description: String,
    pub primary_color: String,
    pub secondary_color: String,
    pub accent_color: String,
    pub project_type: ProjectType,
    pub nav_links: Vec<NavLink>,
    pub selected_sections: BTreeSet<SectionId>,
    pub logo_url: String,
}

impl Default for DraftProject {
    fn default() -> Self {
        Self {
            project_name: String::new(),
            project_description: String::new(),
            primary_color: DEFAULT_PRIMARY_COLOR.into(),
            secondary_color: DEFAULT_SECONDARY_COLOR.into(),
            accent_color: DEFAULT_ACCENT_COLOR.into(),
            project_type: ProjectType::Store,
            nav_links: vec![NavLink::default()],
            selected_sections: BTreeSet::new(),
            logo_url: String::new(),
        }
    }
}

impl DraftProject {
    /// Text value of a scalar field, as the form displays it.
    pub fn field_value(&self, field: FormField) -> &str {
        match field {
            FormField::ProjectName => &self.project_name,
            FormField::ProjectDescription => &self.project_description,
            FormField::PrimaryColor => &self.primary_color,
            FormField::SecondaryColor => &self.secondary_color,
            FormField::AccentColor => &self.accent_color,
            FormField::ProjectType => self.project_type.as_str(),
            FormField::LogoUrl => &self.logo_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_draft_starts_with_one_empty_nav_link() {
        let draft = DraftProject::default();
        assert_eq!(draft.nav_links, vec![NavLink::default()]);
        assert!(draft.selected_sections.is_empty());
        assert_eq!(draft.project_type, ProjectType::Store);
        assert_eq!(draft.primary_color, PALETTES[0].primary);
    }

    #[test]
    fn palette_catalog_holds_valid_colors() {
        for palette in &PALETTES {
            assert!(is_hex_color(palette.primary), "{}", palette.name);
            assert!(is_hex_color(palette.secondary), "{}", palette.name);
            assert!(is_hex_color(palette.accent), "{}", palette.name);
        }
    }

    #[test]
    fn hex_color_rejects_short_and_unprefixed_values() {
        assert!(is_hex_color("#A1b2C3"));
        assert!(!is_hex_color("a1b2c3"));
        assert!(!is_hex_color("#fff"));
        assert!(!is_hex_color("#gggggg"));
    }

    #[test]
    fn project_type_accepts_both_dashboard_spellings() {
        assert_eq!(
            "store_dashboard".parse::<ProjectType>(),
            Ok(ProjectType::StoreDashboard)
        );
        assert_eq!(
            "store-dashboard".parse::<ProjectType>(),
            Ok(ProjectType::StoreDashboard)
        );
        assert!("kiosk".parse::<ProjectType>().is_err());
    }

    #[test]
    fn section_ids_round_trip_through_catalog_names() {
        for section in &SECTIONS {
            assert_eq!(section.id.as_str().parse::<SectionId>(), Ok(section.id));
        }
        assert!("blog".parse::<SectionId>().is_err());
    }

    #[test]
    fn form_field_parses_its_own_name() {
        for field in FormField::REQUIRED {
            assert_eq!(field.as_str().parse::<FormField>(), Ok(field));
        }
        assert_eq!("logoURL".parse::<FormField>(), Ok(FormField::LogoUrl));
        assert!("colors".parse::<FormField>().is_err());
    }

    #[test]
    fn find_palette_ignores_case() {
        let palette = find_palette("bold RED").expect("palette");
        assert_eq!(palette.primary, "#ef4444");
        assert!(find_palette("neon").is_none());
    }
}
