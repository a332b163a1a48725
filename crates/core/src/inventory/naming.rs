//! Managed-name conventions.
//!
//! Entities the engine creates carry their owning source app id in the name:
//!
//! ```text
//! <prefix>/<sourceAppId>/<appName>                                   (apps)
//! <prefix>/<sourceAppId>/<category>/<displayFormat>[/<floor 0.00>]   (ad units)
//! ```
//!
//! Anything not matching the pattern for a given source app is foreign and
//! must never be altered.

use super::source::SourceApp;
use super::target::AdFormatCategory;

/// Render a floor the way ad unit names carry it.
pub fn format_floor(floor: f64) -> String {
    format!("{:.2}", floor)
}

/// Canonical spelling of a display format.
pub fn normalize_display_format(raw: &str) -> String {
    let normalized = raw
        .trim()
        .to_ascii_lowercase()
        .replace([' ', '-'], "_");
    match normalized.as_str() {
        "image" => "image_and_text".to_string(),
        _ => normalized,
    }
}

/// The parts encoded in a managed ad unit name.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedName {
    pub source_app_id: String,
    pub category: AdFormatCategory,
    pub display_format: String,
    pub floor: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedNamespace {
    prefix: String,
}

impl ManagedNamespace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Leading segment shared by every entity owned by `source_app_id`.
    pub fn owner_prefix(&self, source_app_id: &str) -> String {
        format!("{}/{}/", self.prefix, source_app_id)
    }

    /// Apps only need the owner prefix; the rest of an app name is free text.
    pub fn owns(&self, name: &str, source_app_id: &str) -> bool {
        name.starts_with(&self.owner_prefix(source_app_id))
    }

    /// True only for names this namespace would render itself for `source_app_id`.
    pub fn owns_ad_unit(&self, name: &str, source_app_id: &str) -> bool {
        let Some(parsed) = self.parse_ad_unit_name(name) else {
            return false;
        };
        parsed.source_app_id == source_app_id
            && parsed.display_format == normalize_display_format(&parsed.display_format)
            && self.ad_unit_name(
                &parsed.source_app_id,
                parsed.category,
                &parsed.display_format,
                parsed.floor,
            ) == name
    }

    pub fn app_name(&self, app: &SourceApp) -> String {
        format!("{}{}", self.owner_prefix(&app.id), app.name)
    }

    pub fn ad_unit_name(
        &self,
        source_app_id: &str,
        category: AdFormatCategory,
        display_format: &str,
        floor: Option<f64>,
    ) -> String {
        let mut name = format!(
            "{}{}/{}",
            self.owner_prefix(source_app_id),
            category.as_str(),
            display_format
        );
        if let Some(floor) = floor {
            name.push('/');
            name.push_str(&format_floor(floor));
        }
        name
    }

    /// Recover the parts of a managed ad unit name.
    pub fn parse_ad_unit_name(&self, name: &str) -> Option<ManagedName> {
        let rest = name.strip_prefix(&self.prefix)?.strip_prefix('/')?;
        let mut segments = rest.split('/');
        let source_app_id = segments.next().filter(|s| !s.is_empty())?;
        let category = AdFormatCategory::parse(segments.next()?)?;
        let display_format = segments.next().filter(|s| !s.is_empty())?;
        let floor = match segments.next() {
            Some(raw) => Some(raw.parse::<f64>().ok()?),
            None => None,
        };
        if segments.next().is_some() {
            return None;
        }
        Some(ManagedName {
            source_app_id: source_app_id.to_string(),
            category,
            display_format: display_format.to_string(),
            floor,
        })
    }
}
