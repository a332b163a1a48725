//! Desired-state builder: source app floors to target ad unit templates.

use log::warn;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::errors::{Error, Result};
use crate::inventory::{
    ad_type, normalize_display_format, AdFormatCategory, FloorSettings, ManagedNamespace,
    NewAdUnit, RewardSettings, SourceApp, TargetAdUnit,
};
use crate::wire::round_to_cents;

/// Canonical, order-independent signature of an ad unit's semantic fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateIdentity(String);

impl TemplateIdentity {
    /// Digest of any JSON value; object key order does not matter.
    pub fn from_value(value: &Value) -> Self {
        let mut canonical = String::new();
        write_canonical(value, &mut canonical);
        Self(format!("{:x}", Sha256::digest(canonical.as_bytes())))
    }

    pub fn of_shape(shape: &AdUnitShape) -> Self {
        // AdUnitShape only holds plain data, serialization cannot fail.
        let value = serde_json::to_value(shape).unwrap_or(Value::Null);
        Self::from_value(&value)
    }

    /// Identity of a unit that already exists on the target.
    pub fn of_unit(unit: &TargetAdUnit) -> Self {
        Self::of_shape(&AdUnitShape::of_unit(unit))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (idx, key) in keys.into_iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Floor part of the identity. Only the manual value matters when manual mode is on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloorShape {
    pub mode: i64,
    pub ecpm: Option<f64>,
}

impl From<&FloorSettings> for FloorShape {
    fn from(settings: &FloorSettings) -> Self {
        Self {
            mode: settings.mode,
            ecpm: settings.manual_ecpm(),
        }
    }
}

/// The fields that decide whether an existing unit satisfies a template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdUnitShape {
    pub name: String,
    pub ad_type: i64,
    pub ad_format: i64,
    pub floor_config: FloorShape,
    pub refresh_rate_flag: bool,
    pub reward_config: Option<RewardSettings>,
}

impl AdUnitShape {
    pub fn of_unit(unit: &TargetAdUnit) -> Self {
        Self {
            name: unit.name.clone(),
            ad_type: unit.ad_type,
            ad_format: unit.ad_format,
            floor_config: unit
                .floor_settings
                .as_ref()
                .map(FloorShape::from)
                .unwrap_or_else(|| FloorShape::from(&FloorSettings::default())),
            refresh_rate_flag: unit.refresh_rate_enabled,
            reward_config: unit.reward_settings.clone(),
        }
    }
}

/// Desired state of one ad unit.
#[derive(Debug, Clone, PartialEq)]
pub struct AdUnitTemplate {
    pub name: String,
    pub category: AdFormatCategory,
    pub display_format: String,
    pub floor: Option<f64>,
    pub ad_type: i64,
    pub ad_format: i64,
    pub refresh_rate_enabled: bool,
    pub floor_settings: FloorSettings,
    pub reward_settings: Option<RewardSettings>,
    pub identity: TemplateIdentity,
}

impl AdUnitTemplate {
    pub fn shape(&self) -> AdUnitShape {
        AdUnitShape {
            name: self.name.clone(),
            ad_type: self.ad_type,
            ad_format: self.ad_format,
            floor_config: FloorShape::from(&self.floor_settings),
            refresh_rate_flag: self.refresh_rate_enabled,
            reward_config: self.reward_settings.clone(),
        }
    }

    pub fn to_new_ad_unit(&self, app_id: &str) -> NewAdUnit {
        NewAdUnit {
            app_id: app_id.to_string(),
            name: self.name.clone(),
            ad_type: self.ad_type,
            ad_format: self.ad_format,
            refresh_rate_enabled: self.refresh_rate_enabled,
            floor_settings: self.floor_settings.clone(),
            reward_settings: self.reward_settings.clone(),
        }
    }

    pub fn is_native(&self) -> bool {
        self.category == AdFormatCategory::Native
    }
}

/// A floor tier the builder could not turn into templates.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedTier {
    pub ad_format_category: String,
    pub display_format: String,
    pub reason: String,
}

/// Complete desired set for one source app, keyed by identity.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    pub templates: HashMap<TemplateIdentity, AdUnitTemplate>,
    pub skipped_tiers: Vec<SkippedTier>,
}

/// Fixed defaults for each ad format category.
struct BaseTemplate {
    ad_format: i64,
    refresh_rate_enabled: bool,
    reward_settings: Option<RewardSettings>,
}

fn base_template(category: AdFormatCategory) -> BaseTemplate {
    match category {
        AdFormatCategory::Fullscreen => BaseTemplate {
            ad_format: category.ad_format(),
            refresh_rate_enabled: false,
            reward_settings: None,
        },
        AdFormatCategory::Banner => BaseTemplate {
            ad_format: category.ad_format(),
            refresh_rate_enabled: true,
            reward_settings: None,
        },
        AdFormatCategory::Native => BaseTemplate {
            ad_format: category.ad_format(),
            refresh_rate_enabled: false,
            reward_settings: None,
        },
        AdFormatCategory::Rewarded => BaseTemplate {
            ad_format: category.ad_format(),
            refresh_rate_enabled: false,
            reward_settings: Some(RewardSettings {
                amount: 1,
                item: "Reward".to_string(),
                override_mediation: true,
            }),
        },
    }
}

fn ad_type_for(display_format: &str) -> i64 {
    match display_format {
        "image_and_text" => ad_type::IMAGE_AND_TEXT,
        "video" => ad_type::VIDEO,
        _ => ad_type::ALL,
    }
}

/// Whole cents for a strictly positive floor.
fn floor_cents(value: f64) -> Option<i64> {
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    round_to_cents(value)
        .map(|rounded| (rounded * 100.0).round() as i64)
        .filter(|cents| *cents > 0)
}

#[derive(Debug, Clone)]
pub struct TemplateBuilder {
    namespace: ManagedNamespace,
    currency_code: String,
}

impl TemplateBuilder {
    pub fn new(namespace: ManagedNamespace, currency_code: impl Into<String>) -> Self {
        Self {
            namespace,
            currency_code: currency_code.into(),
        }
    }

    /// Build every template `app` should have on the target.
    pub fn build(&self, app: &SourceApp) -> Result<TemplateSet> {
        let mut set = TemplateSet::default();

        // Tiers sharing a category and display format are merged; floors are kept in cents.
        let mut tiers: BTreeMap<(AdFormatCategory, String), BTreeSet<i64>> = BTreeMap::new();
        for tier in &app.floor_tiers {
            let display_format = normalize_display_format(&tier.display_format);
            let Some(category) = AdFormatCategory::parse(&tier.ad_format_category) else {
                warn!(
                    "[AdSync] App {}: unsupported ad format category '{}' skipped",
                    app.id, tier.ad_format_category
                );
                set.skipped_tiers.push(SkippedTier {
                    ad_format_category: tier.ad_format_category.clone(),
                    display_format,
                    reason: format!(
                        "unsupported ad format category '{}'",
                        tier.ad_format_category
                    ),
                });
                continue;
            };
            if display_format.is_empty() || display_format.contains('/') {
                set.skipped_tiers.push(SkippedTier {
                    ad_format_category: tier.ad_format_category.clone(),
                    display_format: tier.display_format.clone(),
                    reason: format!("invalid display format '{}'", tier.display_format),
                });
                continue;
            }
            let floors = tiers.entry((category, display_format)).or_default();
            floors.extend(tier.floor_values.iter().filter_map(|v| floor_cents(*v)));
        }

        for ((category, display_format), floors) in tiers {
            let floors = std::iter::once(None).chain(floors.into_iter().map(Some));
            for cents in floors {
                let template = self.template(app, category, &display_format, cents);
                let name = template.name.clone();
                if set
                    .templates
                    .insert(template.identity.clone(), template)
                    .is_some()
                {
                    return Err(Error::template(format!(
                        "duplicate template identity for '{}'",
                        name
                    )));
                }
            }
        }

        Ok(set)
    }

    fn template(
        &self,
        app: &SourceApp,
        category: AdFormatCategory,
        display_format: &str,
        floor_cents: Option<i64>,
    ) -> AdUnitTemplate {
        let base = base_template(category);
        let floor = floor_cents.map(|cents| cents as f64 / 100.0);
        let floor_settings = match floor {
            Some(value) => FloorSettings::manual(value, &self.currency_code),
            None => FloorSettings::default(),
        };
        let name = self
            .namespace
            .ad_unit_name(&app.id, category, display_format, floor);

        let mut template = AdUnitTemplate {
            name,
            category,
            display_format: display_format.to_string(),
            floor,
            ad_type: ad_type_for(display_format),
            ad_format: base.ad_format,
            refresh_rate_enabled: base.refresh_rate_enabled,
            floor_settings,
            reward_settings: base.reward_settings,
            identity: TemplateIdentity(String::new()),
        };
        template.identity = TemplateIdentity::of_shape(&template.shape());
        template
    }
}
