//! Typed views of target-platform records.
//!
//! These are deserialized from translator output, so field names follow the
//! schema names in [`crate::wire`]. Every record keeps an `extra` map holding
//! keys no schema declares, which is written back unchanged on encode.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire codes for ad formats.
pub mod ad_format {
    pub const BANNER: i64 = 0;
    pub const INTERSTITIAL: i64 = 1;
    pub const NATIVE: i64 = 4;
    pub const REWARDED: i64 = 5;
}

/// Wire codes for ad types (media accepted by a unit).
pub mod ad_type {
    pub const ALL: i64 = 0;
    pub const IMAGE_AND_TEXT: i64 = 1;
    pub const VIDEO: i64 = 2;
}

/// Wire codes for floor modes.
pub mod floor_mode {
    pub const DISABLED: i64 = 0;
    pub const MANUAL: i64 = 2;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum TargetPlatform {
    Ios,
    Android,
}

impl TryFrom<i64> for TargetPlatform {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Ios),
            2 => Ok(Self::Android),
            other => Err(format!("unknown platform code {}", other)),
        }
    }
}

impl From<TargetPlatform> for i64 {
    fn from(platform: TargetPlatform) -> Self {
        match platform {
            TargetPlatform::Ios => 1,
            TargetPlatform::Android => 2,
        }
    }
}

/// The four ad format families the engine manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdFormatCategory {
    /// Interstitial-style units.
    Fullscreen,
    Banner,
    Native,
    Rewarded,
}

impl AdFormatCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fullscreen => "fullscreen",
            Self::Banner => "banner",
            Self::Native => "native",
            Self::Rewarded => "rewarded",
        }
    }

    /// Parse the category names used by the catalog, including legacy aliases.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fullscreen" | "full_screen" | "interstitial" => Some(Self::Fullscreen),
            "banner" | "non_fullscreen" | "non_full_screen" => Some(Self::Banner),
            "native" => Some(Self::Native),
            "rewarded" | "rewarded_video" => Some(Self::Rewarded),
            _ => None,
        }
    }

    pub fn ad_format(self) -> i64 {
        match self {
            Self::Fullscreen => ad_format::INTERSTITIAL,
            Self::Banner => ad_format::BANNER,
            Self::Native => ad_format::NATIVE,
            Self::Rewarded => ad_format::REWARDED,
        }
    }

    pub fn from_ad_format(code: i64) -> Option<Self> {
        match code {
            ad_format::INTERSTITIAL => Some(Self::Fullscreen),
            ad_format::BANNER => Some(Self::Banner),
            ad_format::NATIVE => Some(Self::Native),
            ad_format::REWARDED => Some(Self::Rewarded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreListing {
    pub store_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<TargetPlatform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSearchResult {
    #[serde(default)]
    pub listings: Vec<StoreListing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_results: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One monetized application on the target platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetApp {
    pub app_id: String,
    pub name: String,
    pub platform: TargetPlatform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_details: Option<StoreListing>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload for creating an app.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewApp {
    pub name: String,
    pub platform: TargetPlatform,
}

/// Partial update for an app; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_details: Option<StoreListing>,
}

impl AppPatch {
    /// Link an app to a public store listing.
    pub fn store_link(listing: &StoreListing) -> Self {
        Self {
            store_id: Some(listing.store_id.clone()),
            vendor: listing.vendor.clone(),
            store_details: Some(listing.clone()),
        }
    }

    pub fn apply_to(&self, app: &mut TargetApp) {
        if let Some(store_id) = &self.store_id {
            app.store_id = Some(store_id.clone());
        }
        if let Some(vendor) = &self.vendor {
            app.vendor = Some(vendor.clone());
        }
        if let Some(details) = &self.store_details {
            app.store_details = Some(details.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub ecpm: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualFloor {
    pub floor: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applies_globally: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorSettings {
    pub mode: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_floor: Option<ManualFloor>,
}

impl Default for FloorSettings {
    fn default() -> Self {
        Self {
            mode: floor_mode::DISABLED,
            manual_floor: None,
        }
    }
}

impl FloorSettings {
    pub fn manual(ecpm: f64, currency_code: &str) -> Self {
        Self {
            mode: floor_mode::MANUAL,
            manual_floor: Some(ManualFloor {
                floor: Money {
                    ecpm,
                    currency_code: Some(currency_code.to_string()),
                },
                applies_globally: Some(true),
            }),
        }
    }

    /// Floor value when the manual mode is active.
    pub fn manual_ecpm(&self) -> Option<f64> {
        if self.mode != floor_mode::MANUAL {
            return None;
        }
        self.manual_floor.as_ref().map(|m| m.floor.ecpm)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardSettings {
    pub amount: i64,
    pub item: String,
    #[serde(default)]
    pub override_mediation: bool,
}

/// One monetization slot on the target platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetAdUnit {
    pub ad_unit_id: String,
    pub app_id: String,
    pub name: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub ad_type: i64,
    pub ad_format: i64,
    #[serde(default)]
    pub refresh_rate_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor_settings: Option<FloorSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_settings: Option<RewardSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bidding: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TargetAdUnit {
    pub fn category(&self) -> Option<AdFormatCategory> {
        AdFormatCategory::from_ad_format(self.ad_format)
    }
}

/// Payload for creating an ad unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAdUnit {
    pub app_id: String,
    pub name: String,
    pub ad_type: i64,
    pub ad_format: i64,
    pub refresh_rate_enabled: bool,
    pub floor_settings: FloorSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_settings: Option<RewardSettings>,
}

/// Full app and ad unit listing of the target account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub apps: Vec<TargetApp>,
    #[serde(default)]
    pub ad_units: Vec<TargetAdUnit>,
}
