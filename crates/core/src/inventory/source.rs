//! Records declared by the authoritative catalog (source system).

use serde::{Deserialize, Serialize};

use super::target::TargetPlatform;

/// Store a source app is published on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourcePlatform {
    Ios,
    Android,
    Amazon,
}

impl SourcePlatform {
    /// Platform the app is hosted as on the target. Amazon builds are Android apps there.
    pub fn target_platform(self) -> TargetPlatform {
        match self {
            Self::Ios => TargetPlatform::Ios,
            Self::Android | Self::Amazon => TargetPlatform::Android,
        }
    }

    /// Amazon-origin apps stay unlinked from any public store listing.
    pub fn is_store_linkable(self) -> bool {
        !matches!(self, Self::Amazon)
    }
}

/// Floors requested for one ad format category and display format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloorTier {
    pub ad_format_category: String,
    pub display_format: String,
    #[serde(default)]
    pub floor_values: Vec<f64>,
}

/// Desired monetization configuration for one app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceApp {
    pub id: String,
    #[serde(default)]
    pub is_deleted: bool,
    pub name: String,
    #[serde(default)]
    pub bundle_id: String,
    pub platform: SourcePlatform,
    /// Target app id recorded by a previous run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_app_id: Option<String>,
    #[serde(default)]
    pub floor_tiers: Vec<FloorTier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: u32,
    pub total_pages: u32,
}

impl PageInfo {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// One page of declared apps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceAppPage {
    #[serde(default)]
    pub apps: Vec<SourceApp>,
    pub page_info: PageInfo,
}

/// The account pair one run reconciles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRef {
    pub source_account_id: String,
    pub target_publisher_id: String,
}

impl AccountRef {
    pub fn new(source_account_id: impl Into<String>, target_publisher_id: impl Into<String>) -> Self {
        Self {
            source_account_id: source_account_id.into(),
            target_publisher_id: target_publisher_id.into(),
        }
    }
}

/// A live target ad unit described in source-facing terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveAdUnit {
    pub ad_unit_id: String,
    pub name: String,
    pub ad_format_category: String,
    pub display_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn source_app_parses_catalog_payload() {
        let app: SourceApp = serde_json::from_value(json!({
            "id": "42",
            "name": "Puzzle",
            "bundleId": "com.example.puzzle",
            "platform": "AMAZON",
            "floorTiers": [
                {"adFormatCategory": "rewarded", "displayFormat": "video", "floorValues": [1.5]}
            ]
        }))
        .unwrap();

        assert!(!app.is_deleted);
        assert_eq!(app.external_app_id, None);
        assert_eq!(app.platform.target_platform(), TargetPlatform::Android);
        assert!(!app.platform.is_store_linkable());
        assert_eq!(app.floor_tiers[0].floor_values, vec![1.5]);
    }

    #[test]
    fn page_info_reports_remaining_pages() {
        assert!(PageInfo { page: 1, total_pages: 2 }.has_next());
        assert!(!PageInfo { page: 2, total_pages: 2 }.has_next());
        assert!(!PageInfo { page: 1, total_pages: 0 }.has_next());
    }
}
