//! Declarative field maps for every target-platform entity.
//!
//! Schemas are plain data: a list of `(key, name, translator)` triples. The
//! lookup tables derived from them are built once and shared.

use std::collections::HashMap;
use std::sync::OnceLock;

use super::translator::Translator;

/// Entities spoken over the target platform's compact protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    App,
    StoreListing,
    StoreSearchResult,
    AdUnit,
    FloorSettings,
    ManualFloor,
    Money,
    RewardSettings,
    CatalogSnapshot,
}

impl SchemaKind {
    pub const ALL: [SchemaKind; 9] = [
        SchemaKind::App,
        SchemaKind::StoreListing,
        SchemaKind::StoreSearchResult,
        SchemaKind::AdUnit,
        SchemaKind::FloorSettings,
        SchemaKind::ManualFloor,
        SchemaKind::Money,
        SchemaKind::RewardSettings,
        SchemaKind::CatalogSnapshot,
    ];

    fn fields(self) -> &'static [FieldSpec] {
        match self {
            Self::App => APP_FIELDS,
            Self::StoreListing => STORE_LISTING_FIELDS,
            Self::StoreSearchResult => STORE_SEARCH_RESULT_FIELDS,
            Self::AdUnit => AD_UNIT_FIELDS,
            Self::FloorSettings => FLOOR_SETTINGS_FIELDS,
            Self::ManualFloor => MANUAL_FLOOR_FIELDS,
            Self::Money => MONEY_FIELDS,
            Self::RewardSettings => REWARD_SETTINGS_FIELDS,
            Self::CatalogSnapshot => CATALOG_SNAPSHOT_FIELDS,
        }
    }
}

/// One declared wire field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: u32,
    pub name: &'static str,
    pub translator: Translator,
}

const fn field(key: u32, name: &'static str, translator: Translator) -> FieldSpec {
    FieldSpec {
        key,
        name,
        translator,
    }
}

const APP_FIELDS: &[FieldSpec] = &[
    field(1, "app_id", Translator::Identity),
    field(2, "name", Translator::Identity),
    field(3, "platform", Translator::Identity),
    field(4, "store_id", Translator::Identity),
    field(5, "hidden", Translator::Boolean),
    field(6, "vendor", Translator::Identity),
    field(7, "store_details", Translator::Object(SchemaKind::StoreListing)),
];

const STORE_LISTING_FIELDS: &[FieldSpec] = &[
    field(1, "store_id", Translator::Identity),
    field(2, "name", Translator::Identity),
    field(3, "platform", Translator::Identity),
    field(4, "vendor", Translator::Identity),
    field(5, "developer_name", Translator::Identity),
    field(6, "icon_url", Translator::Identity),
];

const STORE_SEARCH_RESULT_FIELDS: &[FieldSpec] = &[
    field(
        1,
        "listings",
        Translator::Array(&Translator::Object(SchemaKind::StoreListing)),
    ),
    field(2, "total_results", Translator::Identity),
];

const AD_UNIT_FIELDS: &[FieldSpec] = &[
    field(1, "ad_unit_id", Translator::Identity),
    field(2, "app_id", Translator::Identity),
    field(3, "name", Translator::Identity),
    field(4, "archived", Translator::Boolean),
    field(5, "ad_type", Translator::Identity),
    field(6, "ad_format", Translator::Identity),
    field(7, "refresh_rate_enabled", Translator::Boolean),
    field(8, "floor_settings", Translator::Object(SchemaKind::FloorSettings)),
    field(9, "reward_settings", Translator::Object(SchemaKind::RewardSettings)),
    field(10, "bidding", Translator::Bidding),
];

const FLOOR_SETTINGS_FIELDS: &[FieldSpec] = &[
    field(1, "mode", Translator::Identity),
    field(2, "manual_floor", Translator::Object(SchemaKind::ManualFloor)),
];

const MANUAL_FLOOR_FIELDS: &[FieldSpec] = &[
    field(1, "floor", Translator::Object(SchemaKind::Money)),
    field(2, "applies_globally", Translator::Boolean),
];

const MONEY_FIELDS: &[FieldSpec] = &[
    field(1, "ecpm", Translator::CurrencyMicros),
    field(2, "currency_code", Translator::Identity),
];

const REWARD_SETTINGS_FIELDS: &[FieldSpec] = &[
    field(1, "amount", Translator::Identity),
    field(2, "item", Translator::Identity),
    field(3, "override_mediation", Translator::Boolean),
];

const CATALOG_SNAPSHOT_FIELDS: &[FieldSpec] = &[
    field(1, "apps", Translator::Array(&Translator::Object(SchemaKind::App))),
    field(
        2,
        "ad_units",
        Translator::Array(&Translator::Object(SchemaKind::AdUnit)),
    ),
];

/// Lookup tables for one schema, in both directions.
#[derive(Debug)]
pub struct Schema {
    pub kind: SchemaKind,
    by_key: HashMap<String, FieldSpec>,
    by_name: HashMap<&'static str, FieldSpec>,
}

impl Schema {
    fn build(kind: SchemaKind) -> Self {
        let fields = kind.fields();
        Self {
            kind,
            by_key: fields.iter().map(|f| (f.key.to_string(), *f)).collect(),
            by_name: fields.iter().map(|f| (f.name, *f)).collect(),
        }
    }

    pub fn field_by_key(&self, key: &str) -> Option<&FieldSpec> {
        self.by_key.get(key)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldSpec> {
        self.by_name.get(name)
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        self.kind.fields()
    }
}

static SCHEMAS: OnceLock<HashMap<SchemaKind, Schema>> = OnceLock::new();

/// Shared schema instance for `kind`.
pub fn schema(kind: SchemaKind) -> &'static Schema {
    let schemas = SCHEMAS.get_or_init(|| {
        SchemaKind::ALL
            .iter()
            .map(|kind| (*kind, Schema::build(*kind)))
            .collect()
    });
    // Every kind is inserted above.
    &schemas[&kind]
}
