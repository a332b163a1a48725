//! In-memory state of both systems for the duration of one run.
//!
//! Filled by the fetch phase and updated after every successful remote
//! mutation, so later steps never need to re-fetch.

use std::collections::HashSet;

use crate::inventory::{
    CatalogSnapshot, ManagedNamespace, SourceApp, TargetAdUnit, TargetApp, TargetPlatform,
};

#[derive(Debug, Clone, Default)]
pub struct SyncContext {
    target_apps: Vec<TargetApp>,
    target_ad_units: Vec<TargetAdUnit>,
    source_apps: Vec<SourceApp>,
}

impl SyncContext {
    pub fn new(snapshot: CatalogSnapshot, source_apps: Vec<SourceApp>) -> Self {
        Self {
            target_apps: snapshot.apps,
            target_ad_units: snapshot.ad_units,
            source_apps,
        }
    }

    pub fn target_apps(&self) -> &[TargetApp] {
        &self.target_apps
    }

    pub fn target_ad_units(&self) -> &[TargetAdUnit] {
        &self.target_ad_units
    }

    pub fn source_apps(&self) -> &[SourceApp] {
        &self.source_apps
    }

    /// Apps currently visible on the target.
    pub fn active_apps(&self) -> impl Iterator<Item = &TargetApp> {
        self.target_apps.iter().filter(|app| !app.hidden)
    }

    /// Hidden apps that still lack a store link.
    pub fn hidden_store_linkable_apps(&self) -> impl Iterator<Item = &TargetApp> {
        self.target_apps
            .iter()
            .filter(|app| app.hidden && app.store_id.is_none())
    }

    pub fn app(&self, app_id: &str) -> Option<&TargetApp> {
        self.target_apps.iter().find(|app| app.app_id == app_id)
    }

    /// Visible apps are preferred over hidden ones when both carry the store id.
    pub fn find_app_by_store(&self, store_id: &str, platform: TargetPlatform) -> Option<&TargetApp> {
        if store_id.is_empty() {
            return None;
        }
        let matches = |app: &&TargetApp| {
            app.platform == platform && app.store_id.as_deref() == Some(store_id)
        };
        self.active_apps()
            .find(matches)
            .or_else(|| self.target_apps.iter().find(matches))
    }

    pub fn find_app_by_managed_name(
        &self,
        namespace: &ManagedNamespace,
        source_app_id: &str,
    ) -> Option<&TargetApp> {
        self.active_apps()
            .find(|app| namespace.owns(&app.name, source_app_id))
            .or_else(|| {
                self.target_apps
                    .iter()
                    .find(|app| namespace.owns(&app.name, source_app_id))
            })
    }

    /// Non-archived ad units of an app.
    pub fn active_ad_units<'a>(&'a self, app_id: &'a str) -> impl Iterator<Item = &'a TargetAdUnit> {
        self.target_ad_units
            .iter()
            .filter(move |unit| unit.app_id == app_id && !unit.archived)
    }

    /// Non-archived ad units of an app owned by `source_app_id`.
    pub fn managed_ad_units(
        &self,
        app_id: &str,
        namespace: &ManagedNamespace,
        source_app_id: &str,
    ) -> Vec<TargetAdUnit> {
        self.active_ad_units(app_id)
            .filter(|unit| namespace.owns_ad_unit(&unit.name, source_app_id))
            .cloned()
            .collect()
    }

    /// Insert or replace an app by id.
    pub fn upsert_app(&mut self, app: TargetApp) {
        match self
            .target_apps
            .iter_mut()
            .find(|existing| existing.app_id == app.app_id)
        {
            Some(existing) => *existing = app,
            None => self.target_apps.push(app),
        }
    }

    pub fn set_app_hidden(&mut self, app_id: &str, hidden: bool) {
        if let Some(app) = self.target_apps.iter_mut().find(|app| app.app_id == app_id) {
            app.hidden = hidden;
        }
    }

    pub fn add_ad_unit(&mut self, unit: TargetAdUnit) {
        self.target_ad_units.push(unit);
    }

    pub fn remove_ad_units(&mut self, ad_unit_ids: &[String]) {
        let ids: HashSet<&str> = ad_unit_ids.iter().map(String::as_str).collect();
        self.target_ad_units
            .retain(|unit| !ids.contains(unit.ad_unit_id.as_str()));
    }
}
