//! Per-app reconciliation: locate, retire or converge one source app.

use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::Arc;

use crate::errors::{ClientError, Error, Result};
use crate::inventory::{
    AccountRef, AppPatch, LiveAdUnit, ManagedNamespace, NewApp, SourceApp, TargetAdUnit,
    TargetApp,
};

use super::clients::{SourceClient, TargetGateway};
use super::context::SyncContext;
use super::templates::{AdUnitTemplate, TemplateBuilder, TemplateIdentity};

/// Terminal state of one app's reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppOutcome {
    Synced,
    SyncedWithErrors,
    SkippedDeleted,
}

/// What happened to one source app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSyncReport {
    pub source_app_id: String,
    pub target_app_id: Option<String>,
    pub outcome: AppOutcome,
    pub app_created: bool,
    /// Visibility, store link or hide changes on the app itself.
    pub app_updated: bool,
    pub ad_units_created: usize,
    pub ad_units_deleted: usize,
    pub skipped_native: Vec<String>,
    /// Non-fatal problems, one entry per occurrence.
    pub errors: Vec<String>,
}

impl AppSyncReport {
    pub fn new(source_app_id: &str) -> Self {
        Self {
            source_app_id: source_app_id.to_string(),
            target_app_id: None,
            outcome: AppOutcome::Synced,
            app_created: false,
            app_updated: false,
            ad_units_created: 0,
            ad_units_deleted: 0,
            skipped_native: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn changed(&self) -> bool {
        self.app_created
            || self.app_updated
            || self.ad_units_created > 0
            || self.ad_units_deleted > 0
    }

    /// Settle the outcome from the recorded errors.
    pub fn finish(mut self) -> Self {
        if self.outcome == AppOutcome::Synced && !self.errors.is_empty() {
            self.outcome = AppOutcome::SyncedWithErrors;
        }
        self
    }
}

fn is_permission_denied(err: &Error) -> bool {
    err.client_error()
        .map(ClientError::is_permission_denied)
        .unwrap_or(false)
}

/// Applies the reconciliation for each app of one run.
///
/// Holds the run-scoped latch that disables native ad unit creation once the
/// platform has refused it.
pub struct Reconciler {
    target: TargetGateway,
    source: Arc<dyn SourceClient>,
    namespace: ManagedNamespace,
    builder: TemplateBuilder,
    account: AccountRef,
    run_id: String,
    skip_native_creation: bool,
}

impl Reconciler {
    pub fn new(
        target: TargetGateway,
        source: Arc<dyn SourceClient>,
        namespace: ManagedNamespace,
        currency_code: &str,
        account: AccountRef,
        run_id: impl Into<String>,
    ) -> Self {
        Self {
            target,
            source,
            builder: TemplateBuilder::new(namespace.clone(), currency_code),
            namespace,
            account,
            run_id: run_id.into(),
            skip_native_creation: false,
        }
    }

    pub fn native_creation_skipped(&self) -> bool {
        self.skip_native_creation
    }

    /// Reconcile one source app against the target, mirroring every change into `ctx`.
    pub async fn reconcile_app(
        &mut self,
        ctx: &mut SyncContext,
        app: &SourceApp,
    ) -> Result<AppSyncReport> {
        let mut report = AppSyncReport::new(&app.id);
        let located = self.locate_target_app(ctx, app);

        if app.is_deleted {
            report.outcome = AppOutcome::SkippedDeleted;
            match located {
                Some(target_app) => {
                    report.target_app_id = Some(target_app.app_id.clone());
                    self.retire_app(ctx, app, &target_app, &mut report).await?;
                }
                None => {
                    debug!(
                        "[AdSync] App {}: deleted at source and absent on target, nothing to do",
                        app.id
                    );
                }
            }
            return Ok(report);
        }

        let mut target_app = match located {
            Some(target_app) => target_app,
            None => {
                let created = self.create_target_app(ctx, app).await?;
                report.app_created = true;
                created
            }
        };
        report.target_app_id = Some(target_app.app_id.clone());

        if target_app.hidden {
            info!(
                "[AdSync] App {}: showing hidden target app {}",
                app.id, target_app.app_id
            );
            self.target
                .set_app_visibility(&target_app.app_id, true)
                .await?;
            ctx.set_app_hidden(&target_app.app_id, false);
            target_app.hidden = false;
            report.app_updated = true;
        }

        if target_app.store_id.is_none() && app.platform.is_store_linkable() {
            match self.link_store(ctx, app, &target_app).await {
                Ok(Some(linked)) => {
                    target_app = linked;
                    report.app_updated = true;
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        "[AdSync] App {}: store link failed, keeping current identity: {}",
                        app.id, err
                    );
                    report.errors.push(format!("store link failed: {}", err));
                }
            }
        }

        let live = self
            .converge_ad_units(ctx, app, &target_app, &mut report)
            .await?;

        self.source
            .report_app_converged(app, &self.run_id, &self.account, &target_app, &live)
            .await?;

        Ok(report.finish())
    }

    /// Find the target app for `app`: store id, then recorded cross-reference, then managed name.
    ///
    /// Sources that are never store-linked skip the store id match, since a
    /// linked target app always belongs to some other source app.
    fn locate_target_app(&self, ctx: &SyncContext, app: &SourceApp) -> Option<TargetApp> {
        if app.platform.is_store_linkable() {
            let platform = app.platform.target_platform();
            if let Some(found) = ctx.find_app_by_store(&app.bundle_id, platform) {
                debug!(
                    "[AdSync] App {}: matched target app {} by store id",
                    app.id, found.app_id
                );
                return Some(found.clone());
            }
        }

        if let Some(external_id) = app.external_app_id.as_deref() {
            match ctx.app(external_id) {
                Some(found) => {
                    debug!(
                        "[AdSync] App {}: matched target app {} by recorded id",
                        app.id, found.app_id
                    );
                    return Some(found.clone());
                }
                None => warn!(
                    "[AdSync] App {}: recorded target app {} no longer exists",
                    app.id, external_id
                ),
            }
        }

        ctx.find_app_by_managed_name(&self.namespace, &app.id)
            .inspect(|found| {
                debug!(
                    "[AdSync] App {}: matched target app {} by managed name",
                    app.id, found.app_id
                )
            })
            .cloned()
    }

    async fn create_target_app(&self, ctx: &mut SyncContext, app: &SourceApp) -> Result<TargetApp> {
        let spec = NewApp {
            name: self.namespace.app_name(app),
            platform: app.platform.target_platform(),
        };
        let created = self.target.create_app(&spec).await?;
        info!(
            "[AdSync] App {}: created target app {} ({})",
            app.id, created.app_id, created.name
        );
        ctx.upsert_app(created.clone());
        Ok(created)
    }

    /// Delete every managed unit of a source app removed upstream, then hide the app.
    async fn retire_app(
        &self,
        ctx: &mut SyncContext,
        app: &SourceApp,
        target_app: &TargetApp,
        report: &mut AppSyncReport,
    ) -> Result<()> {
        let managed = ctx.managed_ad_units(&target_app.app_id, &self.namespace, &app.id);
        if !managed.is_empty() {
            let ids: Vec<String> = managed.iter().map(|u| u.ad_unit_id.clone()).collect();
            info!(
                "[AdSync] App {}: deleted at source, removing {} managed ad units",
                app.id,
                ids.len()
            );
            self.target.delete_ad_units(&ids).await?;
            ctx.remove_ad_units(&ids);
            report.ad_units_deleted = ids.len();
        }

        let remaining = ctx
            .managed_ad_units(&target_app.app_id, &self.namespace, &app.id)
            .len();
        let hidden = ctx
            .app(&target_app.app_id)
            .map(|a| a.hidden)
            .unwrap_or(target_app.hidden);
        if remaining == 0 && !hidden {
            info!(
                "[AdSync] App {}: hiding target app {}",
                app.id, target_app.app_id
            );
            self.target
                .set_app_visibility(&target_app.app_id, false)
                .await?;
            ctx.set_app_hidden(&target_app.app_id, true);
            report.app_updated = true;
        }
        Ok(())
    }

    async fn link_store(
        &self,
        ctx: &mut SyncContext,
        app: &SourceApp,
        target_app: &TargetApp,
    ) -> Result<Option<TargetApp>> {
        if app.bundle_id.is_empty() {
            return Ok(None);
        }
        let platform = app.platform.target_platform();
        let listings = self.target.search_store(&app.bundle_id, platform).await?;
        let Some(listing) = listings.iter().find(|listing| {
            listing.store_id == app.bundle_id
                && listing.platform.map_or(true, |p| p == platform)
        }) else {
            debug!(
                "[AdSync] App {}: no public store listing for {}",
                app.id, app.bundle_id
            );
            return Ok(None);
        };

        let patch = AppPatch::store_link(listing);
        let mut updated = self.target.update_app(&target_app.app_id, &patch).await?;
        // Fill in anything the platform echoed back without.
        patch.apply_to(&mut updated);
        info!(
            "[AdSync] App {}: linked target app {} to store id {}",
            app.id, updated.app_id, listing.store_id
        );
        ctx.upsert_app(updated.clone());
        Ok(Some(updated))
    }

    /// Diff managed ad units against the desired templates and apply the difference.
    ///
    /// Returns the live managed units (kept and created) in source-facing form.
    async fn converge_ad_units(
        &mut self,
        ctx: &mut SyncContext,
        app: &SourceApp,
        target_app: &TargetApp,
        report: &mut AppSyncReport,
    ) -> Result<Vec<LiveAdUnit>> {
        let template_set = self.builder.build(app)?;
        for skipped in &template_set.skipped_tiers {
            report.errors.push(format!(
                "skipped floor tier {}/{}: {}",
                skipped.ad_format_category, skipped.display_format, skipped.reason
            ));
        }
        let mut desired = template_set.templates;

        let existing = ctx.managed_ad_units(&target_app.app_id, &self.namespace, &app.id);
        let mut current: Vec<TargetAdUnit> = Vec::with_capacity(existing.len());
        let mut stale: Vec<TargetAdUnit> = Vec::new();
        for unit in existing {
            if desired.remove(&TemplateIdentity::of_unit(&unit)).is_some() {
                current.push(unit);
            } else {
                stale.push(unit);
            }
        }

        if !stale.is_empty() {
            let ids: Vec<String> = stale.iter().map(|u| u.ad_unit_id.clone()).collect();
            info!(
                "[AdSync] App {}: deleting {} obsolete ad units",
                app.id,
                ids.len()
            );
            match self.target.delete_ad_units(&ids).await {
                Ok(()) => {
                    ctx.remove_ad_units(&ids);
                    report.ad_units_deleted += ids.len();
                }
                Err(err) => {
                    error!("[AdSync] App {}: bulk delete failed: {}", app.id, err);
                    report
                        .errors
                        .push(format!("failed to delete {} ad units: {}", ids.len(), err));
                }
            }
        }

        let mut missing: Vec<AdUnitTemplate> = desired.into_values().collect();
        missing.sort_by(|a, b| a.name.cmp(&b.name));
        for template in missing {
            if let Some(unit) = self
                .create_ad_unit(ctx, app, target_app, &template, report)
                .await
            {
                current.push(unit);
            }
        }

        Ok(current
            .iter()
            .filter_map(|unit| self.live_ad_unit(unit))
            .collect())
    }

    async fn create_ad_unit(
        &mut self,
        ctx: &mut SyncContext,
        app: &SourceApp,
        target_app: &TargetApp,
        template: &AdUnitTemplate,
        report: &mut AppSyncReport,
    ) -> Option<TargetAdUnit> {
        if template.is_native() && self.skip_native_creation {
            warn!(
                "[AdSync] App {}: native ad unit creation disabled for this run, skipping {}",
                app.id, template.name
            );
            report.skipped_native.push(template.name.clone());
            report.errors.push(format!(
                "skipped native ad unit {}: creation not permitted",
                template.name
            ));
            return None;
        }

        match self
            .target
            .create_ad_unit(&template.to_new_ad_unit(&target_app.app_id))
            .await
        {
            Ok(unit) => {
                info!(
                    "[AdSync] App {}: created ad unit {} ({})",
                    app.id, unit.ad_unit_id, unit.name
                );
                ctx.add_ad_unit(unit.clone());
                report.ad_units_created += 1;
                Some(unit)
            }
            Err(err) => {
                if template.is_native() && is_permission_denied(&err) {
                    warn!(
                        "[AdSync] App {}: native ad units not permitted, disabling native creation for this run",
                        app.id
                    );
                    self.skip_native_creation = true;
                    report.skipped_native.push(template.name.clone());
                } else {
                    error!(
                        "[AdSync] App {}: failed to create ad unit {}: {}",
                        app.id, template.name, err
                    );
                }
                report
                    .errors
                    .push(format!("failed to create ad unit {}: {}", template.name, err));
                None
            }
        }
    }

    fn live_ad_unit(&self, unit: &TargetAdUnit) -> Option<LiveAdUnit> {
        let parsed = self.namespace.parse_ad_unit_name(&unit.name)?;
        Some(LiveAdUnit {
            ad_unit_id: unit.ad_unit_id.clone(),
            name: unit.name.clone(),
            ad_format_category: parsed.category.as_str().to_string(),
            display_format: parsed.display_format,
            floor: parsed.floor,
        })
    }
}
