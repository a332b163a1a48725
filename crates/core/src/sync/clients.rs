//! Collaborator interfaces consumed by the engine.
//!
//! Transport, sessions and credential storage live behind these traits. The
//! target platform speaks wire-encoded objects; [`TargetGateway`] layers the
//! translator framework on top so the engine works with typed records.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::errors::{ClientError, Result};
use crate::inventory::{
    AccountRef, AppPatch, CatalogSnapshot, LiveAdUnit, NewAdUnit, NewApp, SourceApp, SourceAppPage,
    StoreListing, StoreSearchResult, TargetAdUnit, TargetApp, TargetPlatform,
};
use crate::wire::{decode_record, encode_record, SchemaKind};

/// Result type for collaborator calls.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// The authoritative catalog declaring desired apps.
#[async_trait]
pub trait SourceClient: Send + Sync {
    async fn fetch_declared_apps(&self, account: &AccountRef, page: u32)
        -> ClientResult<SourceAppPage>;

    async fn report_run_start(&self, run_id: &str, account: &AccountRef) -> ClientResult<()>;

    async fn report_run_end(&self, run_id: &str) -> ClientResult<()>;

    /// Record the live correspondence between a source app and the target.
    async fn report_app_converged(
        &self,
        app: &SourceApp,
        run_id: &str,
        account: &AccountRef,
        target_app: &TargetApp,
        live_ad_units: &[LiveAdUnit],
    ) -> ClientResult<()>;
}

/// The managed ad-serving platform. Payloads are wire-encoded objects.
#[async_trait]
pub trait TargetClient: Send + Sync {
    async fn refresh_auth_token(&self) -> ClientResult<()>;

    /// Wire-encoded `CatalogSnapshot`.
    async fn fetch_catalog_snapshot(&self) -> ClientResult<Value>;

    /// Wire-encoded `StoreSearchResult`.
    async fn search_public_catalog(
        &self,
        store_id: &str,
        platform: TargetPlatform,
    ) -> ClientResult<Value>;

    /// Returns the created app, wire-encoded.
    async fn create_app(&self, spec: Value) -> ClientResult<Value>;

    async fn set_app_visibility(&self, app_id: &str, visible: bool) -> ClientResult<()>;

    /// Returns the updated app, wire-encoded.
    async fn update_app(&self, app_id: &str, patch: Value) -> ClientResult<Value>;

    /// Returns the created ad unit, wire-encoded.
    async fn create_ad_unit(&self, spec: Value) -> ClientResult<Value>;

    async fn delete_ad_units(&self, ad_unit_ids: &[String]) -> ClientResult<()>;
}

/// Client id/secret pair yielded by credential provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Obtains API credentials for a target account, e.g. by scripting its web console.
#[async_trait]
pub trait CredentialProvisioner: Send + Sync {
    async fn provision(&self, account: &AccountRef) -> ClientResult<ClientCredentials>;
}

/// Tells whether an authenticated session exists for a target publisher id.
pub type SessionLookup = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Typed access to a [`TargetClient`].
#[derive(Clone)]
pub struct TargetGateway {
    client: Arc<dyn TargetClient>,
}

impl TargetGateway {
    pub fn new(client: Arc<dyn TargetClient>) -> Self {
        Self { client }
    }

    pub async fn refresh_auth_token(&self) -> Result<()> {
        Ok(self.client.refresh_auth_token().await?)
    }

    pub async fn fetch_snapshot(&self) -> Result<CatalogSnapshot> {
        let wire = self.client.fetch_catalog_snapshot().await?;
        Ok(decode_record(SchemaKind::CatalogSnapshot, &wire)?)
    }

    pub async fn search_store(
        &self,
        store_id: &str,
        platform: TargetPlatform,
    ) -> Result<Vec<StoreListing>> {
        let wire = self.client.search_public_catalog(store_id, platform).await?;
        let result: StoreSearchResult = decode_record(SchemaKind::StoreSearchResult, &wire)?;
        Ok(result.listings)
    }

    pub async fn create_app(&self, app: &NewApp) -> Result<TargetApp> {
        let spec = encode_record(SchemaKind::App, app)?;
        let wire = self.client.create_app(spec).await?;
        Ok(decode_record(SchemaKind::App, &wire)?)
    }

    pub async fn set_app_visibility(&self, app_id: &str, visible: bool) -> Result<()> {
        Ok(self.client.set_app_visibility(app_id, visible).await?)
    }

    pub async fn update_app(&self, app_id: &str, patch: &AppPatch) -> Result<TargetApp> {
        let wire_patch = encode_record(SchemaKind::App, patch)?;
        let wire = self.client.update_app(app_id, wire_patch).await?;
        Ok(decode_record(SchemaKind::App, &wire)?)
    }

    pub async fn create_ad_unit(&self, unit: &NewAdUnit) -> Result<TargetAdUnit> {
        let spec = encode_record(SchemaKind::AdUnit, unit)?;
        let wire = self.client.create_ad_unit(spec).await?;
        Ok(decode_record(SchemaKind::AdUnit, &wire)?)
    }

    pub async fn delete_ad_units(&self, ad_unit_ids: &[String]) -> Result<()> {
        Ok(self.client.delete_ad_units(ad_unit_ids).await?)
    }
}
