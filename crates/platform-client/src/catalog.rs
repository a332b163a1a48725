//! Catalog REST client: the source of declared apps and the run history sink.

use adsync_core::inventory::{AccountRef, LiveAdUnit, SourceApp, SourceAppPage, TargetApp};
use adsync_core::sync::{ClientResult, SourceClient};
use async_trait::async_trait;
use log::debug;
use serde::Serialize;
use serde_json::Value;

use crate::client::{bearer_headers, build_http_client, expect_success, parse_response};
use crate::error::{PlatformError, Result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunStartRequest<'a> {
    run_id: &'a str,
    source_account_id: &'a str,
    target_publisher_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AppConvergedRequest<'a> {
    source_account_id: &'a str,
    target_publisher_id: &'a str,
    target_app_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    store_id: Option<&'a str>,
    ad_units: &'a [LiveAdUnit],
}

/// Client for the catalog API, authenticated with a static API token.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl CatalogClient {
    /// * `base_url` - The base URL of the catalog API (see [`crate::catalog_base_url`])
    pub fn new(base_url: &str, api_token: &str) -> Result<Self> {
        if api_token.trim().is_empty() {
            return Err(PlatformError::auth("Catalog API token is empty"));
        }
        Ok(Self {
            client: build_http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
        })
    }

    /// GET /api/v1/accounts/{sourceAccountId}/apps?page={page}
    pub async fn list_apps(&self, source_account_id: &str, page: u32) -> Result<SourceAppPage> {
        let url = format!(
            "{}/api/v1/accounts/{}/apps?page={}",
            self.base_url,
            urlencoding::encode(source_account_id),
            page
        );
        debug!("[Platform] GET {}", url);

        let response = self
            .client
            .get(&url)
            .headers(bearer_headers(&self.api_token)?)
            .send()
            .await?;

        parse_response(response).await
    }

    /// POST /api/v1/sync-runs
    pub async fn start_run(&self, run_id: &str, account: &AccountRef) -> Result<()> {
        let url = format!("{}/api/v1/sync-runs", self.base_url);
        let body = RunStartRequest {
            run_id,
            source_account_id: &account.source_account_id,
            target_publisher_id: &account.target_publisher_id,
        };
        self.post(&url, &serde_json::to_value(&body)?).await
    }

    /// POST /api/v1/sync-runs/{runId}/end
    pub async fn end_run(&self, run_id: &str) -> Result<()> {
        let url = format!(
            "{}/api/v1/sync-runs/{}/end",
            self.base_url,
            urlencoding::encode(run_id)
        );
        self.post(&url, &Value::Object(Default::default())).await
    }

    /// PUT /api/v1/sync-runs/{runId}/apps/{sourceAppId}
    pub async fn record_app(
        &self,
        app: &SourceApp,
        run_id: &str,
        account: &AccountRef,
        target_app: &TargetApp,
        live_ad_units: &[LiveAdUnit],
    ) -> Result<()> {
        let url = format!(
            "{}/api/v1/sync-runs/{}/apps/{}",
            self.base_url,
            urlencoding::encode(run_id),
            urlencoding::encode(&app.id)
        );
        debug!("[Platform] PUT {}", url);
        let body = AppConvergedRequest {
            source_account_id: &account.source_account_id,
            target_publisher_id: &account.target_publisher_id,
            target_app_id: &target_app.app_id,
            store_id: target_app.store_id.as_deref(),
            ad_units: live_ad_units,
        };

        let response = self
            .client
            .put(&url)
            .headers(bearer_headers(&self.api_token)?)
            .json(&body)
            .send()
            .await?;

        expect_success(response).await
    }

    async fn post(&self, url: &str, body: &Value) -> Result<()> {
        debug!("[Platform] POST {}", url);
        let response = self
            .client
            .post(url)
            .headers(bearer_headers(&self.api_token)?)
            .json(body)
            .send()
            .await?;

        expect_success(response).await
    }
}

#[async_trait]
impl SourceClient for CatalogClient {
    async fn fetch_declared_apps(
        &self,
        account: &AccountRef,
        page: u32,
    ) -> ClientResult<SourceAppPage> {
        Ok(self.list_apps(&account.source_account_id, page).await?)
    }

    async fn report_run_start(&self, run_id: &str, account: &AccountRef) -> ClientResult<()> {
        Ok(self.start_run(run_id, account).await?)
    }

    async fn report_run_end(&self, run_id: &str) -> ClientResult<()> {
        Ok(self.end_run(run_id).await?)
    }

    async fn report_app_converged(
        &self,
        app: &SourceApp,
        run_id: &str,
        account: &AccountRef,
        target_app: &TargetApp,
        live_ad_units: &[LiveAdUnit],
    ) -> ClientResult<()> {
        Ok(self
            .record_app(app, run_id, account, target_app, live_ad_units)
            .await?)
    }
}
