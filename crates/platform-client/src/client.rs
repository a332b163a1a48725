//! Target platform API client.
//!
//! The platform exposes RPC-style `POST` endpoints whose bodies are
//! numeric-keyed wire objects. This client only moves those objects; the
//! translation to typed records happens in `adsync_core::wire`.

use adsync_core::inventory::TargetPlatform;
use adsync_core::sync::{ClientCredentials, ClientResult, TargetClient};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::error::{PlatformError, Result};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub(crate) const MAX_LOG_BODY_CHARS: usize = 512;

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorResponse {
    #[serde(default)]
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

pub(crate) fn log_response(status: reqwest::StatusCode, body: &str) {
    if status.is_success() {
        debug!("[Platform] API response status: {}", status);
        return;
    }

    let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
    if body.chars().count() > MAX_LOG_BODY_CHARS {
        preview.push_str("...");
    }
    debug!("[Platform] API response error ({}): {}", status, preview);
}

pub(crate) fn error_from_body(status: reqwest::StatusCode, body: &str) -> PlatformError {
    if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(body) {
        return PlatformError::api(
            status.as_u16(),
            format!("{}: {}", error.code, error.message),
        );
    }
    PlatformError::api(status.as_u16(), format!("Request failed: {}", body))
}

/// Parse a JSON response body.
pub(crate) async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;
    log_response(status, &body);

    if !status.is_success() {
        return Err(error_from_body(status, &body));
    }

    serde_json::from_str(&body).map_err(|e| {
        log::error!("[Platform] Failed to deserialize response: {}", e);
        PlatformError::api(status.as_u16(), format!("Failed to parse response: {}", e))
    })
}

/// Check the status of a response whose body carries nothing useful.
pub(crate) async fn expect_success(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        debug!("[Platform] API response status: {}", status);
        return Ok(());
    }
    let body = response.text().await?;
    log_response(status, &body);
    Err(error_from_body(status, &body))
}

pub(crate) fn build_http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()?)
}

pub(crate) fn bearer_headers(token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| PlatformError::auth("Invalid access token format"))?;
    headers.insert(AUTHORIZATION, auth_value);
    Ok(headers)
}

/// Client for one publisher account on the target platform.
///
/// Holds the client credentials and the short-lived access token minted from
/// them by [`PlatformClient::refresh_token`].
#[derive(Debug)]
pub struct PlatformClient {
    client: reqwest::Client,
    base_url: String,
    publisher_id: String,
    credentials: ClientCredentials,
    access_token: Mutex<Option<String>>,
}

impl PlatformClient {
    /// Create a client for `publisher_id`.
    ///
    /// * `base_url` - The base URL of the platform API (see [`crate::platform_base_url`])
    pub fn new(base_url: &str, publisher_id: &str, credentials: ClientCredentials) -> Result<Self> {
        if publisher_id.trim().is_empty() {
            return Err(PlatformError::invalid_request("publisher id is empty"));
        }
        Ok(Self {
            client: build_http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            publisher_id: publisher_id.to_string(),
            credentials,
            access_token: Mutex::new(None),
        })
    }

    pub fn publisher_id(&self) -> &str {
        &self.publisher_id
    }

    fn publisher_url(&self, method: &str) -> String {
        format!(
            "{}/v1/publishers/{}/{}",
            self.base_url,
            urlencoding::encode(&self.publisher_id),
            method
        )
    }

    async fn headers(&self) -> Result<HeaderMap> {
        let token = self.access_token.lock().await.clone().ok_or_else(|| {
            PlatformError::auth("No access token. Refresh the token before calling the API.")
        })?;
        bearer_headers(&token)
    }

    /// Mint a fresh access token from the client credentials.
    ///
    /// POST /oauth2/token
    pub async fn refresh_token(&self) -> Result<()> {
        let url = format!("{}/oauth2/token", self.base_url);
        debug!("[Platform] Refreshing access token for publisher {}", self.publisher_id);

        let response = self
            .client
            .post(&url)
            .json(&TokenRequest {
                grant_type: "client_credentials",
                client_id: &self.credentials.client_id,
                client_secret: &self.credentials.client_secret,
            })
            .send()
            .await?;

        let token: TokenResponse = match parse_response(response).await {
            Ok(token) => token,
            Err(err) => {
                *self.access_token.lock().await = None;
                warn!("[Platform] Token refresh failed: {}", err);
                return Err(err);
            }
        };
        if token.access_token.trim().is_empty() {
            return Err(PlatformError::auth("Token endpoint returned an empty token"));
        }
        *self.access_token.lock().await = Some(token.access_token);
        info!(
            "[Platform] Access token refreshed (expires in {}s)",
            token.expires_in.unwrap_or_default()
        );
        Ok(())
    }

    /// Call a publisher-scoped RPC method and return its wire response.
    async fn call(&self, method: &str, body: &Value) -> Result<Value> {
        let url = self.publisher_url(method);
        debug!("[Platform] POST {}", url);

        let response = self
            .client
            .post(&url)
            .headers(self.headers().await?)
            .json(body)
            .send()
            .await?;

        parse_response(response).await
    }

    /// Like [`Self::call`] for methods that answer with no payload.
    async fn call_no_content(&self, method: &str, body: &Value) -> Result<()> {
        let url = self.publisher_url(method);
        debug!("[Platform] POST {}", url);

        let response = self
            .client
            .post(&url)
            .headers(self.headers().await?)
            .json(body)
            .send()
            .await?;

        expect_success(response).await
    }

    /// POST /v1/publishers/{publisherId}/inventory:snapshot
    pub async fn inventory_snapshot(&self) -> Result<Value> {
        self.call("inventory:snapshot", &json!({})).await
    }

    /// POST /v1/publishers/{publisherId}/catalog:search
    pub async fn search_catalog(&self, store_id: &str, platform: TargetPlatform) -> Result<Value> {
        let body = json!({"1": store_id, "2": i64::from(platform)});
        self.call("catalog:search", &body).await
    }

    /// POST /v1/publishers/{publisherId}/apps:create
    pub async fn create_app(&self, spec: &Value) -> Result<Value> {
        self.call("apps:create", spec).await
    }

    /// POST /v1/publishers/{publisherId}/apps/{appId}:update
    pub async fn update_app(&self, app_id: &str, patch: &Value) -> Result<Value> {
        let method = format!("apps/{}:update", urlencoding::encode(app_id));
        self.call(&method, patch).await
    }

    /// POST /v1/publishers/{publisherId}/apps/{appId}:setVisibility
    pub async fn set_app_visibility(&self, app_id: &str, visible: bool) -> Result<()> {
        let method = format!("apps/{}:setVisibility", urlencoding::encode(app_id));
        // Field 1 is the hidden flag.
        let body = json!({"1": if visible { 0 } else { 1 }});
        self.call_no_content(&method, &body).await
    }

    /// POST /v1/publishers/{publisherId}/adUnits:create
    pub async fn create_ad_unit(&self, spec: &Value) -> Result<Value> {
        self.call("adUnits:create", spec).await
    }

    /// POST /v1/publishers/{publisherId}/adUnits:bulkDelete
    pub async fn bulk_delete_ad_units(&self, ad_unit_ids: &[String]) -> Result<()> {
        if ad_unit_ids.is_empty() {
            return Ok(());
        }
        self.call_no_content("adUnits:bulkDelete", &json!({"1": ad_unit_ids}))
            .await
    }
}

#[async_trait]
impl TargetClient for PlatformClient {
    async fn refresh_auth_token(&self) -> ClientResult<()> {
        Ok(self.refresh_token().await?)
    }

    async fn fetch_catalog_snapshot(&self) -> ClientResult<Value> {
        Ok(self.inventory_snapshot().await?)
    }

    async fn search_public_catalog(
        &self,
        store_id: &str,
        platform: TargetPlatform,
    ) -> ClientResult<Value> {
        Ok(self.search_catalog(store_id, platform).await?)
    }

    async fn create_app(&self, spec: Value) -> ClientResult<Value> {
        Ok(PlatformClient::create_app(self, &spec).await?)
    }

    async fn set_app_visibility(&self, app_id: &str, visible: bool) -> ClientResult<()> {
        Ok(PlatformClient::set_app_visibility(self, app_id, visible).await?)
    }

    async fn update_app(&self, app_id: &str, patch: Value) -> ClientResult<Value> {
        Ok(PlatformClient::update_app(self, app_id, &patch).await?)
    }

    async fn create_ad_unit(&self, spec: Value) -> ClientResult<Value> {
        Ok(PlatformClient::create_ad_unit(self, &spec).await?)
    }

    async fn delete_ad_units(&self, ad_unit_ids: &[String]) -> ClientResult<()> {
        Ok(self.bulk_delete_ad_units(ad_unit_ids).await?)
    }
}
