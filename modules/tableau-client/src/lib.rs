//! Client for the Tableau REST API: personal-access-token sign-in with a
//! per-site token cache, workbook/view lookup, and bounded-parallel view
//! data fetch with partial-failure semantics.

pub mod auth;
pub mod error;
pub mod types;

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;

pub use auth::AuthEntry;
pub use error::{Result, TableauError};
pub use types::ViewFetchSpec;

use auth::{resolve_credentials, TokenCache};
use types::{
    PatCredentials, SignInRequest, SignInResponse, SiteRef, ViewsResponse, WorkbooksResponse,
};

const API_VERSION: &str = "3.21";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE: Duration = Duration::from_millis(500);

pub struct TableauClient {
    http: reqwest::Client,
    base_url: String,
    pat_name: String,
    pat_secret: String,
    cache: TokenCache,
}

impl TableauClient {
    /// Build a client. `strict_tls` disables certificate validation when
    /// false (non-production environments with self-signed servers).
    pub fn new(base_url: &str, pat_name: &str, pat_secret: &str, strict_tls: bool) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(!strict_tls)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            pat_name: pat_name.to_string(),
            pat_secret: pat_secret.to_string(),
            cache: TokenCache::default(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}/{}", self.base_url, API_VERSION, path)
    }

    /// Sign in to a site with its personal-access-token pair and cache the
    /// result.
    pub async fn authenticate(&self, site: &str) -> Result<AuthEntry> {
        let slot = self.cache.slot(site).await;
        let mut guard = slot.lock().await;
        let entry = self.sign_in(site).await?;
        *guard = Some(entry.clone());
        Ok(entry)
    }

    /// Return a cached token while it is more than the refresh threshold from
    /// expiry; otherwise refresh. Concurrent callers for one site are
    /// serialized on the site slot so exactly one sign-in request goes out.
    pub async fn valid_token(&self, site: &str) -> Result<AuthEntry> {
        let slot = self.cache.slot(site).await;
        let mut guard = slot.lock().await;

        if let Some(entry) = guard.as_ref() {
            if entry.is_fresh(Utc::now()) {
                return Ok(entry.clone());
            }
        }

        tracing::debug!(site, "Auth token missing or near expiry, signing in");
        let entry = self.sign_in(site).await?;
        *guard = Some(entry.clone());
        Ok(entry)
    }

    async fn sign_in(&self, site: &str) -> Result<AuthEntry> {
        let (name, secret) = resolve_credentials(site, &self.pat_name, &self.pat_secret);
        let payload = SignInRequest {
            credentials: PatCredentials {
                personal_access_token_name: name,
                personal_access_token_secret: secret,
                site: SiteRef {
                    content_url: site.to_string(),
                },
            },
        };

        let url = self.api_url("auth/signin");
        let resp = self
            .send_with_retry(|| self.http.post(&url).json(&payload))
            .await
            .map_err(|e| TableauError::AuthFailed {
                site: site.to_string(),
                message: e.to_string(),
            })?;

        let body: SignInResponse = resp.json().await.map_err(|e| TableauError::AuthFailed {
            site: site.to_string(),
            message: format!("malformed sign-in response: {e}"),
        })?;

        tracing::info!(site, site_id = %body.credentials.site.id, "Signed in to Tableau site");
        Ok(AuthEntry::new(
            body.credentials.token,
            body.credentials.site.id,
            Utc::now(),
        ))
    }

    /// Look up a workbook id by its content URL.
    async fn find_workbook(&self, entry: &AuthEntry, workbook_name: &str) -> Result<String> {
        let url = self.api_url(&format!("sites/{}/workbooks", entry.site_id));
        let filter = format!("contentUrl:eq:{workbook_name}");
        let resp = self
            .send_with_retry(|| {
                self.http
                    .get(&url)
                    .header("X-Tableau-Auth", &entry.token)
                    .query(&[("filter", filter.as_str())])
            })
            .await?;

        let body: WorkbooksResponse = resp.json().await?;
        body.workbooks
            .workbook
            .into_iter()
            .next()
            .map(|w| w.id)
            .ok_or_else(|| TableauError::WorkbookNotFound(workbook_name.to_string()))
    }

    /// List the views of a workbook as name → id.
    async fn list_views(
        &self,
        entry: &AuthEntry,
        workbook_id: &str,
    ) -> Result<HashMap<String, String>> {
        let url = self.api_url(&format!(
            "sites/{}/workbooks/{}/views",
            entry.site_id, workbook_id
        ));
        let resp = self
            .send_with_retry(|| self.http.get(&url).header("X-Tableau-Auth", &entry.token))
            .await
            .map_err(|e| TableauError::ViewListingFailed(e.to_string()))?;

        let body: ViewsResponse = resp
            .json()
            .await
            .map_err(|e| TableauError::ViewListingFailed(e.to_string()))?;

        Ok(body
            .views
            .view
            .into_iter()
            .map(|v| (v.name, v.id))
            .collect())
    }

    async fn fetch_view_data(
        &self,
        entry: &AuthEntry,
        view_id: &str,
        filter_params: &[(String, String)],
    ) -> Result<String> {
        let url = self.api_url(&format!("sites/{}/views/{}/data", entry.site_id, view_id));
        let mut query: Vec<(String, String)> = vec![("maxAge".to_string(), "1".to_string())];
        for (param, value) in filter_params {
            query.push((format!("vf_{param}"), value.clone()));
        }

        let resp = self
            .send_with_retry(|| {
                self.http
                    .get(&url)
                    .header("X-Tableau-Auth", &entry.token)
                    .query(&query)
            })
            .await?;

        Ok(resp.text().await?)
    }

    /// Fetch the CSV payloads of the given views, at most `concurrency`
    /// in flight at a time (sequential batches). Per-view failures are
    /// logged and skipped; the result map's keys are a subset of the input
    /// view keys. An empty map on non-empty input means every fetch failed —
    /// the caller treats that as fatal.
    pub async fn fetch_views_in_parallel(
        &self,
        specs: &[ViewFetchSpec],
        workbook_name: &str,
        site: &str,
        concurrency: usize,
    ) -> Result<HashMap<String, String>> {
        let entry = self.valid_token(site).await?;
        let workbook_id = self.find_workbook(&entry, workbook_name).await?;
        let view_ids = self.list_views(&entry, &workbook_id).await?;

        let mut results: HashMap<String, String> = HashMap::new();
        let concurrency = concurrency.max(1);

        for batch in specs.chunks(concurrency) {
            let fetches = batch.iter().map(|spec| {
                let entry = &entry;
                let view_ids = &view_ids;
                async move {
                    let Some(view_id) = view_ids.get(&spec.view_name) else {
                        return (
                            spec.view_key.clone(),
                            Err(TableauError::ViewFetchFailed {
                                view_key: spec.view_key.clone(),
                                message: format!("view {:?} not in workbook", spec.view_name),
                            }),
                        );
                    };
                    let result = self
                        .fetch_view_data(entry, view_id, &spec.filter_params)
                        .await;
                    (spec.view_key.clone(), result)
                }
            });

            for (view_key, result) in join_all(fetches).await {
                match result {
                    Ok(csv) => {
                        results.insert(view_key, csv);
                    }
                    Err(e) => {
                        tracing::warn!(view_key, error = %e, "View fetch failed, skipping");
                    }
                }
            }
        }

        tracing::info!(
            requested = specs.len(),
            fetched = results.len(),
            workbook = workbook_name,
            "Parallel view fetch complete"
        );
        Ok(results)
    }

    /// Issue a request with up to three attempts. Network errors and
    /// retryable statuses (5xx, 408, 429) back off exponentially; other 4xx
    /// fail immediately.
    async fn send_with_retry<F>(&self, mut build: F) -> Result<reqwest::Response>
    where
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match build().send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp);
                    }
                    if attempt < MAX_ATTEMPTS && is_retryable_status(status.as_u16()) {
                        let delay = retry_delay(attempt);
                        tracing::debug!(status = %status, attempt, ?delay, "Retrying request");
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    let message = resp.text().await.unwrap_or_default();
                    return Err(TableauError::Api {
                        status: status.as_u16(),
                        message,
                    });
                }
                Err(e) => {
                    if attempt < MAX_ATTEMPTS {
                        let delay = retry_delay(attempt);
                        tracing::debug!(error = %e, attempt, ?delay, "Retrying after network error");
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }
}

fn is_retryable_status(status: u16) -> bool {
    status >= 500 || status == 408 || status == 429
}

fn retry_delay(attempt: u32) -> Duration {
    RETRY_BASE * 2u32.pow(attempt.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_and_throttles_are_retryable() {
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(408));
        assert!(is_retryable_status(429));
    }

    #[test]
    fn client_errors_are_not_retryable() {
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(401));
        assert!(!is_retryable_status(404));
    }

    #[test]
    fn retry_delay_doubles_per_attempt() {
        assert_eq!(retry_delay(1), Duration::from_millis(500));
        assert_eq!(retry_delay(2), Duration::from_millis(1000));
        assert_eq!(retry_delay(3), Duration::from_millis(2000));
    }

    #[test]
    fn api_url_includes_version() {
        let client = TableauClient::new("https://tableau.example.com/", "n", "s", true);
        assert_eq!(
            client.api_url("auth/signin"),
            "https://tableau.example.com/api/3.21/auth/signin"
        );
    }
}
