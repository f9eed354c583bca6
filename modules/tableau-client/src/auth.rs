//! Auth token cache with per-site single-flight refresh.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

/// Sign-in tokens live for two hours on the server.
pub const TOKEN_LIFETIME_MINUTES: i64 = 120;

/// Refresh this long before the server-side expiry.
pub const REFRESH_THRESHOLD_MINUTES: i64 = 10;

/// A cached sign-in: the auth token and the resolved site id.
#[derive(Debug, Clone)]
pub struct AuthEntry {
    pub token: String,
    pub site_id: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthEntry {
    pub fn new(token: String, site_id: String, now: DateTime<Utc>) -> Self {
        Self {
            token,
            site_id,
            expires_at: now + Duration::minutes(TOKEN_LIFETIME_MINUTES),
        }
    }

    /// Fresh while more than the refresh threshold remains.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - Duration::minutes(REFRESH_THRESHOLD_MINUTES)
    }
}

/// Per-site token slots. The outer map hands out one slot per site; holding
/// the slot's lock across a refresh gives single-flight semantics — later
/// callers wait on the lock and then observe the fresh entry instead of
/// issuing their own sign-in.
#[derive(Default)]
pub(crate) struct TokenCache {
    slots: Mutex<HashMap<String, Arc<Mutex<Option<AuthEntry>>>>>,
}

impl TokenCache {
    pub async fn slot(&self, site: &str) -> Arc<Mutex<Option<AuthEntry>>> {
        let mut slots = self.slots.lock().await;
        slots.entry(site.to_string()).or_default().clone()
    }
}

/// Resolve the personal-access-token pair for a site: `<SITE_UPPER>_PAT_NAME`
/// / `<SITE_UPPER>_PAT_SECRET` (hyphens mapped to underscores) override the
/// global pair.
pub(crate) fn resolve_credentials(
    site: &str,
    global_name: &str,
    global_secret: &str,
) -> (String, String) {
    let prefix = site.to_uppercase().replace('-', "_");
    let name = std::env::var(format!("{prefix}_PAT_NAME"))
        .unwrap_or_else(|_| global_name.to_string());
    let secret = std::env::var(format!("{prefix}_PAT_SECRET"))
        .unwrap_or_else(|_| global_secret.to_string());
    (name, secret)
}
