//! Client for the presentation-writer service: posts a presentation
//! manifest, receives the serialized artifact bytes.

pub mod error;

pub use error::{RenderError, Result};

use std::time::Duration;

use async_trait::async_trait;

use reportforge_assembly::PresentationManifest;

/// The rendering seam the orchestrator depends on.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, manifest: &PresentationManifest) -> Result<Vec<u8>>;
}

pub struct RenderClient {
    client: reqwest::Client,
    base_url: String,
}

impl RenderClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            // Rendering a large deck can be slow; allow more than the
            // default API timeout.
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Renderer for RenderClient {
    async fn render(&self, manifest: &PresentationManifest) -> Result<Vec<u8>> {
        let url = format!("{}/render", self.base_url);
        let resp = self.client.post(&url).json(manifest).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(RenderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = resp.bytes().await?.to_vec();
        tracing::info!(
            slides = manifest.slides.len(),
            size = bytes.len(),
            "Rendered presentation"
        );
        Ok(bytes)
    }
}
