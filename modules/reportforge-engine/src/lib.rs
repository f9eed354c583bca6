//! Orchestration: the queue processor that runs one report job end-to-end.
//!
//! Pipeline per job: resolve use-case meta → build view requests → parallel
//! fetch → transform → assemble → render → email. Step failures propagate to
//! the worker, which decides retry vs terminal failure; only the
//! failure-notification path swallows its own errors so the original cause
//! stays the job's failed reason.

pub mod emails;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use reportforge_assembly::assemble;
use reportforge_email::Mailer;
use reportforge_queue::{JobProcessor, JobView};
use reportforge_registry::{Registry, RegistryError};
use reportforge_render::Renderer;
use reportforge_transform::{TransformError, Transformer};
use tableau_client::{TableauClient, TableauError, ViewFetchSpec};

pub use emails::{FAILURE_SUBJECT, REPORT_SUBJECT};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No view data was successfully fetched")]
    NoViewsFetched,

    #[error("All view transformations failed")]
    AllTransformsFailed,

    #[error("Presentation rendering failed: {0}")]
    RenderFailed(String),

    #[error("Email delivery failed: {0}")]
    EmailFailed(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Fetch(#[from] TableauError),
}

/// Where raw view CSVs come from. Production uses the Tableau client; tests
/// substitute a stub.
#[async_trait]
pub trait ViewSource: Send + Sync {
    async fn fetch_views(
        &self,
        specs: &[ViewFetchSpec],
        workbook_name: &str,
        site: &str,
        concurrency: usize,
    ) -> tableau_client::Result<HashMap<String, String>>;
}

#[async_trait]
impl ViewSource for TableauClient {
    async fn fetch_views(
        &self,
        specs: &[ViewFetchSpec],
        workbook_name: &str,
        site: &str,
        concurrency: usize,
    ) -> tableau_client::Result<HashMap<String, String>> {
        self.fetch_views_in_parallel(specs, workbook_name, site, concurrency)
            .await
    }
}

pub struct ReportProcessor {
    registry: Arc<Registry>,
    source: Arc<dyn ViewSource>,
    transformer: Transformer,
    renderer: Arc<dyn Renderer>,
    mailer: Arc<dyn Mailer>,
    fetch_concurrency: usize,
}

impl ReportProcessor {
    pub fn new(
        registry: Arc<Registry>,
        source: Arc<dyn ViewSource>,
        renderer: Arc<dyn Renderer>,
        mailer: Arc<dyn Mailer>,
        fetch_concurrency: usize,
    ) -> Self {
        let transformer = Transformer::new(registry.clone());
        Self {
            registry,
            source,
            transformer,
            renderer,
            mailer,
            fetch_concurrency,
        }
    }

    async fn run(&self, job: &JobView) -> Result<serde_json::Value, EngineError> {
        let use_case = &job.payload.use_case;
        let meta = self.registry.use_case_meta(use_case)?;
        let slide_set = self.registry.slide_manifest(use_case)?;

        let specs = self
            .transformer
            .build_view_requests(use_case, &job.payload.filters)?;
        info!(
            job_id = %job.id,
            use_case = %use_case,
            views = specs.len(),
            workbook = %meta.workbook_name,
            site = %meta.site_name,
            "Fetching view data"
        );

        let raw = self
            .source
            .fetch_views(
                &specs,
                &meta.workbook_name,
                &meta.site_name,
                self.fetch_concurrency,
            )
            .await?;
        if raw.is_empty() {
            return Err(EngineError::NoViewsFetched);
        }

        let shaped = self.transformer.transform_all(use_case, &raw);
        if shaped.is_empty() {
            return Err(EngineError::AllTransformsFailed);
        }
        let views_processed = shaped.len();

        let manifest = assemble(slide_set, &shaped);
        let bytes = self
            .renderer
            .render(&manifest)
            .await
            .map_err(|e| EngineError::RenderFailed(e.to_string()))?;

        let filename = artifact_filename(use_case);
        self.mailer
            .send_attachment(
                &job.payload.recipient,
                REPORT_SUBJECT,
                &emails::report_body(&slide_set.title),
                bytes,
                &filename,
            )
            .await
            .map_err(|e| EngineError::EmailFailed(e.to_string()))?;

        info!(
            job_id = %job.id,
            recipient = %job.payload.recipient,
            filename = %filename,
            views_processed,
            "Report delivered"
        );
        Ok(serde_json::json!({
            "success": true,
            "fileName": filename,
            "recipient": job.payload.recipient,
            "useCase": use_case,
            "viewsProcessed": views_processed,
        }))
    }
}

#[async_trait]
impl JobProcessor for ReportProcessor {
    async fn process(&self, job: &JobView) -> anyhow::Result<serde_json::Value> {
        self.run(job).await.map_err(anyhow::Error::from)
    }

    /// Best-effort failure notification: its errors are logged and
    /// suppressed so the original cause remains the job's failed reason.
    async fn on_terminal_failure(&self, job: &JobView, reason: &str) {
        let body = emails::failure_body(&job.payload.use_case, reason);
        if let Err(e) = self
            .mailer
            .send_plain(&job.payload.recipient, FAILURE_SUBJECT, &body)
            .await
        {
            warn!(
                job_id = %job.id,
                recipient = %job.payload.recipient,
                error = %e,
                "Failed to send failure-notification email"
            );
        }
    }
}

/// `political-snapshot-20260801-093000.pptx`
fn artifact_filename(use_case: &str) -> String {
    format!(
        "{}-{}.pptx",
        use_case.to_lowercase().replace('_', "-"),
        Utc::now().format("%Y%m%d-%H%M%S")
    )
}
