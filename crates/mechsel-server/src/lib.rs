pub mod catalog;
pub mod error;
pub mod import;
pub mod reference;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use mechsel_core::config::ServiceConfig;
use mechsel_suggest::{LlmInvoker, ModelInvoker};

use crate::catalog::CatalogStore;
use crate::reference::{HttpReferenceImage, ReferenceImageSource};

/// Process-lifetime handles shared by every request. Nothing in here is
/// mutated after startup.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogStore>,
    pub invoker: Arc<dyn ModelInvoker>,
    /// `None` when no reference image location is configured.
    pub reference: Option<Arc<dyn ReferenceImageSource>>,
    pub candidate_limit: usize,
    pub upload_limit_bytes: usize,
}

impl AppState {
    /// Build every client once from the service configuration.
    pub fn from_config(config: &ServiceConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .context("failed to create HTTP client")?;

        let invoker = LlmInvoker::new(
            config.ai.clone(),
            Duration::from_secs(config.model_timeout_secs),
        )
        .context("generative model is not configured (set GEMINI_API_KEY)")?;

        let reference = config.image_url.as_ref().map(|url| {
            Arc::new(HttpReferenceImage::new(http.clone(), url.clone()))
                as Arc<dyn ReferenceImageSource>
        });

        Ok(Self {
            catalog: catalog::open(&config.catalog, http),
            invoker: Arc::new(invoker),
            reference,
            candidate_limit: config.candidate_limit,
            upload_limit_bytes: config.upload_limit_bytes,
        })
    }
}

/// All routes. The `find-engine` and `extract-input-image` paths are kept as
/// aliases for existing clients.
pub fn router(state: AppState) -> Router {
    let upload_limit = state.upload_limit_bytes;
    Router::new()
        .route("/health", get(routes::health))
        .route("/api-ai/find-motor", post(routes::find_motor))
        .route("/api-ai/find-engine", post(routes::find_motor))
        .route("/api-ai/find-material", post(routes::find_material))
        .route("/api-ai/extract-form-image", post(routes::extract_form_image))
        .route("/api-ai/extract-input-image", post(routes::extract_form_image))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
