mod middleware;
mod page;

use std::sync::Arc;

use axum::{Router, http::StatusCode, middleware as axum_middleware, routing::get};

use crate::{
    application::{Delay, PageletFactory, TokioDelay},
    config::{PageSettings, PipelineSettings, Settings},
};

#[derive(Clone)]
pub struct HttpState {
    pub pipeline: PipelineSettings,
    pub page: PageSettings,
    pub factory: PageletFactory,
    pub delay: Arc<dyn Delay>,
}

impl HttpState {
    pub fn new(settings: &Settings) -> Self {
        Self::with_delay(settings, Arc::new(TokioDelay))
    }

    pub fn with_delay(settings: &Settings, delay: Arc<dyn Delay>) -> Self {
        Self {
            pipeline: settings.pipeline.clone(),
            page: settings.page.clone(),
            factory: PageletFactory::new(settings.pipeline.instrumentation),
            delay,
        }
    }
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(page::index))
        .route("/health", get(health))
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
