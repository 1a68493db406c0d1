//! Streaming handler for the demo page.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{
        HeaderName, HeaderValue,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    application::{
        Scheduler, SchedulerOptions,
        demo::{demo_pagelets, stream_page},
        error::AppError,
    },
    infra::transport,
};

use super::HttpState;

const TARGET: &str = "pagepipe::http";
const CHANNEL_CAPACITY: usize = 16;
const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Per-request overrides of the configured mode flags.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PageQuery {
    pipeline: Option<bool>,
    debug: Option<bool>,
}

impl PageQuery {
    fn apply(&self, options: &mut SchedulerOptions) {
        if let Some(pipeline) = self.pipeline {
            options.pipelining = pipeline;
        }
        if let Some(debug) = self.debug {
            options.debug = debug;
        }
    }
}

pub(super) async fn index(
    State(state): State<HttpState>,
    Query(query): Query<PageQuery>,
) -> Response {
    let pagelets = match demo_pagelets(&state.factory) {
        Ok(pagelets) => pagelets,
        Err(err) => return AppError::from(err).into_response(),
    };

    let mut options = SchedulerOptions::from(&state.pipeline);
    query.apply(&mut options);
    let mut scheduler = Scheduler::with_options(options, state.delay.clone());
    let runtime_script_url = state.page.runtime_script_url.clone();
    let (mut output, body) = transport::channel(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        match stream_page(&mut scheduler, pagelets, &runtime_script_url, &mut output).await {
            Ok(summary) => debug!(
                target: TARGET,
                emitted = summary.emitted,
                pipelined = summary.pipelined,
                "page stream completed"
            ),
            Err(err) => warn!(
                target: TARGET,
                error = %err,
                pending = scheduler.pending_len(),
                "page stream aborted"
            ),
        }
    });

    let mut response = Response::new(Body::from_stream(body));
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(X_ACCEL_BUFFERING, HeaderValue::from_static("no"));
    response
}
