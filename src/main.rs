use std::{process, sync::Arc};

use pagepipe::{
    application::{
        PageletFactory, Scheduler, SchedulerOptions, TokioDelay,
        demo::{demo_pagelets, stream_page},
        error::AppError,
    },
    config,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        telemetry,
        transport::WriterTransport,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        AppError::from(InfraError::configuration(format!(
            "failed to load configuration: {err}"
        )))
    })?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Render(_) => run_render(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let router = http::build_router(HttpState::new(&settings));

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target: "pagepipe::http",
        addr = %settings.server.addr,
        pipelining = settings.pipeline.enabled,
        debug = settings.pipeline.debug,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

async fn run_render(settings: config::Settings) -> Result<(), AppError> {
    let factory = PageletFactory::new(settings.pipeline.instrumentation);
    let pagelets = demo_pagelets(&factory)?;
    let mut scheduler = Scheduler::with_options(
        SchedulerOptions::from(&settings.pipeline),
        Arc::new(TokioDelay),
    );
    let mut stdout = WriterTransport::new(tokio::io::stdout());

    let summary = stream_page(
        &mut scheduler,
        pagelets,
        &settings.page.runtime_script_url,
        &mut stdout,
    )
    .await?;

    info!(
        target: "pagepipe::render",
        emitted = summary.emitted,
        pipelined = summary.pipelined,
        "page rendered"
    );
    Ok(())
}
