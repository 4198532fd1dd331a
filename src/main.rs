use std::{process, sync::Arc};

use snooproxy::{
    application::{
        cache::CacheService, error::AppError, oauth::TokenService, proxy::ProxyService,
    },
    config,
    infra::{
        error::InfraError,
        http::{self, AppState, PublicConfig},
        reddit::RedditClient,
        store::RecordStore,
        telemetry,
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
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    run_serve(settings).await
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let store = Arc::new(
        RecordStore::new(settings.cache.directory.clone())
            .map_err(|err| AppError::from(InfraError::Io(err)))?,
    );
    let reddit = Arc::new(RedditClient::new(settings.reddit.clone()).map_err(AppError::from)?);

    let cache = CacheService::new(store);
    let proxy = ProxyService::new(cache.clone(), reddit.clone());
    let tokens = TokenService::new(reddit);

    let public = PublicConfig {
        token: settings.reddit.access_token.clone(),
        backend_url: settings
            .server
            .backend_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", settings.server.addr.port())),
    };

    let router = http::build_router(AppState {
        cache,
        proxy,
        tokens,
        public: Arc::new(public),
    });

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "snooproxy::server",
        addr = %settings.server.addr,
        cache_dir = %settings.cache.directory.display(),
        redirect_uri = %settings.reddit.redirect_uri,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to install shutdown handler");
    }
}
