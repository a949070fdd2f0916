mod api;
mod middleware;

use std::time::Duration;

use anyhow::Context;
use pricecap_archive::JsonlArchive;
use pricecap_core::SubmissionLog;
use pricecap_recognition::{AnyRecognizer, HttpRecognizer, SamplePick, ScriptedRecognizer};
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, rate_limit_state, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = pricecap_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let catalog = pricecap_core::load_catalog(&config.catalog_path)?;
    tracing::info!(
        env = %config.env,
        catalog = %config.catalog_path.display(),
        sites = catalog.sites.len(),
        "catalog loaded"
    );

    let recognizer = match config.recognizer_url.as_deref() {
        Some(url) => {
            tracing::info!(url, "using HTTP speech recognizer");
            AnyRecognizer::Http(HttpRecognizer::new(
                url,
                config.recognition_timeout_secs,
                &config.recognizer_user_agent,
            )?)
        }
        None => {
            tracing::info!(
                samples = catalog.samples.len(),
                delay_ms = config.stub_delay_ms,
                "no recognizer configured, replaying catalog samples"
            );
            AnyRecognizer::Scripted(ScriptedRecognizer::new(
                catalog.samples.clone(),
                Duration::from_millis(config.stub_delay_ms),
                SamplePick::Random,
            ))
        }
    };

    let archive = config.archive_path.as_ref().map(JsonlArchive::new);
    let log = match &archive {
        Some(archive) => {
            let sessions = archive.load().await?;
            tracing::info!(
                path = %archive.path().display(),
                sessions = sessions.len(),
                "restoring submission history"
            );
            SubmissionLog::restore(sessions).context("archived history is inconsistent")?
        }
        None => SubmissionLog::new(),
    };

    let state = AppState::new(
        catalog,
        log,
        archive,
        recognizer,
        Duration::from_secs(config.recognition_timeout_secs),
    );
    let app = build_app(state, rate_limit_state(config.rate_limit_per_minute));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
