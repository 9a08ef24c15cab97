//! Vigil gateway
//!
//! - Config: `VIGIL_CONFIG` (default `vigil.yaml`) + env overrides, defaults on failure
//! - Routes: health aliases, `/metrics`, `/api/v1/...` monitoring API
//! - Background: periodic host + latency threshold evaluation
//! - Graceful shutdown on Ctrl+C / SIGTERM

use std::process::ExitCode;

use vigil_gateway::{app_state, config, monitor, obs, router};

#[tokio::main]
async fn main() -> ExitCode {
    let path = std::env::var(config::CONFIG_PATH_VAR)
        .unwrap_or_else(|_| config::DEFAULT_CONFIG_PATH.to_string());
    let loaded = config::load_or_default(&path, &|k| std::env::var(k).ok());

    obs::logging::init(&loaded.config.logging);
    for w in &loaded.warnings {
        tracing::warn!(path = %path, "{w}");
    }

    match run(loaded.config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "vigil-gateway failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cfg: config::VigilConfig) -> Result<(), Box<dyn std::error::Error>> {
    let listen = cfg.listen_addr()?;
    let environment = cfg.server.environment.clone();
    for w in cfg.server.credential_warnings() {
        tracing::warn!("{w}");
    }
    let database = cfg.server.database_scheme().to_string();

    let state = app_state::AppState::new(cfg)?;
    let evaluation = monitor::spawn_evaluation_loop(state.clone());
    let app = router::build_router(state);

    tracing::info!(%listen, %environment, %database, "vigil-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = evaluation {
        handle.abort();
    }
    tracing::info!("vigil-gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
