// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, sync::Arc};

use tokio::{signal, sync::Notify};
use tokio_util::sync::CancellationToken;

use wallet_signup_server::{
    api::router,
    auth::{AuthService, TokenIssuer},
    blockchain::WalletFunder,
    config::Config,
    funding::FundingReconciler,
    logging::init_tracing,
    state::AppState,
    storage::UserDatabase,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(config.log_format);
    tracing::info!(config = ?config, "Configuration loaded");

    let db_path = config.user_db_path();
    let users = match UserDatabase::open(&db_path) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            tracing::error!(path = %db_path.display(), error = %e, "Failed to open credential store");
            std::process::exit(1);
        }
    };
    tracing::info!(path = %db_path.display(), "Credential store opened");

    let shutdown = CancellationToken::new();
    let mut auth = AuthService::new(users.clone(), TokenIssuer::new(&config.jwt_secret));

    let reconciler_handle = match &config.funding {
        Some(funding) => {
            let funder = match WalletFunder::new(funding) {
                Ok(funder) => funder,
                Err(e) => {
                    tracing::error!(error = %e, kind = e.kind(), "Failed to initialize wallet funder");
                    std::process::exit(1);
                }
            };

            let trigger = Arc::new(Notify::new());
            auth = auth.with_funding_trigger(trigger.clone());

            let reconciler =
                FundingReconciler::new(users.clone(), funder, trigger, funding.poll_interval);
            Some(tokio::spawn(reconciler.run(shutdown.clone())))
        }
        None => {
            tracing::info!("On-chain funding disabled");
            None
        }
    };

    let app = router(AppState::new(users, auth));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Failed to parse bind address");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");

    tracing::info!(%addr, "Wallet signup server listening (docs at /docs)");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            server_shutdown.cancel();
        })
        .await
        .expect("HTTP server failed");

    shutdown.cancel();
    if let Some(handle) = reconciler_handle {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Funding reconciler task ended abnormally");
        }
    }

    tracing::info!("Server shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
