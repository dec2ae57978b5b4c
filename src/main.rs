// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use custodial_wallet_server::{
    api::router, config::Config, email::LogMailer, state::AppState, storage::WalletDatabase,
    vault::CredentialVault,
};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    if format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = Config::from_env();

    let db_path = config.data_dir.join("custodial.redb");
    let db = WalletDatabase::open(&db_path).expect("Failed to open wallet database");
    tracing::info!(path = %db_path.display(), "wallet database open");

    let state = AppState::new(
        Arc::new(db),
        Arc::new(CredentialVault::new()),
        Arc::new(LogMailer::new(config.smtp_from.clone())),
        Arc::new(config.clone()),
    );
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listen address");

    tracing::info!("custodial wallet server listening on http://{addr} (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("shutdown signal received");
}
