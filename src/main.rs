// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use ledger_gate::{
    api::router,
    config::{GateConfig, LogFormat},
    error::ServerError,
    ledger::RedbLedger,
    logging,
    state::AppState,
};

#[tokio::main]
async fn main() {
    logging::init(LogFormat::from_env());

    if let Err(e) = run().await {
        error!(error = %e, "Ledger gate stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    let config = GateConfig::from_env()?;

    let ledger = RedbLedger::open(
        &config.ledger_path,
        config.ledger_table.clone(),
        config.token_decimals,
    )?;
    info!(
        path = %config.ledger_path.display(),
        table = config.ledger_table.as_str(),
        "Ledger opened"
    );

    let shutdown = CancellationToken::new();
    let state = AppState::from_config(&config, ledger).with_shutdown(shutdown.clone());
    info!(
        destination = %config.destination,
        price_per_day = %config.price_per_day_display(),
        scheme = %config.address_scheme,
        allow_listed = config.allow_list.len(),
        cache_capacity = config.cache_capacity,
        timeout = ?config.decision_timeout,
        "Entitlement gate configured"
    );

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Ledger gate listening on http://{addr} (docs at /docs)");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Ledger gate shut down");
    Ok(())
}

/// Resolve on Ctrl-C, cancelling in-flight decisions first.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    shutdown.cancel();
}
