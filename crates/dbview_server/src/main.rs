//! dbview HTTP server entry point.
//!
//! Startup is fail-fast: bad configuration or an unreachable store exits
//! with status 1 before the listener opens.

use dbview_core::{
    init_logging, load_dotenv, AppConfig, DocumentBackend, FetchService, PgRelationalStore,
    StoreError,
};
use dbview_server::build_router;
use log::{error, info};
use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=server_exit module=server status=error error={err}");
            eprintln!("dbview_server: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let dotenv = load_dotenv();
    let config = AppConfig::from_env()?;
    init_logging(&config.log_level, config.log_dir.as_deref())?;
    dotenv.log();

    let location = config.docstore.clone();
    let database = config.docstore_database.clone();
    // The MongoDB driver blocks; keep it off the async workers.
    let documents = tokio::task::spawn_blocking(move || {
        let documents = DocumentBackend::open(&location, &database)?;
        documents.ping()?;
        Ok::<_, StoreError>(documents)
    })
    .await??;
    info!(
        "event=docstore_connect module=server status=ok backend={} location={:?}",
        documents.kind(),
        config.docstore
    );

    let relational = PgRelationalStore::connect(&config.relational, config.query_timeout).await?;

    let service = Arc::new(FetchService::new(
        Arc::new(documents),
        relational,
        config.backup_dir.clone(),
    ));
    let app = build_router(service);

    let addr = config.bind_address()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "event=server_start module=server status=ok addr={addr} backup_dir={}",
        config.backup_dir.display()
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("event=server_stop module=server status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("event=signal_listen module=server status=error error={err}");
    }
}
