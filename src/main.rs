use chamber_communities::{AppState, config::Config, db, router, store};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let db_pool = db::connect(&config).await?;
    db::migrate(&db_pool).await?;

    if let Some(dir) = &config.import_dir {
        let report = store::import(&db_pool, dir).await?;
        tracing::info!(dir = %dir.display(), ?report, "imported legacy collections");
    }

    let bind_addr = config.bind_addr.clone();
    let export_dir = config.export_dir.clone();
    let app = router(AppState::new(db_pool.clone(), config));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(dir) = export_dir {
        store::export(&db_pool, &dir).await?;
    }
    db_pool.close().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
