mod config;

use std::sync::Arc;

use tracing::info;

use contactbook_api::book::AddressBook;
use contactbook_api::photos::{DiskPhotoStorage, PhotoAttachment};
use contactbook_api::router::router;
use contactbook_api::store::ContactStore;
use contactbook_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "contactbook=debug,contactbook_api=debug,contactbook_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    // Init DB and photo storage
    let db = Database::open(&config.db_path)?;
    let storage = DiskPhotoStorage::new(config.photo_dir.clone()).await?;

    let book = AddressBook::new(
        ContactStore::new(Arc::new(db)),
        PhotoAttachment::new(Arc::new(storage)),
        config.photo_retention,
    );

    let app = router(Arc::new(book), &config.photo_dir, config.max_body_bytes);

    let addr = config.addr()?;
    info!("Contactbook listening on {}", addr);
    info!(
        "Photo retention: {}, body limit: {} bytes",
        config.photo_retention, config.max_body_bytes
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
