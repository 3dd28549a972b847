//! pano_studio server.
//!
//! Binds the REST API and wires together the sled store, the local object
//! store, and the payment checkout client.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use pano_studio::billing::CheckoutClient;
use pano_studio::config::Config;
use pano_studio::objects::LocalObjectStore;
use pano_studio::rest::{create_router, AppState};
use pano_studio::storage::Storage;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::load();
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let storage = Storage::open(&config.data_dir)?;
    let objects = LocalObjectStore::new(
        &config.objects_dir,
        format!("https://{}", config.storage_domain),
    );
    let checkout = CheckoutClient::new(&config.stripe_secret_key, &config.public_url);

    let state = Arc::new(AppState {
        storage: Arc::new(storage),
        objects: Arc::new(objects),
        checkout: Arc::new(checkout),
        config: Arc::new(config),
    });

    let app = create_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "pano_studio listening");
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
