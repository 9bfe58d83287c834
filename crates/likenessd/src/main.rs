use std::sync::Arc;

use anyhow::Result;
use likeness_core::ProfileStore;
use tracing_subscriber::EnvFilter;

mod config;
mod dbus_interface;
mod engine;
mod image_input;

use dbus_interface::{LikenessService, BUS_NAME, OBJECT_PATH};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("likenessd starting");

    let config = config::Config::from_env()?;
    tracing::info!(
        model_dir = %config.model_dir.display(),
        threshold = config.params.confidence_threshold,
        allocator = ?config.id_allocator,
        "configuration loaded"
    );

    let store = Arc::new(ProfileStore::new(config.id_allocator.build()));
    let generator = engine::load_generator(&config)?;
    let engine = engine::spawn_engine(generator, Arc::clone(&store))?;

    let service = LikenessService::new(engine, store);
    let _conn = zbus::connection::Builder::session()?
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, service)?
        .build()
        .await?;

    tracing::info!(bus = BUS_NAME, path = OBJECT_PATH, "likenessd ready");

    // Keep running until signaled
    tokio::signal::ctrl_c().await?;
    tracing::info!("likenessd shutting down");

    Ok(())
}
