//! # Finder server
//!
//! Binary serving the lost and found service, configured through `PORT`,
//! `STATIC_ROOT` and `LOG_LEVEL`.
use std::{
    error::Error,
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};

use finder::{app::Finder, items::store::ItemStore, logging::init_logging, runtime::server::serve, settings::Settings};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let settings = Settings::from_env()?;
    init_logging(&settings.log_level)?;

    let store = Arc::new(ItemStore::new());
    let finder = Finder::new(store, &settings.static_root);
    let server = serve(SocketAddr::from((Ipv4Addr::UNSPECIFIED, settings.port)), Arc::new(finder)).await?;

    info!("Finder server running at http://localhost:{}", server.local_addr().port());

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    server.close();
    Ok(())
}
