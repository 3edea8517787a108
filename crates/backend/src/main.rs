pub mod api;
pub mod dashboards;
pub mod routes;
pub mod shared;
pub mod state;
pub mod system;

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::dashboards::d100_consumption_lookup::{LookupService, QuerySettings};
use crate::shared::config::load_config;
use crate::state::AppState;
use crate::system::auth::jwt::SessionKeys;
use crate::system::auth::password::Verifier;
use crate::system::users::{UserDirectory, UserSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    system::tracing::initialize()?;

    let config = load_config().context("failed to load configuration")?;

    let google = shared::google_auth::provider_from_config(&config)?;
    let source = UserSource::from_config(&config.auth, google.clone())?;
    tracing::info!("User source: {}", source.describe());
    let users = UserDirectory::new(
        source,
        Verifier::from_config(&config.auth),
        Duration::from_secs(config.auth.cache_ttl_secs),
    );

    // Without a user list nobody can log in, so refuse to start
    if let Err(e) = users.users().await {
        tracing::error!("No se pudo cargar la lista de usuarios: {}", e);
        return Err(e).context("user source unavailable at startup");
    }

    let warehouse = shared::warehouse::connect(&config.warehouse, google)
        .await
        .context("failed to set up the warehouse client")?;

    let state = AppState {
        sessions: Arc::new(SessionKeys::from_config(&config.cookie)),
        users: Arc::new(users),
        lookup: Arc::new(LookupService::new(
            warehouse,
            QuerySettings::from_config(&config),
        )),
    };

    let app = routes::configure_routes(state);

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind))?;

    tracing::info!("Attempting to bind server to http://{}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            tracing::info!("Server successfully bound to {}", addr);
            listener
        }
        Err(e) => {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                tracing::error!("Error: {} is already in use", addr);
            } else {
                tracing::error!("Failed to bind to {}. Error: {}", addr, e);
            }
            return Err(e.into());
        }
    };

    axum::serve(listener, app).await?;

    Ok(())
}
