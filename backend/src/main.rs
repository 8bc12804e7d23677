use anyhow::Result;
use backend::axum_http::http_serve;
use backend::config::config_loader;
use crates::infra::{cache::AppCache, db::postgres::postgres_connection};
use crates::payments::midtrans_client::{MidtransClient, MidtransConfig};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Backend exited with error: {:#}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    crates::observability::init_observability("backend")?;

    let dotenvy_env = config_loader::load()?;
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    info!("Postgres connection has been established");

    let cache = AppCache::from_url(dotenvy_env.redis.url.as_deref()).await?;

    let midtrans = &dotenvy_env.midtrans;
    let gateway = MidtransClient::new(MidtransConfig {
        server_key: midtrans.server_key.clone(),
        client_key: midtrans.client_key.clone(),
        is_production: midtrans.is_production,
        snap_base_url: midtrans.snap_base_url.clone(),
        api_base_url: midtrans.api_base_url.clone(),
    })?;
    info!(
        is_production = midtrans.is_production,
        "Midtrans client has been configured"
    );

    http_serve::start(
        Arc::new(dotenvy_env),
        Arc::new(postgres_pool),
        cache,
        Arc::new(gateway),
    )
    .await?;

    Ok(())
}
