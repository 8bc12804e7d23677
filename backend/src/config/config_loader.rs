use anyhow::{Context, Result};

use super::config_model::{Auth, BackendServer, Database, DotEnvyConfig, Midtrans, Redis};

pub const DEFAULT_PLAN_CACHE_TTL_SECONDS: u64 = 300;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: required("SERVER_PORT_BACKEND")?
            .parse()
            .context("SERVER_PORT_BACKEND is invalid")?,
        body_limit: required("SERVER_BODY_LIMIT")?
            .parse()
            .context("SERVER_BODY_LIMIT is invalid")?,
        timeout: required("SERVER_TIMEOUT")?
            .parse()
            .context("SERVER_TIMEOUT is invalid")?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
    };

    let redis = Redis {
        url: optional("REDIS_URL"),
        plan_cache_ttl_seconds: optional("PLAN_CACHE_TTL_SECONDS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("PLAN_CACHE_TTL_SECONDS is invalid")?
            .unwrap_or(DEFAULT_PLAN_CACHE_TTL_SECONDS),
    };

    let midtrans = Midtrans {
        server_key: required("MIDTRANS_SERVER_KEY")?,
        client_key: optional("MIDTRANS_CLIENT_KEY").unwrap_or_default(),
        is_production: optional("MIDTRANS_IS_PRODUCTION")
            .map(|v| v.parse::<bool>())
            .transpose()
            .context("MIDTRANS_IS_PRODUCTION is invalid")?
            .unwrap_or(false),
        snap_base_url: optional("MIDTRANS_SNAP_BASE_URL"),
        api_base_url: optional("MIDTRANS_API_BASE_URL"),
    };

    let auth = Auth {
        jwt_secret: required("JWT_SECRET")?,
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        redis,
        midtrans,
        auth,
    })
}

fn required(name: &str) -> Result<String> {
    optional(name).with_context(|| format!("{name} is required"))
}

/// Unset and blank values are both treated as absent.
fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim().to_string();
        (!trimmed.is_empty()).then_some(trimmed)
    })
}
