#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub redis: Redis,
    pub midtrans: Midtrans,
    pub auth: Auth,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Redis {
    /// `None` disables the plan cache.
    pub url: Option<String>,
    pub plan_cache_ttl_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct Midtrans {
    pub server_key: String,
    pub client_key: String,
    pub is_production: bool,
    pub snap_base_url: Option<String>,
    pub api_base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Auth {
    pub jwt_secret: String,
}
