use crates::payments::settings::StripeSettings;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub stripe: StripeSettings,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    /// MiB.
    pub body_limit: u64,
    /// Seconds.
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
}
