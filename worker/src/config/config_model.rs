use crates::payments::settings::StripeSettings;
use std::time::Duration;

pub const MAX_EVENT_LEASE_SECS: u64 = 86_400;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub worker_server: WorkerServer,
    pub database: Database,
    pub stripe: StripeSettings,
    pub charge: Charge,
}

#[derive(Debug, Clone)]
pub struct WorkerServer {
    pub port: u16,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct Charge {
    /// Lowercase ISO 4217 code used for every charge.
    pub currency: String,
    pub poll_interval_secs: u64,
    pub max_attempts: i32,
    /// A `running` event locked longer than this is handed out again.
    pub event_lease_secs: u64,
}

impl Charge {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn event_lease(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.event_lease_secs.min(MAX_EVENT_LEASE_SECS) as i64)
    }
}
