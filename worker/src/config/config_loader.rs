use anyhow::{Context, Result, bail};
use crates::payments::settings::StripeSettings;
use std::str::FromStr;

use super::config_model::{Charge, Database, DotEnvyConfig, MAX_EVENT_LEASE_SECS, WorkerServer};

const DEFAULT_CURRENCY: &str = "usd";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_MAX_ATTEMPTS: i32 = 5;
const DEFAULT_EVENT_LEASE_SECS: u64 = 300;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let worker_server = WorkerServer {
        port: parse_var("SERVER_PORT_WORKER")?,
        timeout: parse_var("SERVER_TIMEOUT")?,
    };

    let database = Database {
        url: std::env::var("DATABASE_URL").context("DATABASE_URL is invalid")?,
        max_connections: parse_optional_var(
            "DATABASE_MAX_CONNECTIONS",
            DEFAULT_DB_MAX_CONNECTIONS,
        )?,
    };

    let stripe = StripeSettings::from_env()?;

    let max_attempts = parse_optional_var("CHARGE_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;
    if max_attempts < 1 {
        bail!("CHARGE_MAX_ATTEMPTS is invalid");
    }

    let event_lease_secs = parse_optional_var("CHARGE_EVENT_LEASE_SECS", DEFAULT_EVENT_LEASE_SECS)?;
    if event_lease_secs == 0 || event_lease_secs > MAX_EVENT_LEASE_SECS {
        bail!("CHARGE_EVENT_LEASE_SECS is invalid");
    }

    let charge = Charge {
        currency: normalize_currency(
            &std::env::var("CHARGE_CURRENCY").unwrap_or_else(|_| DEFAULT_CURRENCY.to_string()),
        )?,
        poll_interval_secs: parse_optional_var(
            "CHARGE_POLL_INTERVAL_SECS",
            DEFAULT_POLL_INTERVAL_SECS,
        )?,
        max_attempts,
        event_lease_secs,
    };

    Ok(DotEnvyConfig {
        worker_server,
        database,
        stripe,
        charge,
    })
}

/// Lowercases and checks for a three-letter code.
pub fn normalize_currency(raw: &str) -> Result<String> {
    let currency = raw.trim().to_ascii_lowercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_lowercase()) {
        bail!("CHARGE_CURRENCY is invalid");
    }
    Ok(currency)
}

fn parse_var<T>(key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    std::env::var(key)
        .with_context(|| format!("{key} is invalid"))?
        .parse::<T>()
        .with_context(|| format!("{key} is invalid"))
}

fn parse_optional_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse::<T>().with_context(|| format!("{key} is invalid")),
        Err(_) => Ok(default),
    }
}
