use anyhow::{Context, Result};
use crates::payments::settings::StripeSettings;
use std::str::FromStr;

use super::config_model::{BackendServer, Database, DotEnvyConfig};

const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: parse_var("SERVER_PORT_BACKEND")?,
        body_limit: parse_var("SERVER_BODY_LIMIT")?,
        timeout: parse_var("SERVER_TIMEOUT")?,
    };

    let database = Database {
        url: required_var("DATABASE_URL")?,
        max_connections: match std::env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(raw) => raw
                .parse()
                .context("DATABASE_MAX_CONNECTIONS is invalid")?,
            Err(_) => DEFAULT_DB_MAX_CONNECTIONS,
        },
    };

    let stripe = StripeSettings::from_env()?;

    Ok(DotEnvyConfig {
        backend_server,
        database,
        stripe,
    })
}

fn required_var(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} is invalid"))
}

fn parse_var<T>(key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    required_var(key)?
        .parse::<T>()
        .with_context(|| format!("{key} is invalid"))
}
