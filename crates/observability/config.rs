use std::env;
use tracing::Level;

#[derive(Clone)]
pub(crate) struct ServiceContext {
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
}

#[derive(Clone)]
pub(crate) struct ObservabilityConfig {
    pub(crate) service_context: ServiceContext,
    /// Used when `RUST_LOG` is not set.
    pub(crate) default_level: Level,
    /// Warnings captured during config parsing so they can be logged after tracing is initialized.
    pub(crate) warnings: Vec<String>,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        let component = component.trim().to_string();

        let service_name = env_string("SERVICE_NAME")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| component.clone());

        let environment = env_string("STAGE")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "unknown".to_string());

        let mut warnings = Vec::new();
        let default_level = match env_string("LOG_LEVEL") {
            Some(raw) if !raw.trim().is_empty() => parse_level(&raw).unwrap_or_else(|| {
                warnings.push(format!(
                    "LOG_LEVEL is invalid (value: {raw}); defaulting to INFO"
                ));
                Level::INFO
            }),
            _ => Level::INFO,
        };

        Self {
            service_context: ServiceContext {
                service_name,
                environment,
                component,
            },
            default_level,
            warnings,
        }
    }
}

pub(crate) fn parse_level(input: &str) -> Option<Level> {
    match input.trim().to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok()
}
