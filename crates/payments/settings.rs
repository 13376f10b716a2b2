use anyhow::{Context, Result};
use url::Url;

use super::stripe_client::DEFAULT_STRIPE_API_BASE;

/// Processor credentials shared by every binary that talks to Stripe.
#[derive(Clone)]
pub struct StripeSettings {
    pub secret_key: String,
    pub api_base: String,
}

impl std::fmt::Debug for StripeSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeSettings")
            .field("secret_key", &"[redacted]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl StripeSettings {
    /// Reads `STRIPE_SECRET_KEY`, `STRIPE_SECRET_KEY_TEST` and `STRIPE_API_BASE`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            secret_key: resolve_stripe_secret(
                std::env::var("STRIPE_SECRET_KEY").ok(),
                std::env::var("STRIPE_SECRET_KEY_TEST").ok(),
            )?,
            api_base: resolve_api_base(std::env::var("STRIPE_API_BASE").ok())?,
        })
    }
}

/// The live key wins; the test key is used only when no live key is set.
/// Blank values count as unset.
pub fn resolve_stripe_secret(live: Option<String>, test: Option<String>) -> Result<String> {
    live.filter(|key| !key.trim().is_empty())
        .or_else(|| test.filter(|key| !key.trim().is_empty()))
        .context("STRIPE_SECRET_KEY is invalid")
}

/// Unset or blank falls back to the public API.
pub fn resolve_api_base(raw: Option<String>) -> Result<String> {
    let api_base = raw
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_STRIPE_API_BASE.to_string());
    Url::parse(&api_base).context("STRIPE_API_BASE is invalid")?;
    Ok(api_base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_used_when_live_key_is_absent() {
        let key = resolve_stripe_secret(None, Some("sk_test_123".to_string())).unwrap();
        assert_eq!(key, "sk_test_123");

        let key = resolve_stripe_secret(Some("".to_string()), Some("sk_test_123".to_string()))
            .unwrap();
        assert_eq!(key, "sk_test_123");

        let key = resolve_stripe_secret(
            Some("sk_live_1".to_string()),
            Some("sk_test_123".to_string()),
        )
        .unwrap();
        assert_eq!(key, "sk_live_1");
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = resolve_stripe_secret(Some("  ".to_string()), None).unwrap_err();
        assert_eq!(err.to_string(), "STRIPE_SECRET_KEY is invalid");
    }

    #[test]
    fn blank_api_base_falls_back_to_default() {
        assert_eq!(resolve_api_base(None).unwrap(), DEFAULT_STRIPE_API_BASE);
        assert_eq!(
            resolve_api_base(Some(String::new())).unwrap(),
            DEFAULT_STRIPE_API_BASE
        );
        assert_eq!(
            resolve_api_base(Some("   ".to_string())).unwrap(),
            DEFAULT_STRIPE_API_BASE
        );
    }

    #[test]
    fn api_base_is_validated() {
        let err = resolve_api_base(Some("not a url".to_string())).unwrap_err();
        assert_eq!(err.to_string(), "STRIPE_API_BASE is invalid");
        assert_eq!(
            resolve_api_base(Some("http://127.0.0.1:12111".to_string())).unwrap(),
            "http://127.0.0.1:12111"
        );
    }

    #[test]
    fn debug_output_hides_secret() {
        let settings = StripeSettings {
            secret_key: "sk_live_example".to_string(),
            api_base: DEFAULT_STRIPE_API_BASE.to_string(),
        };
        assert!(!format!("{settings:?}").contains("sk_live_example"));
    }
}
