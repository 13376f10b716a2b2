use reqwest::{
    StatusCode,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};
use url::Url;

use crate::domain::value_objects::{
    enums::charge_statuses::ChargeStatus, provisioning::CardDetails,
};

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum StripeError {
    /// The request never got a usable answer: connect/timeout failures and
    /// bodies that could not be read or decoded.
    #[error("Stripe request failed: {context}: {source}")]
    Transport {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("Stripe API request failed: {context} (status {status}): {message}")]
    Api {
        context: &'static str,
        status: u16,
        message: String,
    },
}

impl StripeError {
    /// Transport failures, rate limiting and 5xx answers may succeed on a
    /// later attempt. Any other API error is a definitive rejection.
    pub fn is_retryable(&self) -> bool {
        match self {
            StripeError::Transport { .. } => true,
            StripeError::Api { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
        }
    }
}

pub type StripeResult<T> = std::result::Result<T, StripeError>;

/// Minimal Stripe client built on reqwest.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: Url,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StripeCustomer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Id of the card or source charged when none is given explicitly.
    #[serde(default)]
    pub default_source: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StripeToken {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StripeCardSource {
    pub id: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub last4: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StripeCharge {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub outcome: Option<Value>,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub receipt_url: Option<String>,
    pub status: ChargeStatus,
    #[serde(default)]
    pub source: Option<Value>,
}

/// Parameters of a charge against a customer's stored source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCharge {
    pub amount: i64,
    pub currency: String,
    pub customer_id: String,
    pub source: String,
    pub description: Option<String>,
    pub idempotency_key: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
    param: Option<String>,
    decline_code: Option<String>,
}

impl StripeClient {
    pub fn new(secret_key: String, api_base: &str) -> anyhow::Result<Self> {
        let api_base = Url::parse(api_base)?;
        if api_base.cannot_be_a_base() {
            anyhow::bail!("Stripe API base {api_base} cannot hold a path");
        }
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            secret_key,
            api_base,
        })
    }

    /// `{base}/v1/{segments...}`, each segment percent-encoded so ids can
    /// never address another resource.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("v1").extend(segments);
        }
        url
    }

    async fn send(
        request: reqwest::RequestBuilder,
        context: &'static str,
    ) -> StripeResult<reqwest::Response> {
        request
            .send()
            .await
            .map_err(|source| StripeError::Transport { context, source })
    }

    async fn decode<T: DeserializeOwned>(
        resp: reqwest::Response,
        context: &'static str,
    ) -> StripeResult<T> {
        resp.json()
            .await
            .map_err(|source| StripeError::Transport { context, source })
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &'static str,
    ) -> StripeResult<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .or_else(|| resp.headers().get("stripe-request-id"))
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let details = serde_json::from_str::<StripeErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);
        let (error_type, error_code, error_param, error_message, decline_code) = match details {
            Some(d) => (d.type_, d.code, d.param, d.message, d.decline_code),
            None => (None, None, None, None, None),
        };

        // The raw body is not logged: card errors can echo request parameters.
        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error_type = ?error_type,
            stripe_error_code = ?error_code,
            stripe_error_param = ?error_param,
            stripe_error_message = ?error_message,
            stripe_decline_code = ?decline_code,
            context = %context,
            "stripe api request failed"
        );

        Err(StripeError::Api {
            context,
            status: status.as_u16(),
            message: error_message.unwrap_or_else(|| "unknown error".to_string()),
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
    }

    fn form_post<T: serde::Serialize + ?Sized>(
        &self,
        url: Url,
        body: &T,
    ) -> reqwest::RequestBuilder {
        self.authorized(self.http.post(url))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(body)
    }

    /// Creates a customer, with an email when one is known.
    pub async fn create_customer(&self, email: Option<&str>) -> StripeResult<StripeCustomer> {
        // https://stripe.com/docs/api/customers/create
        const CONTEXT: &str = "create customer";
        let mut body: Vec<(&str, String)> = Vec::new();
        if let Some(email) = email {
            body.push(("email", email.to_string()));
        }

        let request = self.form_post(self.endpoint(&["customers"]), &body);
        let resp = Self::ensure_success(Self::send(request, CONTEXT).await?, CONTEXT).await?;
        Self::decode(resp, CONTEXT).await
    }

    /// Exchanges raw card fields for a single-use token.
    pub async fn create_card_token(&self, card: &CardDetails) -> StripeResult<StripeToken> {
        // https://stripe.com/docs/api/tokens/create_card
        const CONTEXT: &str = "create card token";
        let request = self.form_post(self.endpoint(&["tokens"]), &card_token_form(card));
        let resp = Self::ensure_success(Self::send(request, CONTEXT).await?, CONTEXT).await?;
        Self::decode(resp, CONTEXT).await
    }

    /// Attaches a token to the customer as a new card source.
    pub async fn create_source(
        &self,
        customer_id: &str,
        token_id: &str,
    ) -> StripeResult<StripeCardSource> {
        // https://stripe.com/docs/api/cards/create
        const CONTEXT: &str = "attach card source";
        let body = [("source", token_id.to_string())];
        let request = self.form_post(self.endpoint(&["customers", customer_id, "sources"]), &body);
        let resp = Self::ensure_success(Self::send(request, CONTEXT).await?, CONTEXT).await?;
        Self::decode(resp, CONTEXT).await
    }

    /// Returns `None` when the customer does not exist or has been deleted.
    pub async fn retrieve_customer(
        &self,
        customer_id: &str,
    ) -> StripeResult<Option<StripeCustomer>> {
        // https://stripe.com/docs/api/customers/retrieve
        const CONTEXT: &str = "retrieve customer";
        let request = self.authorized(self.http.get(self.endpoint(&["customers", customer_id])));
        let resp = Self::send(request, CONTEXT).await?;

        if resp.status() == StatusCode::NOT_FOUND {
            warn!(customer_id, "stripe customer not found");
            return Ok(None);
        }
        let resp = Self::ensure_success(resp, CONTEXT).await?;

        let customer: StripeCustomer = Self::decode(resp, CONTEXT).await?;
        if customer.deleted {
            warn!(customer_id, "stripe customer has been deleted");
            return Ok(None);
        }

        Ok(Some(customer))
    }

    pub async fn create_charge(&self, charge: &NewCharge) -> StripeResult<StripeCharge> {
        // https://stripe.com/docs/api/charges/create
        // https://stripe.com/docs/api/idempotent_requests
        const CONTEXT: &str = "create charge";
        let request = self
            .form_post(self.endpoint(&["charges"]), &charge_form(charge))
            .header("Idempotency-Key", charge.idempotency_key.as_str());
        let resp = Self::ensure_success(Self::send(request, CONTEXT).await?, CONTEXT).await?;
        Self::decode(resp, CONTEXT).await
    }
}

fn card_token_form(card: &CardDetails) -> Vec<(&'static str, String)> {
    vec![
        ("card[name]", card.name.clone()),
        ("card[number]", card.number.clone()),
        ("card[exp_month]", card.exp_month.clone()),
        ("card[exp_year]", card.exp_year.clone()),
        ("card[cvc]", card.cvc.clone()),
    ]
}

fn charge_form(charge: &NewCharge) -> Vec<(&'static str, String)> {
    let mut body = vec![
        ("amount", charge.amount.to_string()),
        ("currency", charge.currency.clone()),
        ("customer", charge.customer_id.clone()),
        ("source", charge.source.clone()),
    ];
    if let Some(description) = &charge.description {
        body.push(("description", description.clone()));
    }
    body
}
