use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw query parameters of the provisioning endpoint. Parameter names follow
/// the public contract (`card`, `month`, `year`, `code`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisionCustomerQuery {
    pub user: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub card: Option<String>,
    pub month: Option<String>,
    pub year: Option<String>,
    pub code: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProvisionRequestError {
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),
}

/// Card fields handed to the processor for tokenization.
#[derive(Clone, PartialEq, Eq)]
pub struct CardDetails {
    pub name: String,
    pub number: String,
    pub exp_month: String,
    pub exp_year: String,
    pub cvc: String,
}

impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDetails")
            .field("name", &self.name)
            .field("number", &redact_card_number(&self.number))
            .field("exp_month", &self.exp_month)
            .field("exp_year", &self.exp_year)
            .field("cvc", &"[redacted]")
            .finish()
    }
}

fn redact_card_number(number: &str) -> String {
    let digits: Vec<char> = number.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return "[redacted]".to_string();
    }
    let last4: String = digits[digits.len() - 4..].iter().collect();
    format!("****{last4}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionCustomerModel {
    pub user_id: String,
    pub email: Option<String>,
    pub card: CardDetails,
    pub phone: Option<String>,
}

impl ProvisionCustomerQuery {
    pub fn into_model(self) -> Result<ProvisionCustomerModel, ProvisionRequestError> {
        let user_id = required(self.user, "user")?;
        let card = CardDetails {
            name: required(self.name, "name")?,
            number: required(self.card, "card")?,
            exp_month: required(self.month, "month")?,
            exp_year: required(self.year, "year")?,
            cvc: required(self.code, "code")?,
        };

        Ok(ProvisionCustomerModel {
            user_id,
            email: present(self.email),
            card,
            phone: present(self.phone),
        })
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(
    value: Option<String>,
    name: &'static str,
) -> Result<String, ProvisionRequestError> {
    present(value).ok_or(ProvisionRequestError::MissingParameter(name))
}

/// Fields merged into a user record once a customer has been provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserCustomerLink {
    pub customer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}
