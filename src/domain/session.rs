use crate::error::{BoostError, Result};
use serde_json::Value;
use std::fmt;

const TOKEN_KEYS: [&str; 3] = ["snap_token", "snapToken", "SnapToken"];
const REDIRECT_KEYS: [&str; 3] = ["redirect_url", "redirectUrl", "RedirectUrl"];

/// Bearer token of the signed-in franchisor.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Blank tokens count as "not signed in".
    pub fn from_optional(token: Option<String>) -> Option<Self> {
        token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(Self)
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// The listing being boosted and the credential to act on it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEntity {
    pub id: String,
    pub credential: Option<Credential>,
}

impl TargetEntity {
    pub fn new(id: impl Into<String>, credential: Option<Credential>) -> Self {
        Self {
            id: id.into(),
            credential,
        }
    }
}

/// Handle for one payment attempt, issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSession {
    pub session_token: String,
    pub redirect_url: Option<String>,
}

impl PaymentSession {
    /// Builds a session from the initiation response body.
    ///
    /// The backend has shipped several casings of the same fields; the first
    /// non-empty one wins. A missing token is an initiation failure.
    pub fn from_response(body: &Value) -> Result<Self> {
        let session_token = first_string(body, &TOKEN_KEYS).ok_or_else(|| {
            BoostError::Initiation("Payment token not available".to_string())
        })?;
        Ok(Self {
            session_token,
            redirect_url: first_string(body, &REDIRECT_KEYS),
        })
    }
}

fn first_string(body: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Private view of a listing, as returned to its owner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntitySnapshot {
    raw: Value,
}

impl EntitySnapshot {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    /// True only when the boosted flag is the JSON boolean `true`.
    pub fn is_boosted(&self) -> bool {
        ["is_boosted", "isBoosted"]
            .iter()
            .any(|key| self.raw.get(*key) == Some(&Value::Bool(true)))
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }
}
