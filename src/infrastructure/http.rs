use crate::config::Config;
use crate::domain::package::PaymentPackage;
use crate::domain::ports::BoostBackend;
use crate::domain::session::{Credential, EntitySnapshot, PaymentSession};
use crate::error::{BoostError, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const INITIATION_FAILED: &str = "Failed to initiate boost";
const FETCH_PRIVATE_FAILED: &str = "Failed to fetch private franchise by ID";

#[derive(Serialize)]
struct BoostRequest<'a> {
    package: &'a str,
}

/// [`BoostBackend`] over the franchise REST API.
#[derive(Debug, Clone)]
pub struct HttpBoostBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBoostBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BoostError::Config(format!("HTTP client build failed: {e}")))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.api_url.clone(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl BoostBackend for HttpBoostBackend {
    async fn initiate_boost(
        &self,
        entity_id: &str,
        package: PaymentPackage,
        credential: &Credential,
    ) -> Result<PaymentSession> {
        let url = format!("{}/boost/{}", self.base_url, entity_id);
        debug!(%url, package = package.as_wire(), "Requesting payment session");

        let response = self
            .http
            .post(&url)
            .bearer_auth(credential.token())
            .json(&BoostRequest {
                package: package.as_wire(),
            })
            .send()
            .await
            .map_err(|e| {
                warn!(entity_id, error = %e, "Boost initiation request failed");
                BoostError::Initiation(format!("{INITIATION_FAILED}: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = rejection_message(&body);
            warn!(entity_id, status = %status, message = %message, "Boost initiation rejected");
            return Err(BoostError::Initiation(message));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| BoostError::Initiation(format!("{INITIATION_FAILED}: {e}")))?;
        PaymentSession::from_response(&body)
    }

    async fn fetch_private_entity(
        &self,
        entity_id: &str,
        credential: &Credential,
    ) -> Result<EntitySnapshot> {
        let url = format!("{}/franchise/{}", self.base_url, entity_id);

        let response = self
            .http
            .get(&url)
            .query(&[("showPrivate", "true")])
            .bearer_auth(credential.token())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| BoostError::PollCheck(format!("{FETCH_PRIVATE_FAILED}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            debug!(entity_id, status = %status, "Private franchise fetch rejected");
            return Err(BoostError::PollCheck(FETCH_PRIVATE_FAILED.to_string()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| BoostError::PollCheck(format!("{FETCH_PRIVATE_FAILED}: {e}")))?;
        Ok(EntitySnapshot::new(body))
    }
}

/// Picks the message to show for a rejected initiation.
///
/// `error` then `message` from a JSON body; otherwise the body itself, and
/// the generic message when there is nothing to show.
fn rejection_message(body: &str) -> String {
    let text = body.trim();
    let message = match serde_json::from_str::<Value>(text) {
        Ok(value) => ["error", "message"]
            .iter()
            .filter_map(|key| value.get(*key))
            .find_map(|field| match field {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Null | Value::Bool(false) | Value::String(_) => None,
                other => Some(other.to_string()),
            })
            .unwrap_or_else(|| match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            }),
        Err(_) => text.to_string(),
    };
    if message.is_empty() {
        INITIATION_FAILED.to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_message_prefers_error_field() {
        assert_eq!(
            rejection_message(r#"{"error":"insufficient balance","message":"ignored"}"#),
            "insufficient balance"
        );
        assert_eq!(rejection_message(r#"{"message":"franchise not found"}"#), "franchise not found");
        assert_eq!(
            rejection_message(r#"{"error":"","message":"fallback"}"#),
            "fallback"
        );
    }

    #[test]
    fn test_rejection_message_falls_back_to_body() {
        assert_eq!(rejection_message(r#"{"code":42}"#), r#"{"code":42}"#);
        assert_eq!(rejection_message(r#""quota exceeded""#), "quota exceeded");
        assert_eq!(rejection_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_rejection_message_generic_when_empty() {
        assert_eq!(rejection_message(""), INITIATION_FAILED);
        assert_eq!(rejection_message("  \n"), INITIATION_FAILED);
        assert_eq!(rejection_message("null"), INITIATION_FAILED);
        assert_eq!(rejection_message(r#""""#), INITIATION_FAILED);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend = HttpBoostBackend::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8080");
    }
}
