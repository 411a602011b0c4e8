use super::package::PaymentPackage;
use super::session::{Credential, EntitySnapshot, PaymentSession};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Marker id given to the injected checkout script so later loads can find it.
pub const CHECKOUT_SCRIPT_ID: &str = "checkout-widget-script";

/// The REST backend as seen by the boost flow.
#[async_trait]
pub trait BoostBackend: Send + Sync {
    /// Opens a payment session for `package` on `entity_id`. One round trip, no retries.
    async fn initiate_boost(
        &self,
        entity_id: &str,
        package: PaymentPackage,
        credential: &Credential,
    ) -> Result<PaymentSession>;

    /// Fetches the owner's view of the listing, including its boosted flag.
    async fn fetch_private_entity(
        &self,
        entity_id: &str,
        credential: &Credential,
    ) -> Result<EntitySnapshot>;
}

/// Description of the checkout script to inject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTag {
    pub id: &'static str,
    pub src: String,
    pub client_key: Option<String>,
}

impl ScriptTag {
    pub fn new(src: impl Into<String>, client_key: Option<String>) -> Self {
        Self {
            id: CHECKOUT_SCRIPT_ID,
            src: src.into(),
            client_key: client_key.filter(|k| !k.is_empty()),
        }
    }

    /// Attributes set on the tag. `data-client-key` only appears when a key is configured.
    pub fn attributes(&self) -> Vec<(&'static str, &str)> {
        let mut attrs = vec![("id", self.id), ("src", self.src.as_str())];
        if let Some(key) = &self.client_key {
            attrs.push(("data-client-key", key.as_str()));
        }
        attrs
    }
}

/// Where the checkout script lives and gets executed.
#[async_trait]
pub trait ScriptHost: Send + Sync {
    /// Whether the checkout entry point is already callable.
    fn entry_point_ready(&self) -> bool;

    /// Performs one script load. Not cancellable once started.
    async fn load_script(&self, tag: &ScriptTag) -> Result<()>;
}

/// How the checkout widget reported back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetOutcome {
    Success,
    Pending,
    /// Carries the widget's own diagnostic, which is logged and never shown.
    Error(String),
    Closed,
}

/// Third-party checkout that takes over once a session exists.
#[async_trait]
pub trait CheckoutWidget: Send + Sync {
    async fn pay(&self, session: &PaymentSession) -> WidgetOutcome;
}

/// Timer used between poll attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub type SharedBackend = Arc<dyn BoostBackend>;
pub type SharedScriptHost = Arc<dyn ScriptHost>;
pub type SharedWidget = Arc<dyn CheckoutWidget>;
pub type SharedSleeper = Arc<dyn Sleeper>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_tag_without_client_key() {
        let tag = ScriptTag::new("https://cdn/snap.js", Some(String::new()));
        assert_eq!(tag.client_key, None);
        assert_eq!(
            tag.attributes(),
            vec![("id", CHECKOUT_SCRIPT_ID), ("src", "https://cdn/snap.js")]
        );
    }

    #[test]
    fn test_script_tag_with_client_key() {
        let tag = ScriptTag::new("https://cdn/snap.js", Some("SB-key".into()));
        assert!(tag.attributes().contains(&("data-client-key", "SB-key")));
    }
}
