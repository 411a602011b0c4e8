use crate::domain::ports::{CheckoutWidget, ScriptHost, ScriptTag, WidgetOutcome};
use crate::domain::session::PaymentSession;
use crate::error::{BoostError, Result};
use async_trait::async_trait;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};

const LOAD_FAILED: &str = "Failed to load the checkout script";

/// Script host for processes without a page: the checkout counts as loaded
/// once its hosted script downloads successfully.
pub struct HttpScriptHost {
    http: reqwest::Client,
    ready: AtomicBool,
}

impl HttpScriptHost {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BoostError::Config(format!("HTTP client build failed: {e}")))?;
        Ok(Self {
            http,
            ready: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl ScriptHost for HttpScriptHost {
    fn entry_point_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    async fn load_script(&self, tag: &ScriptTag) -> Result<()> {
        debug!(attributes = ?tag.attributes(), "Fetching checkout script");
        let response = self
            .http
            .get(&tag.src)
            .send()
            .await
            .map_err(|e| BoostError::Load(format!("{LOAD_FAILED}: {e}")))?;
        if !response.status().is_success() {
            return Err(BoostError::Load(format!(
                "{LOAD_FAILED}: HTTP {}",
                response.status()
            )));
        }
        response
            .bytes()
            .await
            .map_err(|e| BoostError::Load(format!("{LOAD_FAILED}: {e}")))?;
        self.ready.store(true, Ordering::Release);
        Ok(())
    }
}

/// Terminal checkout: tells the user where to pay and leaves confirmation to
/// the backend, so it always reports the payment as pending.
pub struct RedirectCheckout<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> RedirectCheckout<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl<W: Write + Send> CheckoutWidget for RedirectCheckout<W> {
    async fn pay(&self, session: &PaymentSession) -> WidgetOutcome {
        let line = match &session.redirect_url {
            Some(url) => format!("Complete the payment at: {url}"),
            None => format!("Complete the payment with token: {}", session.session_token),
        };
        let written = {
            let mut out = self
                .out
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            writeln!(out, "{line}").and_then(|()| out.flush())
        };
        match written {
            Ok(()) => {
                info!("Checkout handed to the user");
                WidgetOutcome::Pending
            }
            Err(e) => WidgetOutcome::Error(format!("could not show checkout: {e}")),
        }
    }
}
