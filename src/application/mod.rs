//! Application layer containing the boost purchase orchestration.
//!
//! `WidgetLoader` keeps the checkout script loaded once per host, `StatusPoller`
//! waits for the backend to confirm a boost, and `BoostFlow` sequences both
//! around the payment session and the checkout hand-off.

pub mod flow;
pub mod loader;
pub mod poller;
