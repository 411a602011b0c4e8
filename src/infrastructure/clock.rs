use crate::domain::ports::Sleeper;
use async_trait::async_trait;
use std::time::Duration;

/// Sleeps on the tokio timer, so paused test clocks apply to it.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
