use crate::domain::ports::SharedSleeper;
use crate::error::{BoostError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Time between two status checks.
pub const POLL_INTERVAL: Duration = Duration::from_millis(2000);
/// Checks made before giving up, about two minutes at [`POLL_INTERVAL`].
pub const MAX_POLL_ATTEMPTS: u32 = 60;

/// Progress of one poll run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollState {
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub interval: Duration,
    pub active: bool,
}

impl PollState {
    fn idle() -> Self {
        Self {
            attempts_made: 0,
            max_attempts: MAX_POLL_ATTEMPTS,
            interval: POLL_INTERVAL,
            active: false,
        }
    }

    fn started() -> Self {
        Self {
            active: true,
            ..Self::idle()
        }
    }

    fn exhausted(&self) -> bool {
        self.attempts_made >= self.max_attempts
    }
}

/// How a poll run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Confirmed { attempts: u32 },
    TimedOut { attempts: u32 },
    Failed { attempts: u32, error: BoostError },
    Cancelled { attempts: u32 },
}

/// Receives the terminal notification of a poll run. Exactly one method is
/// called per run, and none at all when the run is stopped.
pub trait PollListener: Send + Sync + 'static {
    fn on_success(&self, state: PollState);
    fn on_timeout(&self, state: PollState);
    fn on_error(&self, state: PollState, error: BoostError);
}

struct ActivePoll {
    cancel: CancellationToken,
    handle: JoinHandle<PollOutcome>,
    state: watch::Receiver<PollState>,
}

/// Repeatedly asks whether a boost took effect, with a bounded attempt budget.
///
/// At most one run is active per poller; starting a new run stops the old one.
/// Failed checks are treated as misses until the budget runs out.
pub struct StatusPoller {
    sleeper: SharedSleeper,
    active: Option<ActivePoll>,
}

impl StatusPoller {
    pub fn new(sleeper: SharedSleeper) -> Self {
        Self {
            sleeper,
            active: None,
        }
    }

    pub fn start<C, Fut, L>(&mut self, check: C, listener: L)
    where
        C: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<bool>> + Send + 'static,
        L: PollListener,
    {
        self.stop();

        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(PollState::started());
        let handle = tokio::spawn(run(
            check,
            listener,
            self.sleeper.clone(),
            cancel.clone(),
            state_tx,
        ));
        self.active = Some(ActivePoll {
            cancel,
            handle,
            state: state_rx,
        });
    }

    /// Cancels the active run, if any. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(attempts = active.state.borrow().attempts_made, "Stopping status poll");
            active.cancel.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.handle.is_finished())
    }

    pub fn state(&self) -> PollState {
        self.active
            .as_ref()
            .map(|active| *active.state.borrow())
            .unwrap_or_else(PollState::idle)
    }

    /// Waits for the active run to end on its own and returns how it ended.
    pub async fn finished(&mut self) -> Option<PollOutcome> {
        let active = self.active.as_mut()?;
        let outcome = (&mut active.handle).await.ok();
        self.active = None;
        outcome
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run<C, Fut, L>(
    mut check: C,
    listener: L,
    sleeper: SharedSleeper,
    cancel: CancellationToken,
    state: watch::Sender<PollState>,
) -> PollOutcome
where
    C: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<bool>> + Send + 'static,
    L: PollListener,
{
    info!(interval_ms = POLL_INTERVAL.as_millis() as u64, max_attempts = MAX_POLL_ATTEMPTS, "Polling boost status");
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return cancelled(&state),
            _ = sleeper.sleep(POLL_INTERVAL) => {}
        }

        state.send_modify(|s| s.attempts_made += 1);
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return cancelled(&state),
            result = check() => result,
        };
        // A check that finished while stop() ran must not reach the listener.
        if cancel.is_cancelled() {
            return cancelled(&state);
        }

        let snapshot = *state.borrow();
        let attempts = snapshot.attempts_made;
        match result {
            Ok(true) => {
                info!(attempts, "Boost confirmed");
                let snapshot = finish(&state);
                listener.on_success(snapshot);
                return PollOutcome::Confirmed { attempts };
            }
            Ok(false) if snapshot.exhausted() => {
                warn!(attempts, "Boost not confirmed before the attempt budget ran out");
                let snapshot = finish(&state);
                listener.on_timeout(snapshot);
                return PollOutcome::TimedOut { attempts };
            }
            Ok(false) => debug!(attempts, "Boost not active yet"),
            Err(error) if snapshot.exhausted() => {
                warn!(attempts, error = %error, "Status check failed on the last attempt");
                let snapshot = finish(&state);
                listener.on_error(snapshot, error.clone());
                return PollOutcome::Failed { attempts, error };
            }
            Err(error) => debug!(attempts, error = %error, "Status check failed, retrying"),
        }
    }
}

fn finish(state: &watch::Sender<PollState>) -> PollState {
    state.send_modify(|s| s.active = false);
    *state.borrow()
}

fn cancelled(state: &watch::Sender<PollState>) -> PollOutcome {
    let snapshot = finish(state);
    PollOutcome::Cancelled {
        attempts: snapshot.attempts_made,
    }
}
