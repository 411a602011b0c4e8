use super::loader::WidgetLoader;
use super::poller::{PollListener, PollState, StatusPoller};
use crate::domain::package::PaymentPackage;
use crate::domain::ports::{SharedBackend, SharedSleeper, SharedWidget, WidgetOutcome};
use crate::domain::session::{Credential, TargetEntity};
use crate::error::{BoostError, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

pub const STATUS_PREPARING: &str = "Preparing payment...";
pub const STATUS_OPENING: &str = "Opening checkout...";
pub const STATUS_PAYMENT_SUCCEEDED: &str = "Payment succeeded. Activating boost...";
pub const STATUS_PAYMENT_PENDING: &str = "Payment pending. Checking boost status...";
pub const STATUS_CHECKING: &str = "Checking boost status...";
pub const STATUS_DISMISSED: &str = "You closed the payment popup.";
pub const STATUS_BOOST_ACTIVE: &str = "Boost active.";

/// Where a boost attempt currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FlowState {
    #[default]
    Idle,
    Preparing,
    AwaitingWidget,
    WidgetSucceeded,
    WidgetPending,
    Polling,
    Resolved,
    TimedOut,
    Errored(BoostError),
}

impl FlowState {
    /// No further transition happens without a new `pay` or `close`.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            Self::Idle | Self::Resolved | Self::TimedOut | Self::Errored(_)
        )
    }
}

/// Caller-facing notifications, in the order they happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    Status(String),
    /// The checkout took over; the host may dismiss its own surface. The flow
    /// itself is not finished yet.
    ModalClosed,
    Boosted,
    TimedOut,
    Failed(String),
}

/// The status line and error line a host would render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowView {
    pub status: Option<String>,
    pub error: Option<String>,
}

struct FlowShared {
    state: watch::Sender<FlowState>,
    view: Mutex<FlowView>,
    events: mpsc::UnboundedSender<FlowEvent>,
    /// Bumped by every `pay` and `close`; a poll only reports for its own attempt.
    attempt: Mutex<u64>,
}

impl FlowShared {
    fn attempt(&self) -> MutexGuard<'_, u64> {
        self.attempt.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_attempt(&self) -> u64 {
        let mut attempt = self.attempt();
        *attempt += 1;
        *attempt
    }

    fn view(&self) -> MutexGuard<'_, FlowView> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, next: FlowState) {
        let previous = self.state.send_replace(next.clone());
        debug!(from = ?previous, to = ?next, "Boost flow transition");
    }

    fn status(&self, message: impl Into<String>) {
        let message = message.into();
        self.view().status = Some(message.clone());
        self.emit(FlowEvent::Status(message));
    }

    fn fail(&self, error: BoostError) {
        let message = error.to_string();
        self.view().error = Some(message.clone());
        self.transition(FlowState::Errored(error));
        self.emit(FlowEvent::Failed(message));
    }

    fn reset(&self) {
        *self.view() = FlowView::default();
    }

    // A dropped receiver only means nobody is listening.
    fn emit(&self, event: FlowEvent) {
        let _ = self.events.send(event);
    }
}

struct FlowListener {
    shared: Arc<FlowShared>,
    attempt: u64,
}

impl FlowListener {
    /// Holds the attempt lock while the outcome is applied, so a concurrent
    /// `close` or `pay` either waits for it or makes it a no-op.
    fn current(&self) -> Option<MutexGuard<'_, u64>> {
        let current = self.shared.attempt();
        if *current == self.attempt {
            Some(current)
        } else {
            debug!(attempt = self.attempt, current = *current, "Dropping outcome of a superseded poll");
            None
        }
    }
}

impl PollListener for FlowListener {
    fn on_success(&self, state: PollState) {
        let Some(_current) = self.current() else {
            return;
        };
        info!(attempts = state.attempts_made, "Boost is active");
        self.shared.status(STATUS_BOOST_ACTIVE);
        self.shared.transition(FlowState::Resolved);
        self.shared.emit(FlowEvent::Boosted);
    }

    fn on_timeout(&self, state: PollState) {
        let Some(_current) = self.current() else {
            return;
        };
        warn!(attempts = state.attempts_made, "Gave up waiting for boost confirmation");
        self.shared.status(BoostError::PollTimeout.to_string());
        self.shared.transition(FlowState::TimedOut);
        self.shared.emit(FlowEvent::TimedOut);
    }

    fn on_error(&self, state: PollState, error: BoostError) {
        let Some(_current) = self.current() else {
            return;
        };
        warn!(attempts = state.attempts_made, error = %error, "Boost status check failed");
        self.shared.fail(error);
    }
}

/// Drives one listing's boost purchase from the "pay" click to confirmation.
///
/// Steps run strictly in order: load the checkout, open a payment session,
/// hand the session to the checkout, then poll the backend until the listing
/// reports itself boosted. Failures never escape `pay`; they land in the
/// `Errored` state and the view's error line.
pub struct BoostFlow {
    loader: WidgetLoader,
    backend: SharedBackend,
    widget: SharedWidget,
    poller: StatusPoller,
    shared: Arc<FlowShared>,
}

impl BoostFlow {
    /// Creates the flow and the receiving end of its event stream.
    pub fn new(
        loader: WidgetLoader,
        backend: SharedBackend,
        widget: SharedWidget,
        sleeper: SharedSleeper,
    ) -> (Self, mpsc::UnboundedReceiver<FlowEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(FlowState::Idle);
        let flow = Self {
            loader,
            backend,
            widget,
            poller: StatusPoller::new(sleeper),
            shared: Arc::new(FlowShared {
                state,
                view: Mutex::new(FlowView::default()),
                events,
                attempt: Mutex::new(0),
            }),
        };
        (flow, rx)
    }

    pub fn state(&self) -> FlowState {
        self.shared.state.borrow().clone()
    }

    pub fn view(&self) -> FlowView {
        self.shared.view().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FlowState> {
        self.shared.state.subscribe()
    }

    pub fn poll_state(&self) -> PollState {
        self.poller.state()
    }

    /// Waits until the flow reaches a state it will not leave on its own.
    pub async fn settled(&self) -> FlowState {
        let mut rx = self.subscribe();
        let settled = match rx.wait_for(FlowState::is_settled).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        settled
    }

    /// Starts a boost purchase. Returns once the checkout has reported back;
    /// confirmation then continues in the background (see [`Self::settled`]).
    pub async fn pay(&mut self, target: &TargetEntity, package: PaymentPackage) -> FlowState {
        if let Err(error) = self.try_pay(target, package).await {
            warn!(entity = %target.id, error = %error, "Boost flow failed");
            self.shared.fail(error);
        }
        self.state()
    }

    /// The host surface went away: stop polling and forget what was shown.
    pub fn close(&mut self) {
        self.poller.stop();
        self.shared.next_attempt();
        self.shared.reset();
        self.shared.transition(FlowState::Idle);
    }

    async fn try_pay(&mut self, target: &TargetEntity, package: PaymentPackage) -> Result<()> {
        self.poller.stop();
        let attempt = self.shared.next_attempt();
        self.shared.reset();
        let credential = target.credential.as_ref().ok_or(BoostError::AuthRequired)?;

        self.shared.transition(FlowState::Preparing);
        self.shared.status(STATUS_PREPARING);
        info!(
            entity = %target.id,
            package = package.as_wire(),
            price = package.price(),
            "Starting boost payment"
        );

        self.loader.ensure_loaded().await?;
        let session = self
            .backend
            .initiate_boost(&target.id, package, credential)
            .await?;
        debug!(
            entity = %target.id,
            redirect = session.redirect_url.as_deref().unwrap_or("-"),
            "Payment session opened"
        );

        self.shared.status(STATUS_OPENING);
        self.shared.transition(FlowState::AwaitingWidget);
        self.shared.emit(FlowEvent::ModalClosed);

        match self.widget.pay(&session).await {
            WidgetOutcome::Success => {
                self.shared.transition(FlowState::WidgetSucceeded);
                self.shared.status(STATUS_PAYMENT_SUCCEEDED);
                self.start_polling(attempt, &target.id, credential.clone());
            }
            WidgetOutcome::Pending => {
                self.shared.transition(FlowState::WidgetPending);
                self.shared.status(STATUS_PAYMENT_PENDING);
                self.start_polling(attempt, &target.id, credential.clone());
            }
            WidgetOutcome::Error(diagnostic) => {
                error!(entity = %target.id, diagnostic = %diagnostic, "Checkout reported a payment failure");
                return Err(BoostError::Widget);
            }
            WidgetOutcome::Closed => {
                info!(entity = %target.id, "Checkout dismissed");
                self.shared.status(STATUS_DISMISSED);
                self.shared.transition(FlowState::Idle);
            }
        }
        Ok(())
    }

    // The widget's own success signal is not trusted; only the backend's
    // boosted flag resolves the flow.
    fn start_polling(&mut self, attempt: u64, entity_id: &str, credential: Credential) {
        self.shared.transition(FlowState::Polling);
        self.shared.status(STATUS_CHECKING);

        let backend = Arc::clone(&self.backend);
        let entity_id = entity_id.to_string();
        let check = move || {
            let backend = Arc::clone(&backend);
            let entity_id = entity_id.clone();
            let credential = credential.clone();
            async move {
                backend
                    .fetch_private_entity(&entity_id, &credential)
                    .await
                    .map(|snapshot| snapshot.is_boosted())
            }
        };
        self.poller.start(
            check,
            FlowListener {
                shared: Arc::clone(&self.shared),
                attempt,
            },
        );
    }
}
