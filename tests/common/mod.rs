#![allow(dead_code)]

use async_trait::async_trait;
use franchiso_boost::application::flow::{BoostFlow, FlowEvent};
use franchiso_boost::application::loader::WidgetLoader;
use franchiso_boost::domain::package::PaymentPackage;
use franchiso_boost::domain::ports::{
    BoostBackend, CheckoutWidget, ScriptHost, ScriptTag, SharedBackend, Sleeper, WidgetOutcome,
};
use franchiso_boost::domain::session::{Credential, EntitySnapshot, PaymentSession, TargetEntity};
use franchiso_boost::error::{BoostError, Result};
use franchiso_boost::infrastructure::clock::TokioSleeper;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Script host that loads instantly, or fails with the given message.
#[derive(Default)]
pub struct FakeHost {
    ready: AtomicBool,
    failure: Option<String>,
    pub loads: AtomicU32,
}

impl FakeHost {
    pub fn working() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            failure: Some(message.to_string()),
            ..Self::default()
        })
    }

    pub fn loads(&self) -> u32 {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScriptHost for FakeHost {
    fn entry_point_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn load_script(&self, _tag: &ScriptTag) -> Result<()> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        match &self.failure {
            Some(message) => Err(BoostError::Load(message.clone())),
            None => {
                self.ready.store(true, Ordering::SeqCst);
                Ok(())
            }
        }
    }
}

/// Backend with a canned initiation answer and a scripted sequence of checks.
pub struct ScriptedBackend {
    initiation: Result<PaymentSession>,
    boosted_from: Option<u32>,
    failing_checks: Vec<u32>,
    check_stall: Option<Duration>,
    initiations: AtomicU32,
    checks: AtomicU32,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            initiation: Ok(PaymentSession {
                session_token: "snap-token".into(),
                redirect_url: Some("https://pay.example/snap-token".into()),
            }),
            boosted_from: None,
            failing_checks: Vec::new(),
            check_stall: None,
            initiations: AtomicU32::new(0),
            checks: AtomicU32::new(0),
        }
    }

    pub fn rejecting(mut self, message: &str) -> Self {
        self.initiation = Err(BoostError::Initiation(message.to_string()));
        self
    }

    /// The `n`-th status check (1-based) and every later one reports boosted.
    pub fn boosted_from(mut self, n: u32) -> Self {
        self.boosted_from = Some(n);
        self
    }

    pub fn failing_checks(mut self, checks: &[u32]) -> Self {
        self.failing_checks = checks.to_vec();
        self
    }

    /// Every check blocks its worker thread for `duration` before answering,
    /// so it cannot be cancelled part way.
    pub fn stalling_checks(mut self, duration: Duration) -> Self {
        self.check_stall = Some(duration);
        self
    }

    pub fn initiations(&self) -> u32 {
        self.initiations.load(Ordering::SeqCst)
    }

    pub fn checks(&self) -> u32 {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BoostBackend for ScriptedBackend {
    async fn initiate_boost(
        &self,
        _entity_id: &str,
        _package: PaymentPackage,
        _credential: &Credential,
    ) -> Result<PaymentSession> {
        self.initiations.fetch_add(1, Ordering::SeqCst);
        self.initiation.clone()
    }

    async fn fetch_private_entity(
        &self,
        entity_id: &str,
        _credential: &Credential,
    ) -> Result<EntitySnapshot> {
        let n = self.checks.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(stall) = self.check_stall {
            std::thread::sleep(stall);
        }
        if self.failing_checks.contains(&n) {
            return Err(BoostError::PollCheck(
                "Failed to fetch private franchise by ID".into(),
            ));
        }
        let boosted = self.boosted_from.is_some_and(|from| n >= from);
        Ok(EntitySnapshot::new(json!({"id": entity_id, "is_boosted": boosted})))
    }
}

/// Checkout that immediately reports a scripted outcome; the last one repeats.
pub struct FakeWidget {
    outcomes: Vec<WidgetOutcome>,
    tokens: Mutex<Vec<String>>,
}

impl FakeWidget {
    pub fn reporting(outcome: WidgetOutcome) -> Arc<Self> {
        Self::scripted(vec![outcome])
    }

    pub fn scripted(outcomes: Vec<WidgetOutcome>) -> Arc<Self> {
        assert!(!outcomes.is_empty());
        Arc::new(Self {
            outcomes,
            tokens: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl CheckoutWidget for FakeWidget {
    async fn pay(&self, session: &PaymentSession) -> WidgetOutcome {
        let mut tokens = self.tokens.lock().unwrap();
        let turn = tokens.len().min(self.outcomes.len() - 1);
        tokens.push(session.session_token.clone());
        self.outcomes[turn].clone()
    }
}

/// Sleeper that only yields, for tests talking to real sockets.
pub struct InstantSleeper;

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, _duration: Duration) {
        tokio::task::yield_now().await;
    }
}

pub fn loader(host: Arc<FakeHost>) -> WidgetLoader {
    WidgetLoader::new(host, ScriptTag::new("https://cdn.example/snap.js", None))
}

pub fn flow_with(
    host: Arc<FakeHost>,
    backend: Arc<ScriptedBackend>,
    widget: Arc<FakeWidget>,
) -> (BoostFlow, mpsc::UnboundedReceiver<FlowEvent>) {
    let backend: SharedBackend = backend;
    BoostFlow::new(loader(host), backend, widget, Arc::new(TokioSleeper))
}

pub fn signed_in(id: &str) -> TargetEntity {
    TargetEntity::new(id, Some(Credential::new("access-token")))
}

pub fn drain(events: &mut mpsc::UnboundedReceiver<FlowEvent>) -> Vec<FlowEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}
