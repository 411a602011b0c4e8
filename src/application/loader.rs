use crate::domain::ports::{ScriptTag, SharedScriptHost};
use crate::error::{BoostError, Result};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

const LOAD_ABANDONED: &str = "Failed to load the checkout script";

type LoadResult = Option<Result<()>>;

enum LoadState {
    Absent,
    Loading(watch::Receiver<LoadResult>),
    Loaded,
}

struct Inner {
    host: SharedScriptHost,
    tag: ScriptTag,
    state: Mutex<LoadState>,
}

/// Makes sure the checkout script is loaded exactly once per host.
///
/// Clones share the same load state, so every flow on a page should be handed
/// a clone of one loader. Concurrent callers attach to the single in-flight
/// load and all observe its outcome. A failed load resets the state, so a
/// later call starts a fresh attempt.
#[derive(Clone)]
pub struct WidgetLoader {
    inner: Arc<Inner>,
}

impl WidgetLoader {
    pub fn new(host: SharedScriptHost, tag: ScriptTag) -> Self {
        Self {
            inner: Arc::new(Inner {
                host,
                tag,
                state: Mutex::new(LoadState::Absent),
            }),
        }
    }

    pub fn tag(&self) -> &ScriptTag {
        &self.inner.tag
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.inner.lock_state(), LoadState::Loaded)
    }

    /// Resolves once the checkout entry point is callable.
    pub async fn ensure_loaded(&self) -> Result<()> {
        let mut pending = {
            let mut state = self.inner.lock_state();
            if matches!(*state, LoadState::Loaded) {
                return Ok(());
            }
            if self.inner.host.entry_point_ready() {
                *state = LoadState::Loaded;
                return Ok(());
            }
            match &*state {
                LoadState::Loading(rx) => {
                    debug!(id = self.inner.tag.id, "Attaching to in-flight checkout script load");
                    rx.clone()
                }
                _ => {
                    let (tx, rx) = watch::channel(None);
                    *state = LoadState::Loading(rx.clone());
                    self.spawn_load(tx);
                    rx
                }
            }
        };

        let outcome = match pending.wait_for(Option::is_some).await {
            Ok(result) => result.clone(),
            Err(_) => None,
        };
        outcome.unwrap_or_else(|| {
            self.inner.forget_abandoned(&pending);
            Err(BoostError::Load(LOAD_ABANDONED.to_string()))
        })
    }

    // The load runs detached so an abandoned caller cannot cancel it halfway.
    fn spawn_load(&self, tx: watch::Sender<LoadResult>) {
        let inner = Arc::clone(&self.inner);
        info!(src = %inner.tag.src, client_key = inner.tag.client_key.is_some(), "Injecting checkout script");
        tokio::spawn(async move {
            let result = inner.host.load_script(&inner.tag).await;
            {
                let mut state = inner.lock_state();
                *state = match &result {
                    Ok(()) => LoadState::Loaded,
                    Err(e) => {
                        warn!(src = %inner.tag.src, error = %e, "Checkout script failed to load");
                        LoadState::Absent
                    }
                };
            }
            tx.send_replace(Some(result));
        });
    }
}

impl Inner {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, LoadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The load task died without reporting; let the next call start over.
    fn forget_abandoned(&self, pending: &watch::Receiver<LoadResult>) {
        let mut state = self.lock_state();
        if matches!(&*state, LoadState::Loading(rx) if rx.same_channel(pending)) {
            warn!(src = %self.tag.src, "Checkout script load ended without a result");
            *state = LoadState::Absent;
        }
    }
}
