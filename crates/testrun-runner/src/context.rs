//! Event bus and wait gates shared between the runner and its tasks.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use testrun_core::{EventKind, RunEvent, RunFailure, RunId};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::RunnerError;

type Listener = Arc<dyn Fn(&RunEvent) + Send + Sync>;

/// Lifecycle of the owning runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Idle,
    Running,
    Finished,
}

/// Combined state of every registered wait gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GateStatus {
    /// No gate is pending and none failed.
    Open,
    /// At least one gate has not fired yet.
    Pending,
    /// The first gate to fire with an error payload.
    Failed(EventKind, RunFailure),
}

#[derive(Default)]
struct Gates {
    /// Registrations still waiting on their event, per kind.
    pending: HashMap<EventKind, usize>,
    first_failure: Option<(EventKind, RunFailure)>,
}

struct Shared {
    run_id: RunId,
    phase: Mutex<Phase>,
    listeners: Mutex<HashMap<EventKind, Vec<Listener>>>,
    gates: Mutex<Gates>,
    /// Bumped whenever a gate is registered or fires.
    gate_tx: watch::Sender<u64>,
    finished: CancellationToken,
}

/// Handle to a runner's event bus and gate table.
///
/// Every task receives a clone as its last argument. Clones share state, and
/// two contexts compare equal when they belong to the same runner.
#[derive(Clone)]
pub struct RunContext {
    shared: Arc<Shared>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RunContext {
    pub(crate) fn new() -> Self {
        let (gate_tx, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                run_id: RunId::generate(),
                phase: Mutex::new(Phase::Idle),
                listeners: Mutex::new(HashMap::new()),
                gates: Mutex::new(Gates::default()),
                gate_tx,
                finished: CancellationToken::new(),
            }),
        }
    }

    /// Identifier of the owning run.
    pub fn run_id(&self) -> &RunId {
        &self.shared.run_id
    }

    /// Subscribe `listener` to events of `kind`.
    ///
    /// Listeners run synchronously inside [`emit`](Self::emit), in
    /// subscription order.
    pub fn on<F>(&self, kind: EventKind, listener: F)
    where
        F: Fn(&RunEvent) + Send + Sync + 'static,
    {
        lock(&self.shared.listeners)
            .entry(kind)
            .or_default()
            .push(Arc::new(listener));
    }

    /// Deliver `event` to its listeners, then resolve a pending gate.
    pub fn emit(&self, event: RunEvent) {
        let kind = event.kind();
        trace!(event = %kind, "Emitting event");

        // Listeners may subscribe or emit themselves, so call them unlocked.
        let listeners = lock(&self.shared.listeners)
            .get(&kind)
            .cloned()
            .unwrap_or_default();
        for listener in &listeners {
            listener(&event);
        }

        self.fire_gate(kind, event.failure());
    }

    /// Require `kind` to fire before the run may complete.
    ///
    /// Only valid while the pipeline is executing. An event of this kind
    /// carrying an error payload fails the whole run.
    pub fn wait_for_event(&self, kind: EventKind) -> Result<(), RunnerError> {
        if self.phase() != Phase::Running {
            return Err(RunnerError::NotRunning(kind));
        }

        debug!(event = %kind, "Registering wait gate");
        *lock(&self.shared.gates).pending.entry(kind).or_insert(0) += 1;
        self.notify_gates();
        Ok(())
    }

    /// Resolves once the owning run has settled.
    pub async fn finished(&self) {
        self.shared.finished.cancelled().await
    }

    /// Returns true once the owning run has settled.
    pub fn is_finished(&self) -> bool {
        self.phase() == Phase::Finished
    }

    fn fire_gate(&self, kind: EventKind, failure: Option<&RunFailure>) {
        {
            let mut guard = lock(&self.shared.gates);
            let gates = &mut *guard;
            // One emission settles every registration pending at this point.
            let Some(settled) = gates.pending.remove(&kind) else {
                return;
            };

            debug!(event = %kind, settled, failed = failure.is_some(), "Wait gate fired");
            if let Some(failure) = failure {
                if gates.first_failure.is_none() {
                    gates.first_failure = Some((kind, failure.clone()));
                }
            }
        }
        self.notify_gates();
    }

    fn notify_gates(&self) {
        self.shared
            .gate_tx
            .send_modify(|version| *version = version.wrapping_add(1));
    }

    pub(crate) fn subscribe_gates(&self) -> watch::Receiver<u64> {
        self.shared.gate_tx.subscribe()
    }

    pub(crate) fn gate_status(&self) -> GateStatus {
        let gates = lock(&self.shared.gates);
        if let Some((kind, failure)) = &gates.first_failure {
            GateStatus::Failed(kind.clone(), failure.clone())
        } else if !gates.pending.is_empty() {
            GateStatus::Pending
        } else {
            GateStatus::Open
        }
    }

    fn phase(&self) -> Phase {
        *lock(&self.shared.phase)
    }

    /// Move from idle to running. Fails if the runner was already started.
    pub(crate) fn begin(&self) -> Result<(), RunnerError> {
        let mut phase = lock(&self.shared.phase);
        if *phase != Phase::Idle {
            return Err(RunnerError::AlreadyRun);
        }
        *phase = Phase::Running;
        Ok(())
    }

    pub(crate) fn finish(&self) {
        *lock(&self.shared.phase) = Phase::Finished;
        self.shared.finished.cancel();
    }
}

impl PartialEq for RunContext {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for RunContext {}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.shared.run_id)
            .field("phase", &self.phase())
            .finish()
    }
}
