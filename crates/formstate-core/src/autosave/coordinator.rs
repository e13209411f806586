//! The save serialization state machine.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::task::{LocalSpawn, LocalSpawnExt};
use tracing::{debug, error, trace, warn};

use super::next_tick;
use crate::error::Result;
use crate::object::ObjectState;

/// Persists a form. Expected to read `changed_value()` when it runs.
pub type SaveCallback = Rc<dyn Fn(ObjectState) -> LocalBoxFuture<'static, anyhow::Result<()>>>;

#[derive(Clone)]
pub(crate) struct AutoSaveBinding {
    pub(crate) coordinator: AutoSaveCoordinator,
    pub(crate) callback: SaveCallback,
}

/// Where the coordinator is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoSavePhase {
    /// Nothing scheduled.
    #[default]
    Idle,
    /// A save is scheduled for the next tick and has not read its payload.
    Queued,
    /// A save callback is running.
    InFlight,
}

#[derive(Default)]
struct CoordinatorState {
    phase: AutoSavePhase,
    /// Form the queued or in-flight save belongs to.
    active: Option<ObjectState>,
    /// Forms that asked while busy, replayed by one follow-up pass.
    pending: Vec<ObjectState>,
    last_error: Option<String>,
    /// Number of save callbacks started.
    saves_started: u64,
}

struct Inner {
    spawner: Box<dyn LocalSpawn>,
    state: RefCell<CoordinatorState>,
}

/// Serializes auto-save requests so at most one save callback runs at a
/// time across every form bound to this coordinator.
///
/// Requests that arrive while a save is in flight are recorded as pending
/// and coalesced into a single follow-up pass after it completes. A request
/// for the form that is already queued is dropped, since the queued save has
/// not read its payload yet.
///
/// Construct one per application with the executor's spawner and share it
/// (cloning is cheap).
#[derive(Clone)]
pub struct AutoSaveCoordinator(Rc<Inner>);

impl AutoSaveCoordinator {
    pub fn new(spawner: impl LocalSpawn + 'static) -> Self {
        Self(Rc::new(Inner {
            spawner: Box::new(spawner),
            state: RefCell::new(CoordinatorState::default()),
        }))
    }

    #[inline]
    pub fn phase(&self) -> AutoSavePhase {
        self.0.state.borrow().phase
    }

    #[inline]
    pub fn is_in_flight(&self) -> bool {
        self.phase() == AutoSavePhase::InFlight
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        !self.0.state.borrow().pending.is_empty()
    }

    /// Message of the most recent failed save, cleared by the next success.
    pub fn last_error(&self) -> Option<String> {
        self.0.state.borrow().last_error.clone()
    }

    pub fn saves_started(&self) -> u64 {
        self.0.state.borrow().saves_started
    }

    /// Ask for `form` to be saved.
    ///
    /// Only dirty and valid forms with an auto-save binding are scheduled
    /// from idle. The callback runs one tick later.
    pub fn maybe_auto_save(&self, form: &ObjectState) -> Result<()> {
        let Some(binding) = form.auto_save_binding() else {
            trace!(key = form.key(), "form has no auto-save binding");
            return Ok(());
        };

        {
            let mut state = self.0.state.borrow_mut();
            match state.phase {
                AutoSavePhase::InFlight => {
                    trace!(key = form.key(), "save in flight, marking pending");
                    push_pending(&mut state.pending, form);
                    return Ok(());
                }
                AutoSavePhase::Queued => {
                    if state.active.as_ref().is_some_and(|active| active.ptr_eq(form)) {
                        trace!(key = form.key(), "save already queued, dropping request");
                    } else {
                        trace!(key = form.key(), "another form is queued, marking pending");
                        push_pending(&mut state.pending, form);
                    }
                    return Ok(());
                }
                AutoSavePhase::Idle => {}
            }
        }

        if !form.dirty() {
            trace!(key = form.key(), "form is clean, nothing to save");
            return Ok(());
        }
        if !form.valid() {
            trace!(key = form.key(), "form is invalid, not saving");
            return Ok(());
        }

        {
            let mut state = self.0.state.borrow_mut();
            state.phase = AutoSavePhase::Queued;
            state.active = Some(form.clone());
        }
        debug!(key = form.key(), "auto-save queued");

        let coordinator = self.clone();
        let form = form.clone();
        let spawned = self.0.spawner.spawn_local(async move {
            next_tick().await;
            coordinator.run_save(form, binding.callback).await;
        });
        if let Err(err) = spawned {
            error!(error = %err, "failed to schedule auto-save");
            let mut state = self.0.state.borrow_mut();
            state.phase = AutoSavePhase::Idle;
            state.active = None;
            return Err(err.into());
        }
        Ok(())
    }

    async fn run_save(self, form: ObjectState, callback: SaveCallback) {
        {
            let mut state = self.0.state.borrow_mut();
            state.phase = AutoSavePhase::InFlight;
            state.saves_started += 1;
        }
        debug!(key = form.key(), "auto-save in flight");
        let _guard = InFlightGuard(self.clone());

        let outcome = match callback(form.clone()).await {
            Ok(()) => None,
            Err(err) => {
                let message = format!("{err:#}");
                warn!(key = form.key(), error = %message, "auto-save failed");
                Some(message)
            }
        };
        self.0.state.borrow_mut().last_error = outcome;
    }

    /// Return to idle and schedule one follow-up pass for pending forms.
    /// Runs on every exit from the in-flight phase.
    fn finish(&self) {
        let pending = {
            let mut state = self.0.state.borrow_mut();
            state.phase = AutoSavePhase::Idle;
            state.active = None;
            std::mem::take(&mut state.pending)
        };
        debug!(pending = pending.len(), "auto-save finished");
        if pending.is_empty() {
            return;
        }

        let coordinator = self.clone();
        let spawned = self.0.spawner.spawn_local(async move {
            next_tick().await;
            for form in pending {
                if let Err(err) = coordinator.maybe_auto_save(&form) {
                    error!(key = form.key(), error = %err, "follow-up auto-save failed to schedule");
                }
            }
        });
        if let Err(err) = spawned {
            error!(error = %err, "failed to schedule follow-up auto-save");
        }
    }
}

fn push_pending(pending: &mut Vec<ObjectState>, form: &ObjectState) {
    if !pending.iter().any(|existing| existing.ptr_eq(form)) {
        pending.push(form.clone());
    }
}

/// Leaves the in-flight phase when dropped, whether the save completed,
/// failed or its future was dropped.
struct InFlightGuard(AutoSaveCoordinator);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.finish();
    }
}

impl fmt::Debug for AutoSaveCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.state.borrow();
        f.debug_struct("AutoSaveCoordinator")
            .field("phase", &state.phase)
            .field("pending", &state.pending.len())
            .field("saves_started", &state.saves_started)
            .finish()
    }
}
