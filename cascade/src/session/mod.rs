//! Serialised evaluation for a single form session.

#[cfg(test)]
mod tests;

use std::sync::{
    Mutex,
    atomic::{AtomicU64, Ordering},
};

use hashbrown::HashMap;

use crate::{
    form::Form,
    param::ParameterName,
    processing::{CascadeEngine, CascadeOutcome, ContinueIntent},
    value::{FormValue, ValueSnapshot},
};

/// Result of a value change request to a [FormSession].
#[derive(Debug, Eq, PartialEq)]
pub enum SessionOutcome {
    Completed(CascadeOutcome),
    /// A newer change of the same parameter arrived before this one completed. Its results are
    /// discarded.
    Superseded,
}

/// One user's form instance. Evaluations within a session run one at a time, and a value
/// change supersedes any earlier change of the same parameter that has not yet completed.
///
/// Sessions share nothing mutable with each other.
pub struct FormSession {
    form: Form,
    engine: CascadeEngine,
    next_ticket: AtomicU64,
    /// Latest ticket issued per parameter of the form.
    latest: Mutex<HashMap<ParameterName, u64>>,
    /// Held for the duration of each evaluation.
    evaluation: Mutex<()>,
}

impl FormSession {
    pub fn new(form: Form, engine: CascadeEngine) -> Self {
        Self {
            form,
            engine,
            next_ticket: AtomicU64::new(0),
            latest: Mutex::new(HashMap::new()),
            evaluation: Mutex::new(()),
        }
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    /// Evaluates every parameter, for the first display of the form.
    pub fn initial_render(&self, snapshot: &ValueSnapshot) -> CascadeOutcome {
        let _guard = self.lock_evaluation();
        self.engine.evaluate_all(&self.form, snapshot)
    }

    /// Runs the cascade for a change of `parameter`'s value, once any evaluation already in
    /// progress has completed.
    pub fn on_value_changed(
        &self,
        parameter: &str,
        new_value: FormValue,
        snapshot: &ValueSnapshot,
    ) -> SessionOutcome {
        let Some(changed) = self.form.get(parameter) else {
            log::debug!("Ignoring change of {parameter:?}, which is not in the form.");
            return SessionOutcome::Completed(CascadeOutcome::default());
        };
        let ticket = self.issue_ticket(changed.name());
        let intent = LatestTicket {
            session: self,
            parameter,
            ticket,
        };

        let _guard = self.lock_evaluation();
        if !intent.do_continue() {
            log::debug!("Change #{ticket} of {parameter:?} superseded before it started.");
            return SessionOutcome::Superseded;
        }

        match self
            .engine
            .on_value_changed_with(&self.form, parameter, new_value, snapshot, &intent)
        {
            Some(outcome) if intent.do_continue() => SessionOutcome::Completed(outcome),
            _ => {
                log::debug!("Change #{ticket} of {parameter:?} superseded, discarding results.");
                SessionOutcome::Superseded
            }
        }
    }

    fn issue_ticket(&self, parameter: &ParameterName) -> u64 {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest
            .lock()
            .expect("failed to lock session tickets")
            .insert(parameter.clone(), ticket);
        ticket
    }

    fn is_latest(&self, parameter: &str, ticket: u64) -> bool {
        self.latest
            .lock()
            .expect("failed to lock session tickets")
            .get(parameter)
            .is_some_and(|latest| *latest == ticket)
    }

    fn lock_evaluation(&self) -> std::sync::MutexGuard<'_, ()> {
        // A panicking evaluation leaves nothing inconsistent behind the guard.
        self.evaluation
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

struct LatestTicket<'a> {
    session: &'a FormSession,
    parameter: &'a str,
    ticket: u64,
}

impl ContinueIntent for LatestTicket<'_> {
    fn do_continue(&self) -> bool {
        self.session.is_latest(self.parameter, self.ticket)
    }
}
