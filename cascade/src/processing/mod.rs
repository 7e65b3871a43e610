//! Evaluation of a [Form]'s parameters, and of the cascade that follows a value change.

#[cfg(test)]
mod tests;

use hashbrown::HashMap;
use serde::Serialize;

use crate::{
    choices::ScalarResult,
    form::Form,
    param::{Parameter, ParameterName, Variant},
    render::{self, RenderOptions, RenderedChoices},
    script::{ScriptBinding, ScriptExecutor},
    value::{FormValue, ValueSnapshot},
};

/// Consulted between parameter evaluations to determine whether to carry on.
pub trait ContinueIntent {
    fn do_continue(&self) -> bool;
}

/// [ContinueIntent] that never interrupts.
pub struct AlwaysContinue;

impl ContinueIntent for AlwaysContinue {
    fn do_continue(&self) -> bool {
        true
    }
}

/// Rendered choices of every parameter affected by a single request. Has no order.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CascadeOutcome {
    pub results: HashMap<ParameterName, RenderedChoices>,
}

impl CascadeOutcome {
    pub fn get(&self, parameter: &str) -> Option<&RenderedChoices> {
        self.results.get(parameter)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Evaluates parameters of a [Form] using a [ScriptExecutor].
///
/// Nothing is cached between calls: every evaluation runs the parameter's script afresh.
pub struct CascadeEngine {
    executor: ScriptExecutor,
}

impl CascadeEngine {
    pub fn new(executor: ScriptExecutor) -> Self {
        Self { executor }
    }

    /// Re-evaluates every parameter that transitively references `parameter`, after its value
    /// changed to `new_value`. `snapshot` holds the values of the other parameters.
    ///
    /// Each affected parameter is evaluated once, in breadth first order, and its resulting
    /// selection is visible to the parameters evaluated after it.
    pub fn on_value_changed(
        &self,
        form: &Form,
        parameter: &str,
        new_value: FormValue,
        snapshot: &ValueSnapshot,
    ) -> CascadeOutcome {
        self.on_value_changed_with(form, parameter, new_value, snapshot, &AlwaysContinue)
            .unwrap_or_default()
    }

    /// As [Self::on_value_changed], but returns `None` if `intent` stops the cascade before it
    /// completes.
    pub fn on_value_changed_with(
        &self,
        form: &Form,
        parameter: &str,
        new_value: FormValue,
        snapshot: &ValueSnapshot,
        intent: &dyn ContinueIntent,
    ) -> Option<CascadeOutcome> {
        let mut working = snapshot.clone();
        match form.get(parameter) {
            Some(changed) => working.set(changed.name().clone(), new_value),
            None => log::debug!("Value change of {parameter:?}, which is not in the form."),
        }

        let affected = form.graph().cascade_from(parameter);
        log::debug!(
            "Value change of {parameter:?} affects {} parameter(s).",
            affected.len()
        );

        let mut outcome = CascadeOutcome::default();
        for name in affected {
            if !intent.do_continue() {
                log::debug!("Cascade from {parameter:?} stopped before evaluating {name:?}.");
                return None;
            }
            let Some(dependent) = form.get(name.as_ref()) else {
                continue;
            };
            let rendered = self.render_parameter(form, dependent, &working);
            if let Some(value) = rendered.held_value() {
                working.set(name.clone(), value);
            }
            outcome.results.insert(name, rendered);
        }

        Some(outcome)
    }

    /// Evaluates a single parameter with the values in `snapshot`. Returns `None` if the form
    /// has no such parameter.
    pub fn evaluate(
        &self,
        form: &Form,
        parameter: &str,
        snapshot: &ValueSnapshot,
    ) -> Option<RenderedChoices> {
        form.get(parameter)
            .map(|parameter| self.render_parameter(form, parameter, snapshot))
    }

    /// Evaluates every parameter in form order, as for the first display of a form.
    ///
    /// Parameters without a value in `snapshot` take the value selected by their own
    /// evaluation, which is visible to parameters later in the form.
    pub fn evaluate_all(&self, form: &Form, snapshot: &ValueSnapshot) -> CascadeOutcome {
        log::debug!("Evaluating all {} parameters of the form.", form.len());
        let mut working = snapshot.clone();
        let mut outcome = CascadeOutcome::default();

        for parameter in form.parameters() {
            let rendered = self.render_parameter(form, parameter, &working);
            if working.get(parameter.name().as_ref()).is_none()
                && let Some(value) = rendered.held_value()
            {
                working.set(parameter.name().clone(), value);
            }
            outcome.results.insert(parameter.name().clone(), rendered);
        }

        outcome
    }

    fn render_parameter(
        &self,
        form: &Form,
        parameter: &Parameter,
        snapshot: &ValueSnapshot,
    ) -> RenderedChoices {
        let binding = binding_for(form, parameter, snapshot);
        let scalar = match parameter.variant() {
            Variant::Reference => ScalarResult::AcceptAsSingleEntry,
            Variant::Choice | Variant::Cascade => ScalarResult::Reject,
        };
        let options = RenderOptions::from(parameter);

        match self
            .executor
            .execute(parameter.name(), parameter.scripts(), &binding, scalar)
        {
            Ok(choices) => render::render(&choices, &options),
            Err(_) => render::render_failed(&options),
        }
    }
}

/// Binds each of the parameter's references to its flat value in `snapshot`, or to the empty
/// string when it has none.
fn binding_for(form: &Form, parameter: &Parameter, snapshot: &ValueSnapshot) -> ScriptBinding {
    form.graph()
        .references_of(parameter.name().as_ref())
        .iter()
        .map(|upstream| {
            let value = snapshot.flat(upstream.as_ref()).unwrap_or_else(|| {
                log::debug!(
                    "No value for {upstream:?} referenced by {:?}, binding empty string.",
                    parameter.name()
                );
                String::new()
            });
            (upstream.clone(), value)
        })
        .collect()
}
