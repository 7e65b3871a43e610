use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use cascade::{
    CascadeEngine, Form, ParameterName,
    metrics::EvaluationTimer,
    processing::CascadeOutcome,
    render::RenderedChoices,
    script::{DEFAULT_SCRIPT_TIMEOUT, ScriptExecutor},
    value::ValueSnapshot,
};
use clap::Args;
use jsscript::{JsScriptCapability, ScriptApproval};
use serde::Serialize;

use crate::formfile;

/// Arguments shared by the subcommands that evaluate a form.
#[derive(Args, Debug)]
pub struct EngineArgs {
    /// Path to the form definition, as YAML, or JSON if it ends in ".json".
    #[arg(long)]
    pub form: PathBuf,

    /// Current value of a parameter, as NAME=VALUE. Give a name more than once for a multiple
    /// selection.
    #[arg(long = "value")]
    pub values: Vec<String>,

    /// Time limit of each script run, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_SCRIPT_TIMEOUT.as_millis() as u64)]
    pub script_timeout_ms: u64,

    /// Run unsandboxed scripts without approval.
    #[arg(long)]
    pub approve_unsandboxed: bool,
}

/// Everything needed to evaluate the form given by [EngineArgs].
pub struct Loaded {
    pub form: Form,
    pub engine: CascadeEngine,
    pub snapshot: ValueSnapshot,
    pub timer: Arc<EvaluationTimer>,
}

impl EngineArgs {
    /// Loads the form and values, and builds an engine running JavaScript. The caller must hold
    /// a [jsscript::ScriptIsolate] for the current thread while evaluating.
    pub fn load(&self) -> Result<Loaded> {
        let form = formfile::load_form(&self.form)?;
        let snapshot = formfile::parse_values(&self.values)?;

        let approval = if self.approve_unsandboxed {
            ScriptApproval::trusting_all()
        } else {
            ScriptApproval::new()
        };
        let timer = Arc::new(EvaluationTimer::new());
        let executor = ScriptExecutor::new(Arc::new(JsScriptCapability::new(approval)))
            .with_sink(timer.clone())
            .with_timeout(Duration::from_millis(self.script_timeout_ms));
        log::debug!("Scripts time out after {:?}.", executor.timeout());

        Ok(Loaded {
            form,
            engine: CascadeEngine::new(executor),
            snapshot,
            timer,
        })
    }
}

pub fn log_timings(timer: &EvaluationTimer) {
    let summary = timer.snapshot();
    log::info!(
        "Ran {} primary script(s) ({} failed, mean {:?}) and {} fallback script(s) ({} failed).",
        summary.primary.count,
        summary.primary.failures,
        summary.primary.mean(),
        summary.fallback.count,
        summary.fallback.failures,
    );
}

/// One parameter's entry in the command output.
#[derive(Serialize)]
pub struct RenderedParameter<'a> {
    pub name: &'a ParameterName,
    pub random_name: &'a str,
    #[serde(flatten)]
    pub rendered: &'a RenderedChoices,
}

/// Entries of `outcome`, in form order.
pub fn in_form_order<'a>(
    form: &'a Form,
    outcome: &'a CascadeOutcome,
) -> Vec<RenderedParameter<'a>> {
    form.parameters()
        .iter()
        .filter_map(|parameter| {
            outcome
                .get(parameter.name().as_ref())
                .map(|rendered| RenderedParameter {
                    name: parameter.name(),
                    random_name: parameter.random_name().as_ref(),
                    rendered,
                })
        })
        .collect()
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}
