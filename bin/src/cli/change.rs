use anyhow::{Result, bail};
use cascade::{
    session::{FormSession, SessionOutcome},
    value::FormValue,
};
use clap::Args;

use super::engineargs::{self, EngineArgs};

/// Changes the value of one parameter and prints the re-rendered choices of every parameter
/// that depends on it, as JSON.
#[derive(Args, Debug)]
pub struct Command {
    #[command(flatten)]
    engine: EngineArgs,

    /// Name of the parameter whose value changed.
    #[arg(long)]
    parameter: String,

    /// New value of the parameter. Give more than once for a multiple selection.
    #[arg(long)]
    new_value: Vec<String>,
}

pub fn run(cmd: &Command) -> Result<()> {
    jsscript::init_v8();
    let script_isolate = jsscript::ScriptIsolate::for_current_thread()?;

    let loaded = cmd.engine.load()?;
    if loaded.form.get(&cmd.parameter).is_none() {
        log::warn!("Parameter {:?} is not in the form.", cmd.parameter);
    }
    let new_value = match cmd.new_value.as_slice() {
        [single] => FormValue::Single(single.clone()),
        [] => FormValue::Single(String::new()),
        multiple => FormValue::Multiple(multiple.to_vec()),
    };

    let session = FormSession::new(loaded.form, loaded.engine);
    let outcome = match session.on_value_changed(&cmd.parameter, new_value, &loaded.snapshot) {
        SessionOutcome::Completed(outcome) => outcome,
        SessionOutcome::Superseded => bail!("change of {:?} was superseded", cmd.parameter),
    };
    engineargs::print_json(&engineargs::in_form_order(session.form(), &outcome))?;

    engineargs::log_timings(&loaded.timer);

    drop(script_isolate);
    Ok(())
}
