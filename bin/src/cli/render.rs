use anyhow::Result;
use clap::Args;

use super::engineargs::{self, EngineArgs};

/// Evaluates every parameter of a form, as for its first display, and prints the rendered
/// choices as JSON.
#[derive(Args, Debug)]
pub struct Command {
    #[command(flatten)]
    engine: EngineArgs,
}

pub fn run(cmd: &Command) -> Result<()> {
    jsscript::init_v8();
    let script_isolate = jsscript::ScriptIsolate::for_current_thread()?;

    let loaded = cmd.engine.load()?;
    let outcome = loaded.engine.evaluate_all(&loaded.form, &loaded.snapshot);
    engineargs::print_json(&engineargs::in_form_order(&loaded.form, &outcome))?;
    engineargs::log_timings(&loaded.timer);

    drop(script_isolate);
    Ok(())
}
