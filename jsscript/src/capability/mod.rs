#[cfg(test)]
mod tests;

use std::time::Duration;

use anyhow::{Context, Result};
use cascade::{
    param::SecureScript,
    script::{ScriptBinding, ScriptCapability, ScriptError},
};

use crate::{
    approval::ScriptApproval,
    exception::{self, OrThrown},
    isolate::{self, ThreadIsolate},
    watchdog::Watchdog,
};

/// Runs choice scripts as JavaScript function bodies, in the calling thread's
/// [isolate::ScriptIsolate].
///
/// Each referenced parameter is passed as a string argument of the same name, and the
/// function's return value is the script's result. Every run gets a fresh context, so scripts
/// cannot leave state behind for each other.
#[derive(Debug, Default)]
pub struct JsScriptCapability {
    approval: ScriptApproval,
}

impl JsScriptCapability {
    pub fn new(approval: ScriptApproval) -> Self {
        Self { approval }
    }

    pub fn approval(&self) -> &ScriptApproval {
        &self.approval
    }
}

impl ScriptCapability for JsScriptCapability {
    fn execute(
        &self,
        script: &SecureScript,
        binding: &ScriptBinding,
        timeout: Duration,
    ) -> Result<serde_json::Value, ScriptError> {
        self.approval.check(script)?;
        isolate::with_thread_isolate(|thread_isolate| {
            run_with_deadline(thread_isolate, script, binding, timeout)
        })
        .context("running script")?
    }
}

fn run_with_deadline(
    thread_isolate: &mut ThreadIsolate,
    script: &SecureScript,
    binding: &ScriptBinding,
    timeout: Duration,
) -> Result<serde_json::Value, ScriptError> {
    let watchdog = Watchdog::start(thread_isolate.termination_handle(), timeout)?;
    let result = run_script(thread_isolate.isolate(), script, binding);
    if watchdog.finish() {
        thread_isolate.isolate().cancel_terminate_execution();
        return Err(ScriptError::Timeout { limit: timeout });
    }
    result.map_err(|err| ScriptError::Failed {
        message: format!("{err:#}"),
    })
}

fn run_script(
    isolate: &mut v8::OwnedIsolate,
    script: &SecureScript,
    binding: &ScriptBinding,
) -> Result<serde_json::Value> {
    v8::scope!(let scope, isolate);
    let ctx = v8::Context::new(scope, v8::ContextOptions::default());
    v8::scope_with_context!(let scope, scope, ctx);
    v8::tc_scope!(let try_catch, scope);

    let arg_names: Vec<&str> = binding.iter().map(|(name, _)| name.as_ref()).collect();
    let func = exception::compile_function_body(try_catch, &arg_names, &script.script)
        .context("compiling script")?;

    let args: Vec<v8::Local<v8::Value>> = binding
        .iter()
        .map(|(name, value)| -> Result<v8::Local<v8::Value>> {
            let value_v8 = exception::v8_string(try_catch, value)
                .with_context(|| format!("binding value of {name:?}"))?;
            Ok(value_v8.cast())
        })
        .collect::<Result<Vec<_>>>()?;

    let global = ctx.global(try_catch);
    let result_v8 = func
        .call(try_catch, global.cast(), &args)
        .or_thrown(try_catch)
        .context("calling script")?;

    let result: serde_json::Value =
        serde_v8::from_v8(try_catch, result_v8).context("converting script result")?;

    Ok(result)
}
