//! Compiling choice scripts, and turning what a [v8::TryCatch] caught into Rust errors.

/// Name that compiled choice scripts report in exception locations.
const RESOURCE_NAME: &str = "choice-script";

fn script_origin<'scope>(
    scope: &mut v8::PinScope<'scope, '_>,
) -> Option<v8::ScriptOrigin<'scope>> {
    let resource_name: v8::Local<v8::Value> = v8::String::new(scope, RESOURCE_NAME)?.cast();
    Some(v8::ScriptOrigin::new(
        scope,
        resource_name,
        0,
        0,
        false,
        -1,
        None,
        false,
        false,
        false,
        None,
    ))
}

/// Allocates `value` as a JavaScript string.
pub fn v8_string<'scope>(
    scope: &mut v8::PinScope<'scope, '_>,
    value: &str,
) -> ScriptExceptionResult<v8::Local<'scope, v8::String>> {
    v8::tc_scope!(let try_catch, scope);
    v8::String::new(try_catch, value).or_thrown(try_catch)
}

/// Compiles `source` as the body of a function whose parameters are `param_names`, so that
/// `return` in a choice script returns its result.
pub fn compile_function_body<'scope>(
    scope: &mut v8::PinScope<'scope, '_>,
    param_names: &[&str],
    source: &str,
) -> ScriptExceptionResult<v8::Local<'scope, v8::Function>> {
    v8::tc_scope!(let try_catch, scope);
    let source_v8 = v8::String::new(try_catch, source).or_thrown(try_catch)?;
    let origin = script_origin(try_catch).or_thrown(try_catch)?;
    let mut body = v8::script_compiler::Source::new(source_v8, Some(&origin));

    let params_v8 = param_names
        .iter()
        .map(|param| v8::String::new(try_catch, param))
        .collect::<Option<Vec<_>>>()
        .or_thrown(try_catch)?;

    v8::script_compiler::compile_function(
        try_catch,
        &mut body,
        &params_v8,
        &[],
        v8::script_compiler::CompileOptions::NoCompileOptions,
        v8::script_compiler::NoCacheReason::NoReason,
    )
    .or_thrown(try_catch)
}

pub type ScriptExceptionResult<T> = std::result::Result<T, ScriptException>;

/// Why a v8 operation produced no value.
#[derive(Debug)]
pub enum ScriptException {
    /// The operation failed without anything being caught.
    NoneCaught,
    /// The watchdog terminated execution.
    Terminated,
    Thrown {
        value: Option<String>,
        message: Option<String>,
        line: Option<usize>,
    },
}

impl ScriptException {
    fn from_try_catch<'scope, 'iso, 'obj, 'pin>(
        try_catch: &mut v8::PinnedRef<'pin, v8::TryCatch<'scope, 'obj, v8::HandleScope<'iso>>>,
    ) -> Self {
        if try_catch.has_terminated() {
            return ScriptException::Terminated;
        }
        if !try_catch.has_caught() {
            return ScriptException::NoneCaught;
        }

        let value = try_catch
            .exception()
            .map(|exception| exception.to_rust_string_lossy(try_catch));
        let (message, line) = match try_catch.message() {
            Some(message) => (
                Some(message.get(try_catch).to_rust_string_lossy(try_catch)),
                message.get_line_number(try_catch),
            ),
            None => (None, None),
        };

        ScriptException::Thrown {
            value,
            message,
            line,
        }
    }
}

impl std::fmt::Display for ScriptException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptException::NoneCaught => write!(f, "v8 operation failed without an exception"),
            ScriptException::Terminated => write!(f, "script execution was terminated"),
            ScriptException::Thrown {
                value,
                message,
                line,
            } => {
                write!(f, "uncaught {}", value.as_deref().unwrap_or("exception"))?;
                if let Some(message) = message {
                    write!(f, " ({message})")?;
                }
                if let Some(line) = line {
                    write!(f, " on line {line} of {RESOURCE_NAME}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ScriptException {}

pub trait OrThrown<T> {
    /// Converts `None`, as v8 returns in place of a `MaybeLocal`, into the [ScriptException]
    /// caught by `try_catch`. `try_catch` must be the scope the value was produced in.
    fn or_thrown<'scope, 'iso, 'obj, 'pin>(
        self,
        try_catch: &mut v8::PinnedRef<'pin, v8::TryCatch<'scope, 'obj, v8::HandleScope<'iso>>>,
    ) -> ScriptExceptionResult<T>;
}

impl<T> OrThrown<T> for Option<T> {
    fn or_thrown<'scope, 'iso, 'obj, 'pin>(
        self,
        try_catch: &mut v8::PinnedRef<'pin, v8::TryCatch<'scope, 'obj, v8::HandleScope<'iso>>>,
    ) -> ScriptExceptionResult<T> {
        self.ok_or_else(|| ScriptException::from_try_catch(try_catch))
    }
}
