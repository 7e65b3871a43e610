//! JavaScript implementation of [cascade::script::ScriptCapability], backed by [v8].

mod approval;
mod capability;
mod exception;
mod isolate;
mod watchdog;

pub use approval::{ScriptApproval, ScriptDigest};
pub use capability::JsScriptCapability;
pub use isolate::{IsolateError, ScriptIsolate, init_v8, init_v8_for_testing};
