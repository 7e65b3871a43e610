//! Script-driven choice parameters for job configuration forms, where a change to one
//! parameter's value re-evaluates the choices of every parameter that references it.

pub mod choices;
pub mod form;
pub mod metrics;
pub mod param;
pub mod processing;
pub mod render;
pub mod script;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testutil;
pub mod value;

pub use form::Form;
pub use param::{Parameter, ParameterName};
pub use processing::CascadeEngine;
