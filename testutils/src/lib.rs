//! Utilities used in tests in multiple crates within the workspace.

use std::fmt::Display;

/// Adapts [anyhow::Error] to [std::error::Error] so that it can be returned from [googletest]
/// tests that return `googletest::Result`.
#[derive(Debug)]
pub struct WrappedError(anyhow::Error);

pub trait WrapError<T> {
    fn wrap_error(self) -> std::result::Result<T, WrappedError>;
}

impl<T> WrapError<T> for anyhow::Result<T> {
    fn wrap_error(self) -> std::result::Result<T, WrappedError> {
        self.map_err(WrappedError::from)
    }
}

impl Display for WrappedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Includes the context chain, which is usually what explains a failed test.
        write!(f, "{:#}", self.0)
    }
}

impl std::error::Error for WrappedError {}

impl From<anyhow::Error> for WrappedError {
    fn from(value: anyhow::Error) -> Self {
        Self(value)
    }
}

/// Provides a representative value of a type for tests that only care about some of its fields.
pub trait DefaultForTest {
    fn default_for_test() -> Self;
}
