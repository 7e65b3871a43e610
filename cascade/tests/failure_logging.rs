//! Log records emitted while recovering from script failures.
//!
//! Runs as its own test binary so that the capturing logger below is the process's only logger.

use std::{cell::RefCell, sync::Arc, sync::Once, time::Duration};

use googletest::prelude::*;
use log::Level;
use serde_json::{Value, json};
use unochoice_cascade::{
    ParameterName,
    choices::ScalarResult,
    param::{ScriptPair, SecureScript},
    script::{ScriptBinding, ScriptCapability, ScriptError, ScriptExecutor},
};

thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// Keeps the records logged by each thread, so that tests running in parallel see only their
/// own.
struct CapturingLogger;

impl log::Log for CapturingLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        RECORDS.with(|records| {
            records
                .borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
    }

    fn flush(&self) {}
}

static LOGGER: CapturingLogger = CapturingLogger;
static INIT_LOGGER: Once = Once::new();

fn capture_logs() {
    INIT_LOGGER.call_once(|| {
        log::set_logger(&LOGGER).expect("failed to install capturing logger");
        log::set_max_level(log::LevelFilter::Trace);
    });
    RECORDS.with(|records| records.borrow_mut().clear());
}

fn logged_at(level: Level) -> Vec<String> {
    RECORDS.with(|records| {
        records
            .borrow()
            .iter()
            .filter(|(record_level, _)| *record_level == level)
            .map(|(_, message)| message.clone())
            .collect()
    })
}

/// Fails every script except `return fallback`.
struct OnlyFallbackSucceeds;

impl ScriptCapability for OnlyFallbackSucceeds {
    fn execute(
        &self,
        script: &SecureScript,
        _binding: &ScriptBinding,
        _timeout: Duration,
    ) -> std::result::Result<Value, ScriptError> {
        if script.script == "return fallback" {
            Ok(json!(["x", "y"]))
        } else {
            Err(ScriptError::Failed {
                message: "always fails".into(),
            })
        }
    }
}

fn execute(fallback: &str) -> bool {
    let executor = ScriptExecutor::new(Arc::new(OnlyFallbackSucceeds));
    let parameter = ParameterName::try_from("P").expect("valid name");
    executor
        .execute(
            &parameter,
            &ScriptPair {
                primary: SecureScript::new("return primary", true),
                fallback: SecureScript::new(fallback, true),
            },
            &ScriptBinding::new(),
            ScalarResult::Reject,
        )
        .is_ok()
}

#[gtest]
fn test_primary_failure_logs_one_warning() {
    capture_logs();

    let succeeded = execute("return fallback");

    expect_that!(succeeded, eq(true));
    expect_that!(
        logged_at(Level::Warn),
        elements_are![contains_substring("always fails")]
    );
    expect_that!(logged_at(Level::Error), is_empty());
}

#[gtest]
fn test_blank_fallback_logs_warning_and_error() {
    capture_logs();

    let succeeded = execute("  ");

    expect_that!(succeeded, eq(false));
    expect_that!(logged_at(Level::Warn), len(eq(1)));
    expect_that!(
        logged_at(Level::Error),
        elements_are![contains_substring("no fallback script")]
    );
}

#[gtest]
fn test_failing_fallback_logs_warning_and_error() {
    capture_logs();

    let succeeded = execute("return nothing");

    expect_that!(succeeded, eq(false));
    expect_that!(logged_at(Level::Warn), len(eq(1)));
    expect_that!(
        logged_at(Level::Error),
        elements_are![contains_substring("Fallback script for parameter")]
    );
}
