use std::{sync::Arc, time::Duration};

use anyhow::Result;
use cascade::{
    CascadeEngine, Form,
    choices::ScalarResult,
    param::ScriptPair,
    script::ScriptExecutor,
    testutil::{cascade_param, choice_param, name},
    value::ValueSnapshot,
};
use googletest::prelude::*;
use serde_json::json;

use super::*;
use crate::isolate::{ScriptIsolate, init_v8_for_testing};

const TIMEOUT: Duration = Duration::from_secs(5);

fn sandboxed(source: &str) -> SecureScript {
    SecureScript::new(source, true)
}

fn binding(entries: &[(&str, &str)]) -> ScriptBinding {
    entries
        .iter()
        .map(|(key, value)| (name(key), value.to_string()))
        .collect()
}

#[gtest]
fn test_binding_values_are_named_arguments() -> Result<()> {
    init_v8_for_testing();
    let script_isolate = ScriptIsolate::for_current_thread()?;

    let capability = JsScriptCapability::default();
    let got = capability.execute(
        &sandboxed(r#"return [COUNTRY + "-1", COUNTRY + "-2", typeof REGION]"#),
        &binding(&[("COUNTRY", "uk"), ("REGION", "")]),
        TIMEOUT,
    );

    expect_that!(got, ok(eq(&json!(["uk-1", "uk-2", "string"]))));

    drop(script_isolate);
    Ok(())
}

#[gtest]
fn test_object_key_order_is_kept() -> Result<()> {
    init_v8_for_testing();
    let script_isolate = ScriptIsolate::for_current_thread()?;

    let capability = JsScriptCapability::default();
    let got = capability.execute(
        &sandboxed(r#"return {b: {value: "2", selected: true}, a: "1"}"#),
        &ScriptBinding::new(),
        TIMEOUT,
    )?;

    expect_that!(
        got.as_object().map(|o| o.keys().cloned().collect::<Vec<_>>()),
        some(eq(&vec!["b".to_string(), "a".to_string()]))
    );

    drop(script_isolate);
    Ok(())
}

#[gtest]
fn test_syntax_error_fails() -> Result<()> {
    init_v8_for_testing();
    let script_isolate = ScriptIsolate::for_current_thread()?;

    let capability = JsScriptCapability::default();
    let got = capability.execute(
        &sandboxed("I'm invalid JavaScript!"),
        &ScriptBinding::new(),
        TIMEOUT,
    );

    expect_that!(got, err(displays_as(starts_with("script failed"))));

    drop(script_isolate);
    Ok(())
}

#[gtest]
fn test_thrown_exception_fails() -> Result<()> {
    init_v8_for_testing();
    let script_isolate = ScriptIsolate::for_current_thread()?;

    let capability = JsScriptCapability::default();
    let got = capability.execute(
        &sandboxed(r#"throw new Error("boom")"#),
        &ScriptBinding::new(),
        TIMEOUT,
    );

    expect_that!(got, err(displays_as(contains_substring("boom"))));

    drop(script_isolate);
    Ok(())
}

#[gtest]
fn test_endless_script_times_out_and_isolate_recovers() -> Result<()> {
    init_v8_for_testing();
    let script_isolate = ScriptIsolate::for_current_thread()?;

    let capability = JsScriptCapability::default();
    let got = capability.execute(
        &sandboxed("while (true) {}"),
        &ScriptBinding::new(),
        Duration::from_millis(50),
    );

    expect_that!(
        got,
        err(displays_as(starts_with("script did not complete")))
    );

    let got = capability.execute(&sandboxed("return [1]"), &ScriptBinding::new(), TIMEOUT);

    expect_that!(got, ok(eq(&json!([1]))));

    drop(script_isolate);
    Ok(())
}

#[gtest]
fn test_unapproved_script_is_rejected() -> Result<()> {
    init_v8_for_testing();
    let script_isolate = ScriptIsolate::for_current_thread()?;

    let capability = JsScriptCapability::default();
    let script = SecureScript::new("return [1]", false);

    expect_that!(
        capability.execute(&script, &ScriptBinding::new(), TIMEOUT),
        err(displays_as(starts_with("script was rejected")))
    );

    capability.approval().preapprove("return [1]")?;

    expect_that!(
        capability.execute(&script, &ScriptBinding::new(), TIMEOUT),
        ok(eq(&json!([1])))
    );

    drop(script_isolate);
    Ok(())
}

#[gtest]
fn test_without_isolate() {
    init_v8_for_testing();

    let capability = JsScriptCapability::default();
    let got = capability.execute(&sandboxed("return []"), &ScriptBinding::new(), TIMEOUT);

    expect_that!(got, err(displays_as(contains_substring("running script"))));
}

#[gtest]
#[test_log::test]
fn test_fallback_script_runs_after_failure() -> Result<()> {
    init_v8_for_testing();
    let script_isolate = ScriptIsolate::for_current_thread()?;

    let executor = ScriptExecutor::new(Arc::new(JsScriptCapability::default()));
    let choices = executor.execute(
        &name("P"),
        &ScriptPair {
            primary: sandboxed(r#"throw new Error("unavailable")"#),
            fallback: sandboxed(r#"return ["x", "y"]"#),
        },
        &ScriptBinding::new(),
        ScalarResult::Reject,
    )?;

    expect_that!(choices.values(), eq(&vec!["x", "y"]));

    drop(script_isolate);
    Ok(())
}

#[gtest]
#[test_log::test]
fn test_cascade_with_javascript() -> Result<()> {
    init_v8_for_testing();
    let script_isolate = ScriptIsolate::for_current_thread()?;

    let form = Form::new(vec![
        choice_param("COUNTRY", r#"return ["uk", "fr"]"#),
        cascade_param(
            "CITY",
            r#"
                const cities = {uk: ["London", "Leeds"], fr: ["Paris"]};
                return cities[COUNTRY] || [];
            "#,
            "COUNTRY",
        ),
    ])?;
    let engine = CascadeEngine::new(ScriptExecutor::new(Arc::new(JsScriptCapability::default())));

    let outcome = engine.on_value_changed(&form, "COUNTRY", "uk".into(), &ValueSnapshot::new());

    expect_that!(
        outcome.get("CITY").map(|city| city.choices.labels().join(",")),
        some(eq("London,Leeds"))
    );

    drop(script_isolate);
    Ok(())
}
