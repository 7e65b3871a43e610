use std::{cell::Cell, sync::Arc};

use googletest::prelude::*;
use map_macro::hashbrown::hash_map;
use serde_json::{Value, json};

use super::*;
use crate::{
    render::{EvaluationStatus, Selection},
    script::ScriptError,
    testutil::{
        FakeCapability, cascade_param, cascade_param_with, choice_param, name, reference_param,
    },
};

fn engine(capability: &Arc<FakeCapability>) -> CascadeEngine {
    CascadeEngine::new(ScriptExecutor::new(capability.clone()))
}

/// Responds with two choices derived from the value bound to `upstream`.
fn derived_from(
    upstream: &'static str,
) -> impl Fn(&ScriptBinding) -> std::result::Result<Value, ScriptError> {
    move |binding: &ScriptBinding| {
        let value = binding.get(upstream).unwrap_or_default();
        Ok(json!([format!("{value}-1"), format!("{value}-2")]))
    }
}

fn country_form() -> Form {
    Form::new(vec![
        choice_param("COUNTRY", "country"),
        cascade_param("REGION", "region", "COUNTRY"),
        cascade_param("CITY", "city", "REGION"),
    ])
    .expect("invalid form")
}

fn country_capability() -> Arc<FakeCapability> {
    Arc::new(
        FakeCapability::new()
            .returning("country", json!(["uk", "fr"]))
            .responding("region", derived_from("COUNTRY"))
            .responding("city", derived_from("REGION")),
    )
}

#[gtest]
#[test_log::test]
fn test_transitive_propagation() {
    let capability = country_capability();
    let form = country_form();

    let outcome = engine(&capability).on_value_changed(
        &form,
        "COUNTRY",
        "fr".into(),
        &[(name("COUNTRY"), "uk"), (name("REGION"), "uk-1")].into_iter().collect(),
    );

    expect_that!(
        outcome
            .results
            .iter()
            .map(|(name, rendered)| (name.to_string(), rendered.form_value()))
            .collect::<HashMap<_, _>>(),
        eq(&hash_map! {
            "REGION".to_string() => "fr-1".to_string(),
            "CITY".to_string() => "fr-1-1".to_string(),
        })
    );
    expect_that!(
        outcome.get("REGION").map(|r| r.choices.values().join(" ")),
        some(eq("fr-1 fr-2"))
    );
    // CITY sees the value newly selected for REGION, not the stale one.
    expect_that!(
        outcome.get("CITY").map(|r| r.selection.clone()),
        some(eq(&Selection::Single("fr-1-1".into())))
    );
    expect_that!(
        capability.scripts_called(),
        eq(&vec!["region".to_string(), "city".to_string()])
    );
}

#[gtest]
#[test_log::test]
fn test_idempotent() {
    let capability = country_capability();
    let form = country_form();
    let engine = engine(&capability);
    let snapshot: ValueSnapshot = [(name("COUNTRY"), "uk")].into_iter().collect();

    let first = engine.on_value_changed(&form, "COUNTRY", "fr".into(), &snapshot);
    let second = engine.on_value_changed(&form, "COUNTRY", "fr".into(), &snapshot);

    expect_that!(first, eq(&second));
    // No caching: both requests ran the scripts.
    expect_that!(capability.calls().len(), eq(4));
}

#[gtest]
#[test_log::test]
fn test_cycle_terminates() {
    let capability = Arc::new(
        FakeCapability::new()
            .returning("a", json!(["a"]))
            .returning("b", json!(["b"])),
    );
    let form = Form::new(vec![
        cascade_param("A", "a", "B"),
        cascade_param("B", "b", "A"),
    ])
    .expect("invalid form");

    let outcome =
        engine(&capability).on_value_changed(&form, "A", "x".into(), &ValueSnapshot::new());

    expect_that!(outcome.len(), eq(1));
    expect_that!(outcome.get("B"), some(anything()));
    expect_that!(capability.scripts_called(), eq(&vec!["b".to_string()]));
}

#[gtest]
#[test_log::test]
fn test_dangling_reference_binds_empty_string() {
    let capability = Arc::new(FakeCapability::new().returning("c", json!(["c"])));
    let form = Form::new(vec![
        choice_param("A", "a"),
        cascade_param("C", "c", "A, ghost"),
    ])
    .expect("invalid form");

    let rendered = engine(&capability)
        .evaluate(&form, "C", &[(name("A"), "1")].into_iter().collect())
        .expect("C is in the form");

    expect_that!(rendered.is_failed(), is_false());
    expect_that!(
        capability.calls()[0].binding,
        eq(&vec![
            ("A".to_string(), "1".to_string()),
            ("ghost".to_string(), String::new()),
        ])
    );
}

#[gtest]
#[test_log::test]
fn test_binding_is_restricted_to_references() {
    let capability = Arc::new(FakeCapability::new().returning("c", json!([])));
    let form = Form::new(vec![
        choice_param("A", "a"),
        choice_param("B", "b"),
        cascade_param("C", "c", "B"),
    ])
    .expect("invalid form");

    engine(&capability).evaluate(
        &form,
        "C",
        &[(name("A"), "1"), (name("B"), "2")].into_iter().collect(),
    );

    expect_that!(
        capability.calls()[0].binding,
        eq(&vec![("B".to_string(), "2".to_string())])
    );
}

#[gtest]
#[test_log::test]
fn test_failure_is_marked_and_does_not_abort_cascade() {
    let capability = Arc::new(
        FakeCapability::new()
            .failing("b")
            .failing("b_fallback")
            .returning("c", json!(["c"])),
    );
    let form = Form::new(vec![
        choice_param("A", "a"),
        cascade_param_with("B", "b", "b_fallback", "A", "PT_CHECKBOX"),
        cascade_param("C", "c", "A"),
    ])
    .expect("invalid form");

    let outcome =
        engine(&capability).on_value_changed(&form, "A", "1".into(), &ValueSnapshot::new());

    let b = outcome.get("B").expect("B was evaluated");
    expect_that!(b.status, eq(EvaluationStatus::Failed));
    expect_that!(b.choices.is_empty(), is_true());
    expect_that!(b.form_value(), eq(""));
    expect_that!(outcome.get("C").map(|c| c.is_failed()), some(eq(false)));
}

#[gtest]
#[test_log::test]
fn test_reference_parameter_accepts_scalar() {
    let capability = Arc::new(
        FakeCapability::new().responding("html", |binding| {
            Ok(json!(format!("<b>{}</b>", binding.get("A").unwrap_or_default())))
        }),
    );
    let form = Form::new(vec![
        choice_param("A", "a"),
        reference_param("INFO", "html", "A", "ET_FORMATTED_HTML"),
    ])
    .expect("invalid form");

    let outcome =
        engine(&capability).on_value_changed(&form, "A", "hi".into(), &ValueSnapshot::new());

    let info = outcome.get("INFO").expect("INFO was evaluated");
    expect_that!(info.choices.values(), eq(&vec!["<b>hi</b>"]));
    expect_that!(info.selection, eq(&Selection::None));
}

#[gtest]
#[test_log::test]
fn test_evaluate_all_in_form_order() {
    let capability = country_capability();
    let form = country_form();

    let outcome = engine(&capability).evaluate_all(&form, &ValueSnapshot::new());

    expect_that!(outcome.len(), eq(3));
    expect_that!(
        capability.scripts_called(),
        eq(&vec!["country".to_string(), "region".to_string(), "city".to_string()])
    );
    expect_that!(
        outcome.get("CITY").map(|r| r.form_value()),
        some(eq("uk-1-1"))
    );
}

#[gtest]
#[test_log::test]
fn test_evaluate_all_keeps_snapshot_values() {
    let capability = country_capability();
    let form = country_form();

    let outcome = engine(&capability)
        .evaluate_all(&form, &[(name("COUNTRY"), "fr")].into_iter().collect());

    expect_that!(
        outcome.get("REGION").map(|r| r.form_value()),
        some(eq("fr-1"))
    );
}

#[gtest]
fn test_evaluate_unknown_parameter() {
    let capability = country_capability();

    expect_that!(
        engine(&capability).evaluate(&country_form(), "NOPE", &ValueSnapshot::new()),
        none()
    );
    expect_that!(capability.calls(), is_empty());
}

struct StopAfter(Cell<usize>);

impl ContinueIntent for StopAfter {
    fn do_continue(&self) -> bool {
        let remaining = self.0.get();
        self.0.set(remaining.saturating_sub(1));
        remaining > 0
    }
}

#[gtest]
#[test_log::test]
fn test_intent_stops_cascade() {
    let capability = country_capability();

    let outcome = engine(&capability).on_value_changed_with(
        &country_form(),
        "COUNTRY",
        "fr".into(),
        &ValueSnapshot::new(),
        &StopAfter(Cell::new(1)),
    );

    expect_that!(outcome, none());
    expect_that!(capability.scripts_called(), eq(&vec!["region".to_string()]));
}
