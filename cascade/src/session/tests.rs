use std::{
    sync::{Arc, Mutex, mpsc},
    thread,
};

use googletest::prelude::*;
use serde_json::json;

use super::*;
use crate::{
    script::ScriptExecutor,
    testutil::{FakeCapability, cascade_param, choice_param, name},
};

fn new_session(capability: Arc<FakeCapability>) -> FormSession {
    let form = Form::new(vec![
        choice_param("COUNTRY", "country"),
        cascade_param("REGION", "region", "COUNTRY"),
        cascade_param("CITY", "city", "REGION"),
        choice_param("SIZE", "size"),
        cascade_param("SHIRT", "shirt", "SIZE"),
    ])
    .expect("invalid form");
    FormSession::new(form, CascadeEngine::new(ScriptExecutor::new(capability)))
}

#[gtest]
#[test_log::test]
fn test_completed_changes() {
    let capability = Arc::new(
        FakeCapability::new()
            .returning("region", json!(["r"]))
            .returning("city", json!(["c"]))
            .returning("shirt", json!(["s"])),
    );
    let session = new_session(capability);

    let country = session.on_value_changed("COUNTRY", "uk".into(), &ValueSnapshot::new());
    let size = session.on_value_changed("SIZE", "L".into(), &ValueSnapshot::new());

    let SessionOutcome::Completed(country) = country else {
        panic!("expected COUNTRY change to complete");
    };
    expect_that!(country.len(), eq(2));
    let SessionOutcome::Completed(size) = size else {
        panic!("expected SIZE change to complete");
    };
    expect_that!(size.get("SHIRT"), some(anything()));
}

#[gtest]
#[test_log::test]
fn test_initial_render() {
    let capability = Arc::new(
        FakeCapability::new()
            .returning("country", json!(["uk"]))
            .returning("region", json!(["r"]))
            .returning("city", json!(["c"]))
            .returning("size", json!(["S", "M"]))
            .returning("shirt", json!(["s"])),
    );
    let session = new_session(capability);

    let outcome = session.initial_render(&ValueSnapshot::new());

    expect_that!(outcome.len(), eq(5));
    expect_that!(session.form().len(), eq(5));
}

#[gtest]
#[test_log::test]
fn test_newer_change_supersedes_in_flight_change() {
    let (started_tx, started_rx) = mpsc::channel::<()>();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let started_tx = Mutex::new(started_tx);
    let release_rx = Mutex::new(release_rx);
    let capability = Arc::new(
        FakeCapability::new()
            .responding("region", move |binding| {
                if binding.get("COUNTRY") == Some("uk") {
                    started_tx.lock().unwrap().send(()).unwrap();
                    release_rx.lock().unwrap().recv().unwrap();
                }
                Ok(json!(["r"]))
            })
            .returning("city", json!(["c"])),
    );
    let session = Arc::new(new_session(capability.clone()));

    // GIVEN: a change of COUNTRY that is part way through its cascade.
    let first = thread::spawn({
        let session = session.clone();
        move || session.on_value_changed("COUNTRY", "uk".into(), &ValueSnapshot::new())
    });
    started_rx.recv().unwrap();

    // WHEN: a newer change of COUNTRY is requested.
    let second = thread::spawn({
        let session = session.clone();
        move || session.on_value_changed("COUNTRY", "fr".into(), &ValueSnapshot::new())
    });
    while session.is_latest("COUNTRY", 1) {
        thread::yield_now();
    }
    release_tx.send(()).unwrap();

    // THEN: the first change is discarded without evaluating the rest of its cascade.
    expect_that!(first.join().unwrap(), eq(&SessionOutcome::Superseded));
    let SessionOutcome::Completed(outcome) = second.join().unwrap() else {
        panic!("expected the newer change to complete");
    };
    expect_that!(outcome.len(), eq(2));
    expect_that!(
        capability.scripts_called(),
        eq(&vec![
            "region".to_string(),
            "region".to_string(),
            "city".to_string(),
        ])
    );
}

#[gtest]
fn test_tickets_are_per_parameter() {
    let session = new_session(Arc::new(FakeCapability::new()));

    let country = session.issue_ticket(&name("COUNTRY"));
    let size = session.issue_ticket(&name("SIZE"));

    expect_that!(session.is_latest("COUNTRY", country), is_true());
    expect_that!(session.is_latest("SIZE", size), is_true());

    session.issue_ticket(&name("COUNTRY"));

    expect_that!(session.is_latest("COUNTRY", country), is_false());
    expect_that!(session.is_latest("SIZE", size), is_true());
}

#[gtest]
#[test_log::test]
fn test_change_of_unknown_parameter_issues_no_ticket() {
    let capability = Arc::new(FakeCapability::new());
    let session = new_session(capability.clone());

    let outcome = session.on_value_changed("GHOST", "x".into(), &ValueSnapshot::new());

    expect_that!(
        outcome,
        eq(&SessionOutcome::Completed(CascadeOutcome::default()))
    );
    expect_that!(
        session.latest.lock().expect("failed to lock session tickets").len(),
        eq(0)
    );
    expect_that!(capability.calls(), is_empty());
}
