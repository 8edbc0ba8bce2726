//! Scenario tree mechanics: metadata injection, step ordering, teardown
//! unwinding, and run reporting.

use std::{
    future::ready,
    sync::{Arc, Mutex},
};

use rigging::{
    CheckFailure, ScenarioContext, ScenarioError, ScenarioSuite, StepFuture,
    harness::{AccessRule, TestApp},
};
use serde_json::json;

type Events = Arc<Mutex<Vec<String>>>;

fn record(events: &Events, label: &str) -> impl Fn(ScenarioContext) -> StepFuture + use<> {
    let events = Arc::clone(events);
    let label = label.to_owned();
    move |cx: ScenarioContext| -> StepFuture {
        events.lock().unwrap().push(label.clone());
        Box::pin(ready((cx, Ok(()))))
    }
}

#[tokio::test]
async fn static_method_binds_metadata_into_the_context() {
    let app = TestApp::builder().build();
    let suite = ScenarioSuite::new(Arc::clone(&app) as Arc<dyn rigging::Application>, "model", |s| {
        s.static_method("create", |s| {
            s.case("metadata is bound", |cx| {
                let method = cx
                    .method()
                    .ok_or_else(|| CheckFailure::new("no method metadata"))?;
                if method.is_static() && method.name() == "create" {
                    Ok(())
                } else {
                    Err(CheckFailure::new(format!("unexpected metadata: {method:?}")))
                }
            });
        });
        s.instance_method("save", |s| {
            s.case("metadata is bound", |cx| {
                let method = cx
                    .method()
                    .ok_or_else(|| CheckFailure::new("no method metadata"))?;
                if method.is_instance() && method.name() == "save" {
                    Ok(())
                } else {
                    Err(CheckFailure::new(format!("unexpected metadata: {method:?}")))
                }
            });
        });
    });

    suite.run().await.assert_success();
}

#[tokio::test]
async fn with_args_stores_the_argument_list() {
    let app = TestApp::builder().build();
    let suite = ScenarioSuite::new(Arc::clone(&app) as Arc<dyn rigging::Application>, "args", |s| {
        s.with_args([json!(1), json!("two")]);
        s.case("arguments are stored in order", |cx| {
            if cx.args() == [json!(1), json!("two")] {
                Ok(())
            } else {
                Err(CheckFailure::new(format!("unexpected args: {:?}", cx.args())))
            }
        });
    });

    suite.run().await.assert_success();
}

#[tokio::test]
async fn setups_run_in_registration_order_and_teardowns_unwind() {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let app = TestApp::builder().build();
    let suite = ScenarioSuite::new(Arc::clone(&app) as Arc<dyn rigging::Application>, "order", |s| {
        s.setup_with_teardown(record(&events, "outer-setup"), record(&events, "outer-teardown"));
        s.group("inner", |s| {
            s.setup_with_teardown(
                record(&events, "inner-setup"),
                record(&events, "inner-teardown"),
            );
            let events = Arc::clone(&events);
            s.case("records its execution", move |_| {
                events.lock().unwrap().push("case".to_owned());
                Ok(())
            });
        });
    });

    suite.run().await.assert_success();
    assert_eq!(
        *events.lock().unwrap(),
        [
            "outer-setup",
            "inner-setup",
            "case",
            "inner-teardown",
            "outer-teardown",
        ]
    );
}

#[tokio::test]
async fn failing_setup_skips_the_rest_but_unwinds_completed_steps() {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let app = TestApp::builder().build();
    let suite = ScenarioSuite::new(Arc::clone(&app) as Arc<dyn rigging::Application>, "order", |s| {
        s.setup_with_teardown(record(&events, "first-setup"), record(&events, "first-teardown"));
        s.setup(|cx: ScenarioContext| -> StepFuture {
            Box::pin(ready((
                cx,
                Err(ScenarioError::MissingFixture("boom".to_owned())),
            )))
        });
        s.setup(record(&events, "unreachable-setup"));
        let events = Arc::clone(&events);
        s.case("skipped", move |_| {
            events.lock().unwrap().push("case".to_owned());
            Ok(())
        });
    });

    let report = suite.run().await;
    assert_eq!(report.executed(), 1);
    assert!(matches!(
        report.failures()[0].error(),
        ScenarioError::MissingFixture(key) if key == "boom"
    ));
    assert_eq!(*events.lock().unwrap(), ["first-setup", "first-teardown"]);
}

#[tokio::test]
async fn failure_paths_name_the_full_group_chain() {
    let app = TestApp::builder()
        .route("widgets.create", AccessRule::Open)
        .build();
    let suite = ScenarioSuite::new(Arc::clone(&app) as Arc<dyn rigging::Application>, "suite", |s| {
        s.static_method("create", |s| {
            s.when_called_locally("widgets.create", |s| {
                s.case("always fails", |_| Err(CheckFailure::new("deliberate")));
            });
        });
    });

    let report = suite.run().await;
    assert_eq!(
        report.failures()[0].path(),
        "suite > .create > handle widgets.create > always fails"
    );
}

#[tokio::test]
async fn teardown_failures_surface_when_the_check_passed() {
    let app = TestApp::builder().build();
    let suite = ScenarioSuite::new(Arc::clone(&app) as Arc<dyn rigging::Application>, "teardown", |s| {
        s.teardown(|cx: ScenarioContext| -> StepFuture {
            Box::pin(ready((
                cx,
                Err(ScenarioError::MissingFixture("gone".to_owned())),
            )))
        });
        s.case("passes", |_| Ok(()));
    });

    let report = suite.run().await;
    assert!(matches!(
        report.failures()[0].error(),
        ScenarioError::MissingFixture(key) if key == "gone"
    ));
}

#[tokio::test]
#[should_panic(expected = "scenario cases failed")]
async fn assert_success_panics_with_a_summary() {
    let app = TestApp::builder().build();
    let suite = ScenarioSuite::new(Arc::clone(&app) as Arc<dyn rigging::Application>, "failing", |s| {
        s.case("always fails", |_| Err(CheckFailure::new("deliberate")));
    });

    suite.run().await.assert_success();
}
