//! End-to-end access-control suites combining fixtures, simulated calls,
//! and outcome assertions.

use std::sync::Arc;

use rigging::{
    ANONYMOUS_TOKEN_ID, CheckFailure, ScenarioSuite,
    harness::{AccessRule, TestApp},
};
use serde_json::json;

fn credentials() -> serde_json::Value {
    json!({ "email": "alice@example.com", "password": "wonderland" })
}

#[tokio::test]
async fn anonymous_caller_reaches_an_open_route() {
    let app = TestApp::builder()
        .route("things.list", AccessRule::Open)
        .build();
    let suite = ScenarioSuite::new(Arc::clone(&app) as Arc<dyn rigging::Application>, "listing", |s| {
        s.when_called_anonymously("things.list", |s| {
            s.should_be_allowed();
        });
    });

    suite.run().await.assert_success();

    // The anonymous token fixture existed for the case and was torn down.
    assert_eq!(
        app.destroyed(),
        vec![format!("accessToken:{ANONYMOUS_TOKEN_ID}")]
    );
}

#[tokio::test]
async fn logged_in_caller_is_rejected_by_a_denied_route() {
    let app = TestApp::builder()
        .route("things.remove", AccessRule::Denied(401))
        .build();
    let suite = ScenarioSuite::new(Arc::clone(&app) as Arc<dyn rigging::Application>, "removal", |s| {
        s.when_called_by_user(credentials(), "things.remove", |s| {
            s.should_be_denied();
            s.case("the captured error carries the status", |cx| {
                let err = cx
                    .err()
                    .ok_or_else(|| CheckFailure::new("no captured error"))?;
                if err.status_code() == 401 {
                    Ok(())
                } else {
                    Err(CheckFailure::new(format!(
                        "unexpected status {}",
                        err.status_code()
                    )))
                }
            });
        });
    });

    let report = suite.run().await;
    assert_eq!(report.executed(), 2);
    report.assert_success();
}

#[tokio::test]
async fn broken_fixture_setup_aborts_before_any_dispatch() {
    let app = TestApp::builder()
        .model_without_create("gadget")
        .route("gadgets.list", AccessRule::Open)
        .build();
    let suite = ScenarioSuite::new(Arc::clone(&app) as Arc<dyn rigging::Application>, "broken", |s| {
        s.given_model("gadget");
        s.when_called_locally("gadgets.list", |s| {
            s.should_be_allowed();
        });
    });

    let report = suite.run().await;
    assert!(!report.is_success());
    assert_eq!(app.dispatch_count(), 0);
}
