//! Outcome assertions: allowed, denied (with its status priority chain),
//! not-found, and the convenience compositions.

use std::sync::Arc;

use rigging::{
    ACL_ERROR_STATUS_OPTION, ScenarioError, ScenarioSuite,
    harness::{AccessRule, TestApp},
};
use rstest::rstest;
use serde_json::json;

#[tokio::test]
async fn allowed_passes_without_an_error_and_fails_with_one() {
    let app = TestApp::builder()
        .route("things.list", AccessRule::Open)
        .route("things.locked", AccessRule::Denied(401))
        .build();
    let suite = ScenarioSuite::new(Arc::clone(&app) as Arc<dyn rigging::Application>, "allowed", |s| {
        s.when_called_anonymously("things.list", |s| {
            s.should_be_allowed();
        });
        s.when_called_anonymously("things.locked", |s| {
            s.should_be_allowed();
        });
    });

    let report = suite.run().await;
    assert_eq!(report.executed(), 2);
    assert_eq!(report.failures().len(), 1);
    let failure = &report.failures()[0];
    assert!(failure.path().contains("things.locked"));
    assert!(matches!(failure.error(), ScenarioError::Check(_)));
    assert!(failure.error().to_string().contains("allowed"));
}

#[rstest]
#[case::default_401(None, None, 401, true)]
#[case::app_option(Some(403), None, 403, true)]
#[case::override_beats_option(Some(403), Some(418), 418, true)]
#[case::mismatch_fails(None, None, 403, false)]
#[tokio::test]
async fn denied_resolves_its_expected_status_in_priority_order(
    #[case] option: Option<u16>,
    #[case] override_status: Option<u16>,
    #[case] route_status: u16,
    #[case] expect_pass: bool,
) {
    let mut builder = TestApp::builder().route("things.remove", AccessRule::Denied(route_status));
    if let Some(status) = option {
        builder = builder.option(ACL_ERROR_STATUS_OPTION, json!(status));
    }
    let app = builder.build();

    let suite = ScenarioSuite::new(Arc::clone(&app) as Arc<dyn rigging::Application>, "denied", |s| {
        if let Some(status) = override_status {
            s.with_denied_status(status);
        }
        s.when_called_anonymously("things.remove", |s| {
            s.should_be_denied();
        });
    });

    let report = suite.run().await;
    assert_eq!(
        report.is_success(),
        expect_pass,
        "failures: {:?}",
        report.failures()
    );
}

#[tokio::test]
async fn not_found_requires_a_404_error() {
    let app = TestApp::builder()
        .route("things.ghost", AccessRule::NotFound)
        .route("things.list", AccessRule::Open)
        .build();
    let suite = ScenarioSuite::new(Arc::clone(&app) as Arc<dyn rigging::Application>, "not found", |s| {
        s.when_called_anonymously("things.ghost", |s| {
            s.should_not_be_found();
        });
        s.when_called_anonymously("things.list", |s| {
            s.should_not_be_found();
        });
    });

    let report = suite.run().await;
    assert_eq!(report.executed(), 2);
    assert_eq!(report.failures().len(), 1);
    assert!(report.failures()[0].path().contains("things.list"));
}

#[tokio::test]
async fn convenience_compositions_cover_every_caller_kind() {
    let app = TestApp::builder()
        .route("things.list", AccessRule::Open)
        .route("things.secret", AccessRule::Authenticated)
        .route("things.locked", AccessRule::Denied(401))
        .build();
    let credentials = json!({ "email": "a@b.c", "password": "pw" });

    let suite = ScenarioSuite::new(Arc::clone(&app) as Arc<dyn rigging::Application>, "conveniences", |s| {
        s.should_be_allowed_when_called_anonymously("things.list");
        s.should_be_denied_when_called_anonymously("things.secret");
        s.should_be_allowed_when_called_unauthenticated("things.list");
        s.should_be_denied_when_called_unauthenticated("things.secret");
        s.should_be_allowed_when_called_by_user(credentials.clone(), "things.list");
        s.should_be_denied_when_called_by_user(credentials, "things.locked");
    });

    let report = suite.run().await;
    assert_eq!(report.executed(), 6);
    report.assert_success();
}
