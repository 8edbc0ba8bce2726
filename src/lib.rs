//! Declarative scenario composition for integration-testing request-handling
//! applications.
//!
//! A test author describes who is calling, with what payload, against what
//! method; `rigging` wires up fixture creation, authentication, in-process
//! request simulation, and outcome assertions. Scenarios nest: fixtures
//! register paired create/destroy steps, simulated calls capture their
//! outcome into a per-test-case [`ScenarioContext`], and checks read it.
//!
//! ```rust
//! use rigging::harness::{AccessRule, TestApp};
//! use rigging::prelude::*;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let app = TestApp::builder()
//!     .route("widgets.list", AccessRule::Open)
//!     .route("widgets.create", AccessRule::Authenticated)
//!     .build();
//!
//! let suite = ScenarioSuite::new(app, "widgets", |s| {
//!     s.should_be_allowed_when_called_anonymously("widgets.list");
//!     s.should_be_allowed_when_called_by_user(
//!         json!({"email": "a@b.c", "password": "pw"}),
//!         Call::to("widgets.create").with_data(json!({"name": "x"})),
//!     );
//! });
//!
//! suite.run().await.assert_success();
//! # }
//! ```

pub mod app;
pub mod checks;
pub mod context;
pub mod error;
pub mod fixture;
pub mod harness;
pub mod prelude;
pub mod scenario;
pub mod simulate;

pub use app::{
    ACCESS_TOKEN_MODEL,
    ACL_ERROR_STATUS_OPTION,
    ANONYMOUS_TOKEN_ID,
    AppError,
    Application,
    DispatchError,
    Instance,
    ModelHandle,
    Outcome,
    SimulatedRequest,
    TokenRef,
    USER_MODEL,
};
pub use checks::{DEFAULT_DENIED_STATUS, NOT_FOUND_STATUS};
pub use context::{MethodKind, MethodUnderTest, ScenarioContext};
pub use error::{CheckFailure, ScenarioError};
pub use fixture::FixtureDef;
pub use scenario::{
    CaseFailure,
    CheckFn,
    CheckResult,
    RunReport,
    Scenario,
    ScenarioSuite,
    StepFn,
    StepFuture,
    StepResult,
};
pub use simulate::{Call, Target};
