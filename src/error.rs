//! Canonical error types for scenario execution.
//!
//! Two disjoint failure classes exist. Infrastructure errors
//! ([`ScenarioError`]) abort a test case immediately and are never retried:
//! a fixture that fails to create is treated identically to a logic bug.
//! Simulated-call errors are *not* represented here at all; they are
//! captured into the scenario context as data for assertions.

use thiserror::Error;

use crate::app::AppError;

/// Failure of an outcome check registered by the assertion library.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CheckFailure {
    message: String,
}

impl CheckFailure {
    /// Create a failure from a readable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Infrastructure failure aborting a test case.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScenarioError {
    /// The application has no model registered under the given name.
    #[error("cannot get model `{0}` from the application")]
    UnknownModel(String),
    /// The named model exists but carries no schema.
    #[error("cannot test model `{0}` without a schema")]
    MissingSchema(String),
    /// The named model does not expose a creation operation.
    #[error("model `{0}` does not have a create operation")]
    MissingCreate(String),
    /// Creating a fixture failed.
    #[error("creating fixture `{key}` failed: {source}")]
    FixtureCreate {
        /// Context key the fixture would have been stored under.
        key: String,
        /// The application's error.
        #[source]
        source: AppError,
    },
    /// The user model rejected the login credentials.
    #[error("login failed: {0}")]
    Login(#[source] AppError),
    /// Destroying a fixture during teardown failed.
    #[error("destroying fixture `{key}` failed: {source}")]
    FixtureDestroy {
        /// Context key the fixture was stored under.
        key: String,
        /// The application's error.
        #[source]
        source: AppError,
    },
    /// A teardown ran for a context slot that holds nothing.
    #[error("no fixture is stored under key `{0}`")]
    MissingFixture(String),
    /// An outcome check failed.
    #[error(transparent)]
    Check(#[from] CheckFailure),
}
