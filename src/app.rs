//! Contracts implemented by the application under test.
//!
//! `rigging` never implements the system being exercised; it drives one
//! through these traits. An [`Application`] resolves models by name, exposes
//! configuration options, and dispatches a [`SimulatedRequest`] through its
//! pipeline in-process. Model and instance handles cover the small data API
//! the fixture manager needs: create, class-level login, and destroy.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Well-known identifier carried by anonymous access tokens.
pub const ANONYMOUS_TOKEN_ID: &str = "$anonymous";

/// Conventional name of the user-like model.
pub const USER_MODEL: &str = "user";

/// Conventional name of the access-token model.
pub const ACCESS_TOKEN_MODEL: &str = "accessToken";

/// Application option consulted by the denied assertion before falling back
/// to the default status code.
pub const ACL_ERROR_STATUS_OPTION: &str = "acl_error_status";

/// Failure reported by the application's data API.
///
/// Carries an optional structured `details` value which is logged verbatim
/// for diagnostics when a fixture operation fails.
#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct AppError {
    message: String,
    details: Option<Value>,
}

impl AppError {
    /// Create an error from a plain message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    /// Error for an operation a model does not expose.
    pub fn unsupported(model: &str, operation: &str) -> Self {
        Self::new(format!("model `{model}` does not support `{operation}`"))
    }

    /// Attach structured diagnostic detail.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// The plain error message.
    #[must_use]
    pub fn message(&self) -> &str { &self.message }

    /// Structured diagnostic detail, if any.
    #[must_use]
    pub fn details(&self) -> Option<&Value> { self.details.as_ref() }
}

/// Error produced by dispatching a simulated request.
///
/// Dispatch errors are captured as data for assertions rather than
/// propagated as test failures, so this type is ordinary state, not a
/// control-flow signal.
#[derive(Clone, Debug, Error)]
#[error("{message} (status {status_code})")]
pub struct DispatchError {
    status_code: u16,
    message: String,
    details: Option<Value>,
}

impl DispatchError {
    /// Create a dispatch error with a numeric status code.
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            details: None,
        }
    }

    /// Attach structured diagnostic detail.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// The numeric status code consulted by assertions.
    #[must_use]
    pub fn status_code(&self) -> u16 { self.status_code }

    /// The plain error message.
    #[must_use]
    pub fn message(&self) -> &str { &self.message }

    /// Structured diagnostic detail, if any.
    #[must_use]
    pub fn details(&self) -> Option<&Value> { self.details.as_ref() }
}

/// Captured result of the last simulated call.
///
/// The error and result are both optional and not mutually exclusive; any
/// given assertion consults exactly one of them.
#[derive(Clone, Debug, Default)]
pub struct Outcome {
    err: Option<DispatchError>,
    result: Option<Value>,
}

impl Outcome {
    /// Outcome of a call the pipeline completed with a result.
    #[must_use]
    pub fn success(result: Value) -> Self {
        Self {
            err: None,
            result: Some(result),
        }
    }

    /// Outcome of a call the pipeline rejected.
    #[must_use]
    pub fn failure(err: DispatchError) -> Self {
        Self {
            err: Some(err),
            result: None,
        }
    }

    /// Outcome with both fields supplied explicitly.
    #[must_use]
    pub fn new(err: Option<DispatchError>, result: Option<Value>) -> Self { Self { err, result } }

    /// The captured dispatch error, if any.
    #[must_use]
    pub fn err(&self) -> Option<&DispatchError> { self.err.as_ref() }

    /// The captured result, if any.
    #[must_use]
    pub fn result(&self) -> Option<&Value> { self.result.as_ref() }
}

/// Reference to an access token attached to a request as its credential.
#[derive(Clone, Debug, Serialize)]
pub struct TokenRef {
    id: String,
}

impl TokenRef {
    /// Create a reference from a token identifier.
    pub fn new(id: impl Into<String>) -> Self { Self { id: id.into() } }

    /// The token identifier.
    #[must_use]
    pub fn id(&self) -> &str { &self.id }

    /// Whether this token carries the anonymous sentinel identifier.
    #[must_use]
    pub fn is_anonymous(&self) -> bool { self.id == ANONYMOUS_TOKEN_ID }
}

/// Synthetic request dispatched through the application's pipeline
/// in-process, bypassing real transport.
#[derive(Clone, Debug, Serialize)]
pub struct SimulatedRequest {
    uri: String,
    payload: Value,
    access_token: Option<TokenRef>,
}

impl SimulatedRequest {
    /// Build a request targeting `uri` with an already-computed payload.
    pub fn new(uri: impl Into<String>, payload: Value) -> Self {
        Self {
            uri: uri.into(),
            payload,
            access_token: None,
        }
    }

    /// Attach an access token as the request's authentication credential.
    #[must_use]
    pub fn with_token(mut self, token: TokenRef) -> Self {
        self.access_token = Some(token);
        self
    }

    /// The URI-like identifier the pipeline routes on.
    #[must_use]
    pub fn uri(&self) -> &str { &self.uri }

    /// The effective payload.
    #[must_use]
    pub fn payload(&self) -> &Value { &self.payload }

    /// The attached credential, if any.
    #[must_use]
    pub fn access_token(&self) -> Option<&TokenRef> { self.access_token.as_ref() }
}

/// A created model instance owned by a test case for its duration.
#[async_trait]
pub trait Instance: Send + Sync {
    /// Identifying attribute of the instance.
    fn id(&self) -> &str;

    /// Destroy the instance.
    ///
    /// # Errors
    ///
    /// Returns an [`AppError`] if the application fails to remove the
    /// underlying resource.
    async fn destroy(&self) -> Result<(), AppError>;
}

/// Handle to a named model exposed by the application.
#[async_trait]
pub trait ModelHandle: Send + Sync {
    /// The model's registered name.
    fn name(&self) -> &str;

    /// Whether the model carries a usable schema.
    fn has_schema(&self) -> bool { true }

    /// Whether the model exposes a creation operation.
    fn supports_create(&self) -> bool { true }

    /// Create an instance from the given attributes.
    ///
    /// # Errors
    ///
    /// Returns an [`AppError`] when creation fails; the fixture manager
    /// logs the message and details, then aborts the test case.
    async fn create(&self, attrs: Value) -> Result<Arc<dyn Instance>, AppError>;

    /// Class-level login operation minting an access token.
    ///
    /// Only meaningful for the user-like model; the default rejects the
    /// operation.
    ///
    /// # Errors
    ///
    /// Returns an [`AppError`] when the credentials are rejected or the
    /// model does not support logging in.
    async fn login(&self, credentials: Value) -> Result<Arc<dyn Instance>, AppError> {
        let _ = credentials;
        Err(AppError::unsupported(self.name(), "login"))
    }
}

/// Handle to the system under test.
///
/// A single trait covers model lookup, configuration options, and the
/// in-process dispatch pipeline, mirroring the one application handle test
/// suites hold.
#[async_trait]
pub trait Application: Send + Sync {
    /// Resolve a model by name.
    fn model(&self, name: &str) -> Option<Arc<dyn ModelHandle>>;

    /// Look up a configuration option.
    fn option(&self, key: &str) -> Option<Value> {
        let _ = key;
        None
    }

    /// Dispatch a simulated request through the application's pipeline.
    ///
    /// The returned [`Outcome`] is captured into the scenario context as
    /// data; a dispatch error is an expected, assertable result, never an
    /// infrastructure fault.
    async fn dispatch(&self, request: SimulatedRequest) -> Outcome;
}
