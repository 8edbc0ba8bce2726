//! Per-test-case scenario context.
//!
//! The context is created fresh for every test case and passed by ownership
//! through the setup and teardown chain: each step receives the context,
//! mutates it, and hands it back. Nothing here is shared or locked; steps
//! within one case run strictly sequentially.

use std::{collections::HashMap, sync::Arc};

use serde_json::Value;

use crate::app::{Application, Instance, Outcome};

/// How the method under test is bound to its model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodKind {
    /// Class-level method.
    Static,
    /// Instance-level method.
    Instance,
}

/// Metadata about the method a scenario group exercises.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodUnderTest {
    name: String,
    kind: MethodKind,
}

impl MethodUnderTest {
    /// Metadata for a class-level method.
    pub fn static_method(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MethodKind::Static,
        }
    }

    /// Metadata for an instance-level method.
    pub fn instance_method(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MethodKind::Instance,
        }
    }

    /// The method name.
    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    /// The binding kind.
    #[must_use]
    pub fn kind(&self) -> MethodKind { self.kind }

    /// Whether the method is class-level.
    #[must_use]
    pub fn is_static(&self) -> bool { self.kind == MethodKind::Static }

    /// Whether the method is instance-level.
    #[must_use]
    pub fn is_instance(&self) -> bool { self.kind == MethodKind::Instance }
}

/// Mutable state shared by the setup steps, checks, and teardown steps of
/// one test case.
pub struct ScenarioContext {
    app: Arc<dyn Application>,
    args: Vec<Value>,
    data: Option<Value>,
    outcome: Outcome,
    logged_in_token: Option<Arc<dyn Instance>>,
    method: Option<MethodUnderTest>,
    denied_status: Option<u16>,
    fixtures: HashMap<String, Arc<dyn Instance>>,
}

impl ScenarioContext {
    /// Create an empty context bound to the application under test.
    #[must_use]
    pub fn new(app: Arc<dyn Application>) -> Self {
        Self {
            app,
            args: Vec::new(),
            data: None,
            outcome: Outcome::default(),
            logged_in_token: None,
            method: None,
            denied_status: None,
            fixtures: HashMap::new(),
        }
    }

    /// Handle to the system under test.
    #[must_use]
    pub fn app(&self) -> &Arc<dyn Application> { &self.app }

    /// The invocation argument list.
    #[must_use]
    pub fn args(&self) -> &[Value] { &self.args }

    /// Replace the invocation argument list.
    pub fn set_args(&mut self, args: Vec<Value>) { self.args = args; }

    /// Ambient payload merged into every simulated call.
    #[must_use]
    pub fn data(&self) -> Option<&Value> { self.data.as_ref() }

    /// Replace the ambient payload.
    pub fn set_data(&mut self, data: Value) { self.data = Some(data); }

    /// Outcome captured by the last simulated call.
    #[must_use]
    pub fn outcome(&self) -> &Outcome { &self.outcome }

    /// Store the outcome of a simulated call.
    pub fn set_outcome(&mut self, outcome: Outcome) { self.outcome = outcome; }

    /// The captured dispatch error, if any.
    #[must_use]
    pub fn err(&self) -> Option<&crate::app::DispatchError> { self.outcome.err() }

    /// The captured dispatch result, if any.
    #[must_use]
    pub fn result(&self) -> Option<&Value> { self.outcome.result() }

    /// Token of the currently logged-in user, if any.
    #[must_use]
    pub fn logged_in_token(&self) -> Option<&Arc<dyn Instance>> { self.logged_in_token.as_ref() }

    /// Store the logged-in user's token.
    pub fn set_logged_in_token(&mut self, token: Arc<dyn Instance>) {
        self.logged_in_token = Some(token);
    }

    /// Clear and return the logged-in token.
    pub fn take_logged_in_token(&mut self) -> Option<Arc<dyn Instance>> {
        self.logged_in_token.take()
    }

    /// Metadata about the method under test, if bound.
    #[must_use]
    pub fn method(&self) -> Option<&MethodUnderTest> { self.method.as_ref() }

    /// Bind the method under test.
    pub fn set_method(&mut self, method: MethodUnderTest) { self.method = Some(method); }

    /// Per-test override for the expected denied status code.
    #[must_use]
    pub fn denied_status(&self) -> Option<u16> { self.denied_status }

    /// Set the per-test denied status override.
    pub fn set_denied_status(&mut self, status: u16) { self.denied_status = Some(status); }

    /// Fixture stored under `key`, if any.
    #[must_use]
    pub fn fixture(&self, key: &str) -> Option<&Arc<dyn Instance>> { self.fixtures.get(key) }

    /// Store a fixture under `key`, replacing any previous occupant.
    pub fn insert_fixture(&mut self, key: impl Into<String>, instance: Arc<dyn Instance>) {
        self.fixtures.insert(key.into(), instance);
    }

    /// Clear and return the fixture stored under `key`.
    pub fn take_fixture(&mut self, key: &str) -> Option<Arc<dyn Instance>> {
        self.fixtures.remove(key)
    }
}
