//! Local request simulation: call shapes, payload merging, and dispatch.
//!
//! A [`Call`] names the target of a simulated request either as a fixed
//! URI-like identifier or as a deferred factory over the scenario context,
//! resolved exactly once when the setup step executes. The effective
//! payload shallow-merges the context's ambient data with the call's data,
//! override-wins, ignoring absent or null sources.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::{
    app::{SimulatedRequest, TokenRef},
    context::ScenarioContext,
    scenario::{Scenario, StepFuture},
};

/// Label used for groups whose URI is produced by a factory and therefore
/// unknown at registration time.
const DYNAMIC_LABEL: &str = "<dynamic>";

/// Resolved target of a simulated call: the URI and, optionally, payload
/// data that overrides the call-level data.
pub struct Target {
    uri: String,
    data: Option<Value>,
}

impl Target {
    /// Target the given URI.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            data: None,
        }
    }

    /// Carry payload data along with the URI.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

type UriFactory = Arc<dyn Fn(&ScenarioContext) -> Target + Send + Sync>;
type DataFactory = Arc<dyn Fn(&ScenarioContext) -> Value + Send + Sync>;

#[derive(Clone)]
enum UriSpec {
    Fixed(String),
    Factory(UriFactory),
}

#[derive(Clone)]
enum DataSpec {
    Fixed(Value),
    Factory(DataFactory),
}

/// Explicit call shape for [`Scenario::when_called_locally`] and the
/// `when_called_*` combinators.
///
/// Plain strings convert directly; data is attached with
/// [`with_data`](Call::with_data) or computed lazily with
/// [`with_data_from`](Call::with_data_from).
pub struct Call {
    uri: UriSpec,
    data: Option<DataSpec>,
}

impl Call {
    /// Call a fixed URI.
    #[must_use]
    pub fn to(uri: impl Into<String>) -> Self {
        Self {
            uri: UriSpec::Fixed(uri.into()),
            data: None,
        }
    }

    /// Call a target resolved from the context at setup time.
    ///
    /// The factory is invoked exactly once per case execution; a payload it
    /// carries overrides the call-level data.
    #[must_use]
    pub fn dynamic<F>(factory: F) -> Self
    where
        F: Fn(&ScenarioContext) -> Target + Send + Sync + 'static,
    {
        Self {
            uri: UriSpec::Factory(Arc::new(factory)),
            data: None,
        }
    }

    /// Attach fixed payload data.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(DataSpec::Fixed(data));
        self
    }

    /// Attach payload data resolved from the context at setup time.
    #[must_use]
    pub fn with_data_from<F>(mut self, factory: F) -> Self
    where
        F: Fn(&ScenarioContext) -> Value + Send + Sync + 'static,
    {
        self.data = Some(DataSpec::Factory(Arc::new(factory)));
        self
    }

    fn label(&self) -> &str {
        match &self.uri {
            UriSpec::Fixed(uri) => uri,
            UriSpec::Factory(_) => DYNAMIC_LABEL,
        }
    }
}

impl From<&str> for Call {
    fn from(uri: &str) -> Self { Call::to(uri) }
}

impl From<String> for Call {
    fn from(uri: String) -> Self { Call::to(uri) }
}

impl From<Target> for Call {
    fn from(target: Target) -> Self {
        let call = Call::to(target.uri);
        match target.data {
            Some(data) => call.with_data(data),
            None => call,
        }
    }
}

/// Shallow-merge the ambient context data with the call's explicit data.
///
/// Override-wins; absent and null sources are ignored; non-object explicit
/// data replaces the ambient value wholesale; `{}` when both are absent.
fn merge_payload(ambient: Option<&Value>, explicit: Option<&Value>) -> Value {
    let ambient = ambient.filter(|value| !value.is_null());
    let explicit = explicit.filter(|value| !value.is_null());
    match (ambient, explicit) {
        (None, None) => Value::Object(Map::new()),
        (Some(value), None) | (None, Some(value)) => value.clone(),
        (Some(Value::Object(ambient)), Some(Value::Object(explicit))) => {
            let mut merged = ambient.clone();
            for (key, value) in explicit {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        (_, Some(explicit)) => explicit.clone(),
    }
}

async fn simulate(cx: &mut ScenarioContext, uri: UriSpec, data: Option<DataSpec>) {
    let (uri, target_data) = match uri {
        UriSpec::Fixed(uri) => (uri, None),
        UriSpec::Factory(factory) => {
            let target = factory(cx);
            (target.uri, target.data)
        }
    };
    let explicit = match target_data {
        Some(value) => Some(value),
        None => data.map(|spec| match spec {
            DataSpec::Fixed(value) => value,
            DataSpec::Factory(factory) => factory(cx),
        }),
    };
    let payload = merge_payload(cx.data(), explicit.as_ref());

    let mut request = SimulatedRequest::new(uri, payload);
    if let Some(token) = cx.logged_in_token() {
        request = request.with_token(TokenRef::new(token.id()));
    }

    let app = Arc::clone(cx.app());
    let outcome = app.dispatch(request).await;
    cx.set_outcome(outcome);
}

impl Scenario {
    /// Group simulating an in-process call against the application's
    /// pipeline.
    ///
    /// The setup step resolves the call, dispatches it, and captures the
    /// outcome into the context. A dispatch error never fails the step; it
    /// is data for the checks `body` registers.
    pub fn when_called_locally(&mut self, call: impl Into<Call>, body: impl FnOnce(&mut Scenario)) {
        let call = call.into();
        let label = format!("handle {}", call.label());
        self.group(label, move |s| {
            let Call { uri, data } = call;
            s.setup(move |mut cx: ScenarioContext| -> StepFuture {
                let uri = uri.clone();
                let data = data.clone();
                Box::pin(async move {
                    simulate(&mut cx, uri, data).await;
                    (cx, Ok(()))
                })
            });
            body(s);
        });
    }
}
