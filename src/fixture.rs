//! Fixture lifecycle: creation, post-creation hooks, and paired teardowns.
//!
//! A fixture is a test-scoped resource created through the application's
//! data API before a case runs and destroyed after it. Every creation step
//! registers its own destroy teardown, so multiple fixtures pair their own
//! create/destroy and unwind most-recently-created-first.

use serde_json::{Map, Value, json};

use crate::{
    app::{ACCESS_TOKEN_MODEL, ANONYMOUS_TOKEN_ID, USER_MODEL},
    context::ScenarioContext,
    error::ScenarioError,
    scenario::{Scenario, StepFn, StepFuture, StepResult},
};

/// Context slot holding the logged-in user's access token.
const LOGGED_IN_TOKEN_KEY: &str = "loggedInToken";

/// Describes a fixture to create: model, context key, attributes, and an
/// optional post-creation hook.
pub struct FixtureDef {
    pub(crate) model: String,
    pub(crate) key: Option<String>,
    pub(crate) attrs: Value,
    pub(crate) after_create: Option<StepFn>,
}

impl FixtureDef {
    /// Describe a fixture created from the named model, with empty
    /// attributes and the model name as context key.
    #[must_use]
    pub fn model(name: impl Into<String>) -> Self {
        Self {
            model: name.into(),
            key: None,
            attrs: Value::Object(Map::new()),
            after_create: None,
        }
    }

    /// Store the created instance under a caller-supplied context key.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attributes passed to the model's create operation.
    #[must_use]
    pub fn attrs(mut self, attrs: Value) -> Self {
        self.attrs = attrs;
        self
    }

    /// Hook run after the resource exists and before any dependent setup.
    #[must_use]
    pub fn after_create<F>(mut self, hook: F) -> Self
    where
        F: Fn(ScenarioContext) -> StepFuture + Send + Sync + 'static,
    {
        self.after_create = Some(std::sync::Arc::new(hook));
        self
    }
}

impl From<&str> for FixtureDef {
    fn from(model: &str) -> Self { FixtureDef::model(model) }
}

impl From<String> for FixtureDef {
    fn from(model: String) -> Self { FixtureDef::model(model) }
}

async fn create_fixture(
    cx: &mut ScenarioContext,
    model_name: &str,
    key: &str,
    attrs: Value,
) -> StepResult {
    let Some(model) = cx.app().model(model_name) else {
        return Err(ScenarioError::UnknownModel(model_name.to_owned()));
    };
    if !model.has_schema() {
        return Err(ScenarioError::MissingSchema(model_name.to_owned()));
    }
    if !model.supports_create() {
        return Err(ScenarioError::MissingCreate(model_name.to_owned()));
    }
    match model.create(attrs).await {
        Ok(instance) => {
            cx.insert_fixture(key, instance);
            Ok(())
        }
        Err(error) => {
            log::error!("creating fixture `{key}` from model `{model_name}` failed: {error}");
            if let Some(details) = error.details() {
                log::error!("fixture `{key}` failure details: {details}");
            }
            Err(ScenarioError::FixtureCreate {
                key: key.to_owned(),
                source: error,
            })
        }
    }
}

async fn destroy_fixture(cx: &mut ScenarioContext, key: &str) -> StepResult {
    let Some(instance) = cx.take_fixture(key) else {
        return Err(ScenarioError::MissingFixture(key.to_owned()));
    };
    instance
        .destroy()
        .await
        .map_err(|source| ScenarioError::FixtureDestroy {
            key: key.to_owned(),
            source,
        })
}

async fn login(cx: &mut ScenarioContext, credentials: Value) -> StepResult {
    let Some(model) = cx.app().model(USER_MODEL) else {
        return Err(ScenarioError::UnknownModel(USER_MODEL.to_owned()));
    };
    match model.login(credentials).await {
        Ok(token) => {
            cx.set_logged_in_token(token);
            Ok(())
        }
        Err(error) => {
            log::error!("login failed: {error}");
            Err(ScenarioError::Login(error))
        }
    }
}

async fn logout(cx: &mut ScenarioContext) -> StepResult {
    let Some(token) = cx.take_logged_in_token() else {
        return Err(ScenarioError::MissingFixture(LOGGED_IN_TOKEN_KEY.to_owned()));
    };
    token
        .destroy()
        .await
        .map_err(|source| ScenarioError::FixtureDestroy {
            key: LOGGED_IN_TOKEN_KEY.to_owned(),
            source,
        })
}

impl Scenario {
    /// Register creation of a fixture, its optional post-creation hook, and
    /// the paired teardown destroying it.
    ///
    /// The setup resolves the model by name and verifies it exists, has a
    /// schema, and supports creation before attempting to create anything;
    /// a configuration error there aborts the case as an infrastructure
    /// failure. Creation failures are logged with their structured details,
    /// then abort the case.
    pub fn given_model(&mut self, def: impl Into<FixtureDef>) {
        let FixtureDef {
            model,
            key,
            attrs,
            after_create,
        } = def.into();
        let key = key.unwrap_or_else(|| model.clone());

        let setup = {
            let model = model.clone();
            let key = key.clone();
            move |mut cx: ScenarioContext| -> StepFuture {
                let model = model.clone();
                let key = key.clone();
                let attrs = attrs.clone();
                Box::pin(async move {
                    let result = create_fixture(&mut cx, &model, &key, attrs).await;
                    (cx, result)
                })
            }
        };
        let teardown = move |mut cx: ScenarioContext| -> StepFuture {
            let key = key.clone();
            Box::pin(async move {
                let result = destroy_fixture(&mut cx, &key).await;
                (cx, result)
            })
        };
        self.setup_with_teardown(setup, teardown);

        if let Some(hook) = after_create {
            self.push_setup(hook, None);
        }
    }

    /// Fixture from the user model, created with the given attributes.
    pub fn given_user(&mut self, attrs: Value) {
        self.given_model(FixtureDef::model(USER_MODEL).attrs(attrs));
    }

    /// Access-token fixture carrying the well-known anonymous sentinel id.
    pub fn given_anonymous_token(&mut self) {
        self.given_model(
            FixtureDef::model(ACCESS_TOKEN_MODEL).attrs(json!({ "id": ANONYMOUS_TOKEN_ID })),
        );
    }

    /// Access-token fixture with arbitrary attributes, representing a
    /// caller whose token does not map to a known identity.
    pub fn given_unauthenticated_token(&mut self, attrs: Value) {
        self.given_model(FixtureDef::model(ACCESS_TOKEN_MODEL).attrs(attrs));
    }

    /// Create a user from `credentials` and log it in, storing the access
    /// token in the context.
    ///
    /// Registers its own teardown destroying the token and clearing the
    /// slot; teardowns unwind most-recent-first, so the token is destroyed
    /// before the user.
    pub fn given_logged_in_user(&mut self, credentials: Value) {
        self.login_fixture(credentials, None);
    }

    /// [`given_logged_in_user`](Self::given_logged_in_user) plus a hook run
    /// once the token is stored.
    pub fn given_logged_in_user_with<F>(&mut self, credentials: Value, after_login: F)
    where
        F: Fn(ScenarioContext) -> StepFuture + Send + Sync + 'static,
    {
        self.login_fixture(credentials, Some(std::sync::Arc::new(after_login)));
    }

    fn login_fixture(&mut self, credentials: Value, after_login: Option<StepFn>) {
        self.given_user(credentials.clone());

        let setup = move |mut cx: ScenarioContext| -> StepFuture {
            let credentials = credentials.clone();
            Box::pin(async move {
                let result = login(&mut cx, credentials).await;
                (cx, result)
            })
        };
        let teardown = |mut cx: ScenarioContext| -> StepFuture {
            Box::pin(async move {
                let result = logout(&mut cx).await;
                (cx, result)
            })
        };
        self.setup_with_teardown(setup, teardown);

        if let Some(hook) = after_login {
            self.push_setup(hook, None);
        }
    }
}
