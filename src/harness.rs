//! In-memory reference application for exercising scenario compositions.
//!
//! [`TestApp`] implements the collaborator contracts with nothing behind
//! them: models create into shared in-process storage, the user model's
//! login mints access tokens, and dispatch routes URIs through per-route
//! [`AccessRule`]s. The crate's own tests run against it, and downstream
//! suites can use it to exercise their scenario compositions before
//! pointing them at a real application.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::app::{
    ACCESS_TOKEN_MODEL, AppError, Application, DispatchError, Instance, ModelHandle, Outcome,
    SimulatedRequest, USER_MODEL,
};

/// Access policy applied to a dispatch route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessRule {
    /// Anyone may call, with or without a credential.
    Open,
    /// Only callers attaching a valid, non-anonymous access token.
    Authenticated,
    /// Every caller is rejected with the given status code.
    Denied(u16),
    /// The route reports not-found for every caller.
    NotFound,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct ModelStore {
    model: String,
    records: Mutex<HashMap<String, Value>>,
    next_id: AtomicU64,
    destroy_log: Arc<Mutex<Vec<String>>>,
}

impl ModelStore {
    fn new(model: &str, destroy_log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            model: model.to_owned(),
            records: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            destroy_log,
        })
    }

    fn insert(&self, attrs: Value) -> String {
        let id = attrs
            .get("id")
            .and_then(Value::as_str)
            .map_or_else(
                || {
                    let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
                    format!("{}-{n}", self.model)
                },
                str::to_owned,
            );
        lock(&self.records).insert(id.clone(), attrs);
        id
    }

    fn remove(&self, id: &str) -> Result<(), AppError> {
        if lock(&self.records).remove(id).is_some() {
            lock(&self.destroy_log).push(format!("{}:{id}", self.model));
            Ok(())
        } else {
            Err(AppError::new(format!(
                "no `{}` record with id `{id}`",
                self.model
            )))
        }
    }

    fn contains(&self, id: &str) -> bool { lock(&self.records).contains_key(id) }

    fn len(&self) -> usize { lock(&self.records).len() }

    /// Id of the first record whose attributes include every key/value pair
    /// of `credentials`.
    fn find_matching(&self, credentials: &Value) -> Option<String> {
        let Value::Object(wanted) = credentials else {
            return None;
        };
        lock(&self.records)
            .iter()
            .find(|(_, attrs)| {
                wanted
                    .iter()
                    .all(|(key, value)| attrs.get(key) == Some(value))
            })
            .map(|(id, _)| id.clone())
    }
}

struct StoredInstance {
    id: String,
    store: Arc<ModelStore>,
}

#[async_trait]
impl Instance for StoredInstance {
    fn id(&self) -> &str { &self.id }

    async fn destroy(&self) -> Result<(), AppError> { self.store.remove(&self.id) }
}

struct HarnessModel {
    name: String,
    has_schema: bool,
    creatable: bool,
    create_error: Option<AppError>,
    login_error: Option<AppError>,
    store: Arc<ModelStore>,
    // Set on the user model only; login mints tokens into it.
    token_store: Option<Arc<ModelStore>>,
}

#[async_trait]
impl ModelHandle for HarnessModel {
    fn name(&self) -> &str { &self.name }

    fn has_schema(&self) -> bool { self.has_schema }

    fn supports_create(&self) -> bool { self.creatable }

    async fn create(&self, attrs: Value) -> Result<Arc<dyn Instance>, AppError> {
        if let Some(error) = &self.create_error {
            return Err(error.clone());
        }
        let id = self.store.insert(attrs);
        Ok(Arc::new(StoredInstance {
            id,
            store: Arc::clone(&self.store),
        }))
    }

    async fn login(&self, credentials: Value) -> Result<Arc<dyn Instance>, AppError> {
        let Some(token_store) = &self.token_store else {
            return Err(AppError::unsupported(&self.name, "login"));
        };
        if let Some(error) = &self.login_error {
            return Err(error.clone());
        }
        let user_id = self.store.find_matching(&credentials).ok_or_else(|| {
            AppError::new("invalid credentials").with_details(json!({ "model": self.name }))
        })?;
        let id = token_store.insert(json!({ "userId": user_id }));
        Ok(Arc::new(StoredInstance {
            id,
            store: Arc::clone(token_store),
        }))
    }
}

/// In-memory application under test.
pub struct TestApp {
    models: HashMap<String, Arc<HarnessModel>>,
    options: HashMap<String, Value>,
    routes: HashMap<String, AccessRule>,
    token_store: Arc<ModelStore>,
    destroy_log: Arc<Mutex<Vec<String>>>,
    dispatches: AtomicU64,
}

impl TestApp {
    /// Start describing a test application.
    #[must_use]
    pub fn builder() -> TestAppBuilder { TestAppBuilder::default() }

    /// Destroyed instances as `model:id` entries, in destruction order.
    #[must_use]
    pub fn destroyed(&self) -> Vec<String> { lock(&self.destroy_log).clone() }

    /// Number of live records in the named model's storage.
    #[must_use]
    pub fn record_count(&self, model: &str) -> usize {
        self.models
            .get(model)
            .map_or(0, |handle| handle.store.len())
    }

    /// Number of requests the dispatcher has seen.
    #[must_use]
    pub fn dispatch_count(&self) -> u64 { self.dispatches.load(Ordering::Relaxed) }

    fn authorized(&self, request: &SimulatedRequest) -> bool {
        request
            .access_token()
            .is_some_and(|token| !token.is_anonymous() && self.token_store.contains(token.id()))
    }
}

#[async_trait]
impl Application for TestApp {
    fn model(&self, name: &str) -> Option<Arc<dyn ModelHandle>> {
        self.models
            .get(name)
            .map(|handle| Arc::clone(handle) as Arc<dyn ModelHandle>)
    }

    fn option(&self, key: &str) -> Option<Value> { self.options.get(key).cloned() }

    async fn dispatch(&self, request: SimulatedRequest) -> Outcome {
        self.dispatches.fetch_add(1, Ordering::Relaxed);
        let Some(rule) = self.routes.get(request.uri()) else {
            return Outcome::failure(DispatchError::new(
                500,
                format!("unhandled request for `{}`", request.uri()),
            ));
        };
        let handled = || {
            Outcome::success(json!({
                "uri": request.uri(),
                "payload": request.payload(),
            }))
        };
        match rule {
            AccessRule::Open => handled(),
            AccessRule::Authenticated => {
                if self.authorized(&request) {
                    handled()
                } else {
                    Outcome::failure(DispatchError::new(401, "authorization required"))
                }
            }
            AccessRule::Denied(status) => {
                Outcome::failure(DispatchError::new(*status, "access denied"))
            }
            AccessRule::NotFound => Outcome::failure(DispatchError::new(
                404,
                format!("`{}` not found", request.uri()),
            )),
        }
    }
}

struct ModelSpec {
    name: String,
    has_schema: bool,
    creatable: bool,
    create_error: Option<AppError>,
}

impl ModelSpec {
    fn plain(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            has_schema: true,
            creatable: true,
            create_error: None,
        }
    }
}

/// Builder for [`TestApp`].
///
/// The `user` and `accessToken` models are always registered; further
/// models and dispatch routes are added explicitly.
#[derive(Default)]
pub struct TestAppBuilder {
    models: Vec<ModelSpec>,
    options: HashMap<String, Value>,
    routes: HashMap<String, AccessRule>,
    login_error: Option<AppError>,
}

impl TestAppBuilder {
    /// Register a model with a schema and a create operation.
    #[must_use]
    pub fn model(mut self, name: &str) -> Self {
        self.models.push(ModelSpec::plain(name));
        self
    }

    /// Register a model without a schema.
    #[must_use]
    pub fn model_without_schema(mut self, name: &str) -> Self {
        self.models.push(ModelSpec {
            has_schema: false,
            ..ModelSpec::plain(name)
        });
        self
    }

    /// Register a model without a create operation.
    #[must_use]
    pub fn model_without_create(mut self, name: &str) -> Self {
        self.models.push(ModelSpec {
            creatable: false,
            ..ModelSpec::plain(name)
        });
        self
    }

    /// Register a model whose create operation always fails with `error`.
    #[must_use]
    pub fn model_with_failing_create(mut self, name: &str, error: AppError) -> Self {
        self.models.push(ModelSpec {
            create_error: Some(error),
            ..ModelSpec::plain(name)
        });
        self
    }

    /// Make the user model reject every login with `error`.
    #[must_use]
    pub fn failing_login(mut self, error: AppError) -> Self {
        self.login_error = Some(error);
        self
    }

    /// Set a configuration option.
    #[must_use]
    pub fn option(mut self, key: &str, value: Value) -> Self {
        self.options.insert(key.to_owned(), value);
        self
    }

    /// Route a URI through an access rule.
    #[must_use]
    pub fn route(mut self, uri: &str, rule: AccessRule) -> Self {
        self.routes.insert(uri.to_owned(), rule);
        self
    }

    /// Build the application.
    #[must_use]
    pub fn build(self) -> Arc<TestApp> {
        let destroy_log = Arc::new(Mutex::new(Vec::new()));
        let token_store = ModelStore::new(ACCESS_TOKEN_MODEL, Arc::clone(&destroy_log));

        let mut specs = self.models;
        for builtin in [USER_MODEL, ACCESS_TOKEN_MODEL] {
            if !specs.iter().any(|spec| spec.name == builtin) {
                specs.push(ModelSpec::plain(builtin));
            }
        }

        let mut models = HashMap::new();
        for spec in specs {
            let is_user = spec.name == USER_MODEL;
            let store = if spec.name == ACCESS_TOKEN_MODEL {
                Arc::clone(&token_store)
            } else {
                ModelStore::new(&spec.name, Arc::clone(&destroy_log))
            };
            let model = HarnessModel {
                name: spec.name.clone(),
                has_schema: spec.has_schema,
                creatable: spec.creatable,
                create_error: spec.create_error,
                login_error: if is_user { self.login_error.clone() } else { None },
                store,
                token_store: is_user.then(|| Arc::clone(&token_store)),
            };
            models.insert(spec.name, Arc::new(model));
        }

        Arc::new(TestApp {
            models,
            options: self.options,
            routes: self.routes,
            token_store,
            destroy_log,
            dispatches: AtomicU64::new(0),
        })
    }
}
