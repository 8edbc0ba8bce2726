//! Scenario tree, builder combinators, and the suite runner.
//!
//! A [`Scenario`] is a named group holding setup steps (each optionally
//! paired with a teardown), outcome checks, and nested child groups.
//! Combinators register everything at build time; nothing suspends until
//! [`ScenarioSuite::run`] executes the cases.
//!
//! Execution per test case: a fresh [`ScenarioContext`], the setup chain
//! from the root group down to the case's group in registration order, the
//! case's check, then the teardowns whose setups completed, unwinding
//! most-recently-registered-first. A failing setup aborts the rest of the
//! chain and the check; completed setups are still unwound.

use std::{fmt::Write as _, sync::Arc};

use futures::future::BoxFuture;
use serde_json::Value;

use crate::{
    context::{MethodUnderTest, ScenarioContext},
    error::{CheckFailure, ScenarioError},
    simulate::Call,
};

/// Result of a setup or teardown step.
pub type StepResult = Result<(), ScenarioError>;

/// Result of an outcome check.
pub type CheckResult = Result<(), CheckFailure>;

/// Future returned by a step: the context passed through by ownership,
/// plus the step's result.
pub type StepFuture = BoxFuture<'static, (ScenarioContext, StepResult)>;

/// Boxed setup or teardown step.
pub type StepFn = Arc<dyn Fn(ScenarioContext) -> StepFuture + Send + Sync>;

/// Boxed outcome check.
pub type CheckFn = Arc<dyn Fn(&ScenarioContext) -> CheckResult + Send + Sync>;

pub(crate) struct SetupStep {
    run: StepFn,
    teardown: Option<StepFn>,
}

struct Case {
    name: String,
    check: CheckFn,
}

/// A named, composable group of fixtures, simulated calls, checks, and
/// nested groups.
pub struct Scenario {
    name: String,
    steps: Vec<SetupStep>,
    cases: Vec<Case>,
    children: Vec<Scenario>,
}

impl Scenario {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            cases: Vec::new(),
            children: Vec::new(),
        }
    }

    /// The group's label, as it appears in failure paths.
    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    /// Register a nested named group.
    pub fn group(&mut self, name: impl Into<String>, body: impl FnOnce(&mut Scenario)) {
        let mut child = Scenario::new(name);
        body(&mut child);
        self.children.push(child);
    }

    /// Register a setup step.
    pub fn setup<F>(&mut self, step: F)
    where
        F: Fn(ScenarioContext) -> StepFuture + Send + Sync + 'static,
    {
        self.push_setup(Arc::new(step), None);
    }

    /// Register a setup step paired with a teardown.
    ///
    /// The teardown only runs if the setup completed, and unwinds after any
    /// teardown registered later.
    pub fn setup_with_teardown<F, T>(&mut self, step: F, teardown: T)
    where
        F: Fn(ScenarioContext) -> StepFuture + Send + Sync + 'static,
        T: Fn(ScenarioContext) -> StepFuture + Send + Sync + 'static,
    {
        self.push_setup(Arc::new(step), Some(Arc::new(teardown)));
    }

    /// Register a standalone teardown step.
    pub fn teardown<T>(&mut self, teardown: T)
    where
        T: Fn(ScenarioContext) -> StepFuture + Send + Sync + 'static,
    {
        let noop: StepFn = Arc::new(|cx: ScenarioContext| -> StepFuture {
            Box::pin(std::future::ready((cx, Ok(()))))
        });
        self.push_setup(noop, Some(Arc::new(teardown)));
    }

    pub(crate) fn push_setup(&mut self, run: StepFn, teardown: Option<StepFn>) {
        self.steps.push(SetupStep { run, teardown });
    }

    pub(crate) fn push_sync_setup<F>(&mut self, step: F)
    where
        F: Fn(&mut ScenarioContext) + Send + Sync + 'static,
    {
        self.setup(move |mut cx: ScenarioContext| -> StepFuture {
            step(&mut cx);
            Box::pin(std::future::ready((cx, Ok(()))))
        });
    }

    /// Register a named test case checking the context after setup.
    pub fn case<F>(&mut self, name: impl Into<String>, check: F)
    where
        F: Fn(&ScenarioContext) -> CheckResult + Send + Sync + 'static,
    {
        self.cases.push(Case {
            name: name.into(),
            check: Arc::new(check),
        });
    }

    /// Group exercising a class-level method, binding its metadata into the
    /// context.
    pub fn static_method(&mut self, name: &str, body: impl FnOnce(&mut Scenario)) {
        let method = MethodUnderTest::static_method(name);
        self.group(format!(".{name}"), |s| {
            s.push_sync_setup(move |cx| cx.set_method(method.clone()));
            body(s);
        });
    }

    /// Group exercising an instance-level method, binding its metadata into
    /// the context.
    pub fn instance_method(&mut self, name: &str, body: impl FnOnce(&mut Scenario)) {
        let method = MethodUnderTest::instance_method(name);
        self.group(format!("#{name}"), |s| {
            s.push_sync_setup(move |cx| cx.set_method(method.clone()));
            body(s);
        });
    }

    /// Setup step storing the invocation argument list.
    pub fn with_args<I>(&mut self, args: I)
    where
        I: IntoIterator<Item = Value>,
    {
        let args: Vec<Value> = args.into_iter().collect();
        self.push_sync_setup(move |cx| cx.set_args(args.clone()));
    }

    /// Setup step storing the ambient payload merged into simulated calls.
    pub fn with_data(&mut self, data: Value) {
        self.push_sync_setup(move |cx| cx.set_data(data.clone()));
    }

    /// Setup step overriding the status code the denied assertion expects.
    pub fn with_denied_status(&mut self, status: u16) {
        self.push_sync_setup(move |cx| cx.set_denied_status(status));
    }

    /// Group where a user created from `credentials` is logged in.
    pub fn when_logged_in_as_user(&mut self, credentials: Value, body: impl FnOnce(&mut Scenario)) {
        self.group("when logged in as user", |s| {
            s.given_logged_in_user(credentials);
            body(s);
        });
    }

    /// Group simulating a call issued by a logged-in user.
    pub fn when_called_by_user(
        &mut self,
        credentials: Value,
        call: impl Into<Call>,
        body: impl FnOnce(&mut Scenario),
    ) {
        let call = call.into();
        self.group("when called by logged in user", |s| {
            s.given_logged_in_user(credentials);
            s.when_called_locally(call, body);
        });
    }

    /// Group simulating a call issued with the anonymous token.
    pub fn when_called_anonymously(&mut self, call: impl Into<Call>, body: impl FnOnce(&mut Scenario)) {
        let call = call.into();
        self.group("when called anonymously", |s| {
            s.given_anonymous_token();
            s.when_called_locally(call, body);
        });
    }

    /// Group simulating a call issued with an unauthenticated token.
    ///
    /// Distinct identity from [`when_called_anonymously`](Self::when_called_anonymously):
    /// the token carries arbitrary attributes instead of the anonymous
    /// sentinel. The two fixtures share the `accessToken` context key, so
    /// the branches are mutually exclusive within one chain.
    pub fn when_called_unauthenticated(
        &mut self,
        call: impl Into<Call>,
        body: impl FnOnce(&mut Scenario),
    ) {
        let call = call.into();
        self.group("when called with unauthenticated token", |s| {
            s.given_unauthenticated_token(Value::Object(serde_json::Map::new()));
            s.when_called_locally(call, body);
        });
    }
}

/// One failing test case in a [`RunReport`].
#[derive(Debug)]
pub struct CaseFailure {
    path: String,
    error: ScenarioError,
}

impl CaseFailure {
    /// Group path of the failing case, joined with `>`.
    #[must_use]
    pub fn path(&self) -> &str { &self.path }

    /// The failure.
    #[must_use]
    pub fn error(&self) -> &ScenarioError { &self.error }
}

/// Result of running every case in a suite.
#[derive(Debug, Default)]
pub struct RunReport {
    executed: usize,
    failures: Vec<CaseFailure>,
}

impl RunReport {
    /// Number of cases executed.
    #[must_use]
    pub fn executed(&self) -> usize { self.executed }

    /// The failing cases.
    #[must_use]
    pub fn failures(&self) -> &[CaseFailure] { &self.failures }

    /// Whether every case passed.
    #[must_use]
    pub fn is_success(&self) -> bool { self.failures.is_empty() }

    /// Panic with a readable summary unless every case passed.
    ///
    /// # Panics
    ///
    /// Panics listing each failing case's path and error.
    pub fn assert_success(&self) {
        if self.is_success() {
            return;
        }
        let mut summary = String::new();
        for failure in &self.failures {
            let _ = writeln!(summary, "  {}: {}", failure.path, failure.error);
        }
        panic!(
            "{failed} of {executed} scenario cases failed:\n{summary}",
            failed = self.failures.len(),
            executed = self.executed,
        );
    }
}

struct PlannedCase<'s> {
    chain: Vec<&'s Scenario>,
    case: &'s Case,
}

fn collect_cases<'s>(
    scenario: &'s Scenario,
    trail: &mut Vec<&'s Scenario>,
    out: &mut Vec<PlannedCase<'s>>,
) {
    trail.push(scenario);
    for case in &scenario.cases {
        out.push(PlannedCase {
            chain: trail.clone(),
            case,
        });
    }
    for child in &scenario.children {
        collect_cases(child, trail, out);
    }
    trail.pop();
}

/// A scenario tree bound to an application, ready to run.
pub struct ScenarioSuite {
    app: Arc<dyn crate::app::Application>,
    root: Scenario,
}

impl ScenarioSuite {
    /// Build a suite: `body` registers groups, fixtures, calls, and checks
    /// on the root group.
    pub fn new(
        app: Arc<dyn crate::app::Application>,
        name: impl Into<String>,
        body: impl FnOnce(&mut Scenario),
    ) -> Self {
        let mut root = Scenario::new(name);
        body(&mut root);
        Self { app, root }
    }

    /// Execute every registered case and report the results.
    ///
    /// Cases never panic out of the runner; infrastructure errors, check
    /// failures, and teardown failures all land in the report.
    pub async fn run(&self) -> RunReport {
        let mut planned = Vec::new();
        let mut trail = Vec::new();
        collect_cases(&self.root, &mut trail, &mut planned);

        let mut report = RunReport::default();
        for plan in planned {
            report.executed += 1;
            if let Some(error) = self.run_case(&plan).await {
                let mut path: Vec<&str> = plan.chain.iter().map(|group| group.name()).collect();
                path.push(&plan.case.name);
                report.failures.push(CaseFailure {
                    path: path.join(" > "),
                    error,
                });
            }
        }
        report
    }

    async fn run_case(&self, plan: &PlannedCase<'_>) -> Option<ScenarioError> {
        let mut cx = ScenarioContext::new(Arc::clone(&self.app));
        let mut unwind: Vec<StepFn> = Vec::new();
        let mut failure: Option<ScenarioError> = None;

        'setup: for group in &plan.chain {
            for step in &group.steps {
                let (returned, result) = (step.run)(cx).await;
                cx = returned;
                match result {
                    Ok(()) => {
                        if let Some(teardown) = &step.teardown {
                            unwind.push(Arc::clone(teardown));
                        }
                    }
                    Err(error) => {
                        failure = Some(error);
                        break 'setup;
                    }
                }
            }
        }

        if failure.is_none() {
            if let Err(check) = (plan.case.check)(&cx) {
                failure = Some(check.into());
            }
        }

        while let Some(teardown) = unwind.pop() {
            let (returned, result) = teardown(cx).await;
            cx = returned;
            if let Err(error) = result {
                if failure.is_none() {
                    failure = Some(error);
                } else {
                    log::error!("teardown failed after an earlier failure: {error}");
                }
            }
        }

        failure
    }
}
