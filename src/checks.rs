//! Outcome checks and convenience call-plus-check compositions.
//!
//! Checks read the outcome captured by the last simulated call. The denied
//! check resolves its expected status code in priority order: per-test
//! override, the application's `acl_error_status` option, then 401.

use serde_json::Value;

use crate::{
    app::ACL_ERROR_STATUS_OPTION,
    context::ScenarioContext,
    error::CheckFailure,
    scenario::Scenario,
    simulate::Call,
};

/// Status code the denied check falls back to.
pub const DEFAULT_DENIED_STATUS: u16 = 401;

/// Status code the not-found check expects.
pub const NOT_FOUND_STATUS: u16 = 404;

fn expected_denied_status(cx: &ScenarioContext) -> u16 {
    cx.denied_status()
        .or_else(|| {
            cx.app()
                .option(ACL_ERROR_STATUS_OPTION)
                .as_ref()
                .and_then(Value::as_u64)
                .and_then(|status| u16::try_from(status).ok())
        })
        .unwrap_or(DEFAULT_DENIED_STATUS)
}

impl Scenario {
    /// Case passing iff the last call captured no error.
    pub fn should_be_allowed(&mut self) {
        self.case("should be allowed", |cx| match cx.err() {
            None => Ok(()),
            Some(err) => Err(CheckFailure::new(format!(
                "expected the call to be allowed, got: {err}"
            ))),
        });
    }

    /// Case passing iff the last call captured an error with the expected
    /// denied status code.
    pub fn should_be_denied(&mut self) {
        self.case("should not be allowed", |cx| {
            let err = cx.err().ok_or_else(|| {
                CheckFailure::new("expected the call to be denied, but no error was captured")
            })?;
            let expected = expected_denied_status(cx);
            if err.status_code() == expected {
                Ok(())
            } else {
                Err(CheckFailure::new(format!(
                    "expected denied status {expected}, got {got}",
                    got = err.status_code(),
                )))
            }
        });
    }

    /// Case passing iff the last call captured an error with status 404.
    pub fn should_not_be_found(&mut self) {
        self.case("should not be found", |cx| {
            let err = cx.err().ok_or_else(|| {
                CheckFailure::new("expected the call not to be found, but no error was captured")
            })?;
            if err.status_code() == NOT_FOUND_STATUS {
                Ok(())
            } else {
                Err(CheckFailure::new(format!(
                    "expected status {NOT_FOUND_STATUS}, got {got}",
                    got = err.status_code(),
                )))
            }
        });
    }

    /// Anonymous call followed by the allowed check.
    pub fn should_be_allowed_when_called_anonymously(&mut self, call: impl Into<Call>) {
        self.when_called_anonymously(call, |s| {
            s.should_be_allowed();
        });
    }

    /// Anonymous call followed by the denied check.
    pub fn should_be_denied_when_called_anonymously(&mut self, call: impl Into<Call>) {
        self.when_called_anonymously(call, |s| {
            s.should_be_denied();
        });
    }

    /// Unauthenticated call followed by the allowed check.
    pub fn should_be_allowed_when_called_unauthenticated(&mut self, call: impl Into<Call>) {
        self.when_called_unauthenticated(call, |s| {
            s.should_be_allowed();
        });
    }

    /// Unauthenticated call followed by the denied check.
    pub fn should_be_denied_when_called_unauthenticated(&mut self, call: impl Into<Call>) {
        self.when_called_unauthenticated(call, |s| {
            s.should_be_denied();
        });
    }

    /// Logged-in call followed by the allowed check.
    pub fn should_be_allowed_when_called_by_user(
        &mut self,
        credentials: Value,
        call: impl Into<Call>,
    ) {
        self.when_called_by_user(credentials, call, |s| {
            s.should_be_allowed();
        });
    }

    /// Logged-in call followed by the denied check.
    pub fn should_be_denied_when_called_by_user(
        &mut self,
        credentials: Value,
        call: impl Into<Call>,
    ) {
        self.when_called_by_user(credentials, call, |s| {
            s.should_be_denied();
        });
    }
}
