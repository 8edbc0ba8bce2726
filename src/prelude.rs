//! Convenience imports for composing and running scenarios.
//!
//! Focused on the high-frequency types; prefer importing specialised APIs
//! directly from their owning modules.

pub use crate::{
    app::{AppError, Application, DispatchError, Instance, ModelHandle, Outcome, SimulatedRequest},
    context::ScenarioContext,
    error::{CheckFailure, ScenarioError},
    fixture::FixtureDef,
    scenario::{RunReport, Scenario, ScenarioSuite},
    simulate::{Call, Target},
};
