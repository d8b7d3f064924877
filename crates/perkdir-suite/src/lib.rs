//! Drives the directory page through scripted input and asserts its
//! observable behavior against the fixture context.

mod runner;
mod scenario;

pub use runner::{baseline_descriptor, run_suite, SuiteReport};
pub use scenario::{ScenarioOutcome, ScenarioVerifier};
