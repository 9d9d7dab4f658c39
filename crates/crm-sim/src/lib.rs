//! CRM Sim - seeded invariant simulator for the lead pipeline
//!
//! Random user actions are driven through the pipeline service against an
//! in-memory store:
//! - Each outcome is checked against a model of which actions must be accepted
//! - Store invariants are checked after every operation
//! - Scripted scenarios pin exact field values
//!
//! # Example
//!
//! ```rust,ignore
//! use crm_sim::{run_simulator, SimulatorConfig};
//!
//! let report = run_simulator(SimulatorConfig { seed: 7, ..Default::default() }).await;
//! assert!(report.passed(), "{}", report.generate_text());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod invariants;
pub mod scenario;
pub mod simulator;

pub use invariants::{InvariantCheck, InvariantViolation, PipelineInvariants, Snapshot};
pub use scenario::{ScenarioCheck, ScenarioReport};
pub use simulator::{
    run_simulator, ExpectedResult, OperationDistribution, OperationStats, SimulatedOperation,
    SimulatorConfig, SimulatorReport, Violation,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
