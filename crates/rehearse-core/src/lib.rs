//! Core of the rehearse user-simulation harness.
//!
//! A session drives an external command-line tool through an ordered list
//! of [`phases::Phase`]s. Every [`command::CommandSpec`] is executed by a
//! [`runner::ToolRunner`], judged by the [`validator::OutcomeValidator`],
//! tallied into [`stats::SessionStats`], and shown on the
//! [`progress::SimulationProgress`] line. The [`report::ReportGenerator`]
//! turns the accumulated records into one [`report::SessionReport`].
//!
//! ```text
//! SessionOrchestrator
//!     |
//!     +--> ToolRunner::run(spec) ------> ExecutionResult
//!     +--> OutcomeValidator::evaluate -> ValidationVerdict
//!     +--> SessionStats::record --------> counters + CommandRecord
//!     +--> SimulationProgress ----------> status line
//!     |
//!     v
//! SessionOutcome --ReportGenerator--> SessionReport
//! ```

pub mod command;
pub mod orchestrator;
pub mod phases;
pub mod progress;
pub mod regions;
pub mod report;
pub mod runner;
pub mod stats;
pub mod validator;
