//! Documentation audit for the Tessera builders
//!
//! Reads the reStructuredText sources of the MongoDB reference manual, turns
//! the worked examples on each operator page into fixture directories, and
//! reports which documented operators have no builder yet.
//!
//! # Pipeline
//! 1. [`docs::discover`] finds one page per operator
//! 2. [`rst::parse`] splits a page into sections and code blocks
//! 3. [`examples::extract`] pairs inserts, pipelines and outputs
//! 4. [`fixtures::write`] stores them as `exampleN` directories
//!
//! [`coverage::audit`] works from the discovered pages alone.

pub mod config;
pub mod coverage;
pub mod docs;
pub mod examples;
pub mod fixtures;
pub mod rst;
pub mod shell;

pub use config::AuditConfig;
pub use coverage::{CoverageReport, Implemented, ReportFormat};
pub use docs::{DocKind, OperatorDoc};
pub use examples::Example;
pub use fixtures::WriteOutcome;
pub use rst::{Block, BlockKind, Section};
pub use shell::ShellError;
