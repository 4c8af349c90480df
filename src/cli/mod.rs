//! Command Line Interface (CLI) layer for SPRAWL.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) for a full analysis run. It wires
//! user-provided options to the underlying library functionality exposed
//! via `sprawl::api`.
//!
//! If you are embedding SPRAWL into another application, prefer using
//! the high-level `sprawl::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
