//! `ramp-kinetics` library crate.
//!
//! The binary (`ramp`) is a thin wrapper around this library so that:
//!
//! - fitting, control and simulation logic is testable without spawning processes
//! - the same pipeline drives the CLI, the TUI and the controller dry-runs
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod control;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod sim;
pub mod tui;
