//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input configuration enums (`TimeUnit`, `TempUnit`, `ModelSpec`, `MethodSpec`)
//! - normalized ramp observations (`RampPoint`) and derived rate points
//! - fit outputs (`FitResult`, `Activation`, `FitFile`, etc.)

pub mod types;

pub use types::*;
