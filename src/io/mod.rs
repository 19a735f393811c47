//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - result exports (CSV) (`export`)
//! - fit JSON read/write (`fit_file`)
//! - sampled trace CSV written by the simulator and the controller (`trace`)

pub mod export;
pub mod fit_file;
pub mod ingest;
pub mod trace;

pub use export::*;
pub use fit_file::*;
pub use ingest::*;
pub use trace::*;
