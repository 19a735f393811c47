//! First-order kinetic models under a temperature ramp.
//!
//! Models are implemented as small, pure functions so that fitting/search code can
//! stay generic over the rate law.

pub mod rate_law;
pub mod trace;

pub use rate_law::*;
pub use trace::*;
