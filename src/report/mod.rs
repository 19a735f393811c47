//! Reporting utilities: residuals, rankings, terminal summaries and Markdown reports.

pub mod format;
pub mod markdown;

pub use format::*;
pub use markdown::*;
