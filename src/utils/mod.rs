pub mod patterns;
pub mod progress;

pub use patterns::{extract_ident, ident_regex, wildcard_regex};
pub use progress::ProgressReporter;
