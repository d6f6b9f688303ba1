//! Terminal user interface

mod progress;

pub use progress::ProgressReporter;
