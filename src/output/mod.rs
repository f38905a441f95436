//! Output module for reporting on crawl results

pub mod stats;

pub use stats::{load_statistics, print_statistics, DatabaseStats};
