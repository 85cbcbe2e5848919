//! Core of the groktest literate-testing framework.
//!
//! Plain-text documents interleave prose with prompt-prefixed example
//! blocks; this crate extracts those examples, resolves per-document
//! configuration, matches expected output against actual output, and
//! drives tests through a [`runtime::Runtime`] adapter in source order.
//! Concrete runtimes and the command-line surface live in sibling crates.

#![deny(clippy::all)]

pub mod config;
pub mod error;
pub mod extract;
pub mod front_matter;
pub mod matching;
pub mod options;
pub mod report;
pub mod runner;
pub mod runtime;
pub mod spec;
pub mod test_support;
mod value;

pub use error::Error;
pub use error::Result;
pub use extract::parse_tests;
pub use extract::Test;
pub use front_matter::parse_front_matter;
pub use matching::match_test_output;
pub use matching::MatchResult;
pub use options::decode_options;
pub use runner::plan_file;
pub use runner::run_plan;
pub use runner::FilePlan;
pub use runner::TestLocation;
pub use runner::TestSummary;
pub use runtime::Runtime;
pub use runtime::TestOutput;
pub use spec::TestSpec;
pub use value::coerce_list;
pub use value::coerce_scalar;
