//! The groktest command-line tool.

#![deny(clippy::all)]

pub mod app;
pub mod commands;
pub mod discover;
pub mod last_run;
pub mod queue;
pub mod signals;
pub mod telemetry;
