//! Pieces of the `stdc` binary that are worth testing on their own.

pub mod config;
pub mod exit;
pub mod logging;
pub mod report;
