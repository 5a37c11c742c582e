//! Infrastructure layer module
//!
//! Configuration loading and logging setup for processes embedding the
//! cache.

pub mod config;
pub mod logging;
