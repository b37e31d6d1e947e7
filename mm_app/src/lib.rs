//! # mm_app
//!
//! Process wiring for the coordination service: logging, configuration,
//! shutdown signalling and periodic stats reporting.

pub mod cli;
pub mod config_loader;
pub mod monitoring;
pub mod shutdown_handler;
pub mod tracing_setup;
