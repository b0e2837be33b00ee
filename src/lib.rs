//! fleetdash: a terminal dashboard for a fleet of container services.
//!
//! The library holds the reducer, the workflow engines and the CLI-backed
//! collaborators; the binary wires them to a terminal.

pub mod app;
pub mod ci;
pub mod command;
pub mod config;
pub mod deploy;
pub mod detail;
pub mod error;
pub mod fleet;
pub mod logging;
pub mod logs;
pub mod model;
pub mod naming;
pub mod refresh;
pub mod rows;
pub mod shell;
pub mod traffic;
pub mod view;
