//! knot-exporter — HTTP front end for the Knot DNS collector.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/metrics` | Prometheus exposition, one collection pass per request |
//! | GET | `/health` | Control socket probe |
//! | GET | `/` | Index page |

pub mod cli;
pub mod config;
pub mod server;

pub use cli::Cli;
pub use config::{ConfigError, ExporterConfig, FileConfig};
pub use server::{AppState, build_router};
