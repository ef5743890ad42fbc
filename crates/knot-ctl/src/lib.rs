//! knot-ctl — client for the Knot DNS control socket.
//!
//! The control protocol is a stream of tagged units. Every unit starts
//! with a type byte; `DATA` and `EXTRA` units carry up to a dozen indexed
//! string fields, `BLOCK` terminates one command's response and `END`
//! terminates the connection.
//!
//! # Architecture
//!
//! ```text
//! CtlConnector::connect(path)
//!   └── Box<dyn CtlSession>
//!         ├── send_command("stats")          → DATA{cmd} + BLOCK
//!         ├── send_command_with_type(..)     → DATA{cmd, type} + BLOCK
//!         ├── receive()                      → (CtlType, CtlData)
//!         └── close()                        → END, socket shutdown
//! ```
//!
//! [`UnixConnector`] is the production implementation. Collectors only
//! depend on the two traits, so tests script sessions in memory.

pub mod error;
pub mod socket;
pub mod types;
pub mod wire;

use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

pub use error::{CtlError, CtlResult};
pub use socket::{UnixConnector, UnixCtl};
pub use types::{CtlData, CtlIdx, CtlType};

/// One connected control session.
///
/// A session is good for a single command/response cycle; callers that
/// need a second command open a new session.
pub trait CtlSession: Send + Debug {
    /// Bound every subsequent read and write. `None` blocks forever.
    fn set_timeout(&mut self, timeout: Option<Duration>);

    /// Send a bare command.
    fn send_command(&mut self, cmd: &str) -> CtlResult<()>;

    /// Send a command restricted to one record type (e.g. `zone-read` + `SOA`).
    fn send_command_with_type(&mut self, cmd: &str, rtype: &str) -> CtlResult<()>;

    /// Receive the next unit of the response stream.
    fn receive(&mut self) -> CtlResult<(CtlType, CtlData)>;

    /// Terminate the session. Further calls fail with [`CtlError::Closed`].
    fn close(&mut self);
}

/// Opens control sessions. Injected so collectors can be tested without a server.
pub trait CtlConnector: Send + Sync {
    fn connect(&self, path: &Path) -> CtlResult<Box<dyn CtlSession>>;
}

/// Version of the control library, reported by the exporter's build info.
pub fn ctl_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
