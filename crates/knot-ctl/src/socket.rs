//! Blocking Unix-socket control session.

use std::io::{BufReader, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::error::{CtlError, CtlResult};
use crate::types::{CtlData, CtlType};
use crate::wire;
use crate::{CtlConnector, CtlSession};

/// A control session over a connected Unix stream socket.
///
/// Reads go through a buffer so the decoder can peek at the byte that
/// follows a unit. Dropping the session closes it.
#[derive(Debug)]
pub struct UnixCtl {
    reader: BufReader<UnixStream>,
    writer: UnixStream,
    closed: bool,
}

impl UnixCtl {
    /// Connect to the control socket at `path`.
    pub fn connect(path: &Path) -> CtlResult<Self> {
        let connect_err = |source| CtlError::Connect {
            path: path.to_path_buf(),
            source,
        };
        let stream = UnixStream::connect(path).map_err(connect_err)?;
        let writer = stream.try_clone().map_err(connect_err)?;
        debug!(path = %path.display(), "control socket connected");

        Ok(Self {
            reader: BufReader::new(stream),
            writer,
            closed: false,
        })
    }

    fn send(&mut self, data: &CtlData) -> CtlResult<()> {
        if self.closed {
            return Err(CtlError::Closed);
        }
        let mut buf = Vec::with_capacity(64);
        wire::encode_unit(&mut buf, CtlType::Data, Some(data))?;
        wire::encode_unit(&mut buf, CtlType::Block, None)?;
        self.writer.write_all(&buf).map_err(CtlError::Send)?;
        self.writer.flush().map_err(CtlError::Send)
    }
}

impl CtlSession for UnixCtl {
    fn set_timeout(&mut self, timeout: Option<Duration>) {
        let timeout = timeout.filter(|t| !t.is_zero());
        let applied = self
            .writer
            .set_read_timeout(timeout)
            .and_then(|()| self.writer.set_write_timeout(timeout));
        if let Err(e) = applied {
            debug!(error = %e, "failed to set control socket timeout");
        }
    }

    fn send_command(&mut self, cmd: &str) -> CtlResult<()> {
        self.send(&CtlData::command(cmd, None))
    }

    fn send_command_with_type(&mut self, cmd: &str, rtype: &str) -> CtlResult<()> {
        self.send(&CtlData::command(cmd, Some(rtype)))
    }

    fn receive(&mut self) -> CtlResult<(CtlType, CtlData)> {
        if self.closed {
            return Err(CtlError::Closed);
        }
        wire::read_unit(&mut self.reader)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let mut buf = Vec::with_capacity(1);
        if wire::encode_unit(&mut buf, CtlType::End, None).is_ok() {
            let _ = self.writer.write_all(&buf);
        }
        let _ = self.writer.shutdown(Shutdown::Both);
    }
}

impl Drop for UnixCtl {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opens [`UnixCtl`] sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixConnector;

impl CtlConnector for UnixConnector {
    fn connect(&self, path: &Path) -> CtlResult<Box<dyn CtlSession>> {
        Ok(Box::new(UnixCtl::connect(path)?))
    }
}
