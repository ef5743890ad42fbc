//! Scripted control sessions shared by the unit tests.

use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use knot_ctl::{CtlConnector, CtlData, CtlError, CtlResult, CtlSession, CtlType};

/// What the code under test did to its sessions.
#[derive(Debug, Default, Clone)]
pub struct SessionLog {
    pub commands: Vec<String>,
    pub timeouts: Vec<Option<Duration>>,
    pub closes: usize,
}

pub fn stat(section: &str, item: &str, id: &str, value: &str) -> CtlData {
    CtlData {
        section: section.to_string(),
        item: item.to_string(),
        id: id.to_string(),
        data: value.to_string(),
        ..CtlData::default()
    }
}

pub fn zone_stat(zone: &str, section: &str, item: &str, id: &str, value: &str) -> CtlData {
    CtlData {
        zone: zone.to_string(),
        ..stat(section, item, id, value)
    }
}

pub fn zone_value(zone: &str, value: &str) -> CtlData {
    CtlData {
        zone: zone.to_string(),
        data: value.to_string(),
        ..CtlData::default()
    }
}

pub fn value(value: &str) -> CtlData {
    zone_value("", value)
}

/// Replays a fixed response; runs dry with [`CtlError::Closed`].
#[derive(Debug)]
pub struct ScriptedSession {
    units: VecDeque<CtlResult<(CtlType, CtlData)>>,
    send_error: Option<CtlError>,
    log: Arc<Mutex<SessionLog>>,
}

impl ScriptedSession {
    pub fn new(units: Vec<(CtlType, CtlData)>) -> Self {
        Self {
            units: units.into_iter().map(Ok).collect(),
            send_error: None,
            log: Arc::default(),
        }
    }

    /// Response terminated by BLOCK.
    pub fn block(mut units: Vec<(CtlType, CtlData)>) -> Self {
        units.push((CtlType::Block, CtlData::default()));
        Self::new(units)
    }

    pub fn failing_send(message: &str) -> Self {
        Self {
            send_error: Some(CtlError::Send(io::Error::other(message.to_string()))),
            ..Self::new(Vec::new())
        }
    }

    /// Replace the terminator with a receive failure.
    pub fn failing_receive(units: Vec<(CtlType, CtlData)>, message: &str) -> Self {
        let mut session = Self::new(units);
        session
            .units
            .push_back(Err(CtlError::Receive(io::Error::other(message.to_string()))));
        session
    }

    pub fn log(&self) -> Arc<Mutex<SessionLog>> {
        Arc::clone(&self.log)
    }

    fn record(&self, command: String) {
        self.log.lock().unwrap().commands.push(command);
    }
}

impl CtlSession for ScriptedSession {
    fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.log.lock().unwrap().timeouts.push(timeout);
    }

    fn send_command(&mut self, cmd: &str) -> CtlResult<()> {
        self.record(cmd.to_string());
        self.send_error.take().map_or(Ok(()), Err)
    }

    fn send_command_with_type(&mut self, cmd: &str, rtype: &str) -> CtlResult<()> {
        self.record(format!("{cmd} {rtype}"));
        self.send_error.take().map_or(Ok(()), Err)
    }

    fn receive(&mut self) -> CtlResult<(CtlType, CtlData)> {
        self.units.pop_front().unwrap_or(Err(CtlError::Closed))
    }

    fn close(&mut self) {
        self.log.lock().unwrap().closes += 1;
    }
}

/// Yields DATA units forever.
#[derive(Debug)]
pub struct EndlessSession {
    pub unit: CtlData,
    pub received: usize,
}

impl CtlSession for EndlessSession {
    fn set_timeout(&mut self, _timeout: Option<Duration>) {}

    fn send_command(&mut self, _cmd: &str) -> CtlResult<()> {
        Ok(())
    }

    fn send_command_with_type(&mut self, _cmd: &str, _rtype: &str) -> CtlResult<()> {
        Ok(())
    }

    fn receive(&mut self) -> CtlResult<(CtlType, CtlData)> {
        self.received += 1;
        Ok((CtlType::Data, self.unit.clone()))
    }

    fn close(&mut self) {}
}

/// Hands out scripted sessions in order, then refuses connections.
#[derive(Debug)]
pub struct ScriptedConnector {
    sessions: Mutex<VecDeque<ScriptedSession>>,
    log: Arc<Mutex<SessionLog>>,
    pub connects: Mutex<Vec<String>>,
}

impl ScriptedConnector {
    /// All sessions share one log so tests can see the full pass.
    pub fn new(sessions: Vec<ScriptedSession>) -> Self {
        let log: Arc<Mutex<SessionLog>> = Arc::default();
        let sessions = sessions
            .into_iter()
            .map(|mut s| {
                s.log = Arc::clone(&log);
                s
            })
            .collect();
        Self {
            sessions: Mutex::new(sessions),
            log,
            connects: Mutex::new(Vec::new()),
        }
    }

    pub fn log(&self) -> SessionLog {
        self.log.lock().unwrap().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.lock().unwrap().len()
    }
}

impl CtlConnector for ScriptedConnector {
    fn connect(&self, path: &Path) -> CtlResult<Box<dyn CtlSession>> {
        self.connects
            .lock()
            .unwrap()
            .push(path.display().to_string());
        match self.sessions.lock().unwrap().pop_front() {
            Some(session) => Ok(Box::new(session)),
            None => Err(CtlError::Connect {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
            }),
        }
    }
}
