//! Unit and field types of the control protocol.

use std::fmt;

use crate::error::CtlError;

/// Kind of a control unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CtlType {
    /// End of the connection.
    End = 0,
    /// Start of a new logical unit.
    Data = 1,
    /// Continuation of the current logical unit.
    Extra = 2,
    /// End of one command's response.
    Block = 3,
}

impl CtlType {
    /// Whether units of this kind carry indexed fields.
    pub fn carries_data(self) -> bool {
        matches!(self, CtlType::Data | CtlType::Extra)
    }

    /// Whether this unit terminates a response stream.
    pub fn is_terminal(self) -> bool {
        matches!(self, CtlType::Block | CtlType::End)
    }
}

impl TryFrom<u8> for CtlType {
    type Error = CtlError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0 => Ok(CtlType::End),
            1 => Ok(CtlType::Data),
            2 => Ok(CtlType::Extra),
            3 => Ok(CtlType::Block),
            other => Err(CtlError::Protocol(format!("unknown unit type {other:#04x}"))),
        }
    }
}

impl fmt::Display for CtlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CtlType::End => "END",
            CtlType::Data => "DATA",
            CtlType::Extra => "EXTRA",
            CtlType::Block => "BLOCK",
        };
        f.write_str(name)
    }
}

/// Field index within a `DATA`/`EXTRA` unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CtlIdx {
    Cmd = 0,
    Flags = 1,
    Error = 2,
    Section = 3,
    Item = 4,
    Id = 5,
    Zone = 6,
    Owner = 7,
    Ttl = 8,
    Type = 9,
    Data = 10,
    Filter = 11,
}

impl CtlIdx {
    pub const ALL: [CtlIdx; 12] = [
        CtlIdx::Cmd,
        CtlIdx::Flags,
        CtlIdx::Error,
        CtlIdx::Section,
        CtlIdx::Item,
        CtlIdx::Id,
        CtlIdx::Zone,
        CtlIdx::Owner,
        CtlIdx::Ttl,
        CtlIdx::Type,
        CtlIdx::Data,
        CtlIdx::Filter,
    ];

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }
}

/// Fields of one `DATA`/`EXTRA` unit. Absent fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CtlData {
    pub cmd: String,
    pub flags: String,
    pub error: String,
    pub section: String,
    pub item: String,
    pub id: String,
    pub zone: String,
    pub owner: String,
    pub ttl: String,
    pub rtype: String,
    pub data: String,
    pub filter: String,
}

impl CtlData {
    /// A command unit, optionally restricted to one record type.
    pub fn command(cmd: &str, rtype: Option<&str>) -> Self {
        Self {
            cmd: cmd.to_string(),
            rtype: rtype.unwrap_or_default().to_string(),
            ..Self::default()
        }
    }

    pub fn get(&self, idx: CtlIdx) -> &str {
        match idx {
            CtlIdx::Cmd => &self.cmd,
            CtlIdx::Flags => &self.flags,
            CtlIdx::Error => &self.error,
            CtlIdx::Section => &self.section,
            CtlIdx::Item => &self.item,
            CtlIdx::Id => &self.id,
            CtlIdx::Zone => &self.zone,
            CtlIdx::Owner => &self.owner,
            CtlIdx::Ttl => &self.ttl,
            CtlIdx::Type => &self.rtype,
            CtlIdx::Data => &self.data,
            CtlIdx::Filter => &self.filter,
        }
    }

    pub fn set(&mut self, idx: CtlIdx, value: String) {
        let slot = match idx {
            CtlIdx::Cmd => &mut self.cmd,
            CtlIdx::Flags => &mut self.flags,
            CtlIdx::Error => &mut self.error,
            CtlIdx::Section => &mut self.section,
            CtlIdx::Item => &mut self.item,
            CtlIdx::Id => &mut self.id,
            CtlIdx::Zone => &mut self.zone,
            CtlIdx::Owner => &mut self.owner,
            CtlIdx::Ttl => &mut self.ttl,
            CtlIdx::Type => &mut self.rtype,
            CtlIdx::Data => &mut self.data,
            CtlIdx::Filter => &mut self.filter,
        };
        *slot = value;
    }
}
