//! Wire encoding of control units.
//!
//! ```text
//! unit  := type:u8 item*            (items only for DATA / EXTRA)
//! item  := code:u8 len:u16be bytes[len]
//! code  := 0x10 + field index
//! ```
//!
//! Type bytes are always below [`DATA_CODE_OFFSET`], so a reader knows a
//! unit's item list has ended when the next byte is a type byte.

use std::io::{self, BufRead, Read};

use crate::error::{CtlError, CtlResult};
use crate::types::{CtlData, CtlIdx, CtlType};

/// Item codes start here; anything lower is a unit type.
pub const DATA_CODE_OFFSET: u8 = 0x10;

/// Append one unit to `buf`. Empty fields are not written.
pub fn encode_unit(buf: &mut Vec<u8>, kind: CtlType, data: Option<&CtlData>) -> CtlResult<()> {
    buf.push(kind as u8);

    let Some(data) = data.filter(|_| kind.carries_data()) else {
        return Ok(());
    };

    for idx in CtlIdx::ALL {
        let value = data.get(idx);
        if value.is_empty() {
            continue;
        }
        let len = u16::try_from(value.len()).map_err(|_| {
            CtlError::Protocol(format!("{idx:?} field too long ({} bytes)", value.len()))
        })?;
        buf.push(DATA_CODE_OFFSET + idx as u8);
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(value.as_bytes());
    }
    Ok(())
}

/// Read one unit from `reader`.
///
/// Returns [`CtlError::Closed`] if the stream ends before a type byte.
pub fn read_unit<R: BufRead>(reader: &mut R) -> CtlResult<(CtlType, CtlData)> {
    let Some(type_byte) = peek_byte(reader)? else {
        return Err(CtlError::Closed);
    };
    reader.consume(1);
    let kind = CtlType::try_from(type_byte)?;

    let mut data = CtlData::default();
    if !kind.carries_data() {
        return Ok((kind, data));
    }

    while let Some(code) = peek_byte(reader)? {
        if code < DATA_CODE_OFFSET {
            break;
        }
        reader.consume(1);

        let mut len = [0u8; 2];
        reader.read_exact(&mut len).map_err(truncated)?;
        let mut value = vec![0u8; u16::from_be_bytes(len) as usize];
        reader.read_exact(&mut value).map_err(truncated)?;

        match CtlIdx::from_index(code - DATA_CODE_OFFSET) {
            Some(idx) => data.set(idx, String::from_utf8_lossy(&value).into_owned()),
            None => tracing::trace!(code, "skipping unknown control field"),
        }
    }

    Ok((kind, data))
}

fn peek_byte<R: BufRead>(reader: &mut R) -> CtlResult<Option<u8>> {
    loop {
        match reader.fill_buf() {
            Ok(buf) => return Ok(buf.first().copied()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CtlError::Receive(e)),
        }
    }
}

fn truncated(e: io::Error) -> CtlError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        CtlError::Protocol("unit truncated mid-field".to_string())
    } else {
        CtlError::Receive(e)
    }
}
