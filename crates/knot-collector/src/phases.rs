//! Decoding of the four control responses the exporter issues.
//!
//! Each phase sends one command, then reads units until `BLOCK` or `END`.
//! A send or receive failure ends the phase with the error; samples
//! already pushed to the sink stay there. Units that do not decode are
//! skipped.

use knot_ctl::{CtlData, CtlResult, CtlSession, CtlType};
use tracing::{debug, trace};

use crate::descriptor::KnotDescriptors;
use crate::duration::convert_state_time;
use crate::prometheus::MetricSink;

/// `zone-status` EXTRA position holding the zone serial.
pub const ZONE_STATUS_SERIAL_POS: usize = 1;
/// `zone-status` EXTRA position holding the refresh timer.
pub const ZONE_STATUS_REFRESH_POS: usize = 7;
/// `zone-status` EXTRA position holding the expiration timer.
pub const ZONE_STATUS_EXPIRATION_POS: usize = 9;

/// Upper bound on units read by the SOA phase.
pub const MAX_ZONE_TIMER_RECORDS: usize = 100_000;

/// Counts reported by a finished phase.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSummary {
    /// Units received, terminator included.
    pub records: usize,
    /// Descriptor pairs emitted.
    pub emitted: usize,
}

/// Read units until the response ends or `limit` units have been read.
fn drain_response<F>(
    session: &mut dyn CtlSession,
    limit: Option<usize>,
    mut handle: F,
) -> CtlResult<usize>
where
    F: FnMut(CtlType, &CtlData),
{
    let mut records = 0;
    while limit.is_none_or(|max| records < max) {
        let (kind, data) = session.receive()?;
        records += 1;
        trace!(
            %kind,
            section = %data.section,
            item = %data.item,
            id = %data.id,
            zone = %data.zone,
            data = %data.data,
            "control unit"
        );

        if kind.is_terminal() {
            return Ok(records);
        }
        if !data.error.is_empty() {
            debug!(error = %data.error, zone = %data.zone, "server reported an error");
        }
        handle(kind, &data);
    }

    debug!(records, "response truncated at unit limit");
    Ok(records)
}

/// `stats` → `knot_stats_<item>{module, type}`.
pub fn global_stats(
    session: &mut dyn CtlSession,
    descriptors: &KnotDescriptors,
    sink: &mut dyn MetricSink,
) -> CtlResult<PhaseSummary> {
    session.send_command("stats")?;

    let mut emitted = 0;
    let records = drain_response(session, None, |kind, data| {
        if !kind.carries_data() || data.item.is_empty() || data.data.is_empty() {
            return;
        }
        let Ok(value) = data.data.parse::<f64>() else {
            debug!(item = %data.item, value = %data.data, "non-numeric global statistic");
            return;
        };
        let pair = descriptors.global_stats.get(&data.item);
        sink.emit_pair(&pair, value, &[data.section.as_str(), data.id.as_str()]);
        emitted += 1;
    })?;

    debug!(records, emitted, "global statistics collected");
    Ok(PhaseSummary { records, emitted })
}

/// Which parts of `zone-status` to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneStatusOptions {
    pub serial: bool,
    pub timers: bool,
}

/// Meaning of an EXTRA unit by its position within a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusField {
    Serial,
    RefreshTimer,
    ExpirationTimer,
}

impl StatusField {
    fn at(position: usize) -> Option<Self> {
        match position {
            ZONE_STATUS_SERIAL_POS => Some(StatusField::Serial),
            ZONE_STATUS_REFRESH_POS => Some(StatusField::RefreshTimer),
            ZONE_STATUS_EXPIRATION_POS => Some(StatusField::ExpirationTimer),
            _ => None,
        }
    }
}

/// Tracks the zone a `zone-status` EXTRA unit belongs to.
#[derive(Debug, Default)]
struct ZoneCursor {
    zone: String,
    position: usize,
}

impl ZoneCursor {
    /// Feed one unit. Returns the zone and position for EXTRA units.
    fn advance(&mut self, kind: CtlType, data: &CtlData) -> Option<usize> {
        match kind {
            CtlType::Data if !data.zone.is_empty() && data.zone != self.zone => {
                self.zone.clone_from(&data.zone);
                self.position = 0;
                None
            }
            CtlType::Extra if !self.zone.is_empty() => {
                self.position += 1;
                Some(self.position)
            }
            _ => None,
        }
    }
}

/// `zone-status` → serial and the refresh/expiration timers, by position.
pub fn zone_status(
    session: &mut dyn CtlSession,
    descriptors: &KnotDescriptors,
    options: ZoneStatusOptions,
    sink: &mut dyn MetricSink,
) -> CtlResult<PhaseSummary> {
    session.send_command("zone-status")?;

    let mut cursor = ZoneCursor::default();
    let mut emitted = 0;
    let records = drain_response(session, None, |kind, data| {
        let Some(position) = cursor.advance(kind, data) else {
            return;
        };
        let zone = cursor.zone.as_str();
        let value = data.data.as_str();

        match StatusField::at(position) {
            Some(StatusField::Serial) if options.serial => {
                if let Ok(serial) = value.parse::<f64>() {
                    sink.emit_pair(&descriptors.zone_serial, serial, &[zone]);
                    emitted += 1;
                }
            }
            Some(field @ (StatusField::RefreshTimer | StatusField::ExpirationTimer))
                if options.timers && !value.is_empty() && value != "-" =>
            {
                let Some(seconds) = convert_state_time(value) else {
                    return;
                };
                let pair = match field {
                    StatusField::RefreshTimer => &descriptors.zone_status_refresh,
                    _ => &descriptors.zone_status_expiration,
                };
                trace!(zone, position, value, seconds, "zone status timer");
                sink.emit_pair(pair, seconds, &[zone]);
                emitted += 1;
            }
            _ => {}
        }
    })?;

    debug!(records, emitted, "zone status collected");
    Ok(PhaseSummary { records, emitted })
}

/// `zone-stats` → `knot_zone_stats_<item>{zone, module, type}`.
pub fn zone_stats(
    session: &mut dyn CtlSession,
    descriptors: &KnotDescriptors,
    sink: &mut dyn MetricSink,
) -> CtlResult<PhaseSummary> {
    session.send_command("zone-stats")?;

    let mut emitted = 0;
    let records = drain_response(session, None, |kind, data| {
        if !kind.carries_data() || data.zone.is_empty() || data.item.is_empty() || data.data.is_empty()
        {
            return;
        }
        let Ok(value) = data.data.parse::<f64>() else {
            debug!(zone = %data.zone, item = %data.item, value = %data.data, "non-numeric zone statistic");
            return;
        };
        let pair = descriptors.zone_stats.get(&data.item);
        sink.emit_pair(
            &pair,
            value,
            &[data.zone.as_str(), data.section.as_str(), data.id.as_str()],
        );
        emitted += 1;
    })?;

    debug!(records, emitted, "zone statistics collected");
    Ok(PhaseSummary { records, emitted })
}

/// Timer fields of an SOA record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoaTimers {
    pub serial: i64,
    pub refresh: i64,
    pub retry: i64,
    pub expire: i64,
    pub minimum: i64,
}

/// Parse SOA rdata: `primary. admin. serial refresh retry expire minimum`.
pub fn parse_soa(rdata: &str) -> Option<SoaTimers> {
    let fields: Vec<&str> = rdata.split_whitespace().collect();
    let [primary, admin, numbers @ ..] = fields.as_slice() else {
        return None;
    };
    if numbers.len() != 5 || !primary.ends_with('.') || !admin.ends_with('.') {
        return None;
    }

    let mut parsed = [0i64; 5];
    for (slot, field) in parsed.iter_mut().zip(numbers) {
        *slot = field.parse().ok()?;
    }
    let [serial, refresh, retry, expire, minimum] = parsed;
    Some(SoaTimers {
        serial,
        refresh,
        retry,
        expire,
        minimum,
    })
}

/// `zone-read` of SOA records → refresh, retry and expiration per zone.
pub fn zone_timers(
    session: &mut dyn CtlSession,
    descriptors: &KnotDescriptors,
    sink: &mut dyn MetricSink,
) -> CtlResult<PhaseSummary> {
    session.send_command_with_type("zone-read", "SOA")?;

    let mut emitted = 0;
    let records = drain_response(session, Some(MAX_ZONE_TIMER_RECORDS), |kind, data| {
        if kind != CtlType::Data || data.zone.is_empty() {
            return;
        }
        let Some(soa) = parse_soa(&data.data) else {
            trace!(zone = %data.zone, rdata = %data.data, "not an SOA record");
            return;
        };
        let zone = [data.zone.as_str()];
        sink.emit_pair(&descriptors.zone_refresh, soa.refresh as f64, &zone);
        sink.emit_pair(&descriptors.zone_retry, soa.retry as f64, &zone);
        sink.emit_pair(&descriptors.zone_expiration, soa.expire as f64, &zone);
        emitted += 3;
    })?;

    debug!(records, emitted, "zone timers collected");
    Ok(PhaseSummary { records, emitted })
}
