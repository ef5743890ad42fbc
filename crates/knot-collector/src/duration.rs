//! Timer strings reported by `zone-status`.
//!
//! Timers look like `+1h28m44s` or `-27D23h58m44s`: a mandatory sign, then
//! optional day, hour, minute and second groups in that order. A few
//! state words stand in for a timer value.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-])(?:([0-9]+)D)?(?:([0-9]+)h)?(?:([0-9]+)m)?(?:([0-9]+)s)?$")
        .expect("duration pattern is valid")
});

/// Seconds per unit, in capture-group order.
const UNIT_SECONDS: [f64; 4] = [86_400.0, 3_600.0, 60.0, 1.0];

/// States meaning the timer is firing or held right now.
const ACTIVE_STATES: [&str; 3] = ["pending", "running", "frozen"];

/// States meaning no timer is scheduled.
const ABSENT_STATES: [&str; 2] = ["not scheduled", "-"];

/// Parse a signed duration into seconds.
///
/// Returns `None` unless the whole string matches and at least one unit
/// group is present, so `"+"` and `"+123"` are rejected.
pub fn parse_duration(s: &str) -> Option<f64> {
    let caps = DURATION_RE.captures(s)?;

    let mut matched = false;
    let mut total = 0.0;
    for (group, unit) in UNIT_SECONDS.iter().enumerate() {
        if let Some(m) = caps.get(group + 2) {
            matched = true;
            total += m.as_str().parse::<f64>().ok()? * unit;
        }
    }
    if !matched {
        return None;
    }

    Some(if &caps[1] == "-" { -total } else { total })
}

/// Convert a `zone-status` timer field to seconds.
///
/// Active states map to `0`, absent states to `None`. Anything else that
/// does not parse is logged and treated as absent.
pub fn convert_state_time(s: &str) -> Option<f64> {
    if ACTIVE_STATES.iter().any(|state| s.starts_with(state)) {
        return Some(0.0);
    }
    if ABSENT_STATES.contains(&s) {
        return None;
    }

    let seconds = parse_duration(s);
    if seconds.is_none() {
        warn!(value = %s, "unable to parse timer value");
    }
    seconds
}
