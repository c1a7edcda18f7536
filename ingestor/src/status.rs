use crate::model::DeviceState;
use chrono::{DateTime, Duration, Utc};

/// A device is online while its last reading is younger than this.
pub const ONLINE_WINDOW_SECS: i64 = 5 * 60;
/// Past this age a device is offline; between the two windows it is idle.
pub const IDLE_WINDOW_SECS: i64 = 30 * 60;

/// Classifies a device by the age of its most recent reading.
///
/// Readings stamped in the future count as online.
pub fn classify(last_seen: DateTime<Utc>, now: DateTime<Utc>) -> DeviceState {
    let age = now - last_seen;

    if age < Duration::seconds(ONLINE_WINDOW_SECS) {
        DeviceState::Online
    } else if age < Duration::seconds(IDLE_WINDOW_SECS) {
        DeviceState::Idle
    } else {
        DeviceState::Offline
    }
}
