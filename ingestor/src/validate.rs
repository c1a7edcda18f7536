use crate::errors::{Error, Result};
use crate::model::{BatchPayload, BatchReading, ReadingPayload, SensorReading, ValidatedBatch};
use chrono::{DateTime, Utc};

const TEMP_MIN: f64 = -100.0;
const TEMP_MAX: f64 = 100.0;
const HUMIDITY_MIN: f64 = 0.0;
const HUMIDITY_MAX: f64 = 100.0;
const BATTERY_MIN: f64 = 0.0;
const BATTERY_MAX: f64 = 100.0;
pub const MAX_BATCH_READINGS: usize = 100;

/// Seconds between the Unix epoch and 0001-01-01T00:00:00Z.
const YEAR_ONE_SECS: i64 = -62_135_596_800;

fn is_unset(ts: &DateTime<Utc>) -> bool {
    ts.timestamp_subsec_nanos() == 0 && matches!(ts.timestamp(), 0 | YEAR_ONE_SECS)
}

fn in_range(value: f64, min: f64, max: f64) -> bool {
    (min..=max).contains(&value)
}

/// Absent, epoch and year-one timestamps are all treated as unset.
fn resolve_timestamp(timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match timestamp {
        Some(ts) if !is_unset(&ts) => ts,
        _ => now,
    }
}

/// Validates a single reading. Every rule is checked and all violations are reported together.
pub fn validate_reading(payload: ReadingPayload, now: DateTime<Utc>) -> Result<SensorReading> {
    let mut violations = Vec::new();

    if payload.device_id.is_empty() {
        violations.push("device_id is required".to_string());
    }

    if !in_range(payload.temperature, TEMP_MIN, TEMP_MAX) {
        violations.push("temperature must be between -100 and 100 celsius".to_string());
    }

    if !in_range(payload.humidity, HUMIDITY_MIN, HUMIDITY_MAX) {
        violations.push("humidity must be between 0 and 100 percent".to_string());
    }

    if let Some(battery) = payload.battery {
        if !in_range(battery, BATTERY_MIN, BATTERY_MAX) {
            violations.push("battery must be between 0 and 100 percent".to_string());
        }
    }

    if !violations.is_empty() {
        return Err(Error::Validation(violations));
    }

    Ok(SensorReading {
        device_id: payload.device_id,
        temperature: payload.temperature,
        humidity: payload.humidity,
        pressure: payload.pressure,
        light: payload.light,
        motion: payload.motion,
        battery: payload.battery,
        timestamp: resolve_timestamp(payload.timestamp, now),
    })
}

/// Validates a batch. Battery is not range-checked on this path.
pub fn validate_batch(payload: BatchPayload, now: DateTime<Utc>) -> Result<ValidatedBatch> {
    let mut violations = Vec::new();

    if payload.device_id.is_empty() {
        violations.push("device_id is required".to_string());
    }

    if payload.readings.is_empty() {
        violations.push("at least one reading is required".to_string());
    }

    if payload.readings.len() > MAX_BATCH_READINGS {
        violations.push(format!("maximum {} readings per batch", MAX_BATCH_READINGS));
    }

    for (i, reading) in payload.readings.iter().enumerate() {
        if !in_range(reading.temperature, TEMP_MIN, TEMP_MAX) {
            violations.push(format!("reading {}: temperature out of range", i));
        }
        if !in_range(reading.humidity, HUMIDITY_MIN, HUMIDITY_MAX) {
            violations.push(format!("reading {}: humidity out of range", i));
        }
    }

    if !violations.is_empty() {
        return Err(Error::Validation(violations));
    }

    let readings = payload
        .readings
        .into_iter()
        .map(|r| BatchReading {
            temperature: r.temperature,
            humidity: r.humidity,
            pressure: r.pressure,
            light: r.light,
            motion: r.motion,
            battery: r.battery,
            timestamp: resolve_timestamp(r.timestamp, now),
        })
        .collect();

    Ok(ValidatedBatch {
        device_id: payload.device_id,
        readings,
    })
}
