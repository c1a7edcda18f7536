//! In-memory telemetry store.
//!
//! Holds every accepted reading per device plus the bookkeeping needed to
//! derive device status. A single reader/writer lock guards the whole map:
//! writes (one reading or a whole batch) are applied atomically, reads run
//! concurrently with each other.
//!
//! Full history is retained for the lifetime of the process; memory grows
//! with the number of readings ingested.

use crate::clock::{Clock, SystemClock};
use crate::errors::{Error, Result};
use crate::model::{BatchReading, DeviceStatus, SensorReading};
use crate::status::classify;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Bookkeeping kept per device. Status is not stored; it is derived on read.
#[derive(Debug, Clone)]
struct DeviceRecord {
    last_seen: DateTime<Utc>,
    total_readings: u64,
    battery_level: Option<f64>,
}

impl DeviceRecord {
    fn touch(&mut self, last_seen: DateTime<Utc>, stored: u64, battery: Option<f64>) {
        self.last_seen = last_seen;
        self.total_readings += stored;
        // Battery is sticky: a missing or zero value keeps the last known level.
        if let Some(level) = battery.filter(|b| *b > 0.0) {
            self.battery_level = Some(level);
        }
    }
}

/// Readings and record live together so a record exists iff a reading does.
#[derive(Debug)]
struct DeviceEntry {
    readings: Vec<SensorReading>,
    record: DeviceRecord,
}

impl DeviceEntry {
    fn new(first_seen: DateTime<Utc>) -> Self {
        Self {
            readings: Vec::new(),
            record: DeviceRecord {
                last_seen: first_seen,
                total_readings: 0,
                battery_level: None,
            },
        }
    }
}

pub struct TelemetryStore {
    devices: RwLock<HashMap<String, DeviceEntry>>,
    clock: Arc<dyn Clock>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Current time according to the store's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Appends one reading and updates its device's record in the same critical section.
    pub fn store_reading(&self, reading: SensorReading) -> Result<()> {
        if reading.device_id.is_empty() {
            return Err(Error::Internal(
                "reading without device_id reached the store".to_string(),
            ));
        }

        let mut devices = self.devices.write();
        let entry = devices
            .entry(reading.device_id.clone())
            .or_insert_with(|| DeviceEntry::new(reading.timestamp));

        entry.record.touch(reading.timestamp, 1, reading.battery);
        debug!(
            device_id = %reading.device_id,
            total = entry.record.total_readings,
            "reading stored"
        );
        entry.readings.push(reading);

        Ok(())
    }

    /// Appends a whole batch under one write lock.
    ///
    /// The record is updated once, from the item with the greatest timestamp;
    /// on equal timestamps the earlier item wins. That item's battery is used
    /// even when another item in the batch reports a higher one.
    pub fn store_batch(&self, device_id: &str, readings: Vec<BatchReading>) -> Result<()> {
        if device_id.is_empty() {
            return Err(Error::Internal(
                "batch without device_id reached the store".to_string(),
            ));
        }

        let mut latest: Option<(DateTime<Utc>, Option<f64>)> = None;
        for reading in &readings {
            match latest {
                Some((ts, _)) if reading.timestamp <= ts => {}
                _ => latest = Some((reading.timestamp, reading.battery)),
            }
        }
        let Some((last_seen, battery)) = latest else {
            return Err(Error::Internal(format!(
                "empty batch for device {} reached the store",
                device_id
            )));
        };

        let stored = readings.len() as u64;
        let mut devices = self.devices.write();
        let entry = devices
            .entry(device_id.to_string())
            .or_insert_with(|| DeviceEntry::new(last_seen));

        entry
            .readings
            .extend(readings.into_iter().map(|r| r.into_reading(device_id)));
        entry.record.touch(last_seen, stored, battery);
        debug!(
            device_id = %device_id,
            stored,
            total = entry.record.total_readings,
            "batch stored"
        );

        Ok(())
    }

    /// Most recently stored reading, by insertion order.
    pub fn latest_reading(&self, device_id: &str) -> Result<SensorReading> {
        let devices = self.devices.read();
        devices
            .get(device_id)
            .and_then(|entry| entry.readings.last())
            .cloned()
            .ok_or_else(|| Error::DeviceNotFound(device_id.to_string()))
    }

    pub fn device_status(&self, device_id: &str) -> Result<DeviceStatus> {
        let now = self.clock.now();
        let devices = self.devices.read();
        devices
            .get(device_id)
            .map(|entry| snapshot(device_id, &entry.record, now))
            .ok_or_else(|| Error::DeviceNotFound(device_id.to_string()))
    }

    /// Status of every known device, in no particular order.
    pub fn all_devices(&self) -> Vec<DeviceStatus> {
        let now = self.clock.now();
        let devices = self.devices.read();
        devices
            .iter()
            .map(|(id, entry)| snapshot(id, &entry.record, now))
            .collect()
    }

    pub fn device_count(&self) -> usize {
        self.devices.read().len()
    }
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn snapshot(device_id: &str, record: &DeviceRecord, now: DateTime<Utc>) -> DeviceStatus {
    DeviceStatus {
        device_id: device_id.to_string(),
        last_seen: record.last_seen,
        total_readings: record.total_readings,
        status: classify(record.last_seen, now),
        battery_level: record.battery_level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::DeviceState;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn store_at(now: DateTime<Utc>) -> (Arc<ManualClock>, TelemetryStore) {
        let clock = Arc::new(ManualClock::new(now));
        let store = TelemetryStore::with_clock(clock.clone());
        (clock, store)
    }

    fn reading(
        device_id: &str,
        temperature: f64,
        battery: Option<f64>,
        ts: DateTime<Utc>,
    ) -> SensorReading {
        SensorReading {
            device_id: device_id.to_string(),
            temperature,
            humidity: 50.0,
            pressure: None,
            light: None,
            motion: false,
            battery,
            timestamp: ts,
        }
    }

    fn batch_item(battery: f64, ts: DateTime<Utc>) -> BatchReading {
        BatchReading {
            temperature: 21.0,
            humidity: 40.0,
            pressure: Some(1013.0),
            light: None,
            motion: true,
            battery: Some(battery),
            timestamp: ts,
        }
    }

    #[test]
    fn test_unknown_device_not_found() {
        let (_, store) = store_at(t0());
        assert!(matches!(
            store.latest_reading("ghost"),
            Err(Error::DeviceNotFound(id)) if id == "ghost"
        ));
        assert!(matches!(
            store.device_status("ghost"),
            Err(Error::DeviceNotFound(_))
        ));
        assert!(store.all_devices().is_empty());
    }

    #[test]
    fn test_store_then_latest() {
        let (_, store) = store_at(t0());
        let r = reading("dev-1", 22.5, Some(90.0), t0());
        store.store_reading(r.clone()).unwrap();
        assert_eq!(store.latest_reading("dev-1").unwrap(), r);
    }

    #[test]
    fn test_counts_and_single_device_entry() {
        let (_, store) = store_at(t0());
        for i in 0..5 {
            store.store_reading(reading("dev-1", i as f64, None, t0())).unwrap();
        }
        let status = store.device_status("dev-1").unwrap();
        assert_eq!(status.total_readings, 5);

        let all = store.all_devices();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].device_id, "dev-1");
    }

    #[test]
    fn test_latest_is_by_insertion_not_timestamp() {
        let (_, store) = store_at(t0());
        store.store_reading(reading("dev-1", 1.0, None, t0())).unwrap();
        store.store_reading(reading("dev-1", 2.0, None, t0() - Duration::hours(1))).unwrap();
        let latest = store.latest_reading("dev-1").unwrap();
        assert_eq!(latest.temperature, 2.0);
        // last_seen follows the most recent write as well
        assert_eq!(
            store.device_status("dev-1").unwrap().last_seen,
            t0() - Duration::hours(1)
        );
    }

    #[test]
    fn test_battery_is_sticky() {
        let (_, store) = store_at(t0());
        store.store_reading(reading("dev-1", 1.0, Some(75.0), t0())).unwrap();
        store.store_reading(reading("dev-1", 1.0, None, t0())).unwrap();
        store.store_reading(reading("dev-1", 1.0, Some(0.0), t0())).unwrap();
        assert_eq!(store.device_status("dev-1").unwrap().battery_level, Some(75.0));

        store.store_reading(reading("dev-1", 1.0, Some(40.0), t0())).unwrap();
        assert_eq!(store.device_status("dev-1").unwrap().battery_level, Some(40.0));
    }

    #[test]
    fn test_battery_unknown_until_positive() {
        let (_, store) = store_at(t0());
        store.store_reading(reading("dev-1", 1.0, Some(0.0), t0())).unwrap();
        assert_eq!(store.device_status("dev-1").unwrap().battery_level, None);
    }

    #[test]
    fn test_batch_status_follows_latest_timestamp_not_max_battery() {
        let (_, store) = store_at(t0());
        let t = t0();
        store
            .store_batch(
                "dev-1",
                vec![
                    batch_item(50.0, t),
                    batch_item(10.0, t + Duration::seconds(10)),
                    batch_item(90.0, t + Duration::seconds(5)),
                ],
            )
            .unwrap();

        let status = store.device_status("dev-1").unwrap();
        assert_eq!(status.battery_level, Some(10.0));
        assert_eq!(status.last_seen, t + Duration::seconds(10));
        assert_eq!(status.total_readings, 3);

        // latest reading is the last stored item, not the max-timestamp one
        let latest = store.latest_reading("dev-1").unwrap();
        assert_eq!(latest.timestamp, t + Duration::seconds(5));
        assert_eq!(latest.battery, Some(90.0));
        assert_eq!(latest.device_id, "dev-1");
    }

    #[test]
    fn test_batch_timestamp_tie_keeps_first_seen() {
        let (_, store) = store_at(t0());
        store
            .store_batch("dev-1", vec![batch_item(30.0, t0()), batch_item(60.0, t0())])
            .unwrap();
        assert_eq!(store.device_status("dev-1").unwrap().battery_level, Some(30.0));
    }

    #[test]
    fn test_batch_zero_battery_keeps_previous_level() {
        let (_, store) = store_at(t0());
        store.store_reading(reading("dev-1", 1.0, Some(55.0), t0())).unwrap();
        store
            .store_batch(
                "dev-1",
                vec![
                    batch_item(80.0, t0()),
                    batch_item(0.0, t0() + Duration::seconds(1)),
                ],
            )
            .unwrap();
        let status = store.device_status("dev-1").unwrap();
        assert_eq!(status.battery_level, Some(55.0));
        assert_eq!(status.total_readings, 3);
    }

    #[test]
    fn test_malformed_input_is_internal_error() {
        let (_, store) = store_at(t0());
        assert!(matches!(
            store.store_reading(reading("", 1.0, None, t0())),
            Err(Error::Internal(_))
        ));
        assert!(matches!(
            store.store_batch("", vec![batch_item(1.0, t0())]),
            Err(Error::Internal(_))
        ));
        assert!(matches!(
            store.store_batch("dev-1", Vec::new()),
            Err(Error::Internal(_))
        ));
        assert_eq!(store.device_count(), 0);
    }

    #[test]
    fn test_status_recomputed_on_every_read() {
        let (clock, store) = store_at(t0());
        store.store_reading(reading("dev-1", 1.0, None, t0())).unwrap();
        assert_eq!(store.device_status("dev-1").unwrap().status, DeviceState::Online);

        clock.advance(Duration::minutes(5));
        assert_eq!(store.device_status("dev-1").unwrap().status, DeviceState::Idle);

        clock.advance(Duration::minutes(25));
        assert_eq!(store.device_status("dev-1").unwrap().status, DeviceState::Offline);
        assert_eq!(store.all_devices()[0].status, DeviceState::Offline);
    }

    #[test]
    fn test_concurrent_writes_lose_nothing() {
        let store = Arc::new(TelemetryStore::new());
        let writers = 64;

        std::thread::scope(|s| {
            for i in 0..writers {
                let store = store.clone();
                s.spawn(move || {
                    store
                        .store_reading(reading("shared", i as f64, Some(50.0), Utc::now()))
                        .unwrap();
                });
            }
        });

        let status = store.device_status("shared").unwrap();
        assert_eq!(status.total_readings, writers as u64);
        assert_eq!(store.device_count(), 1);
    }

    #[test]
    fn test_batch_never_observed_half_applied() {
        let store = Arc::new(TelemetryStore::new());
        let batch_len = 10;
        store
            .store_batch(
                "dev-1",
                (0..batch_len).map(|_| batch_item(50.0, Utc::now())).collect(),
            )
            .unwrap();

        std::thread::scope(|s| {
            let writer = store.clone();
            s.spawn(move || {
                for _ in 0..200 {
                    let items = (0..batch_len).map(|_| batch_item(50.0, Utc::now())).collect();
                    writer.store_batch("dev-1", items).unwrap();
                }
            });

            for _ in 0..4 {
                let reader = store.clone();
                s.spawn(move || {
                    for _ in 0..500 {
                        let total = reader.device_status("dev-1").unwrap().total_readings;
                        assert_eq!(total % batch_len as u64, 0);
                    }
                });
            }
        });

        assert_eq!(
            store.device_status("dev-1").unwrap().total_readings,
            201 * batch_len as u64
        );
    }
}
