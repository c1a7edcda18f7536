use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sensor reading as posted by a device, before validation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ReadingPayload {
    pub device_id: String,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: Option<f64>,
    pub light: Option<f64>,
    pub motion: bool,
    pub battery: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Batch of readings sharing one device id, before validation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchPayload {
    pub device_id: String,
    pub readings: Vec<BatchReadingPayload>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchReadingPayload {
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: Option<f64>,
    pub light: Option<f64>,
    pub motion: bool,
    pub battery: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Accepted reading, owned by the store once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub device_id: String,
    pub temperature: f64,
    pub humidity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light: Option<f64>,
    pub motion: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Accepted batch item; the device id lives on the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReading {
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: Option<f64>,
    pub light: Option<f64>,
    pub motion: bool,
    pub battery: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl BatchReading {
    pub fn into_reading(self, device_id: &str) -> SensorReading {
        SensorReading {
            device_id: device_id.to_string(),
            temperature: self.temperature,
            humidity: self.humidity,
            pressure: self.pressure,
            light: self.light,
            motion: self.motion,
            battery: self.battery,
            timestamp: self.timestamp,
        }
    }
}

/// Validated batch ready for the store.
#[derive(Debug, Clone)]
pub struct ValidatedBatch {
    pub device_id: String,
    pub readings: Vec<BatchReading>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    Online,
    Idle,
    Offline,
}

impl DeviceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceState::Online => "online",
            DeviceState::Idle => "idle",
            DeviceState::Offline => "offline",
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a device; `status` is derived when the snapshot is taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub device_id: String,
    pub last_seen: DateTime<Utc>,
    pub total_readings: u64,
    pub status: DeviceState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<f64>,
}

/// Summary returned after a batch is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReceipt {
    pub device_id: String,
    pub readings_saved: usize,
}
