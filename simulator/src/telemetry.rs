use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Reading {
    pub device_id: String,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub light: f64,
    pub motion: bool,
    pub battery: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub light: f64,
    pub motion: bool,
    pub battery: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Batch {
    pub device_id: String,
    pub readings: Vec<BatchItem>,
}

/// Generates one batch item; a small share is deliberately out of range.
pub fn generate(rng: &mut impl Rng) -> BatchItem {
    let temperature = if rng.gen_bool(0.03) {
        rng.gen_range(100.5..150.0) // rejected by the server
    } else {
        rng.gen_range(15.0..35.0)
    };

    let humidity = if rng.gen_bool(0.03) {
        rng.gen_range(-20.0..-0.5) // rejected by the server
    } else {
        rng.gen_range(30.0..80.0)
    };

    let battery = if rng.gen_bool(0.02) {
        rng.gen_range(0.0..20.0) // low battery
    } else {
        rng.gen_range(20.0..100.0)
    };

    BatchItem {
        temperature,
        humidity,
        pressure: rng.gen_range(980.0..1040.0),
        light: rng.gen_range(0.0..1000.0),
        motion: rng.gen_bool(0.1),
        battery,
        timestamp: Utc::now(),
    }
}

impl BatchItem {
    pub fn with_device(self, device_id: String) -> Reading {
        Reading {
            device_id,
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
