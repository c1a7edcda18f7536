use crate::errors::Result;
use crate::model::{DeviceStatus, SensorReading};
use crate::store::TelemetryStore;
use std::sync::Arc;

/// Read-side view of the store handed to the HTTP layer.
#[derive(Clone)]
pub struct DeviceQueries {
    store: Arc<TelemetryStore>,
}

impl DeviceQueries {
    pub fn new(store: Arc<TelemetryStore>) -> Self {
        Self { store }
    }

    pub fn latest_reading(&self, device_id: &str) -> Result<SensorReading> {
        self.store.latest_reading(device_id)
    }

    pub fn device_status(&self, device_id: &str) -> Result<DeviceStatus> {
        self.store.device_status(device_id)
    }

    pub fn all_devices(&self) -> Vec<DeviceStatus> {
        self.store.all_devices()
    }
}
