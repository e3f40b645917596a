use super::{AcquisitionDriver, AcquisitionSource, DeviceInfo};
use super::mock::SimulatedDriver;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of acquisition drivers keyed by driver id
#[derive(Clone)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn AcquisitionDriver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
        }
    }

    /// Registry with every driver compiled into this build
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(SimulatedDriver::new());
        #[cfg(feature = "nidaqmx")]
        registry.register(super::nidaqmx::NiDaqmxDriver::new());
        registry
    }

    pub fn register(&mut self, driver: impl AcquisitionDriver + 'static) {
        self.drivers
            .insert(driver.driver_id().to_string(), Arc::new(driver));
    }

    pub fn get(&self, driver_id: &str) -> Result<Arc<dyn AcquisitionDriver>> {
        self.drivers
            .get(driver_id)
            .cloned()
            .ok_or_else(|| anyhow!("Unknown driver: {}", driver_id))
    }

    /// Sorted driver ids
    pub fn list_drivers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.drivers.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn create_source(&self, driver_id: &str, device_id: &str) -> Result<Box<dyn AcquisitionSource>> {
        self.get(driver_id)?.create_source(device_id)
    }

    /// Discover devices across all drivers; a failing driver is skipped
    pub async fn discover_all(&self) -> Result<Vec<DeviceInfo>> {
        let mut devices = Vec::new();
        for driver_id in self.list_drivers() {
            let driver = self.get(&driver_id)?;
            match driver.discover_devices().await {
                Ok(found) => devices.extend(found),
                Err(e) => log::warn!("Device discovery failed for driver {}: {}", driver_id, e),
            }
        }
        Ok(devices)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
