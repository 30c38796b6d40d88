use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::model::{Device, DeviceStatus, NewDevice, SettingsError, SettingsUpdate};
use crate::{
    clock::Clock,
    energy::{summarize, suggest, EnergySummary, PowerModel, Suggestion},
    store::{DeviceStore, StoreError},
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("device {0} not found")]
    NotFound(Uuid),
    #[error(transparent)]
    InvalidSettings(#[from] SettingsError),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Device CRUD plus the state transitions that move energy forward.
///
/// Every mutation reads the device, applies the transition against the
/// shared power model at the clock's `now`, and writes it back. The
/// read-modify-write runs under a lock shared by all clones, so a state
/// change never lands between another writer's read and save.
#[derive(Clone)]
pub struct DeviceService {
    store: Arc<dyn DeviceStore>,
    model: Arc<PowerModel>,
    clock: Arc<dyn Clock>,
    writes: Arc<Mutex<()>>,
}

impl DeviceService {
    pub fn new(store: Arc<dyn DeviceStore>, model: Arc<PowerModel>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            model,
            clock,
            writes: Arc::new(Mutex::new(())),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn create(&self, new: NewDevice) -> ServiceResult<Device> {
        let device = Device::create(new, self.clock.now(), &mut rand::thread_rng())?;
        self.store.insert(&device).await?;
        info!(
            device_id = %device.id,
            household_id = %device.household_id,
            device_type = %device.device_type(),
            base_power = device.base_power_consumption,
            "Device created"
        );
        Ok(device)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<Device> {
        Ok(self.store.get(id).await?)
    }

    pub async fn list(&self, household_id: Option<&str>) -> ServiceResult<Vec<Device>> {
        Ok(self.store.list(household_id).await?)
    }

    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        self.store.delete(id).await?;
        info!(device_id = %id, "Device deleted");
        Ok(())
    }

    pub async fn toggle(&self, id: Uuid) -> ServiceResult<Device> {
        let _guard = self.writes.lock().await;
        let device = self.store.get(id).await?;
        let status = device.status.toggled();
        self.write_status(device, status).await
    }

    pub async fn set_status(&self, id: Uuid, status: DeviceStatus) -> ServiceResult<Device> {
        let _guard = self.writes.lock().await;
        let device = self.store.get(id).await?;
        self.write_status(device, status).await
    }

    pub async fn update_settings(&self, id: Uuid, update: SettingsUpdate) -> ServiceResult<Device> {
        let _guard = self.writes.lock().await;
        let mut device = self.store.get(id).await?;
        let closed = device.apply_settings(&update, &self.model, self.clock.now())?;
        self.store.save(&device).await?;

        info!(
            device_id = %id,
            power_watts = device.power_consumption,
            increment_kwh = closed.increment_kwh,
            total_kwh = device.total_energy_consumed,
            "Device settings updated"
        );
        Ok(device)
    }

    /// Books the energy a running device has used so far, re-reading it
    /// first. Returns `false` when the device is off and nothing was written.
    pub async fn roll_forward(&self, id: Uuid) -> ServiceResult<bool> {
        let _guard = self.writes.lock().await;
        let mut device = self.store.get(id).await?;
        if device.status != DeviceStatus::On {
            return Ok(false);
        }

        let closed = device.roll_forward(&self.model, self.clock.now());
        self.store.save(&device).await?;

        debug!(
            device_id = %id,
            increment_kwh = closed.increment_kwh,
            total_kwh = device.total_energy_consumed,
            "Energy booked"
        );
        Ok(true)
    }

    pub async fn suggestions(&self, household_id: Option<&str>) -> ServiceResult<Vec<Suggestion>> {
        let devices = self.store.list(household_id).await?;
        Ok(suggest(&devices))
    }

    pub async fn summary(&self, household_id: Option<&str>) -> ServiceResult<EnergySummary> {
        let devices = self.store.list(household_id).await?;
        Ok(summarize(&devices))
    }

    async fn write_status(&self, mut device: Device, status: DeviceStatus) -> ServiceResult<Device> {
        let closed = device.set_status(status, &self.model, self.clock.now());
        self.store.save(&device).await?;

        info!(
            device_id = %device.id,
            status = ?device.status,
            power_watts = device.power_consumption,
            increment_kwh = closed.increment_kwh,
            total_kwh = device.total_energy_consumed,
            "Device status changed"
        );
        Ok(device)
    }
}
