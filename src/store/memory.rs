use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DeviceStore, EnergySnapshot, SnapshotStore, StoreError, StoreResult};
use crate::devices::model::Device;

/// In-process device and snapshot store.
///
/// Wrapped in `Arc` so it can be cheaply cloned and shared across tasks.
/// Uses `tokio::sync::RwLock` so concurrent readers never block each other.
#[derive(Clone, Default)]
pub struct MemoryStore {
    devices: Arc<RwLock<HashMap<Uuid, Device>>>,
    snapshots: Arc<RwLock<Vec<EnergySnapshot>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceStore for MemoryStore {
    async fn list(&self, household_id: Option<&str>) -> StoreResult<Vec<Device>> {
        let mut devices: Vec<Device> = self
            .devices
            .read()
            .await
            .values()
            .filter(|d| household_id.map_or(true, |h| d.household_id == h))
            .cloned()
            .collect();
        devices.sort_by_key(|d| (d.created_at, d.id));
        Ok(devices)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Device> {
        self.devices
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn insert(&self, device: &Device) -> StoreResult<()> {
        self.devices.write().await.insert(device.id, device.clone());
        Ok(())
    }

    async fn save(&self, device: &Device) -> StoreResult<()> {
        let mut devices = self.devices.write().await;
        match devices.get_mut(&device.id) {
            Some(slot) => {
                *slot = device.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(device.id)),
        }
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        self.devices
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn record(&self, snapshot: &EnergySnapshot) -> StoreResult<()> {
        self.snapshots.write().await.push(snapshot.clone());
        Ok(())
    }

    async fn history(
        &self,
        household_id: Option<&str>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<EnergySnapshot>> {
        let mut snapshots: Vec<EnergySnapshot> = self
            .snapshots
            .read()
            .await
            .iter()
            .filter(|s| household_id.map_or(true, |h| s.household_id == h))
            .filter(|s| from.map_or(true, |f| s.recorded_at >= f))
            .filter(|s| to.map_or(true, |t| s.recorded_at <= t))
            .cloned()
            .collect();
        snapshots.sort_by_key(|s| s.recorded_at);
        Ok(snapshots)
    }
}
