use std::{collections::BTreeMap, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time;
use tracing::{debug, error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    devices::{
        model::{Device, DeviceStatus},
        DeviceService, ServiceError,
    },
    energy::summarize,
    store::{EnergySnapshot, SnapshotStore, StoreResult},
};

/// Outcome of one collection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CollectionReport {
    /// Devices that were on and had their energy booked.
    pub devices_updated: usize,
    /// One per household.
    pub snapshots_recorded: usize,
    pub collected_at: DateTime<Utc>,
}

/// Periodically books energy for running devices and records per-household
/// snapshots.
///
/// Energy is booked through [`DeviceService`], so a collection pass and a
/// user toggle never overwrite each other.
#[derive(Clone)]
pub struct StatisticsService {
    devices: DeviceService,
    snapshots: Arc<dyn SnapshotStore>,
    interval: Duration,
}

impl StatisticsService {
    pub fn new(devices: DeviceService, snapshots: Arc<dyn SnapshotStore>, interval_secs: u64) -> Self {
        Self {
            devices,
            snapshots,
            interval: Duration::from_secs(interval_secs),
        }
    }

    /// Runs the collection loop indefinitely.
    /// Spawn this via `tokio::spawn`.
    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "Statistics collection loop started");
        let mut ticker = time::interval(self.interval);
        // First tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = self.collect_once().await {
                error!(error = %e, "Statistics collection failed");
            }
        }
    }

    pub async fn collect_once(&self) -> Result<CollectionReport> {
        let now = self.devices.now();
        let running: Vec<Uuid> = self
            .devices
            .list(None)
            .await
            .context("failed to load devices for statistics collection")?
            .into_iter()
            .filter(|d| d.status == DeviceStatus::On)
            .map(|d| d.id)
            .collect();

        let mut devices_updated = 0;
        for id in running {
            match self.devices.roll_forward(id).await {
                Ok(true) => devices_updated += 1,
                Ok(false) => {}
                // Deleted since the list was taken.
                Err(ServiceError::NotFound(_)) => {
                    debug!(device_id = %id, "Device gone before collection");
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("failed to book energy for device {id}"));
                }
            }
        }

        let mut by_household: BTreeMap<String, Vec<Device>> = BTreeMap::new();
        for device in self
            .devices
            .list(None)
            .await
            .context("failed to reload devices for statistics collection")?
        {
            by_household
                .entry(device.household_id.clone())
                .or_default()
                .push(device);
        }

        let mut snapshots_recorded = 0;
        for (household_id, devices) in by_household {
            let summary = summarize(&devices);
            let snapshot = EnergySnapshot {
                id: Uuid::new_v4(),
                household_id,
                recorded_at: now,
                device_count: summary.totals.device_count as i64,
                active_devices: summary.totals.active_devices as i64,
                total_power_watts: summary.totals.total_power_watts,
                total_energy_kwh: summary.totals.total_energy_kwh,
            };
            self.snapshots
                .record(&snapshot)
                .await
                .with_context(|| format!("failed to record snapshot for {}", snapshot.household_id))?;
            snapshots_recorded += 1;
        }

        info!(devices_updated, snapshots_recorded, "Statistics collected");
        Ok(CollectionReport {
            devices_updated,
            snapshots_recorded,
            collected_at: now,
        })
    }

    pub async fn history(
        &self,
        household_id: Option<&str>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<EnergySnapshot>> {
        self.snapshots.history(household_id, from, to).await
    }
}
