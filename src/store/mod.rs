//! Persistence seams for devices and energy snapshots.
//!
//! `db::PgStore` backs both traits with Postgres; [`MemoryStore`] keeps
//! everything in process and is used when no database is configured.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::devices::model::Device;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("device {0} not found")]
    NotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable home of device records. Writes are last-write-wins.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// All devices, or only those of `household_id`, oldest first.
    async fn list(&self, household_id: Option<&str>) -> StoreResult<Vec<Device>>;

    async fn get(&self, id: Uuid) -> StoreResult<Device>;

    async fn insert(&self, device: &Device) -> StoreResult<()>;

    /// Overwrites an existing device.
    async fn save(&self, device: &Device) -> StoreResult<()>;

    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

/// Household energy totals at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct EnergySnapshot {
    pub id: Uuid,
    pub household_id: String,
    pub recorded_at: DateTime<Utc>,
    pub device_count: i64,
    pub active_devices: i64,
    /// Watts
    pub total_power_watts: f64,
    /// kWh
    pub total_energy_kwh: f64,
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn record(&self, snapshot: &EnergySnapshot) -> StoreResult<()>;

    /// Snapshots ordered by `recorded_at` ascending, both bounds inclusive.
    async fn history(
        &self,
        household_id: Option<&str>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<EnergySnapshot>>;
}
