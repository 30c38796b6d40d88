pub mod models;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use self::models::DeviceRow;
use crate::{
    devices::model::Device,
    store::{DeviceStore, EnergySnapshot, SnapshotStore, StoreError, StoreResult},
};

pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

const DEVICE_COLUMNS: &str = r#"
    id, household_id, name, room, device_type, status,
    base_power_consumption, brightness, temperature, speed,
    power_consumption, total_energy_consumed, last_status_change, created_at
"#;

/// Postgres-backed [`DeviceStore`] and [`SnapshotStore`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceStore for PgStore {
    async fn list(&self, household_id: Option<&str>) -> StoreResult<Vec<Device>> {
        let rows = sqlx::query_as::<_, DeviceRow>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices \
             WHERE ($1::text IS NULL OR household_id = $1) \
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(household_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Device> {
        let row = sqlx::query_as::<_, DeviceRow>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into).ok_or(StoreError::NotFound(id))
    }

    async fn insert(&self, device: &Device) -> StoreResult<()> {
        let r = DeviceRow::from(device);
        sqlx::query(
            r#"
            INSERT INTO devices
                (id, household_id, name, room, device_type, status,
                 base_power_consumption, brightness, temperature, speed,
                 power_consumption, total_energy_consumed, last_status_change, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(r.id)
        .bind(r.household_id)
        .bind(r.name)
        .bind(r.room)
        .bind(r.device_type)
        .bind(r.status)
        .bind(r.base_power_consumption)
        .bind(r.brightness)
        .bind(r.temperature)
        .bind(r.speed)
        .bind(r.power_consumption)
        .bind(r.total_energy_consumed)
        .bind(r.last_status_change)
        .bind(r.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save(&self, device: &Device) -> StoreResult<()> {
        let r = DeviceRow::from(device);
        let result = sqlx::query(
            r#"
            UPDATE devices SET
                household_id           = $2,
                name                   = $3,
                room                   = $4,
                status                 = $5,
                base_power_consumption = $6,
                brightness             = $7,
                temperature            = $8,
                speed                  = $9,
                power_consumption      = $10,
                total_energy_consumed  = $11,
                last_status_change     = $12
            WHERE id = $1
            "#,
        )
        .bind(r.id)
        .bind(r.household_id)
        .bind(r.name)
        .bind(r.room)
        .bind(r.status)
        .bind(r.base_power_consumption)
        .bind(r.brightness)
        .bind(r.temperature)
        .bind(r.speed)
        .bind(r.power_consumption)
        .bind(r.total_energy_consumed)
        .bind(r.last_status_change)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(device.id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM devices WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for PgStore {
    async fn record(&self, s: &EnergySnapshot) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO energy_snapshots
                (id, household_id, recorded_at, device_count, active_devices,
                 total_power_watts, total_energy_kwh)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(s.id)
        .bind(&s.household_id)
        .bind(s.recorded_at)
        .bind(s.device_count)
        .bind(s.active_devices)
        .bind(s.total_power_watts)
        .bind(s.total_energy_kwh)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn history(
        &self,
        household_id: Option<&str>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<EnergySnapshot>> {
        let rows = sqlx::query_as::<_, EnergySnapshot>(
            r#"
            SELECT id, household_id, recorded_at, device_count, active_devices,
                   total_power_watts, total_energy_kwh
            FROM energy_snapshots
            WHERE ($1::text IS NULL OR household_id = $1)
              AND ($2::timestamptz IS NULL OR recorded_at >= $2)
              AND ($3::timestamptz IS NULL OR recorded_at <= $3)
            ORDER BY recorded_at ASC
            "#,
        )
        .bind(household_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// Tests (need a Postgres instance reachable through DATABASE_URL)
// ---------------------------------------------------------------------------
