use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::devices::model::{Device, DeviceKind, DeviceStatus, DeviceType};

/// One row of the `devices` table.
///
/// Settings live in nullable columns; only the one matching `device_type`
/// is ever populated.
#[derive(Debug, Clone, FromRow)]
pub struct DeviceRow {
    pub id: Uuid,
    pub household_id: String,
    pub name: String,
    pub room: Option<String>,
    pub device_type: DeviceType,
    pub status: DeviceStatus,
    /// Watts
    pub base_power_consumption: f64,
    /// Percent
    pub brightness: Option<f64>,
    /// Degrees Celsius
    pub temperature: Option<f64>,
    pub speed: Option<i16>,
    /// Watts
    pub power_consumption: f64,
    /// kWh
    pub total_energy_consumed: f64,
    pub last_status_change: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<DeviceRow> for Device {
    fn from(r: DeviceRow) -> Self {
        // Out-of-range speeds are kept as an unknown step so the power model
        // applies its fallback multiplier.
        let speed = r.speed.map(|s| u8::try_from(s).unwrap_or(u8::MAX));
        Self {
            id: r.id,
            household_id: r.household_id,
            name: r.name,
            room: r.room,
            kind: DeviceKind::from_parts(r.device_type, r.brightness, r.temperature, speed),
            status: r.status,
            base_power_consumption: r.base_power_consumption,
            power_consumption: r.power_consumption,
            total_energy_consumed: r.total_energy_consumed,
            last_status_change: r.last_status_change,
            created_at: r.created_at,
        }
    }
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        Self {
            id: d.id,
            household_id: d.household_id.clone(),
            name: d.name.clone(),
            room: d.room.clone(),
            device_type: d.device_type(),
            status: d.status,
            base_power_consumption: d.base_power_consumption,
            brightness: d.kind.brightness(),
            temperature: d.kind.temperature(),
            speed: d.kind.speed().map(i16::from),
            power_consumption: d.power_consumption,
            total_energy_consumed: d.total_energy_consumed,
            last_status_change: d.last_status_change,
            created_at: d.created_at,
        }
    }
}
