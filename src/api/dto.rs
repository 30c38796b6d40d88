use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::devices::model::{
    Device, DeviceKind, DeviceStatus, DeviceType, NewDevice, SettingsError, SettingsUpdate,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeviceDto {
    pub id: Uuid,
    pub household_id: String,
    pub name: String,
    pub room: Option<String>,
    pub device_type: DeviceType,
    pub status: DeviceStatus,
    /// Rated watts
    pub base_power_consumption: f64,
    /// Percent, lights only
    pub brightness: Option<f64>,
    /// Degrees Celsius, thermostats only
    pub temperature: Option<f64>,
    /// Step 1–5, fans only
    pub speed: Option<u8>,
    /// Estimated live draw in watts, 0 while off
    pub power_consumption: f64,
    /// Estimated kWh consumed since the device was registered
    pub total_energy_consumed: f64,
    pub last_status_change: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<Device> for DeviceDto {
    fn from(d: Device) -> Self {
        Self {
            id: d.id,
            device_type: d.device_type(),
            brightness: d.kind.brightness(),
            temperature: d.kind.temperature(),
            speed: d.kind.speed(),
            household_id: d.household_id,
            name: d.name,
            room: d.room,
            status: d.status,
            base_power_consumption: d.base_power_consumption,
            power_consumption: d.power_consumption,
            total_energy_consumed: d.total_energy_consumed,
            last_status_change: d.last_status_change,
            created_at: d.created_at,
        }
    }
}

/// Request body for `POST /devices`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDeviceRequest {
    pub household_id: String,
    pub name: String,
    pub room: Option<String>,
    pub device_type: DeviceType,
    /// Rated watts. Sampled from the type's typical range when omitted.
    pub base_power_consumption: Option<f64>,
    pub brightness: Option<f64>,
    pub temperature: Option<f64>,
    pub speed: Option<u8>,
}

impl TryFrom<CreateDeviceRequest> for NewDevice {
    type Error = SettingsError;

    fn try_from(r: CreateDeviceRequest) -> Result<Self, Self::Error> {
        let settings = SettingsUpdate {
            brightness: r.brightness,
            temperature: r.temperature,
            speed: r.speed,
            base_power_consumption: None,
        };
        let kind = DeviceKind::from_parts(r.device_type, None, None, None).with_settings(&settings)?;

        Ok(Self {
            household_id: r.household_id,
            name: r.name,
            room: r.room,
            kind,
            base_power_consumption: r.base_power_consumption,
        })
    }
}

/// Request body for `PUT /devices/{id}/status`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetStatusRequest {
    pub status: DeviceStatus,
}

/// Request body for `PATCH /devices/{id}/settings`. Omitted fields are left
/// unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateSettingsRequest {
    pub brightness: Option<f64>,
    pub temperature: Option<f64>,
    pub speed: Option<u8>,
    pub base_power_consumption: Option<f64>,
}

impl From<UpdateSettingsRequest> for SettingsUpdate {
    fn from(r: UpdateSettingsRequest) -> Self {
        Self {
            brightness: r.brightness,
            temperature: r.temperature,
            speed: r.speed,
            base_power_consumption: r.base_power_consumption,
        }
    }
}
