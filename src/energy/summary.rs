use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::devices::model::{Device, DeviceStatus, DeviceType};

/// Room label for devices that are not assigned to a room.
pub const UNASSIGNED_ROOM: &str = "unassigned";

/// Totals for one slice of the device list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UsageTotals {
    pub device_count: usize,
    pub active_devices: usize,
    /// Watts
    pub total_power_watts: f64,
    /// kWh
    pub total_energy_kwh: f64,
}

impl UsageTotals {
    fn add(&mut self, device: &Device) {
        self.device_count += 1;
        if device.status == DeviceStatus::On {
            self.active_devices += 1;
        }
        self.total_power_watts += device.power_consumption;
        self.total_energy_kwh += device.total_energy_consumed;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TypeUsage {
    pub device_type: DeviceType,
    #[serde(flatten)]
    pub totals: UsageTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RoomUsage {
    pub room: String,
    #[serde(flatten)]
    pub totals: UsageTotals,
}

/// Dashboard aggregate over a set of devices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EnergySummary {
    #[serde(flatten)]
    pub totals: UsageTotals,
    /// Ordered by device type.
    pub by_type: Vec<TypeUsage>,
    /// Ordered by room name.
    pub by_room: Vec<RoomUsage>,
}

/// Aggregates the cached power and accumulated energy of `devices`.
pub fn summarize(devices: &[Device]) -> EnergySummary {
    let mut totals = UsageTotals::default();
    let mut by_type: BTreeMap<DeviceType, UsageTotals> = BTreeMap::new();
    let mut by_room: BTreeMap<&str, UsageTotals> = BTreeMap::new();

    for device in devices {
        totals.add(device);
        by_type.entry(device.device_type()).or_default().add(device);
        by_room
            .entry(device.room.as_deref().unwrap_or(UNASSIGNED_ROOM))
            .or_default()
            .add(device);
    }

    EnergySummary {
        totals,
        by_type: by_type
            .into_iter()
            .map(|(device_type, totals)| TypeUsage { device_type, totals })
            .collect(),
        by_room: by_room
            .into_iter()
            .map(|(room, totals)| RoomUsage {
                room: room.to_owned(),
                totals,
            })
            .collect(),
    }
}
