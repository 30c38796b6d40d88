use std::{fmt, ops::RangeInclusive};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::energy::{close_interval, ClosedInterval, OpenInterval, PowerModel};

// ---------------------------------------------------------------------------
// DeviceType / DeviceStatus
// ---------------------------------------------------------------------------

/// Mirrors the `device_type` Postgres enum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "device_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Light,
    Thermostat,
    Fan,
    Tv,
    Lock,
    Plug,
    CoffeeMaker,
    Microwave,
    Refrigerator,
    WashingMachine,
    Other,
}

impl DeviceType {
    pub const ALL: [DeviceType; 11] = [
        DeviceType::Light,
        DeviceType::Thermostat,
        DeviceType::Fan,
        DeviceType::Tv,
        DeviceType::Lock,
        DeviceType::Plug,
        DeviceType::CoffeeMaker,
        DeviceType::Microwave,
        DeviceType::Refrigerator,
        DeviceType::WashingMachine,
        DeviceType::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceType::Light => "light",
            DeviceType::Thermostat => "thermostat",
            DeviceType::Fan => "fan",
            DeviceType::Tv => "tv",
            DeviceType::Lock => "lock",
            DeviceType::Plug => "plug",
            DeviceType::CoffeeMaker => "coffee_maker",
            DeviceType::Microwave => "microwave",
            DeviceType::Refrigerator => "refrigerator",
            DeviceType::WashingMachine => "washing_machine",
            DeviceType::Other => "other",
        }
    }

    /// Typical nameplate range in watts, used when a device is created
    /// without a rating.
    pub fn base_power_range(self) -> RangeInclusive<f64> {
        match self {
            DeviceType::Light => 5.0..=15.0,
            DeviceType::Thermostat => 1000.0..=3000.0,
            DeviceType::Fan => 30.0..=100.0,
            DeviceType::Tv => 50.0..=200.0,
            DeviceType::Lock => 1.0..=5.0,
            DeviceType::Plug => 5.0..=100.0,
            DeviceType::CoffeeMaker => 800.0..=1500.0,
            DeviceType::Microwave => 600.0..=1200.0,
            DeviceType::Refrigerator => 100.0..=400.0,
            DeviceType::WashingMachine => 400.0..=1500.0,
            DeviceType::Other => 10.0..=100.0,
        }
    }

    /// Draws a rating from [`Self::base_power_range`], rounded to 0.1 W.
    pub fn sample_base_power<R: Rng>(self, rng: &mut R) -> f64 {
        let watts = rng.gen_range(self.base_power_range());
        (watts * 10.0).round() / 10.0
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mirrors the `device_status` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "device_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    On,
    Off,
}

impl DeviceStatus {
    pub fn toggled(self) -> Self {
        match self {
            DeviceStatus::On => DeviceStatus::Off,
            DeviceStatus::Off => DeviceStatus::On,
        }
    }
}

// ---------------------------------------------------------------------------
// DeviceKind
// ---------------------------------------------------------------------------

/// Device type together with the settings that type understands.
///
/// `None` settings mean "use the power model's default".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceKind {
    /// Brightness in percent, 0–100.
    Light { brightness: Option<f64> },
    /// Target temperature in °C.
    Thermostat { temperature: Option<f64> },
    /// Speed step, 1–5.
    Fan { speed: Option<u8> },
    Tv,
    Lock,
    Plug,
    CoffeeMaker,
    Microwave,
    Refrigerator,
    WashingMachine,
    Other,
}

impl DeviceKind {
    /// Builds a kind from flat columns, dropping settings that do not apply
    /// to `device_type`.
    pub fn from_parts(
        device_type: DeviceType,
        brightness: Option<f64>,
        temperature: Option<f64>,
        speed: Option<u8>,
    ) -> Self {
        match device_type {
            DeviceType::Light => DeviceKind::Light { brightness },
            DeviceType::Thermostat => DeviceKind::Thermostat { temperature },
            DeviceType::Fan => DeviceKind::Fan { speed },
            DeviceType::Tv => DeviceKind::Tv,
            DeviceType::Lock => DeviceKind::Lock,
            DeviceType::Plug => DeviceKind::Plug,
            DeviceType::CoffeeMaker => DeviceKind::CoffeeMaker,
            DeviceType::Microwave => DeviceKind::Microwave,
            DeviceType::Refrigerator => DeviceKind::Refrigerator,
            DeviceType::WashingMachine => DeviceKind::WashingMachine,
            DeviceType::Other => DeviceKind::Other,
        }
    }

    pub fn device_type(&self) -> DeviceType {
        match self {
            DeviceKind::Light { .. } => DeviceType::Light,
            DeviceKind::Thermostat { .. } => DeviceType::Thermostat,
            DeviceKind::Fan { .. } => DeviceType::Fan,
            DeviceKind::Tv => DeviceType::Tv,
            DeviceKind::Lock => DeviceType::Lock,
            DeviceKind::Plug => DeviceType::Plug,
            DeviceKind::CoffeeMaker => DeviceType::CoffeeMaker,
            DeviceKind::Microwave => DeviceType::Microwave,
            DeviceKind::Refrigerator => DeviceType::Refrigerator,
            DeviceKind::WashingMachine => DeviceType::WashingMachine,
            DeviceKind::Other => DeviceType::Other,
        }
    }

    pub fn brightness(&self) -> Option<f64> {
        match *self {
            DeviceKind::Light { brightness } => brightness,
            _ => None,
        }
    }

    pub fn temperature(&self) -> Option<f64> {
        match *self {
            DeviceKind::Thermostat { temperature } => temperature,
            _ => None,
        }
    }

    pub fn speed(&self) -> Option<u8> {
        match *self {
            DeviceKind::Fan { speed } => speed,
            _ => None,
        }
    }

    /// Returns a copy with the settings present in `update` applied.
    pub fn with_settings(self, update: &SettingsUpdate) -> Result<Self, SettingsError> {
        let device_type = self.device_type();
        let not_applicable = |setting| SettingsError::NotApplicable { setting, device_type };

        let mut kind = self;
        if let Some(b) = update.brightness {
            match &mut kind {
                DeviceKind::Light { brightness } => *brightness = Some(b),
                _ => return Err(not_applicable("brightness")),
            }
        }
        if let Some(t) = update.temperature {
            match &mut kind {
                DeviceKind::Thermostat { temperature } => *temperature = Some(t),
                _ => return Err(not_applicable("temperature")),
            }
        }
        if let Some(s) = update.speed {
            match &mut kind {
                DeviceKind::Fan { speed } => *speed = Some(s),
                _ => return Err(not_applicable("speed")),
            }
        }

        kind.validate()?;
        Ok(kind)
    }

    /// Checks that every present setting is within its documented range.
    pub fn validate(&self) -> Result<(), SettingsError> {
        match *self {
            DeviceKind::Light { brightness: Some(b) } if !(0.0..=100.0).contains(&b) => {
                Err(SettingsError::Brightness(b))
            }
            DeviceKind::Thermostat { temperature: Some(t) } if !t.is_finite() => {
                Err(SettingsError::Temperature)
            }
            DeviceKind::Fan { speed: Some(s) } if !(1..=5).contains(&s) => {
                Err(SettingsError::Speed(s))
            }
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings updates
// ---------------------------------------------------------------------------

/// Partial edit of a device's power-affecting settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub brightness: Option<f64>,
    pub temperature: Option<f64>,
    pub speed: Option<u8>,
    pub base_power_consumption: Option<f64>,
}

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("{setting} does not apply to {device_type} devices")]
    NotApplicable {
        setting: &'static str,
        device_type: DeviceType,
    },
    #[error("brightness must be between 0 and 100, got {0}")]
    Brightness(f64),
    #[error("temperature must be a finite number")]
    Temperature,
    #[error("fan speed must be between 1 and 5, got {0}")]
    Speed(u8),
    #[error("base power consumption must be between 0 and {MAX_BASE_POWER_WATTS} watts, got {0}")]
    BasePower(f64),
}

/// Largest rating accepted for a single device.
pub const MAX_BASE_POWER_WATTS: f64 = 100_000.0;

fn validate_base_power(watts: f64) -> Result<f64, SettingsError> {
    if watts > 0.0 && watts <= MAX_BASE_POWER_WATTS {
        Ok(watts)
    } else {
        Err(SettingsError::BasePower(watts))
    }
}

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

/// Input for registering a device.
#[derive(Debug, Clone)]
pub struct NewDevice {
    pub household_id: String,
    pub name: String,
    pub room: Option<String>,
    pub kind: DeviceKind,
    /// Sampled from the type's typical range when `None`.
    pub base_power_consumption: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: Uuid,
    pub household_id: String,
    pub name: String,
    pub room: Option<String>,
    pub kind: DeviceKind,
    pub status: DeviceStatus,
    /// Watts
    pub base_power_consumption: f64,
    /// Watts, cached from the power model. Zero while off.
    pub power_consumption: f64,
    /// kWh, never decreases.
    pub total_energy_consumed: f64,
    pub last_status_change: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Device {
    /// A fresh device: off, no energy consumed, interval opened at `now`.
    pub fn create<R: Rng>(
        new: NewDevice,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Self, SettingsError> {
        new.kind.validate()?;
        let base_power_consumption = match new.base_power_consumption {
            Some(watts) => validate_base_power(watts)?,
            None => new.kind.device_type().sample_base_power(rng),
        };

        Ok(Self {
            id: Uuid::new_v4(),
            household_id: new.household_id,
            name: new.name,
            room: new.room,
            kind: new.kind,
            status: DeviceStatus::Off,
            base_power_consumption,
            power_consumption: 0.0,
            total_energy_consumed: 0.0,
            last_status_change: now,
            created_at: now,
        })
    }

    pub fn device_type(&self) -> DeviceType {
        self.kind.device_type()
    }

    /// The interval opened by the last state change.
    pub fn open_interval(&self) -> OpenInterval {
        OpenInterval {
            status: self.status,
            power_watts: self.power_consumption,
            started_at: self.last_status_change,
        }
    }

    pub fn set_status(
        &mut self,
        status: DeviceStatus,
        model: &PowerModel,
        now: DateTime<Utc>,
    ) -> ClosedInterval {
        self.transition(model, now, |d| d.status = status)
    }

    pub fn toggle(&mut self, model: &PowerModel, now: DateTime<Utc>) -> ClosedInterval {
        let status = self.status.toggled();
        self.set_status(status, model, now)
    }

    /// Applies `update` after validating it. On error the device is untouched.
    pub fn apply_settings(
        &mut self,
        update: &SettingsUpdate,
        model: &PowerModel,
        now: DateTime<Utc>,
    ) -> Result<ClosedInterval, SettingsError> {
        let kind = self.kind.with_settings(update)?;
        let base_power = update
            .base_power_consumption
            .map(validate_base_power)
            .transpose()?
            .unwrap_or(self.base_power_consumption);

        Ok(self.transition(model, now, |d| {
            d.kind = kind;
            d.base_power_consumption = base_power;
        }))
    }

    /// Books the energy used so far without changing state.
    pub fn roll_forward(&mut self, model: &PowerModel, now: DateTime<Utc>) -> ClosedInterval {
        self.transition(model, now, |_| {})
    }

    fn transition(
        &mut self,
        model: &PowerModel,
        now: DateTime<Utc>,
        change: impl FnOnce(&mut Self),
    ) -> ClosedInterval {
        let closed = close_interval(&self.open_interval(), self.total_energy_consumed, now);
        change(self);
        self.total_energy_consumed = closed.new_total_kwh;
        self.last_status_change = closed.new_last_status_change;
        self.power_consumption = model.power(self);
        closed
    }
}
