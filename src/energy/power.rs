use crate::devices::model::{Device, DeviceKind, DeviceStatus};

/// Tunables of the power heuristic.
///
/// `Default` reproduces the reference figures: 10 W fallback rating, full
/// brightness, a 22 °C thermostat setpoint with +10 % draw per degree of
/// deviation, and fan speeds 1–5 mapping to 0.6×–1.5× the rating.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerModelConfig {
    /// Watts assumed when a device has no usable rating.
    pub default_base_power: f64,
    /// Percent.
    pub default_brightness: f64,
    /// Degrees Celsius assumed when a thermostat has no target temperature.
    pub default_temperature: f64,
    /// Degrees Celsius at which a thermostat draws exactly its rating.
    pub thermostat_setpoint: f64,
    /// Degrees of deviation from the setpoint that add one full rating.
    pub thermostat_deviation_scale: f64,
    pub default_fan_speed: u8,
    /// Multipliers for fan speeds 1..=5, in order.
    pub fan_speed_multipliers: [f64; 5],
    /// Multiplier for fan speeds outside the table.
    pub fallback_fan_multiplier: f64,
}

impl Default for PowerModelConfig {
    fn default() -> Self {
        Self {
            default_base_power: 10.0,
            default_brightness: 100.0,
            default_temperature: 22.0,
            thermostat_setpoint: 22.0,
            thermostat_deviation_scale: 10.0,
            default_fan_speed: 2,
            fan_speed_multipliers: [0.6, 0.8, 1.0, 1.2, 1.5],
            fallback_fan_multiplier: 0.8,
        }
    }
}

/// Estimates the instantaneous draw of a device from its type and settings.
#[derive(Debug, Clone, Default)]
pub struct PowerModel {
    config: PowerModelConfig,
}

impl PowerModel {
    pub fn new(config: PowerModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PowerModelConfig {
        &self.config
    }

    /// Watts drawn by `device` right now. Always `0.0` when the device is off.
    pub fn power(&self, device: &Device) -> f64 {
        match device.status {
            DeviceStatus::Off => 0.0,
            DeviceStatus::On => self.power_if_on(&device.kind, Some(device.base_power_consumption)),
        }
    }

    /// Watts the device would draw while on with the given settings.
    ///
    /// A missing, non-finite or non-positive rating falls back to
    /// `default_base_power`; non-finite settings fall back to their defaults.
    /// Settings extreme enough to push the estimate past `f64` range yield
    /// the bare rating.
    pub fn power_if_on(&self, kind: &DeviceKind, base_power: Option<f64>) -> f64 {
        let cfg = &self.config;
        let base = base_power
            .filter(|w| w.is_finite() && *w > 0.0)
            .unwrap_or(cfg.default_base_power);

        let watts = match *kind {
            DeviceKind::Light { brightness } => {
                let brightness = finite_or(brightness, cfg.default_brightness);
                base * (brightness / 100.0)
            }
            DeviceKind::Thermostat { temperature } => {
                let temperature = finite_or(temperature, cfg.default_temperature);
                let deviation = (temperature - cfg.thermostat_setpoint).abs();
                base * (1.0 + deviation / cfg.thermostat_deviation_scale)
            }
            DeviceKind::Fan { speed } => base * self.fan_multiplier(speed),
            _ => base,
        };

        if watts.is_finite() {
            watts.max(0.0)
        } else {
            base
        }
    }

    fn fan_multiplier(&self, speed: Option<u8>) -> f64 {
        let speed = speed.unwrap_or(self.config.default_fan_speed);
        usize::from(speed)
            .checked_sub(1)
            .and_then(|i| self.config.fan_speed_multipliers.get(i))
            .copied()
            .unwrap_or(self.config.fallback_fan_multiplier)
    }
}

fn finite_or(value: Option<f64>, default: f64) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(default)
}
