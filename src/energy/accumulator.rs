use chrono::{DateTime, Utc};
use tracing::warn;

use crate::devices::model::DeviceStatus;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// The energy interval a device has had open since its last state change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenInterval {
    /// Status the device held during the interval.
    pub status: DeviceStatus,
    /// Watts in effect during the interval.
    pub power_watts: f64,
    pub started_at: DateTime<Utc>,
}

/// Result of closing an [`OpenInterval`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosedInterval {
    pub increment_kwh: f64,
    pub new_total_kwh: f64,
    /// Start of the next interval, always `now`.
    pub new_last_status_change: DateTime<Utc>,
}

/// Folds the energy used during `interval` into `prior_total_kwh`.
///
/// Nothing accrues for an interval spent off. A `now` earlier than the
/// interval start counts as zero elapsed time.
pub fn close_interval(
    interval: &OpenInterval,
    prior_total_kwh: f64,
    now: DateTime<Utc>,
) -> ClosedInterval {
    let increment_kwh = match interval.status {
        DeviceStatus::On => {
            let elapsed_ms = (now - interval.started_at).num_milliseconds();
            if elapsed_ms < 0 {
                warn!(
                    started_at = %interval.started_at,
                    now = %now,
                    "Clock skew: interval ends before it starts, counting no energy"
                );
            }
            energy_kwh(interval.power_watts, elapsed_ms)
        }
        DeviceStatus::Off => 0.0,
    };

    ClosedInterval {
        increment_kwh,
        new_total_kwh: prior_total_kwh + increment_kwh,
        new_last_status_change: now,
    }
}

/// Energy in kWh for a constant draw held for `elapsed_ms` milliseconds.
pub fn energy_kwh(power_watts: f64, elapsed_ms: i64) -> f64 {
    let hours = elapsed_ms.max(0) as f64 / MILLIS_PER_HOUR;
    power_watts.max(0.0) * hours / 1000.0
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
    }

    fn on(power_watts: f64) -> OpenInterval {
        OpenInterval {
            status: DeviceStatus::On,
            power_watts,
            started_at: t0(),
        }
    }

    #[test]
    fn one_hour_of_sixty_watts() {
        let closed = close_interval(&on(60.0), 0.0, t0() + Duration::hours(1));
        assert!((closed.increment_kwh - 0.06).abs() < 1e-12);
        assert!((closed.new_total_kwh - 0.06).abs() < 1e-12);
        assert_eq!(closed.new_last_status_change, t0() + Duration::hours(1));
    }

    #[test]
    fn zero_elapsed_adds_nothing() {
        let closed = close_interval(&on(2000.0), 1.25, t0());
        assert_eq!(closed.increment_kwh, 0.0);
        assert_eq!(closed.new_total_kwh, 1.25);
    }

    #[test]
    fn doubling_power_doubles_increment() {
        let now = t0() + Duration::minutes(90);
        let single = close_interval(&on(150.0), 0.0, now);
        let double = close_interval(&on(300.0), 0.0, now);
        assert!((double.increment_kwh - 2.0 * single.increment_kwh).abs() < 1e-12);
    }

    #[test]
    fn off_interval_only_resets_clock() {
        let interval = OpenInterval {
            status: DeviceStatus::Off,
            power_watts: 0.0,
            started_at: t0(),
        };
        let now = t0() + Duration::hours(5);
        let closed = close_interval(&interval, 3.0, now);
        assert_eq!(closed.increment_kwh, 0.0);
        assert_eq!(closed.new_total_kwh, 3.0);
        assert_eq!(closed.new_last_status_change, now);
    }

    #[test]
    fn clock_skew_is_clamped_to_zero() {
        let now = t0() - Duration::minutes(10);
        let closed = close_interval(&on(60.0), 0.5, now);
        assert_eq!(closed.increment_kwh, 0.0);
        assert_eq!(closed.new_total_kwh, 0.5);
        assert_eq!(closed.new_last_status_change, now);
    }

    #[test]
    fn energy_kwh_handles_partial_hours() {
        assert!((energy_kwh(1000.0, 1_800_000) - 0.5).abs() < 1e-12);
        assert_eq!(energy_kwh(-10.0, 3_600_000), 0.0);
    }
}
