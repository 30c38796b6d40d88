use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::devices::model::{Device, DeviceStatus, DeviceType};

/// More lights than this switched on at once triggers the lighting rule.
const LIGHTS_ON_THRESHOLD: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionCategory {
    Hvac,
    Lighting,
    Standby,
    Scheduling,
}

/// Advisory, non-binding energy-saving hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Suggestion {
    pub title: String,
    pub description: String,
    pub category: SuggestionCategory,
    /// Human-readable saving estimate, e.g. "Up to 10% on heating and cooling".
    pub estimated_saving: String,
}

impl Suggestion {
    fn new(
        title: &str,
        description: &str,
        category: SuggestionCategory,
        estimated_saving: &str,
    ) -> Self {
        Self {
            title: title.to_owned(),
            description: description.to_owned(),
            category,
            estimated_saving: estimated_saving.to_owned(),
        }
    }
}

/// Derives suggestions from the current state of `devices`.
///
/// Rules fire in a fixed order (HVAC, lighting, standby, off-peak) and the
/// output keeps that order.
pub fn suggest(devices: &[Device]) -> Vec<Suggestion> {
    let mut by_type: HashMap<DeviceType, Vec<&Device>> = HashMap::new();
    for device in devices {
        by_type.entry(device.device_type()).or_default().push(device);
    }

    let count_on = |device_type: DeviceType| {
        by_type
            .get(&device_type)
            .map(|ds| ds.iter().filter(|d| d.status == DeviceStatus::On).count())
            .unwrap_or(0)
    };

    let mut suggestions = Vec::new();

    if count_on(DeviceType::Thermostat) > 0 {
        suggestions.push(Suggestion::new(
            "Schedule your thermostat",
            "A thermostat is running. Lowering heating or raising cooling by a couple of \
             degrees while nobody is home cuts HVAC consumption noticeably.",
            SuggestionCategory::Hvac,
            "Up to 10% on heating and cooling",
        ));
    }

    if count_on(DeviceType::Light) > LIGHTS_ON_THRESHOLD {
        suggestions.push(Suggestion::new(
            "Review lighting patterns",
            "Several lights are on at the same time. Dimming or switching off lights in \
             unoccupied rooms reduces lighting energy.",
            SuggestionCategory::Lighting,
            "Around 15% on lighting",
        ));
    }

    if by_type.contains_key(&DeviceType::Tv) {
        suggestions.push(Suggestion::new(
            "Cut standby power",
            "Televisions keep drawing power on standby. Switch them off at the plug or \
             put them on a smart plug schedule overnight.",
            SuggestionCategory::Standby,
            "About 5% of entertainment energy",
        ));
    }

    if !devices.is_empty() {
        suggestions.push(Suggestion::new(
            "Use off-peak hours",
            "Run energy-intensive appliances such as washing machines and dishwashers \
             during off-peak tariff hours.",
            SuggestionCategory::Scheduling,
            "Depends on your tariff",
        ));
    }

    suggestions
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::devices::model::DeviceKind;

    fn device(kind: DeviceKind, status: DeviceStatus) -> Device {
        let now = Utc::now();
        Device {
            id: Uuid::new_v4(),
            household_id: "home".to_owned(),
            name: "device".to_owned(),
            room: None,
            kind,
            status,
            base_power_consumption: 10.0,
            power_consumption: 0.0,
            total_energy_consumed: 0.0,
            last_status_change: now,
            created_at: now,
        }
    }

    fn categories(suggestions: &[Suggestion]) -> Vec<SuggestionCategory> {
        suggestions.iter().map(|s| s.category).collect()
    }

    #[test]
    fn no_devices_no_suggestions() {
        assert!(suggest(&[]).is_empty());
    }

    #[test]
    fn three_lights_on_gives_lighting_then_off_peak() {
        let lights: Vec<_> = (0..3)
            .map(|_| device(DeviceKind::Light { brightness: None }, DeviceStatus::On))
            .collect();
        assert_eq!(
            categories(&suggest(&lights)),
            vec![SuggestionCategory::Lighting, SuggestionCategory::Scheduling]
        );
    }

    #[test]
    fn two_lights_on_is_not_enough() {
        let lights: Vec<_> = (0..2)
            .map(|_| device(DeviceKind::Light { brightness: None }, DeviceStatus::On))
            .collect();
        assert_eq!(categories(&suggest(&lights)), vec![SuggestionCategory::Scheduling]);
    }

    #[test]
    fn lights_that_are_off_do_not_count() {
        let mut lights: Vec<_> = (0..3)
            .map(|_| device(DeviceKind::Light { brightness: None }, DeviceStatus::On))
            .collect();
        lights.push(device(DeviceKind::Light { brightness: None }, DeviceStatus::Off));
        lights[0].status = DeviceStatus::Off;
        assert_eq!(categories(&suggest(&lights)), vec![SuggestionCategory::Scheduling]);
    }

    #[test]
    fn thermostat_only_when_on() {
        let off = [device(DeviceKind::Thermostat { temperature: None }, DeviceStatus::Off)];
        assert_eq!(categories(&suggest(&off)), vec![SuggestionCategory::Scheduling]);

        let on = [device(DeviceKind::Thermostat { temperature: None }, DeviceStatus::On)];
        assert_eq!(
            categories(&suggest(&on)),
            vec![SuggestionCategory::Hvac, SuggestionCategory::Scheduling]
        );
    }

    #[test]
    fn tv_triggers_standby_regardless_of_status() {
        let tv = [device(DeviceKind::Tv, DeviceStatus::Off)];
        assert_eq!(
            categories(&suggest(&tv)),
            vec![SuggestionCategory::Standby, SuggestionCategory::Scheduling]
        );
    }

    #[test]
    fn all_rules_fire_in_order() {
        let mut devices = vec![
            device(DeviceKind::Tv, DeviceStatus::On),
            device(DeviceKind::Thermostat { temperature: Some(19.0) }, DeviceStatus::On),
        ];
        devices.extend(
            (0..3).map(|_| device(DeviceKind::Light { brightness: Some(40.0) }, DeviceStatus::On)),
        );
        assert_eq!(
            categories(&suggest(&devices)),
            vec![
                SuggestionCategory::Hvac,
                SuggestionCategory::Lighting,
                SuggestionCategory::Standby,
                SuggestionCategory::Scheduling,
            ]
        );
    }
}
