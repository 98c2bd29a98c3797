// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Benekov FVE Monitor.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Generic metric sensor
//!
//! One implementation serves every row of [`METRIC_DESCRIPTORS`]. A sensor
//! reads its value from the coordinator's current snapshot and republishes
//! it to a [`StatePublisher`] whenever a new snapshot arrives.
//!
//! [`METRIC_DESCRIPTORS`]: crate::metrics::METRIC_DESCRIPTORS

use crate::coordinator::{Coordinator, Subscription};
use crate::metrics::{DeviceClass, MetricCategory, MetricDescriptor};
use crate::snapshot::{MetricKey, MetricValue, Snapshot, SystemIdentity};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::trace;

pub const MANUFACTURER: &str = "Benekov";
pub const MODEL: &str = "FVE Monitoring Inverter";
const IDENTIFIER_DOMAIN: &str = "BenekovFVE";

/// Host sink for sensor states
pub trait StatePublisher: Send + Sync {
    fn publish(&self, state: &SensorState);
}

/// Physical device all sensors of one system belong to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifiers: Vec<(String, String)>,
    pub name: String,
    pub manufacturer: &'static str,
    pub model: &'static str,
}

impl DeviceInfo {
    pub fn for_system(identity: &SystemIdentity) -> Self {
        Self {
            identifiers: vec![(identity.system_id.clone(), IDENTIFIER_DOMAIN.to_string())],
            name: identity.name.clone(),
            manufacturer: MANUFACTURER,
            model: MODEL,
        }
    }
}

/// Everything the host needs to show one sensor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    pub unique_id: String,
    pub name: String,
    pub state: MetricValue,
    pub unit: Option<&'static str>,
    pub device_class: Option<DeviceClass>,
    pub category: MetricCategory,
    pub attributes: Map<String, Value>,
    pub device: DeviceInfo,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug)]
pub struct MetricSensor {
    descriptor: &'static MetricDescriptor,
    coordinator: Coordinator,
}

impl MetricSensor {
    pub fn new(descriptor: &'static MetricDescriptor, coordinator: Coordinator) -> Self {
        Self {
            descriptor,
            coordinator,
        }
    }

    pub fn key(&self) -> MetricKey {
        self.descriptor.key
    }

    pub fn name(&self) -> String {
        self.descriptor.display_name(&self.coordinator.identity().name)
    }

    pub fn unique_id(&self) -> String {
        unique_id(&self.coordinator.identity(), self.descriptor.key)
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo::for_system(&self.coordinator.identity())
    }

    /// Value from the current snapshot; `None` before the first refresh
    pub fn native_value(&self) -> Option<MetricValue> {
        self.coordinator
            .current_snapshot()
            .map(|snapshot| snapshot.get(self.descriptor.key).clone())
    }

    pub fn extra_attributes(&self, snapshot: &Snapshot) -> Map<String, Value> {
        self.descriptor
            .attributes
            .iter()
            .map(|attr| (attr.name.to_string(), snapshot.get(attr.key).to_json()))
            .collect()
    }

    /// Current state, `None` before the first refresh
    pub fn state(&self) -> Option<SensorState> {
        let snapshot = self.coordinator.current_snapshot()?;
        Some(self.render(&snapshot, &self.coordinator.identity()))
    }

    pub fn render(&self, snapshot: &Snapshot, identity: &SystemIdentity) -> SensorState {
        SensorState {
            unique_id: unique_id(identity, self.descriptor.key),
            name: self.descriptor.display_name(&identity.name),
            state: snapshot.get(self.descriptor.key).clone(),
            unit: self.descriptor.unit,
            device_class: self.descriptor.device_class,
            category: self.descriptor.category,
            attributes: self.extra_attributes(snapshot),
            device: DeviceInfo::for_system(identity),
            last_updated: Utc::now(),
        }
    }

    /// Publish the current state now and again on every refresh
    pub fn attach(self: &Arc<Self>, publisher: Arc<dyn StatePublisher>) -> Subscription {
        if let Some(state) = self.state() {
            publisher.publish(&state);
        }

        let sensor = Arc::clone(self);
        self.coordinator.register_observer(move |snapshot| {
            let state = sensor.render(snapshot, &sensor.coordinator.identity());
            trace!("[FVE SENSOR] {} = {}", state.unique_id, state.state);
            publisher.publish(&state);
        })
    }
}

pub fn unique_id(identity: &SystemIdentity, key: MetricKey) -> String {
    format!("benekov_fve_{}_{}", identity.system_id, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::descriptor;
    use crate::snapshot::UNKNOWN_SYSTEM_ID;

    fn identity() -> SystemIdentity {
        SystemIdentity {
            system_id: "fve-42".to_string(),
            name: "Dum".to_string(),
        }
    }

    fn sensor(key: MetricKey) -> MetricSensor {
        struct Idle;
        impl crate::client::SnapshotSource for Idle {
            fn fetch(&self) -> crate::errors::ClientResult<String> {
                Ok("{}".to_string())
            }
            fn describe(&self) -> String {
                "idle".to_string()
            }
        }

        let coordinator =
            Coordinator::new("test", Arc::new(Idle), std::time::Duration::from_secs(60));
        MetricSensor::new(descriptor(key).unwrap(), coordinator)
    }

    #[test]
    fn test_render_naming_and_ids() {
        let snapshot = Snapshot::default().with(MetricKey::BatteryTempC, 21.5);
        let state = sensor(MetricKey::BatteryTempC).render(&snapshot, &identity());

        assert_eq!(state.name, "Dum Battery Temperature");
        assert_eq!(state.unique_id, "benekov_fve_fve-42_battery_temp_c");
        assert_eq!(state.state, MetricValue::Float(21.5));
        assert_eq!(state.unit, Some("°C"));
        assert_eq!(state.device.manufacturer, "Benekov");
        assert_eq!(state.device.model, "FVE Monitoring Inverter");
        assert_eq!(
            state.device.identifiers,
            vec![("fve-42".to_string(), "BenekovFVE".to_string())]
        );
    }

    #[test]
    fn test_attributes() {
        let snapshot = Snapshot::default()
            .with(MetricKey::LastUpdate, "2025-06-01 12:00")
            .with(MetricKey::TimeOfDay, "den")
            .with(MetricKey::Charger2Status, "odpojeno");

        let purchase = sensor(MetricKey::DailyPurchaseKwh).render(&snapshot, &identity());
        assert_eq!(purchase.attributes["Last Update Time"], "2025-06-01 12:00");
        assert_eq!(purchase.attributes["Time of Day"], "den");
        assert_eq!(purchase.attributes["Charger 2 Status"], "odpojeno");

        let pv = sensor(MetricKey::PvPowerW).render(&snapshot, &identity());
        assert!(!pv.attributes.contains_key("Last Update Time"));
        assert_eq!(pv.attributes.len(), 2);
    }

    #[test]
    fn test_no_state_before_first_refresh() {
        let sensor = sensor(MetricKey::GridPowerW);
        assert!(sensor.state().is_none());
        assert!(sensor.native_value().is_none());
        assert_eq!(sensor.unique_id(), format!("benekov_fve_{UNKNOWN_SYSTEM_ID}_grid_power_w"));
        assert_eq!(sensor.name(), "Benekov FVE System Grid Power");
    }

    #[tokio::test]
    async fn test_attach_publishes_on_refresh() {
        #[derive(Default)]
        struct Collect(parking_lot::Mutex<Vec<SensorState>>);
        impl StatePublisher for Collect {
            fn publish(&self, state: &SensorState) {
                self.0.lock().push(state.clone());
            }
        }

        let sensor = Arc::new(sensor(MetricKey::WifiPercent));
        let sink = Arc::new(Collect::default());
        let _sub = sensor.attach(Arc::clone(&sink) as Arc<dyn StatePublisher>);
        assert!(sink.0.lock().is_empty());

        sensor.coordinator.request_immediate_refresh().await.unwrap();

        let published = sink.0.lock();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].state, MetricValue::Integer(0));
        assert_eq!(published[0].category, MetricCategory::Diagnostic);
    }
}
