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

//! Declarative table of the published metrics

use crate::snapshot::MetricKey;
use serde::Serialize;

/// Host device class of a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Power,
    Energy,
    Battery,
    Voltage,
    Current,
    Temperature,
    SignalStrength,
}

impl DeviceClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Energy => "energy",
            Self::Battery => "battery",
            Self::Voltage => "voltage",
            Self::Current => "current",
            Self::Temperature => "temperature",
            Self::SignalStrength => "signal_strength",
        }
    }
}

/// How the host treats the value over time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    Measurement,
    TotalIncreasing,
    Diagnostic,
}

/// Naming group; battery metrics are labelled "<system> Battery <label>"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricGroup {
    #[default]
    System,
    Battery,
}

/// Extra state attribute a sensor carries alongside its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricAttribute {
    pub name: &'static str,
    pub key: MetricKey,
}

pub const CHARGER_2_STATUS_ATTR: MetricAttribute = MetricAttribute {
    name: "Charger 2 Status",
    key: MetricKey::Charger2Status,
};

pub const TIME_OF_DAY_ATTR: MetricAttribute = MetricAttribute {
    name: "Time of Day",
    key: MetricKey::TimeOfDay,
};

pub const LAST_UPDATE_ATTR: MetricAttribute = MetricAttribute {
    name: "Last Update Time",
    key: MetricKey::LastUpdate,
};

const COMMON_ATTRS: &[MetricAttribute] = &[CHARGER_2_STATUS_ATTR, TIME_OF_DAY_ATTR];
const PURCHASE_ATTRS: &[MetricAttribute] =
    &[LAST_UPDATE_ATTR, CHARGER_2_STATUS_ATTR, TIME_OF_DAY_ATTR];

/// Everything needed to publish one metric as a sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricDescriptor {
    pub key: MetricKey,
    pub label: &'static str,
    pub unit: Option<&'static str>,
    pub device_class: Option<DeviceClass>,
    pub category: MetricCategory,
    pub group: MetricGroup,
    pub attributes: &'static [MetricAttribute],
}

impl MetricDescriptor {
    const fn measurement(
        key: MetricKey,
        label: &'static str,
        unit: &'static str,
        device_class: DeviceClass,
    ) -> Self {
        Self {
            key,
            label,
            unit: Some(unit),
            device_class: Some(device_class),
            category: MetricCategory::Measurement,
            group: MetricGroup::System,
            attributes: COMMON_ATTRS,
        }
    }

    const fn battery(mut self) -> Self {
        self.group = MetricGroup::Battery;
        self
    }

    const fn category(mut self, category: MetricCategory) -> Self {
        self.category = category;
        self
    }

    const fn attributes(mut self, attributes: &'static [MetricAttribute]) -> Self {
        self.attributes = attributes;
        self
    }

    /// Display name for a system, e.g. "Dum Battery Temperature"
    pub fn display_name(&self, system_name: &str) -> String {
        match self.group {
            MetricGroup::System => format!("{} {}", system_name, self.label),
            MetricGroup::Battery => format!("{} Battery {}", system_name, self.label),
        }
    }
}

/// Published sensors, in the order they are created
pub static METRIC_DESCRIPTORS: [MetricDescriptor; 11] = [
    MetricDescriptor::measurement(
        MetricKey::TotalConsumptionW,
        "Total Consumption",
        "W",
        DeviceClass::Power,
    ),
    MetricDescriptor::measurement(MetricKey::PvPowerW, "PV Power", "W", DeviceClass::Power),
    MetricDescriptor::measurement(MetricKey::GridPowerW, "Grid Power", "W", DeviceClass::Power),
    MetricDescriptor::measurement(
        MetricKey::BatteryPowerW,
        "Battery Power",
        "W",
        DeviceClass::Power,
    ),
    MetricDescriptor::measurement(
        MetricKey::BatterySocPercent,
        "Battery SOC",
        "%",
        DeviceClass::Battery,
    ),
    MetricDescriptor::measurement(
        MetricKey::BatteryVoltageV,
        "Battery Voltage",
        "V",
        DeviceClass::Voltage,
    ),
    MetricDescriptor::measurement(
        MetricKey::BatteryCurrentA,
        "Battery Current",
        "A",
        DeviceClass::Current,
    ),
    MetricDescriptor::measurement(
        MetricKey::BatteryTempC,
        "Temperature",
        "°C",
        DeviceClass::Temperature,
    )
    .battery(),
    MetricDescriptor::measurement(
        MetricKey::DailyPurchaseKwh,
        "Daily Grid Purchase",
        "kWh",
        DeviceClass::Energy,
    )
    .category(MetricCategory::TotalIncreasing)
    .attributes(PURCHASE_ATTRS),
    MetricDescriptor::measurement(
        MetricKey::InverterTempC,
        "Inverter Temperature",
        "°C",
        DeviceClass::Temperature,
    ),
    MetricDescriptor::measurement(
        MetricKey::WifiPercent,
        "WiFi Signal",
        "%",
        DeviceClass::SignalStrength,
    )
    .category(MetricCategory::Diagnostic),
];

pub fn descriptor(key: MetricKey) -> Option<&'static MetricDescriptor> {
    METRIC_DESCRIPTORS.iter().find(|d| d.key == key)
}
