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

//! Flattened metric snapshot produced by one successful poll

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::fmt;

/// Every metric key a snapshot carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKey {
    UserName,
    LastUpdate,
    TimeOfDay,
    InverterTempC,
    WifiPercent,
    InverterOutputW,
    TotalConsumptionW,
    GridPowerW,
    BatteryPowerW,
    PvPowerW,
    BatterySocPercent,
    BatteryVoltageV,
    BatteryCurrentA,
    BatteryTempC,
    DailyPurchaseKwh,
    DailyChargeKwh,
    DailyDischargeKwh,
    Charger2Status,
}

impl MetricKey {
    pub const COUNT: usize = 18;

    pub const ALL: [MetricKey; Self::COUNT] = [
        Self::UserName,
        Self::LastUpdate,
        Self::TimeOfDay,
        Self::InverterTempC,
        Self::WifiPercent,
        Self::InverterOutputW,
        Self::TotalConsumptionW,
        Self::GridPowerW,
        Self::BatteryPowerW,
        Self::PvPowerW,
        Self::BatterySocPercent,
        Self::BatteryVoltageV,
        Self::BatteryCurrentA,
        Self::BatteryTempC,
        Self::DailyPurchaseKwh,
        Self::DailyChargeKwh,
        Self::DailyDischargeKwh,
        Self::Charger2Status,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserName => "user_name",
            Self::LastUpdate => "last_update",
            Self::TimeOfDay => "time_of_day",
            Self::InverterTempC => "inverter_temp_c",
            Self::WifiPercent => "wifi_percent",
            Self::InverterOutputW => "inverter_output_w",
            Self::TotalConsumptionW => "total_consumption_w",
            Self::GridPowerW => "grid_power_w",
            Self::BatteryPowerW => "battery_power_w",
            Self::PvPowerW => "pv_power_w",
            Self::BatterySocPercent => "battery_soc_percent",
            Self::BatteryVoltageV => "battery_voltage_v",
            Self::BatteryCurrentA => "battery_current_a",
            Self::BatteryTempC => "battery_temp_c",
            Self::DailyPurchaseKwh => "daily_purchase_kwh",
            Self::DailyChargeKwh => "daily_charge_kwh",
            Self::DailyDischargeKwh => "daily_discharge_kwh",
            Self::Charger2Status => "charger_2_status",
        }
    }

    /// Value used when the source field is missing or null
    pub fn default_value(self) -> MetricValue {
        match self {
            Self::UserName | Self::LastUpdate | Self::TimeOfDay | Self::Charger2Status => {
                MetricValue::not_available()
            }
            Self::WifiPercent
            | Self::InverterOutputW
            | Self::TotalConsumptionW
            | Self::GridPowerW
            | Self::BatteryPowerW
            | Self::PvPowerW
            | Self::BatterySocPercent => MetricValue::Integer(0),
            Self::InverterTempC
            | Self::BatteryVoltageV
            | Self::BatteryCurrentA
            | Self::BatteryTempC
            | Self::DailyPurchaseKwh
            | Self::DailyChargeKwh
            | Self::DailyDischargeKwh => MetricValue::Float(0.0),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MetricKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

pub const NOT_AVAILABLE: &str = "N/A";

/// Scalar metric value
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl MetricValue {
    pub fn not_available() -> Self {
        Self::Text(NOT_AVAILABLE.to_string())
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Integer(v) => Value::from(*v),
            Self::Float(v) => Value::from(*v),
            Self::Text(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Integer(v) => serializer.serialize_i64(*v),
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// One fully-defaulted set of metrics.
///
/// Every [`MetricKey`] always has a value, so readers never check for
/// missing keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    values: [MetricValue; MetricKey::COUNT],
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            values: MetricKey::ALL.map(MetricKey::default_value),
        }
    }
}

impl Snapshot {
    pub fn get(&self, key: MetricKey) -> &MetricValue {
        &self.values[key.index()]
    }

    pub fn set(&mut self, key: MetricKey, value: MetricValue) {
        self.values[key.index()] = value;
    }

    pub fn with(mut self, key: MetricKey, value: impl Into<MetricValue>) -> Self {
        self.set(key, value.into());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricKey, &MetricValue)> {
        MetricKey::ALL.into_iter().zip(self.values.iter())
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.iter()
                .map(|(key, value)| (key.as_str().to_string(), value.to_json()))
                .collect(),
        )
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(MetricKey::COUNT))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key.as_str(), value)?;
        }
        map.end()
    }
}

pub const UNKNOWN_SYSTEM_ID: &str = "unknown_benekov_system";
pub const DEFAULT_SYSTEM_NAME: &str = "Benekov FVE System";

/// Identity of the physical system behind an endpoint
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SystemIdentity {
    pub system_id: String,
    pub name: String,
}

impl Default for SystemIdentity {
    fn default() -> Self {
        Self {
            system_id: UNKNOWN_SYSTEM_ID.to_string(),
            name: DEFAULT_SYSTEM_NAME.to_string(),
        }
    }
}
