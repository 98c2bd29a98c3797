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

//! Response parser: JSON body -> flat, fully-defaulted snapshot

use crate::errors::PayloadError;
use crate::snapshot::{MetricKey, MetricValue, Snapshot, SystemIdentity};
use serde_json::{Map, Value};
use tracing::{debug, error, trace};

/// Where each metric lives in the monitor's JSON document
const FIELD_PATHS: [(MetricKey, &[&str]); MetricKey::COUNT] = [
    (MetricKey::UserName, &["jmeno"]),
    (MetricKey::LastUpdate, &["posledniZaznam"]),
    (MetricKey::TimeOfDay, &["castDne"]),
    (MetricKey::InverterTempC, &["teplotaStridace"]),
    (MetricKey::WifiPercent, &["wifiProc"]),
    (MetricKey::InverterOutputW, &["Inverter output total power"]),
    (MetricKey::TotalConsumptionW, &["spotrebaCelkem"]),
    (MetricKey::GridPowerW, &["vykonSit"]),
    (MetricKey::BatteryPowerW, &["vykonBat"]),
    (MetricKey::PvPowerW, &["vykonFV"]),
    (MetricKey::BatterySocPercent, &["baterie", "soc"]),
    (MetricKey::BatteryVoltageV, &["baterie", "napeti"]),
    (MetricKey::BatteryCurrentA, &["baterie", "proud"]),
    (MetricKey::BatteryTempC, &["baterie", "teplota"]),
    (MetricKey::DailyPurchaseKwh, &["statistika", "denni", "NakupEnergie"]),
    (MetricKey::DailyChargeKwh, &["statistika", "denni", "NabitiBaterie"]),
    (MetricKey::DailyDischargeKwh, &["statistika", "denni", "VybitiBaterie"]),
    (
        MetricKey::Charger2Status,
        &["nabijecka", "nabijecka2", "stavKonektoru"],
    ),
];

static MISSING: Value = Value::Null;

const UID_FIELD: &str = "uid";
const NAME_FIELD: &str = "jmeno";

/// Descend through nested objects one key at a time.
///
/// Returns `default` as soon as the current value is not an object or lacks
/// the next key.
pub fn safe_get<'a>(data: &'a Value, path: &[&str], default: &'a Value) -> &'a Value {
    let mut current = data;
    for key in path {
        match current.as_object().and_then(|object| object.get(*key)) {
            Some(next) => current = next,
            None => return default,
        }
    }
    current
}

/// Turns response bodies into snapshots and remembers the system identity
/// across calls.
#[derive(Debug, Default)]
pub struct ResponseParser {
    identity: SystemIdentity,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(&self) -> &SystemIdentity {
        &self.identity
    }

    pub fn parse(&mut self, text: &str) -> Result<Snapshot, PayloadError> {
        let data: Value = match serde_json::from_str(text) {
            Ok(data) => data,
            Err(e) => {
                error!("❌ [FVE PARSE] Failed to decode JSON from API: {}", e);
                trace!("   Body: {}", text);
                return Err(PayloadError::JsonDecodeFailed);
            }
        };

        let Some(object) = data.as_object() else {
            error!("❌ [FVE PARSE] Payload is not a JSON object");
            return Err(PayloadError::InvalidPayload { payload: data });
        };

        let snapshot = extract_snapshot(&data).map_err(|exception| {
            error!("❌ [FVE PARSE] Metric extraction failed: {}", exception);
            PayloadError::ParseFailed { exception }
        })?;

        self.update_identity(object);
        Ok(snapshot)
    }

    /// Blank or missing identity fields keep the cached values
    fn update_identity(&mut self, object: &Map<String, Value>) {
        let system_id = match object.get(UID_FIELD) {
            Some(Value::String(s)) => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        if let Some(id) = system_id.filter(|id| !id.is_empty()) {
            if id != self.identity.system_id {
                debug!("🏷️ [FVE PARSE] System id: {}", id);
            }
            self.identity.system_id = id;
        }

        if let Some(name) = object
            .get(NAME_FIELD)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
        {
            self.identity.name = name.to_string();
        }
    }
}

fn extract_snapshot(data: &Value) -> Result<Snapshot, String> {
    let mut snapshot = Snapshot::default();

    for (key, path) in FIELD_PATHS {
        let raw = safe_get(data, path, &MISSING);
        let value = match key {
            MetricKey::UserName => match raw {
                Value::Null => None,
                Value::String(s) => Some(MetricValue::Text(s.trim().to_string())),
                other => {
                    return Err(format!(
                        "field '{NAME_FIELD}' must be a string, got {}",
                        type_name(other)
                    ));
                }
            },
            _ => leaf_value(raw).map_err(|kind| {
                format!("field '{}' must be a scalar, got {kind}", path.join("."))
            })?,
        };

        if let Some(value) = value {
            snapshot.set(key, value);
        }
    }

    Ok(snapshot)
}

/// `Ok(None)` keeps the key's default
fn leaf_value(raw: &Value) -> Result<Option<MetricValue>, &'static str> {
    match raw {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(MetricValue::Integer(i64::from(*b)))),
        Value::Number(n) => Ok(n
            .as_i64()
            .map(MetricValue::Integer)
            .or_else(|| n.as_f64().map(MetricValue::Float))),
        Value::String(s) => Ok(Some(MetricValue::Text(s.clone()))),
        other => Err(type_name(other)),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
