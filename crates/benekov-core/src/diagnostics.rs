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

//! Diagnostics dump for one configured endpoint

use crate::config::EndpointConfig;
use crate::coordinator::Coordinator;
use crate::snapshot::{MetricKey, Snapshot};
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Minimal support data: signal strength, last record time, poll counters and
/// the configuration with the token redacted.
///
/// Falls back to an immediate refresh when nothing has been polled yet. A
/// failed refresh is logged and leaves the metric fields `null`.
pub async fn config_entry_diagnostics(coordinator: &Coordinator, config: &EndpointConfig) -> Value {
    debug!("[FVE DIAG] Collecting diagnostics for {}", coordinator.name());

    let snapshot = match coordinator.current_snapshot() {
        Some(snapshot) => Some(snapshot),
        None => match coordinator.request_immediate_refresh().await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("⚠️ [FVE DIAG] Failed to fetch diagnostics data: {}", e);
                None
            }
        },
    };

    let field = |key: MetricKey| {
        snapshot
            .as_deref()
            .map_or(Value::Null, |s: &Snapshot| s.get(key).to_json())
    };

    json!({
        "wifi_percent": field(MetricKey::WifiPercent),
        "last_update": field(MetricKey::LastUpdate),
        "identity": coordinator.identity(),
        "poll_stats": coordinator.stats(),
        "config": config.redacted(),
    })
}
