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

//! Sensor sink that writes every state change to the log

use benekov_core::{SensorState, StatePublisher};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, info};

/// Logs new sensor values; unchanged values are logged at debug level only
#[derive(Debug, Default)]
pub struct TracingPublisher {
    last: Mutex<HashMap<String, String>>,
}

impl TracingPublisher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatePublisher for TracingPublisher {
    fn publish(&self, state: &SensorState) {
        let value = match state.unit {
            Some(unit) => format!("{} {}", state.state, unit),
            None => state.state.to_string(),
        };

        let changed = self
            .last
            .lock()
            .insert(state.unique_id.clone(), value.clone())
            .is_none_or(|previous| previous != value);

        if changed {
            info!("📊 [FVE STATE] {}: {}", state.name, value);
        } else {
            debug!("[FVE STATE] {}: {} (unchanged)", state.name, value);
        }
    }
}
