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

//! Entry setup and teardown
//!
//! The host keeps the returned [`MonitorEntry`]; nothing is registered
//! globally. Each entry owns exactly one coordinator.

use crate::client::{MonitorClient, SnapshotSource};
use crate::config::EndpointConfig;
use crate::coordinator::{Coordinator, Subscription};
use crate::errors::{RefreshError, SetupError};
use crate::metrics::METRIC_DESCRIPTORS;
use crate::sensor::{MetricSensor, StatePublisher};
use crate::snapshot::{MetricKey, Snapshot};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{error, info};

pub const ENTRY_TITLE_PREFIX: &str = "Benekov FVE";

fn entry_title(snapshot: &Snapshot) -> String {
    format!(
        "{} ({})",
        ENTRY_TITLE_PREFIX,
        snapshot.get(MetricKey::UserName)
    )
}

fn client_source(config: &EndpointConfig) -> Result<Arc<dyn SnapshotSource>, SetupError> {
    config.validate()?;
    let client = MonitorClient::new(config).map_err(RefreshError::from)?;
    Ok(Arc::new(client))
}

/// One-off connectivity check used by the setup form.
///
/// Returns the entry title, e.g. `Benekov FVE (Dum)`.
pub async fn validate_connection(config: &EndpointConfig) -> Result<String, SetupError> {
    let source = client_source(config)?;
    let probe = Coordinator::new(config.url.clone(), source, config.scan_interval());

    match probe.first_refresh().await {
        Ok(snapshot) => {
            let title = entry_title(&snapshot);
            info!("✅ [FVE SETUP] Connection to {} OK: {}", config.url, title);
            Ok(title)
        }
        Err(e) => {
            let err = SetupError::from(e);
            error!(
                "❌ [FVE SETUP] Connection check for {} failed ({}): {}",
                config.url,
                err.form_error_key(),
                err
            );
            Err(err)
        }
    }
}

/// Build the client and coordinator, await the first refresh and start polling
pub async fn setup_entry(config: &EndpointConfig) -> Result<MonitorEntry, SetupError> {
    let source = client_source(config)?;
    setup_with_source(config, source).await
}

/// Same as [`setup_entry`] with a caller-supplied source
pub async fn setup_with_source(
    config: &EndpointConfig,
    source: Arc<dyn SnapshotSource>,
) -> Result<MonitorEntry, SetupError> {
    info!("🔧 [FVE SETUP] Setting up {}", config.url);

    let coordinator = Coordinator::new(config.url.clone(), source, config.scan_interval());
    let snapshot = coordinator.first_refresh().await.map_err(|e| {
        let err = SetupError::from(e);
        error!("❌ [FVE SETUP] Initial refresh of {} failed: {}", config.url, err);
        err
    })?;

    let sensors = METRIC_DESCRIPTORS
        .iter()
        .map(|descriptor| Arc::new(MetricSensor::new(descriptor, coordinator.clone())))
        .collect::<Vec<_>>();

    coordinator.start();

    let identity = coordinator.identity();
    info!(
        "✅ [FVE SETUP] {} ready: system {} ({}), {} sensors",
        config.url,
        identity.name,
        identity.system_id,
        sensors.len()
    );

    Ok(MonitorEntry {
        title: entry_title(&snapshot),
        config: config.clone(),
        coordinator,
        sensors,
        subscriptions: Mutex::new(Vec::new()),
    })
}

/// A configured endpoint with its running coordinator and sensors
#[derive(Debug)]
pub struct MonitorEntry {
    title: String,
    config: EndpointConfig,
    coordinator: Coordinator,
    sensors: Vec<Arc<MetricSensor>>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl MonitorEntry {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn sensors(&self) -> &[Arc<MetricSensor>] {
        &self.sensors
    }

    /// Connect every sensor to a host sink
    pub fn attach(&self, publisher: &Arc<dyn StatePublisher>) {
        let mut subscriptions = self.subscriptions.lock();
        for sensor in &self.sensors {
            subscriptions.push(sensor.attach(Arc::clone(publisher)));
        }
    }

    pub async fn diagnostics(&self) -> serde_json::Value {
        crate::diagnostics::config_entry_diagnostics(&self.coordinator, &self.config).await
    }

    /// Detach sensors and stop the timer
    pub async fn unload(self) {
        info!("🛑 [FVE SETUP] Unloading {}", self.title);
        self.subscriptions.lock().clear();
        self.coordinator.shutdown().await;
    }
}
