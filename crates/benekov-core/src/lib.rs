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

//! Benekov FVE Monitor - polling core
//!
//! Polls one Benekov monitoring endpoint per configured entry, flattens the
//! JSON it returns into a fixed set of metrics and fans each new snapshot out
//! to the sensors attached to the entry.

pub mod client;
pub mod config;
pub mod coordinator;
pub mod diagnostics;
pub mod errors;
pub mod metrics;
pub mod parser;
pub mod sensor;
pub mod setup;
pub mod snapshot;

pub use client::{MonitorClient, SnapshotSource};
pub use config::EndpointConfig;
pub use coordinator::{Coordinator, PollStats, Subscription};
pub use errors::{ClientError, ConfigError, PayloadError, RefreshError, SetupError};
pub use metrics::{METRIC_DESCRIPTORS, MetricDescriptor};
pub use parser::ResponseParser;
pub use sensor::{MetricSensor, SensorState, StatePublisher};
pub use setup::{MonitorEntry, setup_entry, validate_connection};
pub use snapshot::{MetricKey, MetricValue, Snapshot, SystemIdentity};
