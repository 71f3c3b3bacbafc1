// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Application configuration (server address, plot, monitoring, logging).

use crate::eq::{
    PlotAxes, ResponseSettings, DEFAULT_CURVE_POINTS, DEFAULT_PLOT_HEIGHT, DEFAULT_PLOT_WIDTH,
    DEFAULT_SAMPLE_RATE,
};
use mixlink_ipc::DEFAULT_SERVER_ADDRESS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the audio processor listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub address: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_SERVER_ADDRESS.to_string(),
        }
    }
}

/// Equalizer plot geometry and response sampling.
///
/// Read by library consumers that open an [`crate::eq::EqualizerView`];
/// the headless monitor does not draw curves and ignores this section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EqualizerConfig {
    pub plot_width: f64,
    pub plot_height: f64,
    /// Samples along the response curve.
    pub curve_points: usize,
    /// Sample rate the processor runs its filters at.
    pub sample_rate: f64,
}

impl Default for EqualizerConfig {
    fn default() -> Self {
        Self {
            plot_width: DEFAULT_PLOT_WIDTH,
            plot_height: DEFAULT_PLOT_HEIGHT,
            curve_points: DEFAULT_CURVE_POINTS,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl EqualizerConfig {
    pub fn response_settings(&self) -> ResponseSettings {
        ResponseSettings {
            axes: PlotAxes::new(self.plot_width, self.plot_height),
            curve_points: self.curve_points,
            sample_rate: self.sample_rate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Meter poll period; 0 disables polling.
    pub meter_poll_interval_ms: u64,
    /// Query every gain, mute and route after startup.
    pub request_snapshot: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            meter_poll_interval_ms: 0,
            request_snapshot: true,
        }
    }
}

impl MonitorConfig {
    pub fn meter_poll_interval(&self) -> Option<Duration> {
        (self.meter_poll_interval_ms > 0).then(|| Duration::from_millis(self.meter_poll_interval_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "mixlink=debug,mixlink_ipc=info".to_string(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub equalizer: EqualizerConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load config from TOML string.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Serialize to TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
