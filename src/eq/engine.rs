// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Filter table and combined response of each channel's filter cascade.

use super::axis::PlotAxes;
use super::biquad::{magnitude_to_db, BiquadCoefficients, DEFAULT_SAMPLE_RATE};
use mixlink_ipc::{ChannelRef, FilterDescriptor, FilterKey, FilterType, FILTER_COUNT};
use num_complex::Complex64;
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::{debug, trace};

pub const DEFAULT_CURVE_POINTS: usize = 1999;

/// Rendering parameters for response curves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseSettings {
    pub axes: PlotAxes,
    pub curve_points: usize,
    pub sample_rate: f64,
}

impl Default for ResponseSettings {
    fn default() -> Self {
        Self {
            axes: PlotAxes::default(),
            curve_points: DEFAULT_CURVE_POINTS,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub frequency: f64,
    pub magnitude_db: f64,
    /// Summed phase of the enabled stages, in radians.
    pub phase: f64,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseCurve {
    pub points: Vec<CurvePoint>,
}

impl ResponseCurve {
    /// SVG path data (`M x,y L x,y ...`) through every point.
    pub fn to_path_data(&self) -> String {
        let mut path = String::with_capacity(self.points.len() * 20);
        for (i, point) in self.points.iter().enumerate() {
            let command = if i == 0 { 'M' } else { 'L' };
            if i > 0 {
                path.push(' ');
            }
            let _ = write!(path, "{}{:.2},{:.2}", command, point.x, point.y);
        }
        path
    }
}

/// Where a band's drag handle sits on the plot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandlePosition {
    pub filter_id: u8,
    pub x: f64,
    pub y: f64,
}

/// Filter descriptors as last confirmed by the processor, keyed by band.
#[derive(Debug, Clone, Default)]
pub struct FrequencyResponseEngine {
    filters: BTreeMap<FilterKey, FilterDescriptor>,
    settings: ResponseSettings,
}

impl FrequencyResponseEngine {
    pub fn new(settings: ResponseSettings) -> Self {
        Self {
            filters: BTreeMap::new(),
            settings,
        }
    }

    /// Records a `notify_filter`. Bands outside 1..=16 are ignored.
    pub fn apply_notification(&mut self, key: FilterKey, filter: FilterDescriptor) -> bool {
        if !key.is_valid() {
            debug!("Ignoring filter update for invalid band {}", key);
            return false;
        }
        trace!("Filter {} now {:?}", key, filter);
        self.filters.insert(key, filter);
        true
    }

    pub fn filter(&self, key: FilterKey) -> Option<&FilterDescriptor> {
        self.filters.get(&key)
    }

    /// Known bands of one channel in band order.
    pub fn filters(&self, channel: ChannelRef) -> impl Iterator<Item = (u8, &FilterDescriptor)> {
        self.filters
            .range(FilterKey::new(channel, 0)..=FilterKey::new(channel, FILTER_COUNT))
            .map(|(key, filter)| (key.filter_id, filter))
    }

    fn stages(&self, channel: ChannelRef) -> Vec<BiquadCoefficients> {
        self.filters(channel)
            .filter(|(_, filter)| filter.enabled)
            .map(|(_, filter)| BiquadCoefficients::design(filter, self.settings.sample_rate))
            .collect()
    }

    /// Product of the enabled stages' responses. Disabled bands are skipped.
    pub fn combined_response(&self, channel: ChannelRef, frequency: f64) -> Complex64 {
        let sample_rate = self.settings.sample_rate;
        self.stages(channel)
            .iter()
            .map(|stage| stage.response(frequency, sample_rate))
            .fold(Complex64::new(1.0, 0.0), |acc, h| acc * h)
    }

    pub fn combined_magnitude(&self, channel: ChannelRef, frequency: f64) -> f64 {
        self.combined_response(channel, frequency).norm()
    }

    pub fn response_curve(&self, channel: ChannelRef) -> ResponseCurve {
        let axes = &self.settings.axes;
        let sample_rate = self.settings.sample_rate;
        let stages = self.stages(channel);

        let points = axes
            .sample_frequencies(self.settings.curve_points)
            .into_iter()
            .map(|frequency| {
                let (magnitude, phase) = stages.iter().fold((1.0, 0.0), |(m, p), stage| {
                    let h = stage.response(frequency, sample_rate);
                    (m * h.norm(), p + h.arg())
                });
                let magnitude_db = magnitude_to_db(magnitude);
                CurvePoint {
                    frequency,
                    magnitude_db,
                    phase,
                    x: axes.frequency_to_x(frequency),
                    y: axes.gain_to_y(magnitude_db),
                }
            })
            .collect();

        ResponseCurve { points }
    }

    pub fn handle_position(&self, key: FilterKey) -> Option<HandlePosition> {
        let filter = self.filters.get(&key)?;
        let axes = &self.settings.axes;
        let y = match filter.filter_type {
            FilterType::Peaking => axes.gain_to_y(filter.gain_db),
            _ => axes.q_to_y(filter.q_factor),
        };
        Some(HandlePosition {
            filter_id: key.filter_id,
            x: axes.frequency_to_x(filter.center_frequency),
            y,
        })
    }

    /// Handles of the enabled bands of `channel`.
    pub fn handles(&self, channel: ChannelRef) -> Vec<HandlePosition> {
        self.filters(channel)
            .filter(|(_, filter)| filter.enabled)
            .filter_map(|(id, _)| self.handle_position(FilterKey::new(channel, id)))
            .collect()
    }

    /// The descriptor a drag to (`x`, `y`) asks for.
    ///
    /// Frequency follows x. Y sets the gain of a peaking band and the Q of
    /// any other type; the remaining fields keep their confirmed values.
    /// The stored descriptor is not touched.
    pub fn drag_edit(&self, key: FilterKey, x: f64, y: f64) -> Option<FilterDescriptor> {
        let mut edited = *self.filters.get(&key)?;
        let axes = &self.settings.axes;
        let (x, y) = axes.clamp_point(x, y);

        edited.center_frequency = axes.x_to_frequency(x);
        if edited.filter_type.uses_gain() {
            edited.gain_db = axes.y_to_gain(y);
        } else {
            edited.q_factor = axes.y_to_q(y);
        }
        Some(edited)
    }
}
