// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mapping between filter parameters and plot coordinates.
//!
//! Frequency runs logarithmically left to right. Gain and Q share the
//! vertical axis, both linear with the maximum at the top (y = 0).

use mixlink_ipc::{FREQUENCY_RANGE, GAIN_RANGE, Q_RANGE};

pub const DEFAULT_PLOT_WIDTH: f64 = 1200.0;
pub const DEFAULT_PLOT_HEIGHT: f64 = 300.0;

/// Plot dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotAxes {
    pub width: f64,
    pub height: f64,
}

impl Default for PlotAxes {
    fn default() -> Self {
        Self {
            width: DEFAULT_PLOT_WIDTH,
            height: DEFAULT_PLOT_HEIGHT,
        }
    }
}

impl PlotAxes {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn log_span() -> (f64, f64) {
        let lo = FREQUENCY_RANGE.start().log10();
        let hi = FREQUENCY_RANGE.end().log10();
        (lo, hi - lo)
    }

    pub fn frequency_to_x(&self, frequency: f64) -> f64 {
        let (lo, span) = Self::log_span();
        (frequency.log10() - lo) / span * self.width
    }

    pub fn x_to_frequency(&self, x: f64) -> f64 {
        let (lo, span) = Self::log_span();
        10f64.powf(x / self.width * span + lo)
    }

    pub fn gain_to_y(&self, gain_db: f64) -> f64 {
        linear_to_y(gain_db, GAIN_RANGE.start(), GAIN_RANGE.end(), self.height)
    }

    pub fn y_to_gain(&self, y: f64) -> f64 {
        y_to_linear(y, GAIN_RANGE.start(), GAIN_RANGE.end(), self.height)
    }

    pub fn q_to_y(&self, q: f64) -> f64 {
        linear_to_y(q, Q_RANGE.start(), Q_RANGE.end(), self.height)
    }

    pub fn y_to_q(&self, y: f64) -> f64 {
        y_to_linear(y, Q_RANGE.start(), Q_RANGE.end(), self.height)
    }

    /// Pulls a pointer position back inside the plot.
    pub fn clamp_point(&self, x: f64, y: f64) -> (f64, f64) {
        (x.clamp(0.0, self.width), y.clamp(0.0, self.height))
    }

    /// `points` frequencies evenly spaced along the x axis, both ends included.
    pub fn sample_frequencies(&self, points: usize) -> Vec<f64> {
        match points {
            0 => Vec::new(),
            1 => vec![*FREQUENCY_RANGE.start()],
            _ => {
                let last = (points - 1) as f64;
                (0..points)
                    .map(|i| self.x_to_frequency(i as f64 / last * self.width))
                    .collect()
            }
        }
    }
}

fn linear_to_y(value: f64, min: &f64, max: &f64, height: f64) -> f64 {
    (max - value) / (max - min) * height
}

fn y_to_linear(y: f64, min: &f64, max: &f64, height: f64) -> f64 {
    max - y / height * (max - min)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_frequency_axis_endpoints() {
        let axes = PlotAxes::default();
        assert!(axes.frequency_to_x(20.0).abs() < EPS);
        assert!((axes.frequency_to_x(20000.0) - 1200.0).abs() < EPS);
        // One decade of three.
        assert!((axes.frequency_to_x(200.0) - 400.0).abs() < 1e-6);
    }

    #[test]
    fn test_frequency_axis_inverse() {
        let axes = PlotAxes::new(800.0, 200.0);
        for frequency in [20.0, 31.5, 100.0, 1000.0, 2000.0, 12345.6, 20000.0] {
            let back = axes.x_to_frequency(axes.frequency_to_x(frequency));
            assert!((back - frequency).abs() / frequency < 1e-9, "{}", frequency);
        }
        for x in [0.0, 1.5, 400.0, 799.0, 800.0] {
            assert!((axes.frequency_to_x(axes.x_to_frequency(x)) - x).abs() < 1e-9);
        }
    }

    #[test]
    fn test_gain_axis_is_inverted_and_invertible() {
        let axes = PlotAxes::default();
        assert!(axes.gain_to_y(20.0).abs() < EPS);
        assert!((axes.gain_to_y(0.0) - 150.0).abs() < EPS);
        assert!((axes.gain_to_y(-20.0) - 300.0).abs() < EPS);

        for y in [0.0, 37.5, 150.0, 299.0, 300.0] {
            assert!((axes.gain_to_y(axes.y_to_gain(y)) - y).abs() < EPS);
        }
        for gain in [-20.0, -3.0, 0.0, 6.0, 20.0] {
            assert!((axes.y_to_gain(axes.gain_to_y(gain)) - gain).abs() < EPS);
        }
    }

    #[test]
    fn test_q_axis_inverse() {
        let axes = PlotAxes::default();
        assert!(axes.q_to_y(18.0).abs() < EPS);
        assert!((axes.q_to_y(0.1) - 300.0).abs() < EPS);
        for q in [0.1, 0.707, 1.0, 9.0, 18.0] {
            assert!((axes.y_to_q(axes.q_to_y(q)) - q).abs() < EPS);
        }
    }

    #[test]
    fn test_sample_frequencies_span_range() {
        let axes = PlotAxes::default();
        let samples = axes.sample_frequencies(1999);
        assert_eq!(samples.len(), 1999);
        assert!((samples[0] - 20.0).abs() < 1e-9);
        assert!((samples[1998] - 20000.0).abs() < 1e-6);
        assert!(samples.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_clamp_point() {
        let axes = PlotAxes::default();
        assert_eq!(axes.clamp_point(-5.0, 400.0), (0.0, 300.0));
        assert_eq!(axes.clamp_point(600.0, 20.0), (600.0, 20.0));
    }
}
