// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Second-order filter stages, designed the same way the processor does.

use mixlink_ipc::{FilterDescriptor, FilterType, Q_RANGE};
use num_complex::Complex64;
use std::f64::consts::PI;

pub const DEFAULT_SAMPLE_RATE: f64 = 48000.0;

/// Normalized transfer function coefficients (a0 = 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoefficients {
    /// Passes everything unchanged.
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    pub fn design(filter: &FilterDescriptor, sample_rate: f64) -> Self {
        // Keep the design stable for out-of-range input.
        let nyquist = sample_rate / 2.0;
        let frequency = filter.center_frequency.clamp(1.0, nyquist * 0.999);
        let q = filter.q_factor.clamp(*Q_RANGE.start(), *Q_RANGE.end());

        let w0 = 2.0 * PI * frequency / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        match filter.filter_type {
            FilterType::Lowpass | FilterType::Highpass => {
                let k = (PI * frequency / sample_rate).tan();
                let norm = 1.0 / (1.0 + k / q + k * k);
                let (b0, b1) = if filter.filter_type == FilterType::Lowpass {
                    let b0 = k * k * norm;
                    (b0, 2.0 * b0)
                } else {
                    (norm, -2.0 * norm)
                };
                Self {
                    b0,
                    b1,
                    b2: b0,
                    a1: 2.0 * (k * k - 1.0) * norm,
                    a2: (1.0 - k / q + k * k) * norm,
                }
            }
            FilterType::Notch => {
                Self::normalized(1.0, -2.0 * cos_w0, 1.0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
            }
            FilterType::Peaking => {
                let a = 10f64.powf(filter.gain_db / 40.0);
                Self::normalized(
                    1.0 + alpha * a,
                    -2.0 * cos_w0,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w0,
                    1.0 - alpha / a,
                )
            }
        }
    }

    fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Complex response H(e^jw) at `frequency`.
    pub fn response(&self, frequency: f64, sample_rate: f64) -> Complex64 {
        let w = 2.0 * PI * frequency / sample_rate;
        let z1 = Complex64::from_polar(1.0, -w);
        let z2 = z1 * z1;
        let numerator = self.b0 + z1 * self.b1 + z2 * self.b2;
        let denominator = 1.0 + z1 * self.a1 + z2 * self.a2;
        numerator / denominator
    }
}

pub fn magnitude_to_db(magnitude: f64) -> f64 {
    20.0 * magnitude.log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(filter_type: FilterType, frequency: f64, q: f64, gain_db: f64) -> FilterDescriptor {
        FilterDescriptor {
            enabled: true,
            filter_type,
            center_frequency: frequency,
            q_factor: q,
            gain_db,
        }
    }

    fn magnitude_db(f: &FilterDescriptor, at: f64) -> f64 {
        let c = BiquadCoefficients::design(f, DEFAULT_SAMPLE_RATE);
        magnitude_to_db(c.response(at, DEFAULT_SAMPLE_RATE).norm())
    }

    #[test]
    fn test_peaking_hits_gain_at_center() {
        let boost = filter(FilterType::Peaking, 1000.0, 0.707, 6.0);
        assert!((magnitude_db(&boost, 1000.0) - 6.0).abs() < 1e-6);
        assert!(magnitude_db(&boost, 20.0).abs() < 0.1);

        let cut = filter(FilterType::Peaking, 1000.0, 2.0, -12.0);
        assert!((magnitude_db(&cut, 1000.0) + 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_lowpass_and_highpass_shapes() {
        let lowpass = filter(FilterType::Lowpass, 1000.0, 0.707, 0.0);
        assert!(magnitude_db(&lowpass, 20.0).abs() < 0.01);
        assert!((magnitude_db(&lowpass, 1000.0) - magnitude_to_db(0.707)).abs() < 1e-6);
        assert!(magnitude_db(&lowpass, 10000.0) < -35.0);

        let highpass = filter(FilterType::Highpass, 1000.0, 0.707, 0.0);
        assert!(magnitude_db(&highpass, 20000.0).abs() < 0.1);
        assert!(magnitude_db(&highpass, 50.0) < -45.0);
    }

    #[test]
    fn test_notch_rejects_center() {
        let notch = filter(FilterType::Notch, 2000.0, 4.0, 0.0);
        let c = BiquadCoefficients::design(&notch, DEFAULT_SAMPLE_RATE);
        assert!(c.response(2000.0, DEFAULT_SAMPLE_RATE).norm() < 1e-9);
        assert!(magnitude_db(&notch, 200.0).abs() < 0.01);
    }

    #[test]
    fn test_gain_ignored_outside_peaking() {
        let a = filter(FilterType::Lowpass, 500.0, 1.0, 0.0);
        let b = filter(FilterType::Lowpass, 500.0, 1.0, 12.0);
        assert_eq!(
            BiquadCoefficients::design(&a, DEFAULT_SAMPLE_RATE),
            BiquadCoefficients::design(&b, DEFAULT_SAMPLE_RATE)
        );
    }

    #[test]
    fn test_frequency_above_nyquist_is_clamped() {
        let f = filter(FilterType::Lowpass, 30000.0, 0.707, 0.0);
        let c = BiquadCoefficients::design(&f, DEFAULT_SAMPLE_RATE);
        assert!(c.response(1000.0, DEFAULT_SAMPLE_RATE).norm().is_finite());
    }

    #[test]
    fn test_identity_response() {
        let h = BiquadCoefficients::IDENTITY.response(1234.0, DEFAULT_SAMPLE_RATE);
        assert!((h.norm() - 1.0).abs() < 1e-12);
        assert!(h.arg().abs() < 1e-12);
    }
}
