// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Equalizer frequency response: biquad design, plot axes and editing.

mod axis;
mod biquad;
mod engine;
mod view;

pub use axis::{PlotAxes, DEFAULT_PLOT_HEIGHT, DEFAULT_PLOT_WIDTH};
pub use biquad::{magnitude_to_db, BiquadCoefficients, DEFAULT_SAMPLE_RATE};
pub use engine::{
    CurvePoint, FrequencyResponseEngine, HandlePosition, ResponseCurve, ResponseSettings,
    DEFAULT_CURVE_POINTS,
};
pub use view::EqualizerView;
