// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Shared wire protocol types and command codec for Mixlink.
//!
//! This crate defines the JSON command protocol spoken between the Mixlink
//! control client and the remote audio processor over a WebSocket.

pub mod codec;
pub mod command;

pub use codec::{decode, encode, CodecError, DecodeError, Decoded, WireFrame};
pub use command::{Command, CommandKind};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Number of input strips and output strips on the device.
pub const CHANNEL_COUNT: u8 = 8;

/// Number of equalizer bands per channel.
pub const FILTER_COUNT: u8 = 16;

/// Center frequency range in Hz.
pub const FREQUENCY_RANGE: RangeInclusive<f64> = 20.0..=20000.0;

/// Filter gain range in dB.
pub const GAIN_RANGE: RangeInclusive<f64> = -20.0..=20.0;

/// Q factor range.
pub const Q_RANGE: RangeInclusive<f64> = 0.1..=18.0;

/// Server address used when nothing else is configured.
pub const DEFAULT_SERVER_ADDRESS: &str = "ws://127.0.0.1:3001";

/// Direction of an audio strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Input,
    Output,
}

impl ChannelType {
    pub const ALL: [ChannelType; 2] = [ChannelType::Input, ChannelType::Output];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Input => "input",
            ChannelType::Output => "output",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a gain, mute or filter target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelRef {
    pub channel_type: ChannelType,
    /// 1-based strip number (1..=8).
    pub channel_number: u8,
}

impl ChannelRef {
    pub fn new(channel_type: ChannelType, channel_number: u8) -> Self {
        Self {
            channel_type,
            channel_number,
        }
    }

    pub fn input(channel_number: u8) -> Self {
        Self::new(ChannelType::Input, channel_number)
    }

    pub fn output(channel_number: u8) -> Self {
        Self::new(ChannelType::Output, channel_number)
    }

    /// Whether the strip number lies on the device.
    pub fn is_valid(&self) -> bool {
        (1..=CHANNEL_COUNT).contains(&self.channel_number)
    }

    /// Every strip of the device, inputs first.
    pub fn all() -> impl Iterator<Item = ChannelRef> {
        ChannelType::ALL
            .into_iter()
            .flat_map(|t| (1..=CHANNEL_COUNT).map(move |n| ChannelRef::new(t, n)))
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.channel_type, self.channel_number)
    }
}

/// One routing cell of the mixing matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MixerEdge {
    pub input_channel: u8,
    pub output_channel: u8,
}

impl MixerEdge {
    pub fn new(input_channel: u8, output_channel: u8) -> Self {
        Self {
            input_channel,
            output_channel,
        }
    }

    /// Every cell of the 8x8 matrix in row-major order.
    pub fn all() -> impl Iterator<Item = MixerEdge> {
        (1..=CHANNEL_COUNT).flat_map(|i| (1..=CHANNEL_COUNT).map(move |o| MixerEdge::new(i, o)))
    }
}

/// Biquad stage shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Lowpass,
    Peaking,
    Notch,
    Highpass,
}

impl FilterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterType::Lowpass => "lowpass",
            FilterType::Peaking => "peaking",
            FilterType::Notch => "notch",
            FilterType::Highpass => "highpass",
        }
    }

    /// Only peaking stages use their gain parameter.
    pub fn uses_gain(&self) -> bool {
        matches!(self, FilterType::Peaking)
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of one equalizer band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterKey {
    pub channel: ChannelRef,
    /// 1-based band number (1..=16).
    pub filter_id: u8,
}

impl FilterKey {
    pub fn new(channel: ChannelRef, filter_id: u8) -> Self {
        Self { channel, filter_id }
    }

    pub fn is_valid(&self) -> bool {
        self.channel.is_valid() && (1..=FILTER_COUNT).contains(&self.filter_id)
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} filter {}", self.channel, self.filter_id)
    }
}

/// Parameters of one equalizer band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterDescriptor {
    pub enabled: bool,
    pub filter_type: FilterType,
    pub center_frequency: f64,
    pub q_factor: f64,
    /// Only meaningful for [`FilterType::Peaking`].
    pub gain_db: f64,
}

impl Default for FilterDescriptor {
    /// Matches what the processor reports for a band it has never configured.
    fn default() -> Self {
        Self {
            enabled: false,
            filter_type: FilterType::Peaking,
            center_frequency: 1000.0,
            q_factor: 0.707,
            gain_db: 0.0,
        }
    }
}

/// State of the control connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        }
    }

    pub fn is_connected(&self) -> bool {
        *self == ConnectionState::Connected
    }

    /// The two-valued state shown to the operator: anything short of an
    /// open connection reads as disconnected.
    pub fn indicator(&self) -> ConnectionState {
        if self.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
