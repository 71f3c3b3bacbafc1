// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Typed events carried on the event bus.

use mixlink_ipc::{
    ChannelRef, ChannelType, Command, ConnectionState, FilterDescriptor, FilterKey, MixerEdge,
};

/// Bus topic. Each topic carries exactly one [`Event`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    SetGain,
    GetGain,
    SetMute,
    GetMute,
    SetMixer,
    GetMixer,
    SetFilter,
    GetFilter,
    GetMeter,
    SetWsAddress,
    GetWsAddress,
    GetWsState,
    NotifyGain,
    NotifyMute,
    NotifyMixer,
    NotifyFilter,
    NotifyMeter,
    NotifyWsAddress,
    NotifyWsState,
    WsStateChanged,
}

impl Topic {
    /// Requests that are encoded and sent to the processor.
    pub const DEVICE_REQUESTS: [Topic; 9] = [
        Topic::SetGain,
        Topic::GetGain,
        Topic::SetMute,
        Topic::GetMute,
        Topic::SetMixer,
        Topic::GetMixer,
        Topic::SetFilter,
        Topic::GetFilter,
        Topic::GetMeter,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Topic::SetGain => "set_gain",
            Topic::GetGain => "get_gain",
            Topic::SetMute => "set_mute",
            Topic::GetMute => "get_mute",
            Topic::SetMixer => "set_mixer",
            Topic::GetMixer => "get_mixer",
            Topic::SetFilter => "set_filter",
            Topic::GetFilter => "get_filter",
            Topic::GetMeter => "get_meter",
            Topic::SetWsAddress => "set_ws_address",
            Topic::GetWsAddress => "get_ws_address",
            Topic::GetWsState => "get_ws_state",
            Topic::NotifyGain => "notify_gain",
            Topic::NotifyMute => "notify_mute",
            Topic::NotifyMixer => "notify_mixer",
            Topic::NotifyFilter => "notify_filter",
            Topic::NotifyMeter => "notify_meter",
            Topic::NotifyWsAddress => "notify_ws_address",
            Topic::NotifyWsState => "notify_ws_state",
            Topic::WsStateChanged => "ws_state_changed",
        }
    }
}

/// All events on the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // ==================== Requests ====================
    /// Set strip gain in dB.
    SetGain { channel: ChannelRef, gain_db: f64 },
    GetGain(ChannelRef),
    SetMute { channel: ChannelRef, mute: bool },
    GetMute(ChannelRef),
    /// Route (or unroute) an input into an output.
    SetMixer { edge: MixerEdge, mix: bool },
    GetMixer(MixerEdge),
    SetFilter { key: FilterKey, filter: FilterDescriptor },
    GetFilter(FilterKey),
    /// Ask for one round of level meter readings.
    GetMeter(ChannelType),
    /// Switch the transport to a new server address.
    SetWsAddress(String),
    GetWsAddress,
    GetWsState,

    // ==================== Notifications ====================
    NotifyGain { channel: ChannelRef, gain_db: f64 },
    NotifyMute { channel: ChannelRef, mute: bool },
    NotifyMixer { edge: MixerEdge, mix: bool },
    NotifyFilter { key: FilterKey, filter: FilterDescriptor },
    /// Per-strip levels in dB, strip 1 first.
    NotifyMeter {
        channel_type: ChannelType,
        amplitudes_db: Vec<f64>,
    },
    NotifyWsAddress(String),
    NotifyWsState(ConnectionState),
    /// Published by the transport after every tick.
    WsStateChanged(ConnectionState),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::SetGain { .. } => Topic::SetGain,
            Event::GetGain(_) => Topic::GetGain,
            Event::SetMute { .. } => Topic::SetMute,
            Event::GetMute(_) => Topic::GetMute,
            Event::SetMixer { .. } => Topic::SetMixer,
            Event::GetMixer(_) => Topic::GetMixer,
            Event::SetFilter { .. } => Topic::SetFilter,
            Event::GetFilter(_) => Topic::GetFilter,
            Event::GetMeter(_) => Topic::GetMeter,
            Event::SetWsAddress(_) => Topic::SetWsAddress,
            Event::GetWsAddress => Topic::GetWsAddress,
            Event::GetWsState => Topic::GetWsState,
            Event::NotifyGain { .. } => Topic::NotifyGain,
            Event::NotifyMute { .. } => Topic::NotifyMute,
            Event::NotifyMixer { .. } => Topic::NotifyMixer,
            Event::NotifyFilter { .. } => Topic::NotifyFilter,
            Event::NotifyMeter { .. } => Topic::NotifyMeter,
            Event::NotifyWsAddress(_) => Topic::NotifyWsAddress,
            Event::NotifyWsState(_) => Topic::NotifyWsState,
            Event::WsStateChanged(_) => Topic::WsStateChanged,
        }
    }

    /// The wire command for a device request, `None` for everything else.
    pub fn to_command(&self) -> Option<Command> {
        let command = match self {
            Event::SetGain { channel, gain_db } => Command::set_gain(*channel, *gain_db),
            Event::GetGain(channel) => Command::get_gain(*channel),
            Event::SetMute { channel, mute } => Command::set_mute(*channel, *mute),
            Event::GetMute(channel) => Command::get_mute(*channel),
            Event::SetMixer { edge, mix } => Command::set_mixer(*edge, *mix),
            Event::GetMixer(edge) => Command::get_mixer(*edge),
            Event::SetFilter { key, filter } => Command::set_filter(*key, filter),
            Event::GetFilter(key) => Command::get_filter(*key),
            Event::GetMeter(channel_type) => Command::get_meter(*channel_type),
            _ => return None,
        };
        Some(command)
    }

    /// The bus event for an inbound `notify_*` command, `None` for requests.
    pub fn from_notification(command: Command) -> Option<Self> {
        let event = match command {
            Command::NotifyGain {
                channel_type,
                channel_number,
                gain_db,
            } => Event::NotifyGain {
                channel: ChannelRef::new(channel_type, channel_number),
                gain_db,
            },
            Command::NotifyMute {
                channel_type,
                channel_number,
                mute,
            } => Event::NotifyMute {
                channel: ChannelRef::new(channel_type, channel_number),
                mute,
            },
            Command::NotifyMixer {
                input_channel,
                output_channel,
                mix,
            } => Event::NotifyMixer {
                edge: MixerEdge::new(input_channel, output_channel),
                mix,
            },
            Command::NotifyFilter {
                channel_type,
                channel_number,
                filter_id,
                filter_enabled,
                filter_type,
                center_frequency,
                q_factor,
                gain_db,
            } => Event::NotifyFilter {
                key: FilterKey::new(ChannelRef::new(channel_type, channel_number), filter_id),
                filter: FilterDescriptor {
                    enabled: filter_enabled,
                    filter_type,
                    center_frequency,
                    q_factor,
                    gain_db,
                },
            },
            Command::NotifyMeter {
                channel_type,
                amplitudes_db,
            } => Event::NotifyMeter {
                channel_type,
                amplitudes_db,
            },
            _ => return None,
        };
        Some(event)
    }
}
