// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The closed command set and its field schema.

use crate::codec::{CodecError, WireFrame};
use crate::{ChannelRef, ChannelType, FilterDescriptor, FilterKey, FilterType, MixerEdge};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Discriminator of every command the protocol knows, with its wire field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    SetGain,
    GetGain,
    SetMute,
    GetMute,
    SetMixer,
    GetMixer,
    SetFilter,
    GetFilter,
    GetMeter,
    NotifyGain,
    NotifyMute,
    NotifyMixer,
    NotifyFilter,
    NotifyMeter,
}

const GAIN_FIELDS: &[&str] = &["channel_type", "channel_number", "gain_db"];
const CHANNEL_FIELDS: &[&str] = &["channel_type", "channel_number"];
const MUTE_FIELDS: &[&str] = &["channel_type", "channel_number", "mute"];
const MIXER_FIELDS: &[&str] = &["input_channel", "output_channel", "mix"];
const EDGE_FIELDS: &[&str] = &["input_channel", "output_channel"];
const FILTER_FIELDS: &[&str] = &[
    "channel_type",
    "channel_number",
    "filter_id",
    "filter_enabled",
    "filter_type",
    "center_frequency",
    "q_factor",
    "gain_db",
];
const FILTER_KEY_FIELDS: &[&str] = &["channel_type", "channel_number", "filter_id"];
const METER_REQUEST_FIELDS: &[&str] = &["channel_type"];
const METER_FIELDS: &[&str] = &["channel_type", "amplitudes_db"];

impl CommandKind {
    pub const ALL: [CommandKind; 14] = [
        CommandKind::SetGain,
        CommandKind::GetGain,
        CommandKind::SetMute,
        CommandKind::GetMute,
        CommandKind::SetMixer,
        CommandKind::GetMixer,
        CommandKind::SetFilter,
        CommandKind::GetFilter,
        CommandKind::GetMeter,
        CommandKind::NotifyGain,
        CommandKind::NotifyMute,
        CommandKind::NotifyMixer,
        CommandKind::NotifyFilter,
        CommandKind::NotifyMeter,
    ];

    /// Value of the `command_type` field on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::SetGain => "set_gain",
            CommandKind::GetGain => "get_gain",
            CommandKind::SetMute => "set_mute",
            CommandKind::GetMute => "get_mute",
            CommandKind::SetMixer => "set_mixer",
            CommandKind::GetMixer => "get_mixer",
            CommandKind::SetFilter => "set_filter",
            CommandKind::GetFilter => "get_filter",
            CommandKind::GetMeter => "get_meter",
            CommandKind::NotifyGain => "notify_gain",
            CommandKind::NotifyMute => "notify_mute",
            CommandKind::NotifyMixer => "notify_mixer",
            CommandKind::NotifyFilter => "notify_filter",
            CommandKind::NotifyMeter => "notify_meter",
        }
    }

    /// Ordered field names; the positional argument list follows this order.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            CommandKind::SetGain | CommandKind::NotifyGain => GAIN_FIELDS,
            CommandKind::GetGain | CommandKind::GetMute => CHANNEL_FIELDS,
            CommandKind::SetMute | CommandKind::NotifyMute => MUTE_FIELDS,
            CommandKind::SetMixer | CommandKind::NotifyMixer => MIXER_FIELDS,
            CommandKind::GetMixer => EDGE_FIELDS,
            CommandKind::SetFilter | CommandKind::NotifyFilter => FILTER_FIELDS,
            CommandKind::GetFilter => FILTER_KEY_FIELDS,
            CommandKind::GetMeter => METER_REQUEST_FIELDS,
            CommandKind::NotifyMeter => METER_FIELDS,
        }
    }

    pub fn arity(&self) -> usize {
        self.fields().len()
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

/// One protocol message. Fields are carried by name on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command_type", rename_all = "snake_case")]
pub enum Command {
    SetGain {
        channel_type: ChannelType,
        channel_number: u8,
        gain_db: f64,
    },
    GetGain {
        channel_type: ChannelType,
        channel_number: u8,
    },
    SetMute {
        channel_type: ChannelType,
        channel_number: u8,
        mute: bool,
    },
    GetMute {
        channel_type: ChannelType,
        channel_number: u8,
    },
    SetMixer {
        input_channel: u8,
        output_channel: u8,
        mix: bool,
    },
    GetMixer {
        input_channel: u8,
        output_channel: u8,
    },
    SetFilter {
        channel_type: ChannelType,
        channel_number: u8,
        filter_id: u8,
        filter_enabled: bool,
        filter_type: FilterType,
        center_frequency: f64,
        q_factor: f64,
        gain_db: f64,
    },
    GetFilter {
        channel_type: ChannelType,
        channel_number: u8,
        filter_id: u8,
    },
    GetMeter {
        channel_type: ChannelType,
    },
    NotifyGain {
        channel_type: ChannelType,
        channel_number: u8,
        gain_db: f64,
    },
    NotifyMute {
        channel_type: ChannelType,
        channel_number: u8,
        mute: bool,
    },
    NotifyMixer {
        input_channel: u8,
        output_channel: u8,
        mix: bool,
    },
    NotifyFilter {
        channel_type: ChannelType,
        channel_number: u8,
        filter_id: u8,
        filter_enabled: bool,
        filter_type: FilterType,
        center_frequency: f64,
        q_factor: f64,
        gain_db: f64,
    },
    NotifyMeter {
        channel_type: ChannelType,
        amplitudes_db: Vec<f64>,
    },
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::SetGain { .. } => CommandKind::SetGain,
            Command::GetGain { .. } => CommandKind::GetGain,
            Command::SetMute { .. } => CommandKind::SetMute,
            Command::GetMute { .. } => CommandKind::GetMute,
            Command::SetMixer { .. } => CommandKind::SetMixer,
            Command::GetMixer { .. } => CommandKind::GetMixer,
            Command::SetFilter { .. } => CommandKind::SetFilter,
            Command::GetFilter { .. } => CommandKind::GetFilter,
            Command::GetMeter { .. } => CommandKind::GetMeter,
            Command::NotifyGain { .. } => CommandKind::NotifyGain,
            Command::NotifyMute { .. } => CommandKind::NotifyMute,
            Command::NotifyMixer { .. } => CommandKind::NotifyMixer,
            Command::NotifyFilter { .. } => CommandKind::NotifyFilter,
            Command::NotifyMeter { .. } => CommandKind::NotifyMeter,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn set_gain(channel: ChannelRef, gain_db: f64) -> Self {
        Command::SetGain {
            channel_type: channel.channel_type,
            channel_number: channel.channel_number,
            gain_db,
        }
    }

    pub fn get_gain(channel: ChannelRef) -> Self {
        Command::GetGain {
            channel_type: channel.channel_type,
            channel_number: channel.channel_number,
        }
    }

    pub fn set_mute(channel: ChannelRef, mute: bool) -> Self {
        Command::SetMute {
            channel_type: channel.channel_type,
            channel_number: channel.channel_number,
            mute,
        }
    }

    pub fn get_mute(channel: ChannelRef) -> Self {
        Command::GetMute {
            channel_type: channel.channel_type,
            channel_number: channel.channel_number,
        }
    }

    pub fn set_mixer(edge: MixerEdge, mix: bool) -> Self {
        Command::SetMixer {
            input_channel: edge.input_channel,
            output_channel: edge.output_channel,
            mix,
        }
    }

    pub fn get_mixer(edge: MixerEdge) -> Self {
        Command::GetMixer {
            input_channel: edge.input_channel,
            output_channel: edge.output_channel,
        }
    }

    pub fn set_filter(key: FilterKey, filter: &FilterDescriptor) -> Self {
        Command::SetFilter {
            channel_type: key.channel.channel_type,
            channel_number: key.channel.channel_number,
            filter_id: key.filter_id,
            filter_enabled: filter.enabled,
            filter_type: filter.filter_type,
            center_frequency: filter.center_frequency,
            q_factor: filter.q_factor,
            gain_db: filter.gain_db,
        }
    }

    pub fn get_filter(key: FilterKey) -> Self {
        Command::GetFilter {
            channel_type: key.channel.channel_type,
            channel_number: key.channel.channel_number,
            filter_id: key.filter_id,
        }
    }

    pub fn get_meter(channel_type: ChannelType) -> Self {
        Command::GetMeter { channel_type }
    }

    /// Builds a command from its name and positional arguments.
    ///
    /// Arguments are matched to the schema field order of the named command
    /// and then type-checked.
    pub fn from_args(name: &str, args: &[Value]) -> Result<Self, CodecError> {
        let kind = CommandKind::from_name(name).ok_or_else(|| CodecError::UnknownCommand {
            command: name.to_string(),
        })?;
        let fields = kind.fields();
        if args.len() != fields.len() {
            return Err(CodecError::ArgumentCount {
                command: kind.name(),
                expected: fields.len(),
                actual: args.len(),
            });
        }

        let mut object = Map::with_capacity(fields.len() + 1);
        object.insert(
            "command_type".to_string(),
            Value::String(kind.name().to_string()),
        );
        for (field, value) in fields.iter().zip(args) {
            object.insert((*field).to_string(), value.clone());
        }

        serde_json::from_value(Value::Object(object)).map_err(|e| CodecError::InvalidArgument {
            command: kind.name(),
            reason: e.to_string(),
        })
    }

    /// Positional arguments in schema field order (inverse of [`Command::from_args`]).
    pub fn to_args(&self) -> Result<Vec<Value>, CodecError> {
        let value = serde_json::to_value(self).map_err(CodecError::Serialize)?;
        let Value::Object(mut object) = value else {
            return Err(CodecError::InvalidArgument {
                command: self.name(),
                reason: "command did not serialize to an object".to_string(),
            });
        };
        Ok(self
            .kind()
            .fields()
            .iter()
            .map(|field| object.remove(*field).unwrap_or(Value::Null))
            .collect())
    }

    /// Serializes this command into one wire frame.
    pub fn encode(&self) -> Result<WireFrame, CodecError> {
        serde_json::to_string(self)
            .map(WireFrame::new)
            .map_err(CodecError::Serialize)
    }
}
