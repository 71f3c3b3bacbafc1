// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mapping between commands and flat JSON wire frames.
//!
//! Every frame is one JSON object carrying a `command_type` discriminator
//! plus the fields of that command by name. Encoding is strict: an unknown
//! command name or a wrong argument count is a caller bug. Decoding is
//! lenient: frames this client does not understand are reported, never
//! raised, so the transport can log them and move on.

use crate::command::{Command, CommandKind};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::trace;

/// One serialized protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFrame(String);

impl WireFrame {
    pub fn new(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WireFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors raised while building an outbound frame.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Unknown command: {command}")]
    UnknownCommand { command: String },
    #[error("{command} expects {expected} arguments, got {actual}")]
    ArgumentCount {
        command: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Invalid argument for {command}: {reason}")]
    InvalidArgument {
        command: &'static str,
        reason: String,
    },
    #[error("Failed to serialize frame: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Errors for inbound frames that are not usable protocol records.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Frame is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("Frame is not a JSON object")]
    NotAnObject,
    #[error("Frame has no command_type field")]
    MissingDiscriminator,
    #[error("Invalid fields for {command_type}: {reason}")]
    InvalidFields {
        command_type: &'static str,
        reason: String,
    },
}

/// Result of decoding a structurally valid frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Command(Command),
    /// Well-formed frame whose `command_type` this client does not know.
    Unrecognized { command_type: String },
}

/// Encodes a command given by name and positional arguments.
pub fn encode(name: &str, args: &[Value]) -> Result<WireFrame, CodecError> {
    Command::from_args(name, args)?.encode()
}

/// Decodes one inbound frame.
pub fn decode(raw: &str) -> Result<Decoded, DecodeError> {
    let value: Value = serde_json::from_str(raw).map_err(DecodeError::Malformed)?;
    let Value::Object(object) = &value else {
        return Err(DecodeError::NotAnObject);
    };
    let command_type = object
        .get("command_type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingDiscriminator)?;

    let Some(kind) = CommandKind::from_name(command_type) else {
        trace!("Unrecognized command_type: {}", command_type);
        return Ok(Decoded::Unrecognized {
            command_type: command_type.to_string(),
        });
    };

    serde_json::from_value(value)
        .map(Decoded::Command)
        .map_err(|e| DecodeError::InvalidFields {
            command_type: kind.name(),
            reason: e.to_string(),
        })
}
