//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use bytes::{Bytes, BytesMut};
use std::fmt::Formatter;

///
/// `MudEvent` is a semantic event recovered from the server stream. Payloads are the raw
/// bytes seen between tag boundaries; XML entities are left escaped.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MudEvent {
    /// Server sent `IAC GA`, which marks the end of a prompt.
    GoAhead,
    /// The character moved, payload is the direction (may be empty).
    Movement(Bytes),
    /// A line of untagged text.
    Line(Bytes),
    /// Room name.
    Name(Bytes),
    /// Room description.
    Description(Bytes),
    /// Text inside a room before any named sub-tag, e.g. the room's dynamic flags.
    Dynamic(Bytes),
    /// Exits line.
    Exits(Bytes),
    /// Prompt.
    Prompt(Bytes),
}

impl MudEvent {
    /// Short name of the event kind, as understood by the mapper.
    pub fn kind(&self) -> &'static str {
        match self {
            MudEvent::GoAhead => "iac_ga",
            MudEvent::Movement(_) => "movement",
            MudEvent::Line(_) => "line",
            MudEvent::Name(_) => "name",
            MudEvent::Description(_) => "description",
            MudEvent::Dynamic(_) => "dynamic",
            MudEvent::Exits(_) => "exits",
            MudEvent::Prompt(_) => "prompt",
        }
    }

    /// Event payload, empty for [`MudEvent::GoAhead`].
    pub fn payload(&self) -> &[u8] {
        match self {
            MudEvent::GoAhead => &[],
            MudEvent::Movement(data)
            | MudEvent::Line(data)
            | MudEvent::Name(data)
            | MudEvent::Description(data)
            | MudEvent::Dynamic(data)
            | MudEvent::Exits(data)
            | MudEvent::Prompt(data) => data,
        }
    }
}

impl std::fmt::Display for MudEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({:?})",
            self.kind(),
            String::from_utf8_lossy(self.payload())
        )
    }
}

/// Kind of remote editing session requested by an MPI frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MpiCommand {
    /// `E`: the text is edited and sent back to the server.
    Edit,
    /// `V`: the text is only displayed.
    View,
}

impl MpiCommand {
    /// Parse an MPI command letter.
    pub fn from_u8(byte: u8) -> Option<MpiCommand> {
        match byte {
            crate::consts::MPI_EDIT => Some(MpiCommand::Edit),
            crate::consts::MPI_VIEW => Some(MpiCommand::View),
            _ => None,
        }
    }
}

impl From<MpiCommand> for u8 {
    fn from(command: MpiCommand) -> Self {
        match command {
            MpiCommand::Edit => crate::consts::MPI_EDIT,
            MpiCommand::View => crate::consts::MPI_VIEW,
        }
    }
}

/// A complete MPI frame; its bytes never reach the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MpiFrame {
    /// Requested session kind.
    pub command: MpiCommand,
    /// Exactly the declared number of body bytes.
    pub data: Bytes,
}

/// Everything the decoder produced from a single read of the server stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedChunk {
    /// Bytes to write to the client.
    pub client: BytesMut,
    /// Bytes to write back to the server (negotiation replies).
    pub server: BytesMut,
    /// Semantic events, in emission order.
    pub events: Vec<MudEvent>,
    /// Completed MPI frames, in emission order.
    pub frames: Vec<MpiFrame>,
    /// Number of server bytes the chunk was decoded from.
    pub consumed: usize,
}

impl DecodedChunk {
    /// Returns true if the chunk carries nothing at all.
    pub fn is_empty(&self) -> bool {
        self.client.is_empty()
            && self.server.is_empty()
            && self.events.is_empty()
            && self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_and_payload() {
        let event = MudEvent::Name(Bytes::from_static(b"Center Square"));
        assert_eq!(event.kind(), "name");
        assert_eq!(event.payload(), b"Center Square");
        assert_eq!(MudEvent::GoAhead.payload(), b"");
        assert_eq!(event.to_string(), "name(\"Center Square\")");
    }

    #[test]
    fn mpi_command_letters() {
        assert_eq!(MpiCommand::from_u8(b'E'), Some(MpiCommand::Edit));
        assert_eq!(MpiCommand::from_u8(b'V'), Some(MpiCommand::View));
        assert_eq!(MpiCommand::from_u8(b'X'), None);
        assert_eq!(u8::from(MpiCommand::View), b'V');
    }
}
