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

//! Wire constants shared by every decoder layer.

/// Null, ignored by the tag and MPI layers.
pub const NUL: u8 = 0x00;
/// Line Feed
pub const LF: u8 = 0x0A;
/// Carriage Return
pub const CR: u8 = 0x0D;
/// Device Control 1 (XON), ignored by the tag and MPI layers.
pub const DC1: u8 = 0x11;

/// End of subnegotiation parameters.
pub const SE: u8 = 240;
/// No operation.
pub const NOP: u8 = 241;
/// Go ahead.
pub const GA: u8 = 249;
/// Subnegotiation begin.
pub const SB: u8 = 250;
/// Sender wants to enable an option.
pub const WILL: u8 = 251;
/// Sender refuses an option.
pub const WONT: u8 = 252;
/// Sender asks the peer to enable an option.
pub const DO: u8 = 253;
/// Sender asks the peer to disable an option.
pub const DONT: u8 = 254;
/// Interpret As Command.
pub const IAC: u8 = 255;

/// Telnet option codes used by the proxy.
pub mod option {
    /// Echo [RFC857](https://tools.ietf.org/html/rfc857)
    pub const ECHO: u8 = 1;
    /// Terminal Type [RFC1091](https://tools.ietf.org/html/rfc1091)
    pub const TTYPE: u8 = 24;
    /// Negotiate About Window Size [RFC1073](https://tools.ietf.org/html/rfc1073)
    pub const NAWS: u8 = 31;
    /// Charset [RFC2066](https://tools.ietf.org/html/rfc2066)
    pub const CHARSET: u8 = 42;
}

/// Charset subnegotiation commands [RFC2066](https://tools.ietf.org/html/rfc2066)
pub mod charset {
    /// `REQUEST <sep> <charset>...`
    pub const REQUEST: u8 = 1;
    /// `ACCEPTED <charset>`
    pub const ACCEPTED: u8 = 2;
    /// `REJECTED`
    pub const REJECTED: u8 = 3;
    /// Separator between the charsets of a REQUEST.
    pub const SEPARATOR: u8 = b';';
}

/// Introducer of an MPI frame, only recognized at the start of a line.
pub const MPI_SIGNATURE: &[u8; 4] = b"~$#E";
/// MPI command letter for an edit session.
pub const MPI_EDIT: u8 = b'E';
/// MPI command letter for a view session.
pub const MPI_VIEW: u8 = b'V';

/// The server's first bytes after a connection is established: `IAC DO TTYPE IAC DO NAWS`.
pub const LOGIN_BANNER: &[u8; 6] = &[IAC, DO, option::TTYPE, IAC, DO, option::NAWS];

/// Messages sent to the server once the login banner was recognized, in order.
pub const LOGIN_REPLIES: [&[u8]; 4] = [
    // Identify for remote editing.
    b"~$#EI\n",
    // XML mode.
    b"~$#EX2\n3G\n",
    // IAC GA after every prompt.
    b"~$#EP2\nG\n",
    // Offer charset negotiation.
    &[IAC, WILL, option::CHARSET],
];

/// Tag names understood by the tag state machine.
pub mod tag {
    /// Room block.
    pub const ROOM: &[u8] = b"room";
    /// Room name, inside a room.
    pub const NAME: &[u8] = b"name";
    /// Room description, inside a room.
    pub const DESCRIPTION: &[u8] = b"description";
    /// Terrain, inside a room when the room can't be seen.
    pub const TERRAIN: &[u8] = b"terrain";
    /// Text that is never shown to the client, inside a room.
    pub const GRATUITOUS: &[u8] = b"gratuitous";
    /// Exits line.
    pub const EXITS: &[u8] = b"exits";
    /// Prompt.
    pub const PROMPT: &[u8] = b"prompt";
    /// Self closing movement notification.
    pub const MOVEMENT: &[u8] = b"movement";
    /// Direction attribute of a movement tag.
    pub const DIRECTION_ATTRIBUTE: &[u8] = b" dir=";
}
