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

//! One-time charset negotiation ([RFC2066](https://tools.ietf.org/html/rfc2066)).
//!
//! The proxy offers `WILL CHARSET` once the login banner was seen, answers the server's
//! `DO CHARSET` with a `REQUEST` for a single fixed charset and swallows the server's
//! `ACCEPTED`/`REJECTED` reply. None of it is shown to the client.

use crate::consts::{self, IAC, SB, SE, option};
use bytes::{BufMut, BytesMut};
use std::fmt::Formatter;
use std::str::FromStr;
use tracing::{debug, warn};

/// Character set requested from the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Charset {
    /// `US-ASCII`
    #[default]
    Ascii,
    /// `ISO-8859-1`
    Latin1,
    /// `UTF-8`
    Utf8,
}

impl Charset {
    /// IANA name sent on the wire.
    pub fn wire_name(self) -> &'static [u8] {
        match self {
            Charset::Ascii => b"US-ASCII",
            Charset::Latin1 => b"ISO-8859-1",
            Charset::Utf8 => b"UTF-8",
        }
    }
}

impl std::fmt::Display for Charset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Charset::Ascii => write!(f, "ascii"),
            Charset::Latin1 => write!(f, "latin-1"),
            Charset::Utf8 => write!(f, "utf-8"),
        }
    }
}

impl FromStr for Charset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ascii" | "us-ascii" => Ok(Charset::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Charset::Latin1),
            "utf-8" | "utf8" => Ok(Charset::Utf8),
            other => Err(format!("unknown charset: {other}")),
        }
    }
}

/// Progress of the handshake. It only ever moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharsetState {
    /// Login banner not seen yet.
    Idle,
    /// `IAC WILL CHARSET` sent, waiting for `IAC DO CHARSET`.
    Offered,
    /// `REQUEST` sent, waiting for the server's answer.
    Requested,
    /// Answer received (or negotiation otherwise over).
    Complete,
}

/// Server's answer to our charset request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CharsetResponse {
    /// Server switched to the named charset.
    Accepted(BytesMut),
    /// Server refused; the default encoding stays in effect.
    Rejected,
    /// Any other subnegotiation command, with its code.
    Other(u8),
}

pub(crate) struct CharsetNegotiation {
    charset: Charset,
    state: CharsetState,
    response_code: Option<u8>,
    response: BytesMut,
    answer: Option<CharsetResponse>,
}

impl CharsetNegotiation {
    pub fn new(charset: Charset) -> CharsetNegotiation {
        CharsetNegotiation {
            charset,
            state: CharsetState::Idle,
            response_code: None,
            response: BytesMut::new(),
            answer: None,
        }
    }

    pub fn state(&self) -> CharsetState {
        self.state
    }

    /// Moves Idle to Offered. Returns false if the offer was already made.
    pub fn offer(&mut self) -> bool {
        if self.state == CharsetState::Idle {
            self.state = CharsetState::Offered;
            true
        } else {
            false
        }
    }

    pub fn answer(&self) -> Option<&CharsetResponse> {
        self.answer.as_ref()
    }

    /// True while the server's `DO CHARSET` should be answered.
    pub fn awaiting_do(&self) -> bool {
        self.state == CharsetState::Offered
    }

    /// True while a `SB CHARSET` from the server should be hidden and captured.
    pub fn awaiting_response(&self) -> bool {
        matches!(self.state, CharsetState::Offered | CharsetState::Requested)
    }

    /// Writes `IAC SB CHARSET REQUEST ; <charset> IAC SE` to `dst`.
    pub fn request(&mut self, dst: &mut BytesMut) {
        let name = self.charset.wire_name();
        dst.reserve(name.len() + 7);
        dst.put_u8(IAC);
        dst.put_u8(SB);
        dst.put_u8(option::CHARSET);
        dst.put_u8(consts::charset::REQUEST);
        dst.put_u8(consts::charset::SEPARATOR);
        dst.put_slice(name);
        dst.put_u8(IAC);
        dst.put_u8(SE);
        self.state = CharsetState::Requested;
        debug!("Requesting charset {}", self.charset);
    }

    /// Records one payload byte of the server's charset subnegotiation.
    pub fn capture(&mut self, byte: u8) {
        if matches!(byte, consts::NUL | consts::DC1) {
            return;
        }
        if self.response_code.is_none() {
            self.response_code = Some(byte);
        } else {
            self.response.put_u8(byte);
        }
    }

    /// Ends the handshake and returns what the server answered.
    pub fn complete(&mut self) -> Option<CharsetResponse> {
        self.state = CharsetState::Complete;
        let code = self.response_code.take()?;
        let name = self.response.split();
        let response = match code {
            consts::charset::ACCEPTED => {
                debug!(
                    "Server accepted charset {}",
                    String::from_utf8_lossy(&name)
                );
                CharsetResponse::Accepted(name)
            }
            consts::charset::REJECTED => {
                warn!(
                    "Server rejected charset {}, keeping the default encoding",
                    self.charset
                );
                CharsetResponse::Rejected
            }
            other => {
                debug!("Ignoring charset subnegotiation command {}", other);
                CharsetResponse::Other(other)
            }
        };
        self.answer = Some(response.clone());
        Some(response)
    }
}
