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

//! Telnet layer of the server decoder.
//!
//! This layer has first claim on every byte. Pending sequence bytes are kept in the state
//! itself (`IAC`, `IAC <verb>`, `IAC SB`) and only released to the client once the sequence
//! is known to be client-bound, so hidden exchanges never touch the client buffer.

use crate::charset::CharsetNegotiation;
use crate::consts::{DC1, DO, DONT, GA, IAC, NUL, SB, SE, WILL, WONT, option};
use crate::output::ClientBuffer;
use bytes::BytesMut;
use tracing::trace;

/// Outcome of feeding one byte to the Telnet layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TelnetStep {
    /// Byte is not Telnet overhead; lower layers decide.
    Pass,
    /// Byte was claimed (held, forwarded or swallowed).
    Consumed,
    /// `IAC IAC` completed. The caller decides where the literal 0xFF goes.
    Literal,
    /// `IAC GA` completed and was forwarded.
    GoAhead,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TelnetState {
    /// Normal Data
    Data,
    /// Received IAC, next byte is a command
    Command,
    /// Received IAC and a negotiation verb, next byte is the option
    Negotiate(u8),
    /// Received IAC SB, next byte is the option
    SubnegotiateOption,
    /// Inside a subnegotiation; `capture` routes the payload to the charset handshake
    Subnegotiate { capture: bool },
    /// Received IAC inside a subnegotiation
    SubnegotiateCommand { capture: bool },
}

pub(crate) struct TelnetLayer {
    state: TelnetState,
}

impl TelnetLayer {
    pub fn new() -> TelnetLayer {
        TelnetLayer {
            state: TelnetState::Data,
        }
    }

    pub fn state(&self) -> TelnetState {
        self.state
    }

    pub fn in_subnegotiation(&self) -> bool {
        matches!(
            self.state,
            TelnetState::Subnegotiate { .. } | TelnetState::SubnegotiateCommand { .. }
        )
    }

    pub fn advance(
        &mut self,
        byte: u8,
        charset: &mut CharsetNegotiation,
        client: &mut ClientBuffer,
        server: &mut BytesMut,
    ) -> TelnetStep {
        match (self.state, byte) {
            (TelnetState::Data, IAC) => {
                self.state = TelnetState::Command;
                TelnetStep::Consumed
            }
            (TelnetState::Data, NUL | DC1) => {
                client.push(byte);
                TelnetStep::Consumed
            }
            (TelnetState::Data, _) => TelnetStep::Pass,
            (TelnetState::Command, WILL | WONT | DO | DONT) => {
                self.state = TelnetState::Negotiate(byte);
                TelnetStep::Consumed
            }
            (TelnetState::Command, SB) => {
                self.state = TelnetState::SubnegotiateOption;
                TelnetStep::Consumed
            }
            (TelnetState::Command, IAC) => {
                self.state = TelnetState::Data;
                TelnetStep::Literal
            }
            (TelnetState::Command, GA) => {
                self.state = TelnetState::Data;
                client.extend(&[IAC, GA]);
                TelnetStep::GoAhead
            }
            (TelnetState::Command, _) => {
                self.state = TelnetState::Data;
                client.extend(&[IAC, byte]);
                TelnetStep::Consumed
            }
            (TelnetState::Negotiate(DO), option::CHARSET) if charset.awaiting_do() => {
                self.state = TelnetState::Data;
                charset.request(server);
                TelnetStep::Consumed
            }
            (TelnetState::Negotiate(verb), _) => {
                trace!("Forwarding negotiation {} {}", verb, byte);
                self.state = TelnetState::Data;
                client.extend(&[IAC, verb, byte]);
                TelnetStep::Consumed
            }
            (TelnetState::SubnegotiateOption, option::CHARSET) if charset.awaiting_response() => {
                self.state = TelnetState::Subnegotiate { capture: true };
                TelnetStep::Consumed
            }
            (TelnetState::SubnegotiateOption, _) => {
                self.state = TelnetState::Subnegotiate { capture: false };
                client.extend(&[IAC, SB, byte]);
                TelnetStep::Consumed
            }
            (TelnetState::Subnegotiate { capture }, IAC) => {
                self.state = TelnetState::SubnegotiateCommand { capture };
                TelnetStep::Consumed
            }
            (TelnetState::Subnegotiate { capture: true }, _) => {
                charset.capture(byte);
                TelnetStep::Consumed
            }
            (TelnetState::Subnegotiate { capture: false }, _) => {
                client.push(byte);
                TelnetStep::Consumed
            }
            (TelnetState::SubnegotiateCommand { capture: true }, SE) => {
                self.state = TelnetState::Data;
                charset.complete();
                TelnetStep::Consumed
            }
            (TelnetState::SubnegotiateCommand { capture: false }, SE) => {
                self.state = TelnetState::Data;
                client.extend(&[IAC, SE]);
                TelnetStep::Consumed
            }
            (TelnetState::SubnegotiateCommand { capture: true }, IAC) => {
                self.state = TelnetState::Subnegotiate { capture: true };
                charset.capture(IAC);
                TelnetStep::Consumed
            }
            (TelnetState::SubnegotiateCommand { capture: true }, _) => {
                self.state = TelnetState::Subnegotiate { capture: true };
                TelnetStep::Consumed
            }
            (TelnetState::SubnegotiateCommand { capture: false }, _) => {
                self.state = TelnetState::Subnegotiate { capture: false };
                client.extend(&[IAC, byte]);
                TelnetStep::Consumed
            }
        }
    }
}
