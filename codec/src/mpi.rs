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

//! MPI frame extraction.
//!
//! An MPI frame starts with `~$#E` at the beginning of a line, followed by a header line
//! `<command><decimal length>\n` and exactly `length` bytes of body.

use crate::consts::{LF, MPI_SIGNATURE};
use crate::event::{MpiCommand, MpiFrame};
use bytes::{BufMut, BytesMut};
use tracing::{debug, warn};

/// Longest header line accepted: a command letter and the digits of any `usize`.
const MAX_HEADER_LEN: usize = 24;

/// Result of offering a byte to the signature matcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Scan {
    /// Byte extends a partial signature match.
    Claimed,
    /// Byte completed the signature, the header follows.
    Activated,
    /// Byte does not continue the signature. The bytes matched so far must be handled as
    /// plain text before the current byte.
    Rejected(&'static [u8]),
}

#[derive(Debug, PartialEq, Eq)]
enum MpiState {
    /// Matching the signature, `matched` bytes seen so far.
    Scanning { matched: usize },
    /// Reading the header line.
    Header(BytesMut),
    /// Reading the body.
    Body {
        command: MpiCommand,
        length: usize,
        data: BytesMut,
    },
}

pub(crate) struct MpiLayer {
    state: MpiState,
}

impl MpiLayer {
    pub fn new() -> MpiLayer {
        MpiLayer {
            state: MpiState::Scanning { matched: 0 },
        }
    }

    /// True while header or body bytes are being collected.
    pub fn is_active(&self) -> bool {
        !matches!(self.state, MpiState::Scanning { .. })
    }

    /// Number of signature bytes matched so far.
    pub fn signature_progress(&self) -> usize {
        match self.state {
            MpiState::Scanning { matched } => matched,
            _ => 0,
        }
    }

    /// Declared body length, once the header was parsed.
    pub fn declared_length(&self) -> Option<usize> {
        match self.state {
            MpiState::Body { length, .. } => Some(length),
            _ => None,
        }
    }

    /// Offers a byte to the signature matcher. Only valid while not active.
    pub fn scan(&mut self, byte: u8, line_start: bool) -> Scan {
        let MpiState::Scanning { matched } = self.state else {
            return Scan::Rejected(b"");
        };
        if byte == MPI_SIGNATURE[matched] && (matched > 0 || line_start) {
            if matched + 1 == MPI_SIGNATURE.len() {
                self.state = MpiState::Header(BytesMut::new());
                Scan::Activated
            } else {
                self.state = MpiState::Scanning {
                    matched: matched + 1,
                };
                Scan::Claimed
            }
        } else {
            self.state = MpiState::Scanning { matched: 0 };
            Scan::Rejected(&MPI_SIGNATURE[..matched])
        }
    }

    /// Gives up a partial signature match, returning the bytes matched so far.
    pub fn abandon(&mut self) -> &'static [u8] {
        let matched = self.signature_progress();
        if !self.is_active() {
            self.reset();
        }
        &MPI_SIGNATURE[..matched]
    }

    /// Appends a header or body byte. Returns the frame once the body is complete.
    pub fn push(&mut self, byte: u8) -> Option<MpiFrame> {
        match &mut self.state {
            MpiState::Scanning { .. } => None,
            MpiState::Header(header) if byte == LF => {
                match parse_header(header) {
                    Some((command, 0)) => {
                        self.reset();
                        Some(MpiFrame {
                            command,
                            data: Default::default(),
                        })
                    }
                    Some((command, length)) => {
                        debug!("MPI {:?} frame of {} bytes", command, length);
                        self.state = MpiState::Body {
                            command,
                            length,
                            data: BytesMut::with_capacity(length.min(64 * 1024)),
                        };
                        None
                    }
                    None => {
                        warn!(
                            "Dropping MPI frame with invalid header {:?}",
                            String::from_utf8_lossy(header)
                        );
                        self.reset();
                        None
                    }
                }
            }
            MpiState::Header(header) if header.len() >= MAX_HEADER_LEN => {
                warn!("Dropping MPI frame with a header over {} bytes", MAX_HEADER_LEN);
                self.reset();
                None
            }
            MpiState::Header(header) => {
                header.put_u8(byte);
                None
            }
            MpiState::Body {
                command,
                length,
                data,
            } => {
                data.put_u8(byte);
                if data.len() < *length {
                    return None;
                }
                let frame = MpiFrame {
                    command: *command,
                    data: data.split().freeze(),
                };
                self.reset();
                Some(frame)
            }
        }
    }

    fn reset(&mut self) {
        self.state = MpiState::Scanning { matched: 0 };
    }
}

/// Parses `<E|V><decimal length>`.
fn parse_header(header: &[u8]) -> Option<(MpiCommand, usize)> {
    let (&letter, digits) = header.split_first()?;
    let command = MpiCommand::from_u8(letter)?;
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let length = std::str::from_utf8(digits).ok()?.parse().ok()?;
    Some((command, length))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activate(layer: &mut MpiLayer) {
        assert_eq!(layer.scan(b'~', true), Scan::Claimed);
        assert_eq!(layer.scan(b'$', false), Scan::Claimed);
        assert_eq!(layer.scan(b'#', false), Scan::Claimed);
        assert_eq!(layer.scan(b'E', false), Scan::Activated);
        assert!(layer.is_active());
    }

    fn push_all(layer: &mut MpiLayer, bytes: &[u8]) -> Vec<MpiFrame> {
        bytes.iter().filter_map(|byte| layer.push(*byte)).collect()
    }

    #[test]
    fn header_parsing() {
        assert_eq!(parse_header(b"E12"), Some((MpiCommand::Edit, 12)));
        assert_eq!(parse_header(b"V0"), Some((MpiCommand::View, 0)));
        assert_eq!(parse_header(b"X12"), None);
        assert_eq!(parse_header(b"E"), None);
        assert_eq!(parse_header(b"E1a"), None);
        assert_eq!(parse_header(b""), None);
        assert_eq!(parse_header(b"E99999999999999999999999"), None);
    }

    #[test]
    fn signature_requires_line_start() {
        let mut layer = MpiLayer::new();
        assert_eq!(layer.scan(b'~', false), Scan::Rejected(b""));
        assert_eq!(layer.signature_progress(), 0);
    }

    #[test]
    fn partial_signature_is_rejected_with_replay() {
        let mut layer = MpiLayer::new();
        assert_eq!(layer.scan(b'~', true), Scan::Claimed);
        assert_eq!(layer.scan(b'$', false), Scan::Claimed);
        assert_eq!(layer.signature_progress(), 2);
        assert_eq!(layer.scan(b'x', false), Scan::Rejected(b"~$"));
        assert_eq!(layer.signature_progress(), 0);
        assert!(!layer.is_active());
    }

    #[test]
    fn abandon_returns_partial_match() {
        let mut layer = MpiLayer::new();
        assert_eq!(layer.scan(b'~', true), Scan::Claimed);
        assert_eq!(layer.abandon(), b"~");
        assert_eq!(layer.abandon(), b"");
        activate(&mut layer);
        assert_eq!(layer.abandon(), b"");
        assert!(layer.is_active());
    }

    #[test]
    fn extracts_exact_length() {
        let mut layer = MpiLayer::new();
        activate(&mut layer);
        assert!(push_all(&mut layer, b"V5\n").is_empty());
        assert_eq!(layer.declared_length(), Some(5));
        let frames = push_all(&mut layer, b"hello");
        assert_eq!(
            frames,
            vec![MpiFrame {
                command: MpiCommand::View,
                data: bytes::Bytes::from_static(b"hello"),
            }]
        );
        assert!(!layer.is_active());
    }

    #[test]
    fn zero_length_completes_at_header() {
        let mut layer = MpiLayer::new();
        activate(&mut layer);
        let frames = push_all(&mut layer, b"E0\n");
        assert_eq!(frames.len(), 1);
        assert!(frames[0].data.is_empty());
        assert!(!layer.is_active());
    }

    #[test]
    fn invalid_header_aborts() {
        let mut layer = MpiLayer::new();
        activate(&mut layer);
        assert!(push_all(&mut layer, b"Q12\n").is_empty());
        assert!(!layer.is_active());
        assert_eq!(layer.declared_length(), None);
    }

    #[test]
    #[tracing_test::traced_test]
    fn invalid_header_is_logged() {
        let mut layer = MpiLayer::new();
        activate(&mut layer);
        assert!(push_all(&mut layer, b"E1x
").is_empty());
        assert!(logs_contain("Dropping MPI frame with invalid header"));
    }

    #[test]
    fn overlong_header_aborts() {
        let mut layer = MpiLayer::new();
        activate(&mut layer);
        let header = vec![b'1'; MAX_HEADER_LEN + 1];
        assert!(push_all(&mut layer, b"E").is_empty());
        assert!(push_all(&mut layer, &header).is_empty());
        assert!(!layer.is_active());
    }
}
