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

use crate::charset::{Charset, CharsetNegotiation, CharsetResponse, CharsetState};
use crate::consts::{DC1, IAC, LF, LOGIN_BANNER, LOGIN_REPLIES, NUL};
use crate::event::{DecodedChunk, MpiFrame, MudEvent};
use crate::mpi::{MpiLayer, Scan};
use crate::output::{ClientBuffer, Normalizer, OutputFormat, script_marker};
use crate::result::DecoderError;
use crate::tags::{TagLayer, XmlMode, text_events};
use crate::telnet::{TelnetLayer, TelnetState, TelnetStep};
use bytes::{BufMut, BytesMut};
use tokio_util::codec::Decoder;
use tracing::{debug, trace};

/// Accumulated text is turned into events once it reaches this size, even without a tag.
const MAX_TEXT_LEN: usize = 64 * 1024;

/// Watches the first bytes of a session for the login banner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoginBanner {
    Matching(usize),
    Detected,
    Absent,
}

impl LoginBanner {
    /// Returns true exactly once, on the byte completing the banner.
    fn observe(&mut self, byte: u8) -> bool {
        match *self {
            LoginBanner::Matching(matched) if LOGIN_BANNER[matched] == byte => {
                if matched + 1 == LOGIN_BANNER.len() {
                    *self = LoginBanner::Detected;
                    true
                } else {
                    *self = LoginBanner::Matching(matched + 1);
                    false
                }
            }
            LoginBanner::Matching(_) => {
                *self = LoginBanner::Absent;
                false
            }
            LoginBanner::Detected | LoginBanner::Absent => false,
        }
    }
}

/// Decoder for the game server's byte stream.
///
/// Every byte goes through the layers in a fixed order of priority: the Telnet layer claims
/// escape sequences, subnegotiations and ignorable control bytes; an active MPI frame takes
/// its header and body bytes; outside of a tag the MPI signature matcher looks at line starts;
/// then the tag state machine reads `<`...`>`; whatever is left is text for the client.
///
/// Each call to [`ServerDecoder::feed`] (or each [`Decoder::decode`] with a non empty
/// buffer) consumes one read and returns everything it produced as a [`DecodedChunk`].
/// Incomplete sequences are carried over to the next read, so the concatenated output
/// does not depend on how the stream was split.
///
/// ```
/// use mapperproxy_codec::{Charset, MudEvent, OutputFormat, ServerDecoder};
///
/// let mut decoder = ServerDecoder::new(OutputFormat::Normal, Charset::default());
/// let chunk = decoder.feed(b"<room><name>Center Square</name></room>");
/// assert_eq!(&chunk.client[..], b"Center Square");
/// assert_eq!(chunk.events[0].kind(), "name");
/// ```
pub struct ServerDecoder {
    format: OutputFormat,
    banner: LoginBanner,
    telnet: TelnetLayer,
    charset: CharsetNegotiation,
    mpi: MpiLayer,
    tags: TagLayer,
    text: BytesMut,
    client: ClientBuffer,
    normalizer: Normalizer,
    server: BytesMut,
    events: Vec<MudEvent>,
    frames: Vec<MpiFrame>,
}

impl ServerDecoder {
    /// Creates a decoder writing client output in `format` and requesting `charset` once the
    /// server's login banner was seen.
    pub fn new(format: OutputFormat, charset: Charset) -> ServerDecoder {
        ServerDecoder {
            format,
            banner: LoginBanner::Matching(0),
            telnet: TelnetLayer::new(),
            charset: CharsetNegotiation::new(charset),
            mpi: MpiLayer::new(),
            tags: TagLayer::new(),
            text: BytesMut::new(),
            client: ClientBuffer::new(),
            normalizer: Normalizer::new(),
            server: BytesMut::new(),
            events: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// Output format of the client stream.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Current tagged region.
    pub fn xml_mode(&self) -> XmlMode {
        self.tags.mode()
    }

    /// Progress of the charset handshake.
    pub fn charset_state(&self) -> CharsetState {
        self.charset.state()
    }

    /// The server's answer to the charset request, once received.
    pub fn charset_response(&self) -> Option<&CharsetResponse> {
        self.charset.answer()
    }

    /// True once the login banner was recognized.
    pub fn login_detected(&self) -> bool {
        self.banner == LoginBanner::Detected
    }

    /// True while an MPI header or body is being collected.
    pub fn mpi_active(&self) -> bool {
        self.mpi.is_active()
    }

    /// Body length announced by the MPI frame being collected.
    pub fn mpi_declared_length(&self) -> Option<usize> {
        self.mpi.declared_length()
    }

    /// True between a `<` and its `>`.
    pub fn reading_tag(&self) -> bool {
        self.tags.is_reading()
    }

    /// True inside a Telnet subnegotiation.
    pub fn in_subnegotiation(&self) -> bool {
        self.telnet.in_subnegotiation()
    }

    /// Decodes one read of the server stream.
    pub fn feed(&mut self, data: &[u8]) -> DecodedChunk {
        for byte in data {
            self.step(*byte);
        }
        let mut chunk = self.flush();
        chunk.consumed = data.len();
        chunk
    }

    /// Releases output held back at the end of the stream, if any.
    pub fn finish(&mut self) -> Option<DecodedChunk> {
        if !self.normalizer.has_pending() {
            return None;
        }
        let mut client = BytesMut::new();
        self.normalizer.finish(&mut client);
        Some(DecodedChunk {
            client,
            ..DecodedChunk::default()
        })
    }

    fn step(&mut self, byte: u8) {
        if self.banner.observe(byte) {
            self.login();
        }
        if matches!(byte, IAC | NUL | DC1) && self.telnet.state() == TelnetState::Data {
            let matched = self.mpi.abandon();
            self.replay(matched);
        }
        match self.telnet.advance(
            byte,
            &mut self.charset,
            &mut self.client,
            &mut self.server,
        ) {
            TelnetStep::Consumed => {}
            TelnetStep::GoAhead => {
                self.events.push(MudEvent::GoAhead);
                if self.tags.mode() == XmlMode::None {
                    self.text.put_u8(LF);
                }
            }
            TelnetStep::Literal if self.mpi.is_active() => self.mpi_byte(IAC),
            TelnetStep::Literal => self.client.extend(&[IAC, IAC]),
            TelnetStep::Pass => self.data(byte),
        }
    }

    fn login(&mut self) {
        debug!("Login banner detected, enabling remote editing and XML mode");
        for reply in LOGIN_REPLIES {
            self.server.put_slice(reply);
        }
        self.charset.offer();
    }

    fn data(&mut self, byte: u8) {
        if self.mpi.is_active() {
            self.mpi_byte(byte);
            return;
        }
        if !self.tags.is_reading() {
            match self.mpi.scan(byte, self.client.at_line_start()) {
                Scan::Claimed => return,
                Scan::Activated => {
                    trace!("MPI signature matched");
                    return;
                }
                Scan::Rejected(matched) => self.replay(matched),
            }
        }
        match byte {
            b'>' if self.tags.is_reading() => self.close_tag(),
            _ if self.tags.is_reading() => {
                self.tags.push(byte);
                if self.format == OutputFormat::Raw {
                    self.client.push(byte);
                }
            }
            b'<' => self.open_tag(),
            _ => self.text_byte(byte),
        }
    }

    fn replay(&mut self, matched: &[u8]) {
        for byte in matched {
            self.text_byte(*byte);
        }
    }

    fn mpi_byte(&mut self, byte: u8) {
        if let Some(frame) = self.mpi.push(byte) {
            debug!(
                "MPI {:?} frame complete, {} bytes",
                frame.command,
                frame.data.len()
            );
            self.frames.push(frame);
        }
    }

    fn text_byte(&mut self, byte: u8) {
        let suppressed = self.tags.is_suppressed();
        if !suppressed || self.format == OutputFormat::Raw {
            self.client.push(byte);
        }
        if !suppressed {
            self.text.put_u8(byte);
            if self.text.len() >= MAX_TEXT_LEN {
                trace!("Text over {} bytes without a tag, emitting it", MAX_TEXT_LEN);
                let text = self.text.split().freeze();
                text_events(self.tags.mode(), text, &mut self.events);
            }
        }
    }

    fn open_tag(&mut self) {
        let text = self.text.split().freeze();
        text_events(self.tags.mode(), text, &mut self.events);
        self.tags.open();
        if self.format == OutputFormat::Raw {
            self.client.push(b'<');
        }
    }

    fn close_tag(&mut self) {
        let closed = self.tags.close();
        match self.format {
            OutputFormat::Raw => self.client.push(b'>'),
            OutputFormat::ScriptFriendly => {
                if let Some(marker) = script_marker(&closed.tag) {
                    self.client.extend(marker);
                }
            }
            OutputFormat::Normal => {}
        }
        if let Some(event) = closed.event {
            self.events.push(event);
        }
    }

    fn flush(&mut self) -> DecodedChunk {
        let pending = self.client.take();
        let client = match self.format {
            OutputFormat::Raw => pending,
            OutputFormat::Normal | OutputFormat::ScriptFriendly => {
                let mut client = BytesMut::with_capacity(pending.len());
                self.normalizer.normalize(&pending, &mut client);
                client
            }
        };
        DecodedChunk {
            client,
            server: self.server.split(),
            events: std::mem::take(&mut self.events),
            frames: std::mem::take(&mut self.frames),
            consumed: 0,
        }
    }
}

impl Decoder for ServerDecoder {
    type Item = DecodedChunk;
    type Error = DecoderError;

    /// Consumes the whole buffer as one read. Returns `None` only for an empty buffer.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<DecodedChunk>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        let data = src.split();
        Ok(Some(self.feed(&data)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<DecodedChunk>, Self::Error> {
        match self.decode(src)? {
            Some(chunk) => Ok(Some(chunk)),
            None => Ok(self.finish()),
        }
    }
}
