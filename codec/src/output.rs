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

//! Client output: format selection, script markers and text normalization.

use crate::consts::{CR, LF};
use crate::tags::tag_name;
use bytes::{BufMut, BytesMut};
use std::fmt::Formatter;
use std::str::FromStr;

/// How the decoded stream is presented to the client. Fixed for a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// Tags are stripped, gratuitous text is dropped, entities are unescaped.
    #[default]
    Normal,
    /// Like [`OutputFormat::Normal`], plus plain text markers such as `NAME:`...`:NAME`
    /// around a few tags so scripting clients can trigger on them.
    ScriptFriendly,
    /// Everything the server sent except the negotiation and MPI traffic the proxy handles.
    Raw,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Normal => write!(f, "normal"),
            OutputFormat::ScriptFriendly => write!(f, "tintin"),
            OutputFormat::Raw => write!(f, "raw"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(OutputFormat::Normal),
            "tintin" | "script" | "script-friendly" => Ok(OutputFormat::ScriptFriendly),
            "raw" => Ok(OutputFormat::Raw),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

/// Marker written in place of a tag in [`OutputFormat::ScriptFriendly`] output.
pub fn script_marker(tag: &[u8]) -> Option<&'static [u8]> {
    match tag_name(tag) {
        b"prompt" => Some(b"PROMPT:"),
        b"/prompt" => Some(b":PROMPT"),
        b"name" => Some(b"NAME:"),
        b"/name" => Some(b":NAME"),
        b"tell" => Some(b"TELL:"),
        b"/tell" => Some(b":TELL"),
        b"narrate" => Some(b"NARRATE:"),
        b"/narrate" => Some(b":NARRATE"),
        b"pray" => Some(b"PRAY:"),
        b"/pray" => Some(b":PRAY"),
        b"say" => Some(b"SAY:"),
        b"/say" => Some(b":SAY"),
        b"emote" => Some(b"EMOTE:"),
        b"/emote" => Some(b":EMOTE"),
        _ => None,
    }
}

/// Per read accumulator of client-bound bytes. Remembers whether the last byte ever written
/// ended a line, across reads.
pub(crate) struct ClientBuffer {
    buffer: BytesMut,
    line_start: bool,
}

impl ClientBuffer {
    pub fn new() -> ClientBuffer {
        ClientBuffer {
            buffer: BytesMut::new(),
            line_start: false,
        }
    }

    pub fn push(&mut self, byte: u8) {
        self.buffer.put_u8(byte);
        self.line_start = byte == LF;
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        if let Some(last) = bytes.last() {
            self.line_start = *last == LF;
            self.buffer.put_slice(bytes);
        }
    }

    pub fn at_line_start(&self) -> bool {
        self.line_start
    }

    pub fn take(&mut self) -> BytesMut {
        self.buffer.split()
    }
}

const ENTITIES: [(&[u8], u8); 6] = [
    (b"&amp;", b'&'),
    (b"&lt;", b'<'),
    (b"&gt;", b'>'),
    (b"&quot;", b'"'),
    (b"&apos;", b'\''),
    (b"&#39;", b'\''),
];

enum EntityMatch {
    Complete(u8),
    Prefix,
    Mismatch,
}

fn match_entity(pending: &[u8]) -> EntityMatch {
    let mut prefix = false;
    for (entity, ch) in ENTITIES {
        if entity == pending {
            return EntityMatch::Complete(ch);
        }
        prefix |= entity.starts_with(pending);
    }
    if prefix {
        EntityMatch::Prefix
    } else {
        EntityMatch::Mismatch
    }
}

/// Streaming XML entity decoder. A possible entity cut by the end of the input is held
/// until more input arrives.
#[derive(Debug, Default)]
struct EntityDecoder {
    pending: Vec<u8>,
}

impl EntityDecoder {
    fn feed<F: FnMut(u8)>(&mut self, byte: u8, out: &mut F) {
        if self.pending.is_empty() {
            if byte == b'&' {
                self.pending.push(byte);
            } else {
                out(byte);
            }
            return;
        }
        self.pending.push(byte);
        match match_entity(&self.pending) {
            EntityMatch::Complete(ch) => {
                self.pending.clear();
                out(ch);
            }
            EntityMatch::Prefix => {}
            EntityMatch::Mismatch => {
                let held = std::mem::take(&mut self.pending);
                out(held[0]);
                for byte in &held[1..] {
                    self.feed(*byte, out);
                }
            }
        }
    }

    fn finish<F: FnMut(u8)>(&mut self, out: &mut F) {
        for byte in std::mem::take(&mut self.pending) {
            out(byte);
        }
    }
}

/// Final pass over client output for the non-raw formats: unescapes XML entities, drops
/// carriage returns and collapses each pair of line feeds into one.
///
/// State carries over between calls, so the concatenated output does not depend on how
/// the input was split. A read ending in what may be an entity (`Rock &`) holds those bytes
/// back until the next byte decides it. Prompts are followed by `IAC GA`, which never
/// continues an entity, so a held prompt tail is released with it.
#[derive(Debug, Default)]
pub struct Normalizer {
    entities: EntityDecoder,
    newline_pending: bool,
}

impl Normalizer {
    /// Creates a normalizer with no held input.
    pub fn new() -> Normalizer {
        Normalizer::default()
    }

    /// True if an incomplete entity is being held back.
    pub fn has_pending(&self) -> bool {
        !self.entities.pending.is_empty()
    }

    /// Normalizes `input`, appending the result to `dst`.
    pub fn normalize(&mut self, input: &[u8], dst: &mut BytesMut) {
        dst.reserve(input.len());
        let newline_pending = &mut self.newline_pending;
        let mut emit = |byte: u8| emit_normalized(byte, newline_pending, dst);
        for byte in input {
            self.entities.feed(*byte, &mut emit);
        }
    }

    /// Releases held input unchanged, at end of stream.
    pub fn finish(&mut self, dst: &mut BytesMut) {
        let newline_pending = &mut self.newline_pending;
        let mut emit = |byte: u8| emit_normalized(byte, newline_pending, dst);
        self.entities.finish(&mut emit);
    }
}

fn emit_normalized(byte: u8, newline_pending: &mut bool, dst: &mut BytesMut) {
    match byte {
        CR => {}
        LF if *newline_pending => *newline_pending = false,
        LF => {
            *newline_pending = true;
            dst.put_u8(LF);
        }
        _ => {
            *newline_pending = false;
            dst.put_u8(byte);
        }
    }
}

/// Escapes `& < > " '` as XML entities.
pub fn escape_xml(text: &[u8]) -> BytesMut {
    let mut escaped = BytesMut::with_capacity(text.len());
    for byte in text {
        match byte {
            b'&' => escaped.put_slice(b"&amp;"),
            b'<' => escaped.put_slice(b"&lt;"),
            b'>' => escaped.put_slice(b"&gt;"),
            b'"' => escaped.put_slice(b"&quot;"),
            b'\'' => escaped.put_slice(b"&#39;"),
            _ => escaped.put_u8(*byte),
        }
    }
    escaped
}

/// Reverses XML entity escaping in a single pass. `&apos;` and `&#39;` both become `'`.
pub fn unescape_xml(text: &[u8]) -> BytesMut {
    let mut unescaped = BytesMut::with_capacity(text.len());
    let mut decoder = EntityDecoder::default();
    let mut out = |byte: u8| unescaped.put_u8(byte);
    for byte in text {
        decoder.feed(*byte, &mut out);
    }
    decoder.finish(&mut out);
    unescaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(chunks: &[&[u8]]) -> BytesMut {
        let mut normalizer = Normalizer::new();
        let mut dst = BytesMut::new();
        for chunk in chunks {
            normalizer.normalize(chunk, &mut dst);
        }
        normalizer.finish(&mut dst);
        dst
    }

    #[test]
    fn output_format_from_str() {
        assert_eq!("normal".parse(), Ok(OutputFormat::Normal));
        assert_eq!("TinTin".parse(), Ok(OutputFormat::ScriptFriendly));
        assert_eq!("raw".parse(), Ok(OutputFormat::Raw));
        assert!("fancy".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::ScriptFriendly.to_string(), "tintin");
    }

    #[test]
    fn script_markers() {
        assert_eq!(script_marker(b"name"), Some(&b"NAME:"[..]));
        assert_eq!(script_marker(b"/name"), Some(&b":NAME"[..]));
        assert_eq!(script_marker(b"say"), Some(&b"SAY:"[..]));
        assert_eq!(script_marker(b"room"), None);
        assert_eq!(script_marker(b"description"), None);
    }

    #[test]
    fn client_buffer_tracks_line_start() {
        let mut buffer = ClientBuffer::new();
        assert!(!buffer.at_line_start());
        buffer.extend(b"hello\n");
        assert!(buffer.at_line_start());
        assert_eq!(&buffer.take()[..], b"hello\n");
        assert!(buffer.at_line_start());
        buffer.push(b'x');
        assert!(!buffer.at_line_start());
        buffer.extend(b"");
        assert!(!buffer.at_line_start());
    }

    #[test]
    fn unescapes_entities() {
        assert_eq!(
            &unescape_xml(b"&lt;b&gt; &amp; &quot;q&quot; &apos;a&#39;")[..],
            b"<b> & \"q\" 'a'"
        );
        assert_eq!(&unescape_xml(b"&amp;lt;")[..], b"&lt;");
        assert_eq!(&unescape_xml(b"AT&T &&amp; &am")[..], b"AT&T && &am");
    }

    #[test]
    fn escape_round_trip() {
        let text = b"<tell> \"Hi\" it's > all";
        assert_eq!(&unescape_xml(&escape_xml(text))[..], &text[..]);
    }

    #[test]
    fn collapses_newlines() {
        assert_eq!(&normalize(&[b"a\r\n\r\nb"])[..], b"a\nb");
        assert_eq!(&normalize(&[b"a\n\n\nb"])[..], b"a\n\nb");
        assert_eq!(&normalize(&[b"a\n", b"\nb"])[..], b"a\nb");
    }

    #[test]
    fn entity_split_across_chunks() {
        assert_eq!(&normalize(&[b"x &am", b"p; y"])[..], b"x & y");
        assert_eq!(&normalize(&[b"fish &"])[..], b"fish &");

        let mut normalizer = Normalizer::new();
        let mut dst = BytesMut::new();
        normalizer.normalize(b"a &q", &mut dst);
        assert!(normalizer.has_pending());
        assert_eq!(&dst[..], b"a ");
    }
}
