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

//! XML tag state machine.
//!
//! Tracks which tagged region of the server's XML mode output the plain text belongs to.
//! Modes only change when a tag closes (`>`), according to [`transition`]; everything the
//! table does not list leaves the mode untouched, since the server is trusted to emit
//! well formed markup.

use crate::consts::tag;
use crate::event::MudEvent;
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt::Formatter;
use tracing::trace;

/// Tagged region the decoder is currently in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum XmlMode {
    /// Untagged text.
    #[default]
    None,
    /// Inside `<room>`.
    Room,
    /// Inside `<room><name>`.
    Name,
    /// Inside `<room><description>`.
    Description,
    /// Inside `<exits>`.
    Exits,
    /// Inside `<prompt>`.
    Prompt,
    /// Inside `<room><terrain>`.
    Terrain,
}

impl std::fmt::Display for XmlMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Effect of a closed tag on the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Transition {
    /// Switch to another mode.
    Mode(XmlMode),
    /// Turn the gratuitous span on or off; the mode stays `Room`.
    Gratuitous(bool),
    /// A self contained movement tag, the mode is unchanged.
    Movement,
    /// Not part of the table.
    Ignore,
}

/// The transition table, keyed by the current mode and the tag's name.
pub(crate) fn transition(mode: XmlMode, name: &[u8]) -> Transition {
    match (mode, name) {
        (XmlMode::None, tag::ROOM) => Transition::Mode(XmlMode::Room),
        (XmlMode::None, tag::PROMPT) => Transition::Mode(XmlMode::Prompt),
        (XmlMode::None, tag::EXITS) => Transition::Mode(XmlMode::Exits),
        (XmlMode::None, tag::MOVEMENT) => Transition::Movement,
        (XmlMode::Room, tag::NAME) => Transition::Mode(XmlMode::Name),
        (XmlMode::Room, tag::DESCRIPTION) => Transition::Mode(XmlMode::Description),
        (XmlMode::Room, tag::TERRAIN) => Transition::Mode(XmlMode::Terrain),
        (XmlMode::Room, tag::GRATUITOUS) => Transition::Gratuitous(true),
        (XmlMode::Room, b"/gratuitous") => Transition::Gratuitous(false),
        (XmlMode::Room, b"/room") => Transition::Mode(XmlMode::None),
        (XmlMode::Name, b"/name") => Transition::Mode(XmlMode::Room),
        (XmlMode::Description, b"/description") => Transition::Mode(XmlMode::Room),
        (XmlMode::Terrain, b"/terrain") => Transition::Mode(XmlMode::Room),
        (XmlMode::Exits, b"/exits") => Transition::Mode(XmlMode::None),
        (XmlMode::Prompt, b"/prompt") => Transition::Mode(XmlMode::None),
        _ => Transition::Ignore,
    }
}

/// Name of a tag: its text up to the first space or `/` after the first byte, so
/// `movement dir=up/` is `movement` and `/room` stays `/room`.
pub fn tag_name(tag: &[u8]) -> &[u8] {
    let end = tag
        .iter()
        .skip(1)
        .position(|byte| *byte == b'/' || byte.is_ascii_whitespace())
        .map_or(tag.len(), |index| index + 1);
    &tag[..end]
}

/// Direction of a movement tag: the text after ` dir=`, cut at the first `/`.
pub fn movement_direction(tag: &[u8]) -> Bytes {
    let rest = tag.strip_prefix(tag::MOVEMENT).unwrap_or(tag);
    let mut direction = BytesMut::with_capacity(rest.len());
    match rest
        .windows(tag::DIRECTION_ATTRIBUTE.len())
        .position(|window| window == tag::DIRECTION_ATTRIBUTE)
    {
        Some(index) => {
            direction.put_slice(&rest[..index]);
            direction.put_slice(&rest[index + tag::DIRECTION_ATTRIBUTE.len()..]);
        }
        None => direction.put_slice(rest),
    }
    if let Some(slash) = direction.iter().position(|byte| *byte == b'/') {
        direction.truncate(slash);
    }
    direction.freeze()
}

/// A tag that was just closed by `>`.
#[derive(Debug)]
pub(crate) struct ClosedTag {
    /// Full text between `<` and `>`.
    pub tag: Bytes,
    /// Event emitted by the tag itself.
    pub event: Option<MudEvent>,
}

pub(crate) struct TagLayer {
    mode: XmlMode,
    reading: bool,
    tag: BytesMut,
    gratuitous: bool,
}

impl TagLayer {
    pub fn new() -> TagLayer {
        TagLayer {
            mode: XmlMode::None,
            reading: false,
            tag: BytesMut::new(),
            gratuitous: false,
        }
    }

    pub fn mode(&self) -> XmlMode {
        self.mode
    }

    pub fn is_reading(&self) -> bool {
        self.reading
    }

    /// True inside a gratuitous span.
    pub fn is_suppressed(&self) -> bool {
        self.gratuitous
    }

    pub fn open(&mut self) {
        self.reading = true;
    }

    pub fn push(&mut self, byte: u8) {
        self.tag.put_u8(byte);
    }

    pub fn close(&mut self) -> ClosedTag {
        self.reading = false;
        let tag = self.tag.split().freeze();
        let event = match transition(self.mode, tag_name(&tag)) {
            Transition::Mode(mode) => {
                trace!("XML mode {} -> {}", self.mode, mode);
                self.mode = mode;
                None
            }
            Transition::Gratuitous(on) => {
                self.gratuitous = on;
                None
            }
            Transition::Movement => Some(MudEvent::Movement(movement_direction(&tag))),
            Transition::Ignore => None,
        };
        ClosedTag { tag, event }
    }
}

/// Turns the text accumulated before a tag into events, according to the mode it was read in.
pub(crate) fn text_events(mode: XmlMode, text: Bytes, events: &mut Vec<MudEvent>) {
    if is_blank(&text) {
        return;
    }
    match mode {
        XmlMode::None => {
            events.extend(
                split_lines(&text)
                    .filter(|line| !is_blank(line))
                    .map(MudEvent::Line),
            );
        }
        XmlMode::Name => events.push(MudEvent::Name(text)),
        XmlMode::Description => events.push(MudEvent::Description(text)),
        XmlMode::Room => events.push(MudEvent::Dynamic(text)),
        XmlMode::Exits => events.push(MudEvent::Exits(text)),
        XmlMode::Prompt => events.push(MudEvent::Prompt(text)),
        XmlMode::Terrain => {}
    }
}

fn is_blank(text: &[u8]) -> bool {
    text.iter().all(u8::is_ascii_whitespace)
}

/// Splits on `\n`, `\r` and `\r\n` without copying.
fn split_lines(text: &Bytes) -> impl Iterator<Item = Bytes> + '_ {
    let mut start = 0;
    std::iter::from_fn(move || {
        if start >= text.len() {
            return None;
        }
        let rest = &text[start..];
        let (line_end, next) = match rest.iter().position(|byte| matches!(byte, b'\n' | b'\r')) {
            Some(index) if rest[index] == b'\r' && rest.get(index + 1) == Some(&b'\n') => {
                (start + index, start + index + 2)
            }
            Some(index) => (start + index, start + index + 1),
            None => (text.len(), text.len()),
        };
        let line = text.slice(start..line_end);
        start = next;
        Some(line)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table() {
        use XmlMode::*;
        let cases = [
            (None, "room", Transition::Mode(Room)),
            (None, "prompt", Transition::Mode(Prompt)),
            (None, "exits", Transition::Mode(Exits)),
            (None, "movement", Transition::Movement),
            (None, "name", Transition::Ignore),
            (None, "/room", Transition::Ignore),
            (Room, "name", Transition::Mode(Name)),
            (Room, "description", Transition::Mode(Description)),
            (Room, "terrain", Transition::Mode(Terrain)),
            (Room, "gratuitous", Transition::Gratuitous(true)),
            (Room, "/gratuitous", Transition::Gratuitous(false)),
            (Room, "/room", Transition::Mode(None)),
            (Room, "exits", Transition::Ignore),
            (Name, "/name", Transition::Mode(Room)),
            (Name, "/room", Transition::Ignore),
            (Description, "/description", Transition::Mode(Room)),
            (Terrain, "/terrain", Transition::Mode(Room)),
            (Exits, "/exits", Transition::Mode(None)),
            (Prompt, "/prompt", Transition::Mode(None)),
            (Prompt, "/exits", Transition::Ignore),
        ];
        for (mode, name, expected) in cases {
            assert_eq!(transition(mode, name.as_bytes()), expected, "{mode} + {name}");
        }
    }

    #[test]
    fn tag_names() {
        assert_eq!(tag_name(b"room"), b"room");
        assert_eq!(tag_name(b"/room"), b"/room");
        assert_eq!(tag_name(b"movement dir=north/"), b"movement");
        assert_eq!(tag_name(b"movement/"), b"movement");
        assert_eq!(tag_name(b""), b"");
    }

    #[test]
    fn movement_directions() {
        assert_eq!(&movement_direction(b"movement dir=north/")[..], b"north");
        assert_eq!(&movement_direction(b"movement dir=up/")[..], b"up");
        assert_eq!(&movement_direction(b"movement/")[..], b"");
    }

    #[test]
    fn close_applies_transitions() {
        let mut layer = TagLayer::new();
        for tag in [&b"room"[..], b"gratuitous"] {
            layer.open();
            tag.iter().for_each(|byte| layer.push(*byte));
            let closed = layer.close();
            assert!(closed.event.is_none());
        }
        assert_eq!(layer.mode(), XmlMode::Room);
        assert!(layer.is_suppressed());
        assert!(!layer.is_reading());
    }

    #[test]
    fn line_events_skip_blank_lines() {
        let mut events = Vec::new();
        text_events(
            XmlMode::None,
            Bytes::from_static(b"You are hungry.\r\n\r\n  \nIt is dark.\n"),
            &mut events,
        );
        assert_eq!(
            events,
            vec![
                MudEvent::Line(Bytes::from_static(b"You are hungry.")),
                MudEvent::Line(Bytes::from_static(b"It is dark.")),
            ]
        );
    }

    #[test]
    fn mode_events() {
        let mut events = Vec::new();
        text_events(XmlMode::Room, Bytes::from_static(b"  "), &mut events);
        text_events(XmlMode::Terrain, Bytes::from_static(b"forest"), &mut events);
        assert!(events.is_empty());
        text_events(XmlMode::Room, Bytes::from_static(b"*"), &mut events);
        text_events(XmlMode::Exits, Bytes::from_static(b"Exits: north."), &mut events);
        assert_eq!(
            events,
            vec![
                MudEvent::Dynamic(Bytes::from_static(b"*")),
                MudEvent::Exits(Bytes::from_static(b"Exits: north.")),
            ]
        );
    }
}
