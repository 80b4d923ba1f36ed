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

//! Event queue between the proxy and the mapper
//!
//! An ordered, unbounded, multi producer single consumer queue. Both session contexts hold an
//! [`EventSink`]; the mapper owns the [`EventReceiver`]. Once every sink is dropped the
//! receiver yields `None`, which is how the mapper learns that the session ended.

use crate::{ProxyError, Result};
use bytes::Bytes;
use mapperproxy_codec::MudEvent;
use metrics::counter;
use std::fmt::Formatter;
use tokio::sync::mpsc;

/// Item of the event queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProxyEvent {
    /// Decoded from the server stream.
    Mud(MudEvent),
    /// Client input addressed to the mapper, verbatim.
    User(Bytes),
}

impl ProxyEvent {
    /// Short name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyEvent::Mud(event) => event.kind(),
            ProxyEvent::User(_) => "user",
        }
    }
}

impl std::fmt::Display for ProxyEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyEvent::Mud(event) => write!(f, "{event}"),
            ProxyEvent::User(data) => write!(f, "user({:?})", String::from_utf8_lossy(data)),
        }
    }
}

/// Producer side of the event queue.
#[derive(Clone, Debug)]
pub struct EventSink {
    sender: mpsc::UnboundedSender<ProxyEvent>,
}

impl EventSink {
    /// Queue an event. Fails once the receiver was dropped.
    pub fn send(&self, event: ProxyEvent) -> Result<()> {
        counter!("mapperproxy.events.emitted", "kind" => event.kind()).increment(1);
        self.sender
            .send(event)
            .map_err(|_| ProxyError::EventQueueClosed)
    }

    /// Check if the receiver was dropped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Consumer side of the event queue.
#[derive(Debug)]
pub struct EventReceiver {
    receiver: mpsc::UnboundedReceiver<ProxyEvent>,
}

impl EventReceiver {
    /// Wait for the next event. `None` once the session is over and the queue drained.
    pub async fn recv(&mut self) -> Option<ProxyEvent> {
        self.receiver.recv().await
    }

    /// Take the next event if one is ready.
    pub fn try_recv(&mut self) -> Option<ProxyEvent> {
        self.receiver.try_recv().ok()
    }
}

/// Create a connected sink and receiver
pub fn channel() -> (EventSink, EventReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (EventSink { sender }, EventReceiver { receiver })
}
