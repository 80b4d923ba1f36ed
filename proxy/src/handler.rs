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

//! MPI handler traits
//!
//! Complete MPI frames are handed to an [`MpiHandler`], each in its own task. Running the
//! actual editor or pager is up to the implementation. It owns the rest of the exchange for
//! its frame: it writes to the player through the [`ClientWriter`] and answers the game
//! server through the [`ServerWriter`] it is given.

use crate::{ProxyError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use mapperproxy_codec::{MpiCommand, MpiFrame, OutputFormat};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Queue of bytes for the game server, drained by the session's client reader.
#[derive(Clone, Debug)]
pub struct ServerWriter {
    sender: mpsc::UnboundedSender<Bytes>,
}

impl ServerWriter {
    pub(crate) fn new(sender: mpsc::UnboundedSender<Bytes>) -> Self {
        Self { sender }
    }

    /// Queue `data` for the game server. Fails once the session is shutting down.
    pub fn send(&self, data: impl Into<Bytes>) -> Result<()> {
        self.sender
            .send(data.into())
            .map_err(|_| ProxyError::ConnectionClosed)
    }
}

/// Queue of bytes for the player's client, drained by the session's server decoder.
#[derive(Clone, Debug)]
pub struct ClientWriter {
    sender: mpsc::UnboundedSender<Bytes>,
}

impl ClientWriter {
    pub(crate) fn new(sender: mpsc::UnboundedSender<Bytes>) -> Self {
        Self { sender }
    }

    /// Queue `data` for the client. Fails once the session is shutting down.
    pub fn send(&self, data: impl Into<Bytes>) -> Result<()> {
        self.sender
            .send(data.into())
            .map_err(|_| ProxyError::ConnectionClosed)
    }
}

/// MPI handler trait
///
/// # Example
///
/// ```no_run
/// use mapperproxy::{ClientWriter, MpiHandler, OutputFormat, Result, ServerWriter};
/// use mapperproxy_codec::{MpiCommand, MpiFrame};
/// use async_trait::async_trait;
///
/// struct Pager;
///
/// #[async_trait]
/// impl MpiHandler for Pager {
///     async fn handle(
///         &self,
///         frame: MpiFrame,
///         client: ClientWriter,
///         _server: ServerWriter,
///         _format: OutputFormat,
///     ) -> Result<()> {
///         if frame.command == MpiCommand::View {
///             client.send(frame.data)?;
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait MpiHandler: Send + Sync + 'static {
    /// Called once per complete frame, concurrently with the rest of the session. `format`
    /// is the session's output format, for handlers that decorate what they show.
    async fn handle(
        &self,
        frame: MpiFrame,
        client: ClientWriter,
        server: ServerWriter,
        format: OutputFormat,
    ) -> Result<()>;
}

/// Handler that logs frames and discards them
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingMpiHandler;

#[async_trait]
impl MpiHandler for LoggingMpiHandler {
    async fn handle(
        &self,
        frame: MpiFrame,
        _client: ClientWriter,
        _server: ServerWriter,
        _format: OutputFormat,
    ) -> Result<()> {
        match frame.command {
            MpiCommand::Edit => info!(
                "Discarding remote edit session of {} bytes",
                frame.data.len()
            ),
            MpiCommand::View => info!(
                "Discarding remote view session of {} bytes",
                frame.data.len()
            ),
        }
        debug!("MPI data: {:?}", String::from_utf8_lossy(&frame.data));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_writer() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let writer = ServerWriter::new(sender);
        writer.send(&b"C\n"[..]).unwrap();
        assert_eq!(receiver.recv().await, Some(Bytes::from_static(b"C\n")));
        drop(receiver);
        assert!(matches!(
            writer.send(Bytes::new()),
            Err(ProxyError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_client_writer() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let writer = ClientWriter::new(sender);
        writer.send(&b"A note.\n"[..]).unwrap();
        assert_eq!(receiver.recv().await, Some(Bytes::from_static(b"A note.\n")));
        drop(receiver);
        assert!(matches!(
            writer.send(Bytes::new()),
            Err(ProxyError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_logging_handler() {
        let (sender, _receiver) = mpsc::unbounded_channel();
        let (client, _client_receiver) = mpsc::unbounded_channel();
        let frame = MpiFrame {
            command: MpiCommand::View,
            data: Bytes::from_static(b"A note."),
        };
        assert!(
            LoggingMpiHandler
                .handle(
                    frame,
                    ClientWriter::new(client),
                    ServerWriter::new(sender),
                    OutputFormat::Normal,
                )
                .await
                .is_ok()
        );
    }
}
