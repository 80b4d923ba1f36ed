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

//! Proxy session
//!
//! A session joins one player's client to the game server with two contexts:
//!
//! - the **client reader** reads the player's input, routes mapper commands to the event
//!   queue and writes everything else to the server. It is the only writer of the server
//!   socket, so replies produced elsewhere reach it through a channel.
//! - the **server decoder** runs the server stream through [`ServerDecoder`], queues
//!   negotiation replies, events and MPI frames, and writes the cleaned output to the client.
//!   It is the only writer of the client socket, so MPI handlers reach the client through a
//!   channel it drains.
//!
//! Either context ending cancels the session's [`CancellationToken`], which stops the other at
//! its next await point.

use crate::commands::{Route, UserCommandRouter};
use crate::events::{EventSink, ProxyEvent};
use crate::handler::{ClientWriter, MpiHandler, ServerWriter};
use crate::{ProxyConfig, ProxyError, Result};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use mapperproxy_codec::{DecodedChunk, OutputFormat, ServerDecoder};
use metrics::{counter, gauge};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, instrument, trace, warn};

/// One proxied connection
pub struct ProxySession {
    config: ProxyConfig,
    handler: Arc<dyn MpiHandler>,
    events: EventSink,
    token: CancellationToken,
}

impl ProxySession {
    /// Create a session that queues events on `events` and hands MPI frames to `handler`
    pub fn new(config: ProxyConfig, handler: Arc<dyn MpiHandler>, events: EventSink) -> Self {
        Self {
            config,
            handler,
            events,
            token: CancellationToken::new(),
        }
    }

    /// End the session when `shutdown` is cancelled
    pub fn with_shutdown(mut self, shutdown: &CancellationToken) -> Self {
        self.token = shutdown.child_token();
        self
    }

    /// Token that ends the session when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Run the session until either side closes or fails.
    ///
    /// On return both contexts and all MPI handler tasks have finished, the client got a
    /// final `\r\n`, and this session's event sinks are dropped.
    #[instrument(name = "session", skip_all, fields(remote = %self.config.remote_address()))]
    pub async fn run<C, S>(self, client: C, server: S) -> Result<()>
    where
        C: AsyncRead + AsyncWrite + Send + 'static,
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let ProxySession {
            config,
            handler,
            events,
            token,
        } = self;
        let (client_reader, mut client_writer) = tokio::io::split(client);
        let (server_reader, server_writer) = tokio::io::split(server);
        let (reply_sender, reply_receiver) = mpsc::unbounded_channel();
        let (pager_sender, pager_receiver) = mpsc::unbounded_channel();

        counter!("mapperproxy.sessions.total").increment(1);
        gauge!("mapperproxy.sessions.active").increment(1.0);
        info!(
            "Session started, output format {}, charset {}",
            config.output_format, config.charset
        );

        let input = ClientInput {
            router: UserCommandRouter::new(&config.user_commands),
            events: events.clone(),
            token: token.clone(),
            buffer_size: config.buffer_size,
        };
        let reader = tokio::spawn(
            input
                .run(client_reader, server_writer, reply_receiver)
                .instrument(info_span!("client_reader")),
        );

        let frames = FramedRead::with_capacity(
            server_reader,
            ServerDecoder::new(config.output_format, config.charset),
            config.buffer_size,
        );
        let output = ServerOutput {
            handler,
            events,
            token: token.clone(),
            read_timeout: config.read_timeout,
            format: config.output_format,
            pager: ClientWriter::new(pager_sender),
            server: ServerWriter::new(reply_sender),
        };
        let decoded = output
            .run(frames, &mut client_writer, pager_receiver)
            .instrument(info_span!("server_decoder"))
            .await;

        token.cancel();
        let read = reader.await.unwrap_or_else(|error| Err(error.into()));

        if let Err(error) = write_flush(&mut client_writer, b"\r\n").await {
            debug!("Unable to end the client's last line: {}", error);
        }
        if let Err(error) = client_writer.shutdown().await {
            debug!("Unable to shut down the client socket: {}", error);
        }
        gauge!("mapperproxy.sessions.active").decrement(1.0);

        if let Err(error) = &decoded {
            error!("Server side of the session failed: {}", error);
        }
        if let Err(error) = &read {
            error!("Client side of the session failed: {}", error);
        }
        info!("Session ended");
        decoded.and(read)
    }
}

struct ClientInput {
    router: UserCommandRouter,
    events: EventSink,
    token: CancellationToken,
    buffer_size: usize,
}

impl ClientInput {
    async fn run<R, W>(
        self,
        mut client: R,
        mut server: W,
        mut replies: mpsc::UnboundedReceiver<Bytes>,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buffer = BytesMut::with_capacity(self.buffer_size);
        let mut replies_open = true;
        let result = loop {
            buffer.reserve(self.buffer_size);
            tokio::select! {
                biased;
                () = self.token.cancelled() => break Ok(()),
                reply = replies.recv(), if replies_open => match reply {
                    Some(data) => {
                        trace!("Sending {} bytes of negotiation to the server", data.len());
                        if let Err(error) = write_flush(&mut server, &data).await {
                            break Err(error.into());
                        }
                    }
                    None => replies_open = false,
                },
                read = client.read_buf(&mut buffer) => match read {
                    Ok(0) => {
                        info!("Client closed the connection");
                        break Ok(());
                    }
                    Ok(count) => {
                        counter!("mapperproxy.client.bytes_read").increment(count as u64);
                        let input = buffer.split().freeze();
                        if let Err(error) = self.route(input, &mut server).await {
                            break Err(error);
                        }
                    }
                    Err(error) => break Err(error.into()),
                },
            }
        };
        self.token.cancel();
        if let Err(error) = server.shutdown().await {
            debug!("Unable to shut down the server socket: {}", error);
        }
        result
    }

    async fn route<W>(&self, input: Bytes, server: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        match self.router.route(&input) {
            Route::Mapper => {
                debug!("User command {:?}", String::from_utf8_lossy(&input));
                self.events.send(ProxyEvent::User(input))
            }
            Route::Server => Ok(write_flush(server, &input).await?),
        }
    }
}

struct ServerOutput {
    handler: Arc<dyn MpiHandler>,
    events: EventSink,
    token: CancellationToken,
    read_timeout: Option<Duration>,
    format: OutputFormat,
    pager: ClientWriter,
    server: ServerWriter,
}

impl ServerOutput {
    async fn run<R, W>(
        self,
        mut frames: FramedRead<R, ServerDecoder>,
        client: &mut W,
        mut pager: mpsc::UnboundedReceiver<Bytes>,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut handlers = JoinSet::new();
        let result = loop {
            let next = tokio::select! {
                () = self.token.cancelled() => break Ok(()),
                Some(data) = pager.recv() => {
                    if let Err(error) = write_flush(client, &data).await {
                        break Err(error.into());
                    }
                    continue;
                }
                next = with_timeout(frames.next(), self.read_timeout) => next,
            };
            let chunk = match next {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(Some(Err(error))) => break Err(error.into()),
                Ok(None) => {
                    info!("Server closed the connection");
                    break Ok(());
                }
                Err(error) => break Err(error),
            };
            if let Err(error) = self.dispatch(chunk, client, &mut handlers).await {
                break Err(error);
            }
        };
        self.token.cancel();
        while let Some(joined) = handlers.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(error)) => warn!("MPI handler failed: {}", error),
                Err(error) => warn!("MPI handler task failed: {}", error),
            }
        }
        while let Ok(data) = pager.try_recv() {
            if let Err(error) = write_flush(client, &data).await {
                debug!("Unable to write MPI handler output to the client: {}", error);
                break;
            }
        }
        result
    }

    async fn dispatch<W>(
        &self,
        chunk: DecodedChunk,
        client: &mut W,
        handlers: &mut JoinSet<Result<()>>,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        counter!("mapperproxy.server.bytes_read").increment(chunk.consumed as u64);
        if !chunk.server.is_empty() && self.server.send(chunk.server.freeze()).is_err() {
            debug!("Client reader is gone, dropping negotiation reply");
        }
        for event in chunk.events {
            trace!("Event {}", event);
            self.events.send(ProxyEvent::Mud(event))?;
        }
        for frame in chunk.frames {
            counter!("mapperproxy.mpi.frames").increment(1);
            let handler = self.handler.clone();
            let pager = self.pager.clone();
            let server = self.server.clone();
            let format = self.format;
            handlers.spawn(
                async move { handler.handle(frame, pager, server, format).await }
                    .instrument(info_span!("mpi_handler")),
            );
        }
        if !chunk.client.is_empty() {
            counter!("mapperproxy.client.bytes_written").increment(chunk.client.len() as u64);
            write_flush(client, &chunk.client).await?;
        }
        Ok(())
    }
}

async fn with_timeout<F: Future>(future: F, timeout: Option<Duration>) -> Result<F::Output> {
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, future)
            .await
            .map_err(|_| ProxyError::ReadTimeout),
        None => Ok(future.await),
    }
}

async fn write_flush<W>(writer: &mut W, data: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(data).await?;
    writer.flush().await
}
