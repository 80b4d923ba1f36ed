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

//! Proxy listener
//!
//! Waits for the player's client on the local port, connects to the game server and runs a
//! single [`ProxySession`] between them.

use crate::events::EventSink;
use crate::handler::MpiHandler;
use crate::{ProxyConfig, ProxyError, ProxySession, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const CONNECT_TIMEOUT_MESSAGE: &[u8] = b"\r\nError: server connection timed out!\r\n\r\n";

/// Listener for the player's client
pub struct ProxyListener {
    config: ProxyConfig,
    listener: TcpListener,
    local_address: SocketAddr,
}

impl ProxyListener {
    /// Bind to the configured listen address
    pub async fn bind(config: ProxyConfig) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(config.listen_address).await?;
        let local_address = listener.local_addr()?;
        info!("Waiting for a client on {}", local_address);
        Ok(Self {
            config,
            listener,
            local_address,
        })
    }

    /// Get the address the listener is bound to
    pub fn local_address(&self) -> SocketAddr {
        self.local_address
    }

    /// Get the proxy configuration
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Accept one client, connect it to the game server and proxy until the session ends.
    ///
    /// Cancelling `shutdown` stops waiting for the client, or ends the running session.
    pub async fn serve(
        self,
        handler: Arc<dyn MpiHandler>,
        events: EventSink,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let (mut client, peer) = tokio::select! {
            () = shutdown.cancelled() => {
                info!("Shutdown before a client connected");
                return Ok(());
            }
            accepted = self.listener.accept() => accepted?,
        };
        client.set_nodelay(self.config.nodelay)?;
        info!("Client connected from {}", peer);

        let server = match connect(&self.config).await {
            Ok(server) => server,
            Err(ProxyError::ConnectionTimeout) => {
                if let Err(error) = client.write_all(CONNECT_TIMEOUT_MESSAGE).await {
                    debug!("Unable to tell the client about the timeout: {}", error);
                }
                if let Err(error) = client.shutdown().await {
                    debug!("Unable to shut down the client socket: {}", error);
                }
                return Err(ProxyError::ConnectionTimeout);
            }
            Err(error) => return Err(error),
        };

        ProxySession::new(self.config, handler, events)
            .with_shutdown(&shutdown)
            .run(client, server)
            .await
    }
}

/// Connect to the configured game server within the connect timeout
pub async fn connect(config: &ProxyConfig) -> Result<TcpStream> {
    let address = config.remote_address();
    info!("Connecting to {}...", address);

    let stream = match timeout(config.connect_timeout, TcpStream::connect(&address)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(error)) => return Err(error.into()),
        Err(_) => return Err(ProxyError::ConnectionTimeout),
    };
    stream.set_nodelay(config.nodelay)?;

    info!("Connected to {}", stream.peer_addr()?);
    Ok(stream)
}
