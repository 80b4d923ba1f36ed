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

//! Listener tests over loopback TCP

use mapperproxy::{
    LoggingMpiHandler, ProxyConfig, ProxyError, ProxyEvent, ProxyListener, connect, events,
};
use mapperproxy_codec::MudEvent;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Duration, timeout};
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

/// Helper to build a config pointing at a local game server
fn local_config(server: &TcpListener) -> ProxyConfig {
    let address = server.local_addr().unwrap();
    ProxyConfig::new(address.ip().to_string(), address.port())
        .with_listen_address("127.0.0.1:0".parse().unwrap())
}

#[tokio::test]
async fn test_proxy_end_to_end() {
    let game = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let listener = ProxyListener::bind(local_config(&game)).await.unwrap();
    let proxy_address = listener.local_address();
    let (sink, mut receiver) = events::channel();
    let shutdown = CancellationToken::new();
    let proxy = tokio::spawn(listener.serve(Arc::new(LoggingMpiHandler), sink, shutdown));

    let mut client = TcpStream::connect(proxy_address).await.unwrap();
    let (mut server, _) = timeout(WAIT, game.accept()).await.unwrap().unwrap();

    server
        .write_all(b"<exits>Exits: north.</exits>\n")
        .await
        .unwrap();
    let mut line = [0u8; 14];
    timeout(WAIT, client.read_exact(&mut line))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&line, b"Exits: north.\n");

    client.write_all(b"look\n").await.unwrap();
    let mut command = [0u8; 5];
    timeout(WAIT, server.read_exact(&mut command))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&command, b"look\n");

    drop(server);
    assert!(timeout(WAIT, proxy).await.unwrap().unwrap().is_ok());

    let event = receiver.recv().await;
    assert!(matches!(
        event,
        Some(ProxyEvent::Mud(MudEvent::Exits(ref text))) if &text[..] == b"Exits: north."
    ));
}

#[tokio::test]
async fn test_shutdown_before_client() {
    let game = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let listener = ProxyListener::bind(local_config(&game)).await.unwrap();
    let (sink, _receiver) = events::channel();
    let shutdown = CancellationToken::new();
    let proxy = tokio::spawn(listener.serve(
        Arc::new(LoggingMpiHandler),
        sink,
        shutdown.clone(),
    ));

    shutdown.cancel();
    assert!(timeout(WAIT, proxy).await.unwrap().unwrap().is_ok());
}

#[tokio::test]
async fn test_bind_rejects_invalid_config() {
    let result = ProxyListener::bind(ProxyConfig::new("", 4242)).await;
    assert!(matches!(result, Err(ProxyError::InvalidConfig(_))));
}

#[tokio::test]
async fn test_connect_sets_up_stream() {
    let game = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let stream = connect(&local_config(&game)).await.unwrap();
    assert!(stream.nodelay().unwrap());
    assert_eq!(stream.peer_addr().unwrap(), game.local_addr().unwrap());
}
