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

use clap::Parser;
use mapperproxy::{
    Charset, DEFAULT_USER_COMMANDS, EventReceiver, LoggingMpiHandler, OutputFormat,
    ProxyConfig, ProxyListener, events,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Arguments {
    #[arg(
        short = 'l',
        long = "listen",
        env = "MAPPERPROXY_LISTEN",
        help = "Local address the MUD client connects to",
        default_value = "0.0.0.0:4000"
    )]
    listen: SocketAddr,

    #[arg(
        long = "host",
        env = "MAPPERPROXY_HOST",
        help = "Game server host",
        default_value = "mume.org"
    )]
    host: String,

    #[arg(
        short = 'p',
        long = "port",
        env = "MAPPERPROXY_PORT",
        help = "Game server port",
        default_value_t = 4242
    )]
    port: u16,

    #[arg(
        short = 'f',
        long = "format",
        env = "MAPPERPROXY_FORMAT",
        help = "Output format: normal, tintin or raw",
        default_value = "normal"
    )]
    format: OutputFormat,

    #[arg(
        short = 'c',
        long = "charset",
        env = "MAPPERPROXY_CHARSET",
        help = "Charset to request: ascii, latin-1 or utf-8",
        default_value = "ascii"
    )]
    charset: Charset,

    #[arg(
        long = "command",
        env = "MAPPERPROXY_COMMANDS",
        help = "Mapper command names, replacing the built in list",
        value_delimiter = ','
    )]
    commands: Vec<String>,

    #[arg(
        long = "connect-timeout",
        help = "Seconds to wait for the game server to accept the connection",
        default_value_t = 10
    )]
    connect_timeout: u64,

    #[arg(
        long = "read-timeout",
        help = "Seconds of server silence that end the session"
    )]
    read_timeout: Option<u64>,
}

impl Arguments {
    fn into_config(self) -> ProxyConfig {
        let commands = if self.commands.is_empty() {
            DEFAULT_USER_COMMANDS.iter().map(ToString::to_string).collect()
        } else {
            self.commands
        };
        ProxyConfig::new(self.host, self.port)
            .with_listen_address(self.listen)
            .with_output_format(self.format)
            .with_charset(self.charset)
            .with_user_commands(commands)
            .with_connect_timeout(Duration::from_secs(self.connect_timeout))
            .with_read_timeout(self.read_timeout.map(Duration::from_secs))
    }
}

/// Stands in for the mapper: logs every event until the session ends.
async fn log_events(mut receiver: EventReceiver) {
    while let Some(event) = receiver.recv().await {
        info!(target: "mapper", "{}", event);
    }
    info!(target: "mapper", "Event queue closed");
}

#[tokio::main]
async fn main() {
    let arguments = Arguments::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .with_ansi(true)
        .init();

    let config = arguments.into_config();
    let listener = match ProxyListener::bind(config).await {
        Ok(listener) => listener,
        Err(error) => {
            error!("Unable to start the proxy: {}", error);
            std::process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
            signal.cancel();
        }
    });

    let (sink, receiver) = events::channel();
    let mapper = tokio::spawn(log_events(receiver));
    let result = listener
        .serve(Arc::new(LoggingMpiHandler), sink, shutdown)
        .await;
    if let Err(error) = mapper.await {
        error!("Mapper task failed: {}", error);
    }
    if let Err(error) = result {
        error!("Proxy stopped: {}", error);
        std::process::exit(1);
    }
}
