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

//! Proxy configuration

use crate::{ProxyError, Result};
use mapperproxy_codec::{Charset, OutputFormat};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Mapper commands recognized when no other list is configured.
pub const DEFAULT_USER_COMMANDS: &[&str] = &[
    "rinfo",
    "vnum",
    "tvnum",
    "rlabel",
    "getlabel",
    "run",
    "stop",
    "path",
    "sync",
    "savemap",
    "automap",
    "autoupdate",
    "autolink",
    "secretaction",
    "gettimer",
];

/// Proxy configuration
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Local address the player's client connects to
    pub listen_address: SocketAddr,

    /// Game server hostname or IP address
    pub remote_host: String,

    /// Game server port
    pub remote_port: u16,

    /// How the server stream is presented to the client
    pub output_format: OutputFormat,

    /// Charset requested from the server
    pub charset: Charset,

    /// First words of client input that belong to the mapper
    pub user_commands: Vec<String>,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Server read timeout (None for no timeout)
    pub read_timeout: Option<Duration>,

    /// Buffer size for incoming data
    pub buffer_size: usize,

    /// Disable Nagle's algorithm on both sockets
    pub nodelay: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 4000)),
            remote_host: "mume.org".to_string(),
            remote_port: 4242,
            output_format: OutputFormat::Normal,
            charset: Charset::Ascii,
            user_commands: DEFAULT_USER_COMMANDS
                .iter()
                .map(ToString::to_string)
                .collect(),
            connect_timeout: Duration::from_secs(10),
            read_timeout: None,
            buffer_size: 4096,
            nodelay: true,
        }
    }
}

impl ProxyConfig {
    /// Create a new proxy configuration for the given game server
    pub fn new(remote_host: impl Into<String>, remote_port: u16) -> Self {
        Self {
            remote_host: remote_host.into(),
            remote_port,
            ..Default::default()
        }
    }

    /// Set the local listen address
    pub fn with_listen_address(mut self, address: SocketAddr) -> Self {
        self.listen_address = address;
        self
    }

    /// Set the output format
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Set the requested charset
    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Replace the mapper command names
    pub fn with_user_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_commands = commands.into_iter().map(Into::into).collect();
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the read timeout
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the read buffer size
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Enable or disable `TCP_NODELAY`
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Get the game server address as a string
    pub fn remote_address(&self) -> String {
        format!("{}:{}", self.remote_host, self.remote_port)
    }

    /// Check that the configuration can be used to run a session
    pub fn validate(&self) -> Result<()> {
        if self.remote_host.trim().is_empty() {
            return Err(ProxyError::InvalidConfig(
                "remote host must not be empty".to_string(),
            ));
        }
        if self.remote_port == 0 {
            return Err(ProxyError::InvalidConfig(
                "remote port must not be zero".to_string(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(ProxyError::InvalidConfig(
                "buffer size must not be zero".to_string(),
            ));
        }
        if let Some(command) = self
            .user_commands
            .iter()
            .find(|command| command.is_empty() || command.contains(char::is_whitespace))
        {
            return Err(ProxyError::InvalidConfig(format!(
                "mapper command {command:?} must be a single word"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProxyConfig::default();
        assert_eq!(config.listen_address, "0.0.0.0:4000".parse().unwrap());
        assert_eq!(config.output_format, OutputFormat::Normal);
        assert_eq!(config.charset, Charset::Ascii);
        assert_eq!(config.read_timeout, None);
        assert!(config.user_commands.iter().any(|command| command == "rinfo"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = ProxyConfig::new("localhost", 4242)
            .with_output_format(OutputFormat::Raw)
            .with_charset(Charset::Utf8)
            .with_user_commands(["path", "run"])
            .with_read_timeout(Some(Duration::from_secs(30)))
            .with_buffer_size(1024);
        assert_eq!(config.remote_address(), "localhost:4242");
        assert_eq!(config.output_format, OutputFormat::Raw);
        assert_eq!(config.charset, Charset::Utf8);
        assert_eq!(config.user_commands, vec!["path", "run"]);
        assert_eq!(config.read_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.buffer_size, 1024);
    }

    #[test]
    fn test_validate() {
        assert!(ProxyConfig::new("", 4242).validate().is_err());
        assert!(ProxyConfig::new("localhost", 0).validate().is_err());
        assert!(
            ProxyConfig::default()
                .with_buffer_size(0)
                .validate()
                .is_err()
        );
        assert!(
            ProxyConfig::default()
                .with_user_commands(["two words"])
                .validate()
                .is_err()
        );
    }
}
