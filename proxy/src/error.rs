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

//! Proxy error types

use mapperproxy_codec::DecoderError;
use thiserror::Error;

/// Result type for proxy operations
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Proxy error types
#[derive(Debug, Error)]
pub enum ProxyError {
    /// I/O error on the client or server socket
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the server stream decoder
    #[error("Codec error: {0}")]
    Codec(#[from] DecoderError),

    /// The game server did not accept the connection in time
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// No data arrived from the game server within the read timeout
    #[error("Read timeout")]
    ReadTimeout,

    /// A peer went away while data was still being sent
    #[error("Connection closed")]
    ConnectionClosed,

    /// The configuration can't be used
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The mapper dropped its end of the event queue
    #[error("Event queue closed")]
    EventQueueClosed,

    /// A session task panicked or was aborted
    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ProxyError {
    /// Check if the error comes from one of the sockets, which ends the session
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ProxyError::Io(_)
                | ProxyError::Codec(_)
                | ProxyError::ConnectionTimeout
                | ProxyError::ReadTimeout
                | ProxyError::ConnectionClosed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_transport() {
        assert!(ProxyError::ReadTimeout.is_transport());
        assert!(ProxyError::ConnectionClosed.is_transport());
        assert!(ProxyError::from(std::io::Error::other("reset")).is_transport());
        assert!(!ProxyError::EventQueueClosed.is_transport());
        assert!(!ProxyError::InvalidConfig("port".to_string()).is_transport());
    }

    #[test]
    fn test_error_display() {
        let err = ProxyError::InvalidConfig("buffer size must not be zero".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: buffer size must not be zero"
        );
        assert_eq!(ProxyError::EventQueueClosed.to_string(), "Event queue closed");
    }

    #[test]
    fn test_codec_error_conversion() {
        let err = ProxyError::from(DecoderError::from(std::io::Error::other("boom")));
        assert!(matches!(err, ProxyError::Codec(_)));
        assert_eq!(err.to_string(), "Codec error: I/O error: boom");
    }
}
