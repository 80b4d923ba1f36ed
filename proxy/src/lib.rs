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

//! # MapperProxy
//!
//! An intercepting proxy between a MUD client and the game server. The server's stream is
//! decoded by [`mapperproxy_codec::ServerDecoder`]: the client gets a cleaned stream in the
//! configured [`OutputFormat`], and the mapper gets the room, exit, prompt and movement
//! events through an [`EventReceiver`]. Client input starting with a mapper command is queued
//! for the mapper instead of reaching the server.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use mapperproxy::{LoggingMpiHandler, ProxyConfig, ProxyListener, events};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> mapperproxy::Result<()> {
//! let config = ProxyConfig::new("mume.org", 4242);
//! let (sink, mut receiver) = events::channel();
//! tokio::spawn(async move {
//!     while let Some(event) = receiver.recv().await {
//!         println!("{event}");
//!     }
//! });
//! let listener = ProxyListener::bind(config).await?;
//! listener
//!     .serve(Arc::new(LoggingMpiHandler), sink, CancellationToken::new())
//!     .await
//! # }
//! ```

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

mod commands;
mod config;
mod error;
pub mod events;
mod handler;
mod listener;
mod session;

pub use commands::{Route, UserCommandRouter};
pub use config::{DEFAULT_USER_COMMANDS, ProxyConfig};
pub use error::{ProxyError, Result};
pub use events::{EventReceiver, EventSink, ProxyEvent};
pub use handler::{ClientWriter, LoggingMpiHandler, MpiHandler, ServerWriter};
pub use listener::{ProxyListener, connect};
pub use mapperproxy_codec::{Charset, OutputFormat};
pub use session::ProxySession;
