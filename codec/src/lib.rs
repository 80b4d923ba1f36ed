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

//! # MapperProxy Stream Codec
//!
//! Decoder for the byte stream a MUD server sends to its players, as seen by an intercepting
//! proxy that feeds a mapper. One octet stream carries four protocols at once:
//!
//! - **Telnet**: `IAC` commands, option negotiation and subnegotiation, plus the one time
//!   charset handshake the proxy performs on the client's behalf.
//! - **MPI**: length prefixed remote editing frames introduced by `~$#E` at a line start.
//! - **XML mode**: `<room>`, `<name>`, `<prompt>`... tags describing what the text means.
//! - **Text**: everything else, shown to the player.
//!
//! [`ServerDecoder`] walks the stream one byte at a time and produces, for every read, a
//! [`DecodedChunk`] holding the bytes for the client (in the selected [`OutputFormat`]),
//! the replies for the server, the [`MudEvent`]s for the mapper and the complete
//! [`MpiFrame`]s for the editor. It implements [`tokio_util::codec::Decoder`] so it can be
//! driven through `FramedRead`.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use mapperproxy_codec::{Charset, OutputFormat, ServerDecoder};
//! use tokio::net::TcpStream;
//! use tokio_util::codec::FramedRead;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = TcpStream::connect("mume.org:4242").await?;
//! let decoder = ServerDecoder::new(OutputFormat::Normal, Charset::Utf8);
//! let mut frames = FramedRead::new(stream, decoder);
//! while let Some(chunk) = frames.next().await {
//!     for event in chunk?.events {
//!         println!("{event}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Splitting
//!
//! Every layer keeps its partial state between reads: a Telnet sequence, an MPI signature
//! or body, a tag, an XML entity or a pair of line feeds cut by a read boundary resumes on
//! the next read. The concatenation of all chunks is the same however the stream is split.

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
    clippy::missing_errors_doc,
    clippy::new_without_default
)]

mod charset;
pub mod consts;
mod decoder;
mod event;
mod mpi;
mod output;
mod result;
mod tags;
mod telnet;

pub use charset::{Charset, CharsetResponse, CharsetState};
pub use decoder::ServerDecoder;
pub use event::{DecodedChunk, MpiCommand, MpiFrame, MudEvent};
pub use output::{Normalizer, OutputFormat, escape_xml, script_marker, unescape_xml};
pub use result::{DecoderError, DecoderResult};
pub use tags::{XmlMode, movement_direction, tag_name};
