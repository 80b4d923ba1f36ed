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

use thiserror::Error;

/// Result Type for Decoder Operations
pub type DecoderResult<T> = Result<T, DecoderError>;

/// Errors surfaced by [`crate::ServerDecoder`].
///
/// Decoding itself never fails: malformed MPI headers and unexpected tags are recovered
/// locally. The only failures come from the transport the decoder is framed over.
#[derive(Debug, Error)]
pub enum DecoderError {
    /// An I/O error occurred while reading from the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecoderError {
    /// Kind of the underlying I/O error.
    pub fn io_kind(&self) -> std::io::ErrorKind {
        match self {
            DecoderError::Io(err) => err.kind(),
        }
    }
}
