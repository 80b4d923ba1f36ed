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

//! Routing of client input between the game server and the mapper

use std::collections::HashSet;

/// Destination of a piece of client input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Queue it for the mapper as a user command.
    Mapper,
    /// Forward it to the game server unchanged.
    Server,
}

/// Sends input whose first word is a mapper command to the mapper, everything else to the
/// server.
#[derive(Clone, Debug, Default)]
pub struct UserCommandRouter {
    commands: HashSet<Vec<u8>>,
}

impl UserCommandRouter {
    /// Create a router recognizing the given command names
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            commands: commands
                .into_iter()
                .map(|command| command.as_ref().as_bytes().to_vec())
                .collect(),
        }
    }

    /// Check if `name` is a mapper command
    pub fn is_command(&self, name: &[u8]) -> bool {
        self.commands.contains(name)
    }

    /// Decide where `input` goes. Blank input goes to the server.
    pub fn route(&self, input: &[u8]) -> Route {
        match input
            .split(u8::is_ascii_whitespace)
            .find(|word| !word.is_empty())
        {
            Some(word) if self.is_command(word) => Route::Mapper,
            _ => Route::Server,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route() {
        let router = UserCommandRouter::new(["path", "rinfo"]);
        let cases: [(&[u8], Route); 8] = [
            (b"path 1234\r\n", Route::Mapper),
            (b"  rinfo\n", Route::Mapper),
            (b"rinfo", Route::Mapper),
            (b"pathfinder\r\n", Route::Server),
            (b"say path\r\n", Route::Server),
            (b"PATH\r\n", Route::Server),
            (b"\r\n", Route::Server),
            (b"", Route::Server),
        ];
        for (input, expected) in cases {
            assert_eq!(
                router.route(input),
                expected,
                "{:?}",
                String::from_utf8_lossy(input)
            );
        }
    }

    #[test]
    fn test_empty_router() {
        let router = UserCommandRouter::default();
        assert_eq!(router.route(b"path"), Route::Server);
    }
}
