// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::fmt;

use crate::ngram::decode::percent_decode_in_place;

/// The set of bytes that separate tokens.
///
/// Internally a 256-entry table indexed by byte value, so the per-byte
/// predicate is a single table lookup. The textual form is canonical: it is
/// always rebuilt from the table in ascending byte order, with printable
/// ASCII emitted as itself and every other byte as `%XX`. An empty set
/// selects non-token (byte or bit) extraction.
#[derive(Clone, PartialEq, Eq)]
pub struct Delimiters {
    table: [bool; 256],
    text: String,
}

impl Delimiters {
    /// The empty set; selects non-token mode.
    pub fn empty() -> Delimiters {
        Delimiters {
            table: [false; 256],
            text: String::new(),
        }
    }

    /// Builds the set from a user-supplied, possibly percent-encoded string.
    pub fn from_spec(spec: &str) -> Delimiters {
        let mut raw = spec.as_bytes().to_vec();
        percent_decode_in_place(&mut raw);

        let mut table = [false; 256];
        for &b in &raw {
            table[usize::from(b)] = true;
        }
        Self::from_table(table)
    }

    /// Builds the set from a raw membership table.
    pub fn from_table(table: [bool; 256]) -> Delimiters {
        let mut text = String::new();
        for (i, &set) in table.iter().enumerate() {
            if !set {
                continue;
            }
            let b = i as u8;
            if (0x20..=0x7e).contains(&b) {
                text.push(char::from(b));
            } else {
                text.push_str(&format!("%{b:02X}"));
            }
        }
        Delimiters { table, text }
    }

    /// Whether no byte is a delimiter.
    pub fn is_empty(&self) -> bool {
        !self.table.iter().any(|&set| set)
    }

    /// Whether the given byte is a delimiter.
    pub fn contains(&self, byte: u8) -> bool {
        self.table[usize::from(byte)]
    }

    /// The canonical string form used by the model container.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The raw membership table.
    pub fn table(&self) -> &[bool; 256] {
        &self.table
    }

    /// The separator every delimiter run collapses to: the smallest member.
    pub fn canonical_separator(&self) -> Option<u8> {
        self.table
            .iter()
            .position(|&set| set)
            .map(|i| i as u8)
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Delimiters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Delimiters").field(&self.text).finish()
    }
}
