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

fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}

/// Decodes percent-encoded bytes (`%HH`) in place, shrinking the buffer.
///
/// A `%` followed by two hex digits becomes the single byte they encode.
/// A `%` followed by anything else is copied verbatim together with the two
/// bytes after it; a `%` with fewer than two bytes remaining is copied
/// verbatim to the end. This lets arbitrary binary payloads travel through
/// line-oriented input and delimiter specifications.
pub fn percent_decode_in_place(buf: &mut Vec<u8>) {
    let len = buf.len();
    let mut i = 0;
    let mut j = 0;

    while i < len {
        if buf[i] != b'%' {
            buf[j] = buf[i];
            i += 1;
            j += 1;
            continue;
        }

        // Truncated escape at the end of the buffer stays as-is.
        if len - i <= 2 {
            while i < len {
                buf[j] = buf[i];
                i += 1;
                j += 1;
            }
            break;
        }

        let hi = buf[i + 1];
        let lo = buf[i + 2];
        if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() {
            buf[j] = (hex_value(hi) << 4) | hex_value(lo);
            j += 1;
        } else {
            buf[j] = b'%';
            buf[j + 1] = hi;
            buf[j + 2] = lo;
            j += 3;
        }
        i += 3;
    }

    buf.truncate(j);
}
