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

//! Model persistence.
//!
//! Two self-describing shapes share one opaque payload. The *text container*
//! is a single stream: a `Salad Configuration` header, `key = value` lines
//! for the extraction parameters, and the filter block inline. The
//! *packaged container* is a ZIP archive holding the same configuration in a
//! `config` member and the filter block in `bloom.data`. The reader
//! dispatches on the archive magic, falls back to the text form, and finally
//! to the legacy pre-container layout, so historical models stay loadable.
//!
//! The opaque filter block is, in order: one byte holding the number of
//! hashes, that many hash ordinals, the filter's bitsize as a 64-bit
//! little-endian word, and the filter's byte array.
//!
//! # Usage
//!
//! ```rust
//! use salad::container::ContainerFormat;
//! use salad::container::read_model;
//! use salad::container::write_model;
//! use salad::hash::HashSetId;
//! use salad::model::Model;
//!
//! let mut model = Model::new(1 << 16, HashSetId::Simple, 3, false, "")?;
//! model.train(b"abcabc");
//!
//! let bytes = write_model(&model, ContainerFormat::Text);
//! let reloaded = read_model(&bytes)?;
//! assert!(!Model::specs_differ(&model, &reloaded));
//! # Ok::<(), salad::error::Error>(())
//! ```

mod codec;
mod zip;

use std::path::Path;

use crate::bloom::BloomFilter;
use crate::container::codec::ModelBytes;
use crate::container::codec::ModelSlice;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::hash::HashId;
use crate::hash::HashSetId;
use crate::model::Model;
use crate::ngram::Delimiters;

/// First line of every configuration stream.
const CONFIG_HEADER: &str = "Salad Configuration";
/// Name of the configuration member inside the packaged container.
const CONFIG_MEMBER: &str = "config";
/// Name of the filter member inside the packaged container.
const BLOOM_MEMBER: &str = "bloom.data";

/// The serialization shape to produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerFormat {
    /// Single text stream with the filter block inline.
    Text,
    /// ZIP archive with `config` and `bloom.data` members.
    Packaged,
}

// ============================================================================
// Writing
// ============================================================================

/// Serializes a model in the requested shape.
pub fn write_model(model: &Model, format: ContainerFormat) -> Vec<u8> {
    match format {
        ContainerFormat::Text => write_model_text(model),
        ContainerFormat::Packaged => write_model_packaged(model),
    }
}

/// Serializes a model into a file.
pub fn write_model_to_path(
    path: impl AsRef<Path>,
    model: &Model,
    format: ContainerFormat,
) -> Result<(), Error> {
    let path = path.as_ref();
    std::fs::write(path, write_model(model, format)).map_err(|err| {
        Error::new(ErrorKind::Io, format!("cannot write {}", path.display())).set_source(err)
    })
}

fn write_header(out: &mut ModelBytes, model: &Model) {
    out.write(CONFIG_HEADER.as_bytes());
    out.write(b"\n\n");
    out.write(format!("binary = {}\n", if model.binary() { "True" } else { "False" }).as_bytes());
    out.write(format!("delimiter = {}\n", model.delimiters().text()).as_bytes());
    out.write(format!("n = {}\n", model.ngram_len()).as_bytes());
}

fn opaque_block(filter: &BloomFilter) -> Vec<u8> {
    let mut out = ModelBytes::with_capacity(1 + filter.hashes().len() + 8 + filter.num_bytes());
    out.write_u8(filter.hashes().len() as u8);
    for &id in filter.hashes() {
        out.write_u8(id.ordinal());
    }
    out.write_u64_le(filter.bitsize());
    out.write(filter.as_bytes());
    out.into_bytes()
}

fn write_model_text(model: &Model) -> Vec<u8> {
    let block = opaque_block(model.filter());

    let mut out = ModelBytes::with_capacity(block.len() + 128);
    write_header(&mut out, model);
    out.write(format!("bloom_filter = {}\n", block.len()).as_bytes());
    out.write(&block);
    out.write(b"\n");
    out.into_bytes()
}

fn write_model_packaged(model: &Model) -> Vec<u8> {
    let mut config = ModelBytes::new();
    write_header(&mut config, model);
    config.write(format!("bloom_filter = {BLOOM_MEMBER}\n").as_bytes());

    zip::write_archive(&[
        zip::Entry {
            name: CONFIG_MEMBER.to_string(),
            data: config.into_bytes(),
        },
        zip::Entry {
            name: BLOOM_MEMBER.to_string(),
            data: opaque_block(model.filter()),
        },
    ])
}

// ============================================================================
// Reading
// ============================================================================

/// Deserializes a model from any of the three container shapes.
///
/// The shape is recognized from the stream itself: the ZIP magic selects the
/// packaged reader, the configuration header selects the text reader, and
/// anything else is attempted as the legacy pre-container layout.
pub fn read_model(bytes: &[u8]) -> Result<Model, Error> {
    if bytes.starts_with(b"PK") {
        return read_model_packaged(bytes);
    }
    if has_config_header(bytes) {
        return read_model_text(bytes);
    }
    read_model_legacy(bytes).map_err(|err| {
        Error::unknown_container("neither a packaged, text nor legacy model stream")
            .set_source(anyhow::Error::new(err))
    })
}

/// Deserializes a model from a file.
pub fn read_model_from_path(path: impl AsRef<Path>) -> Result<Model, Error> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|err| {
        Error::new(ErrorKind::Io, format!("cannot open {}", path.display())).set_source(err)
    })?;
    read_model(&bytes)
}

/// Line scanner over a byte stream whose tail may be binary.
struct LineScanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> LineScanner<'a> {
    fn new(bytes: &'a [u8]) -> LineScanner<'a> {
        LineScanner { bytes, pos: 0 }
    }

    /// Next raw line without its terminator; `None` at end of stream.
    fn next_line(&mut self) -> Option<&'a [u8]> {
        if self.pos >= self.bytes.len() {
            return None;
        }
        let rest = &self.bytes[self.pos..];
        match rest.iter().position(|&b| b == b'\n') {
            Some(i) => {
                self.pos += i + 1;
                Some(&rest[..i])
            }
            None => {
                self.pos = self.bytes.len();
                Some(rest)
            }
        }
    }

    /// Next trimmed line that is neither empty nor a `#` comment.
    fn next_significant_line(&mut self) -> Option<&'a [u8]> {
        loop {
            let line = trim(self.next_line()?);
            if line.is_empty() || line[0] == b'#' {
                continue;
            }
            return Some(line);
        }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        if end > self.bytes.len() {
            return None;
        }
        let taken = &self.bytes[self.pos..end];
        self.pos = end;
        Some(taken)
    }
}

fn trim(line: &[u8]) -> &[u8] {
    let start = line
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &line[start..end]
}

fn has_config_header(bytes: &[u8]) -> bool {
    let mut scanner = LineScanner::new(bytes);
    scanner
        .next_significant_line()
        .is_some_and(|line| line.eq_ignore_ascii_case(CONFIG_HEADER.as_bytes()))
}

/// How a configuration stream references its filter block.
enum BloomRef {
    Inline(BloomFilter),
    Member(String),
}

/// Parameters collected from one configuration stream.
struct ConfigSpec {
    binary: bool,
    delimiters: Delimiters,
    ngram_len: Option<usize>,
    bloom: Option<BloomRef>,
}

fn parse_config(bytes: &[u8], allow_member_ref: bool) -> Result<ConfigSpec, Error> {
    let mut scanner = LineScanner::new(bytes);
    let header = scanner
        .next_significant_line()
        .ok_or_else(|| Error::corrupt_header("empty configuration stream"))?;
    if !header.eq_ignore_ascii_case(CONFIG_HEADER.as_bytes()) {
        return Err(Error::corrupt_header("missing configuration header"));
    }

    let mut spec = ConfigSpec {
        binary: false,
        delimiters: Delimiters::empty(),
        ngram_len: None,
        bloom: None,
    };

    while let Some(line) = scanner.next_significant_line() {
        let eq = line
            .iter()
            .position(|&b| b == b'=')
            .ok_or_else(|| Error::corrupt_header("expected a key = value line"))?;
        let key = trim(&line[..eq]);
        let value = trim(&line[eq + 1..]);

        match key {
            b"binary" => spec.binary = parse_bool(value),
            b"delimiter" => {
                let text = std::str::from_utf8(value)
                    .map_err(|_| Error::corrupt_header("delimiter is not valid UTF-8"))?;
                spec.delimiters = Delimiters::from_spec(text);
            }
            b"n" => {
                let n = parse_decimal(value)
                    .ok_or_else(|| Error::corrupt_header("n is not a decimal number"))?;
                spec.ngram_len = Some(n as usize);
            }
            b"bloom_filter" => {
                spec.bloom = Some(parse_bloom_value(value, &mut scanner, allow_member_ref)?);
            }
            _ => {
                return Err(Error::corrupt_header(format!(
                    "unknown identifier '{}'",
                    String::from_utf8_lossy(key)
                )));
            }
        }
    }

    Ok(spec)
}

fn parse_bool(value: &[u8]) -> bool {
    if let Some(n) = parse_decimal(value) {
        return n != 0;
    }
    value.eq_ignore_ascii_case(b"true")
}

fn parse_decimal(value: &[u8]) -> Option<u64> {
    if value.is_empty() || !value.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(value).ok()?.parse().ok()
}

/// Interprets the `bloom_filter` value and, for the inline forms, consumes
/// the filter block that follows the line.
fn parse_bloom_value(
    value: &[u8],
    scanner: &mut LineScanner<'_>,
    allow_member_ref: bool,
) -> Result<BloomRef, Error> {
    if let Some(count) = parse_decimal(value) {
        // Byte-count form: the opaque block follows the line verbatim.
        let block = scanner
            .take(count as usize)
            .ok_or_else(|| Error::truncated_payload("inline filter block"))?;
        let mut slice = ModelSlice::new(block);
        let filter = parse_opaque_block(&mut slice)?;
        return Ok(BloomRef::Inline(filter));
    }

    if let Some(digits) = value.strip_suffix(b"raw") {
        if let Some(bitsize) = parse_decimal(trim(digits)) {
            // Raw form: bare filter bytes, byte count derived from the
            // bitsize. The format carries no hash binding; the default
            // pack applies.
            if bitsize == 0 {
                return Err(Error::corrupt_header("filter bitsize is zero"));
            }
            let num_bytes = bitsize.div_ceil(8) as usize;
            let bits = scanner
                .take(num_bytes)
                .ok_or_else(|| Error::truncated_payload("raw filter bytes"))?;
            let filter =
                BloomFilter::from_parts(bitsize, bits.to_vec(), HashSetId::Simple.ids().to_vec())?;
            return Ok(BloomRef::Inline(filter));
        }
    }

    if allow_member_ref {
        let name = std::str::from_utf8(value)
            .map_err(|_| Error::corrupt_header("member name is not valid UTF-8"))?;
        return Ok(BloomRef::Member(name.to_string()));
    }
    Err(Error::corrupt_header(
        "bloom_filter must be an inline block in a text container",
    ))
}

/// Parses the opaque filter block: hash count, hash ordinals, bitsize as a
/// 64-bit little-endian word, then the filter bytes.
fn parse_opaque_block(slice: &mut ModelSlice<'_>) -> Result<BloomFilter, Error> {
    let num_hashes = slice
        .read_u8()
        .map_err(|_| Error::truncated_payload("hash count"))?;

    let mut hashes = Vec::with_capacity(usize::from(num_hashes));
    for _ in 0..num_hashes {
        let ordinal = slice
            .read_u8()
            .map_err(|_| Error::truncated_payload("hash identifier"))?;
        let id = HashId::from_ordinal(ordinal).ok_or_else(|| Error::unknown_hash(ordinal))?;
        hashes.push(id);
    }

    let bitsize = slice
        .read_u64_le()
        .map_err(|_| Error::truncated_payload("filter bitsize"))?;
    if bitsize == 0 {
        return Err(Error::corrupt_header("filter bitsize is zero"));
    }
    let num_bytes = usize::try_from(bitsize.div_ceil(8))
        .map_err(|_| Error::corrupt_header("filter bitsize exceeds the address space"))?;
    if num_bytes > slice.remaining() {
        return Err(Error::truncated_payload(format!(
            "filter bytes: {} expected, {} available",
            num_bytes,
            slice.remaining()
        )));
    }
    let bits = slice
        .read_vec(num_bytes)
        .map_err(|_| Error::truncated_payload("filter bytes"))?;

    BloomFilter::from_parts(bitsize, bits, hashes)
}

fn model_from_spec(spec: ConfigSpec, filter: BloomFilter) -> Result<Model, Error> {
    let ngram_len = spec
        .ngram_len
        .ok_or_else(|| Error::corrupt_header("the n-gram length is mandatory"))?;
    Model::from_parts(ngram_len, spec.binary, spec.delimiters, filter)
}

fn read_model_text(bytes: &[u8]) -> Result<Model, Error> {
    let mut spec = parse_config(bytes, false)?;
    match spec.bloom.take() {
        Some(BloomRef::Inline(filter)) => model_from_spec(spec, filter),
        _ => Err(Error::corrupt_header("the filter block is mandatory")),
    }
}

fn read_model_packaged(bytes: &[u8]) -> Result<Model, Error> {
    let entries = zip::read_archive(bytes)?;
    let config = entries
        .iter()
        .find(|e| e.name == CONFIG_MEMBER)
        .ok_or_else(|| Error::corrupt_header("archive has no config member"))?;

    let mut spec = parse_config(&config.data, true)?;
    let filter = match spec.bloom.take() {
        Some(BloomRef::Inline(filter)) => filter,
        Some(BloomRef::Member(name)) => {
            let member = entries
                .iter()
                .find(|e| e.name == name)
                .ok_or_else(|| Error::truncated_payload(format!("archive member '{name}'")))?;
            let mut slice = ModelSlice::new(&member.data);
            parse_opaque_block(&mut slice)?
        }
        None => return Err(Error::corrupt_header("the filter block is mandatory")),
    };
    model_from_spec(spec, filter)
}

/// The pre-container layout: a NUL-terminated raw delimiter string, the
/// n-gram length as a native-width word, then the opaque filter block.
/// Parsed with little-endian 64-bit fields only, matching the historical
/// files this reader exists for.
fn read_model_legacy(bytes: &[u8]) -> Result<Model, Error> {
    let nul = bytes
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::corrupt_header("unterminated delimiter string"))?;
    let delimiter = std::str::from_utf8(&bytes[..nul])
        .map_err(|_| Error::corrupt_header("delimiter is not valid UTF-8"))?;

    let mut slice = ModelSlice::new(&bytes[nul + 1..]);
    let ngram_len = slice
        .read_u64_le()
        .map_err(|_| Error::truncated_payload("n-gram length"))?;
    if ngram_len == 0 {
        return Err(Error::corrupt_header("the n-gram length is zero"));
    }
    let filter = parse_opaque_block(&mut slice)?;

    Model::from_parts(
        ngram_len as usize,
        false,
        Delimiters::from_spec(delimiter),
        filter,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HashSetId;

    fn trained_model() -> Model {
        let mut model = Model::new(1 << 12, HashSetId::Murmur, 3, false, " ,").unwrap();
        model.train(b"one two, three four");
        model
    }

    fn assert_equivalent(a: &Model, b: &Model) {
        assert!(!Model::specs_differ(a, b));
        assert_eq!(a.filter().as_bytes(), b.filter().as_bytes());
        assert_eq!(a.filter().popcount(), b.filter().popcount());
    }

    #[test]
    fn test_text_round_trip() {
        let model = trained_model();
        let bytes = write_model(&model, ContainerFormat::Text);
        assert!(bytes.starts_with(b"Salad Configuration\n\n"));
        let reloaded = read_model(&bytes).unwrap();
        assert_equivalent(&model, &reloaded);
    }

    #[test]
    fn test_packaged_round_trip() {
        let model = trained_model();
        let bytes = write_model(&model, ContainerFormat::Packaged);
        assert!(bytes.starts_with(b"PK\x03\x04"));
        let reloaded = read_model(&bytes).unwrap();
        assert_equivalent(&model, &reloaded);
    }

    #[test]
    fn test_text_header_fields() {
        let mut model = Model::new(1 << 10, HashSetId::Simple, 5, true, "").unwrap();
        model.train(&[0xaa, 0xbb]);
        let bytes = write_model(&model, ContainerFormat::Text);
        let text = String::from_utf8_lossy(&bytes[..64]);
        assert!(text.contains("binary = True\n"));
        assert!(text.contains("delimiter = \n"));
        assert!(text.contains("n = 5\n"));
    }

    #[test]
    fn test_legacy_stream() {
        let mut reference = Model::new(1 << 10, HashSetId::Simple, 4, false, " ").unwrap();
        reference.train(b"alpha beta gamma delta epsilon");

        let mut bytes = b" \0".to_vec();
        bytes.extend_from_slice(&4u64.to_le_bytes());
        bytes.extend_from_slice(&opaque_block(reference.filter()));

        let reloaded = read_model(&bytes).unwrap();
        assert_equivalent(&reference, &reloaded);
        assert!(!reloaded.binary());
    }

    #[test]
    fn test_raw_inline_form() {
        let mut reference = Model::new(64, HashSetId::Simple, 2, false, "").unwrap();
        reference.train(b"abcd");

        let mut bytes = b"Salad Configuration\n\nn = 2\nbloom_filter = 64raw\n".to_vec();
        bytes.extend_from_slice(reference.filter().as_bytes());
        bytes.push(b'\n');

        let reloaded = read_model(&bytes).unwrap();
        assert_equivalent(&reference, &reloaded);
    }

    #[test]
    fn test_unknown_hash_ordinal_rejected() {
        let model = trained_model();
        let mut bytes = write_model(&model, ContainerFormat::Text);
        // The first hash ordinal sits right after the count byte of the
        // opaque block, which follows the "bloom_filter = N\n" line.
        let marker = b"bloom_filter = ";
        let line = bytes
            .windows(marker.len())
            .position(|w| w == marker)
            .unwrap();
        let block = line + bytes[line..].iter().position(|&b| b == b'\n').unwrap() + 1;
        bytes[block + 1] = 0xfe;
        let err = read_model(&bytes).unwrap_err();
        assert!(err.message().contains("unknown hash identifier"));
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let model = trained_model();
        let bytes = write_model(&model, ContainerFormat::Text);
        let err = read_model(&bytes[..bytes.len() / 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedModelData);
    }

    #[test]
    fn test_unknown_container_rejected() {
        let err = read_model(b"\x01\x02\x03 with no NUL terminator whatsoever").unwrap_err();
        assert!(err.message().contains("unknown container"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let bytes = b"Salad Configuration\n\nwidth = 3\n";
        let err = read_model(bytes).unwrap_err();
        assert!(err.message().contains("unknown identifier"));
    }

    #[test]
    fn test_comments_and_blank_lines_ignored() {
        let model = trained_model();
        let bytes = write_model(&model, ContainerFormat::Text);
        let text_end = bytes
            .windows(15)
            .position(|w| w == b"bloom_filter = ")
            .unwrap();
        let mut patched = bytes[..text_end].to_vec();
        patched.extend_from_slice(b"# a comment\n\n");
        patched.extend_from_slice(&bytes[text_end..]);
        let reloaded = read_model(&patched).unwrap();
        assert_equivalent(&model, &reloaded);
    }
}
