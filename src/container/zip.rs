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

// Minimal ZIP plumbing for the packaged container: stored (uncompressed)
// entries only, written with deterministic zeroed timestamps and read
// through the central directory. Compressed members are rejected as
// unsupported rather than parsed.

use crate::container::codec::ModelBytes;
use crate::container::codec::ModelSlice;
use crate::error::Error;

const LOCAL_FILE_SIG: u32 = 0x04034b50;
const CENTRAL_DIR_SIG: u32 = 0x02014b50;
const END_OF_CENTRAL_DIR_SIG: u32 = 0x06054b50;

const LOCAL_FILE_HEADER_LEN: usize = 30;
const END_OF_CENTRAL_DIR_LEN: usize = 22;
const MAX_COMMENT_LEN: usize = u16::MAX as usize;

const METHOD_STORED: u16 = 0;
const VERSION_NEEDED: u16 = 20;

/// One archive member.
#[derive(Debug)]
pub(crate) struct Entry {
    pub name: String,
    pub data: Vec<u8>,
}

/// Serializes the given members as a ZIP archive with stored entries.
pub(crate) fn write_archive(entries: &[Entry]) -> Vec<u8> {
    let mut out = ModelBytes::new();
    let mut directory = Vec::with_capacity(entries.len());

    for entry in entries {
        let offset = out.len() as u32;
        let crc = crc32fast::hash(&entry.data);
        let size = entry.data.len() as u32;

        out.write_u32_le(LOCAL_FILE_SIG);
        out.write_u16_le(VERSION_NEEDED);
        out.write_u16_le(0); // general purpose flags
        out.write_u16_le(METHOD_STORED);
        out.write_u16_le(0); // modification time
        out.write_u16_le(0); // modification date
        out.write_u32_le(crc);
        out.write_u32_le(size); // compressed
        out.write_u32_le(size); // uncompressed
        out.write_u16_le(entry.name.len() as u16);
        out.write_u16_le(0); // extra field length
        out.write(entry.name.as_bytes());
        out.write(&entry.data);

        directory.push((entry, crc, size, offset));
    }

    let directory_offset = out.len() as u32;
    for (entry, crc, size, offset) in &directory {
        out.write_u32_le(CENTRAL_DIR_SIG);
        out.write_u16_le(VERSION_NEEDED); // version made by
        out.write_u16_le(VERSION_NEEDED);
        out.write_u16_le(0); // general purpose flags
        out.write_u16_le(METHOD_STORED);
        out.write_u16_le(0); // modification time
        out.write_u16_le(0); // modification date
        out.write_u32_le(*crc);
        out.write_u32_le(*size);
        out.write_u32_le(*size);
        out.write_u16_le(entry.name.len() as u16);
        out.write_u16_le(0); // extra field length
        out.write_u16_le(0); // comment length
        out.write_u16_le(0); // disk number start
        out.write_u16_le(0); // internal attributes
        out.write_u32_le(0); // external attributes
        out.write_u32_le(*offset);
        out.write(entry.name.as_bytes());
    }
    let directory_size = out.len() as u32 - directory_offset;

    out.write_u32_le(END_OF_CENTRAL_DIR_SIG);
    out.write_u16_le(0); // this disk
    out.write_u16_le(0); // directory disk
    out.write_u16_le(directory.len() as u16);
    out.write_u16_le(directory.len() as u16);
    out.write_u32_le(directory_size);
    out.write_u32_le(directory_offset);
    out.write_u16_le(0); // comment length

    out.into_bytes()
}

/// Parses a ZIP archive and returns its members in directory order.
pub(crate) fn read_archive(bytes: &[u8]) -> Result<Vec<Entry>, Error> {
    let eocd = find_end_of_central_dir(bytes)?;
    let mut tail = ModelSlice::new(&bytes[eocd + 4..]);
    let _this_disk = read_field(&mut tail, "end of central directory")?;
    let _dir_disk = read_field(&mut tail, "end of central directory")?;
    let _entries_this_disk = read_field(&mut tail, "end of central directory")?;
    let num_entries = read_field(&mut tail, "end of central directory")?;
    let _dir_size = tail
        .read_u32_le()
        .map_err(|_| Error::truncated_payload("central directory size"))?;
    let dir_offset = tail
        .read_u32_le()
        .map_err(|_| Error::truncated_payload("central directory offset"))? as usize;

    if dir_offset > eocd {
        return Err(Error::corrupt_header("central directory out of bounds"));
    }

    let mut dir = ModelSlice::new(&bytes[dir_offset..eocd]);
    let mut entries = Vec::with_capacity(usize::from(num_entries));
    for _ in 0..num_entries {
        entries.push(read_directory_entry(&mut dir, bytes)?);
    }
    Ok(entries)
}

fn read_field(slice: &mut ModelSlice<'_>, what: &'static str) -> Result<u16, Error> {
    slice
        .read_u16_le()
        .map_err(|_| Error::truncated_payload(what))
}

fn find_end_of_central_dir(bytes: &[u8]) -> Result<usize, Error> {
    if bytes.len() < END_OF_CENTRAL_DIR_LEN {
        return Err(Error::truncated_payload("archive shorter than its trailer"));
    }
    let floor = bytes
        .len()
        .saturating_sub(END_OF_CENTRAL_DIR_LEN + MAX_COMMENT_LEN);
    let sig = END_OF_CENTRAL_DIR_SIG.to_le_bytes();
    (floor..=bytes.len() - END_OF_CENTRAL_DIR_LEN)
        .rev()
        .find(|&i| bytes[i..i + 4] == sig)
        .ok_or_else(|| Error::corrupt_header("no end of central directory record"))
}

fn read_directory_entry(dir: &mut ModelSlice<'_>, bytes: &[u8]) -> Result<Entry, Error> {
    let sig = dir
        .read_u32_le()
        .map_err(|_| Error::truncated_payload("central directory record"))?;
    if sig != CENTRAL_DIR_SIG {
        return Err(Error::corrupt_header("bad central directory signature"));
    }

    let _version_made_by = read_field(dir, "central directory record")?;
    let _version_needed = read_field(dir, "central directory record")?;
    let _flags = read_field(dir, "central directory record")?;
    let method = read_field(dir, "central directory record")?;
    let _time = read_field(dir, "central directory record")?;
    let _date = read_field(dir, "central directory record")?;
    let crc = dir
        .read_u32_le()
        .map_err(|_| Error::truncated_payload("entry checksum"))?;
    let compressed_size = dir
        .read_u32_le()
        .map_err(|_| Error::truncated_payload("entry size"))? as usize;
    let _uncompressed_size = dir
        .read_u32_le()
        .map_err(|_| Error::truncated_payload("entry size"))?;
    let name_len = usize::from(read_field(dir, "central directory record")?);
    let extra_len = usize::from(read_field(dir, "central directory record")?);
    let comment_len = usize::from(read_field(dir, "central directory record")?);
    let _disk_start = read_field(dir, "central directory record")?;
    let _internal_attrs = read_field(dir, "central directory record")?;
    let _external_attrs = dir
        .read_u32_le()
        .map_err(|_| Error::truncated_payload("entry attributes"))?;
    let local_offset = dir
        .read_u32_le()
        .map_err(|_| Error::truncated_payload("entry offset"))? as usize;

    let name = dir
        .read_vec(name_len)
        .map_err(|_| Error::truncated_payload("entry name"))?;
    let name = String::from_utf8(name)
        .map_err(|_| Error::corrupt_header("entry name is not valid UTF-8"))?;
    let _skipped = dir
        .read_vec(extra_len + comment_len)
        .map_err(|_| Error::truncated_payload("entry metadata"))?;

    if method != METHOD_STORED {
        return Err(Error::unsupported(format!(
            "archive member '{name}' uses compression method {method}; only stored entries are readable"
        )));
    }

    let data = read_local_entry_data(bytes, local_offset, compressed_size, &name)?;
    if crc32fast::hash(&data) != crc {
        return Err(Error::malformed(format!(
            "checksum mismatch in archive member '{name}'"
        )));
    }
    Ok(Entry { name, data })
}

fn read_local_entry_data(
    bytes: &[u8],
    offset: usize,
    size: usize,
    name: &str,
) -> Result<Vec<u8>, Error> {
    if offset + LOCAL_FILE_HEADER_LEN > bytes.len() {
        return Err(Error::truncated_payload(format!(
            "local header of archive member '{name}'"
        )));
    }
    let mut header = ModelSlice::new(&bytes[offset..]);
    let sig = header
        .read_u32_le()
        .map_err(|_| Error::truncated_payload("local file header"))?;
    if sig != LOCAL_FILE_SIG {
        return Err(Error::corrupt_header("bad local file header signature"));
    }

    // Skip to the two length fields; data follows name and extra field.
    let _skipped = header
        .read_vec(22)
        .map_err(|_| Error::truncated_payload("local file header"))?;
    let name_len = usize::from(read_field(&mut header, "local file header")?);
    let extra_len = usize::from(read_field(&mut header, "local file header")?);

    let start = offset + LOCAL_FILE_HEADER_LEN + name_len + extra_len;
    let end = start + size;
    if end > bytes.len() {
        return Err(Error::truncated_payload(format!(
            "data of archive member '{name}'"
        )));
    }
    Ok(bytes[start..end].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, data: &[u8]) -> Entry {
        Entry {
            name: name.to_string(),
            data: data.to_vec(),
        }
    }

    #[test]
    fn test_round_trip() {
        let archive = write_archive(&[
            entry("config", b"key = value\n"),
            entry("bloom.data", &[0x00, 0xff, 0x10, 0x20]),
        ]);
        assert_eq!(&archive[..2], b"PK");

        let entries = read_archive(&archive).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "config");
        assert_eq!(entries[0].data, b"key = value\n");
        assert_eq!(entries[1].name, "bloom.data");
        assert_eq!(entries[1].data, [0x00, 0xff, 0x10, 0x20]);
    }

    #[test]
    fn test_empty_member() {
        let archive = write_archive(&[entry("empty", b"")]);
        let entries = read_archive(&archive).unwrap();
        assert_eq!(entries[0].data, b"");
    }

    #[test]
    fn test_deterministic_output() {
        let a = write_archive(&[entry("config", b"x")]);
        let b = write_archive(&[entry("config", b"x")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_trailer_rejected() {
        let err = read_archive(b"PK\x03\x04 not really an archive").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MalformedModelData);
    }

    #[test]
    fn test_corrupted_member_rejected() {
        let mut archive = write_archive(&[entry("config", b"payload")]);
        // Flip a payload byte; the checksum must catch it.
        let pos = archive.windows(7).position(|w| w == b"payload").unwrap();
        archive[pos] ^= 0x01;
        let err = read_archive(&archive).unwrap_err();
        assert!(err.message().contains("checksum mismatch"));
    }

    #[test]
    fn test_compressed_member_rejected() {
        let mut archive = write_archive(&[entry("config", b"payload")]);
        // Patch the method field in the central directory record to deflate.
        let dir = archive
            .windows(4)
            .position(|w| w == CENTRAL_DIR_SIG.to_le_bytes())
            .unwrap();
        archive[dir + 10] = 8;
        let err = read_archive(&archive).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Unsupported);
    }
}
