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

//! Sample acquisition.
//!
//! A [`SampleSource`] yields samples in batches of a caller-chosen size,
//! preserving input order. Two formats are available in this build: `lines`
//! reads newline-separated records and percent-decodes each of them, so
//! binary payloads can travel through text files; `files` treats every
//! regular file of a directory as one sample, in name order. The archive
//! and network formats are recognized but surface [`Unsupported`].
//!
//! [`Unsupported`]: crate::error::ErrorKind::Unsupported

use std::fs;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Error;
use crate::error::ErrorKind;
use crate::ngram::percent_decode_in_place;

/// The shape samples arrive in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    /// One sample per line, percent-decoded.
    Lines,
    /// One sample per regular file of a directory.
    Files,
    /// Samples inside a compressed archive.
    Archive,
    /// Live network capture.
    Network,
    /// Recorded network capture.
    NetworkDump,
}

impl InputFormat {
    /// The user-facing name of this format.
    pub const fn name(self) -> &'static str {
        match self {
            InputFormat::Lines => "lines",
            InputFormat::Files => "files",
            InputFormat::Archive => "archive",
            InputFormat::Network => "network",
            InputFormat::NetworkDump => "network-dump",
        }
    }
}

impl FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lines" => Ok(InputFormat::Lines),
            "files" => Ok(InputFormat::Files),
            "archive" => Ok(InputFormat::Archive),
            "network" => Ok(InputFormat::Network),
            "network-dump" => Ok(InputFormat::NetworkDump),
            _ => Err(format!(
                "unknown input format '{s}' (expected lines, files, archive, network or network-dump)"
            )),
        }
    }
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An order-preserving, batched iterator over samples.
#[derive(Debug)]
pub enum SampleSource {
    /// Newline-separated records from one file.
    Lines(BufReader<File>),
    /// The remaining files of a directory, sorted by name.
    Files(std::vec::IntoIter<PathBuf>),
}

impl SampleSource {
    /// Opens a source for the given format and path.
    ///
    /// # Errors
    ///
    /// `Io` if the path cannot be opened or listed; `Unsupported` for the
    /// archive and network formats, which this build excludes.
    pub fn open(format: InputFormat, path: impl AsRef<Path>) -> Result<SampleSource, Error> {
        let path = path.as_ref();
        match format {
            InputFormat::Lines => {
                let file = File::open(path).map_err(|err| {
                    Error::new(ErrorKind::Io, format!("cannot open {}", path.display()))
                        .set_source(err)
                })?;
                Ok(SampleSource::Lines(BufReader::new(file)))
            }
            InputFormat::Files => {
                let entries = fs::read_dir(path).map_err(|err| {
                    Error::new(ErrorKind::Io, format!("cannot list {}", path.display()))
                        .set_source(err)
                })?;
                let mut paths = Vec::new();
                for entry in entries {
                    let entry = entry.map_err(|err| {
                        Error::new(ErrorKind::Io, format!("cannot list {}", path.display()))
                            .set_source(err)
                    })?;
                    if entry.path().is_file() {
                        paths.push(entry.path());
                    }
                }
                paths.sort();
                Ok(SampleSource::Files(paths.into_iter()))
            }
            InputFormat::Archive | InputFormat::Network | InputFormat::NetworkDump => {
                Err(Error::unsupported(format!(
                    "the {format} input format is not available in this build"
                )))
            }
        }
    }

    /// Reads up to `max` samples. An empty batch signals the end of the
    /// source.
    pub fn next_batch(&mut self, max: usize) -> Result<Vec<Vec<u8>>, Error> {
        let mut batch = Vec::new();
        while batch.len() < max.max(1) {
            match self.next_sample()? {
                Some(sample) => batch.push(sample),
                None => break,
            }
        }
        Ok(batch)
    }

    fn next_sample(&mut self) -> Result<Option<Vec<u8>>, Error> {
        match self {
            SampleSource::Lines(reader) => {
                let mut line = Vec::new();
                let read = reader.read_until(b'\n', &mut line)?;
                if read == 0 {
                    return Ok(None);
                }
                if line.last() == Some(&b'\n') {
                    line.pop();
                }
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                percent_decode_in_place(&mut line);
                Ok(Some(line))
            }
            SampleSource::Files(paths) => match paths.next() {
                Some(path) => {
                    let data = fs::read(&path).map_err(|err| {
                        Error::new(ErrorKind::Io, format!("cannot read {}", path.display()))
                            .set_source(err)
                    })?;
                    Ok(Some(data))
                }
                None => Ok(None),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_format_names_round_trip() {
        for format in [
            InputFormat::Lines,
            InputFormat::Files,
            InputFormat::Archive,
            InputFormat::Network,
            InputFormat::NetworkDump,
        ] {
            assert_eq!(format.name().parse::<InputFormat>().unwrap(), format);
        }
        assert!("pcap".parse::<InputFormat>().is_err());
    }

    #[test]
    fn test_lines_source_decodes_and_batches() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "plain line").unwrap();
        writeln!(file, "with%20escape").unwrap();
        writeln!(file, "third").unwrap();

        let mut source = SampleSource::open(InputFormat::Lines, file.path()).unwrap();
        let batch = source.next_batch(2).unwrap();
        assert_eq!(batch, vec![b"plain line".to_vec(), b"with escape".to_vec()]);

        let rest = source.next_batch(128).unwrap();
        assert_eq!(rest, vec![b"third".to_vec()]);
        assert!(source.next_batch(128).unwrap().is_empty());
    }

    #[test]
    fn test_files_source_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.bin"), b"second").unwrap();
        fs::write(dir.path().join("a.bin"), b"first").unwrap();

        let mut source = SampleSource::open(InputFormat::Files, dir.path()).unwrap();
        let batch = source.next_batch(16).unwrap();
        assert_eq!(batch, vec![b"first".to_vec(), b"second".to_vec()]);
    }

    #[test]
    fn test_unsupported_formats() {
        for format in [
            InputFormat::Archive,
            InputFormat::Network,
            InputFormat::NetworkDump,
        ] {
            let err = SampleSource::open(format, "whatever").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Unsupported);
        }
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let err = SampleSource::open(InputFormat::Lines, "/no/such/file").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
