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

use googletest::assert_that;
use googletest::prelude::contains_substring;

use salad::container::ContainerFormat;
use salad::container::read_model;
use salad::container::read_model_from_path;
use salad::container::write_model;
use salad::container::write_model_to_path;
use salad::hash::HashSetId;
use salad::model::Model;

fn assert_round_trip(model: &Model, format: ContainerFormat) {
    let bytes = write_model(model, format);
    let reloaded = read_model(&bytes).unwrap();

    assert!(!Model::specs_differ(model, &reloaded));
    assert_eq!(reloaded.ngram_len(), model.ngram_len());
    assert_eq!(reloaded.binary(), model.binary());
    assert_eq!(reloaded.delimiters().text(), model.delimiters().text());
    assert_eq!(reloaded.filter().bitsize(), model.filter().bitsize());
    assert_eq!(reloaded.filter().hashes(), model.filter().hashes());
    assert_eq!(reloaded.filter().popcount(), model.filter().popcount());
    assert_eq!(reloaded.filter().as_bytes(), model.filter().as_bytes());
}

#[test]
fn test_byte_model_round_trip() {
    let mut model = Model::new(1 << 16, HashSetId::Simple, 3, false, "").unwrap();
    model.train(b"abcabc");
    assert_round_trip(&model, ContainerFormat::Text);
    assert_round_trip(&model, ContainerFormat::Packaged);
}

#[test]
fn test_token_model_round_trip() {
    let mut model = Model::new(1 << 14, HashSetId::Murmur, 2, false, " %09,;").unwrap();
    model.train(b"the quick brown fox");
    model.train(b"jumps,over;the\tlazy dog");
    assert_round_trip(&model, ContainerFormat::Text);
    assert_round_trip(&model, ContainerFormat::Packaged);
}

#[test]
fn test_bit_model_round_trip() {
    let mut model = Model::new(1 << 12, HashSetId::Murmur, 13, true, "").unwrap();
    model.train(&[0xde, 0xad, 0xbe, 0xef]);
    assert_round_trip(&model, ContainerFormat::Text);
    assert_round_trip(&model, ContainerFormat::Packaged);
}

#[test]
fn test_untrained_model_round_trip() {
    let model = Model::new(1 << 10, HashSetId::Simple, 5, false, "").unwrap();
    assert_round_trip(&model, ContainerFormat::Text);
    assert_round_trip(&model, ContainerFormat::Packaged);
}

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("content.model");

    let mut model = Model::new(1 << 16, HashSetId::Simple, 3, false, "").unwrap();
    model.train(b"GET /index.html HTTP/1.1");

    write_model_to_path(&path, &model, ContainerFormat::Packaged).unwrap();
    let reloaded = read_model_from_path(&path).unwrap();
    assert!(!Model::specs_differ(&model, &reloaded));
    assert_eq!(reloaded.filter().as_bytes(), model.filter().as_bytes());
}

#[test]
fn test_missing_file_reports_open_failure() {
    let err = read_model_from_path("/no/such/model/file").unwrap_err();
    assert_eq!(err.kind(), salad::ErrorKind::Io);
    assert_that!(err.message(), contains_substring("cannot open"));
}

#[test]
fn test_text_and_packaged_share_the_filter_block() {
    let mut model = Model::new(1 << 12, HashSetId::Simple, 3, false, "").unwrap();
    model.train(b"shared payload");

    let text = write_model(&model, ContainerFormat::Text);
    let packaged = write_model(&model, ContainerFormat::Packaged);

    // The opaque block (hash count, ordinals, bitsize, filter bytes) is
    // byte-identical across the two shapes.
    let mut block = vec![3u8, 0, 1, 2];
    block.extend_from_slice(&(1u64 << 12).to_le_bytes());
    block.extend_from_slice(model.filter().as_bytes());

    assert!(text.windows(block.len()).any(|w| w == &block[..]));
    assert!(packaged.windows(block.len()).any(|w| w == &block[..]));
}

#[test]
fn test_loading_preserves_scores() {
    let mut model = Model::new(1 << 20, HashSetId::Murmur, 3, false, "").unwrap();
    model.train(b"a stream of perfectly ordinary text");

    let reloaded = read_model(&write_model(&model, ContainerFormat::Packaged)).unwrap();
    for sample in [&b"a stream of perfectly ordinary text"[..], b"zq%&#!", b"ord"] {
        let before = salad::classify::score_anomaly(&model, sample);
        let after = salad::classify::score_anomaly(&reloaded, sample);
        assert!(before == after || (before.is_nan() && after.is_nan()));
    }
}

#[test]
fn test_truncated_archive_rejected() {
    let mut model = Model::new(1 << 12, HashSetId::Simple, 3, false, "").unwrap();
    model.train(b"abc");
    let packaged = write_model(&model, ContainerFormat::Packaged);

    let err = read_model(&packaged[..packaged.len() - 7]).unwrap_err();
    assert_eq!(err.kind(), salad::ErrorKind::MalformedModelData);
}

#[test]
fn test_updated_model_round_trip() {
    // Mirrors train --update-model: load, continue training, rewrite.
    let mut model = Model::new(1 << 16, HashSetId::Simple, 3, false, "").unwrap();
    model.train(b"first corpus");

    let mut reloaded = read_model(&write_model(&model, ContainerFormat::Text)).unwrap();
    reloaded.train(b"second corpus");

    let final_model = read_model(&write_model(&reloaded, ContainerFormat::Text)).unwrap();
    assert!(final_model.filter().popcount() >= model.filter().popcount());
    final_model.for_each_ngram(b"second corpus", |gram| {
        assert!(final_model.filter().contains(gram));
    });
}
