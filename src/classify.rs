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

//! One-class and two-class scoring.
//!
//! Both scorers are thin counting visitors over the shared extraction
//! pipeline: one pass per sample, one membership test per emitted n-gram
//! and filter. Scoring never mutates the filter it scores against.
//!
//! # Usage
//!
//! ```rust
//! use salad::classify::score_anomaly;
//! use salad::hash::HashSetId;
//! use salad::model::Model;
//!
//! let mut model = Model::new(1 << 20, HashSetId::Simple, 3, false, "")?;
//! model.train(b"abcabc");
//!
//! assert_eq!(score_anomaly(&model, b"abcabc"), 0.0);
//! assert!(score_anomaly(&model, b"").is_nan());
//! # Ok::<(), salad::error::Error>(())
//! ```

use crate::error::Error;
use crate::model::Model;

/// One-class anomaly score: the fraction of the sample's n-grams absent
/// from the trained filter.
///
/// With `N` emissions of which `K` are members, the score is `(N - K) / N`,
/// in `[0, 1]`. A sample that emits no n-grams scores NaN; callers render
/// that with their configured placeholder.
pub fn score_anomaly(model: &Model, sample: &[u8]) -> f64 {
    let filter = model.filter();
    let mut known: u64 = 0;
    let mut total: u64 = 0;

    model.for_each_ngram(sample, |gram| {
        if filter.contains(gram) {
            known += 1;
        }
        total += 1;
    });

    if total == 0 {
        f64::NAN
    } else {
        (total - known) as f64 / total as f64
    }
}

/// Two-class discrimination score between a good-content and a bad-content
/// filter with matching specifications.
///
/// With `N` emissions, `K_G` hits in the good filter and `K_B` hits in the
/// bad one, the score is `(K_B - K_G) / N`, in `[-1, 1]`: negative is
/// evidence for the good class, positive for the bad class, zero is
/// indifference. NaN when `N = 0`.
///
/// # Errors
///
/// `SpecMismatch` if the two models were not generated with the same
/// parameters.
pub fn score_two_class(good: &Model, bad: &Model, sample: &[u8]) -> Result<f64, Error> {
    if Model::specs_differ(good, bad) {
        return Err(Error::spec_mismatch(
            "the good and the bad content filter were not generated with the same parameters",
        ));
    }

    let good_filter = good.filter();
    let bad_filter = bad.filter();
    let mut good_hits: u64 = 0;
    let mut bad_hits: u64 = 0;
    let mut total: u64 = 0;

    good.for_each_ngram(sample, |gram| {
        if good_filter.contains(gram) {
            good_hits += 1;
        }
        if bad_filter.contains(gram) {
            bad_hits += 1;
        }
        total += 1;
    });

    if total == 0 {
        Ok(f64::NAN)
    } else {
        Ok((bad_hits as f64 - good_hits as f64) / total as f64)
    }
}
