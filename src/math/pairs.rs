// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Index generation for pairwise comparisons.

use itertools::Itertools;

/// All pairs `(i, j)` with `i < j < n`, in lexicographic order.
pub fn pairs(n: usize) -> Vec<(usize, usize)> {
    (0..n).tuple_combinations().collect()
}

/// Number of pairs returned by `pairs(n)`.
pub fn nb_pairs(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// All `(b, i, j)` with `b < batch_size` and `i < j < n`.
///
/// The pairs are the same for every sample of the batch,
/// and the result is ordered by sample first.
pub fn batch_pairs(batch_size: usize, n: usize) -> Vec<(usize, usize, usize)> {
    let pairs = pairs(n);
    (0..batch_size)
        .flat_map(|b| pairs.iter().map(move |&(i, j)| (b, i, j)))
        .collect()
}

// TESTS #############################################################
