// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors shared by projections and losses.

use thiserror::Error;

/// Everything that can make a projection or a loss computation fail.
///
/// None of them is recoverable inside the computation,
/// the caller decides whether to skip the batch.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A camera matrix could not be inverted.
    #[error("Singular {0} matrix")]
    SingularMatrix(&'static str),

    /// Inputs that should share a dimension do not.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The target resolution cannot be reached from the native one.
    #[error("Invalid resolution: {0}")]
    InvalidResolution(String),

    /// A configuration value is out of its valid domain.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Losses are averaged over the batch, which cannot be empty.
    #[error("Empty batch")]
    EmptyBatch,
}

/// Result type of fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Check that two batched inputs have the same number of samples.
pub fn check_same_len(what: &str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::ShapeMismatch(format!(
            "{}: expected {} elements but got {}",
            what, expected, actual
        )))
    }
}
