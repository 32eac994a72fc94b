// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Fixed point depth encoding and depth image downsampling.
//!
//! Depth images are stored on a 16 bits scale where 0 maps to the minimum depth
//! and 65535 to the maximum depth, which is also used as the background value.
//! In memory they are kept as `Float` matrices on that scale,
//! so that rendered images are not rounded.

use nalgebra::DMatrix;

use crate::misc::type_aliases::Float;

/// Highest value of the 16 bits fixed point scale.
pub const MAX_ENCODED: Float = 65_535.0;

/// Encoded value of pixels without any surface.
pub const BACKGROUND: Float = MAX_ENCODED;

/// Linear mapping between metric depth in `[min, max]` and `[0, MAX_ENCODED]`.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct DepthCodec {
    /// Depth encoded as 0.
    pub min: Float,
    /// Depth encoded as `MAX_ENCODED`, means background.
    pub max: Float,
}

impl Default for DepthCodec {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 10.0,
        }
    }
}

impl DepthCodec {
    /// Transform an encoded value into a metric depth.
    pub fn decode(&self, value: Float) -> Float {
        (value / MAX_ENCODED) * (self.max - self.min) + self.min
    }

    /// Transform a metric depth into an encoded value.
    ///
    /// Anything not strictly below `max` (NaN included) collapses to the background.
    pub fn encode(&self, depth: Float) -> Float {
        let depth = if depth < self.max {
            depth.max(self.min)
        } else {
            self.max
        };
        (depth - self.min) * MAX_ENCODED / (self.max - self.min)
    }

    /// A decoded depth belongs to the foreground if it is strictly below `max`.
    pub fn is_foreground(&self, depth: Float) -> bool {
        depth < self.max
    }

    /// Check if a depth is inside the encodable range (bounds included).
    pub fn in_range(&self, depth: Float) -> bool {
        depth >= self.min && depth <= self.max
    }

    /// Maximal quantization error of a round trip through the 16 bits scale.
    pub fn quantization_step(&self) -> Float {
        (self.max - self.min) / MAX_ENCODED
    }
}

/// Convert a raw 16 bits depth image to the in-memory representation.
pub fn from_raw(raw: &DMatrix<u16>) -> DMatrix<Float> {
    raw.map(Float::from)
}

/// Quantize an in-memory depth image back to 16 bits.
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
pub fn to_raw(depth: &DMatrix<Float>) -> DMatrix<u16> {
    depth.map(|v| v.round().max(0.0).min(MAX_ENCODED) as u16)
}

/// Downsample a depth image by keeping the minimum of each non-overlapping block
/// of `factors = (rows, cols)` pixels, which preserves the nearest surfaces.
///
/// Trailing rows and columns that do not fill a block are dropped.
pub fn min_pool(depth: &DMatrix<Float>, factors: (usize, usize)) -> DMatrix<Float> {
    let (fr, fc) = factors;
    assert!(fr > 0 && fc > 0, "Pooling factors must be positive");
    let (nrows, ncols) = depth.shape();
    DMatrix::from_fn(nrows / fr, ncols / fc, |i, j| {
        depth
            .view((i * fr, j * fc), (fr, fc))
            .iter()
            .fold(Float::INFINITY, |acc, &v| acc.min(v))
    })
}

// TESTS #############################################################
