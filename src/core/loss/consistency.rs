// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Consistency loss between point clouds predicted from different views of the same object.
//!
//! Each view predicts a cloud in its own camera frame.
//! For every pair of views `(i, j)` with `i < j`, the cloud of view `i` is moved
//! into the frame of view `j` and compared with the cloud predicted by view `j`.

use crate::core::camera;
use crate::math::pairs;
use crate::math::point_set::PointSetDistance;
use crate::misc::error::{self, Error, Result};
use crate::misc::helper;
use crate::misc::type_aliases::{Float, Mat4, Point3};

/// Configuration of the consistency loss.
#[derive(PartialEq, Debug, Clone)]
pub struct Config {
    /// Number of view pairs compared at once.
    /// Halved for matching distances which are more memory hungry.
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { chunk_size: 100 }
    }
}

impl Config {
    /// Chunk size actually used with a given distance.
    pub fn effective_chunk_size<D: PointSetDistance>(&self, distance: &D) -> Result<usize> {
        let size = if distance.is_matching() {
            self.chunk_size / 2
        } else {
            self.chunk_size
        };
        if size == 0 {
            Err(Error::InvalidConfig(format!(
                "chunk size {} is too small",
                self.chunk_size
            )))
        } else {
            Ok(size)
        }
    }
}

/// Consistency loss of a batch.
///
/// `clouds[b][c]` is the cloud predicted for sample `b` from view `c`,
/// expressed in the frame of camera `extrinsics[b][c]`.
/// Returns one distance per sample and pair of views, ordered by sample then by pair
/// as in `pairs::batch_pairs`. Nearest neighbor distances are scaled.
///
/// Pairs are processed by chunks to bound the number of transformed clouds
/// alive at the same time. Results do not depend on the chunk size.
pub fn consistency_loss<D: PointSetDistance>(
    config: &Config,
    distance: &D,
    clouds: &[Vec<Vec<Point3>>],
    extrinsics: &[Vec<Mat4>],
) -> Result<Vec<Float>> {
    if clouds.is_empty() {
        return Err(Error::EmptyBatch);
    }
    error::check_same_len("extrinsics", clouds.len(), extrinsics.len())?;
    let nb_views = clouds.first().map_or(0, Vec::len);
    for (views, poses) in clouds.iter().zip(extrinsics) {
        error::check_same_len("views", nb_views, views.len())?;
        error::check_same_len("camera poses", nb_views, poses.len())?;
    }
    if nb_views < 2 {
        return Err(Error::InvalidConfig(format!(
            "at least 2 views are required, got {}",
            nb_views
        )));
    }

    let chunk_size = config.effective_chunk_size(distance)?;
    let tasks = pairs::batch_pairs(clouds.len(), nb_views);
    let mut losses = Vec::with_capacity(tasks.len());
    for (chunk_id, chunk) in tasks.chunks(chunk_size).enumerate() {
        log::debug!(
            "Consistency chunk {}: {} pairs out of {}",
            chunk_id,
            chunk.len(),
            tasks.len()
        );
        let moved: Vec<Vec<Point3>> = chunk
            .iter()
            .map(|&(b, src, des)| -> Result<Vec<Point3>> {
                let poses = &extrinsics[b];
                let motion = camera::relative_extrinsics(&poses[src], &poses[des])?;
                Ok(clouds[b][src]
                    .iter()
                    .map(|p| helper::transform_point(&motion, p))
                    .collect())
            })
            .collect::<Result<_>>()?;
        losses.extend(
            chunk
                .iter()
                .zip(&moved)
                .map(|(&(b, _, des), src_cloud)| {
                    distance.distance(&clouds[b][des], src_cloud).scaled()
                }),
        );
    }
    Ok(losses)
}

// TESTS #############################################################
