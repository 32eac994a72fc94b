// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Front loss: compare the visible part of a predicted point cloud
//! with the surface seen in a ground truth depth image.

use itertools::izip;
use nalgebra::DMatrix;

use crate::core::camera::Camera;
use crate::core::projection::{self, Config};
use crate::math::point_set::PointSetDistance;
use crate::misc::error::{self, Error, Result};
use crate::misc::helper;
use crate::misc::type_aliases::{Float, Point3};

/// Front loss of a batch of predictions.
///
/// For each sample, the ground truth depth image is lifted to a point cloud
/// (foreground pixels only), and the prediction is reduced to its points visible
/// from the camera. Both sets usually have different sizes,
/// so samples are compared one at a time.
/// The result is the mean distance over the batch.
/// A sample with no foreground or no visible point contributes 0.
#[allow(clippy::cast_precision_loss)]
pub fn front_loss<D: PointSetDistance>(
    config: &Config,
    distance: &D,
    clouds: &[Vec<Point3>],
    cameras: &[Camera],
    depths_gt: &[DMatrix<Float>],
) -> Result<Float> {
    if clouds.is_empty() {
        return Err(Error::EmptyBatch);
    }
    error::check_same_len("ground truth depths", clouds.len(), depths_gt.len())?;
    let ground_truth = projection::inverse_projection(config, depths_gt, cameras)?;
    let renderings = projection::projection(config, clouds, cameras)?;

    let mut loss = 0.0;
    for (b, cloud, gt, rendering) in izip!(0.., clouds, &ground_truth, &renderings) {
        let visible = helper::boolean_mask(cloud, &rendering.mask);
        let gt_points = gt.selected();
        log::debug!(
            "Sample {}: {} ground truth points, {} visible points",
            b,
            gt_points.len(),
            visible.len()
        );
        loss += distance.distance(&gt_points, &visible).total();
    }
    Ok(loss / clouds.len() as Float)
}

// TESTS #############################################################
