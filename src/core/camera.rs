// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Camera intrinsics and extrinsics as plain matrices.
//!
//! Intrinsics are a 3x3 matrix `K` mapping camera coordinates to homogeneous pixel
//! coordinates, where x is the column and y the row of a pixel.
//! Extrinsics are a 4x4 homogeneous matrix mapping world coordinates to camera coordinates.

use crate::misc::error::{Error, Result};
use crate::misc::helper;
use crate::misc::type_aliases::{Float, Mat3, Mat4, Point3, Vec3};

/// A pinhole camera in a given pose.
#[derive(PartialEq, Debug, Clone)]
pub struct Camera {
    /// Intrinsic matrix `K`.
    pub intrinsics: Mat3,
    /// World to camera transformation.
    pub extrinsics: Mat4,
}

impl Camera {
    /// Create a camera from its intrinsic and extrinsic matrices.
    pub fn new(intrinsics: Mat3, extrinsics: Mat4) -> Camera {
        Camera {
            intrinsics,
            extrinsics,
        }
    }

    /// Camera with intrinsics adapted to an image downsampled
    /// by `(rows, cols)` factors.
    pub fn rescaled(&self, downscale: (Float, Float)) -> Camera {
        Self::new(
            rescale_intrinsics(&self.intrinsics, downscale),
            self.extrinsics,
        )
    }

    /// Transform a world point into camera coordinates.
    pub fn world_to_camera(&self, point: &Point3) -> Point3 {
        helper::transform_point(&self.extrinsics, point)
    }

    /// Homogeneous pixel coordinates `(x * z, y * z, z)` of a world point.
    pub fn project(&self, point: &Point3) -> Vec3 {
        self.intrinsics * self.world_to_camera(point).coords
    }

    /// World point seen at pixel `(x, y)` with a given depth.
    pub fn back_project(&self, x: Float, y: Float, depth: Float) -> Result<Point3> {
        let k_inv = self.inverse_intrinsics()?;
        let e_inv = self.inverse_extrinsics()?;
        let camera_point = k_inv * Vec3::new(x * depth, y * depth, depth);
        Ok(helper::transform_point(&e_inv, &Point3::from(camera_point)))
    }

    /// Inverse of `K`.
    pub fn inverse_intrinsics(&self) -> Result<Mat3> {
        self.intrinsics
            .try_inverse()
            .ok_or(Error::SingularMatrix("intrinsics"))
    }

    /// Camera to world transformation.
    pub fn inverse_extrinsics(&self) -> Result<Mat4> {
        self.extrinsics
            .try_inverse()
            .ok_or(Error::SingularMatrix("extrinsics"))
    }
}

/// Divide the rows of `K` by the downscale factors:
/// the x row (focal and principal x) by the columns factor,
/// the y row by the rows factor.
pub fn rescale_intrinsics(k: &Mat3, downscale: (Float, Float)) -> Mat3 {
    let (rows, cols) = downscale;
    let mut rescaled = *k;
    for j in 0..3 {
        rescaled[(0, j)] /= cols;
        rescaled[(1, j)] /= rows;
    }
    rescaled
}

/// Transformation from the coordinates frame of camera `src`
/// to the coordinates frame of camera `des`: `des * src^-1`.
pub fn relative_extrinsics(src: &Mat4, des: &Mat4) -> Result<Mat4> {
    let src_inv = src
        .try_inverse()
        .ok_or(Error::SingularMatrix("extrinsics"))?;
    Ok(des * src_inv)
}

// TESTS #############################################################
