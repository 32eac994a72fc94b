// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Projection of point clouds into depth images, and inverse projection of depth images.
//!
//! Both directions work on a whole batch at once.
//! Depth images are given at a native resolution (224x224 by default)
//! and may be processed at a lower target resolution.

use itertools::izip;
use nalgebra::DMatrix;

use crate::core::camera::Camera;
use crate::core::depth::{self, DepthCodec};
use crate::misc::error::{self, Error, Result};
use crate::misc::helper;
use crate::misc::type_aliases::{Batch, Float, Point3, Vec3};

/// Guard against division by zero when dividing by the homogeneous depth.
pub const EPSILON: Float = 1e-12;

/// Resolution settings and depth encoding shared by both projections.
#[derive(PartialEq, Debug, Clone)]
pub struct Config {
    /// `(height, width)` of the depth images given to the inverse projection.
    /// Intrinsics are expressed at this resolution.
    pub native: (usize, usize),
    /// `(height, width)` of the processed depth images.
    pub resolution: (usize, usize),
    /// Encoding of depth values.
    pub codec: DepthCodec,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            native: (224, 224),
            resolution: (224, 224),
            codec: DepthCodec::default(),
        }
    }
}

impl Config {
    /// Configuration working at a lower resolution than the 224x224 default.
    pub fn with_resolution(height: usize, width: usize) -> Self {
        Self {
            resolution: (height, width),
            ..Self::default()
        }
    }

    /// Integer `(rows, cols)` downsampling factors from native to target resolution.
    ///
    /// Upsampling is not supported and the target resolution
    /// must divide the native resolution.
    pub fn downscale(&self) -> Result<(usize, usize)> {
        let (native_h, native_w) = self.native;
        let (h, w) = self.resolution;
        if h == 0 || w == 0 || h > native_h || w > native_w {
            return Err(Error::InvalidResolution(format!(
                "cannot go from {}x{} to {}x{}",
                native_h, native_w, h, w
            )));
        }
        if native_h % h != 0 || native_w % w != 0 {
            return Err(Error::InvalidResolution(format!(
                "{}x{} is not a divisor of {}x{}",
                h, w, native_h, native_w
            )));
        }
        Ok((native_h / h, native_w / w))
    }

    /// Camera with intrinsics expressed at the target resolution.
    #[allow(clippy::cast_precision_loss)]
    fn rescaled(&self, camera: &Camera) -> Result<Camera> {
        let (fr, fc) = self.downscale()?;
        Ok(camera.rescaled((fr as Float, fc as Float)))
    }
}

/// Point cloud with a parallel validity mask.
#[derive(PartialEq, Debug, Clone)]
pub struct MaskedCloud {
    /// All points, valid or not.
    pub points: Vec<Point3>,
    /// `mask[i]` tells if `points[i]` is valid.
    pub mask: Vec<bool>,
}

impl MaskedCloud {
    /// Only the valid points, in their original order.
    pub fn selected(&self) -> Vec<Point3> {
        helper::boolean_mask(&self.points, &self.mask)
    }

    /// Number of valid points.
    pub fn nb_selected(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }
}

/// Output of the projection of a point cloud.
#[derive(PartialEq, Debug, Clone)]
pub struct Rendering {
    /// Encoded depth image, `depth::BACKGROUND` where no point was projected.
    pub depth: DMatrix<Float>,
    /// For each input point, is it the front-most point of its pixel.
    pub mask: Vec<bool>,
}

// INVERSE PROJECTION ################################################

/// Transform depth images into point clouds in world coordinates.
///
/// Each returned cloud has one point per pixel of the target resolution,
/// in row major order (pixel `(i, j)` is point `i * width + j`).
/// Points of background pixels are still computed but masked out.
pub fn inverse_projection(
    config: &Config,
    depths: &[DMatrix<Float>],
    cameras: &[Camera],
) -> Result<Batch<MaskedCloud>> {
    error::check_same_len("cameras", depths.len(), cameras.len())?;
    let factors = config.downscale()?;
    depths
        .iter()
        .zip(cameras)
        .map(|(depth, camera)| {
            if depth.shape() != config.native {
                return Err(Error::ShapeMismatch(format!(
                    "depth image is {:?} instead of {:?}",
                    depth.shape(),
                    config.native
                )));
            }
            let camera = config.rescaled(camera)?;
            if factors == (1, 1) {
                inverse_project_one(&config.codec, depth, &camera)
            } else {
                inverse_project_one(&config.codec, &depth::min_pool(depth, factors), &camera)
            }
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn inverse_project_one(
    codec: &DepthCodec,
    depth: &DMatrix<Float>,
    camera: &Camera,
) -> Result<MaskedCloud> {
    let k_inv = camera.inverse_intrinsics()?;
    let e_inv = camera.inverse_extrinsics()?;
    let (height, width) = depth.shape();
    let mut points = Vec::with_capacity(height * width);
    let mut mask = Vec::with_capacity(height * width);
    for i in 0..height {
        for j in 0..width {
            let z = codec.decode(depth[(i, j)]);
            mask.push(codec.is_foreground(z));
            let camera_point = k_inv * Vec3::new(j as Float * z, i as Float * z, z);
            points.push(helper::transform_point(&e_inv, &Point3::from(camera_point)));
        }
    }
    Ok(MaskedCloud { points, mask })
}

// PROJECTION ########################################################

/// A point that landed inside the image with a valid depth.
struct Splat {
    /// Index of the sample in the batch.
    batch: usize,
    /// Index of the point in its cloud.
    point: usize,
    /// Flattened `(batch, row, col)` index.
    segment: usize,
    /// Encoded depth.
    depth: Float,
}

/// Render point clouds into encoded depth images with a z-buffer.
///
/// Intrinsics are rescaled to the target resolution before projecting.
/// Pixel coordinates are rounded half to even.
/// Points projecting outside of the image are discarded, and so are points with a depth
/// outside of the codec range `[codec.min, codec.max]`. With the default codec this range
/// is `[0, 10]`, with a custom codec it follows the codec bounds.
/// For every pixel, the points with the smallest depth are visible.
/// All points tying that smallest depth are visible, not only one of them.
pub fn projection(
    config: &Config,
    clouds: &[Vec<Point3>],
    cameras: &[Camera],
) -> Result<Batch<Rendering>> {
    error::check_same_len("cameras", clouds.len(), cameras.len())?;
    config.downscale()?;
    let (height, width) = config.resolution;
    let pixels = height * width;

    // Flatten all points of the batch that land inside the image.
    let mut splats = Vec::new();
    for (b, cloud, camera) in izip!(0.., clouds, cameras) {
        let camera = config.rescaled(camera)?;
        for (n, point) in cloud.iter().enumerate() {
            let uvz = camera.project(point);
            if let Some((row, col)) = pixel(&uvz, height, width) {
                if config.codec.in_range(uvz.z) {
                    splats.push(Splat {
                        batch: b,
                        point: n,
                        segment: b * pixels + row * width + col,
                        depth: config.codec.encode(uvz.z),
                    });
                }
            }
        }
    }

    // Nearest depth of every pixel.
    let mut front = vec![Float::INFINITY; clouds.len() * pixels];
    for splat in &splats {
        let current = &mut front[splat.segment];
        *current = current.min(splat.depth);
    }

    // Visibility of each input point.
    let mut masks: Batch<Vec<bool>> = clouds.iter().map(|c| vec![false; c.len()]).collect();
    for splat in splats.iter().filter(|s| s.depth - front[s.segment] <= 0.0) {
        masks[splat.batch][splat.point] = true;
    }
    log::debug!(
        "Projected {} points of a batch of {}, {} of them inside the images",
        clouds.iter().map(Vec::len).sum::<usize>(),
        clouds.len(),
        splats.len()
    );

    let renderings = masks
        .into_iter()
        .zip(front.chunks(pixels.max(1)))
        .map(|(mask, front)| Rendering {
            depth: DMatrix::from_fn(height, width, |i, j| {
                let z = front[i * width + j];
                if z.is_finite() {
                    z
                } else {
                    depth::BACKGROUND
                }
            }),
            mask,
        })
        .collect();
    Ok(renderings)
}

/// Rounded pixel `(row, col)` of homogeneous pixel coordinates,
/// `None` if outside of the image. Ties round to even, so `-0.5` is still column 0.
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_precision_loss)]
fn pixel(uvz: &Vec3, height: usize, width: usize) -> Option<(usize, usize)> {
    let x = (uvz.x / (uvz.z + EPSILON)).round_ties_even();
    let y = (uvz.y / (uvz.z + EPSILON)).round_ties_even();
    if x >= 0.0 && x < width as Float && y >= 0.0 && y < height as Float {
        Some((y as usize, x as usize))
    } else {
        None
    }
}

// TESTS #############################################################
