// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Diversity loss between outputs generated from different latent codes.
//!
//! Two outputs should be at least as far apart as their latent codes,
//! up to a factor `alpha`. The loss of a pair is
//! `max(|r1 - r2| - alpha * d(pc1, pc2), 0)`.

use crate::math::pairs;
use crate::math::point_set::PointSetDistance;
use crate::misc::error::{self, Error, Result};
use crate::misc::helper;
use crate::misc::type_aliases::{Batch, DVec, Float, Point3};

/// Configuration of the diversity loss.
#[derive(PartialEq, Debug, Clone)]
pub struct Config {
    /// Weight of the point cloud distance against the latent distance.
    pub alpha: Float,
}

impl Default for Config {
    fn default() -> Self {
        Self { alpha: 0.2 }
    }
}

/// Batch of outputs generated from one latent code per sample.
#[derive(Debug, Clone, Copy)]
pub struct Output<'a> {
    /// Latent code of each sample.
    pub latents: &'a [DVec],
    /// Point cloud of each sample.
    pub clouds: &'a [Vec<Point3>],
}

/// Diversity loss of two batches of outputs, averaged over the batch.
///
/// Nearest neighbor distances are scaled.
/// Not symmetric in general since the point set distance may not be.
pub fn pair_loss<D: PointSetDistance>(
    distance: &D,
    alpha: Float,
    first: Output,
    second: Output,
) -> Result<Float> {
    let batch_size = first.latents.len();
    if batch_size == 0 {
        return Err(Error::EmptyBatch);
    }
    error::check_same_len("latent codes", batch_size, second.latents.len())?;
    error::check_same_len("point clouds", batch_size, first.clouds.len())?;
    error::check_same_len("point clouds", batch_size, second.clouds.len())?;

    let losses: Batch<Float> = (0..batch_size)
        .map(|b| {
            let (r1, r2) = (&first.latents[b], &second.latents[b]);
            if r1.len() != r2.len() {
                return Err(Error::ShapeMismatch(format!(
                    "latent codes of dimensions {} and {}",
                    r1.len(),
                    r2.len()
                )));
            }
            let dist_r = (r1 - r2).norm();
            let dist_pc = distance
                .distance(&first.clouds[b], &second.clouds[b])
                .scaled();
            Ok((dist_r - alpha * dist_pc).max(0.0))
        })
        .collect::<Result<_>>()?;
    Ok(helper::mean(&losses))
}

/// Diversity loss of `rand_num` batches of outputs.
///
/// `latents[r][b]` and `clouds[r][b]` are the latent code and the point cloud
/// of sample `b` generated with the random input `r`.
/// The result is the mean of `pair_loss` over all pairs of random inputs.
#[allow(clippy::cast_precision_loss)]
pub fn diversity_loss<D: PointSetDistance>(
    config: &Config,
    distance: &D,
    latents: &[Batch<DVec>],
    clouds: &[Batch<Vec<Point3>>],
) -> Result<Float> {
    let rand_num = latents.len();
    error::check_same_len("random outputs", rand_num, clouds.len())?;
    if rand_num < 2 {
        return Err(Error::InvalidConfig(format!(
            "at least 2 random outputs are required, got {}",
            rand_num
        )));
    }
    let output = |r: usize| Output {
        latents: &latents[r],
        clouds: &clouds[r],
    };
    let mut loss = 0.0;
    for (i, j) in pairs::pairs(rand_num) {
        loss += pair_loss(distance, config.alpha, output(i), output(j))?;
    }
    Ok(loss / pairs::nb_pairs(rand_num) as Float)
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use crate::math::point_set::{Distance, Metric, NearestNeighbor};
    use approx;

    fn line(offset: Float) -> Vec<Point3> {
        (0..4)
            .map(|i| Point3::new(i as Float * 0.5 + offset, 0.0, 0.0))
            .collect()
    }

    fn latent(values: &[Float]) -> DVec {
        DVec::from_row_slice(values)
    }

    #[test]
    fn identical_outputs_pay_latent_distance() {
        let latents1 = vec![latent(&[0.0, 0.0])];
        let latents2 = vec![latent(&[3.0, 4.0])];
        let clouds = vec![line(0.0)];
        let first = Output {
            latents: &latents1,
            clouds: &clouds,
        };
        let second = Output {
            latents: &latents2,
            clouds: &clouds,
        };
        let loss = pair_loss(&NearestNeighbor, 0.2, first, second).unwrap();
        assert!(approx::relative_eq!(5.0, loss, epsilon = 1e-5));
    }

    #[test]
    fn diverse_enough_outputs_pay_nothing() {
        let latents1 = vec![latent(&[0.0]), latent(&[0.0])];
        let latents2 = vec![latent(&[0.1]), latent(&[1.0])];
        let clouds1 = vec![line(0.0), line(0.0)];
        let clouds2 = vec![line(0.1), line(0.1)];
        let first = Output {
            latents: &latents1,
            clouds: &clouds1,
        };
        let second = Output {
            latents: &latents2,
            clouds: &clouds2,
        };
        // Scaled nearest neighbor distance is 100 * (0.01 + 0.01) = 2,
        // so each sample pays max(|dr| - 0.4, 0).
        let loss = pair_loss(&NearestNeighbor, 0.2, first, second).unwrap();
        assert!(approx::relative_eq!(0.3, loss, epsilon = 1e-4));
    }

    /// A point set distance that only counts the size of the first set.
    struct FirstSize;

    impl PointSetDistance for FirstSize {
        fn distance(&self, a: &[Point3], _b: &[Point3]) -> Distance {
            Distance::Matching(a.len() as Float)
        }

        fn is_matching(&self) -> bool {
            true
        }
    }

    #[test]
    fn pair_loss_follows_the_literal_formula() {
        let latents1 = vec![latent(&[0.0, 0.0])];
        let latents2 = vec![latent(&[0.0, 2.0])];
        let clouds1 = vec![line(0.0)];
        let clouds2 = vec![vec![Point3::origin()]];
        let first = Output {
            latents: &latents1,
            clouds: &clouds1,
        };
        let second = Output {
            latents: &latents2,
            clouds: &clouds2,
        };
        // max(2 - 0.25 * 4, 0) and max(2 - 0.25 * 1, 0).
        assert_eq!(Ok(1.0), pair_loss(&FirstSize, 0.25, first, second));
        assert_eq!(Ok(1.75), pair_loss(&FirstSize, 0.25, second, first));
    }

    #[test]
    fn diversity_loss_averages_pairs() {
        let latents = vec![
            vec![latent(&[0.0])],
            vec![latent(&[1.0])],
            vec![latent(&[3.0])],
        ];
        let clouds = vec![vec![line(0.0)], vec![line(0.0)], vec![line(0.0)]];
        // Identical clouds: latent distances 1, 3 and 2.
        let loss =
            diversity_loss(&Config::default(), &Metric::NearestNeighbor, &latents, &clouds)
                .unwrap();
        assert!(approx::relative_eq!(2.0, loss, epsilon = 1e-5));
    }

    #[test]
    fn diversity_loss_needs_two_outputs() {
        let latents = vec![vec![latent(&[0.0])]];
        let clouds = vec![vec![line(0.0)]];
        let result = diversity_loss(&Config::default(), &NearestNeighbor, &latents, &clouds);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
