// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Distances between two unordered sets of 3D points.
//!
//! Two families are provided:
//! * matching distances, pairing points of both sets (approximate earth mover's distance),
//! * nearest neighbor distances, one for each direction (chamfer distance).
//!
//! Losses only rely on the `PointSetDistance` trait,
//! so any other implementation can be plugged in.

use crate::misc::type_aliases::{Float, Point3};

/// Scale applied to nearest neighbor distances in multi-view and diversity losses,
/// to bring them in the same range as matching distances.
pub const NN_DISTANCE_SCALE: Float = 100.0;

/// Result of a point set distance computation.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Distance {
    /// One distance for a one-to-one matching of both sets.
    Matching(Float),
    /// `Directional(a_to_b, b_to_a)` nearest neighbor distances.
    Directional(Float, Float),
}

impl Distance {
    /// Matching distance, or sum of both directional distances.
    pub fn total(&self) -> Float {
        match *self {
            Distance::Matching(d) => d,
            Distance::Directional(d1, d2) => d1 + d2,
        }
    }

    /// Same as `total` except that directional distances are scaled by `NN_DISTANCE_SCALE`.
    pub fn scaled(&self) -> Float {
        match *self {
            Distance::Matching(d) => d,
            Distance::Directional(d1, d2) => NN_DISTANCE_SCALE * (d1 + d2),
        }
    }
}

/// A dissimilarity measure between two point sets.
///
/// Implementations return a zero distance as soon as one of the sets is empty.
pub trait PointSetDistance {
    /// Distance between sets `a` and `b`.
    fn distance(&self, a: &[Point3], b: &[Point3]) -> Distance;

    /// Whether points are matched one-to-one.
    /// Matching distances are more costly in time and memory.
    fn is_matching(&self) -> bool;
}

/// Runtime selection of a point set distance.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Metric {
    /// See `ApproxMatch`.
    ApproxMatch,
    /// See `NearestNeighbor`.
    NearestNeighbor,
}

impl Metric {
    /// `ApproxMatch` if `is_emd` else `NearestNeighbor`.
    pub fn from_emd_flag(is_emd: bool) -> Metric {
        if is_emd {
            Metric::ApproxMatch
        } else {
            Metric::NearestNeighbor
        }
    }
}

impl PointSetDistance for Metric {
    fn distance(&self, a: &[Point3], b: &[Point3]) -> Distance {
        match self {
            Metric::ApproxMatch => ApproxMatch::default().distance(a, b),
            Metric::NearestNeighbor => NearestNeighbor.distance(a, b),
        }
    }

    fn is_matching(&self) -> bool {
        *self == Metric::ApproxMatch
    }
}

fn warn_if_empty(a: &[Point3], b: &[Point3]) -> bool {
    let empty = a.is_empty() || b.is_empty();
    if empty {
        log::warn!(
            "Point set distance between {} and {} points defaults to 0",
            a.len(),
            b.len()
        );
    }
    empty
}

// NEAREST NEIGHBOR ##################################################

/// Mean squared distance of each point to its nearest neighbor in the other set,
/// in both directions.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct NearestNeighbor;

impl PointSetDistance for NearestNeighbor {
    fn distance(&self, a: &[Point3], b: &[Point3]) -> Distance {
        if warn_if_empty(a, b) {
            return Distance::Directional(0.0, 0.0);
        }
        Distance::Directional(mean_nearest(a, b), mean_nearest(b, a))
    }

    fn is_matching(&self) -> bool {
        false
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_nearest(from: &[Point3], to: &[Point3]) -> Float {
    let sum: Float = from
        .iter()
        .map(|p| {
            to.iter()
                .map(|q| (p - q).norm_squared())
                .fold(Float::INFINITY, Float::min)
        })
        .sum();
    sum / from.len() as Float
}

// APPROXIMATE MATCHING ##############################################

/// Approximate earth mover's distance.
///
/// Both sets are given the same total mass, spread evenly over their points.
/// A soft assignment is then built iteratively, from a very sharp affinity
/// `exp(-4^level * d^2)` down to a uniform one, each iteration distributing
/// the mass that is still unassigned.
/// The distance is the cost of the assignment (mass times euclidean distance)
/// divided by the size of the biggest set.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ApproxMatch {
    /// Levels of the affinity sharpness, from sharpest to smoothest.
    /// The last iteration always uses a uniform affinity.
    pub levels: (i32, i32),
}

impl Default for ApproxMatch {
    fn default() -> Self {
        Self { levels: (7, -1) }
    }
}

impl PointSetDistance for ApproxMatch {
    fn distance(&self, a: &[Point3], b: &[Point3]) -> Distance {
        if warn_if_empty(a, b) {
            return Distance::Matching(0.0);
        }
        Distance::Matching(self.cost(a, b))
    }

    fn is_matching(&self) -> bool {
        true
    }
}

impl ApproxMatch {
    /// Soft assignment between `a` and `b`, as a row major `|a| x |b|` matrix.
    #[allow(clippy::cast_precision_loss)]
    #[allow(clippy::many_single_char_names)]
    pub fn assignment(&self, a: &[Point3], b: &[Point3]) -> Vec<Float> {
        let (n, m) = (a.len(), b.len());
        let biggest = n.max(m) as Float;
        let mut remain_a = vec![biggest / n as Float; n];
        let mut remain_b = vec![biggest / m as Float; m];
        let mut assignment = vec![0.0; n * m];
        let mut weight = vec![0.0; n * m];
        let squared: Vec<Float> = a
            .iter()
            .flat_map(|p| b.iter().map(move |q| (p - q).norm_squared()))
            .collect();

        let (sharpest, smoothest) = self.levels;
        let sharpness = (smoothest..=sharpest)
            .rev()
            .map(|level| -(4.0 as Float).powi(level))
            .chain(std::iter::once(0.0));
        for sharpness in sharpness {
            // Affinity of every pair, weighted by what b still can receive.
            for k in 0..n {
                let row = &mut weight[k * m..(k + 1) * m];
                let mut sum = 1e-9;
                for l in 0..m {
                    row[l] = (sharpness * squared[k * m + l]).exp() * remain_b[l];
                    sum += row[l];
                }
                let scale = remain_a[k] / sum;
                row.iter_mut().for_each(|w| *w *= scale);
            }
            // Do not give b more than it can receive.
            for l in 0..m {
                let received: Float = (0..n).map(|k| weight[k * m + l]).sum();
                let ratio = (remain_b[l] / (received + 1e-9)).min(1.0);
                (0..n).for_each(|k| weight[k * m + l] *= ratio);
                remain_b[l] = (remain_b[l] - received).max(0.0);
            }
            // Commit the assigned mass.
            for k in 0..n {
                let row = &weight[k * m..(k + 1) * m];
                let given: Float = row.iter().sum();
                remain_a[k] = (remain_a[k] - given).max(0.0);
                for (l, w) in row.iter().enumerate() {
                    assignment[k * m + l] += w;
                }
            }
        }
        assignment
    }

    /// Cost of the soft assignment, normalized by the size of the biggest set.
    #[allow(clippy::cast_precision_loss)]
    pub fn cost(&self, a: &[Point3], b: &[Point3]) -> Float {
        let m = b.len();
        let assignment = self.assignment(a, b);
        let total: Float = a
            .iter()
            .enumerate()
            .flat_map(|(k, p)| {
                let assignment = &assignment;
                b.iter()
                    .enumerate()
                    .map(move |(l, q)| assignment[k * m + l] * (p - q).norm())
            })
            .sum();
        total / a.len().max(m) as Float
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use approx;
    use quickcheck_macros;

    fn square(offset: Float) -> Vec<Point3> {
        vec![
            Point3::new(offset, 0.0, 0.0),
            Point3::new(offset + 1.0, 0.0, 0.0),
            Point3::new(offset, 1.0, 0.0),
            Point3::new(offset + 1.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn identical_sets_are_at_zero_distance() {
        let a = square(0.0);
        assert_eq!(Distance::Directional(0.0, 0.0), NearestNeighbor.distance(&a, &a));
        let d = ApproxMatch::default().distance(&a, &a).total();
        assert!(approx::abs_diff_eq!(0.0, d, epsilon = 1e-3));
    }

    #[test]
    fn translated_sets() {
        let (a, b) = (square(0.0), square(0.1));
        let nn = NearestNeighbor.distance(&a, &b);
        if let Distance::Directional(d1, d2) = nn {
            assert!(approx::relative_eq!(0.01, d1, epsilon = 1e-5));
            assert!(approx::relative_eq!(0.01, d2, epsilon = 1e-5));
        } else {
            panic!("Expected directional distances");
        }
        assert!(approx::relative_eq!(2.0, nn.scaled(), epsilon = 1e-3));
        let emd = ApproxMatch::default().distance(&a, &b).total();
        assert!(approx::relative_eq!(0.1, emd, epsilon = 1e-2));
    }

    #[test]
    fn nearest_neighbor_is_asymmetric() {
        let a = vec![Point3::origin()];
        let b = vec![Point3::origin(), Point3::new(2.0, 0.0, 0.0)];
        assert_eq!(Distance::Directional(0.0, 2.0), NearestNeighbor.distance(&a, &b));
    }

    #[test]
    fn empty_sets_are_at_zero_distance() {
        let a = square(0.0);
        assert_eq!(0.0, NearestNeighbor.distance(&a, &[]).total());
        assert_eq!(0.0, ApproxMatch::default().distance(&[], &a).total());
        assert_eq!(0.0, Metric::ApproxMatch.distance(&[], &[]).total());
    }

    #[test]
    fn assignment_preserves_mass() {
        let a = square(0.0);
        let b = vec![Point3::new(0.5, 0.5, 0.0), Point3::new(3.0, 0.0, 0.0)];
        let assignment = ApproxMatch::default().assignment(&a, &b);
        // Each point of the smaller set receives twice the mass.
        for l in 0..2 {
            let received: Float = (0..4).map(|k| assignment[k * 2 + l]).sum();
            assert!(approx::relative_eq!(2.0, received, epsilon = 1e-3));
        }
    }

    #[test]
    fn metric_selection() {
        assert!(Metric::from_emd_flag(true).is_matching());
        assert!(!Metric::from_emd_flag(false).is_matching());
    }

    // PROPERTY TESTS ################################################

    #[quickcheck_macros::quickcheck]
    fn nearest_neighbor_to_superset(coords: Vec<(i8, i8, i8)>, extra: (i8, i8, i8)) -> bool {
        let to_point = |&(x, y, z): &(i8, i8, i8)| {
            Point3::new(Float::from(x), Float::from(y), Float::from(z))
        };
        let a: Vec<Point3> = coords.iter().map(to_point).collect();
        let mut superset = a.clone();
        superset.push(to_point(&extra));
        match NearestNeighbor.distance(&a, &superset) {
            Distance::Directional(d1, d2) => d1 == 0.0 && d2 >= 0.0,
            Distance::Matching(_) => false,
        }
    }
}
