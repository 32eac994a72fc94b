// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Miscellaneous helper functions that didn't fit elsewhere.

use crate::misc::type_aliases::{Float, Mat4, Point3, Vec4};

/// Keep the values at positions where the mask is true.
/// Order of the kept values is preserved.
///
/// Panics if the mask and values do not have the same length.
pub fn boolean_mask<T: Clone>(values: &[T], mask: &[bool]) -> Vec<T> {
    assert_eq!(values.len(), mask.len(), "Mask length must match");
    values
        .iter()
        .zip(mask)
        .filter_map(|(v, &keep)| if keep { Some(v.clone()) } else { None })
        .collect()
}

/// Apply a 4x4 homogeneous transformation to a 3D point,
/// dropping the homogeneous coordinate without dividing by it.
pub fn transform_point(mat: &Mat4, point: &Point3) -> Point3 {
    let p = mat * Vec4::new(point.x, point.y, point.z, 1.0);
    Point3::new(p.x, p.y, p.z)
}

/// Arithmetic mean of a slice, 0 if it is empty.
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[Float]) -> Float {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<Float>() / values.len() as Float
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn boolean_mask_keeps_order() {
        let values = [1, 2, 3, 4, 5];
        let mask = [true, false, true, false, true];
        assert_eq!(vec![1, 3, 5], boolean_mask(&values, &mask));
    }

    #[test]
    fn transform_point_ignores_last_row() {
        let mut mat = Mat4::identity();
        mat.m14 = 1.0;
        mat.m44 = 2.0;
        let p = transform_point(&mat, &Point3::new(1.0, 2.0, 3.0));
        assert_eq!(Point3::new(2.0, 2.0, 3.0), p);
    }

    #[test]
    fn mean_of_empty_is_zero() {
        assert_eq!(0.0, mean(&[]));
        assert_eq!(2.0, mean(&[1.0, 2.0, 3.0]));
    }
}
