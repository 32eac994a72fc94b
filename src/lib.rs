// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Projection and loss functions for multi-view point cloud learning.
//!
//! Predicted point clouds are rendered into 16 bits depth images with a z-buffer,
//! and ground truth depth images are lifted back into point clouds.
//! Losses built on top of those transforms compare them with a point set distance:
//!
//! * [`front_loss`](crate::core::loss::front::front_loss): visible part of a prediction
//!   against the ground truth depth of the same view.
//! * [`consistency_loss`](crate::core::loss::consistency::consistency_loss):
//!   predictions of the same object seen from two views.
//! * [`diversity_loss`](crate::core::loss::diversity::diversity_loss):
//!   outputs sampled from different latent codes.

#![warn(missing_docs)]

pub mod core;
pub mod math;
pub mod misc;
