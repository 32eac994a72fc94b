// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Core functionalities: cameras, depth images, projections and losses.

pub mod camera;
pub mod depth;
pub mod loss;
pub mod perturbation;
pub mod projection;
