// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Single step perturbation of inputs along the gradient of an objective.

use crate::misc::type_aliases::{DVec, Float};

/// Parameters of the perturbation.
#[derive(PartialEq, Debug, Clone)]
pub struct Config {
    /// Size of the step.
    pub eps: Float,
    /// Optional `(min, max)` bounds of perturbed values.
    pub clip: Option<(Float, Float)>,
    /// Step of the centered finite differences used by `fgsm`.
    pub step: Float,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            eps: 0.0,
            clip: Some((0.0, 1.0)),
            step: 1e-3,
        }
    }
}

/// Move inputs by `-eps * gradient`, then clip them if bounds are configured.
pub fn perturb(config: &Config, inputs: &DVec, gradient: &DVec) -> DVec {
    let moved = inputs - gradient * config.eps;
    match config.clip {
        Some((min, max)) => moved.map(|x| x.max(min).min(max)),
        None => moved,
    }
}

/// Gradient of a scalar function, estimated with centered differences.
pub fn central_gradient<F>(inputs: &DVec, step: Float, f: F) -> DVec
where
    F: Fn(&DVec) -> Float,
{
    let mut shifted = inputs.clone();
    DVec::from_fn(inputs.len(), |i, _| {
        let x = inputs[i];
        shifted[i] = x + step;
        let forward = f(&shifted);
        shifted[i] = x - step;
        let backward = f(&shifted);
        shifted[i] = x;
        (forward - backward) / (2.0 * step)
    })
}

/// Perturb inputs along the estimated gradient of `objective`.
///
/// Returns the perturbed inputs and the objective value at the original inputs.
pub fn fgsm<F>(config: &Config, inputs: &DVec, objective: F) -> (DVec, Float)
where
    F: Fn(&DVec) -> Float,
{
    let value = objective(inputs);
    let gradient = central_gradient(inputs, config.step, &objective);
    (perturb(config, inputs, &gradient), value)
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use approx;

    fn squared_norm(x: &DVec) -> Float {
        x.norm_squared()
    }

    #[test]
    fn gradient_of_squared_norm() {
        let x = DVec::from_row_slice(&[1.0, -2.0, 0.5]);
        let gradient = central_gradient(&x, 1e-2, squared_norm);
        let expected = DVec::from_row_slice(&[2.0, -4.0, 1.0]);
        assert!(approx::relative_eq!(expected, gradient, epsilon = 1e-2));
    }

    #[test]
    fn zero_eps_is_identity() {
        let x = DVec::from_row_slice(&[0.2, 0.8]);
        let config = Config::default();
        let (perturbed, value) = fgsm(&config, &x, squared_norm);
        assert_eq!(x, perturbed);
        assert!(approx::relative_eq!(0.68, value, epsilon = 1e-6));
    }

    #[test]
    fn perturbation_decreases_objective_and_clips() {
        let x = DVec::from_row_slice(&[0.5, 0.02]);
        let config = Config {
            eps: 0.1,
            clip: Some((0.0, 1.0)),
            step: 1e-3,
        };
        let gradient = DVec::from_row_slice(&[1.0, 1.0]);
        let perturbed = perturb(&config, &x, &gradient);
        assert!(approx::relative_eq!(0.4, perturbed[0], epsilon = 1e-6));
        assert_eq!(0.0, perturbed[1]);
        let unclipped = perturb(&Config { clip: None, ..config }, &x, &gradient);
        assert!(approx::relative_eq!(-0.08, unclipped[1], epsilon = 1e-6));
    }
}
