//! Helper functions for materials
//!
//! Math and utility functions that different materials can use.

use crate::config::{DETERMINANT_FLOOR, LOG_FLOOR};
use crate::math::Real;

/// Exact zero check inverse (prevents NaN from division by zero)
#[inline(always)]
pub fn inv_exact(e: Real) -> Real {
    if e == 0.0 { 0.0 } else { 1.0 / e }
}

/// Volume ratio clamped away from zero before it reaches a log or reciprocal.
#[inline(always)]
pub fn clamped_determinant(j: Real) -> Real {
    j.max(DETERMINANT_FLOOR)
}

/// Logarithm of a singular value, guarded against zero and sign flips.
#[inline(always)]
pub fn safe_ln(value: Real) -> Real {
    value.abs().max(LOG_FLOOR).ln()
}

/// Physics parameter conversions shared by every solid model.
pub mod physics {
    use crate::math::Real;

    /// Computes the Lamé parameters (lambda, mu) from Young's modulus and Poisson ratio
    #[inline]
    pub fn lame_lambda_mu(young_modulus: Real, poisson_ratio: Real) -> (Real, Real) {
        let lambda =
            young_modulus * poisson_ratio / ((1.0 + poisson_ratio) * (1.0 - 2.0 * poisson_ratio));
        let mu = shear_modulus(young_modulus, poisson_ratio);
        (lambda, mu)
    }

    /// Shear modulus (mu) from Young's modulus and Poisson ratio
    #[inline]
    pub fn shear_modulus(young_modulus: Real, poisson_ratio: Real) -> Real {
        young_modulus / (2.0 * (1.0 + poisson_ratio))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lame_parameters_match_closed_form() {
        let (lambda, mu) = physics::lame_lambda_mu(1e6, 0.2);
        assert!((mu - 1e6 / 2.4).abs() < 1e-1);
        assert!((lambda - 1e6 * 0.2 / (1.2 * 0.6)).abs() < 1e-1);
    }

    #[test]
    fn guards_against_degenerate_volumes() {
        assert_eq!(inv_exact(0.0), 0.0);
        assert_eq!(clamped_determinant(-3.0), DETERMINANT_FLOOR);
        assert!(safe_ln(0.0).is_finite());
    }
}
