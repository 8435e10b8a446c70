// Copyright (c) netqasm-rs contributors.
// Licensed under the MIT License.

//! Dyadic-fraction approximation for rotation angles.
//!
//! Rotation gates are parameterized as `n * pi / 2^d` rather than by a raw
//! float, since that is what the wire instruction actually carries. When a
//! caller supplies a float angle instead of an exact `(n, d)` pair, it is
//! approximated by the binary fraction with the smallest denominator
//! exponent, up to [`MAX_DENOM_EXPONENT`], that stays within tolerance — the
//! same idea behind a single level of Solovay-Kitaev gate-sequence search,
//! applied here to a rotation parameter rather than a sequence of gates.

use std::f64::consts::PI;

const MAX_DENOM_EXPONENT: u8 = 30;
const TOLERANCE: f64 = 1e-9;

/// Approximates `angle` (radians) as `(n, d)` such that `angle ~= n * pi / 2^d`.
#[must_use]
pub fn angle_to_fraction(angle: f64) -> (i64, u8) {
    for d in 0..=MAX_DENOM_EXPONENT {
        let denom = 2f64.powi(i32::from(d));
        let n = (angle * denom / PI).round();
        let approx = n * PI / denom;
        if (approx - angle).abs() <= TOLERANCE {
            return (n as i64, d);
        }
    }
    let denom = 2f64.powi(i32::from(MAX_DENOM_EXPONENT));
    (((angle * denom / PI).round()) as i64, MAX_DENOM_EXPONENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_dyadic_angles_round_trip() {
        let (n, d) = angle_to_fraction(PI / 2.0);
        assert_eq!((n, d), (1, 1));

        let (n, d) = angle_to_fraction(PI);
        assert_eq!((n, d), (1, 0));
    }

    #[test]
    fn approximation_is_within_tolerance() {
        let angle = 0.123_456;
        let (n, d) = angle_to_fraction(angle);
        let approx = f64::from(n as i32) * PI / 2f64.powi(i32::from(d));
        assert!((approx - angle).abs() < 1e-6);
    }
}
