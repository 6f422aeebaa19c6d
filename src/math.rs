//! Small scalar helpers shared by the signal stages.

/// Linear interpolation from `a` to `b` by `t`.
///
/// Exact at `t = 0`, `t = 1` and the midpoint.
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}

/// `x` raised to `exponent`, with non-positive bases mapped to zero.
///
/// Signal curves only ever shape unipolar values, so this never yields NaN.
#[inline]
pub fn shape(x: f64, exponent: f64) -> f64 {
    if x <= 0.0 {
        0.0
    } else {
        libm::pow(x, exponent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lerp_endpoints() {
        assert_eq!(lerp(2.0, 6.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, 6.0, 1.0), 6.0);
        assert_eq!(lerp(2.0, 6.0, 0.5), 4.0);
    }

    #[test]
    fn test_lerp_midpoint_exact() {
        for &(a, b) in &[(0.03, 0.12), (1.8, 3.2), (0.06, 0.25), (-0.22, 0.35)] {
            assert_eq!(lerp(a, b, 0.5), (a + b) / 2.0);
        }
        assert_eq!(lerp(0.03, 0.12, 1.0), 0.12);
    }

    #[test]
    fn test_shape_clamps_negative() {
        assert_eq!(shape(-0.5, 0.7), 0.0);
        assert_eq!(shape(0.0, 1.4), 0.0);
        assert_relative_eq!(shape(0.25, 0.5), 0.5, epsilon = 1e-12);
    }
}
