//! The escape-time iteration.

use crate::{complex::Complex, error::Error};

/// Iteration budget and divergence threshold for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KernelParameters {
    max_iterations: u32,
    escape_radius_squared: f32,
}

impl KernelParameters {
    pub const DEFAULT_MAX_ITERATIONS: u32 = 20;
    pub const DEFAULT_ESCAPE_RADIUS_SQUARED: f32 = 10.0;

    /// `max_iterations` must be at least 2, since escape fractions divide by `max_iterations - 1`.
    pub fn new(max_iterations: u32, escape_radius_squared: f32) -> Result<Self, Error> {
        if max_iterations < 2 {
            return Err(Error::InvalidMaxIterations(max_iterations));
        }
        if !(escape_radius_squared.is_finite() && escape_radius_squared > 0.0) {
            return Err(Error::InvalidEscapeRadius(escape_radius_squared));
        }
        Ok(Self {
            max_iterations,
            escape_radius_squared,
        })
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn escape_radius_squared(&self) -> f32 {
        self.escape_radius_squared
    }

    pub fn with_max_iterations(self, max_iterations: u32) -> Result<Self, Error> {
        Self::new(max_iterations, self.escape_radius_squared)
    }

    /// Scale an escape count by `max_iterations - 1`.
    ///
    /// Not clamped: a point that never escapes yields `max / (max - 1)`, which
    /// [`Palette::index_for`](crate::palette::Palette::index_for) clamps.
    pub fn fraction(&self, escape_count: u32) -> f32 {
        escape_count as f32 / (self.max_iterations - 1) as f32
    }

    pub fn evaluate(&self, c: Complex) -> u32 {
        evaluate(c, self.max_iterations, self.escape_radius_squared)
    }
}

impl Default for KernelParameters {
    fn default() -> Self {
        Self {
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            escape_radius_squared: Self::DEFAULT_ESCAPE_RADIUS_SQUARED,
        }
    }
}

/**
Number of iterations of `z ← z² + c` before `|z|²` exceeds `escape_radius_squared`,
or `max_iterations` if it never does.

The recurrence is seeded with `z = c` rather than the textbook `z = 0`, so the
first magnitude tested is that of `c² + c`. `mandelbrot.wgsl` mirrors this
function line for line; keep them in sync.
*/
pub fn evaluate(c: Complex, max_iterations: u32, escape_radius_squared: f32) -> u32 {
    let mut z = c;
    for iteration in 0..max_iterations {
        let x = (z.real * z.real - z.imaginary * z.imaginary) + c.real;
        let y = (z.imaginary * z.real + z.real * z.imaginary) + c.imaginary;

        if x * x + y * y > escape_radius_squared {
            return iteration;
        }

        z = Complex::new(x, y);
    }
    max_iterations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_immediately_outside_radius() {
        for c in [
            Complex::new(3.0, 0.0),
            Complex::new(-2.5, 1.5),
            Complex::new(0.0, -4.0),
        ] {
            assert_eq!(evaluate(c, 50, c.norm_squared() * 0.5), 0, "{:?}", c);
        }
    }

    #[test]
    fn origin_never_escapes() {
        for max_iterations in [2, 3, 20, 1000] {
            assert_eq!(evaluate(Complex::ZERO, max_iterations, 10.0), max_iterations);
        }
    }

    #[test]
    fn recurrence_is_seeded_with_c() {
        // |c|² = 0.81 is under the threshold, but c² + c = 1.71 is not.
        assert_eq!(evaluate(Complex::new(0.9, 0.0), 10, 1.0), 0);
    }

    #[test]
    fn threshold_is_strict() {
        // c = -2: c² + c = 2 and stays there, so |z|² = 4 is never *greater* than 4.
        assert_eq!(evaluate(Complex::new(-2.0, 0.0), 10, 4.0), 10);
        assert_eq!(evaluate(Complex::new(-2.0, 0.0), 10, 3.99), 0);
    }

    #[test]
    fn raising_the_budget_keeps_escape_counts() {
        let points = [
            Complex::new(0.3, 0.5),
            Complex::new(-0.75, 0.1),
            Complex::new(0.26, 0.0),
            Complex::new(-1.3, 0.07),
        ];
        for c in points {
            let low = evaluate(c, 16, 4.0);
            let high = evaluate(c, 256, 4.0);
            assert!(high >= low, "{:?}: {} < {}", c, high, low);
            if low < 16 {
                assert_eq!(low, high, "{:?} escaped at a different iteration", c);
            }
        }
    }

    #[test]
    fn parameters_reject_degenerate_values() {
        assert!(matches!(
            KernelParameters::new(1, 4.0),
            Err(Error::InvalidMaxIterations(1))
        ));
        assert!(matches!(
            KernelParameters::new(0, 4.0),
            Err(Error::InvalidMaxIterations(0))
        ));
        assert!(matches!(
            KernelParameters::new(2, 0.0),
            Err(Error::InvalidEscapeRadius(_))
        ));
        assert!(matches!(
            KernelParameters::new(2, f32::NAN),
            Err(Error::InvalidEscapeRadius(_))
        ));
        assert!(KernelParameters::new(2, 4.0).is_ok());
    }

    #[test]
    fn default_parameters() {
        let parameters = KernelParameters::default();
        assert_eq!(parameters.max_iterations(), 20);
        assert_eq!(parameters.escape_radius_squared(), 10.0);
    }

    #[test]
    fn fraction_is_not_clamped() {
        let parameters = KernelParameters::new(5, 4.0).unwrap();
        assert_eq!(parameters.fraction(0), 0.0);
        assert_eq!(parameters.fraction(4), 1.0);
        assert_eq!(parameters.fraction(5), 1.25);
    }
}
