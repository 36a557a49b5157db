use std::ops::Add;

use bytemuck::{Pod, Zeroable};

/// A point on the complex plane, laid out so it can be uploaded to the GPU as a `vec2<f32>`.
#[repr(C)]
#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq, Default)]
pub struct Complex {
    pub real: f32,
    pub imaginary: f32,
}

impl Complex {
    pub const ZERO: Self = Complex {
        real: 0.0,
        imaginary: 0.0,
    };

    pub const fn new(real: f32, imaginary: f32) -> Self {
        Self { real, imaginary }
    }

    pub fn norm_squared(self) -> f32 {
        self.real * self.real + self.imaginary * self.imaginary
    }

    pub fn is_finite(self) -> bool {
        self.real.is_finite() && self.imaginary.is_finite()
    }
}

impl Add for Complex {
    type Output = Complex;

    fn add(self, rhs: Complex) -> Complex {
        Complex {
            real: self.real + rhs.real,
            imaginary: self.imaginary + rhs.imaginary,
        }
    }
}

impl From<(f32, f32)> for Complex {
    fn from((real, imaginary): (f32, f32)) -> Self {
        Self { real, imaginary }
    }
}
