use bytemuck::{Pod, Zeroable};

/// Viewport dimensions in pixels.
///
/// Also bound as a uniform by `present.wgsl`.
#[repr(C)]
#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A viewport with no pixels to evaluate.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// The centre of pixel `(x, y)` in unit-square coordinates.
    ///
    /// Callers must not pass an empty size.
    pub fn normalize(&self, x: u32, y: u32) -> (f32, f32) {
        debug_assert!(!self.is_empty());
        (
            (x as f32 + 0.5) / self.width as f32,
            (y as f32 + 0.5) / self.height as f32,
        )
    }
}

impl From<winit::dpi::PhysicalSize<u32>> for Size {
    fn from(size: winit::dpi::PhysicalSize<u32>) -> Self {
        Self::new(size.width, size.height)
    }
}
