//! Mapping from viewport pixels to the complex plane.

use crate::{complex::Complex, error::Error, screen};

/// The visible window of the complex plane: a centre, and world units per pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewState {
    center: Complex,
    zoom: f32,
}

impl ViewState {
    pub const DEFAULT_CENTER: Complex = Complex::new(-0.4, 0.0);
    pub const DEFAULT_ZOOM: f32 = 1.0 / 250.0;

    pub fn new(center: Complex, zoom: f32) -> Result<Self, Error> {
        if !center.is_finite() {
            return Err(Error::InvalidCenter {
                real: center.real,
                imaginary: center.imaginary,
            });
        }
        check_zoom(zoom)?;
        Ok(Self { center, zoom })
    }

    pub fn center(&self) -> Complex {
        self.center
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Size of the visible window in world units.
    pub fn extent(&self, viewport: screen::Size) -> (f32, f32) {
        (
            viewport.width as f32 * self.zoom,
            viewport.height as f32 * self.zoom,
        )
    }

    /// Map a unit-square coordinate onto the visible window.
    ///
    /// `(0.5, 0.5)` is the centre; the map is affine in `normalized`.
    pub fn project(&self, normalized: (f32, f32), viewport: screen::Size) -> Complex {
        project(self.center, self.extent(viewport), normalized)
    }

    pub fn pan(&mut self, delta: Complex) -> Result<(), Error> {
        let center = self.center + delta;
        if !center.is_finite() {
            return Err(Error::InvalidCenter {
                real: center.real,
                imaginary: center.imaginary,
            });
        }
        self.center = center;
        Ok(())
    }

    /// Pan by a distance measured in pixels.
    pub fn pan_pixels(&mut self, dx: f32, dy: f32) -> Result<(), Error> {
        self.pan(Complex::new(dx * self.zoom, dy * self.zoom))
    }

    pub fn set_zoom(&mut self, zoom: f32) -> Result<(), Error> {
        check_zoom(zoom)?;
        self.zoom = zoom;
        Ok(())
    }

    /// Multiply the zoom; `factor < 1` zooms in.
    pub fn zoom_by(&mut self, factor: f32) -> Result<(), Error> {
        check_zoom(factor)?;
        self.set_zoom(self.zoom * factor)
    }

    /// Zoom while keeping the point under `normalized` in place.
    pub fn zoom_about(
        &mut self,
        normalized: (f32, f32),
        viewport: screen::Size,
        factor: f32,
    ) -> Result<(), Error> {
        let anchor = self.project(normalized, viewport);
        let mut zoomed = *self;
        zoomed.zoom_by(factor)?;

        // The anchor moves by (new - old) extent scaled by its offset from the centre.
        let moved = zoomed.project(normalized, viewport);
        zoomed.pan(Complex::new(
            anchor.real - moved.real,
            anchor.imaginary - moved.imaginary,
        ))?;

        *self = zoomed;
        Ok(())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            center: Self::DEFAULT_CENTER,
            zoom: Self::DEFAULT_ZOOM,
        }
    }
}

/// Shared by the CPU evaluator and, in WGSL, by `mandelbrot.wgsl`.
pub fn project(center: Complex, size: (f32, f32), normalized: (f32, f32)) -> Complex {
    Complex {
        real: center.real + (size.0 * (normalized.0 - 0.5)),
        imaginary: center.imaginary + (size.1 * (normalized.1 - 0.5)),
    }
}

fn check_zoom(zoom: f32) -> Result<(), Error> {
    if zoom.is_finite() && zoom > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidZoom(zoom))
    }
}
