//! The mutable rendering state of one viewer, and the immutable snapshots frames are evaluated from.

use std::sync::Arc;

use log::debug;

use crate::{
    complex::Complex, error::Error, kernel::KernelParameters, palette::Palette, screen,
    view::ViewState,
};

/// Everything a frame needs, copied out of a [`Session`].
///
/// Evaluators only ever see a snapshot, so mutations that arrive mid-frame
/// apply to the next frame in full.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub viewport: screen::Size,
    pub view: ViewState,
    pub parameters: KernelParameters,
    pub palette: Arc<Palette>,
}

pub struct Session {
    viewport: screen::Size,
    view: ViewState,
    parameters: KernelParameters,
    palette: Arc<Palette>,
    dirty: bool,
}

impl Session {
    pub fn new(
        viewport: screen::Size,
        view: ViewState,
        parameters: KernelParameters,
        palette: Palette,
    ) -> Self {
        Self {
            viewport,
            view,
            parameters,
            palette: Arc::new(palette),
            dirty: true,
        }
    }

    pub fn viewport(&self) -> screen::Size {
        self.viewport
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn parameters(&self) -> &KernelParameters {
        &self.parameters
    }

    pub fn palette(&self) -> &Arc<Palette> {
        &self.palette
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            viewport: self.viewport,
            view: self.view,
            parameters: self.parameters,
            palette: Arc::clone(&self.palette),
        }
    }

    /// Whether anything changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub fn resize(&mut self, viewport: screen::Size) {
        debug!("resizing to {:?}", viewport);
        self.viewport = viewport;
        self.dirty = true;
    }

    pub fn pan(&mut self, delta: Complex) -> Result<(), Error> {
        self.update_view(|view| view.pan(delta))
    }

    pub fn pan_pixels(&mut self, dx: f32, dy: f32) -> Result<(), Error> {
        self.update_view(|view| view.pan_pixels(dx, dy))
    }

    pub fn zoom_by(&mut self, factor: f32) -> Result<(), Error> {
        self.update_view(|view| view.zoom_by(factor))
    }

    pub fn zoom_about(&mut self, normalized: (f32, f32), factor: f32) -> Result<(), Error> {
        let viewport = self.viewport;
        self.update_view(|view| view.zoom_about(normalized, viewport, factor))
    }

    pub fn reset_view(&mut self) {
        self.view.reset();
        self.dirty = true;
    }

    pub fn set_parameters(&mut self, parameters: KernelParameters) {
        self.parameters = parameters;
        self.dirty = true;
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = Arc::new(palette);
        self.dirty = true;
    }

    fn update_view(
        &mut self,
        update: impl FnOnce(&mut ViewState) -> Result<(), Error>,
    ) -> Result<(), Error> {
        // ViewState mutators leave the view untouched on error.
        update(&mut self.view)?;
        self.dirty = true;
        Ok(())
    }
}
