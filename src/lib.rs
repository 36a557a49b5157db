/*!
Escape-time rendering of the Mandelbrot set.

A [`Session`] holds the current view, kernel parameters and palette. Each frame
a [`Snapshot`] is taken from it and handed to a [`PixelEvaluator`], either the
[`CpuEvaluator`] or the [`GpuEvaluator`]; both compute the same pixels.
*/

pub mod colour;
pub mod command_buffer;
pub mod command_encoder;
pub mod complex;
pub mod compute;
pub mod config;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod kernel;
pub mod palette;
pub mod present;
pub mod screen;
pub mod session;
pub mod typed_buffer;
pub mod var;
pub mod view;

pub use colour::{ColourMixer, Gradient, Gradients, Rgb};
pub use complex::Complex;
pub use error::Error;
pub use frame::{CpuEvaluator, Frame, PixelEvaluator};
pub use gpu::GpuEvaluator;
pub use kernel::KernelParameters;
pub use palette::Palette;
pub use session::{Session, Snapshot};
pub use view::ViewState;
