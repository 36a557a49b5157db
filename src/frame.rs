//! Whole-frame evaluation on the CPU.

use log::{debug, trace};
use rayon::prelude::{IndexedParallelIterator, ParallelIterator, ParallelSliceMut};

use crate::{colour::Rgb, error::Error, kernel, screen, session::Snapshot, view};

/// Per-pixel results, row-major. Row `0` is the row with the smallest imaginary part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub size: screen::Size,
    pub escapes: Vec<u32>,
    pub colours: Vec<Rgb>,
}

impl Frame {
    /// The frame of a viewport with no pixels.
    pub fn empty(size: screen::Size) -> Self {
        debug_assert!(size.is_empty());
        Self {
            size,
            escapes: Vec::new(),
            colours: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.escapes.is_empty()
    }

    pub fn escape_count(&self, x: u32, y: u32) -> u32 {
        self.escapes[self.index(x, y)]
    }

    pub fn colour(&self, x: u32, y: u32) -> Rgb {
        self.colours[self.index(x, y)]
    }

    fn index(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.size.width && y < self.size.height);
        y as usize * self.size.width as usize + x as usize
    }
}

/// Something that can turn a [`Snapshot`] into a [`Frame`].
///
/// Implementations must agree pixel for pixel: same sampling convention, same
/// `f32` arithmetic as [`kernel::evaluate`] and [`view::project`].
pub trait PixelEvaluator {
    fn render(&mut self, snapshot: &Snapshot) -> Result<Frame, Error>;
}

/// Evaluate and colour a single pixel.
pub fn shade(snapshot: &Snapshot, size: (f32, f32), x: u32, y: u32) -> (u32, Rgb) {
    let c = view::project(
        snapshot.view.center(),
        size,
        snapshot.viewport.normalize(x, y),
    );
    let escape = kernel::evaluate(
        c,
        snapshot.parameters.max_iterations(),
        snapshot.parameters.escape_radius_squared(),
    );
    let colour = snapshot
        .palette
        .colour_for(snapshot.parameters.fraction(escape));
    (escape, colour)
}

/// Evaluates rows in parallel on a dedicated [`rayon`] pool.
pub struct CpuEvaluator {
    pool: rayon::ThreadPool,
}

impl CpuEvaluator {
    /// `threads == 0` uses one thread per logical CPU; `1` evaluates sequentially.
    pub fn new(threads: usize) -> Result<Self, Error> {
        let threads = if threads == 0 {
            num_cpus::get()
        } else {
            threads
        };
        debug!("cpu evaluator using {} threads", threads);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("mandelbrot-{}", index))
            .build()?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl PixelEvaluator for CpuEvaluator {
    fn render(&mut self, snapshot: &Snapshot) -> Result<Frame, Error> {
        let viewport = snapshot.viewport;
        if viewport.is_empty() {
            debug!("skipping frame for empty viewport {:?}", viewport);
            return Ok(Frame::empty(viewport));
        }

        trace!("begin cpu frame {:?}", viewport);

        let width = viewport.width as usize;
        let size = snapshot.view.extent(viewport);
        let mut escapes = vec![0; viewport.pixel_count()];
        let mut colours = vec![Rgb::BLACK; viewport.pixel_count()];

        self.pool.install(|| {
            escapes
                .par_chunks_mut(width)
                .zip(colours.par_chunks_mut(width))
                .enumerate()
                .for_each(|(y, (escape_row, colour_row))| {
                    for (x, (escape, colour)) in
                        escape_row.iter_mut().zip(colour_row.iter_mut()).enumerate()
                    {
                        (*escape, *colour) = shade(snapshot, size, x as u32, y as u32);
                    }
                })
        });

        trace!("end cpu frame");

        Ok(Frame {
            size: viewport,
            escapes,
            colours,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        colour::{ColourMixer, Gradients},
        complex::Complex,
        kernel::KernelParameters,
        palette::Palette,
        view::ViewState,
    };

    fn snapshot(
        viewport: screen::Size,
        view: ViewState,
        parameters: KernelParameters,
    ) -> Snapshot {
        Snapshot {
            viewport,
            view,
            parameters,
            palette: Arc::new(Palette::build(&Gradients::builtin(), "rainbow", 256).unwrap()),
        }
    }

    #[test]
    fn two_by_two_unit_view() {
        let snapshot = snapshot(
            screen::Size::new(2, 2),
            ViewState::new(Complex::ZERO, 1.0).unwrap(),
            KernelParameters::new(2, 4.0).unwrap(),
        );
        let frame = CpuEvaluator::new(1).unwrap().render(&snapshot).unwrap();

        assert_eq!(frame.size, screen::Size::new(2, 2));
        assert_eq!(frame.escapes, vec![2, 2, 2, 2]);

        // 2 / (2 - 1) = 2.0, clamped to the last palette entry.
        let last = snapshot.palette.get(255).unwrap();
        assert_eq!(frame.colours, vec![last; 4]);
        assert_eq!(last, Gradients::builtin().mix("rainbow", 1.0).unwrap());
    }

    #[test]
    fn pixel_centres_map_to_quadrants() {
        let viewport = screen::Size::new(2, 2);
        let view = ViewState::new(Complex::ZERO, 1.0).unwrap();
        let expected = [
            ((0, 0), Complex::new(-0.5, -0.5)),
            ((1, 0), Complex::new(0.5, -0.5)),
            ((0, 1), Complex::new(-0.5, 0.5)),
            ((1, 1), Complex::new(0.5, 0.5)),
        ];
        for ((x, y), c) in expected {
            assert_eq!(view.project(viewport.normalize(x, y), viewport), c);
        }
    }

    #[test]
    fn empty_viewport_is_skipped() {
        let mut evaluator = CpuEvaluator::new(1).unwrap();
        for viewport in [
            screen::Size::new(0, 10),
            screen::Size::new(10, 0),
            screen::Size::new(0, 0),
        ] {
            let frame = evaluator
                .render(&snapshot(
                    viewport,
                    ViewState::default(),
                    KernelParameters::default(),
                ))
                .unwrap();
            assert!(frame.is_empty());
            assert!(frame.colours.is_empty());
            assert_eq!(frame.size, viewport);
        }
    }

    #[test]
    fn escaping_pixels_use_scaled_palette_index() {
        // A single pixel at c = 3, which escapes on the first iteration.
        let snapshot = snapshot(
            screen::Size::new(1, 1),
            ViewState::new(Complex::new(3.0, 0.0), 1.0).unwrap(),
            KernelParameters::new(20, 4.0).unwrap(),
        );
        let frame = CpuEvaluator::new(1).unwrap().render(&snapshot).unwrap();
        assert_eq!(frame.escape_count(0, 0), 0);
        assert_eq!(frame.colour(0, 0), snapshot.palette.get(0).unwrap());
    }

    #[test]
    fn parallel_matches_sequential() {
        let snapshot = snapshot(
            screen::Size::new(97, 61),
            ViewState::new(Complex::new(-0.6, 0.1), 3.0 / 97.0).unwrap(),
            KernelParameters::new(64, 4.0).unwrap(),
        );
        let sequential = CpuEvaluator::new(1).unwrap().render(&snapshot).unwrap();
        let parallel = CpuEvaluator::new(4).unwrap().render(&snapshot).unwrap();
        assert_eq!(sequential, parallel);
        assert_eq!(parallel.escapes.len(), 97 * 61);
    }

    #[test]
    fn default_thread_count_uses_all_cpus() {
        let evaluator = CpuEvaluator::new(0).unwrap();
        assert_eq!(evaluator.threads(), num_cpus::get());
    }
}
