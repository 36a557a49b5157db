//! Viewer configuration.
//!
//! Read from an optional TOML file. Every section and field has a default, so
//! the viewer runs with no file at all.
//!
//! ```toml
//! [window]
//! width = 640
//! height = 480
//!
//! [view]
//! center = [-0.4, 0.0]
//! zoom = 0.004
//!
//! [kernel]
//! max_iterations = 20
//! cutoff = 10.0
//!
//! [palette]
//! name = "ocean"
//! samples = 256
//!
//! [[palette.gradients.ocean]]
//! position = 0.0
//! colour = [0, 0, 32]
//!
//! [[palette.gradients.ocean]]
//! position = 1.0
//! colour = [160, 240, 255]
//!
//! [evaluator]
//! backend = "gpu"
//! threads = 0
//! ```

use std::{collections::BTreeMap, path::Path};

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    colour::{ColourStop, Gradient, Gradients, Rgb},
    complex::Complex,
    error::Error,
    kernel::KernelParameters,
    palette::Palette,
    screen,
    view::ViewState,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] Error),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub window: WindowConfig,
    pub view: ViewConfig,
    pub kernel: KernelConfig,
    pub palette: PaletteConfig,
    pub evaluator: EvaluatorConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct ViewConfig {
    pub center: [f32; 2],
    pub zoom: f32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            center: [
                ViewState::DEFAULT_CENTER.real,
                ViewState::DEFAULT_CENTER.imaginary,
            ],
            zoom: ViewState::DEFAULT_ZOOM,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct KernelConfig {
    pub max_iterations: u32,
    /// Squared escape radius.
    pub cutoff: f32,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_iterations: KernelParameters::DEFAULT_MAX_ITERATIONS,
            cutoff: KernelParameters::DEFAULT_ESCAPE_RADIUS_SQUARED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StopConfig {
    pub position: f32,
    pub colour: [u8; 3],
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct PaletteConfig {
    pub name: String,
    pub samples: usize,
    /// Extra gradients, added to (or replacing) the built-in ones.
    pub gradients: BTreeMap<String, Vec<StopConfig>>,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            name: "rainbow".into(),
            samples: Palette::DEFAULT_SAMPLE_COUNT,
            gradients: BTreeMap::new(),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Gpu,
    Cpu,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct EvaluatorConfig {
    pub backend: Backend,
    /// CPU evaluator threads; `0` means one per logical CPU.
    pub threads: usize,
}

impl Config {
    /// Load configuration from `path`.
    ///
    /// Returns the default configuration if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(
                "no config file found at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        info!("loading config from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value by building the core types from it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.view_state()?;
        self.kernel_parameters()?;
        self.palette()?;
        Ok(())
    }

    pub fn window_size(&self) -> screen::Size {
        screen::Size::new(self.window.width, self.window.height)
    }

    pub fn view_state(&self) -> Result<ViewState, Error> {
        let [real, imaginary] = self.view.center;
        ViewState::new(Complex::new(real, imaginary), self.view.zoom)
    }

    pub fn kernel_parameters(&self) -> Result<KernelParameters, Error> {
        KernelParameters::new(self.kernel.max_iterations, self.kernel.cutoff)
    }

    /// The built-in gradients plus any defined here.
    pub fn gradients(&self) -> Result<Gradients, Error> {
        let mut gradients = Gradients::builtin();
        for (name, stops) in &self.palette.gradients {
            let gradient = Gradient::new(
                stops
                    .iter()
                    .map(|stop| ColourStop::new(stop.position, Rgb::from(stop.colour)))
                    .collect(),
            )?;
            gradients.insert(name.clone(), gradient);
        }
        Ok(gradients)
    }

    pub fn palette(&self) -> Result<Palette, Error> {
        Palette::build(
            &self.gradients()?,
            &self.palette.name,
            self.palette.samples,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.window_size(), screen::Size::new(640, 480));
        assert_eq!(config.view_state().unwrap(), ViewState::default());
        assert_eq!(
            config.kernel_parameters().unwrap(),
            KernelParameters::default()
        );
        assert_eq!(config.evaluator.backend, Backend::Gpu);
        assert_eq!(config.palette().unwrap().len(), 256);
    }

    #[test]
    fn parses_every_section() {
        let config = Config::parse(
            r#"
            [window]
            width = 800
            height = 600

            [view]
            center = [0.25, -0.5]
            zoom = 0.01

            [kernel]
            max_iterations = 100
            cutoff = 4.0

            [palette]
            name = "ocean"
            samples = 16

            [[palette.gradients.ocean]]
            position = 0.0
            colour = [0, 0, 32]

            [[palette.gradients.ocean]]
            position = 1.0
            colour = [160, 240, 255]

            [evaluator]
            backend = "cpu"
            threads = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.window_size(), screen::Size::new(800, 600));
        assert_eq!(
            config.view_state().unwrap().center(),
            Complex::new(0.25, -0.5)
        );
        assert_eq!(config.kernel_parameters().unwrap().max_iterations(), 100);
        assert_eq!(config.evaluator.backend, Backend::Cpu);
        assert_eq!(config.evaluator.threads, 2);

        let palette = config.palette().unwrap();
        assert_eq!(palette.len(), 16);
        assert_eq!(palette.get(0), Some(Rgb::new(0, 0, 32)));
        assert_eq!(palette.get(15), Some(Rgb::new(160, 240, 255)));
    }

    #[test]
    fn rejects_invalid_values() {
        for contents in [
            "[kernel]\nmax_iterations = 1",
            "[kernel]\ncutoff = -1.0",
            "[view]\nzoom = 0.0",
            "[palette]\nsamples = 1",
            "[palette]\nname = \"missing\"",
            "[[palette.gradients.bad]]\nposition = 2.0\ncolour = [0, 0, 0]",
        ] {
            assert!(
                matches!(Config::parse(contents), Err(ConfigError::Invalid(_))),
                "{:?} was accepted",
                contents
            );
        }
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(matches!(
            Config::parse("[kernel]\nmax_iteration = 10"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn missing_file_is_default() {
        let config = Config::load_from(Path::new("/nonexistent/mandelbrot.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
