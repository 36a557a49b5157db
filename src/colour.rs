//! Named colour gradients.

use bytemuck::{Pod, Zeroable};
use fnv::FnvHashMap;

use crate::error::Error;

/// [`bytemuck`]-compatible 8-bit RGB colour.
#[repr(C)]
#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Opaque RGBA packed for `unpack4x8unorm`.
    pub fn pack(self) -> u32 {
        u32::from_le_bytes([self.r, self.g, self.b, u8::MAX])
    }

    pub fn unpack(word: u32) -> Self {
        let [r, g, b, _] = word.to_le_bytes();
        Self { r, g, b }
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColourStop {
    pub position: f32,
    pub colour: Rgb,
}

impl ColourStop {
    pub const fn new(position: f32, colour: Rgb) -> Self {
        Self { position, colour }
    }
}

/// Piecewise-linear colour ramp over `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Gradient {
    stops: Vec<ColourStop>,
}

impl Gradient {
    /// Stops must be non-empty, within `[0, 1]` and in non-decreasing order.
    pub fn new(stops: Vec<ColourStop>) -> Result<Self, Error> {
        if stops.is_empty() {
            return Err(Error::InvalidGradient("no colour stops".into()));
        }
        for stop in &stops {
            if !(0.0..=1.0).contains(&stop.position) {
                return Err(Error::InvalidGradient(format!(
                    "stop position {} is outside [0, 1]",
                    stop.position
                )));
            }
        }
        if let Some(pair) = stops.windows(2).find(|pair| pair[1].position < pair[0].position) {
            return Err(Error::InvalidGradient(format!(
                "stop at {} follows stop at {}",
                pair[1].position, pair[0].position
            )));
        }
        Ok(Self { stops })
    }

    /// Evenly spaced stops from `0` to `1`.
    pub fn evenly_spaced(colours: &[Rgb]) -> Result<Self, Error> {
        let last = colours.len().saturating_sub(1).max(1) as f32;
        Self::new(
            colours
                .iter()
                .enumerate()
                .map(|(index, colour)| ColourStop::new(index as f32 / last, *colour))
                .collect(),
        )
    }

    pub fn stops(&self) -> &[ColourStop] {
        &self.stops
    }

    /// Sample the gradient; `t` is clamped to `[0, 1]`.
    pub fn mix(&self, t: f32) -> Rgb {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };

        // `new` guarantees at least one stop.
        let first = self.stops[0];
        let last = self.stops[self.stops.len() - 1];
        if t <= first.position {
            return first.colour;
        }
        if t >= last.position {
            return last.colour;
        }

        // First stop strictly past `t`; exists because `t < last.position`.
        let upper = self.stops.partition_point(|stop| stop.position <= t);
        let (from, to) = (self.stops[upper - 1], self.stops[upper]);
        let span = to.position - from.position;
        let amount = if span > 0.0 {
            (t - from.position) / span
        } else {
            0.0
        };

        Rgb {
            r: lerp(from.colour.r, to.colour.r, amount),
            g: lerp(from.colour.g, to.colour.g, amount),
            b: lerp(from.colour.b, to.colour.b, amount),
        }
    }
}

fn lerp(from: u8, to: u8, amount: f32) -> u8 {
    let value = from as f32 + (to as f32 - from as f32) * amount;
    value.round().clamp(0.0, u8::MAX as f32) as u8
}

/// A continuous `name × [0, 1] → RGB` colour function.
pub trait ColourMixer {
    fn mix(&self, name: &str, t: f32) -> Result<Rgb, Error>;
}

/// Registry of named gradients.
#[derive(Clone, Debug)]
pub struct Gradients {
    gradients: FnvHashMap<String, Gradient>,
}

impl Gradients {
    pub fn empty() -> Self {
        Self {
            gradients: FnvHashMap::default(),
        }
    }

    /// `rainbow`, `grayscale` and `fire`.
    pub fn builtin() -> Self {
        let mut gradients = Self::empty();
        for (name, colours) in [
            ("rainbow", &RAINBOW[..]),
            ("grayscale", &GRAYSCALE[..]),
            ("fire", &FIRE[..]),
        ] {
            // The built-in tables are non-empty, so this can't fail.
            if let Ok(gradient) = Gradient::evenly_spaced(colours) {
                gradients.insert(name, gradient);
            }
        }
        gradients
    }

    /// Add or replace a gradient.
    pub fn insert(&mut self, name: impl Into<String>, gradient: Gradient) -> Option<Gradient> {
        self.gradients.insert(name.into(), gradient)
    }

    pub fn get(&self, name: &str) -> Option<&Gradient> {
        self.gradients.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.gradients.keys().map(String::as_str)
    }
}

impl Default for Gradients {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ColourMixer for Gradients {
    fn mix(&self, name: &str, t: f32) -> Result<Rgb, Error> {
        self.get(name)
            .map(|gradient| gradient.mix(t))
            .ok_or_else(|| Error::UnknownGradient(name.to_owned()))
    }
}

const RAINBOW: [Rgb; 6] = [
    Rgb::new(0, 0, 0),
    Rgb::new(0, 0, 255),
    Rgb::new(0, 255, 255),
    Rgb::new(0, 255, 0),
    Rgb::new(255, 255, 0),
    Rgb::new(255, 0, 0),
];

const GRAYSCALE: [Rgb; 2] = [Rgb::new(0, 0, 0), Rgb::new(255, 255, 255)];

const FIRE: [Rgb; 4] = [
    Rgb::new(0, 0, 0),
    Rgb::new(255, 0, 0),
    Rgb::new(255, 255, 0),
    Rgb::new(255, 255, 255),
];
