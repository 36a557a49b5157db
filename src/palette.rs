//! Discrete colour lookup tables.

use log::debug;

use crate::{
    colour::{ColourMixer, Rgb},
    error::Error,
};

/// A fixed-length colour table; index `0` is fraction `0.0`, the last index is `1.0`.
///
/// Built once and then shared read-only (usually behind an `Arc`). Changing
/// palettes means building a new one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colours: Vec<Rgb>,
}

impl Palette {
    pub const DEFAULT_SAMPLE_COUNT: usize = 256;

    /// Sample `mixer`'s gradient `name` at `sample_count` evenly spaced points.
    pub fn build(
        mixer: &impl ColourMixer,
        name: &str,
        sample_count: usize,
    ) -> Result<Self, Error> {
        if sample_count < 2 {
            return Err(Error::InvalidSampleCount(sample_count));
        }

        let last = (sample_count - 1) as f32;
        let colours = (0..sample_count)
            .map(|index| mixer.mix(name, index as f32 / last))
            .collect::<Result<Vec<Rgb>, Error>>()?;

        debug!("built {:?} palette with {} entries", name, colours.len());
        Ok(Self { colours })
    }

    pub fn len(&self) -> usize {
        self.colours.len()
    }

    /// Always false; a palette has at least two entries.
    pub fn is_empty(&self) -> bool {
        self.colours.is_empty()
    }

    pub fn colours(&self) -> &[Rgb] {
        &self.colours
    }

    pub fn get(&self, index: usize) -> Option<Rgb> {
        self.colours.get(index).copied()
    }

    /// Nearest table index for an escape fraction, clamped to the table.
    ///
    /// Rounds with `floor(x + 0.5)` to match `mandelbrot.wgsl`.
    pub fn index_for(&self, fraction: f32) -> usize {
        let last = self.colours.len() - 1;
        let scaled = (fraction * last as f32 + 0.5).floor();
        if scaled.is_nan() || scaled <= 0.0 {
            0
        } else {
            (scaled as usize).min(last)
        }
    }

    pub fn colour_for(&self, fraction: f32) -> Rgb {
        self.colours[self.index_for(fraction)]
    }

    /// The table as RGBA words, for upload as a storage buffer.
    pub fn packed(&self) -> Vec<u32> {
        self.colours.iter().map(|colour| colour.pack()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colour::Gradients;

    /// Encodes `t` in the red channel so tests can see where each entry was sampled.
    struct Ramp;

    impl ColourMixer for Ramp {
        fn mix(&self, name: &str, t: f32) -> Result<Rgb, Error> {
            if name != "ramp" {
                return Err(Error::UnknownGradient(name.to_owned()));
            }
            Ok(Rgb::new((t * 255.0).round() as u8, 0, 0))
        }
    }

    #[test]
    fn builds_requested_number_of_entries() {
        for sample_count in [2, 3, 17, 256] {
            let palette = Palette::build(&Ramp, "ramp", sample_count).unwrap();
            assert_eq!(palette.len(), sample_count);
        }
    }

    #[test]
    fn endpoints_sample_zero_and_one() {
        let gradients = Gradients::builtin();
        let palette = Palette::build(&gradients, "rainbow", 256).unwrap();
        assert_eq!(palette.get(0), Some(gradients.mix("rainbow", 0.0).unwrap()));
        assert_eq!(palette.get(255), Some(gradients.mix("rainbow", 1.0).unwrap()));
    }

    #[test]
    fn entries_follow_increasing_t() {
        let palette = Palette::build(&Ramp, "ramp", 256).unwrap();
        for (index, colour) in palette.colours().iter().enumerate() {
            assert_eq!(colour.r as usize, index);
        }
    }

    #[test]
    fn rejects_fewer_than_two_samples() {
        assert!(matches!(
            Palette::build(&Ramp, "ramp", 1),
            Err(Error::InvalidSampleCount(1))
        ));
        assert!(matches!(
            Palette::build(&Ramp, "ramp", 0),
            Err(Error::InvalidSampleCount(0))
        ));
    }

    #[test]
    fn propagates_mixer_errors() {
        assert!(matches!(
            Palette::build(&Ramp, "missing", 8),
            Err(Error::UnknownGradient(_))
        ));
    }

    #[test]
    fn index_is_clamped() {
        let palette = Palette::build(&Ramp, "ramp", 5).unwrap();
        assert_eq!(palette.index_for(0.0), 0);
        assert_eq!(palette.index_for(0.5), 2);
        assert_eq!(palette.index_for(0.6), 2);
        assert_eq!(palette.index_for(0.65), 3);
        assert_eq!(palette.index_for(1.0), 4);
        assert_eq!(palette.index_for(2.0), 4);
        assert_eq!(palette.index_for(-1.0), 0);
        assert_eq!(palette.index_for(f32::NAN), 0);
        assert_eq!(palette.colour_for(1.25), palette.get(4).unwrap());
    }

    #[test]
    fn packs_every_entry() {
        let palette = Palette::build(&Ramp, "ramp", 4).unwrap();
        let packed = palette.packed();
        assert_eq!(packed.len(), 4);
        assert_eq!(Rgb::unpack(packed[3]), palette.get(3).unwrap());
    }
}
