//! Pattern supply for CMYK to RGB training, and conversion through a
//! trained network.
//!
//! Every 8-bit channel maps linearly to `[0, 1]` by dividing by 255, and
//! network outputs map back with `round(v * 255)` clamped to the 8-bit range.

use std::path::Path;

use crate::{
    neural::{FeedForward, Pattern},
    prelude::*,
};

/// Largest 8-bit channel value.
pub const CHANNEL_MAX: f64 = 255.0;

/// Bytes in one packed `C M Y K R G B` training record.
pub const RECORD_LEN: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cmyk {
    pub c: u8,
    pub m: u8,
    pub y: u8,
    pub k: u8,
}

impl Cmyk {
    pub fn new(c: u8, m: u8, y: u8, k: u8) -> Self {
        Self { c, m, y, k }
    }

    /// Network input, one normalized value per channel.
    pub fn to_input(self) -> Vec<f64> {
        [self.c, self.m, self.y, self.k]
            .into_iter()
            .map(normalize)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Opaque color.
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: u8::MAX }
    }

    /// Network target for this color.
    pub fn to_target(self, layout: TargetLayout) -> Vec<f64> {
        let mut target: Vec<f64> = [self.r, self.g, self.b].into_iter().map(normalize).collect();
        if layout == TargetLayout::Rgba {
            target.push(1.0);
        }
        target
    }
}

/// Shape of the training targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetLayout {
    /// Three outputs, one per RGB channel.
    #[default]
    Rgb,
    /// A fourth output fixed at 1.0 for full alpha.
    Rgba,
}

impl TargetLayout {
    pub fn outputs(self) -> usize {
        match self {
            TargetLayout::Rgb => 3,
            TargetLayout::Rgba => 4,
        }
    }
}

pub fn normalize(v: u8) -> f64 {
    v as f64 / CHANNEL_MAX
}

/// Maps a network output back to 8 bits. Out of range and NaN values clamp.
pub fn denormalize(v: f64) -> u8 {
    // `as` saturates and sends NaN to 0.
    (v * CHANNEL_MAX).round() as u8
}

/// Pairs CMYK samples with the RGB samples at the same index.
pub fn patterns_from_pixels(
    cmyk: &[Cmyk],
    rgb: &[Rgba],
    layout: TargetLayout,
) -> Result<Vec<Pattern>> {
    if cmyk.len() != rgb.len() {
        return Err(Error::PixelCountMismatch {
            cmyk: cmyk.len(),
            rgb: rgb.len(),
        });
    }

    Ok(cmyk
        .iter()
        .zip(rgb)
        .map(|(c, r)| Pattern::new(c.to_input(), r.to_target(layout)))
        .collect())
}

/// Decodes a stream of packed `C M Y K R G B` records. A trailing partial
/// record is ignored.
pub fn patterns_from_records(bytes: &[u8]) -> Vec<Pattern> {
    bytes
        .chunks_exact(RECORD_LEN)
        .map(|rec| {
            let cmyk = Cmyk::new(rec[0], rec[1], rec[2], rec[3]);
            let rgb = Rgba::rgb(rec[4], rec[5], rec[6]);
            Pattern::new(cmyk.to_input(), rgb.to_target(TargetLayout::Rgb))
        })
        .collect()
}

/// Packs paired samples into the record stream read by
/// [`patterns_from_records`].
pub fn pack_records(cmyk: &[Cmyk], rgb: &[Rgba]) -> Result<Vec<u8>> {
    if cmyk.len() != rgb.len() {
        return Err(Error::PixelCountMismatch {
            cmyk: cmyk.len(),
            rgb: rgb.len(),
        });
    }

    Ok(cmyk
        .iter()
        .zip(rgb)
        .flat_map(|(c, r)| [c.c, c.m, c.y, c.k, r.r, r.g, r.b])
        .collect())
}

/// Converts CMYK samples to RGBA through a trained network.
#[derive(Debug, Clone)]
pub struct Converter {
    net: FeedForward,
}

impl Converter {
    pub fn new(net: FeedForward) -> Self {
        Self { net }
    }

    /// Loads a network saved with [`FeedForward::dump`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        FeedForward::load(path).map(Self::new)
    }

    /// Runs one forward pass. Alpha is always opaque; outputs past the
    /// third are ignored.
    pub fn cmyk_to_rgba(&mut self, cmyk: Cmyk) -> Result<Rgba> {
        let out = self.net.update(&cmyk.to_input())?;
        match out {
            [r, g, b, ..] => Ok(Rgba::rgb(denormalize(*r), denormalize(*g), denormalize(*b))),
            _ => Err(Error::InvalidConfig(format!(
                "conversion needs 3 outputs, network has {}",
                out.len()
            ))),
        }
    }

    pub fn convert_all(&mut self, pixels: &[Cmyk]) -> Result<Vec<Rgba>> {
        pixels.iter().map(|&c| self.cmyk_to_rgba(c)).collect()
    }

    pub fn network(&self) -> &FeedForward {
        &self.net
    }

    pub fn into_inner(self) -> FeedForward {
        self.net
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::{optimizer::NetworkConfig, DEFAULT_INIT_RANGE};
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn normalize_channels() {
        assert_eq!(normalize(0), 0.0);
        assert_eq!(normalize(255), 1.0);
        assert_eq!(
            Cmyk::new(0, 51, 102, 255).to_input(),
            vec![0.0, 0.2, 0.4, 1.0]
        );
    }

    #[test]
    fn denormalize_rounds_and_clamps() {
        assert_eq!(denormalize(0.0), 0);
        assert_eq!(denormalize(1.0), 255);
        assert_eq!(denormalize(0.5), 128);
        assert_eq!(denormalize(100.0 / 255.0 + 0.001), 100);
        assert_eq!(denormalize(1.7), 255);
        assert_eq!(denormalize(-0.3), 0);
        assert_eq!(denormalize(f64::NAN), 0);
        for v in 0..=255u8 {
            assert_eq!(denormalize(normalize(v)), v);
        }
    }

    #[test]
    fn target_layouts() {
        let c = Rgba::rgb(255, 0, 51);
        assert_eq!(c.to_target(TargetLayout::Rgb), vec![1.0, 0.0, 0.2]);
        assert_eq!(c.to_target(TargetLayout::Rgba), vec![1.0, 0.0, 0.2, 1.0]);
        assert_eq!(TargetLayout::Rgba.outputs(), 4);
    }

    #[test]
    fn pixels_to_patterns() {
        let cmyk = [Cmyk::new(0, 0, 0, 0), Cmyk::new(255, 0, 0, 0)];
        let rgb = [Rgba::rgb(255, 255, 255), Rgba::rgb(0, 255, 255)];

        let patterns = patterns_from_pixels(&cmyk, &rgb, TargetLayout::Rgb).unwrap();
        assert_eq!(
            patterns,
            vec![
                Pattern::new(vec![0.0; 4], vec![1.0; 3]),
                Pattern::new(vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 1.0, 1.0]),
            ]
        );

        assert!(matches!(
            patterns_from_pixels(&cmyk, &rgb[..1], TargetLayout::Rgb),
            Err(Error::PixelCountMismatch { cmyk: 2, rgb: 1 })
        ));
    }

    #[test]
    fn records_round_trip_through_packing() {
        let cmyk = [Cmyk::new(10, 20, 30, 40), Cmyk::new(255, 0, 128, 7)];
        let rgb = [Rgba::rgb(1, 2, 3), Rgba::rgb(200, 100, 50)];

        let mut bytes = pack_records(&cmyk, &rgb).unwrap();
        assert_eq!(bytes.len(), 2 * RECORD_LEN);
        bytes.extend([9, 9, 9]);

        assert_eq!(
            patterns_from_records(&bytes),
            patterns_from_pixels(&cmyk, &rgb, TargetLayout::Rgb).unwrap()
        );
    }

    #[test]
    fn converter_denormalizes_network_output() {
        let mut net =
            FeedForward::with_rng(&mut StdRng::seed_from_u64(3), 4, 6, 3, DEFAULT_INIT_RANGE);
        let pixel = Cmyk::new(12, 200, 3, 90);
        let expected: Vec<u8> = net
            .update(&pixel.to_input())
            .unwrap()
            .iter()
            .map(|&v| denormalize(v))
            .collect();

        let mut converter = Converter::new(net);
        let rgba = converter.cmyk_to_rgba(pixel).unwrap();

        assert_eq!(vec![rgba.r, rgba.g, rgba.b], expected);
        assert_eq!(rgba.a, 255);
    }

    #[test]
    fn converter_ignores_alpha_output() {
        let net = NetworkConfig::default()
            .with_outputs(TargetLayout::Rgba.outputs())
            .with_seed(Some(1))
            .build()
            .unwrap();
        let mut converter = Converter::new(net);

        let out = converter
            .convert_all(&[Cmyk::default(), Cmyk::new(0, 0, 0, 255)])
            .unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|c| c.a == 255));
    }

    #[test]
    fn converter_needs_three_outputs() {
        let net = NetworkConfig::default()
            .with_outputs(2)
            .with_seed(Some(1))
            .build()
            .unwrap();
        assert!(matches!(
            Converter::new(net).cmyk_to_rgba(Cmyk::default()),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn converter_load_missing_network() {
        let path = std::env::temp_dir().join("cmyk_nn_color_missing.json");
        assert!(matches!(Converter::load(&path), Err(Error::NotFound(_))));
    }
}
