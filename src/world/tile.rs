//! A single hex tile: biome plus the colors of its seven top-face sections.

use bevy::prelude::Color;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::biome::{BiomeCatalog, BiomeId};
use super::coords::{AxialCoord, SectionKind};
use super::props::{Coloration, VariationKind};
use crate::math;

/// 8-bit sRGB color, stored on disk as `[r, g, b]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    /// Multiplies every channel by `factor`.
    pub fn shaded(self, factor: f32) -> Rgb {
        Rgb(self.0.map(|c| math::shade_channel(c, factor)))
    }

    /// Bevy color for rendering.
    pub fn to_color(self) -> Color {
        let [r, g, b] = self.0;
        Color::srgb_u8(r, g, b)
    }
}

/// Side faces of the extruded band visible below a pointy-top tile:
/// `(vertex_a, vertex_b, darkening)`, from the east face round to south-west.
pub const BAND_FACES: [(usize, usize, f32); 3] = [(0, 1, 0.70), (1, 2, 0.55), (2, 3, 0.70)];

/// Wedges whose colors feed the band: the ones touching [`BAND_FACES`].
const FRONT_WEDGES: [usize; 3] = [0, 1, 2];

/// Number of shaded colors cached per patterned section.
const SWATCH_LEN: usize = 4;

/// A pattern/coloration applied to one section by a placed prop.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionOverride {
    /// The payload that produced this override.
    pub coloration: Coloration,
    /// Pre-shaded colors the renderer layers over the section.
    pub swatch: Vec<Rgb>,
    /// Seeds the pattern layout so a section redraws identically.
    pub seed: u64,
}

impl SectionOverride {
    fn new(coloration: &Coloration, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let base = coloration.colors();
        let swatch = (0..SWATCH_LEN)
            .map(|i| {
                let color = base
                    .get(i % base.len().max(1))
                    .copied()
                    .unwrap_or_else(|| coloration.primary());
                vary(color, coloration, &mut rng)
            })
            .collect();
        Self {
            coloration: coloration.clone(),
            swatch,
            seed,
        }
    }
}

/// Jitters each channel by up to `±50·intensity` for shading variations.
fn vary(color: Rgb, coloration: &Coloration, rng: &mut SmallRng) -> Rgb {
    let variation = &coloration.variation;
    if !matches!(
        variation.kind,
        VariationKind::RandomShading | VariationKind::Combo
    ) {
        return color;
    }
    let range = (50.0 * variation.intensity.clamp(0.0, 1.0)) as i32;
    Rgb(color.0.map(|c| {
        let delta = if range > 0 {
            rng.random_range(-range..=range)
        } else {
            0
        };
        (c as i32 + delta).clamp(0, 255) as u8
    }))
}

/// One hexagonal cell at a layered coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    coord: AxialCoord,
    biome: BiomeId,
    section_colors: [Rgb; SectionKind::COUNT],
    overrides: [Option<SectionOverride>; SectionKind::COUNT],
}

impl Tile {
    /// A fresh tile whose seven sections are sampled independently from the
    /// biome palette.
    pub fn generate(
        coord: AxialCoord,
        biome: BiomeId,
        catalog: &BiomeCatalog,
        rng: &mut SmallRng,
    ) -> Self {
        let section_colors = Self::generate_section_colors(&biome, catalog, rng);
        Self::with_colors(coord, biome, section_colors)
    }

    /// A tile with explicit colors (used when restoring saved worlds).
    pub fn with_colors(
        coord: AxialCoord,
        biome: BiomeId,
        section_colors: [Rgb; SectionKind::COUNT],
    ) -> Self {
        Self {
            coord,
            biome,
            section_colors,
            overrides: Default::default(),
        }
    }

    /// Seven independent draws from the biome palette, with replacement.
    pub fn generate_section_colors(
        biome: &BiomeId,
        catalog: &BiomeCatalog,
        rng: &mut SmallRng,
    ) -> [Rgb; SectionKind::COUNT] {
        std::array::from_fn(|_| catalog.sample_color(biome, rng))
    }

    /// Where this tile sits.
    pub fn coord(&self) -> AxialCoord {
        self.coord
    }

    /// Biome the tile was generated with.
    pub fn biome(&self) -> &BiomeId {
        &self.biome
    }

    /// Representative colors, indexed by [`SectionKind::slot`].
    pub fn section_colors(&self) -> &[Rgb; SectionKind::COUNT] {
        &self.section_colors
    }

    /// Representative color of one section.
    pub fn section_color(&self, section: SectionKind) -> Rgb {
        self.section_colors[section.slot()]
    }

    /// Active pattern override of one section.
    pub fn section_override(&self, section: SectionKind) -> Option<&SectionOverride> {
        self.overrides[section.slot()].as_ref()
    }

    /// Applies a coloration to `section`; its representative color becomes the
    /// coloration's primary color so shading and fallback stay consistent.
    pub fn set_section_override(&mut self, section: SectionKind, coloration: &Coloration) {
        let slot = section.slot();
        let seed = swatch_seed(self.coord, slot);
        self.section_colors[slot] = coloration.primary();
        self.overrides[slot] = Some(SectionOverride::new(coloration, seed));
    }

    /// Drops the override on `section` and re-rolls its color from the biome
    /// palette. The color displaced by the override is not restored.
    pub fn clear_section_override(
        &mut self,
        section: SectionKind,
        catalog: &BiomeCatalog,
        rng: &mut SmallRng,
    ) {
        let slot = section.slot();
        self.overrides[slot] = None;
        self.section_colors[slot] = catalog.sample_color(&self.biome, rng);
    }

    /// Band colors for [`BAND_FACES`], derived from the current front wedge
    /// colors every call.
    pub fn side_band_colors(&self) -> [Rgb; 3] {
        let sum = FRONT_WEDGES.iter().fold([0u32; 3], |mut acc, &w| {
            let c = self.section_color(SectionKind::wedge(w)).0;
            for (a, v) in acc.iter_mut().zip(c) {
                *a += u32::from(v);
            }
            acc
        });
        let base = Rgb(sum.map(|s| (s / FRONT_WEDGES.len() as u32) as u8));
        BAND_FACES.map(|(_, _, darken)| base.shaded(darken))
    }
}

fn swatch_seed(coord: AxialCoord, slot: usize) -> u64 {
    let [q, r, z] = <[i32; 3]>::from(coord).map(|v| v as u32 as u64);
    (q << 40) ^ (r << 20) ^ z ^ ((slot as u64) << 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::biome::Palette;
    use crate::world::props::{PatternKind, Variation};

    fn catalog() -> BiomeCatalog {
        let mut c = BiomeCatalog::empty();
        c.insert(
            BiomeId::new("stripes"),
            Palette::from_colors(&[
                Rgb([10, 0, 0]),
                Rgb([20, 0, 0]),
                Rgb([30, 0, 0]),
                Rgb([40, 0, 0]),
                Rgb([50, 0, 0]),
                Rgb([60, 0, 0]),
                Rgb([70, 0, 0]),
            ]),
        );
        c
    }

    fn tile() -> Tile {
        let mut rng = SmallRng::seed_from_u64(1);
        Tile::generate(AxialCoord::ORIGIN, BiomeId::new("stripes"), &catalog(), &mut rng)
    }

    fn coloration(primary: [u8; 3]) -> Coloration {
        Coloration::new(
            vec![Rgb(primary), Rgb([1, 2, 3])],
            PatternKind::Bricks,
            Variation::default(),
        )
    }

    #[test]
    fn generated_colors_come_from_palette() {
        let palette = catalog().palette(&BiomeId::new("stripes")).unwrap().clone();
        let t = tile();
        assert_eq!(t.section_colors().len(), 7);
        assert!(t.section_colors().iter().all(|c| palette.0.contains(c)));
    }

    #[test]
    fn sections_are_sampled_independently() {
        // With 7 colors and many tiles, some tile must mix colors.
        let mut rng = SmallRng::seed_from_u64(9);
        let mixed = (0..20).any(|i| {
            let t = Tile::generate(
                AxialCoord::new(i, 0, 0),
                BiomeId::new("stripes"),
                &catalog(),
                &mut rng,
            );
            t.section_colors().iter().any(|&c| c != t.section_colors()[0])
        });
        assert!(mixed);
    }

    #[test]
    fn override_only_touches_its_section() {
        let mut t = tile();
        let before = *t.section_colors();
        let section = SectionKind::wedge(3);
        t.set_section_override(section, &coloration([200, 100, 50]));

        assert_eq!(t.section_color(section), Rgb([200, 100, 50]));
        assert!(t.section_override(section).is_some());
        for s in SectionKind::all().filter(|&s| s != section) {
            assert_eq!(t.section_color(s), before[s.slot()]);
            assert!(t.section_override(s).is_none());
        }
    }

    #[test]
    fn clearing_override_rerolls_from_palette() {
        let mut t = tile();
        let cat = catalog();
        t.set_section_override(SectionKind::Center, &coloration([250, 250, 250]));
        let mut rng = SmallRng::seed_from_u64(2);
        t.clear_section_override(SectionKind::Center, &cat, &mut rng);

        assert!(t.section_override(SectionKind::Center).is_none());
        let palette = cat.palette(&BiomeId::new("stripes")).unwrap();
        assert!(palette.0.contains(&t.section_color(SectionKind::Center)));
    }

    #[test]
    fn band_averages_front_wedges_and_darkens() {
        let colors = [
            Rgb([0, 0, 0]),
            Rgb([100, 30, 90]),
            Rgb([200, 60, 90]),
            Rgb([0, 0, 90]),
            Rgb([255, 255, 255]),
            Rgb([255, 255, 255]),
            Rgb([255, 255, 255]),
        ];
        let t = Tile::with_colors(AxialCoord::ORIGIN, BiomeId::new("x"), colors);
        let [east, south, west] = t.side_band_colors();
        // average = (100, 30, 90)
        assert_eq!(east, Rgb([70, 21, 63]));
        assert_eq!(south, Rgb([55, 16, 49]));
        assert_eq!(west, east);
    }

    #[test]
    fn band_follows_color_changes() {
        let mut t = tile();
        let before = t.side_band_colors();
        t.set_section_override(SectionKind::wedge(1), &coloration([255, 255, 255]));
        assert_ne!(t.side_band_colors(), before);
    }

    #[test]
    fn swatch_is_deterministic_per_section() {
        let mut a = tile();
        let mut b = tile();
        let mut c = coloration([120, 120, 120]);
        c.variation = Variation {
            kind: VariationKind::RandomShading,
            intensity: 0.5,
        };
        a.set_section_override(SectionKind::wedge(0), &c);
        b.set_section_override(SectionKind::wedge(0), &c);
        assert_eq!(
            a.section_override(SectionKind::wedge(0)).unwrap().swatch,
            b.section_override(SectionKind::wedge(0)).unwrap().swatch
        );
    }
}
