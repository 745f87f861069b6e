//! Biome palettes and the strategies that assign a biome to a new tile.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use bevy::prelude::*;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use super::coords::AxialCoord;
use super::tile::Rgb;
use crate::error::{LoadReport, WorldError};
use crate::math;

/// Every palette holds exactly this many colors.
pub const PALETTE_LEN: usize = 7;

/// Padding used when a palette file lists fewer than [`PALETTE_LEN`] colors.
const PALETTE_PAD: Rgb = Rgb([128, 128, 128]);

/// Color returned for a biome the catalog does not know.
pub const UNKNOWN_BIOME_COLOR: Rgb = Rgb([150, 150, 150]);

/// Biome identifier, e.g. `"forest"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BiomeId(pub String);

impl BiomeId {
    /// Wraps a string id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BiomeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Seven colors a biome's tile sections are sampled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette(pub [Rgb; PALETTE_LEN]);

impl Palette {
    /// Normalizes an arbitrary color list: pads with gray, truncates extras.
    pub fn from_colors(colors: &[Rgb]) -> Self {
        Self(std::array::from_fn(|i| {
            colors.get(i).copied().unwrap_or(PALETTE_PAD)
        }))
    }

    /// One uniformly chosen color (sampling with replacement).
    pub fn sample(&self, rng: &mut SmallRng) -> Rgb {
        self.0[rng.random_range(0..PALETTE_LEN)]
    }
}

/// On-disk palette record: `{ "biome": "forest", "colors": [[r,g,b], ...] }`.
#[derive(Debug, Serialize, Deserialize)]
struct PaletteRecord {
    biome: BiomeId,
    colors: Vec<Rgb>,
}

/// Owned collection of biome palettes, keyed by id.
///
/// Constructed explicitly and handed to the grid; there is no global
/// palette registry.
#[derive(Debug, Clone)]
pub struct BiomeCatalog {
    palettes: BTreeMap<BiomeId, Palette>,
}

impl Default for BiomeCatalog {
    /// The eight stock biomes.
    fn default() -> Self {
        let stock: [(&str, [[u8; 3]; PALETTE_LEN]); 8] = [
            (
                "forest",
                [
                    [34, 139, 34],
                    [50, 155, 50],
                    [40, 150, 40],
                    [45, 145, 45],
                    [30, 130, 30],
                    [20, 120, 20],
                    [55, 160, 55],
                ],
            ),
            (
                "desert",
                [
                    [238, 214, 175],
                    [228, 204, 165],
                    [233, 209, 170],
                    [243, 219, 180],
                    [223, 199, 160],
                    [248, 224, 185],
                    [218, 194, 155],
                ],
            ),
            (
                "mountain",
                [
                    [139, 137, 137],
                    [149, 147, 147],
                    [129, 127, 127],
                    [144, 142, 142],
                    [134, 132, 132],
                    [154, 152, 152],
                    [124, 122, 122],
                ],
            ),
            (
                "water",
                [
                    [30, 144, 255],
                    [40, 154, 255],
                    [25, 139, 245],
                    [35, 149, 250],
                    [20, 134, 240],
                    [45, 159, 255],
                    [15, 129, 235],
                ],
            ),
            (
                "snow",
                [
                    [240, 248, 255],
                    [230, 238, 245],
                    [220, 228, 235],
                    [210, 218, 225],
                    [200, 208, 215],
                    [250, 250, 250],
                    [190, 198, 205],
                ],
            ),
            (
                "lava",
                [
                    [255, 69, 0],
                    [255, 140, 0],
                    [220, 50, 0],
                    [255, 100, 0],
                    [200, 40, 0],
                    [255, 165, 0],
                    [180, 30, 0],
                ],
            ),
            (
                "swamp",
                [
                    [85, 107, 47],
                    [107, 142, 35],
                    [75, 97, 37],
                    [95, 117, 47],
                    [65, 87, 27],
                    [105, 127, 57],
                    [55, 77, 17],
                ],
            ),
            (
                "crystal",
                [
                    [147, 112, 219],
                    [138, 43, 226],
                    [186, 85, 211],
                    [153, 50, 204],
                    [218, 112, 214],
                    [199, 21, 133],
                    [128, 0, 128],
                ],
            ),
        ];

        let palettes = stock
            .into_iter()
            .map(|(id, colors)| (BiomeId::new(id), Palette(colors.map(Rgb))))
            .collect();
        Self { palettes }
    }
}

impl BiomeCatalog {
    /// A catalog with no palettes, for tests and custom setups.
    pub fn empty() -> Self {
        Self {
            palettes: BTreeMap::new(),
        }
    }

    /// Adds or replaces a palette.
    pub fn insert(&mut self, id: BiomeId, palette: Palette) {
        self.palettes.insert(id, palette);
    }

    /// Palette for `id`, if known.
    pub fn palette(&self, id: &BiomeId) -> Option<&Palette> {
        self.palettes.get(id)
    }

    /// Known biome ids, sorted.
    pub fn ids(&self) -> Vec<BiomeId> {
        self.palettes.keys().cloned().collect()
    }

    /// Number of biomes.
    pub fn len(&self) -> usize {
        self.palettes.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.palettes.is_empty()
    }

    /// A random section color for `id`; gray for unknown biomes.
    pub fn sample_color(&self, id: &BiomeId, rng: &mut SmallRng) -> Rgb {
        self.palette(id)
            .map_or(UNKNOWN_BIOME_COLOR, |p| p.sample(rng))
    }

    /// Parses one palette record from JSON text and inserts it.
    pub fn load_record(&mut self, origin: &str, text: &str) -> Result<BiomeId, WorldError> {
        let record: PaletteRecord =
            serde_json::from_str(text).map_err(|e| WorldError::malformed(origin, e))?;
        if record.colors.is_empty() {
            return Err(WorldError::malformed(origin, "palette has no colors"));
        }
        self.insert(record.biome.clone(), Palette::from_colors(&record.colors));
        Ok(record.biome)
    }

    /// Loads every `*.json` palette in `dir`, overriding stock entries.
    ///
    /// A missing directory is not an error (there is simply nothing to add);
    /// malformed files are skipped and reported.
    pub fn load_dir(&mut self, dir: &Path) -> LoadReport {
        let mut report = LoadReport::default();
        let Ok(entries) = fs::read_dir(dir) else {
            debug!("palette directory {} not found", dir.display());
            return report;
        };
        let mut paths: Vec<_> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        for path in paths {
            let origin = path.display().to_string();
            let outcome = fs::read_to_string(&path)
                .map_err(|source| WorldError::PersistenceIo {
                    path: path.clone(),
                    source,
                })
                .and_then(|text| self.load_record(&origin, &text));
            match outcome {
                Ok(_) => report.loaded += 1,
                Err(e) => report.skip(e),
            }
        }
        info!(
            "loaded {} palettes from {} ({} skipped)",
            report.loaded,
            dir.display(),
            report.skipped.len()
        );
        report
    }
}

/// Chooses the biome of a tile being generated.
///
/// Injected into the grid so assignment can evolve (e.g. description-driven)
/// without touching generation.
pub trait BiomePolicy: Send + Sync {
    /// Picks a biome for `coord` from `catalog`.
    fn assign(&mut self, coord: AxialCoord, catalog: &BiomeCatalog, rng: &mut SmallRng) -> BiomeId;
}

/// Uniform random choice among the catalog's biomes.
#[derive(Debug, Default)]
pub struct RandomBiomes;

impl BiomePolicy for RandomBiomes {
    fn assign(&mut self, _coord: AxialCoord, catalog: &BiomeCatalog, rng: &mut SmallRng) -> BiomeId {
        let ids = catalog.ids();
        if ids.is_empty() {
            return BiomeId::new("unknown");
        }
        ids[rng.random_range(0..ids.len())].clone()
    }
}

/// Always the same biome.
#[derive(Debug, Clone)]
pub struct FixedBiome(pub BiomeId);

impl BiomePolicy for FixedBiome {
    fn assign(&mut self, _coord: AxialCoord, _catalog: &BiomeCatalog, _rng: &mut SmallRng) -> BiomeId {
        self.0.clone()
    }
}

/// Coherent regions: fractal Perlin noise sampled at the tile's projected
/// position, mapped onto the sorted biome list.
pub struct NoiseBiomes {
    fbm: Fbm<Perlin>,
    scale: f64,
}

impl NoiseBiomes {
    /// `scale` is the number of hex columns one noise unit spans.
    pub fn new(seed: u32, octaves: usize, scale: f64) -> Self {
        Self {
            fbm: Fbm::new(seed).set_octaves(octaves),
            scale,
        }
    }
}

impl BiomePolicy for NoiseBiomes {
    fn assign(&mut self, coord: AxialCoord, catalog: &BiomeCatalog, _rng: &mut SmallRng) -> BiomeId {
        let ids = catalog.ids();
        if ids.is_empty() {
            return BiomeId::new("unknown");
        }
        // Unit hex size: noise varies by column, not by pixel density.
        let p = math::axial_to_pixel(coord.q(), coord.r(), 0, 1.0);
        let n = self
            .fbm
            .get([p.x as f64 / self.scale, p.y as f64 / self.scale, coord.z as f64 * 0.5]);
        let t = ((n + 1.0) / 2.0).clamp(0.0, 0.999_999);
        ids[(t * ids.len() as f64) as usize].clone()
    }
}

/// Serializable selector for the policies above, used by configuration.
#[derive(Debug, Clone, PartialEq, Reflect, Default)]
pub enum BiomePolicyKind {
    /// [`RandomBiomes`]
    #[default]
    Random,
    /// [`NoiseBiomes`]
    Noise,
    /// [`FixedBiome`]
    Fixed(String),
}

impl BiomePolicyKind {
    /// Instantiates the policy.
    pub fn build(&self, seed: u64) -> Box<dyn BiomePolicy> {
        match self {
            Self::Random => Box::new(RandomBiomes),
            Self::Noise => Box::new(NoiseBiomes::new(seed as u32, 3, 6.0)),
            Self::Fixed(id) => Box::new(FixedBiome(BiomeId::new(id.clone()))),
        }
    }
}

impl std::str::FromStr for BiomePolicyKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "random" => Self::Random,
            "noise" => Self::Noise,
            other => Self::Fixed(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    #[test]
    fn stock_catalog_has_eight_biomes() {
        let catalog = BiomeCatalog::default();
        assert_eq!(catalog.len(), 8);
        assert!(catalog.palette(&BiomeId::new("lava")).is_some());
    }

    #[test]
    fn short_palette_is_padded_with_gray() {
        let p = Palette::from_colors(&[Rgb([1, 2, 3])]);
        assert_eq!(p.0[0], Rgb([1, 2, 3]));
        assert!(p.0[1..].iter().all(|&c| c == PALETTE_PAD));
    }

    #[test]
    fn long_palette_is_truncated() {
        let colors: Vec<Rgb> = (0..10).map(|i| Rgb([i, i, i])).collect();
        let p = Palette::from_colors(&colors);
        assert_eq!(p.0[6], Rgb([6, 6, 6]));
    }

    #[test]
    fn unknown_biome_samples_gray() {
        let catalog = BiomeCatalog::default();
        let c = catalog.sample_color(&BiomeId::new("moon"), &mut rng());
        assert_eq!(c, UNKNOWN_BIOME_COLOR);
    }

    #[test]
    fn samples_come_from_the_palette() {
        let catalog = BiomeCatalog::default();
        let id = BiomeId::new("water");
        let palette = catalog.palette(&id).unwrap().clone();
        let mut rng = rng();
        for _ in 0..50 {
            assert!(palette.0.contains(&catalog.sample_color(&id, &mut rng)));
        }
    }

    #[test]
    fn load_record_overrides_stock_palette() {
        let mut catalog = BiomeCatalog::default();
        let id = catalog
            .load_record("forest.json", r#"{"biome":"forest","colors":[[1,1,1]]}"#)
            .unwrap();
        assert_eq!(id, BiomeId::new("forest"));
        assert_eq!(catalog.palette(&id).unwrap().0[0], Rgb([1, 1, 1]));
        assert_eq!(catalog.len(), 8);
    }

    #[test]
    fn load_record_rejects_garbage() {
        let mut catalog = BiomeCatalog::empty();
        let err = catalog.load_record("bad.json", "{ nope").unwrap_err();
        assert!(matches!(err, WorldError::MalformedRecord { .. }));
        assert!(catalog.is_empty());
    }

    #[test]
    fn load_dir_skips_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("ice.json"),
            r#"{"biome":"ice","colors":[[200,220,255],[180,200,240]]}"#,
        )
        .unwrap();
        fs::write(dir.path().join("broken.json"), "not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut catalog = BiomeCatalog::empty();
        let report = catalog.load_dir(dir.path());
        assert_eq!(report.loaded, 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(catalog.palette(&BiomeId::new("ice")).is_some());
    }

    #[test]
    fn missing_dir_loads_nothing() {
        let mut catalog = BiomeCatalog::empty();
        let report = catalog.load_dir(Path::new("/definitely/not/here"));
        assert_eq!(report.loaded, 0);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn random_policy_is_reproducible_with_seed() {
        let catalog = BiomeCatalog::default();
        let pick = |seed| {
            let mut rng = SmallRng::seed_from_u64(seed);
            (0..10)
                .map(|i| RandomBiomes.assign(AxialCoord::new(i, 0, 0), &catalog, &mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(pick(3), pick(3));
    }

    #[test]
    fn noise_policy_only_returns_known_biomes_and_is_stable() {
        let catalog = BiomeCatalog::default();
        let mut policy = NoiseBiomes::new(42, 3, 6.0);
        let mut rng = rng();
        let c = AxialCoord::new(5, -2, 1);
        let first = policy.assign(c, &catalog, &mut rng);
        assert!(catalog.palette(&first).is_some());
        assert_eq!(policy.assign(c, &catalog, &mut rng), first);
    }

    #[test]
    fn policy_kind_parses_free_text_as_fixed() {
        assert_eq!("noise".parse::<BiomePolicyKind>().unwrap(), BiomePolicyKind::Noise);
        assert_eq!(
            "desert".parse::<BiomePolicyKind>().unwrap(),
            BiomePolicyKind::Fixed("desert".into())
        );
    }
}
