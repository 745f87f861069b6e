//! Prop templates, their placements on tile sections, and collision.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::biome::BiomeId;
use super::coords::{AxialCoord, SectionAddress, SectionKind};
use super::tile::Rgb;
use crate::error::{LoadReport, WorldError};

const DEFAULT_PROP_COLOR: Rgb = Rgb([100, 100, 100]);

fn default_color() -> Rgb {
    DEFAULT_PROP_COLOR
}

fn default_radius() -> f32 {
    10.0
}

fn default_side() -> f32 {
    20.0
}

fn default_triangle() -> f32 {
    15.0
}

fn one() -> f32 {
    1.0
}

fn yes() -> bool {
    true
}

/// Shape drawn for a prop, tagged by `"type"` on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VisualShape {
    /// Filled disc.
    Circle {
        #[serde(default = "default_color")]
        color: Rgb,
        #[serde(default = "default_radius")]
        radius: f32,
    },
    /// Axis-aligned rectangle centred on the anchor.
    Rect {
        #[serde(default = "default_color")]
        color: Rgb,
        #[serde(default = "default_side")]
        width: f32,
        #[serde(default = "default_side")]
        height: f32,
    },
    /// Upward-pointing triangle with half-extent `size`.
    Triangle {
        #[serde(default = "default_color")]
        color: Rgb,
        #[serde(default = "default_triangle")]
        size: f32,
    },
    /// Image asset, path relative to the working directory.
    Image { path: String },
}

/// A shape plus the instance-adjustable placement fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualDescriptor {
    #[serde(flatten)]
    pub shape: VisualShape,
    /// Pixel offset from the section anchor.
    #[serde(default)]
    pub offset: [f32; 2],
    #[serde(default = "one")]
    pub scale: f32,
}

impl VisualDescriptor {
    /// A descriptor with no offset and unit scale.
    pub fn new(shape: VisualShape) -> Self {
        Self {
            shape,
            offset: [0.0; 2],
            scale: 1.0,
        }
    }

    /// Fill color; images have none.
    pub fn color(&self) -> Option<Rgb> {
        match &self.shape {
            VisualShape::Circle { color, .. }
            | VisualShape::Rect { color, .. }
            | VisualShape::Triangle { color, .. } => Some(*color),
            VisualShape::Image { .. } => None,
        }
    }
}

/// Procedural pattern painted over a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    #[default]
    Solid,
    Bricks,
    Cobblestone,
    OrganicScatter,
    Tiles,
    Herringbone,
    SandRipples,
    Rocky,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariationKind {
    #[default]
    None,
    RandomShading,
    RandomPositioning,
    NoiseOverlay,
    Combo,
}

fn default_intensity() -> f32 {
    0.2
}

/// How much a pattern's colors wander.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variation {
    #[serde(rename = "type", default)]
    pub kind: VariationKind,
    #[serde(default = "default_intensity")]
    pub intensity: f32,
}

impl Default for Variation {
    fn default() -> Self {
        Self {
            kind: VariationKind::None,
            intensity: default_intensity(),
        }
    }
}

/// Recoloring a prop applies to the section it sits on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coloration {
    colors: Vec<Rgb>,
    #[serde(default)]
    pub pattern: PatternKind,
    #[serde(default)]
    pub variation: Variation,
}

impl Coloration {
    pub fn new(colors: Vec<Rgb>, pattern: PatternKind, variation: Variation) -> Self {
        Self {
            colors,
            pattern,
            variation,
        }
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// First listed color, the section's representative color.
    pub fn primary(&self) -> Rgb {
        self.colors.first().copied().unwrap_or(DEFAULT_PROP_COLOR)
    }
}

/// Which sections a definition is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Center,
    Wedge,
    #[default]
    Any,
}

/// `section_type` plus an optional pinned wedge index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SectionFilter {
    #[serde(rename = "section_type", default)]
    pub kind: SectionType,
    #[serde(rename = "section_index", default)]
    pub index: Option<u8>,
}

impl SectionFilter {
    /// Whether a prop with this filter belongs on `section`.
    pub fn admits(&self, section: SectionKind) -> bool {
        match (self.kind, section.wedge_index()) {
            (SectionType::Any, _) => true,
            (SectionType::Center, None) => true,
            (SectionType::Wedge, Some(i)) => self.index.is_none_or(|pin| pin as usize == i),
            _ => false,
        }
    }
}

/// Immutable prop template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropDefinition {
    #[serde(rename = "prop_id")]
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(default = "yes")]
    pub blocking: bool,
    /// Lift above the tile surface, in hex sizes.
    #[serde(rename = "z_offset", default)]
    pub vertical_offset: f32,
    pub visual: VisualDescriptor,
    #[serde(rename = "biome", default)]
    pub biome_filter: Option<BiomeId>,
    #[serde(flatten)]
    pub section_filter: SectionFilter,
    #[serde(default)]
    pub coloration: Option<Coloration>,
}

impl PropDefinition {
    /// Parses and validates one JSON record.
    pub fn from_json(origin: &str, text: &str) -> Result<Self, WorldError> {
        let def: PropDefinition =
            serde_json::from_str(text).map_err(|e| WorldError::malformed(origin, e))?;
        if def.id.trim().is_empty() {
            return Err(WorldError::malformed(origin, "empty prop_id"));
        }
        if def.section_filter.index.is_some_and(|i| i as usize >= 6) {
            return Err(WorldError::malformed(origin, "section_index out of range 0..6"));
        }
        if def.coloration.as_ref().is_some_and(|c| c.colors.is_empty()) {
            return Err(WorldError::malformed(origin, "coloration has no colors"));
        }
        Ok(def)
    }

    /// Whether this prop fits `section` on a tile of `biome`.
    pub fn admits(&self, section: SectionKind, biome: &BiomeId) -> bool {
        self.section_filter.admits(section)
            && self.biome_filter.as_ref().is_none_or(|b| b == biome)
    }
}

/// A prop standing on one section. Carries its own copy of the template's
/// visual fields so per-instance edits leave the template alone.
#[derive(Debug, Clone, PartialEq)]
pub struct PropPlacement {
    pub address: SectionAddress,
    pub definition_id: String,
    pub blocking: bool,
    pub vertical_offset: f32,
    pub visual: VisualDescriptor,
    pub coloration: Option<Coloration>,
}

impl PropPlacement {
    fn instantiate(address: SectionAddress, def: &PropDefinition) -> Self {
        Self {
            address,
            definition_id: def.id.clone(),
            blocking: def.blocking,
            vertical_offset: def.vertical_offset,
            visual: def.visual.clone(),
            coloration: def.coloration.clone(),
        }
    }
}

/// Prop templates plus every placement in the world.
#[derive(Debug, Clone, Default)]
pub struct PropRegistry {
    definitions: BTreeMap<String, PropDefinition>,
    placements: HashMap<SectionAddress, PropPlacement>,
}

impl PropRegistry {
    /// Adds a template; an existing id is overwritten.
    pub fn insert_definition(&mut self, def: PropDefinition) {
        if self.definitions.contains_key(&def.id) {
            debug!("prop definition '{}' overwritten", def.id);
        }
        self.definitions.insert(def.id.clone(), def);
    }

    /// Loads templates from in-memory `(origin, json)` records.
    pub fn load_definitions<'a>(
        &mut self,
        records: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> LoadReport {
        let mut report = LoadReport::default();
        for (origin, text) in records {
            match PropDefinition::from_json(origin, text) {
                Ok(def) => {
                    self.insert_definition(def);
                    report.loaded += 1;
                }
                Err(e) => report.skip(e),
            }
        }
        report
    }

    /// Loads every `*.json` template in `dir`, in file-name order.
    pub fn load_definitions_dir(&mut self, dir: &Path) -> LoadReport {
        let mut report = LoadReport::default();
        let Ok(entries) = fs::read_dir(dir) else {
            warn!("prop directory {} not found", dir.display());
            return report;
        };
        let mut paths: Vec<_> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        for path in paths {
            match fs::read_to_string(&path) {
                Ok(text) => {
                    let origin = path.display().to_string();
                    report.merge(self.load_definitions([(origin.as_str(), text.as_str())]));
                }
                Err(source) => report.skip(WorldError::PersistenceIo { path, source }),
            }
        }
        info!(
            "loaded {} prop definitions from {} ({} skipped)",
            report.loaded,
            dir.display(),
            report.skipped.len()
        );
        report
    }

    pub fn definition(&self, id: &str) -> Option<&PropDefinition> {
        self.definitions.get(id)
    }

    /// All template ids, sorted.
    pub fn definition_ids(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Templates that fit `section` on a tile of `biome`, sorted by id.
    pub fn definitions_for(&self, section: SectionKind, biome: &BiomeId) -> Vec<&PropDefinition> {
        self.definitions
            .values()
            .filter(|d| d.admits(section, biome))
            .collect()
    }

    /// Places a fresh instance of `definition_id` on one section.
    pub fn place(
        &mut self,
        coord: AxialCoord,
        section: SectionKind,
        definition_id: &str,
    ) -> Result<&PropPlacement, WorldError> {
        self.instantiate(SectionAddress::new(coord, section), definition_id, |_| {})
    }

    /// Re-inserts a saved placement with its instance-level visual and
    /// coloration. The template must still exist; blocking is taken from it.
    pub fn restore(
        &mut self,
        address: SectionAddress,
        definition_id: &str,
        visual: Option<VisualDescriptor>,
        coloration: Option<Coloration>,
    ) -> Result<&PropPlacement, WorldError> {
        self.instantiate(address, definition_id, |placement| {
            if let Some(visual) = visual {
                placement.visual = visual;
            }
            placement.coloration = coloration;
        })
    }

    fn instantiate(
        &mut self,
        address: SectionAddress,
        definition_id: &str,
        customize: impl FnOnce(&mut PropPlacement),
    ) -> Result<&PropPlacement, WorldError> {
        let def = self
            .definitions
            .get(definition_id)
            .ok_or_else(|| WorldError::UnknownDefinition(definition_id.to_owned()))?;
        if self.placements.contains_key(&address) {
            return Err(WorldError::SectionOccupied(address));
        }
        let mut placement = PropPlacement::instantiate(address, def);
        customize(&mut placement);
        Ok(self.placements.entry(address).or_insert(placement))
    }

    pub fn remove(&mut self, coord: AxialCoord, section: SectionKind) -> Option<PropPlacement> {
        self.placements.remove(&SectionAddress::new(coord, section))
    }

    pub fn placement(&self, address: SectionAddress) -> Option<&PropPlacement> {
        self.placements.get(&address)
    }

    /// True iff any prop on `coord` blocks.
    pub fn collision(&self, coord: AxialCoord) -> bool {
        self.placements_at(coord).iter().any(|p| p.blocking)
    }

    /// Placements on all seven sections of `coord`, in section order.
    pub fn placements_at(&self, coord: AxialCoord) -> Vec<&PropPlacement> {
        SectionKind::all()
            .filter_map(|s| self.placements.get(&SectionAddress::new(coord, s)))
            .collect()
    }

    /// Every placement, in no particular order.
    pub fn placements(&self) -> impl Iterator<Item = &PropPlacement> {
        self.placements.values()
    }

    pub fn placement_count(&self) -> usize {
        self.placements.len()
    }

    pub fn clear_placements(&mut self) {
        self.placements.clear();
    }
}
