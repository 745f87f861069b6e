//! The world model: coordinates, biomes, tiles, props and the grid that
//! owns them.
//!
//! Everything below this module is plain data plus operations and can be
//! exercised without an [`App`]; [`WorldPlugin`] only builds the [`HexGrid`]
//! resource at startup.

pub mod biome;
pub mod coords;
pub mod grid;
pub mod persistence;
pub mod props;
mod startup_systems;
pub mod tile;

pub use biome::{BiomeCatalog, BiomeId, BiomePolicy, BiomePolicyKind};
pub use coords::{AxialCoord, HexDirection, SectionAddress, SectionKind, WedgeIndex};
pub use grid::{Generated, HexGrid, LayerPlan};
pub use persistence::WorldState;
pub use props::{Coloration, PropDefinition, PropPlacement, PropRegistry, VisualDescriptor, VisualShape};
pub use tile::{Rgb, Tile};

use bevy::prelude::*;

/// Configuration for the world model.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct WorldConfig {
    /// Tile geometry shared by rendering, prop placement and picking.
    pub geometry: GeometrySettings,
    /// Lowest layer [`HexGrid::topmost_accessible`] may return is `floor_z + 1`.
    pub floor_z: i32,
    /// Seed for biome and section color sampling.
    pub seed: u64,
    /// How new tiles get their biome.
    pub biome_policy: BiomePolicyKind,
    /// Directory of prop definition records.
    pub props_dir: String,
    /// Directory of biome palette records.
    pub palettes_dir: String,
    /// Save/load target.
    pub world_file: String,
}

/// Tile proportions, in world units.
#[derive(Clone, Debug, PartialEq, Reflect)]
pub struct GeometrySettings {
    /// Outer hexagon radius.
    pub hex_size: f32,
    /// Inner "center" hexagon radius as a fraction of `hex_size`.
    pub center_scale: f32,
    /// Wedge prop radius: `(inner + outer) * prop_radius_factor`.
    pub prop_radius_factor: f32,
    /// Height of the extruded side band as a fraction of `hex_size`.
    pub band_height_ratio: f32,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            hex_size: 120.0,
            center_scale: 0.60,
            prop_radius_factor: 0.45,
            band_height_ratio: 0.25,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            geometry: GeometrySettings::default(),
            floor_z: -10,
            seed: 42,
            biome_policy: BiomePolicyKind::Random,
            props_dir: "assets/props".into(),
            palettes_dir: "assets/palettes".into(),
            world_file: "world_state.json".into(),
        }
    }
}

/// World plugin: builds the [`HexGrid`] from [`WorldConfig`] at startup.
pub struct WorldPlugin(pub WorldConfig);

impl Plugin for WorldPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<WorldConfig>()
            .insert_resource(self.0.clone())
            .add_systems(Startup, startup_systems::build_grid);
    }
}
