use std::path::Path;

use bevy::prelude::*;

use super::{BiomeCatalog, HexGrid, PropRegistry, WorldConfig, WorldState};

// ── Startup ─────────────────────────────────────────────────────────

/// Loads palettes and prop definitions, then inserts the [`HexGrid`]
/// resource: restored from the world file when one exists, otherwise a
/// single tile at the origin.
pub fn build_grid(mut commands: Commands, cfg: Res<WorldConfig>) {
    let mut catalog = BiomeCatalog::default();
    catalog.load_dir(Path::new(&cfg.palettes_dir));

    let mut props = PropRegistry::default();
    props.load_definitions_dir(Path::new(&cfg.props_dir));

    let mut grid = HexGrid::new(cfg.geometry.clone(), cfg.floor_z, cfg.seed)
        .with_catalog(catalog)
        .with_props(props)
        .with_policy(cfg.biome_policy.build(cfg.seed));

    let world_file = Path::new(&cfg.world_file);
    let restored = world_file.exists()
        && match WorldState::load(&mut grid, world_file) {
            Ok(_) => true,
            Err(e) => {
                warn!("starting with a fresh world: {e}");
                false
            }
        };
    if !restored {
        grid.generate_tile(grid.cursor());
    }
    info!(
        "world ready: {} tiles, {} props",
        grid.tile_count(),
        grid.props().placement_count()
    );
    commands.insert_resource(grid);
}
