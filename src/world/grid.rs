//! The editable world: tiles by coordinate, cursor, selected section and
//! props, plus the operations the editor drives.

use std::collections::BTreeMap;

use bevy::platform::collections::HashMap;
use bevy::prelude::*;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use super::GeometrySettings;
use super::biome::{BiomeCatalog, BiomePolicy, RandomBiomes};
use super::coords::{AxialCoord, HexDirection, SectionAddress, SectionKind};
use super::props::{PropPlacement, PropRegistry};
use super::tile::Tile;
use crate::error::WorldError;
use crate::math;

/// Result of [`HexGrid::generate_tile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generated {
    /// A tile was already there.
    Existing,
    /// A new tile was created.
    Created,
    /// A blocking prop occupies the coordinate; nothing was created.
    Blocked,
}

/// One z-layer of the painter's-algorithm draw order.
#[derive(Debug)]
pub struct LayerPlan<'a> {
    pub z: i32,
    /// Sorted by `(r, q)`.
    pub tiles: Vec<&'a Tile>,
    /// Drawn after every tile of the layer; only props standing on a tile.
    pub props: Vec<&'a PropPlacement>,
}

/// Owns every tile and prop of the world.
#[derive(Resource)]
pub struct HexGrid {
    tiles: HashMap<AxialCoord, Tile>,
    cursor: AxialCoord,
    selected_section: SectionKind,
    props: PropRegistry,
    catalog: BiomeCatalog,
    policy: Box<dyn BiomePolicy>,
    rng: SmallRng,
    geometry: GeometrySettings,
    floor_z: i32,
}

impl HexGrid {
    /// An empty grid with the stock biome catalog, no prop definitions and
    /// random biome assignment.
    pub fn new(geometry: GeometrySettings, floor_z: i32, seed: u64) -> Self {
        Self {
            tiles: HashMap::default(),
            cursor: AxialCoord::ORIGIN,
            selected_section: SectionKind::Center,
            props: PropRegistry::default(),
            catalog: BiomeCatalog::default(),
            policy: Box::new(RandomBiomes),
            rng: SmallRng::seed_from_u64(seed),
            geometry,
            floor_z,
        }
    }

    pub fn with_catalog(mut self, catalog: BiomeCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_props(mut self, props: PropRegistry) -> Self {
        self.props = props;
        self
    }

    pub fn with_policy(mut self, policy: Box<dyn BiomePolicy>) -> Self {
        self.policy = policy;
        self
    }

    // ── accessors ───────────────────────────────────────────────────

    pub fn cursor(&self) -> AxialCoord {
        self.cursor
    }

    /// Moves the cursor without generating anything.
    pub fn set_cursor(&mut self, coord: AxialCoord) {
        self.cursor = coord;
    }

    pub fn selected_section(&self) -> SectionKind {
        self.selected_section
    }

    pub fn select_section(&mut self, section: SectionKind) {
        self.selected_section = section;
    }

    /// Cursor plus selected section.
    pub fn selected_address(&self) -> SectionAddress {
        SectionAddress::new(self.cursor, self.selected_section)
    }

    pub fn tile(&self, coord: AxialCoord) -> Option<&Tile> {
        self.tiles.get(&coord)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Number of distinct z-layers holding tiles.
    pub fn layer_count(&self) -> usize {
        let mut zs: Vec<i32> = self.tiles.keys().map(|c| c.z).collect();
        zs.sort_unstable();
        zs.dedup();
        zs.len()
    }

    pub fn props(&self) -> &PropRegistry {
        &self.props
    }

    pub fn catalog(&self) -> &BiomeCatalog {
        &self.catalog
    }

    pub fn geometry(&self) -> &GeometrySettings {
        &self.geometry
    }

    /// Pixel centre of a coordinate's top face.
    pub fn pixel_center(&self, coord: AxialCoord) -> Vec2 {
        math::axial_to_pixel(coord.q(), coord.r(), coord.z, self.geometry.hex_size)
    }

    // ── generation ──────────────────────────────────────────────────

    /// Creates a tile at `coord` unless one exists or a blocking prop is there.
    pub fn generate_tile(&mut self, coord: AxialCoord) -> Generated {
        if self.tiles.contains_key(&coord) {
            return Generated::Existing;
        }
        if self.props.collision(coord) {
            debug!("generation at {coord} blocked by a prop");
            return Generated::Blocked;
        }
        let biome = self.policy.assign(coord, &self.catalog, &mut self.rng);
        let tile = Tile::generate(coord, biome, &self.catalog, &mut self.rng);
        self.tiles.insert(coord, tile);
        Generated::Created
    }

    /// Generates the six same-layer neighbours of `coord`.
    pub fn generate_neighbors(&mut self, coord: AxialCoord) -> usize {
        coord
            .neighbors()
            .into_iter()
            .filter(|&n| self.generate_tile(n) == Generated::Created)
            .count()
    }

    /// Swaps in a tile verbatim (restoring saved worlds).
    pub fn insert_tile(&mut self, tile: Tile) {
        self.tiles.insert(tile.coord(), tile);
    }

    pub fn remove_tile(&mut self, coord: AxialCoord) -> Option<Tile> {
        self.tiles.remove(&coord)
    }

    /// Drops every tile and placement and returns the cursor to the origin.
    pub fn clear(&mut self) {
        self.tiles.clear();
        self.props.clear_placements();
        self.cursor = AxialCoord::ORIGIN;
        self.selected_section = SectionKind::Center;
    }

    // ── movement ────────────────────────────────────────────────────

    /// Steps the cursor to a same-layer neighbour, generating it.
    ///
    /// The cursor moves even when generation is blocked.
    pub fn move_horizontal(&mut self, direction: HexDirection) -> Generated {
        self.cursor = self.cursor.neighbor(direction);
        self.generate_tile(self.cursor)
    }

    pub fn move_up(&mut self) -> Generated {
        self.cursor = self.cursor.with_z(self.cursor.z + 1);
        self.generate_tile(self.cursor)
    }

    /// Steps down one layer, then deletes the tile that was stood on.
    pub fn move_down(&mut self) -> Generated {
        let old = self.cursor;
        self.cursor = old.with_z(old.z - 1);
        let outcome = self.generate_tile(self.cursor);
        self.tiles.remove(&old);
        outcome
    }

    /// Nearest walkable layer of `coord`'s column, searching downward.
    ///
    /// From a blocked layer, the first free layer under the blocking stack,
    /// or `None` if the stack reaches the floor. From a free layer, the
    /// lowest free layer resting on a blocking prop beneath it; a column with
    /// nothing blocking below keeps `coord` itself.
    pub fn topmost_accessible(&self, coord: AxialCoord) -> Option<AxialCoord> {
        let blocked = |z: i32| self.props.collision(coord.with_z(z));
        let mut z = coord.z;
        if blocked(z) {
            while blocked(z) && z > self.floor_z {
                z -= 1;
            }
            return (z > self.floor_z).then(|| coord.with_z(z));
        }
        while z > self.floor_z {
            if blocked(z - 1) {
                return Some(coord.with_z(z));
            }
            z -= 1;
        }
        Some(coord)
    }

    /// Jumps the cursor to its column's walkable layer when that differs,
    /// then generates the neighbours of the coordinate it started from.
    ///
    /// Returns the jump target, if any, and the number of tiles created.
    pub fn expand_around_cursor(&mut self) -> (Option<AxialCoord>, usize) {
        let origin = self.cursor;
        let jump = self
            .topmost_accessible(origin)
            .filter(|&target| target != origin);
        if let Some(target) = jump {
            self.cursor = target;
        }
        (jump, self.generate_neighbors(origin))
    }

    /// Advances the selected section around the seven-state ring.
    pub fn cycle_section(&mut self) -> SectionKind {
        self.selected_section = self.selected_section.next();
        self.selected_section
    }

    // ── props ───────────────────────────────────────────────────────

    /// Places `definition_id` on the selected section of the cursor tile,
    /// applying its coloration to that section.
    pub fn place_prop(&mut self, definition_id: &str) -> Result<&PropPlacement, WorldError> {
        let SectionAddress { coord, section } = self.selected_address();
        let tile = self
            .tiles
            .get_mut(&coord)
            .ok_or(WorldError::NoTileAtCoordinate(coord))?;
        let placement = self.props.place(coord, section, definition_id)?;
        if let Some(coloration) = &placement.coloration {
            tile.set_section_override(section, coloration);
        }
        Ok(placement)
    }

    /// Removes the prop on the selected section; a removed coloration re-rolls
    /// the section color.
    pub fn remove_prop(&mut self) -> Option<PropPlacement> {
        let SectionAddress { coord, section } = self.selected_address();
        let removed = self.props.remove(coord, section)?;
        if let (Some(_), Some(tile)) = (&removed.coloration, self.tiles.get_mut(&coord)) {
            tile.clear_section_override(section, &self.catalog, &mut self.rng);
        }
        Some(removed)
    }

    /// Mutable registry access for loaders.
    pub fn props_mut(&mut self) -> &mut PropRegistry {
        &mut self.props
    }

    /// Re-applies every placement's coloration to its tile section.
    pub fn reapply_colorations(&mut self) -> usize {
        let mut applied = 0;
        for placement in self.props.placements() {
            let (Some(coloration), Some(tile)) = (
                &placement.coloration,
                self.tiles.get_mut(&placement.address.coord),
            ) else {
                continue;
            };
            tile.set_section_override(placement.address.section, coloration);
            applied += 1;
        }
        applied
    }

    // ── drawing & picking ───────────────────────────────────────────

    /// Layers in ascending z; tiles by `(r, q)`, then that layer's props.
    pub fn draw_plan(&self) -> Vec<LayerPlan<'_>> {
        let mut layers: BTreeMap<i32, Vec<&Tile>> = BTreeMap::new();
        for tile in self.tiles.values() {
            layers.entry(tile.coord().z).or_default().push(tile);
        }
        layers
            .into_iter()
            .map(|(z, mut tiles)| {
                tiles.sort_by_key(|t| (t.coord().r(), t.coord().q()));
                let props = tiles
                    .iter()
                    .flat_map(|t| self.props.placements_at(t.coord()))
                    .collect();
                LayerPlan { z, tiles, props }
            })
            .collect()
    }

    /// Topmost tile section under a pixel position (y down).
    pub fn pick(&self, pixel: Vec2) -> Option<SectionAddress> {
        let mut zs: Vec<i32> = self.tiles.keys().map(|c| c.z).collect();
        zs.sort_unstable();
        zs.dedup();
        let size = self.geometry.hex_size;
        zs.into_iter().rev().find_map(|z| {
            let (q, r, z) = math::pixel_to_axial(pixel, z, size);
            let coord = AxialCoord::new(q, r, z);
            self.tiles.get(&coord)?;
            let center = self.pixel_center(coord);
            let inner = math::hex_vertices(center, size, self.geometry.center_scale);
            let section = if math::point_in_convex_polygon(pixel, &inner) {
                SectionKind::Center
            } else {
                SectionKind::wedge(math::wedge_at_angle(pixel - center))
            };
            Some(SectionAddress::new(coord, section))
        })
    }

    /// Anchor of a prop on a section: tile centre or wedge prop centre.
    pub fn section_anchor(&self, address: SectionAddress) -> Vec2 {
        let center = self.pixel_center(address.coord);
        let g = &self.geometry;
        match address.section.wedge_index() {
            None => center,
            Some(i) => math::wedge_prop_center(
                center,
                g.hex_size,
                g.center_scale,
                g.prop_radius_factor,
                i,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::biome::{BiomeId, FixedBiome};
    use crate::world::tile::Rgb;

    const WALL: &str = r#"{"prop_id": "wall", "name": "Wall", "visual": {"type": "rect"}}"#;
    const GRASS: &str = r#"{"prop_id": "grass", "name": "Grass", "blocking": false,
        "visual": {"type": "circle"}}"#;
    const PAVING: &str = r#"{"prop_id": "paving", "name": "Paving", "blocking": false,
        "visual": {"type": "rect"},
        "coloration": {"colors": [[90, 80, 70]], "pattern": "tiles"}}"#;

    fn grid() -> HexGrid {
        let mut props = PropRegistry::default();
        props.load_definitions([("wall", WALL), ("grass", GRASS), ("paving", PAVING)]);
        let mut g = HexGrid::new(GeometrySettings::default(), -10, 3).with_props(props);
        g.generate_tile(AxialCoord::ORIGIN);
        g
    }

    fn block(g: &mut HexGrid, coord: AxialCoord) {
        g.props_mut()
            .place(coord, SectionKind::Center, "wall")
            .unwrap();
    }

    // ── generation ──────────────────────────────────────────────────

    #[test]
    fn generating_twice_keeps_the_first_tile() {
        let mut g = grid();
        let c = AxialCoord::new(2, -1, 0);
        assert_eq!(g.generate_tile(c), Generated::Created);
        let first = g.tile(c).cloned();
        assert_eq!(g.generate_tile(c), Generated::Existing);
        assert_eq!(g.tile(c).cloned(), first);
    }

    #[test]
    fn collision_blocks_generation() {
        let mut g = grid();
        let c = AxialCoord::new(4, 4, 0);
        for section in SectionKind::all() {
            g.props_mut().place(c, section, "wall").unwrap();
        }
        assert_eq!(g.generate_tile(c), Generated::Blocked);
        assert!(g.tile(c).is_none());
    }

    #[test]
    fn non_blocking_prop_does_not_block() {
        let mut g = grid();
        let c = AxialCoord::new(1, 1, 0);
        g.props_mut().place(c, SectionKind::wedge(2), "grass").unwrap();
        assert_eq!(g.generate_tile(c), Generated::Created);
    }

    #[test]
    fn biome_policy_is_injected() {
        let mut g = grid().with_policy(Box::new(FixedBiome(BiomeId::new("snow"))));
        let c = AxialCoord::new(0, 3, 0);
        g.generate_tile(c);
        assert_eq!(g.tile(c).unwrap().biome().as_str(), "snow");
    }

    #[test]
    fn same_seed_same_world() {
        let build = || {
            let mut g = HexGrid::new(GeometrySettings::default(), -10, 11);
            g.generate_tile(AxialCoord::ORIGIN);
            g.generate_neighbors(AxialCoord::ORIGIN);
            let mut tiles: Vec<_> = g.tiles().cloned().collect();
            tiles.sort_by_key(|t| <[i32; 3]>::from(t.coord()));
            tiles
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn neighbors_skip_blocked_cells() {
        let mut g = grid();
        block(&mut g, AxialCoord::new(1, 0, 0));
        assert_eq!(g.generate_neighbors(AxialCoord::ORIGIN), 5);
        assert_eq!(g.tile_count(), 6);
        assert!(g.tile(AxialCoord::new(1, 0, 0)).is_none());
    }

    // ── movement ────────────────────────────────────────────────────

    #[test]
    fn horizontal_move_follows_direction_vectors() {
        let mut g = grid();
        g.move_horizontal(HexDirection::NorthEast);
        assert_eq!(g.cursor(), AxialCoord::new(1, -1, 0));
        g.move_horizontal(HexDirection::SouthWest);
        assert_eq!(g.cursor(), AxialCoord::ORIGIN);
        g.move_horizontal(HexDirection::SouthEast);
        assert_eq!(g.cursor(), AxialCoord::new(0, 1, 0));
        assert!(g.tile(AxialCoord::new(1, -1, 0)).is_some());
    }

    #[test]
    fn cursor_moves_onto_blocked_cell() {
        let mut g = grid();
        let east = AxialCoord::new(1, 0, 0);
        block(&mut g, east);
        assert_eq!(g.move_horizontal(HexDirection::East), Generated::Blocked);
        assert_eq!(g.cursor(), east);
        assert!(g.tile(east).is_none());
    }

    #[test]
    fn move_down_deletes_the_tile_left_behind() {
        let mut g = grid();
        assert!(g.tile(AxialCoord::ORIGIN).is_some());
        g.move_up();
        g.move_down();
        assert_eq!(g.cursor(), AxialCoord::ORIGIN);
        assert!(g.tile(AxialCoord::new(0, 0, 0)).is_none());
        assert!(g.tile(AxialCoord::new(0, 0, 1)).is_some());
    }

    #[test]
    fn move_down_generates_before_deleting() {
        let mut g = grid();
        assert_eq!(g.move_down(), Generated::Created);
        assert_eq!(g.cursor(), AxialCoord::new(0, 0, -1));
        assert!(g.tile(AxialCoord::new(0, 0, -1)).is_some());
        assert!(g.tile(AxialCoord::ORIGIN).is_none());
    }

    #[test]
    fn topmost_accessible_lands_on_blocking_stack() {
        let mut g = grid();
        for z in 0..=2 {
            block(&mut g, AxialCoord::new(0, 0, z));
        }
        assert_eq!(
            g.topmost_accessible(AxialCoord::new(0, 0, 5)),
            Some(AxialCoord::new(0, 0, 3))
        );
        assert_eq!(
            g.topmost_accessible(AxialCoord::new(0, 0, 2)),
            Some(AxialCoord::new(0, 0, -1))
        );
    }

    #[test]
    fn topmost_accessible_keeps_an_open_column() {
        let mut g = grid();
        let start = AxialCoord::new(3, 3, 0);
        assert_eq!(g.topmost_accessible(start), Some(start));
        block(&mut g, AxialCoord::new(4, 3, -2));
        assert_eq!(g.topmost_accessible(start), Some(start));
        block(&mut g, AxialCoord::new(3, 3, -10));
        assert_eq!(g.topmost_accessible(start), Some(AxialCoord::new(3, 3, -9)));
    }

    #[test]
    fn topmost_accessible_stops_at_floor() {
        let mut g = grid();
        for z in -10..=0 {
            block(&mut g, AxialCoord::new(5, 0, z));
        }
        assert_eq!(g.topmost_accessible(AxialCoord::new(5, 0, 0)), None);
    }

    #[test]
    fn expand_jumps_then_fills_the_original_ring() {
        let mut g = grid();
        block(&mut g, AxialCoord::ORIGIN);
        let (jump, created) = g.expand_around_cursor();
        assert_eq!(jump, Some(AxialCoord::new(0, 0, -1)));
        assert_eq!(g.cursor(), AxialCoord::new(0, 0, -1));
        assert_eq!(created, 6);
        assert!(g.tile(AxialCoord::new(-1, 1, 0)).is_some());
    }

    #[test]
    fn expand_without_props_stays_put() {
        let mut g = grid();
        let (jump, created) = g.expand_around_cursor();
        assert_eq!(jump, None);
        assert_eq!(created, 6);
        assert_eq!(g.cursor(), AxialCoord::ORIGIN);
    }

    #[test]
    fn section_cycle_is_a_seven_ring() {
        let mut g = grid();
        for start in SectionKind::all() {
            g.select_section(start);
            for _ in 0..7 {
                g.cycle_section();
            }
            assert_eq!(g.selected_section(), start);
        }
        g.select_section(SectionKind::Center);
        assert_eq!(g.cycle_section(), SectionKind::wedge(0));
    }

    // ── props ───────────────────────────────────────────────────────

    #[test]
    fn placing_without_a_tile_fails() {
        let mut g = grid();
        g.set_cursor(AxialCoord::new(9, 9, 9));
        let err = g.place_prop("grass").unwrap_err();
        assert!(matches!(err, WorldError::NoTileAtCoordinate(c) if c == AxialCoord::new(9, 9, 9)));
        assert_eq!(g.props().placement_count(), 0);
    }

    #[test]
    fn second_placement_on_a_section_is_rejected() {
        let mut g = grid();
        g.place_prop("grass").unwrap();
        assert!(matches!(
            g.place_prop("wall"),
            Err(WorldError::SectionOccupied(_))
        ));
        assert_eq!(g.props().placements_at(AxialCoord::ORIGIN).len(), 1);
    }

    #[test]
    fn coloration_is_applied_and_rerolled() {
        let mut g = grid();
        g.select_section(SectionKind::wedge(4));
        let untouched = g.tile(AxialCoord::ORIGIN).unwrap().section_color(SectionKind::Center);

        g.place_prop("paving").unwrap();
        let tile = g.tile(AxialCoord::ORIGIN).unwrap();
        assert_eq!(tile.section_color(SectionKind::wedge(4)), Rgb([90, 80, 70]));
        assert!(tile.section_override(SectionKind::wedge(4)).is_some());
        assert_eq!(tile.section_color(SectionKind::Center), untouched);

        let removed = g.remove_prop().unwrap();
        assert_eq!(removed.definition_id, "paving");
        assert!(
            g.tile(AxialCoord::ORIGIN)
                .unwrap()
                .section_override(SectionKind::wedge(4))
                .is_none()
        );
    }

    #[test]
    fn removing_an_empty_section_returns_none() {
        let mut g = grid();
        assert!(g.remove_prop().is_none());
    }

    // ── drawing & picking ───────────────────────────────────────────

    #[test]
    fn draw_plan_orders_layers_and_rows() {
        let mut g = grid();
        for c in [
            AxialCoord::new(1, 1, 0),
            AxialCoord::new(-1, 1, 0),
            AxialCoord::new(2, -1, 0),
            AxialCoord::new(0, 0, -2),
            AxialCoord::new(0, 0, 3),
        ] {
            g.generate_tile(c);
        }
        g.set_cursor(AxialCoord::new(1, 1, 0));
        g.place_prop("grass").unwrap();
        // orphan placement: no tile at (7, 7, 0)
        g.props_mut()
            .place(AxialCoord::new(7, 7, 0), SectionKind::Center, "grass")
            .unwrap();

        let plan = g.draw_plan();
        let zs: Vec<i32> = plan.iter().map(|l| l.z).collect();
        assert_eq!(zs, [-2, 0, 3]);

        let row: Vec<[i32; 3]> = plan[1].tiles.iter().map(|t| t.coord().into()).collect();
        assert_eq!(row, [[2, -1, 0], [0, 0, 0], [-1, 1, 0], [1, 1, 0]]);
        assert_eq!(plan[1].props.len(), 1);
        assert!(plan[0].props.is_empty());
    }

    #[test]
    fn pick_resolves_center_and_wedges() {
        let g = grid();
        let size = g.geometry().hex_size;
        assert_eq!(
            g.pick(Vec2::ZERO),
            Some(SectionAddress::new(AxialCoord::ORIGIN, SectionKind::Center))
        );
        for i in 0..6 {
            let p = math::wedge_prop_center(Vec2::ZERO, size, 0.6, 0.45, i);
            assert_eq!(
                g.pick(p),
                Some(SectionAddress::new(AxialCoord::ORIGIN, SectionKind::wedge(i)))
            );
        }
        assert_eq!(g.pick(Vec2::new(size * 10.0, 0.0)), None);
    }

    #[test]
    fn pick_prefers_higher_layers() {
        let mut g = grid();
        g.generate_tile(AxialCoord::new(0, 0, 1));
        let top = g.pixel_center(AxialCoord::new(0, 0, 1));
        assert_eq!(g.pick(top).map(|a| a.coord), Some(AxialCoord::new(0, 0, 1)));
    }

    #[test]
    fn wedge_anchor_matches_geometry() {
        let g = grid();
        let addr = SectionAddress::new(AxialCoord::ORIGIN, SectionKind::wedge(2));
        let anchor = g.section_anchor(addr);
        let gs = g.geometry();
        let inner = math::hex_vertices(Vec2::ZERO, gs.hex_size, gs.center_scale);
        let outer = math::hex_vertices(Vec2::ZERO, gs.hex_size, 1.0);
        assert!(math::point_in_convex_polygon(
            anchor,
            &math::wedge_trapezoid(&inner, &outer, 2)
        ));
    }
}
