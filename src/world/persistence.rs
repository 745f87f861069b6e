//! JSON snapshot of the grid: tiles, placements and cursor.
//!
//! Records are parsed one by one so a single bad entry costs only itself.

use std::fs;
use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::biome::BiomeId;
use super::coords::{AxialCoord, SectionAddress, SectionKind};
use super::grid::HexGrid;
use super::props::{Coloration, VisualDescriptor};
use super::tile::{Rgb, Tile};
use crate::error::{LoadReport, WorldError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileRecord {
    pub coords: AxialCoord,
    pub biome: BiomeId,
    pub section_colors: [Rgb; SectionKind::COUNT],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropRecord {
    pub coords: AxialCoord,
    pub section: SectionKind,
    pub prop_id: String,
    /// Instance visual; the template's when absent.
    #[serde(default)]
    pub visual: Option<VisualDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coloration: Option<Coloration>,
}

/// Serializable world snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    #[serde(default)]
    pub cursor: AxialCoord,
    pub tiles: Vec<TileRecord>,
    pub props: Vec<PropRecord>,
}

/// Top level with records left unparsed.
#[derive(Deserialize)]
struct RawWorld {
    #[serde(default)]
    cursor: Option<AxialCoord>,
    #[serde(default)]
    tiles: Vec<Value>,
    #[serde(default)]
    props: Vec<Value>,
}

impl WorldState {
    /// Snapshot of `grid`, sorted so identical worlds produce identical files.
    pub fn capture(grid: &HexGrid) -> Self {
        let mut tiles: Vec<TileRecord> = grid
            .tiles()
            .map(|t| TileRecord {
                coords: t.coord(),
                biome: t.biome().clone(),
                section_colors: *t.section_colors(),
            })
            .collect();
        tiles.sort_by_key(|t| <[i32; 3]>::from(t.coords));

        let mut props: Vec<PropRecord> = grid
            .props()
            .placements()
            .map(|p| PropRecord {
                coords: p.address.coord,
                section: p.address.section,
                prop_id: p.definition_id.clone(),
                visual: Some(p.visual.clone()),
                coloration: p.coloration.clone(),
            })
            .collect();
        props.sort_by_key(|p| (<[i32; 3]>::from(p.coords), p.section.slot()));

        Self {
            cursor: grid.cursor(),
            tiles,
            props,
        }
    }

    pub fn to_json(&self) -> Result<String, WorldError> {
        serde_json::to_string_pretty(self).map_err(|e| WorldError::malformed("world state", e))
    }

    /// Writes the snapshot of `grid` to `path`.
    pub fn save(grid: &HexGrid, path: &Path) -> Result<(), WorldError> {
        let state = Self::capture(grid);
        let json = state.to_json()?;
        fs::write(path, json).map_err(|source| WorldError::PersistenceIo {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            "saved {} tiles and {} props to {}",
            state.tiles.len(),
            state.props.len(),
            path.display()
        );
        Ok(())
    }

    /// Replaces the contents of `grid` with the world stored at `path`.
    ///
    /// An unreadable file or unparsable document leaves `grid` untouched.
    pub fn load(grid: &mut HexGrid, path: &Path) -> Result<LoadReport, WorldError> {
        let text = fs::read_to_string(path).map_err(|source| WorldError::PersistenceIo {
            path: path.to_path_buf(),
            source,
        })?;
        let report = Self::apply_json(grid, &path.display().to_string(), &text)?;
        info!(
            "loaded {} records from {} ({} skipped)",
            report.loaded,
            path.display(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Restores tiles, then placements, then section colorations.
    pub fn apply_json(
        grid: &mut HexGrid,
        origin: &str,
        text: &str,
    ) -> Result<LoadReport, WorldError> {
        let raw: RawWorld =
            serde_json::from_str(text).map_err(|e| WorldError::malformed(origin, e))?;
        let mut report = LoadReport::default();
        grid.clear();

        for (i, value) in raw.tiles.into_iter().enumerate() {
            match serde_json::from_value::<TileRecord>(value) {
                Ok(rec) => {
                    grid.insert_tile(Tile::with_colors(
                        rec.coords,
                        rec.biome,
                        rec.section_colors,
                    ));
                    report.loaded += 1;
                }
                Err(e) => report.skip(WorldError::malformed(format!("{origin} tiles[{i}]"), e)),
            }
        }

        for (i, value) in raw.props.into_iter().enumerate() {
            let rec = match serde_json::from_value::<PropRecord>(value) {
                Ok(rec) => rec,
                Err(e) => {
                    report.skip(WorldError::malformed(format!("{origin} props[{i}]"), e));
                    continue;
                }
            };
            let address = SectionAddress::new(rec.coords, rec.section);
            match grid
                .props_mut()
                .restore(address, &rec.prop_id, rec.visual, rec.coloration)
            {
                Ok(_) => report.loaded += 1,
                Err(e) => report.skip(e),
            }
        }

        let recolored = grid.reapply_colorations();
        debug!("re-applied {recolored} section colorations");
        grid.set_cursor(raw.cursor.unwrap_or_default());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::GeometrySettings;
    use crate::world::coords::HexDirection;
    use crate::world::props::PropRegistry;

    const STONE: &str = r#"{"prop_id": "stone", "name": "Stone",
        "visual": {"type": "circle", "color": [120, 120, 120], "radius": 9}}"#;
    const MOSAIC: &str = r#"{"prop_id": "mosaic", "name": "Mosaic", "blocking": false,
        "visual": {"type": "rect"},
        "coloration": {"colors": [[200, 40, 40], [40, 40, 200]], "pattern": "herringbone"}}"#;

    fn registry() -> PropRegistry {
        let mut props = PropRegistry::default();
        props.load_definitions([("stone", STONE), ("mosaic", MOSAIC)]);
        props
    }

    fn sample_world() -> HexGrid {
        let mut g = HexGrid::new(GeometrySettings::default(), -10, 5).with_props(registry());
        g.generate_tile(AxialCoord::ORIGIN);
        g.generate_neighbors(AxialCoord::ORIGIN);
        g.place_prop("stone").unwrap();
        g.select_section(SectionKind::wedge(3));
        g.place_prop("mosaic").unwrap();
        g.move_horizontal(HexDirection::West);
        g
    }

    fn empty_world() -> HexGrid {
        HexGrid::new(GeometrySettings::default(), -10, 99).with_props(registry())
    }

    #[test]
    fn save_and_load_restore_the_world() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");
        let original = sample_world();
        WorldState::save(&original, &path).unwrap();

        let mut restored = empty_world();
        let report = WorldState::load(&mut restored, &path).unwrap();
        assert!(report.skipped.is_empty());
        assert_eq!(report.loaded, 7 + 2);
        assert_eq!(WorldState::capture(&restored), WorldState::capture(&original));

        let tile = restored.tile(AxialCoord::ORIGIN).unwrap();
        assert_eq!(tile.section_color(SectionKind::wedge(3)), Rgb([200, 40, 40]));
        assert!(tile.section_override(SectionKind::wedge(3)).is_some());
        assert!(restored.props().collision(AxialCoord::ORIGIN));
        assert_eq!(restored.cursor(), AxialCoord::new(-1, 0, 0));
    }

    #[test]
    fn section_serializes_as_tag_or_wedge_index() {
        let json = WorldState::capture(&sample_world()).to_json().unwrap();
        assert!(json.contains(r#""section": "center""#));
        assert!(json.contains(r#""wedge": 3"#));
    }

    #[test]
    fn missing_file_leaves_grid_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut g = sample_world();
        let before = WorldState::capture(&g);
        let err = WorldState::load(&mut g, &dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, WorldError::PersistenceIo { .. }));
        assert_eq!(WorldState::capture(&g), before);
    }

    #[test]
    fn unparsable_document_leaves_grid_untouched() {
        let mut g = sample_world();
        let before = WorldState::capture(&g);
        let err = WorldState::apply_json(&mut g, "bad", "{\"tiles\": 3").unwrap_err();
        assert!(matches!(err, WorldError::MalformedRecord { .. }));
        assert_eq!(WorldState::capture(&g), before);
    }

    #[test]
    fn bad_records_are_skipped() {
        let text = r#"{
            "cursor": [0, 0, 0],
            "tiles": [
                {"coords": [0, 0, 0], "biome": "forest",
                 "section_colors": [[1,1,1],[2,2,2],[3,3,3],[4,4,4],[5,5,5],[6,6,6],[7,7,7]]},
                {"coords": [1, 0, 0], "biome": "forest", "section_colors": [[1,1,1]]}
            ],
            "props": [
                {"coords": [0, 0, 0], "section": "center", "prop_id": "stone"},
                {"coords": [0, 0, 0], "section": {"wedge": 1}, "prop_id": "dragon"},
                {"coords": [0, 0, 0], "section": {"wedge": 9}, "prop_id": "stone"}
            ]
        }"#;
        let mut g = empty_world();
        let report = WorldState::apply_json(&mut g, "inline", text).unwrap();
        assert_eq!(report.loaded, 2);
        assert_eq!(report.skipped.len(), 3);
        assert!(
            report
                .skipped
                .iter()
                .any(|e| matches!(e, WorldError::UnknownDefinition(id) if id == "dragon"))
        );
        assert_eq!(g.tile_count(), 1);
        assert_eq!(
            g.tile(AxialCoord::ORIGIN).unwrap().section_color(SectionKind::wedge(5)),
            Rgb([7, 7, 7])
        );
        // template visual used when the record has none
        let p = g
            .props()
            .placement(SectionAddress::new(AxialCoord::ORIGIN, SectionKind::Center))
            .unwrap();
        assert_eq!(p.visual, g.props().definition("stone").unwrap().visual);
    }
}
