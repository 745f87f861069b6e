//! Pure geometry-to-mesh conversion for one layer of the draw plan.
//!
//! Input points are in pixel space (y down); the builder flips them into
//! world space as it emits vertices.

use bevy::asset::RenderAssetUsages;
use bevy::mesh::Indices;
use bevy::prelude::*;
use bevy::render::render_resource::PrimitiveTopology;

use super::ViewConfig;
use super::pattern::pattern_overlay;
use crate::math;
use crate::world::props::VisualShape;
use crate::world::tile::BAND_FACES;
use crate::world::{HexGrid, LayerPlan, PropPlacement, SectionKind, Tile};

/// Accumulates filled polygons and outlines into a single triangle list.
#[derive(Debug, Default)]
pub struct LayerMeshBuilder {
    positions: Vec<[f32; 3]>,
    colors: Vec<[f32; 4]>,
    indices: Vec<u32>,
    depth: f32,
    depth_step: f32,
}

impl LayerMeshBuilder {
    /// `depth_step` is added to z after every primitive.
    pub fn new(depth_step: f32) -> Self {
        Self {
            depth_step,
            ..default()
        }
    }

    /// Fills a convex polygon (fan triangulation).
    pub fn polygon(&mut self, points: &[Vec2], color: Color) {
        if points.len() < 3 {
            return;
        }
        let base = self.positions.len() as u32;
        let rgba = linear(color);
        for &p in points {
            self.push_vertex(p, rgba);
        }
        for i in 1..points.len() as u32 - 1 {
            // pixel space is y-down: reverse the fan so world winding is CCW
            self.indices.extend([base, base + i + 1, base + i]);
        }
        self.depth += self.depth_step;
    }

    /// Strokes a closed loop with quads of the given width.
    pub fn outline(&mut self, points: &[Vec2], width: f32, color: Color) {
        if points.len() < 2 {
            return;
        }
        let rgba = linear(color);
        let half = width / 2.0;
        for (i, &a) in points.iter().enumerate() {
            let b = points[(i + 1) % points.len()];
            let normal = (b - a).perp().normalize_or_zero() * half;
            let base = self.positions.len() as u32;
            for p in [a + normal, b + normal, b - normal, a - normal] {
                self.push_vertex(p, rgba);
            }
            self.indices
                .extend([base, base + 2, base + 1, base, base + 3, base + 2]);
        }
        self.depth += self.depth_step;
    }

    fn push_vertex(&mut self, pixel: Vec2, rgba: [f32; 4]) {
        let world = math::pixel_to_world(pixel);
        self.positions.push([world.x, world.y, self.depth]);
        self.colors.push(rgba);
    }

    /// World-space vertex positions emitted so far.
    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// z the next primitive would be emitted at.
    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn build(self) -> Mesh {
        let count = self.positions.len();
        Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::RENDER_WORLD,
        )
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, self.positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, vec![[0.0, 0.0, 1.0]; count])
        .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, vec![[0.0, 0.0]; count])
        .with_inserted_attribute(Mesh::ATTRIBUTE_COLOR, self.colors)
        .with_inserted_indices(Indices::U32(self.indices))
    }
}

fn linear(color: Color) -> [f32; 4] {
    let c = color.to_linear();
    [c.red, c.green, c.blue, c.alpha]
}

/// An image prop to spawn as a sprite.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageProp {
    /// Asset path, relative to the asset root.
    pub path: String,
    /// Pixel-space centre.
    pub position: Vec2,
    pub scale: f32,
}

/// Mesh data and sprites for one layer.
#[derive(Debug)]
pub struct BuiltLayer {
    pub mesh: LayerMeshBuilder,
    pub images: Vec<ImageProp>,
}

/// Emits a layer's tiles, then its props.
pub fn build_layer(grid: &HexGrid, layer: &LayerPlan<'_>, cfg: &ViewConfig) -> BuiltLayer {
    let mut mesh = LayerMeshBuilder::new(cfg.primitive_depth);
    for tile in &layer.tiles {
        tile_geometry(&mut mesh, grid, tile, cfg);
    }
    let mut images = Vec::new();
    for placement in &layer.props {
        if let Some(image) = prop_geometry(&mut mesh, grid, placement, cfg) {
            images.push(image);
        }
    }
    BuiltLayer { mesh, images }
}

/// Side band, seven sections with any pattern overlay, outlines.
pub fn tile_geometry(mesh: &mut LayerMeshBuilder, grid: &HexGrid, tile: &Tile, cfg: &ViewConfig) {
    let g = grid.geometry();
    let center = grid.pixel_center(tile.coord());
    let outer = math::hex_vertices(center, g.hex_size, 1.0);
    let inner = math::hex_vertices(center, g.hex_size, g.center_scale);
    let drop = Vec2::new(0.0, g.hex_size * g.band_height_ratio);

    for ((a, b, _), color) in BAND_FACES.iter().zip(tile.side_band_colors()) {
        let face = [outer[*a], outer[*b], outer[*b] + drop, outer[*a] + drop];
        mesh.polygon(&face, color.to_color());
        mesh.outline(&face, cfg.section_outline_width, cfg.outline_color);
    }

    for section in SectionKind::all() {
        let shape: Vec<Vec2> = match section.wedge_index() {
            None => inner.to_vec(),
            Some(i) => math::wedge_trapezoid(&inner, &outer, i).to_vec(),
        };
        mesh.polygon(&shape, tile.section_color(section).to_color());
        if let Some(overlay) = tile.section_override(section) {
            pattern_overlay(mesh, &shape, overlay, g.hex_size * cfg.pattern_cell);
        }
        mesh.outline(&shape, cfg.section_outline_width, cfg.outline_color);
    }
    mesh.outline(&outer, cfg.outline_width, cfg.outline_color);
}

/// Emits shape props into the mesh; returns image props for sprites.
pub fn prop_geometry(
    mesh: &mut LayerMeshBuilder,
    grid: &HexGrid,
    placement: &PropPlacement,
    cfg: &ViewConfig,
) -> Option<ImageProp> {
    let visual = &placement.visual;
    let s = visual.scale;
    let lift = Vec2::new(0.0, placement.vertical_offset * grid.geometry().hex_size);
    let anchor = grid.section_anchor(placement.address) + Vec2::from(visual.offset) - lift;

    let (points, ring) = match &visual.shape {
        VisualShape::Circle { color, radius } => {
            let r = radius * s;
            let pts = circle(anchor, r, cfg.circle_segments);
            mesh.polygon(&pts, color.to_color());
            (pts, circle(anchor, r + 3.0, cfg.circle_segments))
        }
        VisualShape::Rect {
            color,
            width,
            height,
        } => {
            let half = Vec2::new(*width, *height) * s / 2.0;
            let pts = rect(anchor, half);
            mesh.polygon(&pts, color.to_color());
            (pts, rect(anchor, half + Vec2::splat(3.0)))
        }
        VisualShape::Triangle { color, size } => {
            let pts = triangle(anchor, size * s);
            mesh.polygon(&pts, color.to_color());
            (pts.to_vec(), triangle(anchor, size * s + 3.0).to_vec())
        }
        VisualShape::Image { path } => {
            return Some(ImageProp {
                path: asset_path(path),
                position: anchor,
                scale: s,
            });
        }
    };
    mesh.outline(&points, 2.0, cfg.prop_outline_color);
    if placement.blocking {
        mesh.outline(&ring, 2.0, cfg.blocking_color);
    }
    None
}

/// Paths in definition records are relative to the working directory;
/// Bevy resolves them against `assets/`.
fn asset_path(path: &str) -> String {
    path.strip_prefix("assets/").unwrap_or(path).to_owned()
}

pub fn circle(center: Vec2, radius: f32, segments: usize) -> Vec<Vec2> {
    let n = segments.max(3);
    (0..n)
        .map(|i| {
            let a = std::f32::consts::TAU * i as f32 / n as f32;
            center + Vec2::new(a.cos(), a.sin()) * radius
        })
        .collect()
}

fn rect(center: Vec2, half: Vec2) -> Vec<Vec2> {
    vec![
        center + Vec2::new(-half.x, -half.y),
        center + Vec2::new(half.x, -half.y),
        center + Vec2::new(half.x, half.y),
        center + Vec2::new(-half.x, half.y),
    ]
}

/// Apex up (negative pixel y).
fn triangle(center: Vec2, size: f32) -> [Vec2; 3] {
    [
        center + Vec2::new(0.0, -size),
        center + Vec2::new(-size, size),
        center + Vec2::new(size, size),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{AxialCoord, GeometrySettings, PropRegistry};

    fn grid_with(records: &[(&str, &str)]) -> HexGrid {
        let mut props = PropRegistry::default();
        props.load_definitions(records.iter().copied());
        let mut g = HexGrid::new(GeometrySettings::default(), -10, 4).with_props(props);
        g.generate_tile(AxialCoord::ORIGIN);
        g
    }

    #[test]
    fn polygon_is_fan_triangulated() {
        let mut b = LayerMeshBuilder::new(0.01);
        b.polygon(&math::hex_vertices(Vec2::ZERO, 10.0, 1.0), Color::WHITE);
        assert_eq!(b.vertex_count(), 6);
        assert_eq!(b.triangle_count(), 4);
        assert!((b.depth() - 0.01).abs() < 1e-6);
    }

    #[test]
    fn degenerate_polygon_is_ignored() {
        let mut b = LayerMeshBuilder::new(0.01);
        b.polygon(&[Vec2::ZERO, Vec2::X], Color::WHITE);
        assert!(b.is_empty());
        assert_eq!(b.depth(), 0.0);
    }

    #[test]
    fn vertices_are_flipped_into_world_space() {
        let mut b = LayerMeshBuilder::new(0.0);
        b.polygon(&[Vec2::new(0.0, 5.0), Vec2::new(1.0, 5.0), Vec2::new(0.0, 6.0)], Color::WHITE);
        assert_eq!(b.positions[0], [0.0, -5.0, 0.0]);
    }

    #[test]
    fn outline_emits_a_quad_per_edge() {
        let mut b = LayerMeshBuilder::new(0.0);
        b.outline(&rect(Vec2::ZERO, Vec2::ONE), 1.0, Color::BLACK);
        assert_eq!(b.vertex_count(), 16);
        assert_eq!(b.triangle_count(), 8);
    }

    #[test]
    fn tile_emits_band_sections_and_outlines() {
        let g = grid_with(&[]);
        let plan = g.draw_plan();
        let built = build_layer(&g, &plan[0], &ViewConfig::default());
        // 3 band faces + 7 sections, each filled and outlined, plus the rim
        let fills = 3 * 4 + 6 + 6 * 4;
        let outlines = (3 * 4 + 6 + 4 * 6 + 6) * 4;
        assert_eq!(built.mesh.vertex_count(), fills + outlines);
        assert!(built.images.is_empty());
    }

    #[test]
    fn props_follow_tiles_and_images_become_sprites() {
        let mut g = grid_with(&[
            (
                "sign",
                r#"{"prop_id": "sign", "name": "Sign", "blocking": false,
                    "visual": {"type": "image", "path": "assets/props/images/sign.png",
                               "scale": 0.5}}"#,
            ),
            (
                "bush",
                r#"{"prop_id": "bush", "name": "Bush", "z_offset": 0.5,
                    "visual": {"type": "circle", "radius": 10}}"#,
            ),
        ]);
        g.place_prop("sign").unwrap();
        g.select_section(SectionKind::wedge(1));
        g.place_prop("bush").unwrap();

        let plan = g.draw_plan();
        let cfg = ViewConfig::default();
        let built = build_layer(&g, &plan[0], &cfg);
        assert_eq!(
            built.images,
            [ImageProp {
                path: "props/images/sign.png".into(),
                position: Vec2::ZERO,
                scale: 0.5,
            }]
        );

        let mut tile_only = LayerMeshBuilder::new(cfg.primitive_depth);
        tile_geometry(&mut tile_only, &g, plan[0].tiles[0], &cfg);
        let seg = cfg.circle_segments;
        // fill, black outline, red blocking ring
        assert_eq!(
            built.mesh.vertex_count() - tile_only.vertex_count(),
            seg + seg * 4 * 2
        );
    }

    #[test]
    fn pattern_kinds_render_differently() {
        let layer_for = |pattern: &str| {
            let record = format!(
                r#"{{"prop_id": "floor", "name": "Floor", "blocking": false,
                    "visual": {{"type": "circle", "radius": 3}},
                    "coloration": {{"colors": [[150, 60, 40], [120, 50, 30]],
                                    "pattern": "{pattern}"}}}}"#
            );
            let mut g = grid_with(&[("floor", record.as_str())]);
            g.place_prop("floor").unwrap();
            let plan = g.draw_plan();
            build_layer(&g, &plan[0], &ViewConfig::default())
                .mesh
                .positions()
                .to_vec()
        };
        let bricks = layer_for("bricks");
        assert_ne!(bricks, layer_for("herringbone"));
        assert_ne!(bricks, layer_for("rocky"));
        assert_ne!(layer_for("solid"), bricks);
    }

    #[test]
    fn triangle_apex_points_up() {
        let t = triangle(Vec2::ZERO, 4.0);
        assert!(t[0].y < t[1].y && t[0].y < t[2].y);
    }
}
