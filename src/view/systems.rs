use bevy::prelude::*;

use super::ViewConfig;
use super::entities::{LayerAssets, WorldLayer};
use super::mesh;
use crate::math;
use crate::world::HexGrid;

/// Respawns every layer mesh and image sprite from the current draw plan.
pub fn rebuild_layers(
    mut commands: Commands,
    grid: Res<HexGrid>,
    cfg: Res<ViewConfig>,
    existing: Query<Entity, With<WorldLayer>>,
    mut assets: LayerAssets,
    mut material: Local<Option<Handle<ColorMaterial>>>,
) {
    for entity in &existing {
        commands.entity(entity).despawn();
    }
    let material = material
        .get_or_insert_with(|| assets.materials.add(ColorMaterial::default()))
        .clone();

    for (i, layer) in grid.draw_plan().iter().enumerate() {
        let base_z = i as f32 * cfg.layer_depth;
        let built = mesh::build_layer(&grid, layer, &cfg);
        let sprite_z = base_z + built.mesh.depth();
        if !built.mesh.is_empty() {
            commands.spawn((
                Name::new(format!("Layer {}", layer.z)),
                WorldLayer { z: layer.z },
                Mesh2d(assets.meshes.add(built.mesh.build())),
                MeshMaterial2d(material.clone()),
                Transform::from_xyz(0.0, 0.0, base_z),
            ));
        }
        for image in built.images {
            let world = math::pixel_to_world(image.position);
            commands.spawn((
                Name::new(format!("Image prop {}", image.path)),
                WorldLayer { z: layer.z },
                Sprite::from_image(assets.server.load(image.path)),
                Transform::from_translation(world.extend(sprite_z))
                    .with_scale(Vec3::splat(image.scale)),
            ));
        }
    }
}

/// Outlines the cursor hexagon and the selected section.
pub fn draw_cursor(mut gizmos: Gizmos, grid: Res<HexGrid>, cfg: Res<ViewConfig>) {
    let g = grid.geometry();
    let cursor = grid.cursor();
    let center = grid.pixel_center(cursor);
    let outer = math::hex_vertices(center, g.hex_size, 1.0);
    let inner = math::hex_vertices(center, g.hex_size, g.center_scale);

    let color = if grid.tile(cursor).is_some() {
        cfg.cursor_color
    } else {
        cfg.empty_cursor_color
    };
    gizmos.linestrip_2d(closed(&outer), color);

    let section: Vec<Vec2> = match grid.selected_section().wedge_index() {
        None => inner.to_vec(),
        Some(i) => math::wedge_trapezoid(&inner, &outer, i).to_vec(),
    };
    gizmos.linestrip_2d(closed(&section), cfg.selection_color);
}

/// World-space loop with the first point repeated at the end.
fn closed(points: &[Vec2]) -> Vec<Vec2> {
    points
        .iter()
        .chain(points.first())
        .map(|&p| math::pixel_to_world(p))
        .collect()
}
