use std::path::Path;

use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::{EguiContexts, egui};

use super::EditorConfig;
use super::entities::{EditorCamera, EditorLog, PropPalette};
use crate::math;
use crate::world::{HexDirection, HexGrid, WorldConfig, WorldState};

const MOVE_KEYS: [(KeyCode, HexDirection); 6] = [
    (KeyCode::KeyQ, HexDirection::NorthWest),
    (KeyCode::KeyE, HexDirection::NorthEast),
    (KeyCode::KeyA, HexDirection::West),
    (KeyCode::KeyD, HexDirection::East),
    (KeyCode::KeyS, HexDirection::SouthWest),
    (KeyCode::KeyX, HexDirection::SouthEast),
];

const CONTROLS: [&str; 8] = [
    "Q/E/A/D/S/X  move",
    "W/Z  layer up/down",
    "Space  generate neighbours",
    "Tab  cycle section",
    "[ ]  choose prop",
    "P/R  place/remove",
    "F5/F9  save/load",
    "F1 inspector, Esc quit",
];

// ── Startup ─────────────────────────────────────────────────────────

/// Spawns the orthographic camera.
pub fn spawn_camera(mut commands: Commands, cfg: Res<EditorConfig>) {
    commands.spawn((
        Name::new("EditorCamera"),
        Camera2d,
        Projection::Orthographic(OrthographicProjection {
            scale: cfg.zoom,
            ..OrthographicProjection::default_2d()
        }),
        EditorCamera,
    ));
}

// ── Input ───────────────────────────────────────────────────────────

/// Horizontal and vertical cursor moves.
pub fn move_cursor(keys: Res<ButtonInput<KeyCode>>, mut grid: ResMut<HexGrid>) {
    for (key, direction) in MOVE_KEYS {
        if keys.just_pressed(key) {
            let outcome = grid.move_horizontal(direction);
            debug!("moved {direction:?} to {}: {outcome:?}", grid.cursor());
        }
    }
    if keys.just_pressed(KeyCode::KeyW) {
        let outcome = grid.move_up();
        debug!("moved up to {}: {outcome:?}", grid.cursor());
    }
    if keys.just_pressed(KeyCode::KeyZ) {
        let outcome = grid.move_down();
        debug!("moved down to {}: {outcome:?}", grid.cursor());
    }
}

/// Space: settle on the walkable layer and grow the ring around the cursor.
pub fn expand_neighbors(
    keys: Res<ButtonInput<KeyCode>>,
    mut grid: ResMut<HexGrid>,
    mut log: ResMut<EditorLog>,
) {
    if !keys.just_pressed(KeyCode::Space) {
        return;
    }
    let (jump, created) = grid.expand_around_cursor();
    if let Some(target) = jump {
        log.push(format!("jumped to accessible tile {target}"));
    }
    log.push(format!("generated {created} neighbours"));
}

/// Tab cycles the section; brackets walk the prop palette.
pub fn select_section_and_prop(
    keys: Res<ButtonInput<KeyCode>>,
    mut grid: ResMut<HexGrid>,
    mut palette: ResMut<PropPalette>,
    mut log: ResMut<EditorLog>,
) {
    if keys.just_pressed(KeyCode::Tab) {
        let section = grid.cycle_section();
        log.push(format!("selected {section}"));
    }
    let delta = match (
        keys.just_pressed(KeyCode::BracketLeft),
        keys.just_pressed(KeyCode::BracketRight),
    ) {
        (true, false) => -1,
        (false, true) => 1,
        _ => return,
    };
    let len = PropPalette::candidates(&grid).len();
    palette.step(delta, len);
    match palette.selected(&grid) {
        Some(id) => log.push(format!("prop: {id}")),
        None => log.warn("no prop fits this section"),
    }
}

/// P places the highlighted prop, R removes the prop on the section.
pub fn edit_props(
    keys: Res<ButtonInput<KeyCode>>,
    mut grid: ResMut<HexGrid>,
    palette: Res<PropPalette>,
    mut log: ResMut<EditorLog>,
) {
    if keys.just_pressed(KeyCode::KeyP) {
        match palette.selected(&grid) {
            None => log.warn("no prop fits this section"),
            Some(id) => match grid.place_prop(&id) {
                Ok(placed) => {
                    let msg = format!("placed {} on {}", placed.definition_id, placed.address);
                    log.push(msg);
                }
                Err(e) => log.warn(format!("cannot place {id}: {e}")),
            },
        }
    }
    if keys.just_pressed(KeyCode::KeyR) {
        match grid.remove_prop() {
            Some(removed) => log.push(format!(
                "removed {} from {}",
                removed.definition_id, removed.address
            )),
            None => log.warn(format!("no prop on {}", grid.selected_address())),
        }
    }
}

/// Left click selects the tile section under the pointer.
pub fn pick_section(
    mouse: Res<ButtonInput<MouseButton>>,
    mut contexts: EguiContexts,
    windows: Query<&Window, With<PrimaryWindow>>,
    camera_q: Query<(&Camera, &GlobalTransform), With<EditorCamera>>,
    mut grid: ResMut<HexGrid>,
    mut log: ResMut<EditorLog>,
) {
    if !mouse.just_pressed(MouseButton::Left) {
        return;
    }
    if contexts
        .ctx_mut()
        .is_ok_and(|ctx| ctx.is_pointer_over_area())
    {
        return;
    }
    let Ok(window) = windows.single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };
    let Ok((camera, cam_gt)) = camera_q.single() else {
        return;
    };
    let Ok(world_pos) = camera.viewport_to_world_2d(cam_gt, cursor) else {
        return;
    };
    if let Some(address) = grid.pick(math::pixel_to_world(world_pos)) {
        grid.set_cursor(address.coord);
        grid.select_section(address.section);
        log.push(format!("picked {address}"));
    }
}

/// F5 saves, F9 reloads the world file.
pub fn save_or_load(
    keys: Res<ButtonInput<KeyCode>>,
    mut grid: ResMut<HexGrid>,
    cfg: Res<WorldConfig>,
    mut log: ResMut<EditorLog>,
) {
    let path = Path::new(&cfg.world_file);
    if keys.just_pressed(KeyCode::F5) {
        match WorldState::save(&grid, path) {
            Ok(()) => log.push(format!("saved {}", path.display())),
            Err(e) => log.warn(format!("save failed: {e}")),
        }
    }
    if keys.just_pressed(KeyCode::F9) {
        match WorldState::load(&mut grid, path) {
            Ok(report) => log.push(format!(
                "loaded {} records ({} skipped)",
                report.loaded,
                report.skipped.len()
            )),
            Err(e) => log.warn(format!("load failed: {e}")),
        }
    }
}

// ── Camera ──────────────────────────────────────────────────────────

/// Eases the camera toward the cursor tile.
pub fn follow_cursor(
    time: Res<Time>,
    grid: Res<HexGrid>,
    cfg: Res<EditorConfig>,
    mut camera_q: Query<&mut Transform, With<EditorCamera>>,
) {
    let Ok(mut transform) = camera_q.single_mut() else {
        return;
    };
    let target = math::pixel_to_world(grid.pixel_center(grid.cursor()));
    let t = math::follow_factor(time.delta_secs(), cfg.follow_transition, cfg.follow_rate);
    let next = transform.translation.truncate().lerp(target, t);
    transform.translation = next.extend(transform.translation.z);
}

// ── HUD ─────────────────────────────────────────────────────────────

/// Position, selection, controls and recent status lines.
pub fn draw_hud(
    mut contexts: EguiContexts,
    grid: Res<HexGrid>,
    palette: Res<PropPalette>,
    log: Res<EditorLog>,
) -> Result {
    let ctx = contexts.ctx_mut()?;
    egui::Window::new("Hex Sections")
        .default_pos([12.0, 12.0])
        .resizable(false)
        .show(ctx, |ui| {
            let cursor = grid.cursor();
            ui.label(format!("Position: {cursor}"));
            ui.label(format!(
                "Tiles: {}  Layers: {}  Props: {}",
                grid.tile_count(),
                grid.layer_count(),
                grid.props().placement_count()
            ));
            match grid.tile(cursor) {
                Some(tile) => ui.label(format!("Biome: {}", tile.biome())),
                None => ui.label("No tile here"),
            };
            ui.label(format!("Section: {}", grid.selected_section()));
            ui.label(format!(
                "Prop: {}",
                palette.selected(&grid).as_deref().unwrap_or("-")
            ));
            ui.separator();
            for line in CONTROLS {
                ui.small(line);
            }
            ui.separator();
            for line in log.lines() {
                ui.label(line);
            }
        });
    Ok(())
}
