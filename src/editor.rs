//! Editor input surface: keyboard and mouse commands onto the [`HexGrid`],
//! camera follow and the egui HUD.
//!
//! | Key | Command |
//! |---|---|
//! | Q / E / A / D / S / X | move NW / NE / W / E / SW / SE |
//! | W / Z | layer up / layer down |
//! | Space | jump to walkable layer, generate neighbours |
//! | Tab | cycle section |
//! | `[` / `]` | previous / next prop |
//! | P / R | place / remove prop |
//! | F5 / F9 | save / load |
//! | Left click | select tile section |

mod entities;
mod systems;

pub use entities::{EditorCamera, EditorLog, PropPalette};

use bevy::prelude::*;
use bevy_egui::EguiPrimaryContextPass;

use crate::GameState;
use crate::world::HexGrid;

/// Ordering for editor update systems; rendering runs after [`EditorSet::Input`].
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum EditorSet {
    /// Commands that mutate the grid.
    Input,
    /// Camera easing toward the cursor.
    Camera,
}

/// Editor configuration.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct EditorConfig {
    /// Seconds the camera takes to settle on a new cursor position.
    pub follow_transition: f32,
    /// Multiplier on `dt / follow_transition` for the per-frame lerp.
    pub follow_rate: f32,
    /// Status lines kept for the HUD.
    pub log_capacity: usize,
    /// Orthographic projection scale (larger shows more of the world).
    pub zoom: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            follow_transition: 0.25,
            follow_rate: 4.0,
            log_capacity: 6,
            zoom: 1.5,
        }
    }
}

/// Keyboard/mouse editing, camera follow and HUD.
pub struct EditorPlugin(pub EditorConfig);

impl Plugin for EditorPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<EditorConfig>()
            .register_type::<EditorCamera>()
            .insert_resource(self.0.clone())
            .insert_resource(EditorLog::new(self.0.log_capacity))
            .init_resource::<PropPalette>()
            .configure_sets(Update, (EditorSet::Input, EditorSet::Camera).chain())
            .add_systems(Startup, systems::spawn_camera)
            .add_systems(
                Update,
                (
                    systems::move_cursor,
                    systems::expand_neighbors,
                    systems::select_section_and_prop,
                    systems::edit_props,
                    systems::pick_section,
                    systems::save_or_load,
                )
                    .chain()
                    .in_set(EditorSet::Input)
                    .run_if(resource_exists::<HexGrid>)
                    .run_if(in_state(GameState::Editing)),
            )
            .add_systems(
                Update,
                systems::follow_cursor
                    .in_set(EditorSet::Camera)
                    .run_if(resource_exists::<HexGrid>),
            )
            .add_systems(
                EguiPrimaryContextPass,
                systems::draw_hud.run_if(resource_exists::<HexGrid>),
            );
    }
}
