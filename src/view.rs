//! Renderer: one vertex-colored 2D mesh per z-layer, rebuilt whenever the
//! grid changes, plus image props as sprites and the cursor as gizmos.
//!
//! Layers stack in ascending z. Inside a layer, primitives are emitted in
//! painter's order (tiles by `(r, q)`, then props) and each one is nudged
//! slightly toward the camera so later geometry wins.

mod entities;
pub mod mesh;
mod pattern;
mod systems;

pub use entities::WorldLayer;

use bevy::prelude::*;

use crate::editor::EditorSet;
use crate::world::HexGrid;

/// Renderer configuration.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct ViewConfig {
    /// Background clear color.
    pub clear_color: Color,
    /// Outer hexagon outline.
    pub outline_color: Color,
    pub outline_width: f32,
    /// Outline of the centre hexagon and wedge borders.
    pub section_outline_width: f32,
    /// Ring drawn around blocking props.
    pub blocking_color: Color,
    /// Outline around every prop shape.
    pub prop_outline_color: Color,
    /// Cursor hexagon when a tile exists there.
    pub cursor_color: Color,
    /// Cursor hexagon over an empty or blocked coordinate.
    pub empty_cursor_color: Color,
    /// Highlight of the selected section.
    pub selection_color: Color,
    /// World-space z distance between layer meshes.
    pub layer_depth: f32,
    /// z nudge per primitive within a layer.
    pub primitive_depth: f32,
    /// Segments used to approximate circle props.
    pub circle_segments: usize,
    /// Pattern element size as a fraction of the hex size.
    pub pattern_cell: f32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            clear_color: Color::srgb(0.12, 0.12, 0.16),
            outline_color: Color::srgb_u8(25, 25, 25),
            outline_width: 2.5,
            section_outline_width: 1.0,
            blocking_color: Color::srgb_u8(255, 0, 0),
            prop_outline_color: Color::BLACK,
            cursor_color: Color::srgb_u8(255, 255, 0),
            empty_cursor_color: Color::srgb_u8(120, 120, 120),
            selection_color: Color::srgb_u8(0, 255, 255),
            layer_depth: 50.0,
            primitive_depth: 1e-3,
            circle_segments: 20,
            pattern_cell: 0.12,
        }
    }
}

/// Draws the [`HexGrid`].
pub struct ViewPlugin(pub ViewConfig);

impl Plugin for ViewPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<ViewConfig>()
            .register_type::<WorldLayer>()
            .insert_resource(self.0.clone())
            .insert_resource(ClearColor(self.0.clear_color))
            .add_systems(
                Update,
                systems::rebuild_layers
                    .after(EditorSet::Input)
                    .run_if(resource_exists_and_changed::<HexGrid>),
            )
            .add_systems(
                Update,
                systems::draw_cursor
                    .after(EditorSet::Camera)
                    .run_if(resource_exists::<HexGrid>),
            );
    }
}
