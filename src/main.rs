#![warn(missing_docs)]
//! Hex section editor.
//!
//! Walk a layered hex grid, grow it tile by tile and dress each tile's seven
//! sections with props.

use bevy::app::AppExit;
use bevy::prelude::*;
use bevy_inspector_egui::quick::WorldInspectorPlugin;
use hex_sections::GameState;
use hex_sections::editor::{EditorConfig, EditorPlugin};
use hex_sections::view::{ViewConfig, ViewPlugin};
use hex_sections::world::{WorldConfig, WorldPlugin};

#[cfg(feature = "native")]
mod cli {
    use clap::Parser;
    use hex_sections::world::{BiomePolicyKind, WorldConfig};

    /// Command-line overrides for [`WorldConfig`].
    #[derive(Parser, Debug)]
    #[command(version, about = "Layered hex-tile world editor")]
    pub struct Args {
        /// Outer hexagon radius in pixels.
        #[arg(long)]
        pub hex_size: Option<f32>,
        /// Seed for biome and color sampling.
        #[arg(long)]
        pub seed: Option<u64>,
        /// Directory of prop definition JSON files.
        #[arg(long)]
        pub props_dir: Option<String>,
        /// Directory of biome palette JSON files.
        #[arg(long)]
        pub palettes_dir: Option<String>,
        /// World file used by F5/F9 and loaded at startup.
        #[arg(long)]
        pub world: Option<String>,
        /// Biome assignment: `random`, `noise` or a fixed biome id.
        #[arg(long)]
        pub biomes: Option<BiomePolicyKind>,
    }

    impl Args {
        /// Applies every given flag to `cfg`.
        pub fn apply(self, cfg: &mut WorldConfig) {
            if let Some(size) = self.hex_size {
                cfg.geometry.hex_size = size;
            }
            if let Some(seed) = self.seed {
                cfg.seed = seed;
            }
            if let Some(dir) = self.props_dir {
                cfg.props_dir = dir;
            }
            if let Some(dir) = self.palettes_dir {
                cfg.palettes_dir = dir;
            }
            if let Some(world) = self.world {
                cfg.world_file = world;
            }
            if let Some(policy) = self.biomes {
                cfg.biome_policy = policy;
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn flags_override_only_what_is_given() {
            let args = Args::try_parse_from(["hex-sections", "--seed", "7", "--biomes", "noise"])
                .unwrap();
            let mut cfg = WorldConfig::default();
            args.apply(&mut cfg);
            assert_eq!(cfg.seed, 7);
            assert_eq!(cfg.biome_policy, BiomePolicyKind::Noise);
            assert_eq!(cfg.world_file, WorldConfig::default().world_file);
        }
    }
}

#[cfg(feature = "native")]
fn world_config() -> WorldConfig {
    let mut cfg = WorldConfig::default();
    <cli::Args as clap::Parser>::parse().apply(&mut cfg);
    cfg
}

#[cfg(not(feature = "native"))]
fn world_config() -> WorldConfig {
    WorldConfig::default()
}

fn main() {
    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Hex Sections".into(),
            ..default()
        }),
        ..default()
    }))
    .register_type::<GameState>()
    .init_state::<GameState>()
    .add_plugins(bevy_egui::EguiPlugin::default())
    .add_plugins(WorldPlugin(world_config()))
    .add_plugins(EditorPlugin(EditorConfig::default()))
    .add_plugins(ViewPlugin(ViewConfig::default()))
    .add_systems(Update, exit_on_esc)
    .add_systems(Update, toggle_inspector)
    .add_plugins(WorldInspectorPlugin::new().run_if(in_state(GameState::Inspecting)));

    app.run();
}

fn toggle_inspector(
    keys: Res<ButtonInput<KeyCode>>,
    state: Res<State<GameState>>,
    mut next: ResMut<NextState<GameState>>,
) {
    if keys.just_pressed(KeyCode::F1) {
        next.set(match state.get() {
            GameState::Editing => GameState::Inspecting,
            GameState::Inspecting => GameState::Editing,
        });
    }
}

fn exit_on_esc(keys: Res<ButtonInput<KeyCode>>, mut exit: MessageWriter<AppExit>) {
    if keys.just_pressed(KeyCode::Escape) {
        exit.write(AppExit::Success);
    }
}
