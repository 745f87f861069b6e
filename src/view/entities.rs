use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

/// Mesh or sprite belonging to one z-layer; despawned on every rebuild.
#[derive(Component, Reflect)]
pub struct WorldLayer {
    pub z: i32,
}

/// Asset stores touched when layers are rebuilt.
#[derive(SystemParam)]
pub struct LayerAssets<'w> {
    pub(super) meshes: ResMut<'w, Assets<Mesh>>,
    pub(super) materials: ResMut<'w, Assets<ColorMaterial>>,
    pub(super) server: Res<'w, AssetServer>,
}
