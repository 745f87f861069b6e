//! Layered hex-tile world editor.
//!
//! A pointy-top hex grid addressed by `(q, r, z)`, where every tile's top
//! face is split into a centre hexagon and six wedges that can each carry a
//! prop. [`world`] holds the model, [`editor`] maps input onto it and
//! [`view`] draws it.

pub mod editor;
pub mod error;
pub mod math;
pub mod view;
pub mod world;

use bevy::prelude::*;

/// Application-wide state, used for system scheduling.
#[derive(States, Default, Debug, Clone, PartialEq, Eq, Hash, Reflect)]
pub enum GameState {
    /// Keyboard and mouse edit the world.
    #[default]
    Editing,
    /// World inspector open (F1); editing input paused.
    Inspecting,
}
