//! Marker components mirroring the motor's movement mode.
//!
//! Markers let gameplay systems filter with `With<Grounded>` style queries
//! instead of reading the motor every frame. They are maintained by
//! [`crate::systems::sync_state_markers`] at the end of each fixed tick and
//! should be treated as read-only outside this crate.

use bevy::prelude::*;

/// Present while the character stands on a walkable floor.
#[derive(Component, Reflect, Debug, Default, Clone, Copy)]
#[reflect(Component)]
pub struct Grounded;

/// Present while the character is falling with no walkable floor.
#[derive(Component, Reflect, Debug, Default, Clone, Copy)]
#[reflect(Component)]
pub struct Airborne;

/// Present while the character is in the swimming mode.
#[derive(Component, Reflect, Debug, Default, Clone, Copy)]
#[reflect(Component)]
pub struct Swimming;
