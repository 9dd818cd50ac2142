//! Movement mode state machine.
//!
//! All mode transitions are decided here, from the refreshed terrain context
//! and the resolved floor. The hysteresis band between the swim entry and
//! exit depths keeps characters from flickering between swimming and walking
//! while wading through choppy water or partially flooded voxel tunnels.

use bevy::prelude::*;

use crate::config::{CharacterMotor, VoxelControllerConfig};
use crate::terrain::TerrainContext;

/// Locomotion mode of a character.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovementMode {
    /// On a walkable floor (real or synthesized).
    #[default]
    Walking,
    /// Airborne with no walkable floor.
    Falling,
    /// Submerged past the entry depth.
    Swimming,
    /// Reserved. No transitions target this mode yet.
    Climbing,
}

impl MovementMode {
    pub fn is_swimming(&self) -> bool {
        matches!(self, MovementMode::Swimming)
    }

    pub fn is_grounded_mode(&self) -> bool {
        matches!(self, MovementMode::Walking)
    }
}

/// Evaluate mode transitions for one tick.
///
/// Swim entry takes priority over the walk/fall split: a submerged character
/// standing on a riverbed still swims. Exit from swimming lands in `Walking`
/// when a floor is under the capsule, otherwise `Falling`. Returns the
/// previous mode when a transition happened.
pub fn evaluate_transitions(
    motor: &mut CharacterMotor,
    context: &TerrainContext,
    config: &VoxelControllerConfig,
) -> Option<MovementMode> {
    let previous = motor.mode;

    let next = match previous {
        MovementMode::Swimming => {
            if !context.is_underwater || context.water_depth < config.swim_exit_depth {
                if motor.is_grounded() {
                    MovementMode::Walking
                } else {
                    MovementMode::Falling
                }
            } else {
                MovementMode::Swimming
            }
        }
        MovementMode::Walking | MovementMode::Falling => {
            if context.is_underwater && context.water_depth >= config.swim_entry_depth {
                MovementMode::Swimming
            } else if motor.is_grounded() {
                MovementMode::Walking
            } else {
                MovementMode::Falling
            }
        }
        MovementMode::Climbing => MovementMode::Climbing,
    };

    if next == previous {
        return None;
    }

    motor.mode = next;
    match next {
        MovementMode::Swimming => motor.apply_swim_tuning(config),
        MovementMode::Walking | MovementMode::Falling => motor.apply_walk_tuning(config),
        MovementMode::Climbing => {}
    }
    debug!("movement mode {:?} -> {:?}", previous, next);
    Some(previous)
}

/// Tick-level guard against external mode writes.
///
/// Integrators can overwrite the mode between our systems (a landing event,
/// a scripted launch). When the character is still past the entry depth, any
/// non-swim mode is forced back to `Swimming` the same tick, so a submerged
/// character never walks on the seabed at full land speed.
pub fn enforce_swim_mode(
    motor: &mut CharacterMotor,
    context: &TerrainContext,
    config: &VoxelControllerConfig,
) -> bool {
    if motor.mode.is_swimming() {
        return false;
    }
    if context.is_underwater && context.water_depth >= config.swim_entry_depth {
        warn!(
            "mode {:?} at water depth {:.0}, forcing Swimming",
            motor.mode, context.water_depth
        );
        motor.mode = MovementMode::Swimming;
        motor.apply_swim_tuning(config);
        return true;
    }
    false
}
