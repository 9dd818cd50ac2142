//! Physics backend abstraction.
//!
//! This module defines the trait that physics backends must implement to
//! work with the controller. Floor resolution and the mode machine are pure
//! logic; everything that touches actual colliders goes through a backend,
//! so physics engines can be swapped without touching movement semantics.
//!
//! Collision detection (the downward capsule sweep and the line-trace
//! probes) is handled by dedicated systems the backend plugin registers in
//! the sensor phase, because engines like Rapier expose their query
//! pipeline as a system parameter rather than through `&World`. Those
//! systems feed [`crate::floor::resolve_floor`] and write the result into
//! [`crate::config::CharacterMotor`]; the generic systems in this crate
//! only need velocity, position, and timestep access.

use bevy::prelude::*;

/// Trait for physics backend implementations.
///
/// Implement this to integrate a physics engine with the controller. The
/// backend's plugin must register a floor sensor system in
/// [`crate::VoxelCharacterSet::Sensors`] that performs the downward capsule
/// sweep, runs it through floor resolution, and stores the outcome on the
/// motor, plus the dive seabed probe that sets
/// [`crate::config::CharacterMotor::seabed_below`].
///
/// See the `rapier` module's `Rapier3dBackend` for the reference
/// implementation on Bevy Rapier3D.
pub trait CharacterPhysicsBackend: 'static + Send + Sync {
    /// The velocity component type used by this backend.
    type VelocityComponent: Component;

    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Get the current velocity of an entity.
    fn get_velocity(world: &World, entity: Entity) -> Vec3;

    /// Set the velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3);

    /// Get the current position of an entity.
    fn get_position(world: &World, entity: Entity) -> Vec3;

    /// Get the fixed timestep delta time.
    fn get_fixed_timestep(world: &World) -> f32;
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}
