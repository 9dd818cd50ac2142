//! Rapier3D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier3D.
//! Enable with the `rapier3d` feature.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

use crate::backend::CharacterPhysicsBackend;
use crate::collision::CollisionData;
use crate::config::{CharacterMotor, VoxelControllerConfig};
use crate::floor::{self, FloorGrace};

/// Rapier3D physics backend for the voxel locomotion core.
///
/// Velocity and position access go through this type. Collision detection
/// (the floor sweep and the probes) is handled by dedicated systems that
/// receive `RapierContext` as a system parameter, registered by
/// [`Rapier3dBackendPlugin`] in the sensor phase.
pub struct Rapier3dBackend;

impl CharacterPhysicsBackend for Rapier3dBackend {
    type VelocityComponent = Velocity;

    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation)
            .or_else(|| {
                world
                    .get::<GlobalTransform>(entity)
                    .map(|t| t.translation())
            })
            .unwrap_or(Vec3::ZERO)
    }

    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.delta_secs())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 60.0)
    }
}

/// Plugin that sets up Rapier3D-specific systems for the locomotion core.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        use crate::VoxelCharacterSet;

        // Floor detection runs first because the seabed probe reads the
        // capsule dimensions it mirrors from the collider.
        app.add_systems(
            FixedUpdate,
            (rapier_floor_detection, rapier_seabed_probe)
                .chain()
                .in_set(VoxelCharacterSet::Sensors),
        );
    }
}

/// Cast the character capsule downward and resolve the floor.
///
/// The raw sweep hit is handed to [`floor::resolve_floor`] together with a
/// ray probe, so the normal corrections and the grace window apply before
/// the motor ever sees the result.
fn rapier_floor_detection(
    rapier_context: ReadRapierContext,
    mut q_characters: Query<(
        Entity,
        &GlobalTransform,
        &VoxelControllerConfig,
        &mut CharacterMotor,
        &mut FloorGrace,
        Option<&Collider>,
    )>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, transform, config, mut motor, mut grace, collider) in &mut q_characters {
        let position = transform.translation();

        // Mirror capsule dimensions from the actual collider.
        if let Some(capsule) = collider.and_then(|c| c.as_capsule()) {
            let segment = capsule.segment();
            let segment_half = (segment.a().y - segment.b().y).abs() / 2.0;
            motor.capsule_half_height = segment_half + capsule.radius();
            motor.capsule_radius = capsule.radius();
        }
        let half_height = motor.capsule_half_height;
        let radius = motor.capsule_radius;

        let sweep_distance = config.max_step_height + config.grace_height_threshold;
        let sweep_hit = rapier_shapecast(
            &context,
            position,
            Vec3::NEG_Y,
            sweep_distance,
            half_height,
            radius,
            entity,
        );

        let mut line_trace = |start: Vec3, end: Vec3| -> Option<CollisionData> {
            rapier_raycast(&context, start, end, entity)
        };

        let result = floor::resolve_floor(
            sweep_hit,
            &mut line_trace,
            position,
            half_height,
            config,
            &mut grace,
        );

        motor.floor = result.walkable.then_some(result.hit);
        motor.floor_synthesized = result.synthesized;
    }
}

/// Probe for solid ground close below the capsule.
///
/// Dive control suppresses descent while this reports true, so holding
/// descend near the bottom does not grind the capsule into the seabed.
/// Runs for every character regardless of mode: the mode machine decides
/// swimming later in the same tick, and a probe gated on last tick's mode
/// would let the first swimming tick descend into the floor.
fn rapier_seabed_probe(
    rapier_context: ReadRapierContext,
    mut q_characters: Query<(Entity, &GlobalTransform, &VoxelControllerConfig, &mut CharacterMotor)>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, transform, config, mut motor) in &mut q_characters {
        let feet = transform.translation() - Vec3::Y * motor.feet_offset();
        let probe_end = feet - Vec3::Y * config.dive_floor_probe;
        motor.seabed_below = rapier_raycast(&context, feet, probe_end, entity).is_some();
    }
}

/// Perform a downward-capable capsule sweep using RapierContext.
fn rapier_shapecast(
    context: &RapierContext,
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
    half_height: f32,
    radius: f32,
    exclude_entity: Entity,
) -> Option<CollisionData> {
    // Rapier capsules are segment half-length plus radius; ours are
    // center-to-tip.
    let segment_half = (half_height - radius).max(0.01);
    let shape = Collider::capsule_y(segment_half, radius);

    let filter = QueryFilter::default()
        .exclude_rigid_body(exclude_entity)
        .exclude_sensors();

    context
        .cast_shape(
            origin,
            Quat::IDENTITY,
            direction,
            &shape,
            ShapeCastOptions {
                max_time_of_impact: max_distance,
                stop_at_penetration: false,
                ..default()
            },
            filter,
        )
        .map(|(hit_entity, hit)| {
            let normal = hit.details.map(|d| d.normal1).unwrap_or(-direction);
            let hit_point = hit
                .details
                .map(|d| d.witness1)
                .unwrap_or(origin + direction * hit.time_of_impact);
            let data =
                CollisionData::new(hit.time_of_impact, normal, hit_point, Some(hit_entity));
            if hit.time_of_impact <= 0.0 {
                data.penetrating()
            } else {
                data
            }
        })
}

/// Trace a ray between two points using RapierContext, with a real surface
/// normal from the hit triangle.
fn rapier_raycast(
    context: &RapierContext,
    start: Vec3,
    end: Vec3,
    exclude_entity: Entity,
) -> Option<CollisionData> {
    let delta = end - start;
    let max_distance = delta.length();
    if max_distance <= f32::EPSILON {
        return None;
    }
    let direction = delta / max_distance;

    let filter = QueryFilter::default()
        .exclude_rigid_body(exclude_entity)
        .exclude_sensors();

    context
        .cast_ray_and_get_normal(start, direction, max_distance, true, filter)
        .map(|(hit_entity, intersection)| {
            CollisionData::new(
                intersection.time_of_impact,
                intersection.normal,
                intersection.point,
                Some(hit_entity),
            )
        })
}

/// Bundle for creating a character with Rapier3D physics.
///
/// Provides the rigid body, velocity, axis locking, and damping the
/// locomotion core expects. Rotation is locked by default; voxel game
/// characters stay upright.
#[derive(Bundle)]
pub struct Rapier3dCharacterBundle {
    /// The rigid body type. Should typically be [`RigidBody::Dynamic`].
    pub rigid_body: RigidBody,
    /// Current linear and angular velocity, updated by Rapier.
    pub velocity: Velocity,
    /// Which axes are locked.
    pub locked_axes: LockedAxes,
    /// Damping coefficients for velocity reduction.
    pub damping: Damping,
}

impl Default for Rapier3dCharacterBundle {
    fn default() -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            locked_axes: LockedAxes::ROTATION_LOCKED,
            damping: Damping {
                linear_damping: 0.1,
                angular_damping: 1.0,
            },
        }
    }
}

impl Rapier3dCharacterBundle {
    /// Set the rigid body type.
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }

    /// Set the damping coefficients.
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.damping = Damping {
            linear_damping: linear,
            angular_damping: angular,
        };
        self
    }
}
