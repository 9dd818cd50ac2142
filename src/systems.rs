//! Core controller systems.
//!
//! These run in `FixedUpdate`, chained through [`crate::VoxelCharacterSet`]:
//! timers first, then the backend's sensor systems (floor sweep and seabed
//! probe), then the terrain cache, mode transitions, dive control, and
//! finally the state markers. Systems that touch velocity are generic over
//! the physics backend.

use bevy::prelude::*;

use crate::backend::CharacterPhysicsBackend;
use crate::config::{CharacterMotor, VoxelControllerConfig};
use crate::floor::FloorGrace;
use crate::intent::MovementIntent;
use crate::modes;
use crate::state::{Airborne, Grounded, Swimming};
use crate::terrain::{ChunkEdited, TerrainCacheState, TerrainContext, TerrainWorld};

/// Advance the per-character timers at the start of each fixed tick.
///
/// Also surfaces the grace-exhaustion diagnostic: frequent exhaustion means
/// terrain streaming is lagging behind character movement and the grace
/// window is masking real holes.
pub fn tick_timers(
    time: Res<Time>,
    mut q_characters: Query<(
        Entity,
        &VoxelControllerConfig,
        &mut FloorGrace,
        &mut TerrainCacheState,
    )>,
) {
    let dt = time.delta_secs();
    for (entity, config, mut grace, mut cache) in &mut q_characters {
        grace.tick(dt);
        cache.tick(dt);

        if let Some(count) = grace.take_exhaustion_report(config) {
            warn!(
                "floor grace exhausted {count} times in {:.0}s for {entity}; \
                 terrain streaming may be lagging",
                config.grace_warn_window
            );
        }
    }
}

/// Invalidate terrain caches touched by chunk edits.
///
/// Only characters whose cached chunk coordinate matches an edited chunk are
/// refreshed early; everyone else keeps their cache interval.
pub fn invalidate_terrain_cache(
    mut edits: EventReader<ChunkEdited>,
    mut q_characters: Query<(&TerrainContext, &mut TerrainCacheState)>,
) {
    let edited: Vec<IVec3> = edits.read().map(|e| e.chunk).collect();
    if edited.is_empty() {
        return;
    }

    for (context, mut cache) in &mut q_characters {
        if edited.contains(&context.chunk_coord) {
            cache.mark_dirty();
        }
    }
}

/// Refresh the terrain context from the registered provider.
///
/// Material is sampled slightly below the capsule bottom (inside the
/// surface voxel), water depth at the bottom itself. When the feet check
/// comes back dry, a second water check at the capsule center catches the
/// case where the feet rest in a solid voxel while the body is submerged
/// (standing on a deep riverbed). The derived friction is written straight
/// onto the motor.
///
/// When the provider has no answer (chunk not streamed in) the last-known
/// context is kept and the cache interval restarts.
pub fn refresh_terrain_context<B: CharacterPhysicsBackend>(world: &mut World) {
    let entities: Vec<(Entity, VoxelControllerConfig, f32)> = world
        .query::<(
            Entity,
            &VoxelControllerConfig,
            &CharacterMotor,
            &TerrainCacheState,
        )>()
        .iter(world)
        .filter(|(_, config, _, cache)| cache.due(config.cache_duration))
        .map(|(e, config, motor, _)| (e, *config, motor.feet_offset()))
        .collect();

    for (entity, config, feet_offset) in entities {
        let position = B::get_position(world, entity);
        let feet = position - Vec3::Y * feet_offset;
        let material_point = feet - Vec3::Y * config.feet_sample_offset;

        let sampled = world
            .get_resource::<TerrainWorld>()
            .and_then(|terrain| {
                let provider = terrain.provider();
                let mut context = TerrainContext::sample(provider, material_point, feet)?;
                if !context.is_underwater {
                    if let Some(depth) = provider.water_depth(position) {
                        context.merge_water(depth);
                    }
                }
                Some(context)
            });

        if let Some(context) = sampled {
            let friction = config.base_ground_friction
                * context.friction_multiplier
                * config.surface_grip;
            if let Some(mut motor) = world.get_mut::<CharacterMotor>(entity) {
                motor.ground_friction = friction;
            }
            if let Some(mut stored) = world.get_mut::<TerrainContext>(entity) {
                *stored = context;
            }
        }

        if let Some(mut cache) = world.get_mut::<TerrainCacheState>(entity) {
            cache.mark_refreshed();
        }
    }
}

/// Run mode transitions from the refreshed context and resolved floor.
pub fn update_movement_modes(
    mut q_characters: Query<(
        &VoxelControllerConfig,
        &TerrainContext,
        &mut CharacterMotor,
    )>,
) {
    for (config, context, mut motor) in &mut q_characters {
        modes::evaluate_transitions(&mut motor, context, config);
        // Catch external mode writes the transition table does not cover.
        modes::enforce_swim_mode(&mut motor, context, config);
    }
}

/// Apply dive input to swimming characters.
///
/// Ascend and descend change vertical velocity directly; descent is
/// suppressed while the seabed probe reports solid ground close below, so
/// holding descend near the bottom does not grind the capsule into terrain.
/// Vertical speed is clamped to the swim speed cap in both directions.
pub fn apply_dive_control<B: CharacterPhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);

    let swimmers: Vec<(Entity, f32, bool, f32, VoxelControllerConfig)> = world
        .query::<(
            Entity,
            &VoxelControllerConfig,
            &CharacterMotor,
            &MovementIntent,
        )>()
        .iter(world)
        .filter(|(_, _, motor, _)| motor.mode.is_swimming())
        .map(|(e, config, motor, intent)| {
            (
                e,
                intent.dive_axis(),
                motor.seabed_below,
                motor.max_swim_speed,
                *config,
            )
        })
        .collect();

    for (entity, dive_axis, seabed_below, max_swim_speed, config) in swimmers {
        let mut velocity = B::get_velocity(world, entity);

        if dive_axis > 0.0 {
            velocity.y += config.dive_ascend_acceleration * dive_axis * dt;
        } else if dive_axis < 0.0 && !seabed_below {
            velocity.y += config.dive_descend_acceleration * dive_axis * dt;
        }

        velocity.y = velocity.y.clamp(-max_swim_speed, max_swim_speed);
        B::set_velocity(world, entity, velocity);
    }
}

/// Mirror the motor's mode into marker components.
///
/// Runs last in the tick so `With<Grounded>`-style queries elsewhere observe
/// a consistent snapshot of this tick's resolution.
pub fn sync_state_markers(
    mut commands: Commands,
    q_characters: Query<(
        Entity,
        &CharacterMotor,
        Has<Grounded>,
        Has<Airborne>,
        Has<Swimming>,
    )>,
) {
    for (entity, motor, has_grounded, has_airborne, has_swimming) in &q_characters {
        let swimming = motor.mode.is_swimming();
        let grounded = !swimming && motor.is_grounded();
        let airborne = !swimming && !grounded;

        if grounded != has_grounded {
            if grounded {
                commands.entity(entity).insert(Grounded);
            } else {
                commands.entity(entity).remove::<Grounded>();
            }
        }
        if airborne != has_airborne {
            if airborne {
                commands.entity(entity).insert(Airborne);
            } else {
                commands.entity(entity).remove::<Airborne>();
            }
        }
        if swimming != has_swimming {
            if swimming {
                commands.entity(entity).insert(Swimming);
            } else {
                commands.entity(entity).remove::<Swimming>();
            }
        }
    }
}
