//! Controller configuration and the integrator-facing motor state.
//!
//! [`VoxelControllerConfig`] holds every tunable; [`CharacterMotor`] is the
//! state this core writes into and the generic capsule integrator reads
//! from (ground friction, speed/acceleration fields, the resolved floor,
//! and the current movement mode).

use bevy::prelude::*;

use crate::collision::CollisionData;
use crate::modes::MovementMode;

/// Configuration parameters for voxel-aware locomotion.
///
/// All values are tunables, not behavior switches. Defaults are calibrated
/// for blocky trimesh terrain: a taller step height and steeper walkable
/// angle than a typical smooth-mesh game, to tolerate voxel seam artifacts.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct VoxelControllerConfig {
    // === Terrain cache ===
    /// How often to re-query voxel terrain (seconds).
    pub cache_duration: f32,
    /// Distance below the capsule bottom to sample surface material.
    pub feet_sample_offset: f32,
    /// Tunable grip coefficient applied on top of the surface friction table.
    pub surface_grip: f32,
    /// Integrator base ground friction before surface multipliers.
    pub base_ground_friction: f32,

    // === Base movement ===
    /// Walk speed before external speed modifiers.
    pub base_walk_speed: f32,
    /// Acceleration while walking.
    pub base_acceleration: f32,
    /// Braking deceleration while walking. The stock integrator value is too
    /// low for trimesh terrain and the character slides.
    pub braking_deceleration_walking: f32,
    /// Braking friction factor paired with the deceleration above.
    pub braking_friction_factor: f32,

    // === Slope / step overrides for blocky terrain ===
    /// Maximum step height auto-climbed; full voxel steps require jumping.
    pub max_step_height: f32,
    /// Maximum walkable slope angle (radians).
    pub walkable_angle: f32,

    // === Swimming ===
    /// Water depth at which Walking/Falling transitions into Swimming.
    pub swim_entry_depth: f32,
    /// Water depth below which Swimming exits to Walking. Smaller than the
    /// entry depth so the water line does not cause mode oscillation.
    pub swim_exit_depth: f32,
    /// Swim speed as a fraction of base walk speed.
    pub swim_speed_multiplier: f32,
    /// Buoyancy applied while swimming.
    pub swim_buoyancy: f32,
    /// Braking deceleration while swimming.
    pub swim_braking_deceleration: f32,
    /// Acceleration while swimming.
    pub swim_acceleration: f32,

    // === Dive control ===
    /// Upward acceleration from the ascend input while swimming.
    pub dive_ascend_acceleration: f32,
    /// Downward acceleration from the descend input while swimming.
    pub dive_descend_acceleration: f32,
    /// Downward probe range below the capsule; descent is suppressed when
    /// solid ground is found within it.
    pub dive_floor_probe: f32,

    // === Floor grace ===
    /// Max time a synthesized floor masks a missing one (seconds).
    pub floor_grace_duration: f32,
    /// Grace is only granted within this window after a real floor contact.
    pub recent_grounded_window: f32,
    /// Grace is only granted when a floor exists within this distance below
    /// the capsule bottom; genuine ledges fall.
    pub grace_height_threshold: f32,
    /// Line-trace length past the capsule bottom for edge-normal correction.
    pub floor_trace_margin: f32,

    // === Diagnostics ===
    /// Warn when grace expires this many times within `grace_warn_window`
    /// seconds; a signal that terrain streaming lags behind movement.
    pub grace_warn_threshold: u32,
    /// Window for the grace-exhaustion warning (seconds).
    pub grace_warn_window: f32,
}

impl Default for VoxelControllerConfig {
    fn default() -> Self {
        Self {
            cache_duration: 0.1,
            feet_sample_offset: 10.0,
            surface_grip: 1.0,
            base_ground_friction: 8.0,

            base_walk_speed: 600.0,
            base_acceleration: 2048.0,
            braking_deceleration_walking: 4096.0,
            braking_friction_factor: 3.0,

            max_step_height: 50.0,
            walkable_angle: 55f32.to_radians(),

            swim_entry_depth: 50.0,
            swim_exit_depth: 20.0,
            swim_speed_multiplier: 0.6,
            swim_buoyancy: 1.0,
            swim_braking_deceleration: 600.0,
            swim_acceleration: 1024.0,

            dive_ascend_acceleration: 400.0,
            dive_descend_acceleration: 400.0,
            dive_floor_probe: 50.0,

            floor_grace_duration: 0.15,
            recent_grounded_window: 0.3,
            grace_height_threshold: 60.0,
            floor_trace_margin: 50.0,

            grace_warn_threshold: 3,
            grace_warn_window: 5.0,
        }
    }
}

impl VoxelControllerConfig {
    /// Builder: set the terrain cache refresh interval.
    pub fn with_cache_duration(mut self, seconds: f32) -> Self {
        self.cache_duration = seconds;
        self
    }

    /// Builder: set swim entry/exit depth thresholds.
    pub fn with_swim_depths(mut self, entry: f32, exit: f32) -> Self {
        self.swim_entry_depth = entry;
        self.swim_exit_depth = exit;
        self
    }

    /// Builder: set the swim speed multiplier.
    pub fn with_swim_speed_multiplier(mut self, multiplier: f32) -> Self {
        self.swim_speed_multiplier = multiplier;
        self
    }

    /// Builder: set the floor grace duration.
    pub fn with_floor_grace(mut self, duration: f32) -> Self {
        self.floor_grace_duration = duration;
        self
    }

    /// Builder: set the grace ledge-distance threshold.
    pub fn with_grace_height_threshold(mut self, threshold: f32) -> Self {
        self.grace_height_threshold = threshold;
        self
    }

    /// Builder: set the maximum walkable slope angle (radians).
    pub fn with_walkable_angle(mut self, radians: f32) -> Self {
        self.walkable_angle = radians;
        self
    }

    /// Builder: set the surface grip coefficient.
    pub fn with_surface_grip(mut self, grip: f32) -> Self {
        self.surface_grip = grip;
        self
    }

    /// Builder: set dive ascend/descend accelerations.
    pub fn with_dive_acceleration(mut self, ascend: f32, descend: f32) -> Self {
        self.dive_ascend_acceleration = ascend;
        self.dive_descend_acceleration = descend;
        self
    }
}

/// Integrator-facing motor state.
///
/// This is the **central hub** the core writes into each tick: the resolved
/// floor, the current movement mode, and the friction/speed fields the
/// generic capsule integrator consumes. The integrator executes whatever
/// mode is set here and never changes it unilaterally.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct CharacterMotor {
    /// Resolved floor for this tick. `None` means falling.
    #[reflect(ignore)]
    pub floor: Option<CollisionData>,
    /// True when `floor` was synthesized by the grace mechanism rather than
    /// detected by a sweep or trace.
    pub floor_synthesized: bool,

    /// Current movement mode. Transition authority lives in this crate.
    pub mode: MovementMode,

    /// Ground friction the integrator applies; written by the terrain cache.
    pub ground_friction: f32,
    /// Current max walk speed (base × external speed modifier).
    pub max_walk_speed: f32,
    /// Current max swim speed; also the vertical dive speed clamp.
    pub max_swim_speed: f32,
    /// Current acceleration (walking or swimming tuning).
    pub acceleration: f32,
    /// Current braking deceleration.
    pub braking_deceleration: f32,
    /// Current buoyancy.
    pub buoyancy: f32,

    /// External gameplay speed multiplier (abilities, status effects).
    pub speed_modifier: f32,

    /// Result of the dive-descend probe: solid ground close below.
    pub seabed_below: bool,

    /// Capsule half height (center to tip), mirrored from the collider.
    pub capsule_half_height: f32,
    /// Capsule radius, mirrored from the collider.
    pub capsule_radius: f32,
}

impl Default for CharacterMotor {
    fn default() -> Self {
        let config = VoxelControllerConfig::default();
        Self::from_config(&config)
    }
}

impl CharacterMotor {
    /// Create a motor with fields seeded from a config.
    pub fn from_config(config: &VoxelControllerConfig) -> Self {
        Self {
            floor: None,
            floor_synthesized: false,
            mode: MovementMode::Falling,
            ground_friction: config.base_ground_friction,
            max_walk_speed: config.base_walk_speed,
            max_swim_speed: config.base_walk_speed * config.swim_speed_multiplier,
            acceleration: config.base_acceleration,
            braking_deceleration: config.braking_deceleration_walking,
            buoyancy: 1.0,
            speed_modifier: 1.0,
            seabed_below: false,
            capsule_half_height: 90.0,
            capsule_radius: 35.0,
        }
    }

    /// Check if a walkable floor is currently resolved (real or grace).
    pub fn is_grounded(&self) -> bool {
        self.floor.is_some()
    }

    /// Get the floor normal, or world up when no floor is resolved.
    pub fn ground_normal(&self) -> Vec3 {
        self.floor.as_ref().map(|f| f.normal).unwrap_or(Vec3::Y)
    }

    /// Get the floor distance, or `f32::MAX` when no floor is resolved.
    pub fn ground_distance(&self) -> f32 {
        self.floor.as_ref().map(|f| f.distance).unwrap_or(f32::MAX)
    }

    /// Full capsule height.
    pub fn capsule_height(&self) -> f32 {
        self.capsule_half_height * 2.0
    }

    /// Offset from capsule center to the lowest point of the capsule.
    pub fn feet_offset(&self) -> f32 {
        self.capsule_half_height
    }

    /// Update the external speed modifier and recompute the walk speed.
    ///
    /// Swim speed picks up the new modifier on the next swim entry, matching
    /// how the entry transition snapshots its speed cap.
    pub fn set_speed_modifier(&mut self, config: &VoxelControllerConfig, modifier: f32) {
        self.speed_modifier = modifier.max(0.0);
        self.max_walk_speed = config.base_walk_speed * self.speed_modifier;
    }

    /// Apply swimming tuning. Called by the mode state machine on entry.
    pub(crate) fn apply_swim_tuning(&mut self, config: &VoxelControllerConfig) {
        self.max_swim_speed =
            config.base_walk_speed * config.swim_speed_multiplier * self.speed_modifier;
        self.buoyancy = config.swim_buoyancy;
        self.braking_deceleration = config.swim_braking_deceleration;
        self.acceleration = config.swim_acceleration;
    }

    /// Restore walking tuning. Called by the mode state machine on exit.
    pub(crate) fn apply_walk_tuning(&mut self, config: &VoxelControllerConfig) {
        self.buoyancy = 1.0;
        self.braking_deceleration = config.braking_deceleration_walking;
        self.acceleration = config.base_acceleration;
    }
}
