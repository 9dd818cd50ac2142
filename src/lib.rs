//! # `voxel_character_controller`
//!
//! A voxel-aware character locomotion core with physics backend abstraction.
//!
//! This crate layers terrain awareness on top of a generic capsule
//! integrator:
//! - Caches surface material, friction, and water state beneath each
//!   character, invalidated by chunk edit events
//! - Resolves walkable floors on voxel trimesh terrain, correcting inverted
//!   and edge-artifact normals and bridging mesh-rebuild gaps with a
//!   bounded floor grace window
//! - Owns walking / falling / swimming transitions with depth hysteresis,
//!   plus dive control with a seabed probe
//! - Abstracts the physics backend for easy swapping (Rapier3D included)
//!
//! ## Architecture
//!
//! Each fixed tick runs as a chain: timers, backend sensors (capsule sweep
//! and probes), terrain cache refresh, mode transitions, dive control, and
//! state markers. Floor resolution itself is pure logic in [`floor`]; the
//! backend feeds it raw sweep hits and a line-trace probe.
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use voxel_character_controller::prelude::*;
//!
//! // Components for a character on voxel terrain
//! let config = VoxelControllerConfig::default().with_swim_depths(50.0, 20.0);
//! let motor = CharacterMotor::from_config(&config);
//! let intent = MovementIntent::default();
//!
//! // Spawn these as a bundle alongside the physics backend's components
//! ```

use bevy::prelude::*;

pub mod backend;
pub mod collision;
pub mod config;
pub mod floor;
pub mod intent;
pub mod modes;
pub mod state;
pub mod systems;
pub mod terrain;

#[cfg(feature = "rapier3d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::CharacterPhysicsBackend;
    pub use crate::collision::CollisionData;
    pub use crate::config::{CharacterMotor, VoxelControllerConfig};
    pub use crate::floor::FloorGrace;
    pub use crate::intent::MovementIntent;
    pub use crate::modes::MovementMode;
    pub use crate::state::{Airborne, Grounded, Swimming};
    pub use crate::terrain::{
        ChunkEdited, SurfaceType, TerrainCacheState, TerrainContext, TerrainQueryProvider,
        TerrainWorld,
    };
    pub use crate::{VoxelCharacterPlugin, VoxelCharacterSet};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::Rapier3dBackend;
}

/// Execution phases of the controller, chained in `FixedUpdate`.
///
/// Backend plugins register their detection systems in `Sensors`; everything
/// downstream reads the motor state those systems produce.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoxelCharacterSet {
    /// Timer ticking and cache invalidation.
    Preparation,
    /// Backend collision queries: floor sweep, seabed probe.
    Sensors,
    /// Terrain provider sampling and friction derivation.
    TerrainCache,
    /// Movement mode transitions.
    Modes,
    /// Velocity writes (dive control) and state markers.
    Finalize,
}

/// Main plugin for the voxel locomotion core.
///
/// Generic over a physics backend `B` which provides collider queries and
/// velocity access.
///
/// # Examples
///
/// With the Rapier3D backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use voxel_character_controller::prelude::*;
///
/// App::new()
///     .add_plugins(MinimalPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(VoxelCharacterPlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct VoxelCharacterPlugin<B: backend::CharacterPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::CharacterPhysicsBackend> Default for VoxelCharacterPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::CharacterPhysicsBackend> Plugin for VoxelCharacterPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::VoxelControllerConfig>();
        app.register_type::<config::CharacterMotor>();
        app.register_type::<floor::FloorGrace>();
        app.register_type::<intent::MovementIntent>();
        app.register_type::<terrain::TerrainContext>();
        app.register_type::<terrain::TerrainCacheState>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<state::Swimming>();

        app.add_event::<terrain::ChunkEdited>();

        app.configure_sets(
            FixedUpdate,
            (
                VoxelCharacterSet::Preparation,
                VoxelCharacterSet::Sensors,
                VoxelCharacterSet::TerrainCache,
                VoxelCharacterSet::Modes,
                VoxelCharacterSet::Finalize,
            )
                .chain(),
        );

        app.add_systems(
            FixedUpdate,
            (systems::tick_timers, systems::invalidate_terrain_cache)
                .chain()
                .in_set(VoxelCharacterSet::Preparation),
        );
        app.add_systems(
            FixedUpdate,
            systems::refresh_terrain_context::<B>.in_set(VoxelCharacterSet::TerrainCache),
        );
        app.add_systems(
            FixedUpdate,
            systems::update_movement_modes.in_set(VoxelCharacterSet::Modes),
        );
        app.add_systems(
            FixedUpdate,
            (systems::apply_dive_control::<B>, systems::sync_state_markers)
                .chain()
                .in_set(VoxelCharacterSet::Finalize),
        );

        // Backend plugin last so its sensor systems see the configured sets.
        app.add_plugins(B::plugin());
    }
}
