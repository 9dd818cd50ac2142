//! Shared test harness: a scripted physics backend and terrain provider.
//!
//! The scripted backend replaces collider queries with per-test fixtures, so
//! the full fixed-tick chain (timers, sensors, terrain cache, modes, dive
//! control, markers) runs deterministically without a physics engine.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bevy::prelude::*;
use voxel_character_controller::collision::CollisionData;
use voxel_character_controller::floor;
use voxel_character_controller::prelude::*;
use voxel_character_controller::VoxelCharacterSet;

/// Velocity component for the scripted backend.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct TestVelocity(pub Vec3);

/// Scripted collision fixtures, set by each test.
#[derive(Resource, Default, Clone, Copy)]
pub struct ScriptedCollision {
    /// Result of the downward capsule sweep.
    pub sweep: Option<CollisionData>,
    /// Result of every line trace (normal correction, grace probe).
    pub trace: Option<CollisionData>,
    /// Result of the dive seabed probe.
    pub seabed_hit: bool,
}

pub struct TestBackend;

impl CharacterPhysicsBackend for TestBackend {
    type VelocityComponent = TestVelocity;

    fn plugin() -> impl Plugin {
        TestBackendPlugin
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<TestVelocity>(entity)
            .map(|v| v.0)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<TestVelocity>(entity) {
            vel.0 = velocity;
        }
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation)
            .unwrap_or(Vec3::ZERO)
    }

    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.timestep().as_secs_f32())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 60.0)
    }
}

pub struct TestBackendPlugin;

impl Plugin for TestBackendPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ScriptedCollision>();
        app.add_systems(
            FixedUpdate,
            (scripted_floor_detection, scripted_seabed_probe)
                .chain()
                .in_set(VoxelCharacterSet::Sensors),
        );
    }
}

/// Run the scripted sweep through real floor resolution, exactly like the
/// rapier sensor does.
fn scripted_floor_detection(
    scripted: Res<ScriptedCollision>,
    mut q_characters: Query<(
        &Transform,
        &VoxelControllerConfig,
        &mut CharacterMotor,
        &mut FloorGrace,
    )>,
) {
    for (transform, config, mut motor, mut grace) in &mut q_characters {
        let trace = scripted.trace;
        let mut line_trace = move |_start: Vec3, _end: Vec3| trace;

        let result = floor::resolve_floor(
            scripted.sweep,
            &mut line_trace,
            transform.translation,
            motor.capsule_half_height,
            config,
            &mut grace,
        );

        motor.floor = result.walkable.then_some(result.hit);
        motor.floor_synthesized = result.synthesized;
    }
}

fn scripted_seabed_probe(
    scripted: Res<ScriptedCollision>,
    mut q_characters: Query<&mut CharacterMotor>,
) {
    for mut motor in &mut q_characters {
        motor.seabed_below = scripted.seabed_hit;
    }
}

/// Shared mutable state behind the test terrain provider.
#[derive(Debug, Clone, Copy)]
pub struct TerrainState {
    /// Material returned for every sample, or `None` to simulate an
    /// unloaded chunk.
    pub material: Option<u8>,
    /// Water surface height, or `None` for a dry world.
    pub water_surface: Option<f32>,
    /// Chunk coordinate reported for every sample.
    pub chunk: IVec3,
    /// Number of provider samples, to observe cache behavior.
    pub sample_count: u32,
}

impl Default for TerrainState {
    fn default() -> Self {
        Self {
            material: Some(2), // stone
            water_surface: None,
            chunk: IVec3::ZERO,
            sample_count: 0,
        }
    }
}

#[derive(Clone)]
pub struct TestTerrain(pub Arc<Mutex<TerrainState>>);

impl TestTerrain {
    pub fn new(state: TerrainState) -> Self {
        Self(Arc::new(Mutex::new(state)))
    }

    pub fn set(&self, f: impl FnOnce(&mut TerrainState)) {
        f(&mut self.0.lock().unwrap());
    }

    pub fn sample_count(&self) -> u32 {
        self.0.lock().unwrap().sample_count
    }
}

impl TerrainQueryProvider for TestTerrain {
    fn sample_material(&self, _position: Vec3) -> Option<u8> {
        let mut state = self.0.lock().unwrap();
        state.sample_count += 1;
        state.material
    }

    fn water_depth(&self, position: Vec3) -> Option<f32> {
        let state = self.0.lock().unwrap();
        let surface = state.water_surface?;
        Some((surface - position.y).max(0.0))
    }

    fn chunk_of(&self, _position: Vec3) -> IVec3 {
        self.0.lock().unwrap().chunk
    }
}

/// Create a test app with the locomotion plugin on the scripted backend.
pub fn create_test_app(terrain: &TestTerrain) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.insert_resource(Time::<Fixed>::from_hz(60.0));
    app.add_plugins(VoxelCharacterPlugin::<TestBackend>::default());
    app.insert_resource(TerrainWorld::new(Arc::new(terrain.clone())));
    app.finish();
    app.cleanup();
    app
}

/// Spawn a character at a position with the default config.
pub fn spawn_character(app: &mut App, position: Vec3) -> Entity {
    spawn_character_with_config(app, position, VoxelControllerConfig::default())
}

pub fn spawn_character_with_config(
    app: &mut App,
    position: Vec3,
    config: VoxelControllerConfig,
) -> Entity {
    let motor = CharacterMotor::from_config(&config);
    app.world_mut()
        .spawn((
            Transform::from_translation(position),
            config,
            motor,
            TerrainContext::default(),
            TerrainCacheState::default(),
            FloorGrace::default(),
            MovementIntent::default(),
            TestVelocity::default(),
        ))
        .id()
}

/// Run one fixed tick with a deterministic delta.
pub fn tick(app: &mut App) {
    let timestep = Duration::from_secs_f64(1.0 / 60.0);
    app.world_mut().resource_mut::<Time>().advance_by(timestep);
    app.world_mut().run_schedule(FixedUpdate);
}

/// Run the app for N fixed ticks.
pub fn run_frames(app: &mut App, frames: usize) {
    for _ in 0..frames {
        tick(app);
    }
}

/// Scripted walkable floor directly under the feet.
pub fn flat_floor() -> Option<CollisionData> {
    Some(CollisionData::new(1.0, Vec3::Y, Vec3::ZERO, None))
}

pub fn set_sweep(app: &mut App, sweep: Option<CollisionData>) {
    app.world_mut().resource_mut::<ScriptedCollision>().sweep = sweep;
}

pub fn set_trace(app: &mut App, trace: Option<CollisionData>) {
    app.world_mut().resource_mut::<ScriptedCollision>().trace = trace;
}

pub fn motor<'a>(app: &'a App, entity: Entity) -> &'a CharacterMotor {
    app.world().get::<CharacterMotor>(entity).unwrap()
}

pub fn context<'a>(app: &'a App, entity: Entity) -> &'a TerrainContext {
    app.world().get::<TerrainContext>(entity).unwrap()
}
