//! Integration tests for floor resolution on voxel trimesh artifacts and
//! the mesh-rebuild grace window.

use bevy::prelude::*;
use voxel_character_controller::collision::CollisionData;
use voxel_character_controller::prelude::*;

mod common;
use common::*;

#[test]
fn inverted_normal_floor_is_walkable() {
    let terrain = TestTerrain::new(TerrainState::default());
    let mut app = create_test_app(&terrain);
    let character = spawn_character(&mut app, Vec3::new(0.0, 100.0, 0.0));

    // Bad triangle winding reports the floor normal pointing straight down.
    set_sweep(
        &mut app,
        Some(CollisionData::new(1.0, Vec3::NEG_Y, Vec3::ZERO, None)),
    );
    tick(&mut app);

    let m = motor(&app, character);
    assert!(m.is_grounded());
    assert!(!m.floor_synthesized);
    assert_eq!(m.ground_normal(), Vec3::Y);
    assert_eq!(m.mode, MovementMode::Walking);
    assert!(app.world().get::<Grounded>(character).is_some());
}

#[test]
fn edge_normal_replaced_by_face_normal() {
    let terrain = TestTerrain::new(TerrainState::default());
    let mut app = create_test_app(&terrain);
    let character = spawn_character(&mut app, Vec3::new(0.0, 100.0, 0.0));

    // Sweep catches a near-horizontal edge normal at a voxel seam; the line
    // trace hits the flat face underneath.
    set_sweep(
        &mut app,
        Some(CollisionData::new(
            1.0,
            Vec3::new(0.99, 0.14, 0.0),
            Vec3::ZERO,
            None,
        )),
    );
    set_trace(
        &mut app,
        Some(CollisionData::new(95.0, Vec3::Y, Vec3::new(0.0, 10.0, 0.0), None)),
    );
    tick(&mut app);

    let m = motor(&app, character);
    assert!(m.is_grounded());
    assert!(!m.floor_synthesized);
    assert_eq!(m.ground_normal(), Vec3::Y);
}

#[test]
fn steep_slope_stays_unwalkable() {
    let terrain = TestTerrain::new(TerrainState::default());
    let mut app = create_test_app(&terrain);
    let character = spawn_character(&mut app, Vec3::new(0.0, 100.0, 0.0));

    // A genuinely steep surface, no trace to rescue it.
    let steep = Vec3::new(70f32.to_radians().sin(), 70f32.to_radians().cos(), 0.0);
    set_sweep(&mut app, Some(CollisionData::new(1.0, steep, Vec3::ZERO, None)));
    tick(&mut app);

    let m = motor(&app, character);
    assert!(!m.is_grounded());
    assert_eq!(m.mode, MovementMode::Falling);
    assert!(app.world().get::<Airborne>(character).is_some());
}

#[test]
fn grace_bridges_mesh_rebuild_gap() {
    let terrain = TestTerrain::new(TerrainState::default());
    let mut app = create_test_app(&terrain);
    let character = spawn_character(&mut app, Vec3::new(0.0, 100.0, 0.0));

    // Walk on a real floor first.
    set_sweep(&mut app, flat_floor());
    run_frames(&mut app, 5);
    assert!(motor(&app, character).is_grounded());

    // The chunk mesh is swapped: collision vanishes, but the old surface is
    // still right below (the grace probe hits).
    set_sweep(&mut app, None);
    set_trace(
        &mut app,
        Some(CollisionData::new(20.0, Vec3::Y, Vec3::ZERO, None)),
    );

    let config = VoxelControllerConfig::default();
    let dt = 1.0 / 60.0;
    let mut synthesized_ticks = 0;
    for _ in 0..30 {
        tick(&mut app);
        let m = motor(&app, character);
        if m.is_grounded() {
            assert!(m.floor_synthesized);
            synthesized_ticks += 1;
        }
    }

    // Grounded across the gap, but only within the grace duration.
    assert!(synthesized_ticks > 0, "grace never bridged the gap");
    let bridged = synthesized_ticks as f32 * dt;
    assert!(
        bridged <= config.floor_grace_duration + dt,
        "synthesized floor lasted {bridged}s"
    );

    // After exhaustion the character is falling.
    assert!(!motor(&app, character).is_grounded());
    assert_eq!(motor(&app, character).mode, MovementMode::Falling);
}

#[test]
fn real_ledge_falls_without_grace() {
    let terrain = TestTerrain::new(TerrainState::default());
    let mut app = create_test_app(&terrain);
    let character = spawn_character(&mut app, Vec3::new(0.0, 100.0, 0.0));

    set_sweep(&mut app, flat_floor());
    run_frames(&mut app, 5);
    assert!(motor(&app, character).is_grounded());

    // Walked off a cliff: nothing below within the grace height threshold.
    set_sweep(&mut app, None);
    set_trace(&mut app, None);
    tick(&mut app);

    let m = motor(&app, character);
    assert!(!m.is_grounded(), "grace masked a real ledge");
    assert!(!m.floor_synthesized);
    assert_eq!(m.mode, MovementMode::Falling);
}

#[test]
fn grace_rearms_after_real_floor_returns() {
    let terrain = TestTerrain::new(TerrainState::default());
    let mut app = create_test_app(&terrain);
    let character = spawn_character(&mut app, Vec3::new(0.0, 100.0, 0.0));

    set_sweep(&mut app, flat_floor());
    run_frames(&mut app, 5);

    // First gap: grace used until exhaustion.
    set_sweep(&mut app, None);
    set_trace(
        &mut app,
        Some(CollisionData::new(20.0, Vec3::Y, Vec3::ZERO, None)),
    );
    run_frames(&mut app, 30);
    assert!(!motor(&app, character).is_grounded());

    // Rebuilt mesh lands; real floor again.
    set_sweep(&mut app, flat_floor());
    run_frames(&mut app, 5);
    assert!(motor(&app, character).is_grounded());
    assert!(!motor(&app, character).floor_synthesized);

    // Second gap is bridged again.
    set_sweep(&mut app, None);
    tick(&mut app);
    let m = motor(&app, character);
    assert!(m.is_grounded());
    assert!(m.floor_synthesized);
}

#[test]
fn fresh_spawn_gets_no_grace() {
    let terrain = TestTerrain::new(TerrainState::default());
    let mut app = create_test_app(&terrain);
    let character = spawn_character(&mut app, Vec3::new(0.0, 500.0, 0.0));

    // Never grounded, yet the trace would find something below.
    set_sweep(&mut app, None);
    set_trace(
        &mut app,
        Some(CollisionData::new(20.0, Vec3::Y, Vec3::ZERO, None)),
    );
    run_frames(&mut app, 5);

    let m = motor(&app, character);
    assert!(!m.is_grounded(), "grace triggered for a character that never landed");
    assert_eq!(m.mode, MovementMode::Falling);
}
