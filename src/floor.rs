//! Floor resolution for voxel trimesh terrain.
//!
//! Voxel meshers produce double-sided trimesh collision with two artifact
//! classes a stock capsule integrator rejects:
//!
//! - **Inverted normals**: triangle winding can make a top-facing surface
//!   report a downward-pointing normal. The floor is blocking but fails the
//!   walkable test.
//! - **Edge normals**: a capsule sweep can return the normal of a triangle
//!   *edge* at voxel seams, nearly horizontal even though the face is flat.
//!
//! On top of the geometric corrections, chunk meshes are rebuilt
//! asynchronously, so collision under a grounded character can vanish for a
//! few frames. A bounded, distance-gated grace window synthesizes a floor
//! across those gaps without masking genuine ledges.
//!
//! All logic here is pure: the caller supplies the raw downward sweep hit
//! and a line-trace probe, which keeps the layer independent of any physics
//! backend and lets integrators inject it as a floor-resolution strategy.

use bevy::prelude::*;

use crate::collision::CollisionData;
use crate::config::VoxelControllerConfig;

/// Tolerance below which a normal's vertical component counts as inverted.
pub const NORMAL_EPSILON: f32 = 1e-4;

/// Resolved floor for one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloorResult {
    /// Whether a walkable floor was found (or synthesized).
    pub walkable: bool,
    /// Whether the underlying sweep hit anything blocking.
    pub blocking: bool,
    /// True when the floor was synthesized by the grace mechanism.
    pub synthesized: bool,
    /// The (possibly corrected) hit. Meaningless when `!walkable && !blocking`.
    pub hit: CollisionData,
}

impl FloorResult {
    fn none() -> Self {
        Self::default()
    }

    fn real(hit: CollisionData) -> Self {
        Self {
            walkable: true,
            blocking: true,
            synthesized: false,
            hit,
        }
    }

    fn synthesized() -> Self {
        Self {
            walkable: true,
            blocking: true,
            synthesized: true,
            hit: CollisionData::new(0.0, Vec3::Y, Vec3::ZERO, None),
        }
    }
}

/// Per-character grace state. A local smoothing artifact: never persisted,
/// never replicated.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct FloorGrace {
    /// Seconds of synthesized-floor grace remaining. Never negative.
    pub grace_timer: f32,
    /// Seconds since a floor was genuinely detected (not synthesized).
    pub time_since_real_floor: f32,
    /// One-shot latch: grace was already granted for the current gap. A gap
    /// gets exactly one grace window; only a real floor re-arms it.
    grace_used: bool,
    /// Grace windows that expired without a real floor reappearing, within
    /// the current diagnostic window.
    exhaust_count: u32,
    /// Elapsed time in the current diagnostic window.
    exhaust_window_elapsed: f32,
    /// Set for one tick when the grace timer runs out.
    just_exhausted: bool,
}

impl Default for FloorGrace {
    fn default() -> Self {
        Self {
            grace_timer: 0.0,
            // Fresh characters have never seen a floor; start outside the
            // recent-grounded window so grace cannot trigger mid-air at spawn.
            time_since_real_floor: f32::MAX,
            grace_used: false,
            exhaust_count: 0,
            exhaust_window_elapsed: 0.0,
            just_exhausted: false,
        }
    }
}

impl FloorGrace {
    /// Advance timers by one tick. Runs before floor resolution.
    pub fn tick(&mut self, dt: f32) {
        self.just_exhausted = false;
        if self.grace_timer > 0.0 {
            self.grace_timer = (self.grace_timer - dt).max(0.0);
            if self.grace_timer == 0.0 {
                self.just_exhausted = true;
                self.exhaust_count += 1;
            }
        }
        if self.time_since_real_floor < f32::MAX {
            self.time_since_real_floor += dt;
        }
        self.exhaust_window_elapsed += dt;
    }

    /// A real (non-synthesized) walkable floor was found this tick.
    pub fn mark_real_floor(&mut self) {
        self.time_since_real_floor = 0.0;
        self.grace_timer = 0.0;
        self.grace_used = false;
        self.just_exhausted = false;
    }

    /// Whether synthesized-floor grace is currently active.
    pub fn is_active(&self) -> bool {
        self.grace_timer > 0.0
    }

    /// Whether the grace timer ran out on the most recent tick.
    pub fn just_exhausted(&self) -> bool {
        self.just_exhausted
    }

    /// Check the exhaustion-frequency diagnostic and reset its window when
    /// due. Returns the count when it crossed the threshold.
    pub fn take_exhaustion_report(&mut self, config: &VoxelControllerConfig) -> Option<u32> {
        if self.exhaust_window_elapsed < config.grace_warn_window {
            return None;
        }
        let count = self.exhaust_count;
        self.exhaust_count = 0;
        self.exhaust_window_elapsed = 0.0;
        (count >= config.grace_warn_threshold).then_some(count)
    }
}

/// Test whether a surface normal is walkable under the configured max slope.
pub fn is_walkable(normal: Vec3, walkable_angle: f32) -> bool {
    normal.y > 0.0 && normal.y >= walkable_angle.cos() - NORMAL_EPSILON
}

/// Flip an inverted normal and re-test walkability.
///
/// Returns the corrected hit when the normal's vertical component is
/// negative beyond the epsilon and the flipped normal passes the walkable
/// test. Penetrating hits are left alone. This is a pure geometric fix and
/// always runs before any grace logic.
pub fn correct_inverted_normal(
    hit: &CollisionData,
    walkable_angle: f32,
) -> Option<CollisionData> {
    if hit.start_penetrating {
        return None;
    }
    if hit.normal.y < -NORMAL_EPSILON {
        let fixed = hit.with_flipped_normal();
        if is_walkable(fixed.normal, walkable_angle) {
            return Some(fixed);
        }
    }
    None
}

/// Resolve the floor under a capsule for one tick.
///
/// `sweep_hit` is the raw downward capsule sweep result from the collision
/// backend (`None` when nothing was hit). `line_trace` is a straight-line
/// probe `(start, end) -> hit` that ignores the character's own collider.
/// `capsule_center` is the capsule center in world space.
///
/// Order: inverted-normal correction, then edge-normal correction via line
/// trace, then (only if both fail) the grace mechanism. A synthesized floor
/// is only granted within `recent_grounded_window` of a real contact and
/// only when a floor exists within `grace_height_threshold` below the
/// capsule, so genuine ledges fall naturally.
pub fn resolve_floor(
    sweep_hit: Option<CollisionData>,
    line_trace: &mut dyn FnMut(Vec3, Vec3) -> Option<CollisionData>,
    capsule_center: Vec3,
    capsule_half_height: f32,
    config: &VoxelControllerConfig,
    grace: &mut FloorGrace,
) -> FloorResult {
    let mut result = match sweep_hit {
        Some(hit) if is_walkable(hit.normal, config.walkable_angle) => FloorResult::real(hit),
        Some(hit) => {
            let mut result = FloorResult {
                walkable: false,
                blocking: true,
                synthesized: false,
                hit,
            };

            // Inverted normal from double-sided trimesh winding.
            if let Some(fixed) = correct_inverted_normal(&hit, config.walkable_angle) {
                result.walkable = true;
                result.hit = fixed;
            }

            // Edge normal from a voxel seam: a line trace hits the triangle
            // face directly and returns the true face normal.
            if !result.walkable && !hit.start_penetrating {
                let trace_end = capsule_center
                    - Vec3::Y * (capsule_half_height + config.floor_trace_margin);
                if let Some(line_hit) = line_trace(capsule_center, trace_end) {
                    let line_hit = if line_hit.normal.y < -NORMAL_EPSILON {
                        line_hit.with_flipped_normal()
                    } else {
                        line_hit
                    };
                    if is_walkable(line_hit.normal, config.walkable_angle) {
                        debug!(
                            "floor edge normal corrected: sweep {:?} -> face {:?}",
                            hit.normal, line_hit.normal
                        );
                        result.walkable = true;
                        result.hit.normal = line_hit.normal;
                        result.hit.point = line_hit.point;
                    }
                }
            }

            result
        }
        None => FloorResult::none(),
    };

    if result.walkable {
        grace.mark_real_floor();
        return result;
    }

    // Grace: bridge transient gaps from in-flight mesh rebuilds. Grant at
    // most once per gap, only when recently grounded and when a floor
    // actually exists a short distance below; a long drop is a real ledge.
    if grace.time_since_real_floor < config.recent_grounded_window && !grace.grace_used {
        let probe_start = capsule_center - Vec3::Y * capsule_half_height;
        let probe_end = probe_start - Vec3::Y * config.grace_height_threshold;
        if line_trace(probe_start, probe_end).is_some() {
            debug!("floor grace granted for {:.0} ms", config.floor_grace_duration * 1000.0);
            grace.grace_timer = config.floor_grace_duration;
            grace.grace_used = true;
        }
    }

    if grace.is_active() {
        result = FloorResult::synthesized();
    }

    result
}

/// Validate a candidate landing hit, applying the same normal corrections
/// as floor resolution.
///
/// The stock integrator rejects landing hits with downward normals before
/// floor resolution gets a chance to correct them, which makes characters
/// slide after jumps on voxel terrain. Returns the hit to validate against
/// the integrator's landing rules: corrected when a fix applies, otherwise
/// the original.
pub fn correct_landing_hit(
    hit: &CollisionData,
    line_trace: &mut dyn FnMut(Vec3, Vec3) -> Option<CollisionData>,
    capsule_center: Vec3,
    capsule_half_height: f32,
    config: &VoxelControllerConfig,
) -> CollisionData {
    if let Some(fixed) = correct_inverted_normal(hit, config.walkable_angle) {
        return fixed;
    }

    if !hit.start_penetrating && !is_walkable(hit.normal, config.walkable_angle) {
        let trace_end =
            capsule_center - Vec3::Y * (capsule_half_height + config.floor_trace_margin);
        if let Some(line_hit) = line_trace(capsule_center, trace_end) {
            let line_hit = if line_hit.normal.y < -NORMAL_EPSILON {
                line_hit.with_flipped_normal()
            } else {
                line_hit
            };
            if is_walkable(line_hit.normal, config.walkable_angle) {
                let mut fixed = *hit;
                fixed.normal = line_hit.normal;
                return fixed;
            }
        }
    }

    *hit
}
