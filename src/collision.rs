//! Collision hit data structures.
//!
//! These structures hold the results of physics queries (capsule sweeps and
//! line traces) used for floor resolution and dive probing.

use bevy::prelude::*;

/// Information about a sweep/trace collision.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionData {
    /// Distance to the hit point along the cast direction.
    pub distance: f32,
    /// Impact normal of the surface at the hit point.
    pub normal: Vec3,
    /// World position of the hit point.
    pub point: Vec3,
    /// Entity that was hit (if any).
    pub entity: Option<Entity>,
    /// Whether the cast started already penetrating the hit shape.
    /// Normal corrections are skipped for penetrating hits.
    pub start_penetrating: bool,
}

impl CollisionData {
    /// Create a collision result.
    pub fn new(distance: f32, normal: Vec3, point: Vec3, entity: Option<Entity>) -> Self {
        Self {
            distance,
            normal,
            point,
            entity,
            start_penetrating: false,
        }
    }

    /// Builder: mark this hit as starting in penetration.
    pub fn penetrating(mut self) -> Self {
        self.start_penetrating = true;
        self
    }

    /// Return a copy with the normal flipped.
    pub fn with_flipped_normal(mut self) -> Self {
        self.normal = -self.normal;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collision_data_new() {
        let hit = CollisionData::new(5.0, Vec3::Y, Vec3::new(10.0, 0.0, 0.0), None);

        assert_eq!(hit.distance, 5.0);
        assert_eq!(hit.normal, Vec3::Y);
        assert_eq!(hit.point, Vec3::new(10.0, 0.0, 0.0));
        assert!(!hit.start_penetrating);
    }

    #[test]
    fn collision_data_flipped_normal() {
        let hit = CollisionData::new(1.0, Vec3::NEG_Z, Vec3::ZERO, None);
        let flipped = hit.with_flipped_normal();

        assert_eq!(flipped.normal, Vec3::Z);
        assert_eq!(flipped.distance, hit.distance);
    }

    #[test]
    fn collision_data_penetrating() {
        let hit = CollisionData::new(0.0, Vec3::Z, Vec3::ZERO, None).penetrating();
        assert!(hit.start_penetrating);
    }
}
