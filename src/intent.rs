//! Desired-movement input, decoupled from any input device.
//!
//! Gameplay code writes intent each frame; the controller systems read it
//! during the fixed tick. Intent is declarative: it says what the character
//! wants, the mode machine and dive control decide what actually happens.

use bevy::prelude::*;

/// Per-character movement intent.
///
/// `walk` is a world-space horizontal direction (length clamped to 1 by the
/// consumer). The dive flags only matter while swimming; pressing both
/// cancels out.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct MovementIntent {
    /// Horizontal movement direction on the XZ plane.
    pub walk: Vec2,
    /// Swim toward the surface.
    pub ascend: bool,
    /// Swim toward the seabed.
    pub descend: bool,
}

impl MovementIntent {
    /// Net vertical dive input in -1..=1.
    pub fn dive_axis(&self) -> f32 {
        (self.ascend as i8 - self.descend as i8) as f32
    }

    /// Clear all intent, typically on possession change or death.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dive_axis_combines_flags() {
        let mut intent = MovementIntent::default();
        assert_eq!(intent.dive_axis(), 0.0);

        intent.ascend = true;
        assert_eq!(intent.dive_axis(), 1.0);

        intent.descend = true;
        assert_eq!(intent.dive_axis(), 0.0);

        intent.ascend = false;
        assert_eq!(intent.dive_axis(), -1.0);
    }

    #[test]
    fn clear_resets_everything() {
        let mut intent = MovementIntent {
            walk: Vec2::new(1.0, -0.5),
            ascend: true,
            descend: false,
        };
        intent.clear();
        assert_eq!(intent.walk, Vec2::ZERO);
        assert!(!intent.ascend && !intent.descend);
    }
}
