//! Soft viewport boundary.
//!
//! Agents near an edge get a small velocity nudge back toward the interior.
//! Positions are never clamped, so an agent may briefly leave the viewport.

use flock_config::{SimulationConfig, Viewport};
use flock_core::Vec2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryPolicy {
    pub edge_buffer: f32,
    pub damping_factor: f32,
}

impl BoundaryPolicy {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            edge_buffer: config.edge_buffer,
            damping_factor: config.damping_factor,
        }
    }

    /// Adjusts `velocity` for an agent at `position`. Returns true if any
    /// axis was nudged.
    pub fn apply(&self, position: Vec2, velocity: &mut Vec2, viewport: Viewport) -> bool {
        let dx = self.axis_nudge(position.x, viewport.width);
        let dy = self.axis_nudge(position.y, viewport.height);
        velocity.x += dx;
        velocity.y += dy;
        dx != 0.0 || dy != 0.0
    }

    /// Nudge for one axis. The near edge wins when both buffers overlap.
    #[inline]
    fn axis_nudge(&self, coordinate: f32, extent: f32) -> f32 {
        if coordinate < self.edge_buffer {
            self.damping_factor
        } else if coordinate > extent - self.edge_buffer {
            -self.damping_factor
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Viewport = Viewport { width: 1000.0, height: 800.0 };

    fn policy() -> BoundaryPolicy {
        BoundaryPolicy { edge_buffer: 200.0, damping_factor: 0.05 }
    }

    fn nudge(x: f32, y: f32) -> Vec2 {
        let mut velocity = Vec2::ZERO;
        policy().apply(Vec2::new(x, y), &mut velocity, VIEWPORT);
        velocity
    }

    #[test]
    fn interior_is_untouched() {
        assert_eq!(nudge(500.0, 400.0), Vec2::ZERO);
        // Exactly on the buffer line is not "within" the buffer
        assert_eq!(nudge(200.0, 200.0), Vec2::ZERO);
        assert_eq!(nudge(800.0, 600.0), Vec2::ZERO);
    }

    #[test]
    fn left_edge_pushes_right() {
        assert_eq!(nudge(199.9, 400.0), Vec2::new(0.05, 0.0));
    }

    #[test]
    fn right_edge_pushes_left() {
        assert_eq!(nudge(800.1, 400.0), Vec2::new(-0.05, 0.0));
    }

    #[test]
    fn top_edge_pushes_down() {
        assert_eq!(nudge(500.0, 10.0), Vec2::new(0.0, 0.05));
    }

    #[test]
    fn bottom_edge_pushes_up() {
        assert_eq!(nudge(500.0, 650.0), Vec2::new(0.0, -0.05));
    }

    #[test]
    fn corner_nudges_both_axes() {
        assert_eq!(nudge(-20.0, 900.0), Vec2::new(0.05, -0.05));
    }

    #[test]
    fn nudge_accumulates_on_existing_velocity() {
        let mut velocity = Vec2::new(-1.0, 0.5);
        assert!(policy().apply(Vec2::new(50.0, 400.0), &mut velocity, VIEWPORT));
        assert!((velocity - Vec2::new(-0.95, 0.5)).length() < 1e-6);
    }

    #[test]
    fn narrow_viewport_prefers_near_edge() {
        let narrow = Viewport { width: 300.0, height: 300.0 };
        let mut velocity = Vec2::ZERO;
        policy().apply(Vec2::new(150.0, 150.0), &mut velocity, narrow);
        assert_eq!(velocity, Vec2::new(0.05, 0.05));
    }
}
