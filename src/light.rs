// Light module for the robot room

use glam::Vec3;

/// Anything the patrol robot can aim as its turret light.
pub trait Spotlight {
    fn set_position(&mut self, position: Vec3);
    fn set_direction(&mut self, direction: Vec3);
}

/// A spot light (cone-shaped).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpotLight {
    /// Light position in world space
    pub position: Vec3,
    /// Light direction (normalized)
    pub direction: Vec3,
    pub color: Vec3,
    /// In [0, 1]
    pub intensity: f32,
    /// Inner cone angle cosine
    pub inner_cutoff: f32,
    /// Outer cone angle cosine
    pub outer_cutoff: f32,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 4.0, 0.0),
            direction: Vec3::NEG_Y,
            color: Vec3::ONE,
            intensity: 1.0,
            inner_cutoff: 0.9, // ~25 degrees
            outer_cutoff: 0.8, // ~37 degrees
        }
    }
}

impl Spotlight for SpotLight {
    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn set_direction(&mut self, direction: Vec3) {
        self.direction = direction.normalize_or_zero();
    }
}

/// A point light (omnidirectional) lighting the whole room.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    /// In [0, 1]
    pub intensity: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 8.0, -4.0),
            color: Vec3::ONE,
            intensity: 1.0,
        }
    }
}

/// Shifts `intensity` by `delta`, keeping it within [0, 1].
pub fn adjust_intensity(intensity: &mut f32, delta: f32) {
    *intensity = (*intensity + delta).clamp(0.0, 1.0);
}
