// Math utilities for the robot room
//
// All angles handed to this module are in degrees; glam works in radians.

use glam::{Mat4, Quat, Vec3};

/// Represents a 3D transformation
#[derive(Debug, Clone, Copy)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Create a new transform
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Create a transform whose rotation is given as per-axis angles in degrees.
    ///
    /// The rotations are applied about X first, then Y, then Z, so the
    /// resulting matrix is `T * Rz * Ry * Rx * S`.
    pub fn from_degrees(position: Vec3, rotate: Vec3, scale: Vec3) -> Self {
        Self::new(position, euler_degrees(rotate), scale)
    }

    /// Generate transformation matrix
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            self.scale,
            self.rotation,
            self.position
        )
    }
}

/// Rotation about X, then Y, then Z (degrees).
pub fn euler_degrees(rotate: Vec3) -> Quat {
    Quat::from_rotation_z(rotate.z.to_radians())
        * Quat::from_rotation_y(rotate.y.to_radians())
        * Quat::from_rotation_x(rotate.x.to_radians())
}

pub fn rotate_x(degrees: f32) -> Mat4 {
    Mat4::from_rotation_x(degrees.to_radians())
}

pub fn rotate_y(degrees: f32) -> Mat4 {
    Mat4::from_rotation_y(degrees.to_radians())
}

pub fn rotate_z(degrees: f32) -> Mat4 {
    Mat4::from_rotation_z(degrees.to_radians())
}

pub fn translate(x: f32, y: f32, z: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(x, y, z))
}

pub fn scale(x: f32, y: f32, z: f32) -> Mat4 {
    Mat4::from_scale(Vec3::new(x, y, z))
}

/// Folds an angle in degrees into the half-open range (-180, 180].
pub fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}
