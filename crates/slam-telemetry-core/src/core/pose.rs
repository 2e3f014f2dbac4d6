// crates/slam-telemetry-core/src/core/pose.rs
// ============================================================================
// Module: SLAM Telemetry Pose Codec
// Description: Camera pose to world position and yaw/pitch/roll conversion.
// Purpose: Give every caller the same camera-center and Euler-angle math.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Trackers store the world-to-camera transform `T_cw = [R_cw | t_cw]`. The
//! recorder wants the camera center in world coordinates and the heading of
//! the camera in the world frame:
//!
//! ```text
//! R_wc = R_cw^T
//! o_w  = -R_cw^T * t_cw
//! ```
//!
//! Euler angles use the Z-Y-X convention applied to `R_wc`
//! (`R = Rz(yaw) * Ry(pitch) * Rx(roll)`), in radians:
//!
//! ```text
//! yaw   = atan2(r10, r00)
//! pitch = asin(-r20)        (argument clamped to [-1, 1])
//! roll  = atan2(r21, r22)
//! ```

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ops::Neg;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Vector and Matrix
// ============================================================================

/// 3D vector in meters (or unitless when used as a direction).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Vector3 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
}

impl Vector3 {
    /// Creates a vector.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
        }
    }
}

impl Neg for Vector3 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl From<[f32; 3]> for Vector3 {
    fn from(value: [f32; 3]) -> Self {
        Self::new(value[0], value[1], value[2])
    }
}

impl From<Vector3> for [f32; 3] {
    fn from(value: Vector3) -> Self {
        [value.x, value.y, value.z]
    }
}

/// Row-major 3x3 matrix, used for rotations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Matrix3 {
    /// Matrix rows.
    rows: [[f32; 3]; 3],
}

impl Matrix3 {
    /// Identity matrix.
    pub const IDENTITY: Self = Self {
        rows: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// Creates a matrix from rows.
    #[must_use]
    pub const fn from_rows(rows: [[f32; 3]; 3]) -> Self {
        Self {
            rows,
        }
    }

    /// Returns the entry at `row`, `col`.
    #[must_use]
    pub const fn at(&self, row: usize, col: usize) -> f32 {
        self.rows[row][col]
    }

    /// Returns the transpose.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let r = &self.rows;
        Self::from_rows([
            [r[0][0], r[1][0], r[2][0]],
            [r[0][1], r[1][1], r[2][1]],
            [r[0][2], r[1][2], r[2][2]],
        ])
    }

    /// Multiplies the matrix by a column vector.
    #[must_use]
    pub fn mul_vec(&self, v: Vector3) -> Vector3 {
        let r = &self.rows;
        Vector3::new(
            r[0][0].mul_add(v.x, r[0][1].mul_add(v.y, r[0][2] * v.z)),
            r[1][0].mul_add(v.x, r[1][1].mul_add(v.y, r[1][2] * v.z)),
            r[2][0].mul_add(v.x, r[2][1].mul_add(v.y, r[2][2] * v.z)),
        )
    }

    /// Builds `Rz(yaw) * Ry(pitch) * Rx(roll)`.
    #[must_use]
    pub fn from_yaw_pitch_roll(angles: YawPitchRoll) -> Self {
        let (sy, cy) = angles.yaw.sin_cos();
        let (sp, cp) = angles.pitch.sin_cos();
        let (sr, cr) = angles.roll.sin_cos();
        Self::from_rows([
            [cy * cp, (cy * sp).mul_add(sr, -(sy * cr)), (cy * sp).mul_add(cr, sy * sr)],
            [sy * cp, (sy * sp).mul_add(sr, cy * cr), (sy * sp).mul_add(cr, -(cy * sr))],
            [-sp, cp * sr, cp * cr],
        ])
    }
}

impl Default for Matrix3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ============================================================================
// SECTION: Euler Angles
// ============================================================================

/// Heading of the camera in the world frame, in radians.
///
/// # Invariants
/// - Z-Y-X convention: `R = Rz(yaw) * Ry(pitch) * Rx(roll)`.
/// - `pitch` lies in `[-pi/2, pi/2]`; `yaw` and `roll` in `[-pi, pi]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct YawPitchRoll {
    /// Rotation about Z.
    pub yaw: f32,
    /// Rotation about Y.
    pub pitch: f32,
    /// Rotation about X.
    pub roll: f32,
}

impl YawPitchRoll {
    /// Creates an angle triple.
    #[must_use]
    pub const fn new(yaw: f32, pitch: f32, roll: f32) -> Self {
        Self {
            yaw,
            pitch,
            roll,
        }
    }

    /// Extracts yaw/pitch/roll from a camera-to-world rotation.
    #[must_use]
    pub fn from_rotation(rotation: &Matrix3) -> Self {
        let yaw = rotation.at(1, 0).atan2(rotation.at(0, 0));
        let pitch = (-rotation.at(2, 0)).clamp(-1.0, 1.0).asin();
        let roll = rotation.at(2, 1).atan2(rotation.at(2, 2));
        Self::new(yaw, pitch, roll)
    }
}

// ============================================================================
// SECTION: Pose Sample
// ============================================================================

/// World position and orientation of the camera for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseSample {
    /// Camera center in world coordinates.
    pub position: Vector3,
    /// Camera heading in the world frame.
    pub orientation: YawPitchRoll,
}

impl PoseSample {
    /// Decodes a world-to-camera pose `T_cw = [R_cw | t_cw]`.
    #[must_use]
    pub fn from_camera_pose(rotation_cw: &Matrix3, translation_cw: Vector3) -> Self {
        let rotation_wc = rotation_cw.transpose();
        let position = -rotation_wc.mul_vec(translation_cw);
        Self {
            position,
            orientation: YawPitchRoll::from_rotation(&rotation_wc),
        }
    }

    /// Decodes an already-inverted pose `T_wc = [R_wc | o_w]`.
    #[must_use]
    pub fn from_inverse_pose(rotation_wc: &Matrix3, center_w: Vector3) -> Self {
        Self {
            position: center_w,
            orientation: YawPitchRoll::from_rotation(rotation_wc),
        }
    }
}
