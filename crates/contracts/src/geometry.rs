//! Geometry primitives shared with the simulator
//!
//! Units follow the simulator: metres for positions, degrees for angles.

use serde::{Deserialize, Serialize};

/// World-space position (metres)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another location
    pub fn distance(&self, other: &Location) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Distance ignoring the vertical axis
    pub fn distance_2d(&self, other: &Location) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Copy of this location raised by `dz`
    pub fn lifted(&self, dz: f64) -> Self {
        Self {
            z: self.z + dz,
            ..*self
        }
    }
}

/// Orientation (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl Rotation {
    pub const fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Rotation with only a heading component
    pub const fn from_yaw(yaw: f64) -> Self {
        Self {
            pitch: 0.0,
            yaw,
            roll: 0.0,
        }
    }
}

/// Pose: location + rotation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    /// Position (x, y, z) in metres
    pub location: Location,

    /// Rotation (pitch, yaw, roll) in degrees
    pub rotation: Rotation,
}

impl Transform {
    pub const fn new(location: Location, rotation: Rotation) -> Self {
        Self { location, rotation }
    }

    /// Map a point from this transform's local frame into world space.
    ///
    /// Uses the simulator's left-handed convention (x forward, y right, z up;
    /// yaw about z, pitch about y, roll about x).
    pub fn transform_point(&self, local: &Location) -> Location {
        let (sy, cy) = self.rotation.yaw.to_radians().sin_cos();
        let (sp, cp) = self.rotation.pitch.to_radians().sin_cos();
        let (sr, cr) = self.rotation.roll.to_radians().sin_cos();

        let x = local.x * (cp * cy)
            + local.y * (cy * sp * sr - sy * cr)
            + local.z * (-cy * sp * cr - sy * sr);
        let y = local.x * (cp * sy)
            + local.y * (sy * sp * sr + cy * cr)
            + local.z * (-sy * sp * cr + cy * sr);
        let z = local.x * sp + local.y * (-cp * sr) + local.z * (cp * cr);

        Location {
            x: x + self.location.x,
            y: y + self.location.y,
            z: z + self.location.z,
        }
    }

    /// Unit vector pointing along the heading
    pub fn forward_vector(&self) -> Vector3D {
        let (sy, cy) = self.rotation.yaw.to_radians().sin_cos();
        let (sp, cp) = self.rotation.pitch.to_radians().sin_cos();
        Vector3D {
            x: cp * cy,
            y: cp * sy,
            z: sp,
        }
    }
}

/// Free vector (velocity, extent, ...)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3D {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Magnitude of the horizontal (x, y) components
    pub fn planar_length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Oriented box relative to its owning actor
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Centre, in the owner's local frame
    pub location: Location,

    /// Half-size along each local axis
    pub extent: Vector3D,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_distance() {
        let a = Location::new(0.0, 0.0, 0.0);
        let b = Location::new(3.0, 4.0, 12.0);
        assert!(approx(a.distance(&b), 13.0));
        assert!(approx(a.distance_2d(&b), 5.0));
    }

    #[test]
    fn test_transform_point_identity() {
        let t = Transform::new(Location::new(10.0, -2.0, 1.0), Rotation::default());
        let p = t.transform_point(&Location::new(1.0, 2.0, 3.0));
        assert!(approx(p.x, 11.0));
        assert!(approx(p.y, 0.0));
        assert!(approx(p.z, 4.0));
    }

    #[test]
    fn test_transform_point_yaw() {
        // 90 degrees of yaw turns local +x into world +y
        let t = Transform::new(Location::new(5.0, 5.0, 0.0), Rotation::from_yaw(90.0));
        let p = t.transform_point(&Location::new(2.0, 0.0, 0.0));
        assert!(approx(p.x, 5.0));
        assert!(approx(p.y, 7.0));

        // and local +y into world -x
        let q = t.transform_point(&Location::new(0.0, 3.0, 0.0));
        assert!(approx(q.x, 2.0));
        assert!(approx(q.y, 5.0));
    }

    #[test]
    fn test_planar_length_ignores_z() {
        let v = Vector3D::new(3.0, 4.0, 100.0);
        assert!(approx(v.planar_length(), 5.0));
    }
}
