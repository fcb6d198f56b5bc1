use std::fmt;

use crate::foundation::error::{MarkerlayError, MarkerlayResult};

pub use kurbo::{Affine, Point, Size};
pub use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};

/// Identity of a reference image, exactly as named in the reference catalog.
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct MarkerId(pub String);

impl MarkerId {
    /// Build a marker id from any string-like name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the raw name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MarkerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Real-world size of a printed marker, in metres.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PhysicalSize {
    pub width: f64,
    pub height: f64,
}

impl PhysicalSize {
    pub fn new(width: f64, height: f64) -> MarkerlayResult<Self> {
        let size = Self { width, height };
        size.validate()?;
        Ok(size)
    }

    pub fn validate(self) -> MarkerlayResult<()> {
        if !self.width.is_finite() || !self.height.is_finite() {
            return Err(MarkerlayError::validation(
                "physical size must be finite",
            ));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(MarkerlayError::validation("physical size must be > 0"));
        }
        Ok(())
    }

    pub fn to_size(self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// What the tracking source knows about a detected image. Immutable once detected.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MarkerDescriptor {
    pub id: MarkerId,
    pub physical_size: PhysicalSize,
}

impl MarkerDescriptor {
    pub fn new(id: impl Into<String>, physical_size: PhysicalSize) -> Self {
        Self {
            id: MarkerId::new(id),
            physical_size,
        }
    }
}

/// Position + orientation of a marker (or node) in world space.
///
/// Serialized as `{ "position": [x, y, z], "orientation": [x, y, z, w] }`; the orientation
/// quaternion is normalized on load and defaults to identity.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "PoseRepr", into = "PoseRepr")]
pub struct Pose(pub Isometry3<f64>);

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    pub fn identity() -> Self {
        Self(Isometry3::identity())
    }

    pub fn new(position: [f64; 3], rotation: UnitQuaternion<f64>) -> Self {
        Self(Isometry3::from_parts(
            Translation3::new(position[0], position[1], position[2]),
            rotation,
        ))
    }

    pub fn position(&self) -> [f64; 3] {
        let t = self.0.translation.vector;
        [t.x, t.y, t.z]
    }

    pub fn rotation(&self) -> UnitQuaternion<f64> {
        self.0.rotation
    }

    /// Pose of a child node given its transform local to `self`.
    pub fn then(&self, local: &Isometry3<f64>) -> Pose {
        Pose(self.0 * local)
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct PoseRepr {
    position: [f64; 3],
    #[serde(default = "identity_orientation")]
    orientation: [f64; 4],
}

fn identity_orientation() -> [f64; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

impl TryFrom<PoseRepr> for Pose {
    type Error = MarkerlayError;

    fn try_from(repr: PoseRepr) -> Result<Self, Self::Error> {
        if repr.position.iter().any(|v| !v.is_finite()) {
            return Err(MarkerlayError::validation("pose position must be finite"));
        }
        let [x, y, z, w] = repr.orientation;
        let rotation = UnitQuaternion::try_new(Quaternion::new(w, x, y, z), 1e-12)
            .ok_or_else(|| MarkerlayError::validation("pose orientation must be non-zero"))?;
        Ok(Pose::new(repr.position, rotation))
    }
}

impl From<Pose> for PoseRepr {
    fn from(pose: Pose) -> Self {
        let q = pose.rotation();
        PoseRepr {
            position: pose.position(),
            orientation: [q.i, q.j, q.k, q.w],
        }
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32, // must be > 0
}

impl Fps {
    pub fn new(num: u32, den: u32) -> MarkerlayResult<Self> {
        if den == 0 {
            return Err(MarkerlayError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(MarkerlayError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * self.frame_duration_secs()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
