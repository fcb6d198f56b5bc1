use std::f64::consts::FRAC_PI_2;

use nalgebra::Point3;

use crate::foundation::core::{
    Isometry3, MarkerDescriptor, Pose, Size, Translation3, UnitQuaternion, Vector3,
};

/// Rotation about local X that lays a plane flat on its marker.
///
/// Plane geometry is authored upright in its local XY plane while marker anchors treat the
/// image as lying in their XZ plane.
pub const PLANE_TILT_RAD: f64 = -FRAC_PI_2;

pub fn plane_orientation() -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PLANE_TILT_RAD)
}

/// Flat rectangle in its local XY plane, centred on the origin. Units are metres.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct PlaneGeometry {
    pub width: f64,
    pub height: f64,
}

impl PlaneGeometry {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// A plane attached to a marker anchor: geometry plus its transform local to the anchor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaneNode {
    pub geometry: PlaneGeometry,
    pub local: Isometry3<f64>,
    pub opacity: f64,
}

/// Plane sized exactly to the printed marker and tilted flat onto it.
pub fn build_plane(descriptor: &MarkerDescriptor) -> PlaneNode {
    let size = descriptor.physical_size.to_size();
    PlaneNode {
        geometry: PlaneGeometry {
            width: size.width,
            height: size.height,
        },
        local: Isometry3::from_parts(Translation3::identity(), plane_orientation()),
        opacity: 1.0,
    }
}

impl PlaneNode {
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn world_pose(&self, anchor: &Pose) -> Pose {
        anchor.then(&self.local)
    }

    /// Face normal in world space.
    pub fn normal(&self, anchor: &Pose) -> Vector3<f64> {
        self.world_pose(anchor).0.rotation * Vector3::z()
    }

    /// World-space corners, counter-clockwise from bottom-left in plane space.
    pub fn corners(&self, anchor: &Pose) -> [Point3<f64>; 4] {
        let world = self.world_pose(anchor).0;
        let (hw, hh) = (self.geometry.width / 2.0, self.geometry.height / 2.0);
        [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)].map(|(x, y)| world * Point3::new(x, y, 0.0))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/plane.rs"]
mod tests;
