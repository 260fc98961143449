use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4, Vec4Swizzles};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::F32Ext;

/// Cube-shaped volume enclosing the scene, voxelized into an occupancy
/// texture (with mip-maps) that the lighting pass cone-traces through.
#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct VoxelVolume {
    /// x, y, z - minimum corner
    /// w - voxel size
    pub d0: Vec4,

    /// x, y, z - maximum corner
    /// w - resolution (as u32)
    pub d1: Vec4,
}

impl VoxelVolume {
    /// Aperture of the visibility cones, as tangent of their half-angle.
    pub const CONE_APERTURE: f32 = 0.2;

    pub const MAX_STEPS: u32 = 64;

    /// Padding around the scene's bounding box, so that geometry lying
    /// exactly on its faces still gets voxelized.
    pub const PADDING: f32 = 0.001;

    /// Builds volume enclosing given bounding box, extended into a cube.
    #[cfg(not(target_arch = "spirv"))]
    pub fn new(min: Vec3, max: Vec3, resolution: u32) -> Self {
        let min = min - Self::PADDING;
        let max = max + Self::PADDING;
        let size = (max - min).max_element();
        let center = (min + max) * 0.5;

        Self {
            d0: (center - size * 0.5).extend(size / resolution as f32),
            d1: (center + size * 0.5).extend(f32::from_bits(resolution)),
        }
    }

    pub fn min(&self) -> Vec3 {
        self.d0.xyz()
    }

    pub fn max(&self) -> Vec3 {
        self.d1.xyz()
    }

    pub fn voxel_size(&self) -> f32 {
        self.d0.w
    }

    pub fn resolution(&self) -> u32 {
        self.d1.w.to_bits()
    }

    pub fn is_some(&self) -> bool {
        self.resolution() > 0
    }

    /// Maps world-space position into the occupancy texture's coordinates.
    pub fn uvw(&self, pos: Vec3) -> Vec3 {
        (pos - self.min()) / (self.max() - self.min())
    }

    /// Estimates how much light leaving `to` reaches `from` by marching a
    /// narrow cone through the occupancy mip-chain.
    ///
    /// `occupancy` gets the texture coordinates and the mip-level to sample
    /// and should return the (filtered) occupancy, from 0.0 to 1.0.
    pub fn trace_visibility(
        &self,
        from: Vec3,
        to: Vec3,
        occupancy: impl Fn(Vec3, f32) -> f32,
    ) -> f32 {
        if !self.is_some() {
            return 1.0;
        }

        let voxel_size = self.voxel_size();
        let delta = to - from;
        let distance = delta.length();

        // Stop one voxel short of the target, so that the surface we're
        // tracing towards doesn't occlude itself
        let end = distance - voxel_size;

        if end <= voxel_size {
            return 1.0;
        }

        let dir = delta / distance;
        let mut visibility = 1.0;
        let mut t = voxel_size;
        let mut step = 0;

        while t < end && step < Self::MAX_STEPS {
            let radius = (t * Self::CONE_APERTURE).max(voxel_size * 0.5);
            let lod = (2.0 * radius / voxel_size).max(1.0).log2();
            let occ = occupancy(self.uvw(from + dir * t), lod).saturate();

            visibility *= 1.0 - occ;

            if visibility < 0.01 {
                return 0.0;
            }

            t += radius;
            step += 1;
        }

        visibility
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::vec3;

    use super::*;

    const EPSILON: f32 = 0.0001;

    #[test]
    fn new() {
        let volume =
            VoxelVolume::new(vec3(-1.0, 0.0, 2.0), vec3(3.0, 1.0, 4.0), 128);

        let size = volume.max() - volume.min();
        let center = (volume.min() + volume.max()) * 0.5;

        assert_relative_eq!(size.x, 4.002, epsilon = EPSILON);
        assert_relative_eq!(size.y, 4.002, epsilon = EPSILON);
        assert_relative_eq!(size.z, 4.002, epsilon = EPSILON);
        assert_relative_eq!(center.y, 0.5, epsilon = EPSILON);
        assert_relative_eq!(
            volume.voxel_size(),
            4.002 / 128.0,
            epsilon = EPSILON
        );
        assert_eq!(128, volume.resolution());
    }

    #[test]
    fn uvw() {
        let volume = VoxelVolume::new(Vec3::ZERO, Vec3::ONE, 64);
        let uvw = volume.uvw(Vec3::splat(0.5));

        assert_relative_eq!(uvw.x, 0.5, epsilon = EPSILON);
        assert_relative_eq!(uvw.z, 0.5, epsilon = EPSILON);
    }

    #[test]
    fn trace_through_empty_space() {
        let volume = VoxelVolume::new(Vec3::ZERO, Vec3::splat(10.0), 64);

        let vis = volume.trace_visibility(
            vec3(1.0, 1.0, 1.0),
            vec3(9.0, 9.0, 9.0),
            |_, _| 0.0,
        );

        assert_eq!(1.0, vis);
    }

    #[test]
    fn trace_through_wall() {
        let volume = VoxelVolume::new(Vec3::ZERO, Vec3::splat(10.0), 64);

        // Solid wall at x = 5
        let wall = |uvw: Vec3, _| {
            if (uvw.x - 0.5).abs() < 0.05 {
                1.0
            } else {
                0.0
            }
        };

        let from = vec3(1.0, 5.0, 5.0);
        let blocked = volume.trace_visibility(from, vec3(9.0, 5.0, 5.0), wall);
        let unblocked =
            volume.trace_visibility(from, vec3(4.0, 5.0, 5.0), wall);

        assert_eq!(0.0, blocked);
        assert_eq!(1.0, unblocked);
    }

    #[test]
    fn missing_volume_is_transparent() {
        let vis = VoxelVolume::default().trace_visibility(
            Vec3::ZERO,
            Vec3::splat(5.0),
            |_, _| 1.0,
        );

        assert_eq!(1.0, vis);
    }
}
