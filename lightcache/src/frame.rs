use glam::{uvec4, vec4, Mat4, UVec2, Vec3};
use log::warn;

use crate::{gpu, AtlasLayout, LightCacheConfig};

/// Everything that changes from frame to frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameInputs<'a> {
    pub camera_position: Vec3,

    /// Bounding box of the scene, used to place the occupancy volume; `None`
    /// disables indirect shadows
    pub scene_bounds: Option<BoundingBox>,

    /// Lights whose RSMs have been rendered into the consecutive layers of
    /// the RSM textures
    pub lights: &'a [SpotLightDesc],
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        assert!(min.cmple(max).all(), "inverted bounding box");

        Self { min, max }
    }

    pub(crate) fn voxelize(&self, resolution: u32) -> gpu::VoxelVolume {
        gpu::VoxelVolume::new(self.min, self.max, resolution)
    }
}

/// Spot-light, as seen by the renderer of its reflective shadow map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpotLightDesc {
    pub position: Vec3,
    pub direction: Vec3,

    /// Half of the cone's angle, in radians
    pub half_angle: f32,

    pub near: f32,
    pub far: f32,

    /// Mip-level of the RSM that's used to spawn VPLs; each level cuts the
    /// number of VPLs by four
    pub rsm_read_lod: u32,

    /// Mip-level of the RSM whose texels define the blocks of VPLs sharing
    /// a single indirect-shadow trace
    pub shadow_block_lod: u32,
}

impl SpotLightDesc {
    /// Matrix that the RSM of this light has to be rendered with.
    pub fn view_projection(&self) -> Mat4 {
        let dir = self.direction.normalize();

        let up = if dir.y.abs() > 0.99 { Vec3::X } else { Vec3::Y };

        let projection = Mat4::perspective_rh(
            2.0 * self.half_angle,
            1.0,
            self.near,
            self.far,
        );

        projection * Mat4::look_to_rh(self.position, dir, up)
    }

    /// Resolution of the RSM at `rsm_read_lod`.
    pub fn read_resolution(&self, rsm_resolution: u32) -> u32 {
        (rsm_resolution >> self.rsm_read_lod).max(1)
    }

    pub(crate) fn serialize(
        &self,
        layer: u32,
        rsm_resolution: u32,
    ) -> gpu::SpotLight {
        let read_resolution = self.read_resolution(rsm_resolution);

        assert!(
            (1 << self.shadow_block_lod) <= read_resolution,
            "shadow blocks ({}) must not be larger than the RSM ({})",
            1 << self.shadow_block_lod,
            read_resolution
        );

        let area_factor = gpu::SpotLight::eval_area_factor(
            self.half_angle,
            self.near,
            read_resolution,
        );

        gpu::SpotLight {
            d0: self.position.extend(area_factor),
            d1: self.direction.normalize().extend(f32::from_bits(layer)),
            d2: vec4(
                f32::from_bits(read_resolution),
                f32::from_bits(self.rsm_read_lod),
                f32::from_bits(self.shadow_block_lod),
                0.0,
            ),
            inverse_view_projection: self.view_projection().inverse(),
        }
    }
}

/// Returns lights that fit into the RSM textures, dropping (with a warning)
/// the rest.
pub(crate) fn visible_lights<T>(lights: &[T]) -> &[T] {
    if lights.len() > gpu::MAX_LIGHTS {
        warn!(
            "Got {} lights, but only {} are supported; ignoring the rest",
            lights.len(),
            gpu::MAX_LIGHTS
        );

        &lights[..gpu::MAX_LIGHTS]
    } else {
        lights
    }
}

pub(crate) fn serialize_globals(
    config: &LightCacheConfig,
    layout: &AtlasLayout,
    viewport_size: UVec2,
    camera_position: Vec3,
    scene_bounds: Option<BoundingBox>,
) -> gpu::Globals {
    let voxels = scene_bounds
        .map(|bounds| bounds.voxelize(config.voxel_resolution()))
        .unwrap_or_default();

    gpu::Globals {
        camera: camera_position.extend(0.0),
        data: uvec4(
            viewport_size.x,
            viewport_size.y,
            layout.capacity,
            config.sh_order().serialize(),
        ),
        flags: uvec4(config.flags(), 0, 0, 0),
        atlas: layout.serialize(),
        voxels,
        volume: config.address_volume(camera_position),
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use approx::assert_relative_eq;
    use glam::{uvec2, vec3};

    use super::*;

    const EPSILON: f32 = 0.001;

    fn light() -> SpotLightDesc {
        SpotLightDesc {
            position: vec3(1.0, 4.0, 2.0),
            direction: vec3(0.0, -2.0, 0.0),
            half_angle: PI / 4.0,
            near: 0.1,
            far: 50.0,
            rsm_read_lod: 2,
            shadow_block_lod: 1,
        }
    }

    #[test]
    fn serialize() {
        let target = light().serialize(3, 256);

        assert_eq!(vec3(1.0, 4.0, 2.0), target.position());
        assert_eq!(vec3(0.0, -1.0, 0.0), target.direction());
        assert_eq!(3, target.layer());
        assert_eq!(64, target.read_resolution());
        assert_eq!(2, target.read_lod());
        assert_eq!(2, target.shadow_block_size());

        // (2 * sin(45deg))^2 / 64^2
        assert_relative_eq!(
            2.0 / 4096.0,
            target.area_factor(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn texel_directions() {
        // 64 >> rsm_read_lod = 16 read texels per side
        let target = light().serialize(0, 64);

        assert_eq!(16, target.read_resolution());

        // Two texels straddling the center of the map point (on average)
        // straight along the light
        let center = (target.texel_direction(uvec2(8, 8))
            + target.texel_direction(uvec2(7, 7)))
        .normalize();

        assert_relative_eq!(0.0, center.x, epsilon = EPSILON);
        assert_relative_eq!(-1.0, center.y, epsilon = EPSILON);
        assert_relative_eq!(0.0, center.z, epsilon = EPSILON);

        // Texels at the map's edge point along the cone's side
        let edge = target.texel_direction(uvec2(0, 7))
            + target.texel_direction(uvec2(0, 8));

        let angle = edge.normalize().dot(vec3(0.0, -1.0, 0.0)).acos();

        assert!(angle > PI / 8.0 && angle < PI / 4.0 + EPSILON);
    }

    #[test]
    #[should_panic(expected = "shadow blocks")]
    fn oversized_shadow_blocks() {
        let light = SpotLightDesc {
            shadow_block_lod: 4,
            ..light()
        };

        light.serialize(0, 32);
    }

    #[test]
    fn visible_lights_are_truncated() {
        let lights = [light(); gpu::MAX_LIGHTS + 2];

        assert_eq!(gpu::MAX_LIGHTS, visible_lights(&lights).len());
        assert_eq!(1, visible_lights(&lights[..1]).len());
    }

    #[test]
    fn globals() {
        let config = LightCacheConfig::default();
        let layout = AtlasLayout::new(&config);

        let globals = serialize_globals(
            &config,
            &layout,
            uvec2(640, 480),
            vec3(1.0, 2.0, 3.0),
            None,
        );

        assert_eq!(uvec2(640, 480), globals.viewport_size());
        assert_eq!(vec3(1.0, 2.0, 3.0), globals.camera_position());
        assert_eq!(16384, globals.capacity());
        assert_eq!(3, globals.volume.len());
        assert!(globals.has(gpu::Globals::INDIRECT_SHADOW));
        assert!(!globals.has(gpu::Globals::INDIRECT_SPECULAR));
        assert!(!globals.voxels.is_some());
    }
}
