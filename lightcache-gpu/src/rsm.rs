use bytemuck::{Pod, Zeroable};
use glam::{vec2, Mat4, UVec2, Vec3, Vec4, Vec4Swizzles};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::F32Ext;

/// Spot-light whose reflective shadow map (RSM) is used as the source of
/// virtual point lights (VPLs) for indirect lighting.
///
/// RSMs are expected to store, per texel, the flux reflected by the surface
/// seen through that texel, the linear distance from the light to that
/// surface (zero for texels that see nothing) and the surface's normal.
#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct SpotLight {
    /// x, y, z - position
    /// w - world-space area covered by a single read texel at distance 1.0
    pub d0: Vec4,

    /// x, y, z - direction
    /// w - layer of the RSM texture arrays (as u32)
    pub d1: Vec4,

    /// x - read resolution, i.e. RSM's resolution at `read_lod` (as u32)
    /// y - RSM's mip-level used for reading (as u32)
    /// z - mip-level that sets the size of indirect-shadow blocks (as u32)
    /// w - unused
    pub d2: Vec4,

    pub inverse_view_projection: Mat4,
}

impl SpotLight {
    pub fn position(&self) -> Vec3 {
        self.d0.xyz()
    }

    pub fn area_factor(&self) -> f32 {
        self.d0.w
    }

    pub fn direction(&self) -> Vec3 {
        self.d1.xyz()
    }

    pub fn layer(&self) -> u32 {
        self.d1.w.to_bits()
    }

    pub fn read_resolution(&self) -> u32 {
        self.d2.x.to_bits()
    }

    pub fn read_lod(&self) -> u32 {
        self.d2.y.to_bits()
    }

    pub fn shadow_block_lod(&self) -> u32 {
        self.d2.z.to_bits()
    }

    /// Size (in read texels) of the square blocks of VPLs that share a
    /// single visibility trace.
    pub fn shadow_block_size(&self) -> u32 {
        (1 << self.shadow_block_lod()).min(self.read_resolution())
    }

    /// Lights with zero read resolution contribute nothing; they are used to
    /// run the lighting pass when the scene has no lights at all.
    pub fn is_some(&self) -> bool {
        self.read_resolution() > 0
    }

    /// World-space area seen by a single read texel at distance 1.0:
    ///
    /// `(2 * sin(half_angle) * near)^2 / (near^2 * read_resolution^2)`
    pub fn eval_area_factor(
        half_angle: f32,
        near: f32,
        read_resolution: u32,
    ) -> f32 {
        (2.0 * half_angle.sin() * near).sqr()
            / (near.sqr() * (read_resolution as f32).sqr())
    }

    /// Direction from the light through the center of given read texel.
    pub fn texel_direction(&self, texel: UVec2) -> Vec3 {
        let uv = (texel.as_vec2() + 0.5) / self.read_resolution() as f32;
        let ndc = vec2(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0);

        let near = self
            .inverse_view_projection
            .project_point3(ndc.extend(0.0));

        let far = self
            .inverse_view_projection
            .project_point3(ndc.extend(1.0));

        let dir = (far - near).normalize();

        // Support both regular and reversed depth
        if dir.dot(self.direction()) < 0.0 {
            -dir
        } else {
            dir
        }
    }

    pub fn vpl(&self, texel: UVec2, rsm: RsmTexel) -> Vpl {
        Vpl {
            position: self.position() + self.texel_direction(texel) * rsm.depth,
            normal: rsm.normal,
            flux: rsm.flux * self.area_factor() * rsm.depth.sqr(),
        }
    }
}

#[derive(Clone, Copy, Default)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct RsmTexel {
    pub flux: Vec3,
    pub depth: f32,
    pub normal: Vec3,
}

impl RsmTexel {
    pub fn is_some(&self) -> bool {
        self.depth > 0.0
    }
}

/// Virtual point light, i.e. a patch of lit surface re-emitting light.
#[derive(Clone, Copy, Default)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct Vpl {
    pub position: Vec3,
    pub normal: Vec3,

    /// Flux reflected by the entire patch (already scaled by its area)
    pub flux: Vec3,
}

impl Vpl {
    /// Returns direction from `point` towards this VPL and the radiance
    /// arriving at `point` from there.
    ///
    /// `min_distance` clamps the inverse-square falloff, so that VPLs lying
    /// right next to the point don't blow up.
    pub fn eval(&self, point: Vec3, min_distance: f32) -> (Vec3, Vec3) {
        let delta = self.position - point;
        let distance_sq = delta.length_squared();

        if distance_sq <= 0.0 {
            return (Vec3::ZERO, Vec3::ZERO);
        }

        let dir = delta / distance_sq.sqrt();
        let cos_emit = self.normal.dot(-dir).max(0.0);

        let radiance =
            self.flux * cos_emit / distance_sq.max(min_distance.sqr());

        (dir, radiance)
    }
}

#[cfg(test)]
mod tests {
    use core::f32::consts::PI;

    use approx::assert_relative_eq;
    use glam::{uvec2, vec3};

    use super::*;

    const EPSILON: f32 = 0.001;

    fn light() -> SpotLight {
        let position = vec3(0.0, 5.0, 0.0);
        let half_angle = PI / 4.0;

        let view = Mat4::look_at_rh(position, Vec3::ZERO, Vec3::Z);
        let proj = Mat4::perspective_rh(2.0 * half_angle, 1.0, 0.1, 50.0);

        SpotLight {
            d0: position
                .extend(SpotLight::eval_area_factor(half_angle, 0.1, 16)),
            d1: Vec3::NEG_Y.extend(f32::from_bits(0)),
            d2: Vec4::new(
                f32::from_bits(16),
                f32::from_bits(2),
                f32::from_bits(1),
                0.0,
            ),
            inverse_view_projection: (proj * view).inverse(),
        }
    }

    #[test]
    fn texel_direction() {
        let light = light();

        // Texels around the center look (almost) straight down...
        let dir = light.texel_direction(uvec2(8, 8));

        assert!(dir.dot(Vec3::NEG_Y) > 0.99);

        // ... while the corner ones are tilted by the light's half-angle
        let dir = light.texel_direction(uvec2(0, 0));

        assert!(dir.dot(Vec3::NEG_Y) < 0.8);
        assert!(dir.y < 0.0);
    }

    #[test]
    fn vpl() {
        let light = light();

        let vpl = light.vpl(
            uvec2(8, 8),
            RsmTexel {
                flux: Vec3::ONE,
                depth: 5.0,
                normal: Vec3::Y,
            },
        );

        assert_relative_eq!(vpl.position.y, 0.0, epsilon = 0.1);

        assert_relative_eq!(
            vpl.flux.x,
            light.area_factor() * 25.0,
            epsilon = EPSILON
        );
    }

    #[test]
    fn vpl_eval() {
        let vpl = Vpl {
            position: Vec3::ZERO,
            normal: Vec3::Y,
            flux: Vec3::splat(4.0),
        };

        // Point straight above the VPL
        let (dir, radiance) = vpl.eval(vec3(0.0, 2.0, 0.0), 0.1);

        assert_relative_eq!(dir.y, -1.0, epsilon = EPSILON);
        assert_relative_eq!(radiance.x, 1.0, epsilon = EPSILON);

        // Point behind the VPL
        let (_, radiance) = vpl.eval(vec3(0.0, -2.0, 0.0), 0.1);

        assert_eq!(Vec3::ZERO, radiance);

        // Point right next to the VPL
        let (_, radiance) = vpl.eval(vec3(0.0, 0.01, 0.0), 0.5);

        assert_relative_eq!(radiance.x, 16.0, epsilon = EPSILON);
    }

    #[test]
    fn shadow_blocks() {
        let mut light = light();

        assert_eq!(2, light.shadow_block_size());

        light.d2.z = f32::from_bits(10);

        assert_eq!(16, light.shadow_block_size());
    }
}
