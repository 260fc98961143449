use derivative::Derivative;
use glam::{uvec2, UVec2, Vec3};

use crate::{gpu, SpotLightDesc};

/// Reflective shadow map kept in memory.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct SoftwareRsm {
    resolution: u32,

    #[derivative(Debug = "ignore")]
    texels: Vec<gpu::RsmTexel>,
}

impl SoftwareRsm {
    pub fn new(resolution: u32, texels: Vec<gpu::RsmTexel>) -> Self {
        assert!(resolution.is_power_of_two());
        assert_eq!((resolution * resolution) as usize, texels.len());

        Self { resolution, texels }
    }

    /// Renders RSM of given light by casting a ray through each texel.
    ///
    /// `cast` gets the ray's origin and direction and should return what the
    /// ray hits (with `depth` being the distance along the ray), or a default
    /// texel if it hits nothing.
    pub fn render(
        light: &SpotLightDesc,
        resolution: u32,
        cast: impl Fn(Vec3, Vec3) -> gpu::RsmTexel,
    ) -> Self {
        let full_res = SpotLightDesc {
            rsm_read_lod: 0,
            shadow_block_lod: 0,
            ..*light
        }
        .serialize(0, resolution);

        let texels = (0..resolution)
            .flat_map(|y| (0..resolution).map(move |x| uvec2(x, y)))
            .map(|texel| {
                cast(light.position, full_res.texel_direction(texel))
            })
            .collect();

        Self::new(resolution, texels)
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Reads texel at given mip-level; instead of averaging, coarser levels
    /// pick the texel closest to their footprint's center.
    pub fn read(&self, texel: UVec2, lod: u32) -> gpu::RsmTexel {
        let scale = 1 << lod;

        let texel = (texel * scale + scale / 2)
            .min(UVec2::splat(self.resolution - 1));

        self.texels[(texel.y * self.resolution + texel.x) as usize]
    }
}
