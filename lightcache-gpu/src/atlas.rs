use core::f32::consts::PI;

use bytemuck::{Pod, Zeroable};
use glam::{
    ivec2, uvec2, vec2, vec3, IVec2, UVec2, UVec4, Vec2, Vec3, Vec4,
    Vec4Swizzles,
};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{CacheIndex, F32Ext, TexRgba16};

/// Layout of the specular atlas - a square texture split into equally-sized
/// tiles, one per cache (in row-major order), each tile storing radiance
/// arriving at its cache from all directions (in equirectangular mapping).
#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct SpecularAtlas {
    /// x - size of the atlas, in texels (at mip 0)
    /// y - size of a single tile, in texels (at mip 0)
    /// z - number of tiles per row
    /// w - number of mip-levels
    pub data: UVec4,
}

impl SpecularAtlas {
    #[cfg(not(target_arch = "spirv"))]
    pub fn new(size: u32, tile_size: u32) -> Self {
        assert!(tile_size.is_power_of_two());

        Self {
            data: UVec4::new(
                size,
                tile_size,
                size / tile_size,
                tile_size.trailing_zeros() + 1,
            ),
        }
    }

    pub fn size(&self) -> u32 {
        self.data.x
    }

    pub fn tile_size(&self) -> u32 {
        self.data.y
    }

    pub fn tiles_per_row(&self) -> u32 {
        self.data.z
    }

    pub fn mip_count(&self) -> u32 {
        self.data.w
    }

    pub fn size_at(&self, level: u32) -> u32 {
        (self.size() >> level).max(1)
    }

    pub fn tile_size_at(&self, level: u32) -> u32 {
        (self.tile_size() >> level).max(1)
    }

    pub fn tile_origin(&self, index: CacheIndex, level: u32) -> UVec2 {
        let idx = index.get();

        uvec2(idx % self.tiles_per_row(), idx / self.tiles_per_row())
            * self.tile_size_at(level)
    }

    /// Returns index of the cache owning given texel.
    pub fn tile_at(&self, texel: UVec2, level: u32) -> CacheIndex {
        let tile = texel / self.tile_size_at(level);

        CacheIndex::new(tile.y * self.tiles_per_row() + tile.x)
    }

    /// Returns whether given texel belongs to one of the first `count` tiles
    /// (the ones with live caches).
    pub fn is_texel_active(
        &self,
        texel: UVec2,
        level: u32,
        count: u32,
    ) -> bool {
        let size = self.size_at(level);

        texel.x < size
            && texel.y < size
            && self.tile_at(texel, level).get() < count
    }

    /// Mip-level to sample for surface of given roughness; rough surfaces
    /// read the blurrier levels.
    pub fn lod_for_roughness(&self, roughness: f32) -> u32 {
        (roughness.saturate() * (self.mip_count() - 1) as f32).round() as u32
    }

    pub fn direction_to_uv(dir: Vec3) -> Vec2 {
        vec2(
            dir.z.atan2(dir.x) / (2.0 * PI) + 0.5,
            dir.y.clamp(-1.0, 1.0).acos() / PI,
        )
    }

    /// See: [`Self::direction_to_uv()`].
    pub fn uv_to_direction(uv: Vec2) -> Vec3 {
        let phi = (uv.x - 0.5) * 2.0 * PI;
        let theta = uv.y * PI;

        vec3(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin())
    }

    /// Returns texel (within the tile of given cache) that stores radiance
    /// arriving from `dir`.
    pub fn texel_for_direction(
        &self,
        index: CacheIndex,
        dir: Vec3,
        level: u32,
    ) -> UVec2 {
        let tile_size = self.tile_size_at(level);

        let local = (Self::direction_to_uv(dir) * tile_size as f32)
            .floor()
            .as_uvec2()
            .min(UVec2::splat(tile_size - 1));

        self.tile_origin(index, level) + local
    }

    /// Bilinearly samples radiance arriving from `dir`, never leaking into
    /// neighbouring tiles: horizontally the tile wraps around (it's the
    /// azimuth), vertically it's clamped.
    pub fn sample(
        &self,
        index: CacheIndex,
        dir: Vec3,
        level: u32,
        fetch: impl Fn(UVec2, u32) -> Vec4,
    ) -> Vec3 {
        let tile_size = self.tile_size_at(level) as i32;
        let origin = self.tile_origin(index, level).as_ivec2();
        let pos = Self::direction_to_uv(dir) * tile_size as f32 - 0.5;
        let p0 = pos.floor();
        let f = pos - p0;
        let p0 = p0.as_ivec2();

        let texel = |offset: IVec2| {
            let p = p0 + offset;
            let x = ((p.x % tile_size) + tile_size) % tile_size;
            let y = p.y.clamp(0, tile_size - 1);

            fetch((origin + ivec2(x, y)).as_uvec2(), level).xyz()
        };

        let s00 = texel(ivec2(0, 0));
        let s10 = texel(ivec2(1, 0));
        let s01 = texel(ivec2(0, 1));
        let s11 = texel(ivec2(1, 1));

        s00 * (1.0 - f.x) * (1.0 - f.y)
            + s10 * f.x * (1.0 - f.y)
            + s01 * (1.0 - f.x) * f.y
            + s11 * f.x * f.y
    }
}

/// Operations on atlas' texels; rgb keeps radiance, while alpha tells whether
/// the texel is defined (and, at mip 0, how many samples it's averaged from).
pub struct AtlasTexel;

impl AtlasTexel {
    /// Value given to texels that didn't receive any light at any mip-level.
    pub const NEUTRAL: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);

    pub fn is_defined(texel: Vec4) -> bool {
        texel.w > 0.0
    }

    /// Adds another radiance sample into the texel's running average.
    pub fn accumulate(texel: Vec4, radiance: Vec3) -> Vec4 {
        let count = texel.w.max(0.0);
        let sum = texel.xyz() * count + radiance;

        (sum / (count + 1.0)).extend(count + 1.0)
    }

    /// Averages defined children into their parent.
    pub fn downsample(children: [Vec4; 4]) -> Vec4 {
        let mut sum = Vec3::ZERO;
        let mut count = 0.0;
        let mut i = 0;

        while i < 4 {
            if Self::is_defined(children[i]) {
                sum += children[i].xyz();
                count += 1.0;
            }

            i += 1;
        }

        if count > 0.0 {
            (sum / count).extend(1.0)
        } else {
            Vec4::ZERO
        }
    }

    /// Fills hole at a finer level using its (already filled) parent.
    pub fn fill(texel: Vec4, parent: Vec4) -> Vec4 {
        if Self::is_defined(texel) {
            texel
        } else {
            parent.xyz().extend(1.0)
        }
    }

    /// Seeds hole at the coarsest filled level.
    pub fn seed(texel: Vec4) -> Vec4 {
        if Self::is_defined(texel) {
            texel
        } else {
            Self::NEUTRAL
        }
    }
}

/// Read-write access to a single mip-level of the atlas.
pub trait AtlasImage {
    fn load(&self, texel: UVec2) -> Vec4;
    fn store(&mut self, texel: UVec2, val: Vec4);
}

/// Atlas' mip-level bound as a storage image.
pub struct AtlasStorage<'a> {
    tex: TexRgba16<'a>,
}

impl<'a> AtlasStorage<'a> {
    pub fn new(tex: TexRgba16<'a>) -> Self {
        Self { tex }
    }
}

impl AtlasImage for AtlasStorage<'_> {
    fn load(&self, texel: UVec2) -> Vec4 {
        self.tex.read(texel)
    }

    fn store(&mut self, texel: UVec2, val: Vec4) {
        unsafe {
            self.tex.write(texel, val);
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const EPSILON: f32 = 0.0001;

    fn atlas() -> SpecularAtlas {
        SpecularAtlas::new(64, 16)
    }

    #[test]
    fn layout() {
        let atlas = atlas();

        assert_eq!(4, atlas.tiles_per_row());
        assert_eq!(5, atlas.mip_count());
        assert_eq!(1, atlas.tile_size_at(4));
        assert_eq!(4, atlas.size_at(4));

        assert_eq!(uvec2(0, 0), atlas.tile_origin(CacheIndex::new(0), 0));
        assert_eq!(uvec2(48, 0), atlas.tile_origin(CacheIndex::new(3), 0));
        assert_eq!(uvec2(16, 16), atlas.tile_origin(CacheIndex::new(5), 0));
        assert_eq!(uvec2(8, 8), atlas.tile_origin(CacheIndex::new(5), 1));

        assert_eq!(5, atlas.tile_at(uvec2(31, 20), 0).get());
        assert_eq!(5, atlas.tile_at(uvec2(1, 1), 4).get());
    }

    #[test]
    fn active_texels() {
        let atlas = atlas();

        assert!(atlas.is_texel_active(uvec2(15, 15), 0, 1));
        assert!(!atlas.is_texel_active(uvec2(16, 0), 0, 1));
        assert!(atlas.is_texel_active(uvec2(16, 0), 0, 2));
        assert!(!atlas.is_texel_active(uvec2(64, 0), 0, 16));
    }

    #[test]
    fn directions() {
        for dir in [
            Vec3::X,
            Vec3::NEG_Z,
            vec3(0.3, 0.4, -0.5).normalize(),
            vec3(-0.8, -0.1, 0.2).normalize(),
        ] {
            let uv = SpecularAtlas::direction_to_uv(dir);
            let actual = SpecularAtlas::uv_to_direction(uv);

            assert_relative_eq!(actual.x, dir.x, epsilon = EPSILON);
            assert_relative_eq!(actual.y, dir.y, epsilon = EPSILON);
            assert_relative_eq!(actual.z, dir.z, epsilon = EPSILON);
        }
    }

    #[test]
    fn texels_stay_within_tile() {
        let atlas = atlas();
        let index = CacheIndex::new(6);
        let origin = atlas.tile_origin(index, 0);

        for dir in [Vec3::Y, Vec3::NEG_Y, Vec3::NEG_X, Vec3::X, Vec3::Z] {
            let texel = atlas.texel_for_direction(index, dir, 0);

            assert!(texel.cmpge(origin).all());
            assert!(texel.cmplt(origin + 16).all());
            assert_eq!(index, atlas.tile_at(texel, 0));
        }
    }

    #[test]
    fn sample_doesnt_leak() {
        let atlas = atlas();
        let index = CacheIndex::new(5);

        // Our tile is uniformly lit, while all the other ones are bright red
        let fetch = |texel: UVec2, level: u32| {
            if atlas.tile_at(texel, level) == index {
                vec3(0.5, 0.5, 0.5).extend(1.0)
            } else {
                vec3(100.0, 0.0, 0.0).extend(1.0)
            }
        };

        for level in 0..atlas.mip_count() {
            for dir in [Vec3::Y, Vec3::NEG_Y, Vec3::NEG_X, Vec3::X] {
                let color = atlas.sample(index, dir, level, fetch);

                assert_relative_eq!(color.x, 0.5, epsilon = EPSILON);
            }
        }
    }

    #[test]
    fn lod_for_roughness() {
        let atlas = atlas();

        assert_eq!(0, atlas.lod_for_roughness(0.0));
        assert_eq!(2, atlas.lod_for_roughness(0.5));
        assert_eq!(4, atlas.lod_for_roughness(1.0));
        assert_eq!(4, atlas.lod_for_roughness(7.0));
    }

    #[test]
    fn texels() {
        let texel = AtlasTexel::accumulate(Vec4::ZERO, Vec3::splat(2.0));
        let texel = AtlasTexel::accumulate(texel, Vec3::splat(4.0));

        assert_relative_eq!(texel.x, 3.0);
        assert_relative_eq!(texel.w, 2.0);

        let parent = AtlasTexel::downsample([
            Vec4::ZERO,
            vec3(1.0, 1.0, 1.0).extend(1.0),
            Vec4::ZERO,
            vec3(3.0, 3.0, 3.0).extend(5.0),
        ]);

        assert_eq!(vec3(2.0, 2.0, 2.0).extend(1.0), parent);
        assert_eq!(Vec4::ZERO, AtlasTexel::downsample([Vec4::ZERO; 4]));

        assert_eq!(parent, AtlasTexel::fill(Vec4::ZERO, parent));
        assert_eq!(texel, AtlasTexel::fill(texel, parent));
        assert_eq!(AtlasTexel::NEUTRAL, AtlasTexel::seed(Vec4::ZERO));
    }
}
