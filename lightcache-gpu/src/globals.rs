use bytemuck::{Pod, Zeroable};
use glam::{UVec2, UVec4, Vec3, Vec4, Vec4Swizzles};

use crate::{AddressVolume, SpecularAtlas, VoxelVolume};

/// Per-frame state shared by all of the passes.
#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct Globals {
    /// x, y, z - camera position
    /// w - unused
    pub camera: Vec4,

    /// x - viewport width
    /// y - viewport height
    /// z - capacity of the cache table
    /// w - order of spherical harmonics, see: [`crate::ShOrder`]
    pub data: UVec4,

    /// x - feature flags, see: [`Globals::INDIRECT_SHADOW`] etc.
    /// y, z, w - unused
    pub flags: UVec4,

    pub atlas: SpecularAtlas,
    pub voxels: VoxelVolume,
    pub volume: AddressVolume,
}

impl Globals {
    /// Whether VPLs are occlusion-tested against the voxelized scene
    pub const INDIRECT_SHADOW: u32 = 1 << 0;

    /// Whether the specular atlas is filled and applied
    pub const INDIRECT_SPECULAR: u32 = 1 << 1;

    /// Whether the lighting pass writes VPLs straight into the atlas; without
    /// this the atlas holds only neutral values
    pub const SPECULAR_DIRECT_WRITE: u32 = 1 << 2;

    /// Whether the apply pass tints pixels by their cascade
    pub const SHOW_CASCADES: u32 = 1 << 3;

    pub fn camera_position(&self) -> Vec3 {
        self.camera.xyz()
    }

    pub fn viewport_size(&self) -> UVec2 {
        self.data.xy()
    }

    pub fn contains(&self, screen_pos: UVec2) -> bool {
        screen_pos.x < self.data.x && screen_pos.y < self.data.y
    }

    pub fn capacity(&self) -> u32 {
        self.data.z
    }

    pub fn sh_order(&self) -> u32 {
        self.data.w
    }

    pub fn has(&self, flag: u32) -> bool {
        self.flags.x & flag > 0
    }
}
