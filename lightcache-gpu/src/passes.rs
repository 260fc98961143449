use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct CachePreparePassParams {
    /// Number of indices of the mesh used to visualize caches
    pub debug_index_count: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct CacheLightingPassParams {
    pub light_id: u32,

    /// Whether this pass adds onto what the previous light left in the caches
    /// (as compared to overwriting them)
    pub accumulate: u32,
}

impl CacheLightingPassParams {
    pub fn accumulate(&self) -> bool {
        self.accumulate > 0
    }
}

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct AtlasPassParams {
    /// Mip-level being written
    pub level: u32,
}
