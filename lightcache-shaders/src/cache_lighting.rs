use lightcache_gpu::prelude::*;

#[spirv(compute(threads(64)))]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(push_constant)] params: &CacheLightingPassParams,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] globals: &Globals,
    #[spirv(descriptor_set = 0, binding = 1, storage_buffer)]
    lights: &[SpotLight],
    #[spirv(descriptor_set = 0, binding = 2, storage_buffer)] counter: &[u32],
    #[spirv(descriptor_set = 0, binding = 3, storage_buffer)] headers: &[u32],
    #[spirv(descriptor_set = 0, binding = 4, storage_buffer)]
    entries: &mut [CacheEntry],
    #[spirv(descriptor_set = 1, binding = 0)] rsm_flux: TexArray,
    #[spirv(descriptor_set = 1, binding = 1)] rsm_flux_sampler: &Sampler,
    #[spirv(descriptor_set = 1, binding = 2)] rsm_depth: TexArray,
    #[spirv(descriptor_set = 1, binding = 3)] rsm_depth_sampler: &Sampler,
    #[spirv(descriptor_set = 1, binding = 4)] rsm_normal: TexArray,
    #[spirv(descriptor_set = 1, binding = 5)] rsm_normal_sampler: &Sampler,
    #[spirv(descriptor_set = 1, binding = 6)] voxels: Tex3d,
    #[spirv(descriptor_set = 1, binding = 7)] voxels_sampler: &Sampler,
    #[spirv(descriptor_set = 1, binding = 8)] atlas: TexRgba16,
) {
    let index = global_id.x;

    let count =
        unsafe { *counter.index_unchecked(CacheCounter::COUNT as usize) }
            .min(globals.capacity());

    if index >= count {
        return;
    }

    let index = CacheIndex::new(index);
    let light = unsafe { *lights.index_unchecked(params.light_id as usize) };
    let header = CacheHeader::read(headers, index);
    let prev = unsafe { *entries.index_unchecked(index.get() as usize) };

    let rsm = |texel: UVec2| {
        let uv = (texel.as_vec2() + 0.5) / light.read_resolution() as f32;
        let uv = uv.extend(light.layer() as f32);
        let lod = light.read_lod() as f32;

        let flux: Vec4 = rsm_flux.sample_by_lod(*rsm_flux_sampler, uv, lod);
        let depth: Vec4 = rsm_depth.sample_by_lod(*rsm_depth_sampler, uv, lod);

        let normal: Vec4 =
            rsm_normal.sample_by_lod(*rsm_normal_sampler, uv, lod);

        RsmTexel {
            flux: flux.xyz(),
            depth: depth.x,
            normal: normal.xyz(),
        }
    };

    let occupancy = |uvw: Vec3, lod: f32| {
        let occ: Vec4 = voxels.sample_by_lod(*voxels_sampler, uvw, lod);

        occ.x
    };

    let entry = light_cache(
        index,
        header,
        prev,
        params.accumulate(),
        globals,
        &light,
        rsm,
        occupancy,
        &mut AtlasStorage::new(atlas),
    );

    unsafe {
        *entries.index_unchecked_mut(index.get() as usize) = entry;
    }
}
