use lightcache_gpu::prelude::*;

#[spirv(compute(threads(8, 8)))]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(push_constant)] params: &AtlasPassParams,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] globals: &Globals,
    #[spirv(descriptor_set = 0, binding = 1, storage_buffer)] counter: &[u32],
    #[spirv(descriptor_set = 0, binding = 2)] parent: TexRgba16,
    #[spirv(descriptor_set = 0, binding = 3)] target: TexRgba16,
) {
    let texel = global_id.xy();
    let count =
        unsafe { *counter.index_unchecked(CacheCounter::COUNT as usize) };

    if !globals.atlas.is_texel_active(texel, params.level, count) {
        return;
    }

    let val = AtlasTexel::fill(target.read(texel), parent.read(texel / 2));

    unsafe {
        target.write(texel, val);
    }
}
