use lightcache_gpu::prelude::*;

#[spirv(compute(threads(8, 8)))]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] globals: &Globals,
    #[spirv(descriptor_set = 0, binding = 1)] gbuffer_d0: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 2)] gbuffer_d1: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 3)] gbuffer_d2: TexRgba32,
    #[spirv(descriptor_set = 1, binding = 0, storage_buffer)]
    addresses: &[u32],
    #[spirv(descriptor_set = 1, binding = 1, storage_buffer)]
    entries: &[CacheEntry],
    #[spirv(descriptor_set = 1, binding = 2)] atlas: TexSampled,
    #[spirv(descriptor_set = 1, binding = 3)] atlas_sampler: &Sampler,
    #[spirv(descriptor_set = 1, binding = 4)] colors: TexRgba16,
) {
    let screen_pos = global_id.xy();

    if !globals.contains(screen_pos) {
        return;
    }

    let gbuffer = GBufferEntry::unpack([
        gbuffer_d0.read(screen_pos),
        gbuffer_d1.read(screen_pos),
        gbuffer_d2.read(screen_pos),
    ]);

    let indirect = apply(
        gbuffer,
        globals,
        |address| unsafe { *addresses.index_unchecked(address as usize) },
        |index| unsafe { *entries.index_unchecked(index.get() as usize) },
        |texel, level| {
            let size = globals.atlas.size_at(level) as f32;
            let uv = (texel.as_vec2() + 0.5) / size;

            atlas.sample_by_lod(*atlas_sampler, uv, level as f32)
        },
    );

    let color: Vec4 = colors.read(screen_pos);

    unsafe {
        colors.write(screen_pos, color + indirect.extend(0.0));
    }
}
