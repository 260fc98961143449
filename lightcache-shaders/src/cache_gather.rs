use lightcache_gpu::prelude::*;

#[spirv(compute(threads(8, 8)))]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] globals: &Globals,
    #[spirv(descriptor_set = 0, binding = 1)] gbuffer_d0: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 2)] gbuffer_d1: TexRgba32,
    #[spirv(descriptor_set = 1, binding = 0, storage_buffer)]
    mut counter: &mut [u32],
    #[spirv(descriptor_set = 1, binding = 1, storage_buffer)]
    mut addresses: &mut [u32],
    #[spirv(descriptor_set = 1, binding = 2, storage_buffer)]
    mut headers: &mut [u32],
) {
    let screen_pos = global_id.xy();

    if !globals.contains(screen_pos) {
        return;
    }

    let gbuffer = GBufferEntry::unpack([
        gbuffer_d0.read(screen_pos),
        gbuffer_d1.read(screen_pos),
        Vec4::ZERO,
    ]);

    gather(
        gbuffer,
        globals,
        &mut addresses,
        &mut counter,
        &mut headers,
    );
}
