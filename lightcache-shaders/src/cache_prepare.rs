use lightcache_gpu::prelude::*;

#[spirv(compute(threads(1)))]
pub fn main(
    #[spirv(push_constant)] params: &CachePreparePassParams,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] globals: &Globals,
    #[spirv(descriptor_set = 0, binding = 1, storage_buffer)]
    counter: &mut [u32],
    #[spirv(descriptor_set = 0, binding = 2, storage_buffer)]
    debug_draw: &mut [u32],
) {
    let count =
        unsafe { *counter.index_unchecked(CacheCounter::COUNT as usize) };

    let (groups, draw) =
        prepare_dispatch(count, globals.capacity(), params.debug_index_count);

    unsafe {
        *counter.index_unchecked_mut(0) = groups.x;
        *counter.index_unchecked_mut(1) = groups.y;
        *counter.index_unchecked_mut(2) = groups.z;

        *debug_draw.index_unchecked_mut(0) = draw.index_count;
        *debug_draw.index_unchecked_mut(1) = draw.instance_count;
        *debug_draw.index_unchecked_mut(2) = draw.first_index;
        *debug_draw.index_unchecked_mut(3) = draw.base_vertex as u32;
        *debug_draw.index_unchecked_mut(4) = draw.first_instance;
    }
}
