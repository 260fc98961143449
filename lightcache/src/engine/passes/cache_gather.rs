use crate::{CacheBuffers, ComputePass, Engine, LightCacheConfig, Shaders};

#[derive(Debug)]
pub struct CacheGatherPass {
    pass: ComputePass,
}

impl CacheGatherPass {
    pub fn new(
        device: &wgpu::Device,
        shaders: &Shaders,
        _: &LightCacheConfig,
        buffers: &CacheBuffers,
    ) -> Self {
        let pass = ComputePass::builder("cache_gather")
            .bind([
                &buffers.globals,
                &buffers.gbuffer_d0.bind_storage(),
                &buffers.gbuffer_d1.bind_storage(),
            ])
            .bind([
                &buffers.counter.bind_writable(),
                &buffers.addresses.bind_writable(),
                &buffers.headers.bind_writable(),
            ])
            .build(device, &shaders.cache_gather);

        Self { pass }
    }

    pub fn run(&self, engine: &Engine, encoder: &mut wgpu::CommandEncoder) {
        // This pass uses 8x8 warps:
        let size = (engine.viewport_size() + 7) / 8;

        self.pass.run(encoder, size.extend(1), ());
    }
}
