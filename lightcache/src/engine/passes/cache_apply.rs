use crate::{CacheBuffers, ComputePass, Engine, LightCacheConfig, Shaders};

#[derive(Debug)]
pub struct CacheApplyPass {
    pass: ComputePass,
}

impl CacheApplyPass {
    pub fn new(
        device: &wgpu::Device,
        shaders: &Shaders,
        _: &LightCacheConfig,
        buffers: &CacheBuffers,
    ) -> Self {
        let pass = ComputePass::builder("cache_apply")
            .bind([
                &buffers.globals,
                &buffers.gbuffer_d0.bind_storage(),
                &buffers.gbuffer_d1.bind_storage(),
                &buffers.gbuffer_d2.bind_storage(),
            ])
            .bind([
                &buffers.addresses.bind_readable(),
                &buffers.entries.bind_readable(),
                &buffers.atlas.bind_sampled(),
                &buffers.colors.bind_storage(),
            ])
            .build(device, &shaders.cache_apply);

        Self { pass }
    }

    pub fn run(&self, engine: &Engine, encoder: &mut wgpu::CommandEncoder) {
        // This pass uses 8x8 warps:
        let size = (engine.viewport_size() + 7) / 8;

        self.pass.run(encoder, size.extend(1), ());
    }
}
