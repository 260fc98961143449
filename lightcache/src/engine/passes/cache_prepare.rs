use glam::UVec3;

use crate::{
    gpu, CacheBuffers, ComputePass, Engine, LightCacheConfig, Shaders,
};

#[derive(Debug)]
pub struct CachePreparePass {
    pass: ComputePass<gpu::CachePreparePassParams>,
}

impl CachePreparePass {
    pub fn new(
        device: &wgpu::Device,
        shaders: &Shaders,
        _: &LightCacheConfig,
        buffers: &CacheBuffers,
    ) -> Self {
        let pass = ComputePass::builder("cache_prepare")
            .bind([
                &buffers.globals,
                &buffers.counter.bind_writable(),
                &buffers.debug_draw.bind_writable(),
            ])
            .build(device, &shaders.cache_prepare);

        Self { pass }
    }

    pub fn run(&self, engine: &Engine, encoder: &mut wgpu::CommandEncoder) {
        let params = gpu::CachePreparePassParams {
            debug_index_count: engine.config().debug_index_count(),
        };

        self.pass.run(encoder, UVec3::ONE, params);
    }
}
