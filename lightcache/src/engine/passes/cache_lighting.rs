use crate::{
    gpu, CacheBuffers, ComputePass, Engine, LightCacheConfig, Shaders,
};

#[derive(Debug)]
pub struct CacheLightingPass {
    pass: ComputePass<gpu::CacheLightingPassParams>,
}

impl CacheLightingPass {
    pub fn new(
        device: &wgpu::Device,
        shaders: &Shaders,
        _: &LightCacheConfig,
        buffers: &CacheBuffers,
    ) -> Self {
        let pass = ComputePass::builder("cache_lighting")
            .bind([
                &buffers.globals,
                &buffers.lights,
                &buffers.counter.bind_readable(),
                &buffers.headers.bind_readable(),
                &buffers.entries.bind_writable(),
            ])
            .bind([
                &buffers.rsm_flux.bind_sampled(),
                &buffers.rsm_depth.bind_sampled(),
                &buffers.rsm_normal.bind_sampled(),
                &buffers.voxels.bind_sampled(),
                &buffers.atlas.bind_level(0),
            ])
            .build(device, &shaders.cache_lighting);

        Self { pass }
    }

    /// Lights caches, one light at a time; with no lights the pass still runs
    /// once (with an empty light), so that the caches get cleared.
    pub fn run(&self, engine: &Engine, encoder: &mut wgpu::CommandEncoder) {
        let args = engine.buffers().counter.buffer();

        for light_id in 0..engine.light_count().max(1) {
            let params = gpu::CacheLightingPassParams {
                light_id: light_id as u32,
                accumulate: (light_id > 0) as u32,
            };

            self.pass.run_indirect(encoder, args, params);
        }
    }
}
