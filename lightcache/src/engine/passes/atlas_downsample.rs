use glam::UVec3;

use crate::{
    gpu, CacheBuffers, ComputePass, Engine, LightCacheConfig, Shaders,
};

/// Builds the atlas' mip-chain, one level at a time.
#[derive(Debug)]
pub struct AtlasDownsamplePass {
    passes: Vec<ComputePass<gpu::AtlasPassParams>>,
}

impl AtlasDownsamplePass {
    pub fn new(
        device: &wgpu::Device,
        shaders: &Shaders,
        _: &LightCacheConfig,
        buffers: &CacheBuffers,
    ) -> Self {
        let passes = (1..buffers.layout.mips)
            .map(|level| {
                ComputePass::builder(format!("atlas_downsample_{level}"))
                    .bind([
                        &buffers.globals,
                        &buffers.counter.bind_readable(),
                        &buffers.atlas.bind_level(level - 1),
                        &buffers.atlas.bind_level(level),
                    ])
                    .build(device, &shaders.atlas_downsample)
            })
            .collect();

        Self { passes }
    }

    pub fn run(&self, engine: &Engine, encoder: &mut wgpu::CommandEncoder) {
        for (level, pass) in (1..).zip(&self.passes) {
            pass.run(
                encoder,
                atlas_dispatch_size(engine, level),
                gpu::AtlasPassParams { level },
            );
        }
    }
}

/// Returns number of workgroups covering given mip-level of the atlas.
pub(crate) fn atlas_dispatch_size(engine: &Engine, level: u32) -> UVec3 {
    let size = (engine.buffers().layout.size >> level).max(1);

    // These passes use 8x8 warps:
    let groups = (size + 7) / 8;

    UVec3::new(groups, groups, 1)
}
