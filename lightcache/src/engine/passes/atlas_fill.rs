use super::atlas_downsample::atlas_dispatch_size;
use crate::{
    gpu, CacheBuffers, ComputePass, Engine, LightCacheConfig, Shaders,
};

/// Fills holes of the atlas, walking from the configured coarsest level back
/// down to level zero.
#[derive(Debug)]
pub struct AtlasFillPass {
    max_level: u32,
    seed: ComputePass<gpu::AtlasPassParams>,

    /// Pass writing into level `n` is at index `n`
    fill: Vec<ComputePass<gpu::AtlasPassParams>>,
}

impl AtlasFillPass {
    pub fn new(
        device: &wgpu::Device,
        shaders: &Shaders,
        config: &LightCacheConfig,
        buffers: &CacheBuffers,
    ) -> Self {
        let max_level = config
            .max_fill_holes_level()
            .min(buffers.layout.mips - 1);

        let seed = ComputePass::builder("atlas_seed")
            .bind([
                &buffers.globals,
                &buffers.counter.bind_readable(),
                &buffers.atlas.bind_level(max_level),
            ])
            .build(device, &shaders.atlas_seed);

        let fill = (0..max_level)
            .map(|level| {
                ComputePass::builder(format!("atlas_fill_{level}"))
                    .bind([
                        &buffers.globals,
                        &buffers.counter.bind_readable(),
                        &buffers.atlas.bind_level(level + 1),
                        &buffers.atlas.bind_level(level),
                    ])
                    .build(device, &shaders.atlas_fill)
            })
            .collect();

        Self {
            max_level,
            seed,
            fill,
        }
    }

    pub fn run(&self, engine: &Engine, encoder: &mut wgpu::CommandEncoder) {
        self.seed.run(
            encoder,
            atlas_dispatch_size(engine, self.max_level),
            gpu::AtlasPassParams {
                level: self.max_level,
            },
        );

        for (level, pass) in self.fill.iter().enumerate().rev() {
            let level = level as u32;

            pass.run(
                encoder,
                atlas_dispatch_size(engine, level),
                gpu::AtlasPassParams { level },
            );
        }
    }
}
