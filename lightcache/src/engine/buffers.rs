use std::mem;

use glam::{uvec2, UVec2};
use log::debug;

use crate::{
    gpu, AtlasLayout, LightCacheConfig, MappedStorageBuffer,
    MappedUniformBuffer, Texture, UnmappedStorageBuffer,
};

/// GPU resources of the light cache, including the render targets that
/// external renderers (the rasterizer, the RSM renderer and the voxelizer)
/// write into.
#[derive(Debug)]
pub struct CacheBuffers {
    pub layout: AtlasLayout,
    pub globals: MappedUniformBuffer<gpu::Globals>,
    pub lights: MappedStorageBuffer<gpu::SpotLight>,

    /// See: [`gpu::CacheCounter`]
    pub counter: UnmappedStorageBuffer,

    /// See: [`gpu::DrawIndexedIndirectArgs`]
    pub debug_draw: UnmappedStorageBuffer,

    pub addresses: UnmappedStorageBuffer,
    pub headers: UnmappedStorageBuffer,
    pub entries: UnmappedStorageBuffer,

    /// See: [`gpu::GBufferEntry`]
    pub gbuffer_d0: Texture,
    pub gbuffer_d1: Texture,
    pub gbuffer_d2: Texture,

    /// HDR image the indirect lighting gets added onto
    pub colors: Texture,

    pub rsm_flux: Texture,
    pub rsm_depth: Texture,
    pub rsm_normal: Texture,
    pub voxels: Texture,
    pub atlas: Texture,
}

impl CacheBuffers {
    pub fn new(
        device: &wgpu::Device,
        config: &LightCacheConfig,
        viewport_size: UVec2,
    ) -> Self {
        debug!("Initializing cache buffers");

        let layout = AtlasLayout::new(config);
        let capacity = layout.capacity as usize;

        let cell_count = (config.cascade_resolution().pow(3)
            * config.cascade_count()) as usize;

        let globals = MappedUniformBuffer::new(device, "lightcache_globals");

        let lights = MappedStorageBuffer::new(
            device,
            "lightcache_lights",
            gpu::MAX_LIGHTS,
        );

        let counter = UnmappedStorageBuffer::new_ex(
            device,
            "lightcache_counter",
            gpu::CacheCounter::WORDS * mem::size_of::<u32>(),
            wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_SRC,
        );

        let debug_draw = UnmappedStorageBuffer::new_ex(
            device,
            "lightcache_debug_draw",
            gpu::DrawIndexedIndirectArgs::WORDS * mem::size_of::<u32>(),
            wgpu::BufferUsages::INDIRECT,
        );

        let addresses = UnmappedStorageBuffer::new(
            device,
            "lightcache_addresses",
            cell_count * mem::size_of::<u32>(),
        );

        let headers = UnmappedStorageBuffer::new(
            device,
            "lightcache_headers",
            capacity
                * gpu::CacheHeader::WORDS as usize
                * mem::size_of::<u32>(),
        );

        let entries = UnmappedStorageBuffer::new(
            device,
            "lightcache_entries",
            capacity * mem::size_of::<gpu::CacheEntry>(),
        );

        let gbuffer = |label| {
            Texture::builder(label)
                .with_size(viewport_size)
                .with_format(wgpu::TextureFormat::Rgba32Float)
                .with_usage(wgpu::TextureUsages::STORAGE_BINDING)
                .with_usage(wgpu::TextureUsages::RENDER_ATTACHMENT)
                .with_usage(wgpu::TextureUsages::COPY_DST)
                .build(device)
        };

        let gbuffer_d0 = gbuffer("gbuffer_d0");
        let gbuffer_d1 = gbuffer("gbuffer_d1");
        let gbuffer_d2 = gbuffer("gbuffer_d2");

        let colors = Texture::builder("colors")
            .with_size(viewport_size)
            .with_format(wgpu::TextureFormat::Rgba16Float)
            .with_usage(wgpu::TextureUsages::STORAGE_BINDING)
            .with_usage(wgpu::TextureUsages::TEXTURE_BINDING)
            .with_usage(wgpu::TextureUsages::RENDER_ATTACHMENT)
            .with_usage(wgpu::TextureUsages::COPY_SRC)
            .with_usage(wgpu::TextureUsages::COPY_DST)
            .build(device);

        let rsm_size = uvec2(config.rsm_resolution(), config.rsm_resolution());
        let rsm_mips = config.rsm_resolution().trailing_zeros() + 1;

        let rsm = |label, format| {
            Texture::builder(label)
                .with_size(rsm_size)
                .with_layers(gpu::MAX_LIGHTS as u32)
                .with_mips(rsm_mips)
                .with_format(format)
                .with_usage(wgpu::TextureUsages::TEXTURE_BINDING)
                .with_usage(wgpu::TextureUsages::RENDER_ATTACHMENT)
                .with_usage(wgpu::TextureUsages::COPY_DST)
                .build(device)
        };

        let rsm_flux = rsm("rsm_flux", wgpu::TextureFormat::Rgba16Float);
        let rsm_depth = rsm("rsm_depth", wgpu::TextureFormat::R32Float);
        let rsm_normal = rsm("rsm_normal", wgpu::TextureFormat::Rgba16Float);

        let voxels_res = config.voxel_resolution();

        let voxels = Texture::builder("voxels")
            .with_size(uvec2(voxels_res, voxels_res))
            .with_depth(voxels_res)
            .with_mips(32 - voxels_res.leading_zeros())
            .with_format(wgpu::TextureFormat::R8Unorm)
            .with_usage(wgpu::TextureUsages::TEXTURE_BINDING)
            .with_usage(wgpu::TextureUsages::COPY_DST)
            .with_filtering()
            .build(device);

        let atlas = Texture::builder("atlas")
            .with_size(uvec2(layout.size, layout.size))
            .with_mips(layout.mips)
            .with_format(wgpu::TextureFormat::Rgba16Float)
            .with_usage(wgpu::TextureUsages::STORAGE_BINDING)
            .with_usage(wgpu::TextureUsages::TEXTURE_BINDING)
            .build(device);

        Self {
            layout,
            globals,
            lights,
            counter,
            debug_draw,
            addresses,
            headers,
            entries,
            gbuffer_d0,
            gbuffer_d1,
            gbuffer_d2,
            colors,
            rsm_flux,
            rsm_depth,
            rsm_normal,
            voxels,
            atlas,
        }
    }

    pub fn flush(&mut self, queue: &wgpu::Queue) {
        self.globals.flush(queue);
        self.lights.flush(queue);
    }
}
