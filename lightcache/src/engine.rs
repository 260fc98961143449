mod buffers;
mod pass;
mod passes;

use std::mem;
use std::ops::DerefMut;

use glam::UVec2;
use log::{debug, info};

pub use self::buffers::*;
pub use self::pass::*;
pub use self::passes::*;
use crate::frame::{serialize_globals, visible_lights};
use crate::{
    gpu, CacheStats, Error, FrameInputs, LightCacheConfig, ReadbackBuffer,
    Shaders,
};

/// Per-frame orchestrator of the light cache.
///
/// Each frame goes through:
///
/// - [`Engine::prepare()`], which uploads the camera, lights etc.,
/// - [`Engine::render()`], which records all of the passes,
/// - [`Engine::poll_stats()`] (optional, after submitting the frame).
///
/// External renderers are expected to fill the G-buffer, the RSMs and the
/// occupancy volume (see: [`Engine::buffers()`]) before the recorded passes
/// execute; the indirect lighting gets added onto [`CacheBuffers::colors`].
#[derive(Debug)]
pub struct Engine {
    shaders: Shaders,
    config: LightCacheConfig,
    viewport_size: UVec2,
    buffers: CacheBuffers,
    passes: CachePasses,
    readback: Option<ReadbackBuffer>,
    light_count: usize,
    stats: CacheStats,
}

impl Engine {
    /// Device features the passes rely on.
    pub fn required_features() -> wgpu::Features {
        wgpu::Features::PUSH_CONSTANTS
            | wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES
    }

    /// Device limits the passes rely on (on top of the defaults).
    pub fn required_limits() -> wgpu::Limits {
        let max_push_constant_size = [
            mem::size_of::<gpu::CachePreparePassParams>(),
            mem::size_of::<gpu::CacheLightingPassParams>(),
            mem::size_of::<gpu::AtlasPassParams>(),
        ]
        .into_iter()
        .max()
        .unwrap_or_default() as u32;

        wgpu::Limits {
            max_push_constant_size,
            ..Default::default()
        }
    }

    pub fn new(
        device: &wgpu::Device,
        shaders: Shaders,
        config: LightCacheConfig,
        viewport_size: UVec2,
    ) -> Self {
        info!(
            "Creating light cache: {}; viewport={viewport_size}",
            config.describe()
        );

        assert!(viewport_size.x > 0 && viewport_size.y > 0);

        let buffers = CacheBuffers::new(device, &config, viewport_size);
        let passes = CachePasses::new(device, &shaders, &config, &buffers);
        let readback = Self::create_readback(device, &config);

        info!(
            "Light cache created; capacity={}, atlas={}x{} ({} mips)",
            buffers.layout.capacity,
            buffers.layout.size,
            buffers.layout.size,
            buffers.layout.mips,
        );

        Self {
            shaders,
            config,
            viewport_size,
            buffers,
            passes,
            readback,
            light_count: 0,
            stats: Default::default(),
        }
    }

    fn create_readback(
        device: &wgpu::Device,
        config: &LightCacheConfig,
    ) -> Option<ReadbackBuffer> {
        config.read_cache_count().then(|| {
            ReadbackBuffer::new(
                device,
                "lightcache_cache_count",
                mem::size_of::<u32>(),
            )
        })
    }

    pub fn config(&self) -> &LightCacheConfig {
        &self.config
    }

    /// Changes configuration; GPU resources get reallocated only if sizes of
    /// the buffers change (toggles take effect on the next prepare).
    pub fn set_config(
        &mut self,
        device: &wgpu::Device,
        config: LightCacheConfig,
    ) {
        let needs_rebuilding = self.config.is_invalidated_by(&config);

        if self.config.read_cache_count() != config.read_cache_count() {
            self.readback = Self::create_readback(device, &config);
            self.stats = Default::default();
        }

        self.config = config;

        if needs_rebuilding {
            self.rebuild(device);
        }
    }

    pub fn viewport_size(&self) -> UVec2 {
        self.viewport_size
    }

    pub fn resize(&mut self, device: &wgpu::Device, viewport_size: UVec2) {
        assert!(viewport_size.x > 0 && viewport_size.y > 0);

        if self.viewport_size == viewport_size {
            return;
        }

        self.viewport_size = viewport_size;
        self.rebuild(device);
    }

    fn rebuild(&mut self, device: &wgpu::Device) {
        debug!(
            "Rebuilding light cache: {}; viewport={}",
            self.config.describe(),
            self.viewport_size
        );

        self.buffers =
            CacheBuffers::new(device, &self.config, self.viewport_size);

        self.passes = CachePasses::new(
            device,
            &self.shaders,
            &self.config,
            &self.buffers,
        );
    }

    /// Resources shared with the external renderers; note that they get
    /// reallocated whenever [`Self::set_config()`] or [`Self::resize()`]
    /// changes their sizes.
    pub fn buffers(&self) -> &CacheBuffers {
        &self.buffers
    }

    /// Arguments for `draw_indexed_indirect()` of a mesh visualizing the
    /// caches (one instance per cache).
    pub fn debug_draw_args(&self) -> &wgpu::Buffer {
        self.buffers.debug_draw.buffer()
    }

    pub(crate) fn light_count(&self) -> usize {
        self.light_count
    }

    /// Occupancy volume the voxelizer should fill in for the current frame.
    pub fn voxel_volume(&self) -> gpu::VoxelVolume {
        self.buffers.globals.voxels
    }

    pub fn prepare(&mut self, queue: &wgpu::Queue, inputs: &FrameInputs) {
        *self.buffers.globals.deref_mut() = serialize_globals(
            &self.config,
            &self.buffers.layout,
            self.viewport_size,
            inputs.camera_position,
            inputs.scene_bounds,
        );

        let lights = visible_lights(inputs.lights);
        let rsm_resolution = self.config.rsm_resolution();

        self.light_count = lights.len();

        let lights_buf = self.buffers.lights.deref_mut();

        lights_buf.clear();

        lights_buf.extend(
            lights
                .iter()
                .zip(0..)
                .map(|(light, layer)| light.serialize(layer, rsm_resolution)),
        );

        if lights_buf.is_empty() {
            lights_buf.push(Default::default());
        }

        self.buffers.flush(queue);
    }

    pub fn render(&self, encoder: &mut wgpu::CommandEncoder) {
        self.buffers.counter.clear(encoder);
        self.buffers.addresses.clear(encoder);

        self.passes.cache_gather.run(self, encoder);
        self.passes.cache_prepare.run(self, encoder);
        self.passes.cache_lighting.run(self, encoder);

        if self.config.indirect_specular() {
            self.passes.atlas_downsample.run(self, encoder);
            self.passes.atlas_fill.run(self, encoder);
        }

        self.passes.cache_apply.run(self, encoder);

        if let Some(readback) = &self.readback {
            readback.copy_from(
                encoder,
                self.buffers.counter.buffer(),
                (gpu::CacheCounter::COUNT as usize * mem::size_of::<u32>())
                    as u64,
            );
        }
    }

    /// Collects diagnostics from the previous frames; must be called after
    /// the encoder passed to [`Self::render()`] has been submitted.
    pub fn poll_stats(&mut self, device: &wgpu::Device) -> Result<(), Error> {
        let Some(readback) = &mut self.readback else {
            return Ok(());
        };

        readback.poll(device)?;

        if let Some(&count) = readback.last().and_then(|words| words.first()) {
            self.stats.last_cache_count =
                Some(count.min(self.buffers.layout.capacity));
        }

        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        info!("Deleting light cache");
    }
}
