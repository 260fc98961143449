mod atlas;
mod rsm;
mod voxels;

use std::sync::atomic::AtomicU32;
use std::thread;

use glam::{uvec2, UVec2, UVec3, Vec3, Vec4};
use log::debug;

pub use self::atlas::*;
pub use self::rsm::*;
pub use self::voxels::*;
use crate::frame::{serialize_globals, visible_lights};
use crate::gpu::AtlasImage;
use crate::{gpu, AtlasLayout, LightCacheConfig, SpotLightDesc};

/// Spot-light together with its already rendered RSM.
#[derive(Clone, Debug)]
pub struct SoftwareLight {
    pub desc: SpotLightDesc,
    pub rsm: SoftwareRsm,
}

#[derive(Clone, Copy, Debug)]
pub struct SoftwareFrame<'a> {
    pub camera_position: Vec3,
    pub viewport_size: UVec2,

    /// Row-major G-buffer, `viewport_size.x * viewport_size.y` entries
    pub gbuffer: &'a [gpu::GBufferEntry],

    pub lights: &'a [SoftwareLight],
    pub voxels: Option<&'a SoftwareVoxels>,
}

/// Everything a frame has produced.
#[derive(Clone, Debug)]
pub struct SoftwareOutput {
    pub globals: gpu::Globals,

    /// Number of live caches
    pub cache_count: u32,

    /// Workgroups the cache-lighting pass would be dispatched with
    pub dispatch_size: UVec3,

    pub debug_draw: gpu::DrawIndexedIndirectArgs,

    /// Address volume, as left by the gather pass
    pub addresses: Vec<u32>,

    /// Live caches, as left by the lighting pass
    pub entries: Vec<gpu::CacheEntry>,

    /// Mip-chain of the specular atlas (empty if indirect specular is
    /// disabled)
    pub atlas: Vec<AtlasLevel>,

    /// Per-pixel indirect lighting, as added by the apply pass
    pub indirect: Vec<Vec3>,
}

impl SoftwareOutput {
    /// Returns index of the cache of the cell that owns given point (as
    /// selected by the finest deciding cascade).
    pub fn cache_at(&self, pos: Vec3) -> gpu::CacheIndex {
        let cell = self.globals.volume.resolve(pos);
        let address = self.globals.volume.address(cell);

        gpu::CacheIndex::from_cell(self.addresses[address as usize])
    }

    pub fn indirect_at(&self, pixel: UVec2) -> Vec3 {
        self.indirect[(pixel.y * self.globals.viewport_size().x + pixel.x)
            as usize]
    }
}

/// Runs the light cache's passes on the CPU.
///
/// Gathering is spread across threads that race for the cells just like
/// GPU invocations do; the remaining passes run sequentially.
#[derive(Clone, Debug)]
pub struct SoftwarePipeline {
    config: LightCacheConfig,
    layout: AtlasLayout,
    workers: usize,
}

impl SoftwarePipeline {
    pub fn new(config: LightCacheConfig) -> Self {
        let layout = AtlasLayout::new(&config);

        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            config,
            layout,
            workers,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        assert!(workers > 0);

        self.workers = workers;
        self
    }

    pub fn config(&self) -> &LightCacheConfig {
        &self.config
    }

    pub fn layout(&self) -> &AtlasLayout {
        &self.layout
    }

    pub fn render(&self, frame: &SoftwareFrame) -> SoftwareOutput {
        let viewport_size = frame.viewport_size;

        assert!(viewport_size.x > 0 && viewport_size.y > 0);

        assert_eq!(
            (viewport_size.x * viewport_size.y) as usize,
            frame.gbuffer.len(),
            "G-buffer doesn't match the viewport"
        );

        let mut globals = serialize_globals(
            &self.config,
            &self.layout,
            viewport_size,
            frame.camera_position,
            None,
        );

        if let Some(voxels) = frame.voxels {
            globals.voxels = voxels.volume();
        }

        let (addresses, counter, headers) = self.gather(&globals, frame);

        let (dispatch_size, debug_draw) = gpu::prepare_dispatch(
            counter[gpu::CacheCounter::COUNT as usize],
            globals.capacity(),
            self.config.debug_index_count(),
        );

        let cache_count = debug_draw.instance_count;

        debug!("Gathered {cache_count} caches");

        let (entries, atlas) =
            self.light(&globals, frame, cache_count, &headers);

        let atlas = if self.config.indirect_specular() {
            let mut levels =
                downsample_atlas(&globals.atlas, cache_count, atlas);

            fill_atlas_holes(
                &globals.atlas,
                cache_count,
                self.config.max_fill_holes_level(),
                &mut levels,
            );

            levels
        } else {
            Vec::new()
        };

        let indirect = frame
            .gbuffer
            .iter()
            .map(|gbuffer| {
                gpu::apply(
                    *gbuffer,
                    &globals,
                    |address| addresses[address as usize],
                    |index| entries[index.get() as usize],
                    |texel, level| {
                        atlas
                            .get(level as usize)
                            .map(|level| level.load(texel))
                            .unwrap_or(Vec4::ZERO)
                    },
                )
            })
            .collect();

        SoftwareOutput {
            globals,
            cache_count,
            dispatch_size,
            debug_draw,
            addresses,
            entries,
            atlas,
            indirect,
        }
    }

    /// Returns the address volume, the counter and the headers.
    fn gather(
        &self,
        globals: &gpu::Globals,
        frame: &SoftwareFrame,
    ) -> (Vec<u32>, Vec<u32>, Vec<u32>) {
        let capacity = globals.capacity() as usize;
        let addresses = atomics(globals.volume.cell_count() as usize);
        let counter = atomics(gpu::CacheCounter::WORDS);
        let headers = atomics(capacity * gpu::CacheHeader::WORDS as usize);

        let chunk_size = frame.gbuffer.len().div_ceil(self.workers).max(1);

        thread::scope(|s| {
            for pixels in frame.gbuffer.chunks(chunk_size) {
                let mut addresses = addresses.as_slice();
                let mut counter = counter.as_slice();
                let mut headers = headers.as_slice();

                s.spawn(move || {
                    for gbuffer in pixels {
                        gpu::gather(
                            *gbuffer,
                            globals,
                            &mut addresses,
                            &mut counter,
                            &mut headers,
                        );
                    }
                });
            }
        });

        let addresses = into_inner(addresses);
        let counter = into_inner(counter);
        let headers = into_inner(headers);

        debug_assert!(
            addresses.iter().enumerate().all(|(address, &cell)| {
                let index = gpu::CacheIndex::from_cell(cell);

                index.is_none()
                    || headers[(index.get() * gpu::CacheHeader::WORDS)
                        as usize]
                        == address as u32
            }),
            "cache published under a foreign cell"
        );

        (addresses, counter, headers)
    }

    /// Returns the lit caches and level 0 of the specular atlas.
    fn light(
        &self,
        globals: &gpu::Globals,
        frame: &SoftwareFrame,
        cache_count: u32,
        headers: &[u32],
    ) -> (Vec<gpu::CacheEntry>, AtlasLevel) {
        let mut entries =
            vec![gpu::CacheEntry::default(); cache_count as usize];

        let mut atlas = if self.config.indirect_specular() {
            AtlasLevel::new(globals.atlas.size())
        } else {
            AtlasLevel::new(0)
        };

        let lights: Vec<_> = visible_lights(frame.lights)
            .iter()
            .zip(0..)
            .map(|(light, layer)| {
                let desc = light.desc.serialize(layer, light.rsm.resolution());

                (desc, Some(&light.rsm))
            })
            .collect();

        let lights = if lights.is_empty() {
            vec![(gpu::SpotLight::default(), None)]
        } else {
            lights
        };

        let occupancy = |uvw: Vec3, lod: f32| {
            frame
                .voxels
                .map(|voxels| voxels.sample(uvw, lod))
                .unwrap_or_default()
        };

        for (light_id, (light, rsm)) in lights.iter().enumerate() {
            let rsm = |texel: UVec2| {
                rsm.map(|rsm| rsm.read(texel, light.read_lod()))
                    .unwrap_or_default()
            };

            for (index, entry) in (0..).zip(entries.iter_mut()) {
                let index = gpu::CacheIndex::new(index);

                *entry = gpu::light_cache(
                    index,
                    gpu::CacheHeader::read(headers, index),
                    *entry,
                    light_id > 0,
                    globals,
                    light,
                    rsm,
                    occupancy,
                    &mut atlas,
                );
            }
        }

        (entries, atlas)
    }
}

/// Builds the atlas' mip-chain out of its level zero; texels of coarser
/// levels are defined if any of their children is.
fn downsample_atlas(
    atlas: &gpu::SpecularAtlas,
    cache_count: u32,
    level0: AtlasLevel,
) -> Vec<AtlasLevel> {
    let mut levels = vec![level0];

    for level in 1..atlas.mip_count() {
        let source = &levels[level as usize - 1];
        let mut target = AtlasLevel::new(atlas.size_at(level));

        for texel in active_texels(atlas, level, cache_count) {
            let src = texel * 2;

            target.store(
                texel,
                gpu::AtlasTexel::downsample([
                    source.load(src),
                    source.load(src + uvec2(1, 0)),
                    source.load(src + uvec2(0, 1)),
                    source.load(src + uvec2(1, 1)),
                ]),
            );
        }

        levels.push(target);
    }

    levels
}

/// Seeds holes at `max_level` and then pushes values down, coarsest level
/// first, so that every hole ends up with its nearest defined ancestor.
fn fill_atlas_holes(
    atlas: &gpu::SpecularAtlas,
    cache_count: u32,
    max_level: u32,
    levels: &mut [AtlasLevel],
) {
    let max_level = max_level.min(levels.len() as u32 - 1);
    let seeded = &mut levels[max_level as usize];

    for texel in active_texels(atlas, max_level, cache_count) {
        seeded.store(texel, gpu::AtlasTexel::seed(seeded.load(texel)));
    }

    for level in (0..max_level).rev() {
        let (lower, upper) = levels.split_at_mut(level as usize + 1);
        let target = &mut lower[level as usize];
        let parent = &upper[0];

        for texel in active_texels(atlas, level, cache_count) {
            let filled = gpu::AtlasTexel::fill(
                target.load(texel),
                parent.load(texel / 2),
            );

            target.store(texel, filled);
        }
    }
}

fn atomics(len: usize) -> Vec<AtomicU32> {
    (0..len).map(|_| AtomicU32::new(0)).collect()
}

fn into_inner(slots: Vec<AtomicU32>) -> Vec<u32> {
    slots.into_iter().map(AtomicU32::into_inner).collect()
}

fn active_texels(
    atlas: &gpu::SpecularAtlas,
    level: u32,
    cache_count: u32,
) -> impl Iterator<Item = UVec2> + '_ {
    let size = atlas.size_at(level);

    (0..size)
        .flat_map(move |y| (0..size).map(move |x| uvec2(x, y)))
        .filter(move |&texel| atlas.is_texel_active(texel, level, cache_count))
}

#[cfg(test)]
mod tests;
