use glam::Vec3;
use log::warn;

use crate::gpu;

/// Order of spherical harmonics used to store the caches' irradiance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShOrder {
    /// 4 coefficients
    #[default]
    Sh1,

    /// 9 coefficients
    Sh2,
}

impl ShOrder {
    pub fn coeff_count(self) -> usize {
        gpu::ShOrder::coeff_count(self.serialize())
    }

    pub(crate) fn serialize(self) -> u32 {
        match self {
            ShOrder::Sh1 => gpu::ShOrder::FIRST,
            ShOrder::Sh2 => gpu::ShOrder::SECOND,
        }
    }
}

/// Configuration of the light cache.
///
/// Setters validate their arguments and panic on nonsensical ones (e.g. a
/// tile size that's not a power of two).
#[derive(Clone, Debug, PartialEq)]
pub struct LightCacheConfig {
    max_cache_count: u32,
    specular_tile_size: u32,
    max_fill_holes_level: u32,
    cascade_world_sizes: Vec<f32>,
    cascade_resolution: u32,
    cascade_transition_size: f32,
    sh_order: ShOrder,
    indirect_shadow: bool,
    indirect_specular: bool,
    specular_direct_write: bool,
    show_cascades: bool,
    read_cache_count: bool,
    max_texture_size: u32,
    rsm_resolution: u32,
    voxel_resolution: u32,
    debug_index_count: u32,
}

impl Default for LightCacheConfig {
    fn default() -> Self {
        Self {
            max_cache_count: 16384,
            specular_tile_size: 16,
            max_fill_holes_level: 0,
            cascade_world_sizes: vec![4.0, 8.0, 16.0],
            cascade_resolution: 32,
            cascade_transition_size: 2.0,
            sh_order: ShOrder::Sh1,
            indirect_shadow: true,
            indirect_specular: false,
            specular_direct_write: true,
            show_cascades: false,
            read_cache_count: false,
            max_texture_size: 8192,
            rsm_resolution: 512,
            voxel_resolution: 128,
            debug_index_count: 36,
        }
    }
}

impl LightCacheConfig {
    pub fn max_cache_count(&self) -> u32 {
        self.max_cache_count
    }

    pub fn set_max_cache_count(&mut self, count: u32) {
        assert!(count > 0, "cache capacity must be positive");

        self.max_cache_count = count;
    }

    pub fn specular_tile_size(&self) -> u32 {
        self.specular_tile_size
    }

    pub fn set_specular_tile_size(&mut self, size: u32) {
        assert!(
            size.is_power_of_two(),
            "specular tile size must be a power of two, got {size}"
        );

        self.specular_tile_size = size;
        self.max_fill_holes_level =
            self.clamp_fill_level(self.max_fill_holes_level);
    }

    pub fn max_fill_holes_level(&self) -> u32 {
        self.max_fill_holes_level
    }

    /// Sets the coarsest mip-level the hole-filling starts from; clamped to
    /// the tile's mip chain.
    pub fn set_max_fill_holes_level(&mut self, level: u32) {
        self.max_fill_holes_level = self.clamp_fill_level(level);
    }

    fn clamp_fill_level(&self, level: u32) -> u32 {
        level.min(self.specular_tile_size.trailing_zeros())
    }

    pub fn cascade_count(&self) -> u32 {
        self.cascade_world_sizes.len() as u32
    }

    /// Changes the number of cascades; newly added cascades get world sizes
    /// doubled from their predecessors, while existing ones keep theirs.
    pub fn set_cascade_count(&mut self, count: u32) {
        assert!(
            count > 0 && count as usize <= gpu::MAX_CASCADES,
            "cascade count must be within 1..={}, got {count}",
            gpu::MAX_CASCADES
        );

        let count = count as usize;

        if count < self.cascade_world_sizes.len() {
            self.cascade_world_sizes.truncate(count);
        }

        while self.cascade_world_sizes.len() < count {
            let size = self
                .cascade_world_sizes
                .last()
                .map(|size| size * 2.0)
                .unwrap_or(4.0);

            self.cascade_world_sizes.push(size);
        }
    }

    pub fn cascade_world_size(&self, cascade: u32) -> f32 {
        assert!(cascade < self.cascade_count(), "no such cascade: {cascade}");

        self.cascade_world_sizes[cascade as usize]
    }

    pub fn cascade_world_sizes(&self) -> &[f32] {
        &self.cascade_world_sizes
    }

    pub fn set_cascade_world_size(&mut self, cascade: u32, size: f32) {
        assert!(cascade < self.cascade_count(), "no such cascade: {cascade}");
        assert!(size > 0.0, "cascade's world size must be positive");

        self.cascade_world_sizes[cascade as usize] = size;
    }

    pub fn cascade_resolution(&self) -> u32 {
        self.cascade_resolution
    }

    pub fn set_cascade_resolution(&mut self, resolution: u32) {
        assert!(resolution > 0, "cascade resolution must be positive");

        self.cascade_resolution = resolution;
    }

    pub fn cascade_transition_size(&self) -> f32 {
        self.cascade_transition_size
    }

    /// Sets width of the zone (in voxels of the finer cascade) over which
    /// neighbouring cascades get blended; zero (or less) disables blending.
    pub fn set_cascade_transition_size(&mut self, size: f32) {
        self.cascade_transition_size = size;
    }

    pub fn sh_order(&self) -> ShOrder {
        self.sh_order
    }

    pub fn set_sh_order(&mut self, order: ShOrder) {
        self.sh_order = order;
    }

    pub fn indirect_shadow(&self) -> bool {
        self.indirect_shadow
    }

    pub fn set_indirect_shadow(&mut self, enabled: bool) {
        self.indirect_shadow = enabled;
    }

    pub fn indirect_specular(&self) -> bool {
        self.indirect_specular
    }

    pub fn set_indirect_specular(&mut self, enabled: bool) {
        self.indirect_specular = enabled;
    }

    pub fn specular_direct_write(&self) -> bool {
        self.specular_direct_write
    }

    pub fn set_specular_direct_write(&mut self, enabled: bool) {
        self.specular_direct_write = enabled;
    }

    pub fn show_cascades(&self) -> bool {
        self.show_cascades
    }

    pub fn set_show_cascades(&mut self, enabled: bool) {
        self.show_cascades = enabled;
    }

    pub fn read_cache_count(&self) -> bool {
        self.read_cache_count
    }

    pub fn set_read_cache_count(&mut self, enabled: bool) {
        self.read_cache_count = enabled;
    }

    pub fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }

    /// Sets the device's limit on texture dimensions (e.g.
    /// `wgpu::Limits::max_texture_dimension_2d`).
    pub fn set_max_texture_size(&mut self, size: u32) {
        assert!(size > 0, "max texture size must be positive");

        self.max_texture_size = size;
    }

    pub fn rsm_resolution(&self) -> u32 {
        self.rsm_resolution
    }

    pub fn set_rsm_resolution(&mut self, resolution: u32) {
        assert!(resolution > 0, "RSM resolution must be positive");

        if !resolution.is_power_of_two() {
            warn!(
                "RSM resolution {resolution} is not a power of two, rounding \
                 up to {}",
                resolution.next_power_of_two()
            );
        }

        self.rsm_resolution = resolution.next_power_of_two();
    }

    pub fn voxel_resolution(&self) -> u32 {
        self.voxel_resolution
    }

    pub fn set_voxel_resolution(&mut self, resolution: u32) {
        assert!(resolution > 0, "voxel resolution must be positive");

        self.voxel_resolution = resolution;
    }

    pub fn debug_index_count(&self) -> u32 {
        self.debug_index_count
    }

    /// Sets number of indices of the mesh used to visualize caches.
    pub fn set_debug_index_count(&mut self, count: u32) {
        self.debug_index_count = count;
    }

    /// Returns whether switching from `self` to `other` requires the GPU
    /// resources to be reallocated.
    pub fn is_invalidated_by(&self, other: &Self) -> bool {
        self.max_cache_count != other.max_cache_count
            || self.specular_tile_size != other.specular_tile_size
            || self.max_fill_holes_level != other.max_fill_holes_level
            || self.cascade_count() != other.cascade_count()
            || self.cascade_resolution != other.cascade_resolution
            || self.max_texture_size != other.max_texture_size
            || self.rsm_resolution != other.rsm_resolution
            || self.voxel_resolution != other.voxel_resolution
    }

    pub(crate) fn flags(&self) -> u32 {
        let mut flags = 0;

        if self.indirect_shadow {
            flags |= gpu::Globals::INDIRECT_SHADOW;
        }

        if self.indirect_specular {
            flags |= gpu::Globals::INDIRECT_SPECULAR;
        }

        if self.specular_direct_write {
            flags |= gpu::Globals::SPECULAR_DIRECT_WRITE;
        }

        if self.show_cascades {
            flags |= gpu::Globals::SHOW_CASCADES;
        }

        flags
    }

    pub(crate) fn address_volume(&self, camera: Vec3) -> gpu::AddressVolume {
        gpu::AddressVolume::new(
            camera,
            &self.cascade_world_sizes,
            self.cascade_resolution,
            self.cascade_transition_size,
        )
    }

    pub(crate) fn describe(&self) -> String {
        format!(
            "capacity={}, tile={}, cascades={}x{}^3, sh={:?}",
            self.max_cache_count,
            self.specular_tile_size,
            self.cascade_count(),
            self.cascade_resolution,
            self.sh_order,
        )
    }
}

/// Sizes of the cache table and of the specular atlas, as derived from the
/// configuration and the device's limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AtlasLayout {
    /// Number of caches the table can hold; smaller than the configured one
    /// when the atlas wouldn't fit into a texture
    pub capacity: u32,

    /// Width (and height) of the atlas, in texels
    pub size: u32,

    pub tile_size: u32,
    pub mips: u32,
}

impl AtlasLayout {
    pub fn new(config: &LightCacheConfig) -> Self {
        let tile_size = config.specular_tile_size;
        let mips = tile_size.trailing_zeros() + 1;

        // Non-power-of-two limits get rounded down, so that the atlas stays
        // evenly divisible into mip-levels
        let max_size = prev_power_of_two(config.max_texture_size);

        assert!(
            max_size >= tile_size,
            "max texture size ({}) cannot fit a single tile ({tile_size})",
            config.max_texture_size
        );

        let tiles_per_row =
            (config.max_cache_count as f64).sqrt().ceil() as u32;
        let demanded = (tiles_per_row * tile_size).next_power_of_two();

        if demanded <= max_size {
            return Self {
                capacity: config.max_cache_count,
                size: demanded,
                tile_size,
                mips,
            };
        }

        let capacity = (max_size / tile_size).pow(2);

        warn!(
            "Specular atlas of {demanded}x{demanded} exceeds the texture limit \
             of {max_size}; reducing cache capacity from {} to {capacity}",
            config.max_cache_count
        );

        Self {
            capacity,
            size: max_size,
            tile_size,
            mips,
        }
    }

    pub(crate) fn serialize(&self) -> gpu::SpecularAtlas {
        gpu::SpecularAtlas::new(self.size, self.tile_size)
    }
}

fn prev_power_of_two(n: u32) -> u32 {
    if n.is_power_of_two() {
        n
    } else {
        n.next_power_of_two() / 2
    }
}
