use bytemuck::{Pod, Zeroable};
use glam::{UVec3, Vec3, Vec4, Vec4Swizzles};
use spirv_std::arch::IndexUnchecked;
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{F32Ext, MAX_CASCADES};

/// Axis-aligned, camera-following box of cells at a single resolution level.
#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct Cascade {
    /// x, y, z - minimum corner of the storage box (snapped to the grid)
    /// w - voxel size
    pub d0: Vec4,

    /// x, y, z - maximum corner of the storage box
    /// w - unused
    pub d1: Vec4,

    /// x, y, z - minimum corner of the decision box
    /// w - unused
    pub d2: Vec4,

    /// x, y, z - maximum corner of the decision box
    /// w - unused
    pub d3: Vec4,
}

impl Cascade {
    /// How much (in voxels) the decision box is shrunk compared to the
    /// storage box, so that points it accepts never land outside of the
    /// storage box, no matter how the snapping went.
    pub const DECISION_MARGIN: f32 = 1.5;

    pub fn new(camera: Vec3, world_size: f32, resolution: u32) -> Self {
        let voxel_size = world_size / resolution as f32;
        let half_size = world_size * 0.5;
        let snapped = (camera / voxel_size).round() * voxel_size;
        let margin = voxel_size * Self::DECISION_MARGIN;

        Self {
            d0: (snapped - half_size).extend(voxel_size),
            d1: (snapped + half_size).extend(0.0),
            d2: (camera - half_size + margin).extend(0.0),
            d3: (camera + half_size - margin).extend(0.0),
        }
    }

    pub fn min(&self) -> Vec3 {
        self.d0.xyz()
    }

    pub fn max(&self) -> Vec3 {
        self.d1.xyz()
    }

    pub fn voxel_size(&self) -> f32 {
        self.d0.w
    }

    pub fn decision_min(&self) -> Vec3 {
        self.d2.xyz()
    }

    pub fn decision_max(&self) -> Vec3 {
        self.d3.xyz()
    }

    /// Returns whether this cascade is responsible for storing given point
    /// (assuming no finer cascade claimed it first).
    pub fn decides(&self, pos: Vec3) -> bool {
        pos.cmpge(self.decision_min()).all()
            && pos.cmple(self.decision_max()).all()
    }

    /// Signed distance from `pos` to the closest face of the decision box;
    /// positive inside.
    pub fn decision_distance(&self, pos: Vec3) -> f32 {
        (pos - self.decision_min())
            .min(self.decision_max() - pos)
            .min_element()
    }

    pub fn cell(&self, pos: Vec3, resolution: u32) -> UVec3 {
        let cell = ((pos - self.min()) / self.voxel_size()).floor();
        let max = (resolution - 1) as f32;

        cell.clamp(Vec3::ZERO, Vec3::splat(max)).as_uvec3()
    }

    pub fn cell_center(&self, cell: UVec3) -> Vec3 {
        self.min() + (cell.as_vec3() + 0.5) * self.voxel_size()
    }
}

/// Cell of a specific cascade.
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct CascadeCell {
    pub cascade: u32,
    pub cell: UVec3,
}

/// Cell (or pair of cells, when blending between two cascades) responsible
/// for given point.
#[derive(Clone, Copy)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct CascadeSelection {
    pub primary: CascadeCell,
    pub secondary: CascadeCell,

    /// Weight of the primary cell; the secondary one gets `1 - weight`
    pub primary_weight: f32,
}

impl CascadeSelection {
    pub fn is_blended(&self) -> bool {
        self.primary_weight < 1.0
    }
}

/// Set of nested cascades plus the mapping from their cells into the flat
/// address volume.
///
/// The address volume is laid out as a single 3D grid of
/// `(resolution * cascade_count) x resolution x resolution` cells, with the
/// cascades placed side by side along the x axis.
#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct AddressVolume {
    /// Cascades, from the finest one; only the first `len()` are valid
    pub cascades: [Cascade; MAX_CASCADES],

    /// x - per-cascade resolution (as u32)
    /// y - number of cascades (as u32)
    /// z - size of the transition zone, in voxels of the finer cascade
    /// w - unused
    pub data: Vec4,
}

impl AddressVolume {
    #[cfg(not(target_arch = "spirv"))]
    pub fn new(
        camera: Vec3,
        world_sizes: &[f32],
        resolution: u32,
        transition_size: f32,
    ) -> Self {
        assert!(!world_sizes.is_empty() && world_sizes.len() <= MAX_CASCADES);
        assert!(resolution > 0);

        let mut cascades = [Cascade::default(); MAX_CASCADES];

        for (cascade, &world_size) in cascades.iter_mut().zip(world_sizes) {
            *cascade = Cascade::new(camera, world_size, resolution);
        }

        Self {
            cascades,
            data: Vec4::new(
                f32::from_bits(resolution),
                f32::from_bits(world_sizes.len() as u32),
                transition_size,
                0.0,
            ),
        }
    }

    pub fn resolution(&self) -> u32 {
        self.data.x.to_bits()
    }

    pub fn len(&self) -> u32 {
        self.data.y.to_bits()
    }

    pub fn transition_size(&self) -> f32 {
        self.data.z
    }

    /// Total number of cells, across all cascades.
    pub fn cell_count(&self) -> u32 {
        self.resolution().pow(3) * self.len()
    }

    pub fn cascade(&self, id: u32) -> Cascade {
        unsafe { *self.cascades.index_unchecked(id as usize) }
    }

    /// Returns the finest cascade whose decision box contains given point,
    /// falling back to the coarsest one.
    pub fn select_cascade(&self, pos: Vec3) -> u32 {
        let mut id = 0;

        while id + 1 < self.len() {
            if self.cascade(id).decides(pos) {
                return id;
            }

            id += 1;
        }

        self.len() - 1
    }

    pub fn resolve(&self, pos: Vec3) -> CascadeCell {
        let cascade = self.select_cascade(pos);

        CascadeCell {
            cascade,
            cell: self.cascade(cascade).cell(pos, self.resolution()),
        }
    }

    /// Like [`Self::resolve()`], but when the point lies close to the edge of
    /// its cascade's decision box, also returns the matching cell of the next
    /// (coarser) cascade, together with weights that fade linearly from the
    /// finer cascade into the coarser one.
    pub fn select(&self, pos: Vec3) -> CascadeSelection {
        let primary = self.resolve(pos);
        let transition_size = self.transition_size();

        if transition_size > 0.0 && primary.cascade + 1 < self.len() {
            let fine = self.cascade(primary.cascade);

            let weight = (fine.decision_distance(pos)
                / (transition_size * fine.voxel_size()))
            .saturate();

            if weight < 1.0 {
                let cascade = primary.cascade + 1;

                return CascadeSelection {
                    primary,
                    secondary: CascadeCell {
                        cascade,
                        cell: self
                            .cascade(cascade)
                            .cell(pos, self.resolution()),
                    },
                    primary_weight: weight,
                };
            }
        }

        CascadeSelection {
            primary,
            secondary: primary,
            primary_weight: 1.0,
        }
    }

    pub fn address(&self, cell: CascadeCell) -> u32 {
        let res = self.resolution();
        let width = res * self.len();

        (cell.cell.z * res + cell.cell.y) * width
            + cell.cascade * res
            + cell.cell.x
    }

    /// See: [`Self::address()`].
    pub fn cell_at(&self, address: u32) -> CascadeCell {
        let res = self.resolution();
        let width = res * self.len();
        let x = address % width;
        let yz = address / width;

        CascadeCell {
            cascade: x / res,
            cell: UVec3::new(x % res, yz % res, yz / res),
        }
    }

    pub fn cell_center(&self, cell: CascadeCell) -> Vec3 {
        self.cascade(cell.cascade).cell_center(cell.cell)
    }
}
