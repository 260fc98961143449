use derivative::Derivative;
use glam::{UVec3, Vec3};

use crate::{gpu, BoundingBox};

/// Occupancy volume kept in memory, with its mip-chain.
#[derive(Clone, Debug)]
pub struct SoftwareVoxels {
    volume: gpu::VoxelVolume,
    mips: Vec<VoxelLevel>,
}

#[derive(Clone, Derivative)]
#[derivative(Debug)]
struct VoxelLevel {
    resolution: u32,

    #[derivative(Debug = "ignore")]
    occupancy: Vec<f32>,
}

impl VoxelLevel {
    fn idx(&self, voxel: UVec3) -> usize {
        let res = self.resolution as usize;

        (voxel.z as usize * res + voxel.y as usize) * res + voxel.x as usize
    }

    fn get(&self, voxel: UVec3) -> f32 {
        self.occupancy[self.idx(voxel.min(UVec3::splat(self.resolution - 1)))]
    }

    fn downsample(&self) -> Self {
        let resolution = (self.resolution / 2).max(1);
        let mut occupancy = Vec::with_capacity(resolution.pow(3) as usize);

        for z in 0..resolution {
            for y in 0..resolution {
                for x in 0..resolution {
                    let base = UVec3::new(x, y, z) * 2;
                    let mut sum = 0.0;

                    for dz in 0..2 {
                        for dy in 0..2 {
                            for dx in 0..2 {
                                sum += self.get(base + UVec3::new(dx, dy, dz));
                            }
                        }
                    }

                    occupancy.push(sum / 8.0);
                }
            }
        }

        Self {
            resolution,
            occupancy,
        }
    }
}

impl SoftwareVoxels {
    /// Voxelizes scene by evaluating `occupancy` at the centers of the
    /// voxels.
    pub fn new(
        bounds: BoundingBox,
        resolution: u32,
        occupancy: impl Fn(Vec3) -> f32,
    ) -> Self {
        let volume = bounds.voxelize(resolution);
        let voxel_size = volume.voxel_size();
        let mut level = Vec::with_capacity(resolution.pow(3) as usize);

        for z in 0..resolution {
            for y in 0..resolution {
                for x in 0..resolution {
                    let voxel = UVec3::new(x, y, z).as_vec3() + 0.5;

                    level.push(occupancy(volume.min() + voxel * voxel_size));
                }
            }
        }

        let mut mips = vec![VoxelLevel {
            resolution,
            occupancy: level,
        }];

        while let Some(last) = mips.last() {
            if last.resolution == 1 {
                break;
            }

            let next = last.downsample();

            mips.push(next);
        }

        Self { volume, mips }
    }

    pub fn volume(&self) -> gpu::VoxelVolume {
        self.volume
    }

    /// Samples occupancy at given texture coordinates, using the nearest
    /// voxel of the nearest mip-level.
    pub fn sample(&self, uvw: Vec3, lod: f32) -> f32 {
        let level = (lod.max(0.0).round() as usize).min(self.mips.len() - 1);
        let level = &self.mips[level];

        let voxel = (uvw.clamp(Vec3::ZERO, Vec3::ONE)
            * level.resolution as f32)
            .floor()
            .as_uvec3();

        level.get(voxel)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::vec3;

    use super::*;

    #[test]
    fn mips() {
        let bounds = BoundingBox::new(Vec3::ZERO, Vec3::splat(1.0));

        // Occupy the lower half of the volume
        let target = SoftwareVoxels::new(bounds, 8, |pos| {
            if pos.y < 0.5 {
                1.0
            } else {
                0.0
            }
        });

        assert_eq!(4, target.mips.len());

        assert_eq!(1.0, target.sample(vec3(0.5, 0.1, 0.5), 0.0));
        assert_eq!(0.0, target.sample(vec3(0.5, 0.9, 0.5), 0.0));
        assert_eq!(1.0, target.sample(vec3(0.5, 0.1, 0.5), 2.0));
        assert_relative_eq!(0.5, target.sample(vec3(0.5, 0.5, 0.5), 3.0));
        assert_relative_eq!(0.5, target.sample(vec3(0.5, 0.5, 0.5), 10.0));
    }
}
