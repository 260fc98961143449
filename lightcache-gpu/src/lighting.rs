use glam::{uvec2, UVec2, Vec3, Vec4};

use crate::{
    AtlasImage, AtlasTexel, CacheEntry, CacheHeader, CacheIndex, Globals,
    RsmTexel, ShRgb, SpotLight,
};

/// Computes incoming radiance of a single cache, as lit by VPLs of given
/// spot-light.
///
/// Each read texel of the light's RSM acts as a VPL; VPLs are processed in
/// square blocks that share a single visibility trace (towards the block's
/// center), which keeps the cost of indirect shadows manageable.
///
/// When the specular atlas is enabled, this also writes the VPLs into the
/// cache's tile (or, without direct writes, just clears the tile so that the
/// fill pass can give it neutral values).
pub fn light_cache(
    index: CacheIndex,
    header: CacheHeader,
    prev: CacheEntry,
    accumulate: bool,
    globals: &Globals,
    light: &SpotLight,
    rsm: impl Fn(UVec2) -> RsmTexel,
    occupancy: impl Fn(Vec3, f32) -> f32,
    atlas: &mut impl AtlasImage,
) -> CacheEntry {
    let cell = globals.volume.cell_at(header.address);
    let cascade = globals.volume.cascade(cell.cascade);
    let position = cascade.cell_center(cell.cell);
    let voxel_size = cascade.voxel_size();
    let order = globals.sh_order();

    let mut sh = if accumulate {
        prev.radiance()
    } else {
        ShRgb::default()
    };

    let specular = globals.has(Globals::INDIRECT_SPECULAR);

    let specular_write =
        specular && globals.has(Globals::SPECULAR_DIRECT_WRITE);

    if specular && !accumulate {
        clear_tile(globals, index, atlas);
    }

    if light.is_some() {
        let resolution = light.read_resolution();
        let block_size = light.shadow_block_size();
        let shadows = globals.has(Globals::INDIRECT_SHADOW);
        let min_distance = voxel_size * 0.5;

        // Start traces slightly off the surface, so that it doesn't occlude
        // itself
        let origin = position + header.normal * voxel_size * 0.5;

        let mut block_y = 0;

        while block_y < resolution {
            let mut block_x = 0;

            while block_x < resolution {
                let visibility = if shadows {
                    let center = uvec2(block_x, block_y) + block_size / 2;
                    let center = center.min(UVec2::splat(resolution - 1));
                    let texel = rsm(center);

                    if texel.is_some() {
                        globals.voxels.trace_visibility(
                            origin,
                            light.vpl(center, texel).position,
                            &occupancy,
                        )
                    } else {
                        1.0
                    }
                } else {
                    1.0
                };

                if visibility > 0.0 {
                    let end_x = (block_x + block_size).min(resolution);
                    let end_y = (block_y + block_size).min(resolution);
                    let mut y = block_y;

                    while y < end_y {
                        let mut x = block_x;

                        while x < end_x {
                            let texel = uvec2(x, y);
                            let rsm_texel = rsm(texel);

                            if rsm_texel.is_some() {
                                let (dir, radiance) = light
                                    .vpl(texel, rsm_texel)
                                    .eval(position, min_distance);

                                let radiance = radiance * visibility;

                                sh.add(order, dir, radiance);

                                if specular_write {
                                    let texel = globals
                                        .atlas
                                        .texel_for_direction(index, dir, 0);

                                    atlas.store(
                                        texel,
                                        AtlasTexel::accumulate(
                                            atlas.load(texel),
                                            radiance,
                                        ),
                                    );
                                }
                            }

                            x += 1;
                        }

                        y += 1;
                    }
                }

                block_x += block_size;
            }

            block_y += block_size;
        }
    }

    CacheEntry::new(position, header.normal, cell.cascade, sh)
}

fn clear_tile(
    globals: &Globals,
    index: CacheIndex,
    atlas: &mut impl AtlasImage,
) {
    let origin = globals.atlas.tile_origin(index, 0);
    let tile_size = globals.atlas.tile_size();
    let mut y = 0;

    while y < tile_size {
        let mut x = 0;

        while x < tile_size {
            atlas.store(origin + uvec2(x, y), Vec4::ZERO);
            x += 1;
        }

        y += 1;
    }
}
