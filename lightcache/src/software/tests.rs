use std::collections::HashSet;
use std::f32::consts::PI;

use glam::{uvec2, vec3};

use super::*;
use crate::BoundingBox;

const VIEWPORT: u32 = 16;

fn surface(position: Vec3, normal: Vec3) -> gpu::GBufferEntry {
    gpu::GBufferEntry {
        position,
        normal,
        albedo: Vec3::ONE,
        roughness: 0.5,
        metallic: 0.0,
    }
}

/// Returns a `VIEWPORT x VIEWPORT` G-buffer whose pixels land in
/// `cells x cells` distinct cells of the finest cascade (none of them close
/// enough to the cascade's edge to get blended).
fn grid(cells: u32) -> Vec<gpu::GBufferEntry> {
    assert!(cells <= 16);

    (0..VIEWPORT)
        .flat_map(|y| (0..VIEWPORT).map(move |x| uvec2(x, y)))
        .map(|pixel| {
            let cell = (pixel % cells).as_vec2();

            surface(
                vec3(
                    -0.4375 + 0.125 * cell.x,
                    0.0625,
                    -0.4375 + 0.125 * cell.y,
                ),
                Vec3::Y,
            )
        })
        .collect()
}

fn frame<'a>(
    viewport_size: UVec2,
    gbuffer: &'a [gpu::GBufferEntry],
    lights: &'a [SoftwareLight],
    voxels: Option<&'a SoftwareVoxels>,
) -> SoftwareFrame<'a> {
    SoftwareFrame {
        camera_position: Vec3::ZERO,
        viewport_size,
        gbuffer,
        lights,
        voxels,
    }
}

/// Spot-light hanging above the floor (the `y = 0` plane) and pointing
/// straight at it.
fn floor_light() -> SoftwareLight {
    let desc = SpotLightDesc {
        position: vec3(0.0, 4.0, 0.0),
        direction: vec3(0.0, -1.0, 0.0),
        half_angle: PI / 4.0,
        near: 0.1,
        far: 50.0,
        rsm_read_lod: 3,
        shadow_block_lod: 1,
    };

    let rsm = SoftwareRsm::render(&desc, 64, |origin, dir| {
        if dir.y < 0.0 {
            gpu::RsmTexel {
                flux: Vec3::ONE,
                depth: -origin.y / dir.y,
                normal: Vec3::Y,
            }
        } else {
            Default::default()
        }
    });

    SoftwareLight { desc, rsm }
}

/// Returns indirect lighting of two surfaces sharing a single cell above the
/// floor - one facing the floor, the other facing away from it.
fn light_above_floor(
    config: LightCacheConfig,
    voxels: Option<&SoftwareVoxels>,
) -> (Vec3, Vec3) {
    let position = vec3(0.3, 1.0, 0.2);

    let gbuffer = [
        surface(position, vec3(0.0, -1.0, 0.0)),
        surface(position, Vec3::Y),
    ];

    let lights = [floor_light()];

    let output = SoftwarePipeline::new(config).render(&frame(
        uvec2(2, 1),
        &gbuffer,
        &lights,
        voxels,
    ));

    assert_eq!(1, output.cache_count);

    (
        output.indirect_at(uvec2(0, 0)),
        output.indirect_at(uvec2(1, 0)),
    )
}

#[test]
fn no_lights() {
    let gbuffer = vec![surface(vec3(0.3, 0.0, 0.2), Vec3::Y); 16];

    let output = SoftwarePipeline::new(Default::default()).render(&frame(
        uvec2(4, 4),
        &gbuffer,
        &[],
        None,
    ));

    assert_eq!(1, output.cache_count);
    assert!(output.indirect.iter().all(|&color| color == Vec3::ZERO));
}

#[test]
fn empty_pixels() {
    let gbuffer = vec![gpu::GBufferEntry::default(); 16];

    let output = SoftwarePipeline::new(Default::default()).render(&frame(
        uvec2(4, 4),
        &gbuffer,
        &[],
        None,
    ));

    assert_eq!(0, output.cache_count);
    assert_eq!(UVec3::new(0, 1, 1), output.dispatch_size);
    assert!(output.entries.is_empty());
    assert!(output.addresses.iter().all(|&cell| cell == 0));
}

#[test]
fn static_point() {
    let pos = vec3(0.3, 0.0, 0.2);
    let gbuffer = vec![surface(pos, Vec3::Y); 16];
    let target = SoftwarePipeline::new(Default::default());
    let mut prev_address = None;

    for _ in 0..3 {
        let output = target.render(&frame(uvec2(4, 4), &gbuffer, &[], None));
        let volume = output.globals.volume;
        let address = volume.address(volume.resolve(pos));

        assert_eq!(0, output.cache_at(pos).get());
        assert_eq!(1, output.addresses[address as usize]);

        if let Some(prev_address) = prev_address {
            assert_eq!(prev_address, address);
        }

        prev_address = Some(address);
    }
}

#[test]
fn deduplication() {
    let gbuffer = grid(8);

    let output = SoftwarePipeline::new(Default::default())
        .with_workers(4)
        .render(&frame(uvec2(VIEWPORT, VIEWPORT), &gbuffer, &[], None));

    assert_eq!(64, output.cache_count);
    assert_eq!(64, output.entries.len());
    assert_eq!(UVec3::new(1, 1, 1), output.dispatch_size);
    assert_eq!(64, output.debug_draw.instance_count);
    assert_eq!(36, output.debug_draw.index_count);

    let indices: HashSet<_> = output
        .addresses
        .iter()
        .map(|&cell| gpu::CacheIndex::from_cell(cell))
        .filter(|index| index.is_some())
        .map(|index| index.get())
        .collect();

    assert_eq!((0..64).collect::<HashSet<_>>(), indices);

    // Each cache is positioned at the center of its cell
    for gbuffer in &gbuffer {
        let index = output.cache_at(gbuffer.position);
        let entry = output.entries[index.get() as usize];

        assert_eq!(gbuffer.position, entry.position());
        assert_eq!(0, entry.cascade());
    }
}

#[test]
fn capacity() {
    let mut config = LightCacheConfig::default();

    config.set_max_cache_count(100);

    let gbuffer = grid(16);

    let output = SoftwarePipeline::new(config)
        .with_workers(4)
        .render(&frame(uvec2(VIEWPORT, VIEWPORT), &gbuffer, &[], None));

    assert_eq!(100, output.cache_count);
    assert_eq!(100, output.entries.len());
    assert_eq!(UVec3::new(2, 1, 1), output.dispatch_size);

    let published: Vec<_> = output
        .addresses
        .iter()
        .map(|&cell| gpu::CacheIndex::from_cell(cell))
        .filter(|index| index.is_some())
        .collect();

    assert_eq!(100, published.len());
    assert!(published.iter().all(|index| index.get() < 100));

    // Cells that didn't get a cache stay reserved until the next frame
    let reserved = output
        .addresses
        .iter()
        .filter(|&&cell| cell == gpu::CacheIndex::CELL_RESERVED)
        .count();

    assert_eq!(256 - 100, reserved);
}

#[test]
fn lit_floor() {
    let (facing, facing_away) =
        light_above_floor(LightCacheConfig::default(), None);

    assert!(facing.x > 0.0);
    assert_eq!(facing.x, facing.y);
    assert_eq!(facing.x, facing.z);
    assert!(facing.x > 2.0 * facing_away.x);
}

#[test]
fn indirect_shadow() {
    let (unshadowed, _) =
        light_above_floor(LightCacheConfig::default(), None);

    // Slab hanging between the floor and the surfaces
    let voxels = SoftwareVoxels::new(
        BoundingBox::new(Vec3::splat(-4.0), Vec3::splat(4.0)),
        32,
        |pos| {
            if pos.y > 0.2 && pos.y < 0.8 {
                1.0
            } else {
                0.0
            }
        },
    );

    let (shadowed, _) =
        light_above_floor(LightCacheConfig::default(), Some(&voxels));

    assert!(shadowed.x < 0.5 * unshadowed.x);

    let mut config = LightCacheConfig::default();

    config.set_indirect_shadow(false);

    let (ignored, _) = light_above_floor(config, Some(&voxels));

    assert_eq!(unshadowed, ignored);
}

fn specular_config() -> LightCacheConfig {
    let mut config = LightCacheConfig::default();

    config.set_max_cache_count(64);
    config.set_specular_tile_size(8);
    config.set_max_fill_holes_level(2);
    config.set_indirect_specular(true);
    config
}

fn assert_filled(output: &SoftwareOutput, max_level: u32) {
    let atlas = output.globals.atlas;

    for level in 0..=max_level {
        for texel in active_texels(&atlas, level, output.cache_count) {
            assert!(
                gpu::AtlasTexel::is_defined(
                    output.atlas[level as usize].load(texel)
                ),
                "texel {texel} at level {level} remained a hole"
            );
        }
    }
}

#[test]
fn holes_inherit_nearest_ancestor() {
    // Single 8x8 tile, with light arriving from two directions only
    let atlas = gpu::SpecularAtlas::new(8, 8);
    let mut level0 = AtlasLevel::new(8);

    level0.store(uvec2(0, 0), Vec4::new(1.0, 2.0, 3.0, 1.0));
    level0.store(uvec2(7, 7), Vec4::new(4.0, 4.0, 4.0, 2.0));

    let before = downsample_atlas(&atlas, 1, level0);
    let mut after = before.clone();

    fill_atlas_holes(&atlas, 1, 2, &mut after);

    for texel in active_texels(&atlas, 0, 1) {
        let written = before[0].load(texel);

        let expected = if gpu::AtlasTexel::is_defined(written) {
            written
        } else {
            (1..=2)
                .map(|level| before[level].load(texel / (1u32 << level)))
                .find(|&ancestor| gpu::AtlasTexel::is_defined(ancestor))
                .map(|ancestor| ancestor.truncate().extend(1.0))
                .unwrap_or(gpu::AtlasTexel::NEUTRAL)
        };

        assert_eq!(expected, after[0].load(texel), "texel {texel}");
    }

    // Parent of this texel (at level 1) is a hole, so the value has to come
    // from level 2
    assert!(!gpu::AtlasTexel::is_defined(before[1].load(uvec2(1, 0))));

    assert_eq!(
        Vec4::new(1.0, 2.0, 3.0, 1.0),
        after[0].load(uvec2(2, 0))
    );

    // Levels past the filled ones stay as downsampled
    assert_eq!(before[3], after[3]);
}

#[test]
fn atlas_is_filled() {
    let gbuffer = grid(8);
    let lights = [floor_light()];

    let output = SoftwarePipeline::new(specular_config()).render(&frame(
        uvec2(VIEWPORT, VIEWPORT),
        &gbuffer,
        &lights,
        None,
    ));

    assert_eq!(64, output.cache_count);
    assert_eq!(4, output.atlas.len());
    assert_eq!(64, output.atlas[0].size());
    assert_eq!(8, output.atlas[3].size());

    assert_filled(&output, 2);
}

#[test]
fn atlas_without_light() {
    let gbuffer = grid(8);

    for direct_write in [true, false] {
        let mut config = specular_config();

        config.set_specular_direct_write(direct_write);

        let output = SoftwarePipeline::new(config).render(&frame(
            uvec2(VIEWPORT, VIEWPORT),
            &gbuffer,
            &[],
            None,
        ));

        assert_filled(&output, 2);

        for texel in active_texels(&output.globals.atlas, 0, 64) {
            assert_eq!(gpu::AtlasTexel::NEUTRAL, output.atlas[0].load(texel));
        }

        assert!(output.indirect.iter().all(|&color| color == Vec3::ZERO));
    }
}

#[test]
fn specular_disabled() {
    let gbuffer = grid(4);
    let lights = [floor_light()];

    let output = SoftwarePipeline::new(Default::default()).render(&frame(
        uvec2(VIEWPORT, VIEWPORT),
        &gbuffer,
        &lights,
        None,
    ));

    assert_eq!(16, output.cache_count);
    assert!(output.atlas.is_empty());
}
