use core::f32::consts::PI;

use glam::{vec3, UVec2, Vec3, Vec4};

use crate::{CacheEntry, CacheIndex, CascadeCell, GBufferEntry, Globals};

/// Computes indirect lighting reflected by given pixel's surface, as read
/// from the cache(s) of its cell(s).
///
/// Cells without a cache contribute nothing; when blending between two
/// cascades and only one of them has a cache, that one takes the full
/// weight.
pub fn apply(
    gbuffer: GBufferEntry,
    globals: &Globals,
    addresses: impl Fn(u32) -> u32,
    entries: impl Fn(CacheIndex) -> CacheEntry,
    atlas: impl Fn(UVec2, u32) -> Vec4,
) -> Vec3 {
    if !gbuffer.is_some() {
        return Vec3::ZERO;
    }

    let selection = globals.volume.select(gbuffer.position);

    let primary = eval_cell(
        selection.primary,
        gbuffer,
        globals,
        &addresses,
        &entries,
        &atlas,
    );

    let secondary = if selection.is_blended() {
        eval_cell(
            selection.secondary,
            gbuffer,
            globals,
            &addresses,
            &entries,
            &atlas,
        )
    } else {
        CellLighting::default()
    };

    let primary_weight = if primary.is_some {
        selection.primary_weight
    } else {
        0.0
    };

    let secondary_weight = if secondary.is_some {
        1.0 - selection.primary_weight
    } else {
        0.0
    };

    let weight_sum = primary_weight + secondary_weight;

    let mut color = if weight_sum > 0.0 {
        let irradiance = (primary.irradiance * primary_weight
            + secondary.irradiance * secondary_weight)
            / weight_sum;

        let specular = (primary.specular * primary_weight
            + secondary.specular * secondary_weight)
            / weight_sum;

        let f0 = Vec3::splat(0.04).lerp(gbuffer.albedo, gbuffer.metallic);

        gbuffer.albedo / PI * irradiance + specular * f0
    } else {
        Vec3::ZERO
    };

    if globals.has(Globals::SHOW_CASCADES) {
        color = color.lerp(cascade_tint(selection.primary.cascade), 0.5);
    }

    color
}

#[derive(Clone, Copy, Default)]
struct CellLighting {
    irradiance: Vec3,
    specular: Vec3,
    is_some: bool,
}

fn eval_cell(
    cell: CascadeCell,
    gbuffer: GBufferEntry,
    globals: &Globals,
    addresses: &impl Fn(u32) -> u32,
    entries: &impl Fn(CacheIndex) -> CacheEntry,
    atlas: &impl Fn(UVec2, u32) -> Vec4,
) -> CellLighting {
    let index = CacheIndex::from_cell(addresses(globals.volume.address(cell)));

    if index.is_none() {
        return CellLighting::default();
    }

    let entry = entries(index);

    let irradiance = entry
        .radiance()
        .irradiance(globals.sh_order(), gbuffer.normal);

    let specular = if globals.has(Globals::INDIRECT_SPECULAR) {
        let view = (gbuffer.position - globals.camera_position()).normalize();
        let reflected = view - 2.0 * view.dot(gbuffer.normal) * gbuffer.normal;
        let lod = globals.atlas.lod_for_roughness(gbuffer.roughness);

        globals.atlas.sample(index, reflected, lod, atlas)
    } else {
        Vec3::ZERO
    };

    CellLighting {
        irradiance,
        specular,
        is_some: true,
    }
}

fn cascade_tint(cascade: u32) -> Vec3 {
    if cascade == 0 {
        vec3(1.0, 0.0, 0.0)
    } else if cascade == 1 {
        vec3(0.0, 1.0, 0.0)
    } else if cascade == 2 {
        vec3(0.0, 0.0, 1.0)
    } else {
        vec3(1.0, 1.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::UVec4;

    use super::*;
    use crate::{AddressVolume, ShOrder, ShRgb, SpecularAtlas};

    fn globals() -> Globals {
        Globals {
            data: UVec4::new(64, 64, 100, ShOrder::FIRST),
            atlas: SpecularAtlas::new(64, 16),
            volume: AddressVolume::new(Vec3::ZERO, &[4.0, 8.0], 32, 2.0),
            ..Default::default()
        }
    }

    fn surface(x: f32) -> GBufferEntry {
        GBufferEntry {
            position: vec3(x, 0.0, 0.0),
            normal: Vec3::Y,
            albedo: vec3(0.5, 0.25, 1.0),
            roughness: 1.0,
            metallic: 0.0,
        }
    }

    /// Cache receiving irradiance of pi from every direction.
    fn lit_entry() -> CacheEntry {
        let mut sh = ShRgb::default();

        sh.coeffs[0] = Vec3::splat(2.0 * PI.sqrt());

        CacheEntry::new(Vec3::ZERO, Vec3::Y, 0, sh)
    }

    fn no_atlas(_: UVec2, _: u32) -> Vec4 {
        Vec4::ZERO
    }

    #[test]
    fn missing_caches() {
        let color =
            apply(surface(0.5), &globals(), |_| 0, |_| lit_entry(), no_atlas);

        assert_eq!(Vec3::ZERO, color);
    }

    #[test]
    fn single_cache() {
        let color =
            apply(surface(0.5), &globals(), |_| 1, |_| lit_entry(), no_atlas);

        assert_relative_eq!(color.x, 0.5, epsilon = 0.001);
        assert_relative_eq!(color.y, 0.25, epsilon = 0.001);
        assert_relative_eq!(color.z, 1.0, epsilon = 0.001);
    }

    #[test]
    fn blending_with_one_missing_cache() {
        let globals = globals();
        let surface = surface(1.75);
        let selection = globals.volume.select(surface.position);

        assert!(selection.is_blended());
        assert_relative_eq!(selection.primary_weight, 0.25, epsilon = 0.001);

        let coarse = globals.volume.address(selection.secondary);

        let color = apply(
            surface,
            &globals,
            |address| if address == coarse { 1 } else { 0 },
            |_| lit_entry(),
            no_atlas,
        );

        assert_relative_eq!(color.x, 0.5, epsilon = 0.001);
    }

    #[test]
    fn blending() {
        let globals = globals();
        let surface = surface(1.75);
        let selection = globals.volume.select(surface.position);
        let fine = globals.volume.address(selection.primary);

        let color = apply(
            surface,
            &globals,
            |address| if address == fine { 1 } else { 2 },
            |index| {
                if index.get() == 0 {
                    lit_entry()
                } else {
                    CacheEntry::default()
                }
            },
            no_atlas,
        );

        assert_relative_eq!(color.x, 0.5 * 0.25, epsilon = 0.001);
    }

    #[test]
    fn specular() {
        let mut globals = globals();

        globals.flags.x = Globals::INDIRECT_SPECULAR;

        let mut surface = surface(0.5);

        surface.albedo = Vec3::ONE;
        surface.metallic = 1.0;

        let color = apply(
            surface,
            &globals,
            |_| 1,
            |_| CacheEntry::default(),
            |_, _| Vec4::splat(2.0),
        );

        assert_relative_eq!(color.x, 2.0, epsilon = 0.001);
    }
}
