use core::f32::consts::PI;

use glam::Vec3;

/// Number of coefficients stored per cache - enough for second-order
/// spherical harmonics; first-order ones simply use the first four.
pub const SH_MAX_COEFFS: usize = 9;

/// Order of spherical harmonics used to represent incoming radiance.
pub struct ShOrder;

impl ShOrder {
    /// Bands 0 and 1 (4 coefficients)
    pub const FIRST: u32 = 1;

    /// Bands 0, 1 and 2 (9 coefficients)
    pub const SECOND: u32 = 2;

    pub fn coeff_count(order: u32) -> usize {
        if order >= Self::SECOND {
            9
        } else {
            4
        }
    }
}

/// Real spherical-harmonics basis evaluated in given direction.
pub fn sh_basis(dir: Vec3) -> [f32; SH_MAX_COEFFS] {
    // 1 / (2 sqrt(pi))
    const C0: f32 = 0.282_094_8;
    // sqrt(3) / (2 sqrt(pi))
    const C1: f32 = 0.488_602_5;
    // sqrt(15 / (4 pi))
    const C2: f32 = 1.092_548_4;
    // sqrt(5 / (16 pi))
    const C3: f32 = 0.315_391_57;
    // sqrt(15 / (16 pi))
    const C4: f32 = 0.546_274_2;

    [
        C0,
        C1 * dir.y,
        C1 * dir.z,
        C1 * dir.x,
        C2 * dir.x * dir.y,
        C2 * dir.y * dir.z,
        C3 * (3.0 * dir.z * dir.z - 1.0),
        C2 * dir.x * dir.z,
        C4 * (dir.x * dir.x - dir.y * dir.y),
    ]
}

/// Convolution of each band with the clamped-cosine lobe.
fn band_factor(coeff: usize) -> f32 {
    if coeff == 0 {
        PI
    } else if coeff < 4 {
        2.0 * PI / 3.0
    } else {
        PI / 4.0
    }
}

/// Radiance projected onto spherical harmonics, per color channel.
#[derive(Clone, Copy, Default)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct ShRgb {
    pub coeffs: [Vec3; SH_MAX_COEFFS],
}

impl ShRgb {
    /// Projects radiance arriving from `dir` onto the basis.
    pub fn add(&mut self, order: u32, dir: Vec3, radiance: Vec3) {
        let basis = sh_basis(dir);
        let count = ShOrder::coeff_count(order);
        let mut i = 0;

        while i < count {
            self.coeffs[i] += radiance * basis[i];
            i += 1;
        }
    }

    /// Irradiance received by a surface oriented towards `normal`.
    pub fn irradiance(&self, order: u32, normal: Vec3) -> Vec3 {
        let basis = sh_basis(normal);
        let count = ShOrder::coeff_count(order);
        let mut out = Vec3::ZERO;
        let mut i = 0;

        while i < count {
            out += self.coeffs[i] * (band_factor(i) * basis[i]);
            i += 1;
        }

        // Low-order projections ring on the side facing away from the light
        out.max(Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::vec3;

    use super::*;

    #[test]
    fn single_direction() {
        let dir = vec3(0.3, 0.8, -0.52).normalize();

        for (order, expected) in
            [(ShOrder::FIRST, 0.75), (ShOrder::SECOND, 1.0625)]
        {
            let mut sh = ShRgb::default();

            sh.add(order, dir, Vec3::ONE);

            let facing = sh.irradiance(order, dir);

            assert_relative_eq!(facing.x, expected, epsilon = 0.001);
            assert_relative_eq!(facing.y, expected, epsilon = 0.001);
            assert_relative_eq!(facing.z, expected, epsilon = 0.001);
            assert!(sh.irradiance(order, -dir).max_element() < 0.1);
        }
    }

    #[test]
    fn uniform_radiance() {
        // Integrating constant radiance of 1 over the sphere yields pi worth
        // of irradiance in every direction
        let mut sh = ShRgb::default();
        let n = 64;

        for i in 0..n {
            for j in 0..(2 * n) {
                let theta = PI * (i as f32 + 0.5) / n as f32;
                let phi = PI * (j as f32 + 0.5) / n as f32;

                let dir = vec3(
                    theta.sin() * phi.cos(),
                    theta.cos(),
                    theta.sin() * phi.sin(),
                );

                let solid_angle =
                    theta.sin() * (PI / n as f32) * (PI / n as f32);

                sh.add(ShOrder::SECOND, dir, Vec3::splat(solid_angle));
            }
        }

        for normal in [Vec3::X, Vec3::NEG_Y, vec3(1.0, 1.0, -1.0).normalize()]
        {
            let irr = sh.irradiance(ShOrder::SECOND, normal);

            assert_relative_eq!(irr.x, PI, epsilon = 0.01);
        }
    }

    #[test]
    fn first_order_ignores_second_band() {
        let mut sh = ShRgb::default();

        sh.add(ShOrder::FIRST, Vec3::Y, Vec3::ONE);

        assert!(sh.coeffs[4..].iter().all(|c| *c == Vec3::ZERO));
    }
}
