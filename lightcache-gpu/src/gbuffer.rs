use glam::{Vec3, Vec4, Vec4Swizzles};

/// Per-pixel surface data, as rendered into the G-buffer by the rasterizer.
#[derive(Clone, Copy, Default)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct GBufferEntry {
    pub position: Vec3,
    pub normal: Vec3,
    pub albedo: Vec3,
    pub roughness: f32,
    pub metallic: f32,
}

impl GBufferEntry {
    /// Unpacks entry from the G-buffer's textures:
    ///
    /// - d0: world-space position, w set to 1.0 for pixels that hit a surface
    /// - d1: normal, roughness
    /// - d2: albedo, metallic
    ///
    /// Pixels without a surface yield `None`-like entries (see
    /// [`Self::is_some()`]).
    pub fn unpack([d0, d1, d2]: [Vec4; 3]) -> Self {
        if d0.w <= 0.0 {
            return Self::default();
        }

        Self {
            position: d0.xyz(),
            normal: d1.xyz().normalize_or_zero(),
            albedo: d2.xyz(),
            roughness: d1.w,
            metallic: d2.w,
        }
    }

    pub fn pack(self) -> [Vec4; 3] {
        let is_some = if self.is_some() { 1.0 } else { 0.0 };

        [
            self.position.extend(is_some),
            self.normal.extend(self.roughness),
            self.albedo.extend(self.metallic),
        ]
    }

    pub fn is_some(&self) -> bool {
        self.normal != Vec3::ZERO
    }
}
