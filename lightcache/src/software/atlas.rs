use derivative::Derivative;
use glam::{UVec2, Vec4};

use crate::gpu;

/// Single mip-level of the specular atlas.
#[derive(Clone, PartialEq, Derivative)]
#[derivative(Debug)]
pub struct AtlasLevel {
    size: u32,

    #[derivative(Debug = "ignore")]
    texels: Vec<Vec4>,
}

impl AtlasLevel {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            texels: vec![Vec4::ZERO; (size * size) as usize],
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    fn idx(&self, texel: UVec2) -> usize {
        assert!(
            texel.x < self.size && texel.y < self.size,
            "texel {texel} out of bounds ({})",
            self.size
        );

        (texel.y * self.size + texel.x) as usize
    }
}

impl gpu::AtlasImage for AtlasLevel {
    fn load(&self, texel: UVec2) -> Vec4 {
        self.texels[self.idx(texel)]
    }

    fn store(&mut self, texel: UVec2, val: Vec4) {
        let idx = self.idx(texel);

        self.texels[idx] = val;
    }
}
