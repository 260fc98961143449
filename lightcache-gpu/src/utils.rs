mod f32_ext;

use spirv_std::Image;

pub use self::f32_ext::*;

pub type Tex3d<'a> = &'a Image!(3D, type = f32, sampled);
pub type TexArray<'a> = &'a Image!(2D, type = f32, sampled, arrayed);
pub type TexSampled<'a> = &'a Image!(2D, type = f32, sampled);
pub type TexRgba16<'a> = &'a Image!(2D, format = rgba16f, sampled = false);
pub type TexRgba32<'a> = &'a Image!(2D, format = rgba32f, sampled = false);
