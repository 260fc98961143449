#![cfg_attr(target_arch = "spirv", no_std)]

pub mod atlas_downsample;
pub mod atlas_fill;
pub mod atlas_seed;
pub mod cache_apply;
pub mod cache_gather;
pub mod cache_lighting;
pub mod cache_prepare;
