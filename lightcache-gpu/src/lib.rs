//! Data layouts and kernels shared by the light cache's shaders and its
//! host-side renderer.
//!
//! Everything in here compiles both for SPIR-V (through rust-gpu) and for the
//! host, where the very same kernels are driven by the software pipeline.

#![cfg_attr(target_arch = "spirv", no_std)]
#![allow(clippy::len_without_is_empty)]
#![allow(clippy::manual_range_contains)]
#![allow(clippy::too_many_arguments)]

mod apply;
mod atlas;
mod atomics;
mod cache;
mod cascades;
mod gather;
mod gbuffer;
mod globals;
mod lighting;
mod normal;
mod passes;
mod rsm;
mod sh;
mod utils;
mod voxels;

pub use self::apply::*;
pub use self::atlas::*;
pub use self::atomics::*;
pub use self::cache::*;
pub use self::cascades::*;
pub use self::gather::*;
pub use self::gbuffer::*;
pub use self::globals::*;
pub use self::lighting::*;
pub use self::normal::*;
pub use self::passes::*;
pub use self::rsm::*;
pub use self::sh::*;
pub use self::utils::*;
pub use self::voxels::*;

pub mod prelude {
    pub use core::f32::consts::PI;

    pub use spirv_std::arch::IndexUnchecked;
    pub use spirv_std::glam::*;
    #[cfg(target_arch = "spirv")]
    pub use spirv_std::num_traits::Float;
    pub use spirv_std::{spirv, Image, Sampler};

    pub use crate::*;
}

/// Maximum number of cascades an address volume can hold.
pub const MAX_CASCADES: usize = 4;

/// Maximum number of spot-lights whose reflective shadow maps can be bound at
/// once (each one occupies a layer of the RSM texture arrays).
pub const MAX_LIGHTS: usize = 4;

/// Number of invocations per workgroup of the cache-lighting pass; the
/// prepare pass sizes the indirect dispatch using this.
pub const LIGHTING_WORKGROUP_SIZE: u32 = 64;

pub const LIGHTCACHE_EPSILON: f32 = 0.0001;
