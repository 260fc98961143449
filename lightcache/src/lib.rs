//! Sparse, world-space light cache: indirect lighting computed for a set of
//! world-space sample points ("caches") that's rebuilt every frame out of
//! whatever the camera currently sees.
//!
//! Per frame, the caches go through:
//!
//! - gathering (every visible pixel requests a cache for its cell of the
//!   cascaded address volume),
//! - lighting (each cache integrates VPLs of the spot-lights' RSMs into
//!   spherical harmonics and, optionally, into its tile of the specular
//!   atlas),
//! - atlas filling (mip-mapping plus pull-push hole filling),
//! - applying (every pixel reads back the cache(s) of its cell(s)).
//!
//! [`Engine`] drives all of this on the GPU, while [`SoftwarePipeline`] runs
//! the very same kernels on the CPU.

mod buffers;
mod config;
mod engine;
mod error;
mod frame;
mod shaders;
mod software;
mod stats;

pub use lightcache_gpu as gpu;

pub use self::buffers::*;
pub use self::config::*;
pub use self::engine::*;
pub use self::error::*;
pub use self::frame::*;
pub use self::shaders::*;
pub use self::software::*;
pub use self::stats::*;
