use log::debug;

use crate::{CacheBuffers, LightCacheConfig, Shaders};

macro_rules! passes {
    ([ $( $name:ident => $class:ident, )* ]) => {
        $( mod $name; )*
        $( pub use self::$name::*; )*

        #[derive(Debug)]
        pub struct CachePasses {
            $( pub $name: $class, )*
        }

        impl CachePasses {
            pub fn new(
                device: &wgpu::Device,
                shaders: &Shaders,
                config: &LightCacheConfig,
                buffers: &CacheBuffers,
            ) -> Self {
                debug!("Initializing cache passes");

                Self {
                    $( $name: $class::new(device, shaders, config, buffers), )*
                }
            }
        }
    };
}

passes!([
    atlas_downsample => AtlasDownsamplePass,
    atlas_fill => AtlasFillPass,
    cache_apply => CacheApplyPass,
    cache_gather => CacheGatherPass,
    cache_lighting => CacheLightingPass,
    cache_prepare => CachePreparePass,
]);
