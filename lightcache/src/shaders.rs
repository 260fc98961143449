use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::Error;

macro_rules! shaders {
    ([ $( $name:ident, )* ]) => {
        /// Compiled shader modules, together with their entry points.
        #[derive(Debug)]
        pub struct Shaders {
            $( pub $name: (wgpu::ShaderModule, &'static str), )*
        }

        impl Shaders {
            /// Loads shaders produced by `lightcache-shader-builder` from
            /// given directory, where each entry point lives in its own
            /// `<name>.spv` file.
            pub fn load(
                device: &wgpu::Device,
                dir: impl AsRef<Path>,
            ) -> Result<Self, Error> {
                let dir = dir.as_ref();

                info!("Loading shaders from `{}`", dir.display());

                Ok(Self {
                    $(
                        $name: (
                            load(device, dir, stringify!($name))?,
                            concat!(stringify!($name), "::main"),
                        ),
                    )*
                })
            }
        }
    };
}

shaders!([
    atlas_downsample,
    atlas_fill,
    atlas_seed,
    cache_apply,
    cache_gather,
    cache_lighting,
    cache_prepare,
]);

const SPIRV_MAGIC: u32 = 0x07230203;

fn load(
    device: &wgpu::Device,
    dir: &Path,
    name: &str,
) -> Result<wgpu::ShaderModule, Error> {
    let path = dir.join(format!("{name}.spv"));

    debug!("Loading shader: {}", path.display());

    let bytes = fs::read(&path).map_err(|source| Error::ShaderIo {
        path: path.clone(),
        source,
    })?;

    if !is_spirv(&bytes) {
        return Err(Error::InvalidShader { path });
    }

    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("lightcache_{name}")),
        source: wgpu::util::make_spirv(&bytes),
    }))
}

/// Checks what [`wgpu::util::make_spirv()`] would otherwise panic on.
fn is_spirv(bytes: &[u8]) -> bool {
    bytes.len() >= 20
        && bytes.len() % 4 == 0
        && u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
            == SPIRV_MAGIC
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spirv_detection() {
        let mut module = SPIRV_MAGIC.to_le_bytes().to_vec();

        module.extend([0; 16]);

        assert!(is_spirv(&module));
        assert!(!is_spirv(&module[..18]));
        assert!(!is_spirv(b"#version 450\nvoid main() {}\n...."));
        assert!(!is_spirv(&[]));

        let wgpu::ShaderSource::SpirV(words) = wgpu::util::make_spirv(&module)
        else {
            panic!("module wasn't recognized as SPIR-V");
        };

        assert_eq!(5, words.len());
        assert_eq!(SPIRV_MAGIC, words[0]);
    }
}
