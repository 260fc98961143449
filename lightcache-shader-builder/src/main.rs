//! Compiles `lightcache-shaders` into SPIR-V modules, one per entry point,
//! and copies them into given directory as `<shader>.spv` - that's where
//! `lightcache::Shaders::load()` expects to find them.
//!
//! Usage: `cargo run --release -p lightcache-shader-builder -- <output-dir>`

use std::error::Error;
use std::path::{Path, PathBuf};
use std::{env, fs};

use spirv_builder::{Capability, MetadataPrintout, SpirvBuilder};

fn main() -> Result<(), Box<dyn Error>> {
    let out_dir = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .ok_or("missing argument: output directory")?;

    let crate_path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .ok_or("couldn't find workspace")?
        .join("lightcache-shaders");

    let result = SpirvBuilder::new(crate_path, "spirv-unknown-spv1.3")
        .multimodule(true)
        .print_metadata(MetadataPrintout::None)
        .capability(Capability::Int8)
        .build()?;

    fs::create_dir_all(&out_dir)?;

    for (shader_name, shader_path) in result.module.unwrap_multi() {
        let shader_id = shader_name.replace("::", "_");
        let shader_id = shader_id.strip_suffix("_main").unwrap_or(&shader_id);
        let target = out_dir.join(format!("{shader_id}.spv"));

        fs::copy(shader_path, &target)?;

        println!("{shader_name} -> {}", target.display());
    }

    Ok(())
}
