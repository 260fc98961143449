use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("couldn't read shader `{}`", path.display())]
    ShaderIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("shader `{}` is not a valid SPIR-V module", path.display())]
    InvalidShader { path: PathBuf },

    #[error("couldn't map the readback buffer")]
    ReadbackFailed,
}
