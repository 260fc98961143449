mod bind_group;
mod bindable;
mod mapped_storage_buffer;
mod mapped_uniform_buffer;
mod readback_buffer;
mod texture;
mod unmapped_storage_buffer;
mod utils;

pub use self::bind_group::*;
pub use self::bindable::*;
pub use self::mapped_storage_buffer::*;
pub use self::mapped_uniform_buffer::*;
pub use self::readback_buffer::*;
pub use self::texture::*;
pub use self::unmapped_storage_buffer::*;
