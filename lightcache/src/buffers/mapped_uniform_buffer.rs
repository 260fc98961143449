use std::{any, mem};
use std::ops::{Deref, DerefMut};

use bytemuck::Pod;

use super::utils;
use crate::Bindable;

/// Single uniform value that's mirrored on the host; writing through
/// [`DerefMut`] marks it for re-upload on the next [`Self::flush()`].
#[derive(Debug)]
pub struct MappedUniformBuffer<T> {
    buffer: wgpu::Buffer,
    value: T,
    dirty: bool,
}

impl<T> MappedUniformBuffer<T>
where
    T: Pod + Default,
{
    pub fn new(device: &wgpu::Device, label: &str) -> Self {
        let size = padded_size::<T>();

        log::info!(
            "Allocating uniform `{label}`; ty={}, size={size}",
            any::type_name::<T>()
        );

        Self {
            buffer: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                usage: wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::UNIFORM,
                size: size as _,
                mapped_at_creation: false,
            }),
            value: T::default(),
            dirty: true,
        }
    }

    pub fn flush(&mut self, queue: &wgpu::Queue) {
        if self.dirty {
            let bytes = bytemuck::bytes_of(&self.value);

            queue.write_buffer(&self.buffer, 0, bytes);
            self.dirty = false;
        }
    }
}

impl<T> Deref for MappedUniformBuffer<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for MappedUniformBuffer<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.dirty = true;
        &mut self.value
    }
}

impl<T> Bindable for MappedUniformBuffer<T> {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource)> {
        vec![(
            wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            self.buffer.as_entire_binding(),
        )]
    }
}

/// Uniform bindings must be sized in multiples of 16 bytes.
fn padded_size<T>() -> usize {
    utils::pad_size(mem::size_of::<T>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu;

    #[test]
    fn globals_size() {
        let size = padded_size::<gpu::Globals>();

        assert_eq!(0, size % 16);
        assert!(size >= mem::size_of::<gpu::Globals>());
        assert!(size < mem::size_of::<gpu::Globals>() + 16);
    }
}
