use std::ops::{Deref, DerefMut};
use std::{any, mem};

use bytemuck::Pod;

use super::utils;
use crate::Bindable;

/// Storage buffer that exists both on the host machine and the GPU.
///
/// Used for small, host-driven arrays (such as lights) that get re-uploaded
/// whenever they change; the GPU-side buffer has a fixed capacity and the
/// host-side vector must not outgrow it.
#[derive(Debug)]
pub struct MappedStorageBuffer<T> {
    buffer: wgpu::Buffer,
    capacity: usize,
    data: Vec<T>,
    dirty: bool,
}

impl<T> MappedStorageBuffer<T>
where
    T: Pod,
{
    pub fn new(
        device: &wgpu::Device,
        label: impl AsRef<str>,
        capacity: usize,
    ) -> Self {
        let label = label.as_ref();
        let size = utils::pad_size(capacity * mem::size_of::<T>());

        log::info!(
            "Allocating storage buffer `{label}`; ty={}, capacity={capacity}, size={size}",
            any::type_name::<T>(),
        );

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::STORAGE,
            size: size as _,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            capacity,
            data: Vec::new(),
            dirty: true,
        }
    }

    pub fn flush(&mut self, queue: &wgpu::Queue) {
        if !mem::take(&mut self.dirty) || self.data.is_empty() {
            return;
        }

        assert!(
            self.data.len() <= self.capacity,
            "storage buffer overflow: {} > {}",
            self.data.len(),
            self.capacity
        );

        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&self.data));
    }
}

impl<T> Deref for MappedStorageBuffer<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<T> DerefMut for MappedStorageBuffer<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.dirty = true;

        &mut self.data
    }
}

impl<T> Bindable for MappedStorageBuffer<T> {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource)> {
        let layout = wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        vec![(layout, self.buffer.as_entire_binding())]
    }
}
