//! A wrapper around `wgpu` primitives that hands out handles to GPU resources.

mod buffers;
mod textures;
mod vertex_layouts;

pub use buffers::*;
pub use textures::*;
pub use vertex_layouts::*;

use generational_arena::Arena;
use wgpu::util::DeviceExt;

pub struct Renderer {
    device: wgpu::Device,
    queue: wgpu::Queue,

    buffers: Arena<BufferEntry>,
    textures: Arena<TextureEntry>,
}

impl Renderer {
    /// Creates a new renderer wrapper around a `wgpu` device and queue.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            buffers: Arena::default(),
            textures: Arena::default(),
        }
    }

    /// Creates a buffer initialized with `contents` and returns its handle.
    pub fn create_buffer_init<T>(
        &mut self,
        descriptor: BufferDescriptor,
        contents: &[T],
    ) -> BufferId
    where
        T: bytemuck::NoUninit,
    {
        let contents: &[u8] = bytemuck::cast_slice(contents);

        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&descriptor.label),
                contents,
                usage: descriptor.usages,
            });

        tracing::debug!("created buffer \"{}\" ({} bytes)", descriptor.label, contents.len());

        BufferId(self.buffers.insert(BufferEntry {
            descriptor: BufferDescriptor {
                size: contents.len() as u64,
                ..descriptor
            },
            buffer,
        }))
    }

    /// Creates a 2D texture filled with `data`, laid out row-major with no padding.
    pub fn create_texture_init(&mut self, descriptor: TextureDescriptor, data: &[u8]) -> TextureId {
        let texture = self.device.create_texture_with_data(
            &self.queue,
            &wgpu::TextureDescriptor {
                label: Some(&descriptor.label),
                size: wgpu::Extent3d {
                    width: descriptor.size.x,
                    height: descriptor.size.y,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: descriptor.format.to_wgpu(),
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        tracing::debug!(
            "created texture \"{}\" ({}x{})",
            descriptor.label,
            descriptor.size.x,
            descriptor.size.y
        );

        TextureId(self.textures.insert(TextureEntry {
            descriptor,
            _texture: texture,
            view,
        }))
    }

    /// Overwrite the start of a buffer with `contents`. Returns false if the buffer is gone or too
    /// small.
    pub fn write_buffer<T>(&self, id: BufferId, contents: &[T]) -> bool
    where
        T: bytemuck::NoUninit,
    {
        let Some(entry) = self.buffers.get(id.0) else {
            return false;
        };

        let contents: &[u8] = bytemuck::cast_slice(contents);
        if contents.len() as u64 > entry.descriptor.size {
            tracing::warn!(
                "write of {} bytes does not fit buffer \"{}\" ({} bytes)",
                contents.len(),
                entry.descriptor.label,
                entry.descriptor.size
            );
            return false;
        }

        self.queue.write_buffer(&entry.buffer, 0, contents);
        true
    }

    pub fn buffer(&self, id: BufferId) -> Option<&wgpu::Buffer> {
        self.buffers.get(id.0).map(|entry| &entry.buffer)
    }

    pub fn buffer_descriptor(&self, id: BufferId) -> Option<&BufferDescriptor> {
        self.buffers.get(id.0).map(|entry| &entry.descriptor)
    }

    pub fn texture_view(&self, id: TextureId) -> Option<&wgpu::TextureView> {
        self.textures.get(id.0).map(|entry| &entry.view)
    }

    pub fn texture_descriptor(&self, id: TextureId) -> Option<&TextureDescriptor> {
        self.textures.get(id.0).map(|entry| &entry.descriptor)
    }

    /// Drops the GPU buffer behind the handle. Returns false if it was already gone.
    pub fn remove_buffer(&mut self, id: BufferId) -> bool {
        self.buffers.remove(id.0).is_some()
    }

    /// Drops the GPU texture behind the handle. Returns false if it was already gone.
    pub fn remove_texture(&mut self, id: TextureId) -> bool {
        self.textures.remove(id.0).is_some()
    }
}

struct BufferEntry {
    descriptor: BufferDescriptor,
    buffer: wgpu::Buffer,
}

struct TextureEntry {
    descriptor: TextureDescriptor,
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}
