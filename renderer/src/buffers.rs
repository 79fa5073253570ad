pub use wgpu::BufferUsages;

/// Handle to a buffer owned by the renderer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct BufferId(pub generational_arena::Index);

#[derive(Clone, Debug)]
pub struct BufferDescriptor {
    pub label: String,
    /// Size in bytes. Filled in from the contents when the buffer is created.
    pub size: u64,
    pub usages: BufferUsages,
}

impl BufferDescriptor {
    pub fn vertex(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            size: 0,
            usages: BufferUsages::VERTEX,
        }
    }

    pub fn index(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            size: 0,
            usages: BufferUsages::INDEX,
        }
    }

    /// Uniform data that is rewritten with [crate::Renderer::write_buffer].
    pub fn uniform(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            size: 0,
            usages: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        }
    }
}
