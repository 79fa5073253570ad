/// Describes a vertex buffer layout using renderer-owned types.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VertexBufferLayout {
    pub array_stride: u64,
    pub attributes: &'static [VertexAttribute],
}

impl VertexBufferLayout {
    /// Converts this layout into `wgpu::VertexBufferLayout`.
    ///
    /// `wgpu_attributes` should be created with [VertexBufferLayout::wgpu_attributes] and must
    /// live at least as long as the returned `wgpu::VertexBufferLayout`.
    pub fn to_wgpu<'a>(
        &self,
        wgpu_attributes: &'a [wgpu::VertexAttribute],
    ) -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: self.array_stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: wgpu_attributes,
        }
    }

    pub fn wgpu_attributes(&self) -> Vec<wgpu::VertexAttribute> {
        self.attributes
            .iter()
            .map(|attribute| wgpu::VertexAttribute {
                format: attribute.format.to_wgpu(),
                offset: attribute.offset,
                shader_location: attribute.shader_location,
            })
            .collect()
    }

    /// True if every attribute fits inside the stride and no two attributes overlap.
    pub fn is_packed(&self) -> bool {
        let mut ranges: Vec<(u64, u64)> = self
            .attributes
            .iter()
            .map(|a| (a.offset, a.offset + a.format.size()))
            .collect();
        ranges.sort_unstable();

        ranges.windows(2).all(|w| w[0].1 <= w[1].0)
            && ranges.last().is_none_or(|&(_, end)| end <= self.array_stride)
    }
}

/// Trait implemented by vertex types that can describe their own buffer layout.
pub trait AsVertexLayout {
    fn vertex_buffer_layout() -> VertexBufferLayout;
}

/// Describes one vertex attribute using renderer-owned types.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VertexAttribute {
    pub format: VertexFormat,
    pub offset: u64,
    pub shader_location: u32,
}

/// Vertex attribute format.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VertexFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
}

impl VertexFormat {
    /// Converts this format into `wgpu::VertexFormat`.
    pub fn to_wgpu(self) -> wgpu::VertexFormat {
        match self {
            Self::Float32 => wgpu::VertexFormat::Float32,
            Self::Float32x2 => wgpu::VertexFormat::Float32x2,
            Self::Float32x3 => wgpu::VertexFormat::Float32x3,
            Self::Float32x4 => wgpu::VertexFormat::Float32x4,
        }
    }

    pub fn size(self) -> u64 {
        match self {
            Self::Float32 => 4,
            Self::Float32x2 => 8,
            Self::Float32x3 => 12,
            Self::Float32x4 => 16,
        }
    }
}
