use glam::UVec2;

/// Handle to a texture owned by the renderer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct TextureId(pub generational_arena::Index);

/// Renderer-owned texture format.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TextureFormat {
    Rgba8UnormSrgb,
    R16Float,
    R32Float,
}

impl TextureFormat {
    /// Converts this format into `wgpu::TextureFormat`.
    pub fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            Self::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            Self::R16Float => wgpu::TextureFormat::R16Float,
            Self::R32Float => wgpu::TextureFormat::R32Float,
        }
    }

    /// Size of a single texel in bytes.
    pub fn texel_size(self) -> u32 {
        match self {
            Self::Rgba8UnormSrgb => 4,
            Self::R16Float => 2,
            Self::R32Float => 4,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TextureDescriptor {
    pub label: String,
    pub size: UVec2,
    pub format: TextureFormat,
}

impl TextureDescriptor {
    /// Amount of bytes a tightly packed upload for this texture needs.
    pub fn byte_len(&self) -> usize {
        self.size.x as usize * self.size.y as usize * self.format.texel_size() as usize
    }
}
