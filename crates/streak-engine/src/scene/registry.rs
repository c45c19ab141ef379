use bytemuck::{Pod, Zeroable};
use slotmap::SlotMap;
use thiserror::Error;
use wgpu::util::DeviceExt;

use crate::render::RenderCtx;

slotmap::new_key_type! {
    /// Handle to a mesh uploaded into a [`Registry`].
    pub struct MeshId;
    /// Handle to a texture uploaded into a [`Registry`].
    pub struct TextureId;
}

/// Vertex layout consumed by the geometry pass.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub color: [u8; 4],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
}

impl MeshVertex {
    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Unorm8x4,  // color
        2 => Float32x2, // uv
        3 => Float32x3  // normal
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Decoded triangle-list mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.vertices.is_empty() || self.indices.is_empty() {
            return Err(RegistryError::EmptyMesh);
        }
        if self.indices.len() % 3 != 0 {
            return Err(RegistryError::PartialTriangle { count: self.indices.len() });
        }
        let vertex_count = self.vertices.len();
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(RegistryError::IndexOutOfRange { index, vertex_count });
        }
        Ok(())
    }
}

/// Decoded 8-bit RGBA image, rows top to bottom.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub rgba8: Vec<u8>,
}

impl ImageData {
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.width == 0 || self.height == 0 {
            return Err(RegistryError::EmptyImage { width: self.width, height: self.height });
        }
        let expected = self.width as usize * self.height as usize * 4;
        if self.rgba8.len() != expected {
            return Err(RegistryError::PixelCount { expected, actual: self.rgba8.len() });
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("mesh has no vertices or no indices")]
    EmptyMesh,
    #[error("index count {count} is not a multiple of 3")]
    PartialTriangle { count: usize },
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("image has zero extent ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
    #[error("image data holds {actual} bytes, expected {expected}")]
    PixelCount { expected: usize, actual: usize },
}

pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// Scene-owned meshes and textures addressed by typed handles.
///
/// A stale handle (after [`Registry::release_all`]) resolves to `None`.
#[derive(Default)]
pub struct Registry {
    meshes: SlotMap<MeshId, GpuMesh>,
    textures: SlotMap<TextureId, GpuTexture>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_mesh(&mut self, ctx: &RenderCtx<'_>, data: &MeshData) -> Result<MeshId, RegistryError> {
        data.validate()?;

        let vertex_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("streak mesh vbo"),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("streak mesh ibo"),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let id = self.meshes.insert(GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: data.indices.len() as u32,
        });
        log::debug!(
            "registry: mesh {id:?} ({} vertices, {} triangles)",
            data.vertices.len(),
            data.indices.len() / 3
        );
        Ok(id)
    }

    pub fn insert_texture(&mut self, ctx: &RenderCtx<'_>, image: &ImageData) -> Result<TextureId, RegistryError> {
        image.validate()?;

        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("streak object texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.rgba8,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(image.width * 4),
                rows_per_image: Some(image.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = self.textures.insert(GpuTexture { texture, view });
        log::debug!("registry: texture {id:?} ({}x{})", image.width, image.height);
        Ok(id)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&GpuMesh> {
        self.meshes.get(id)
    }

    pub fn texture(&self, id: TextureId) -> Option<&GpuTexture> {
        self.textures.get(id)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Destroys every GPU handle and empties the registry.
    ///
    /// Each handle is destroyed on its own; none depends on a previous one succeeding.
    pub fn release_all(&mut self) {
        for (_, mesh) in self.meshes.drain() {
            mesh.vertex_buffer.destroy();
            mesh.index_buffer.destroy();
        }
        for (_, tex) in self.textures.drain() {
            tex.texture.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f32) -> MeshVertex {
        MeshVertex {
            position: [x, 0.0, 0.0],
            color: [255; 4],
            uv: [0.0, 0.0],
            normal: [0.0, 0.0, 1.0],
        }
    }

    #[test]
    fn vertex_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<MeshVertex>(), 36);
        assert_eq!(MeshVertex::layout().array_stride, 36);
    }

    #[test]
    fn mesh_validation() {
        let ok = MeshData { vertices: vec![vertex(0.0), vertex(1.0), vertex(2.0)], indices: vec![0, 1, 2] };
        assert_eq!(ok.validate(), Ok(()));

        assert_eq!(MeshData::default().validate(), Err(RegistryError::EmptyMesh));

        let partial = MeshData { indices: vec![0, 1], ..ok.clone() };
        assert_eq!(partial.validate(), Err(RegistryError::PartialTriangle { count: 2 }));

        let oob = MeshData { indices: vec![0, 1, 3], ..ok };
        assert_eq!(
            oob.validate(),
            Err(RegistryError::IndexOutOfRange { index: 3, vertex_count: 3 })
        );
    }

    #[test]
    fn image_validation() {
        let ok = ImageData { width: 2, height: 2, rgba8: vec![0; 16] };
        assert_eq!(ok.validate(), Ok(()));

        let empty = ImageData { width: 0, height: 2, rgba8: vec![] };
        assert_eq!(empty.validate(), Err(RegistryError::EmptyImage { width: 0, height: 2 }));

        let short = ImageData { width: 2, height: 2, rgba8: vec![0; 15] };
        assert_eq!(short.validate(), Err(RegistryError::PixelCount { expected: 16, actual: 15 }));
    }

    #[test]
    fn empty_registry_resolves_nothing() {
        let mut reg = Registry::new();
        assert!(reg.mesh(MeshId::default()).is_none());
        assert!(reg.texture(TextureId::default()).is_none());
        reg.release_all();
        assert_eq!((reg.mesh_count(), reg.texture_count()), (0, 0));
    }
}
