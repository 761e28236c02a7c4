//! Headless device that records calls

use std::collections::{HashMap, HashSet};

use super::{
    BufferHandle, BufferUsage, DeviceError, DeviceResult, GraphicsDevice, ProgramHandle, ProgramKind,
    TextureHandle, Topology, UniformValue, VertexLayout,
};
use crate::assets::ImageData;

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    /// Buffer created
    CreateBuffer {
        /// Debug label
        label: String,
        /// Buffer usage
        usage: BufferUsage,
        /// Size in bytes
        size: usize,
        /// Returned handle
        handle: BufferHandle,
    },
    /// Texture created
    CreateTexture {
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
        /// Returned handle
        handle: TextureHandle,
    },
    /// Program created
    CreateProgram(ProgramKind),
    /// Program bound
    UseProgram(ProgramKind),
    /// Uniform set (only recorded when accepted)
    SetUniform(String, UniformValue),
    /// Texture bound
    BindTexture(u32, TextureHandle),
    /// Indexed draw
    DrawIndexed {
        /// Program in use
        program: ProgramKind,
        /// Vertex layout
        layout: VertexLayout,
        /// Index count
        count: u32,
    },
    /// Non-indexed draw
    DrawArrays {
        /// Program in use
        program: ProgramKind,
        /// Primitive topology
        topology: Topology,
        /// Vertex count
        count: u32,
    },
}

/// [`GraphicsDevice`] that keeps buffers in memory and logs every call
#[derive(Debug, Default)]
pub struct RecordingDevice {
    calls: Vec<DeviceCall>,
    buffers: HashMap<BufferHandle, Vec<u8>>,
    textures: HashSet<TextureHandle>,
    programs: HashMap<ProgramHandle, ProgramKind>,
    current: Option<ProgramKind>,
    missing_uniforms: HashSet<String>,
    uniforms: HashMap<String, UniformValue>,
    next_handle: u64,
}

impl RecordingDevice {
    /// Device that accepts every uniform name
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend no program declares `name`
    #[must_use]
    pub fn without_uniform(mut self, name: impl Into<String>) -> Self {
        self.missing_uniforms.insert(name.into());
        self
    }

    /// All calls in order
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    /// Forget recorded calls and uniform values, keeping resources
    pub fn clear_calls(&mut self) {
        self.calls.clear();
        self.uniforms.clear();
    }

    /// Most recent value set for a uniform
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name)
    }

    /// Contents of a buffer
    pub fn buffer(&self, handle: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&handle).map(Vec::as_slice)
    }

    /// Number of draw calls recorded
    pub fn draw_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, DeviceCall::DrawIndexed { .. } | DeviceCall::DrawArrays { .. }))
            .count()
    }

    fn allocate(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn bound_program(&self) -> DeviceResult<ProgramKind> {
        self.current.ok_or(DeviceError::NoProgram)
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_buffer(&mut self, label: &str, usage: BufferUsage, contents: &[u8]) -> DeviceResult<BufferHandle> {
        let handle = BufferHandle(self.allocate());
        self.buffers.insert(handle, contents.to_vec());
        self.calls.push(DeviceCall::CreateBuffer {
            label: label.to_string(),
            usage,
            size: contents.len(),
            handle,
        });
        Ok(handle)
    }

    fn create_texture(&mut self, image: &ImageData) -> DeviceResult<TextureHandle> {
        let expected = image.width as usize * image.height as usize * 4;
        if image.data.len() != expected {
            return Err(DeviceError::ResourceCreationFailed(format!(
                "texture data is {} bytes, expected {expected}",
                image.data.len()
            )));
        }
        let handle = TextureHandle(self.allocate());
        self.textures.insert(handle);
        self.calls.push(DeviceCall::CreateTexture {
            width: image.width,
            height: image.height,
            handle,
        });
        Ok(handle)
    }

    fn create_program(&mut self, kind: ProgramKind) -> DeviceResult<ProgramHandle> {
        let handle = ProgramHandle(self.allocate());
        self.programs.insert(handle, kind);
        self.calls.push(DeviceCall::CreateProgram(kind));
        Ok(handle)
    }

    fn use_program(&mut self, program: ProgramHandle) -> DeviceResult<()> {
        let kind = *self
            .programs
            .get(&program)
            .ok_or(DeviceError::InvalidHandle(program.0))?;
        self.current = Some(kind);
        self.calls.push(DeviceCall::UseProgram(kind));
        Ok(())
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) -> bool {
        if self.current.is_none() || self.missing_uniforms.contains(name) {
            return false;
        }
        self.uniforms.insert(name.to_string(), value);
        self.calls.push(DeviceCall::SetUniform(name.to_string(), value));
        true
    }

    fn bind_texture(&mut self, slot: u32, texture: TextureHandle) -> DeviceResult<()> {
        if !self.textures.contains(&texture) {
            return Err(DeviceError::InvalidHandle(texture.0));
        }
        self.calls.push(DeviceCall::BindTexture(slot, texture));
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        vertices: BufferHandle,
        layout: VertexLayout,
        indices: BufferHandle,
        count: u32,
    ) -> DeviceResult<()> {
        for handle in [vertices, indices] {
            if !self.buffers.contains_key(&handle) {
                return Err(DeviceError::InvalidHandle(handle.0));
            }
        }
        let program = self.bound_program()?;
        self.calls.push(DeviceCall::DrawIndexed { program, layout, count });
        Ok(())
    }

    fn draw_arrays(
        &mut self,
        vertices: BufferHandle,
        _layout: VertexLayout,
        topology: Topology,
        count: u32,
    ) -> DeviceResult<()> {
        if !self.buffers.contains_key(&vertices) {
            return Err(DeviceError::InvalidHandle(vertices.0));
        }
        let program = self.bound_program()?;
        self.calls.push(DeviceCall::DrawArrays { program, topology, count });
        Ok(())
    }
}
