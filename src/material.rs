//! Shader programs with a typed parameter set.
//!
//! A [`MaterialLayout`] is resolved once from a list of [`ParamDesc`]s: every
//! uniform parameter gets a byte offset inside one uniform block (binding 0)
//! and every texture parameter gets the next free binding. The layout also
//! emits the matching WGSL declarations, which are prepended to the program
//! source so host and shader can never disagree on the layout.

use crate::error::{SculptError, SculptResult};
use crate::mesh::Vertex;
use crate::render_surface::{SurfaceId, SurfaceSet};
use crate::shaders::ShaderLibrary;
use cgmath::Matrix4;
use std::borrow::Cow;
use std::fmt::Write as _;
use std::marker::PhantomData;

const UNIFORM_BINDING: u32 = 0;
const UNIFORM_BLOCK_ALIGN: u64 = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    Float,
    Vec2,
    Vec3,
    Mat4,
    /// Color texture read with `textureLoad`.
    Texture,
}

impl ParamKind {
    pub fn name(self) -> &'static str {
        match self {
            ParamKind::Float => "float",
            ParamKind::Vec2 => "vec2",
            ParamKind::Vec3 => "vec3",
            ParamKind::Mat4 => "mat4",
            ParamKind::Texture => "texture",
        }
    }

    /// Size and alignment in the uniform address space; textures take none.
    fn uniform_layout(self) -> (u64, u64) {
        match self {
            ParamKind::Float => (4, 4),
            ParamKind::Vec2 => (8, 8),
            ParamKind::Vec3 => (12, 16),
            ParamKind::Mat4 => (64, 16),
            ParamKind::Texture => (0, 1),
        }
    }

    fn wgsl_type(self) -> &'static str {
        match self {
            ParamKind::Float => "f32",
            ParamKind::Vec2 => "vec2<f32>",
            ParamKind::Vec3 => "vec3<f32>",
            ParamKind::Mat4 => "mat4x4<f32>",
            ParamKind::Texture => "texture_2d<f32>",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamDesc {
    pub name: &'static str,
    pub kind: ParamKind,
}

impl ParamDesc {
    pub const fn new(name: &'static str, kind: ParamKind) -> Self {
        Self { name, kind }
    }

    pub const fn float(name: &'static str) -> Self {
        Self::new(name, ParamKind::Float)
    }

    pub const fn vec2(name: &'static str) -> Self {
        Self::new(name, ParamKind::Vec2)
    }

    pub const fn vec3(name: &'static str) -> Self {
        Self::new(name, ParamKind::Vec3)
    }

    pub const fn mat4(name: &'static str) -> Self {
        Self::new(name, ParamKind::Mat4)
    }

    pub const fn texture(name: &'static str) -> Self {
        Self::new(name, ParamKind::Texture)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Uniform { offset: u64 },
    Texture { binding: u32 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ResolvedParam {
    desc: ParamDesc,
    slot: Slot,
}

/// Host-side values that can be written into the uniform block.
pub trait UniformValue {
    const KIND: ParamKind;
    fn write_bytes(&self, out: &mut [u8]);
}

impl UniformValue for f32 {
    const KIND: ParamKind = ParamKind::Float;
    fn write_bytes(&self, out: &mut [u8]) {
        out.copy_from_slice(bytemuck::bytes_of(self));
    }
}

impl UniformValue for [f32; 2] {
    const KIND: ParamKind = ParamKind::Vec2;
    fn write_bytes(&self, out: &mut [u8]) {
        out.copy_from_slice(bytemuck::cast_slice(self));
    }
}

impl UniformValue for [f32; 3] {
    const KIND: ParamKind = ParamKind::Vec3;
    fn write_bytes(&self, out: &mut [u8]) {
        out.copy_from_slice(bytemuck::cast_slice(self));
    }
}

impl UniformValue for Matrix4<f32> {
    const KIND: ParamKind = ParamKind::Mat4;
    fn write_bytes(&self, out: &mut [u8]) {
        let columns: &[f32; 16] = self.as_ref();
        out.copy_from_slice(bytemuck::cast_slice(columns));
    }
}

/// Typed reference to a uniform parameter, resolved at setup.
#[derive(Debug)]
pub struct ParamHandle<T> {
    offset: u64,
    _value: PhantomData<fn(T)>,
}

impl<T> Clone for ParamHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ParamHandle<T> {}

/// Reference to a texture parameter, resolved at setup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureHandle {
    index: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaterialLayout {
    params: Vec<ResolvedParam>,
    uniform_size: u64,
    texture_count: u32,
}

impl MaterialLayout {
    pub fn new(params: &[ParamDesc]) -> SculptResult<Self> {
        let mut resolved: Vec<ResolvedParam> = Vec::with_capacity(params.len());
        let mut cursor = 0u64;
        let mut next_binding = UNIFORM_BINDING + 1;
        for desc in params {
            if resolved.iter().any(|p| p.desc.name == desc.name) {
                return Err(SculptError::DuplicateParam {
                    name: desc.name.to_string(),
                });
            }
            let slot = match desc.kind {
                ParamKind::Texture => {
                    let binding = next_binding;
                    next_binding += 1;
                    Slot::Texture { binding }
                }
                kind => {
                    let (size, align) = kind.uniform_layout();
                    let offset = cursor.next_multiple_of(align);
                    cursor = offset + size;
                    Slot::Uniform { offset }
                }
            };
            resolved.push(ResolvedParam { desc: *desc, slot });
        }
        Ok(Self {
            params: resolved,
            uniform_size: cursor.next_multiple_of(UNIFORM_BLOCK_ALIGN).max(UNIFORM_BLOCK_ALIGN),
            texture_count: next_binding - UNIFORM_BINDING - 1,
        })
    }

    pub fn uniform_size(&self) -> u64 {
        self.uniform_size
    }

    pub fn texture_count(&self) -> u32 {
        self.texture_count
    }

    fn find(&self, name: &str) -> SculptResult<(usize, &ResolvedParam)> {
        self.params
            .iter()
            .enumerate()
            .find(|(_, p)| p.desc.name == name)
            .ok_or_else(|| SculptError::UnknownParam {
                name: name.to_string(),
            })
    }

    pub fn handle<T: UniformValue>(&self, name: &str) -> SculptResult<ParamHandle<T>> {
        let (_, param) = self.find(name)?;
        match param.slot {
            Slot::Uniform { offset } if param.desc.kind == T::KIND => Ok(ParamHandle {
                offset,
                _value: PhantomData,
            }),
            _ => Err(SculptError::ParamKind {
                name: name.to_string(),
                expected: T::KIND.name(),
                actual: param.desc.kind.name(),
            }),
        }
    }

    pub fn texture_handle(&self, name: &str) -> SculptResult<TextureHandle> {
        let (index, param) = self.find(name)?;
        match param.slot {
            Slot::Texture { .. } => Ok(TextureHandle { index }),
            Slot::Uniform { .. } => Err(SculptError::ParamKind {
                name: name.to_string(),
                expected: "texture",
                actual: param.desc.kind.name(),
            }),
        }
    }

    /// Offset of a uniform parameter, for inspection.
    pub fn uniform_offset(&self, name: &str) -> Option<u64> {
        self.params.iter().find_map(|p| match p.slot {
            Slot::Uniform { offset } if p.desc.name == name => Some(offset),
            _ => None,
        })
    }

    /// Binding of a texture parameter, for inspection.
    pub fn texture_binding(&self, name: &str) -> Option<u32> {
        self.params.iter().find_map(|p| match p.slot {
            Slot::Texture { binding, .. } if p.desc.name == name => Some(binding),
            _ => None,
        })
    }

    /// WGSL declarations of the parameter block and texture bindings.
    pub fn wgsl_header(&self) -> String {
        let mut header = String::from("struct Params {\n");
        let mut any_uniform = false;
        for param in &self.params {
            if let Slot::Uniform { .. } = param.slot {
                let _ = writeln!(header, "    {}: {},", param.desc.name, param.desc.kind.wgsl_type());
                any_uniform = true;
            }
        }
        if !any_uniform {
            header.push_str("    unused: vec4<f32>,\n");
        }
        header.push_str("}\n");
        let _ = writeln!(
            header,
            "@group(0) @binding({UNIFORM_BINDING}) var<uniform> params: Params;"
        );
        for param in &self.params {
            if let Slot::Texture { binding, .. } = param.slot {
                let _ = writeln!(
                    header,
                    "@group(0) @binding({binding}) var {}: {};",
                    param.desc.name,
                    param.desc.kind.wgsl_type()
                );
            }
        }
        header
    }

    fn bind_group_layout_entries(&self) -> Vec<wgpu::BindGroupLayoutEntry> {
        let uniform = wgpu::BindGroupLayoutEntry {
            binding: UNIFORM_BINDING,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(self.uniform_size),
            },
            count: None,
        };
        let textures = self.params.iter().filter_map(|p| match p.slot {
            Slot::Texture { binding } => Some(wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }),
            Slot::Uniform { .. } => None,
        });
        std::iter::once(uniform).chain(textures).collect()
    }
}

/// Fixed-function state a material renders with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaterialTarget {
    pub color_format: wgpu::TextureFormat,
    pub depth_format: Option<wgpu::TextureFormat>,
    pub cull_mode: Option<wgpu::Face>,
}

impl MaterialTarget {
    /// Full-screen pass into a color-only target.
    pub fn screen(color_format: wgpu::TextureFormat) -> Self {
        Self {
            color_format,
            depth_format: None,
            cull_mode: None,
        }
    }

    /// Depth-tested geometry pass.
    pub fn geometry(color_format: wgpu::TextureFormat, depth_format: wgpu::TextureFormat, cull_mode: Option<wgpu::Face>) -> Self {
        Self {
            color_format,
            depth_format: Some(depth_format),
            cull_mode,
        }
    }
}

pub struct ShaderMaterial {
    program: String,
    layout: MaterialLayout,
    target: MaterialTarget,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniforms: Vec<u8>,
    textures: Vec<Option<SurfaceId>>,
}

impl ShaderMaterial {
    pub fn new(
        device: &wgpu::Device,
        shaders: &ShaderLibrary,
        program: &str,
        layout: MaterialLayout,
        target: MaterialTarget,
    ) -> SculptResult<Self> {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{program} Bind Group Layout")),
            entries: &layout.bind_group_layout_entries(),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{program} Pipeline Layout")),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = build_pipeline(device, shaders, program, &layout, &pipeline_layout, target)?;
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{program} Uniform Buffer")),
            size: layout.uniform_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniforms = vec![0u8; layout.uniform_size as usize];
        let textures = vec![None; layout.params.len()];
        log::debug!(
            "Built material \"{program}\" ({} uniform bytes, {} textures)",
            layout.uniform_size,
            layout.texture_count
        );
        Ok(Self {
            program: program.to_string(),
            layout,
            target,
            bind_group_layout,
            pipeline_layout,
            pipeline,
            uniform_buffer,
            uniforms,
            textures,
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn layout(&self) -> &MaterialLayout {
        &self.layout
    }

    /// Swap in another program written against the same parameter layout.
    pub fn set_program(&mut self, device: &wgpu::Device, shaders: &ShaderLibrary, program: &str) -> SculptResult<()> {
        if self.program == program {
            return Ok(());
        }
        self.pipeline = build_pipeline(device, shaders, program, &self.layout, &self.pipeline_layout, self.target)?;
        log::debug!("Material \"{}\" now runs \"{program}\"", self.program);
        self.program = program.to_string();
        Ok(())
    }

    pub fn handle<T: UniformValue>(&self, name: &str) -> SculptResult<ParamHandle<T>> {
        self.layout.handle(name)
    }

    pub fn texture_handle(&self, name: &str) -> SculptResult<TextureHandle> {
        self.layout.texture_handle(name)
    }

    pub fn set<T: UniformValue>(&mut self, handle: ParamHandle<T>, value: T) {
        let (size, _) = T::KIND.uniform_layout();
        let start = handle.offset as usize;
        if let Some(out) = self.uniforms.get_mut(start..start + size as usize) {
            value.write_bytes(out);
        }
    }

    pub fn set_texture(&mut self, handle: TextureHandle, surface: SurfaceId) {
        if let Some(slot) = self.textures.get_mut(handle.index) {
            *slot = Some(surface);
        }
    }

    /// Surfaces this material currently samples.
    pub fn sampled_surfaces(&self) -> impl Iterator<Item = SurfaceId> + '_ {
        self.textures.iter().flatten().copied()
    }

    pub fn samples(&self, surface: SurfaceId) -> bool {
        self.sampled_surfaces().any(|s| s == surface)
    }

    /// Upload uniforms, bind every texture and activate the pipeline on `pass`.
    ///
    /// Returns false, after logging, when a texture parameter is unset or its
    /// surface lacks the attachment; the caller must then skip its draw.
    pub fn apply(&self, device: &wgpu::Device, queue: &wgpu::Queue, surfaces: &SurfaceSet, pass: &mut wgpu::RenderPass<'_>) -> bool {
        let mut views = Vec::with_capacity(self.layout.texture_count as usize);
        for (param, surface) in self.layout.params.iter().zip(&self.textures) {
            let Slot::Texture { binding } = param.slot else {
                continue;
            };
            let view = surface.and_then(|id| surfaces.get(id)?.color_view());
            match view {
                Some(view) => views.push((binding, view)),
                None => {
                    log::error!(
                        "Material \"{}\": texture \"{}\" is unbound ({:?})",
                        self.program,
                        param.desc.name,
                        surface
                    );
                    return false;
                }
            }
        }

        queue.write_buffer(&self.uniform_buffer, 0, &self.uniforms);

        let entries = std::iter::once(wgpu::BindGroupEntry {
            binding: UNIFORM_BINDING,
            resource: self.uniform_buffer.as_entire_binding(),
        })
        .chain(views.iter().map(|(binding, view)| wgpu::BindGroupEntry {
            binding: *binding,
            resource: wgpu::BindingResource::TextureView(view),
        }))
        .collect::<Vec<_>>();
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} Bind Group", self.program)),
            layout: &self.bind_group_layout,
            entries: &entries,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        true
    }
}

/// Complete WGSL module for `program`: parameter header, prelude, program.
pub(crate) fn assemble_source(layout: &MaterialLayout, shaders: &ShaderLibrary, program: &str) -> SculptResult<String> {
    Ok(format!("{}\n{}", layout.wgsl_header(), shaders.program_source(program)?))
}

fn build_pipeline(
    device: &wgpu::Device,
    shaders: &ShaderLibrary,
    program: &str,
    layout: &MaterialLayout,
    pipeline_layout: &wgpu::PipelineLayout,
    target: MaterialTarget,
) -> SculptResult<wgpu::RenderPipeline> {
    let source = assemble_source(layout, shaders, program)?;

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(program),
        source: wgpu::ShaderSource::Wgsl(Cow::Owned(source)),
    });
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&format!("{program} Pipeline")),
        layout: Some(pipeline_layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[Vertex::layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(target.color_format.into())],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: target.cull_mode,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: target.depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        log::error!("Program \"{program}\" rejected: {error}");
        return Err(SculptError::ShaderCompilation {
            program: program.to_string(),
            message: error.to_string(),
        });
    }
    log::debug!("Compiled program \"{program}\"");
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit_layout() -> MaterialLayout {
        MaterialLayout::new(&[
            ParamDesc::mat4("view_model"),
            ParamDesc::float("brush_radius"),
            ParamDesc::vec3("origin"),
            ParamDesc::float("dt"),
            ParamDesc::vec2("pointer"),
            ParamDesc::texture("voxels"),
            ParamDesc::texture("positions"),
            ParamDesc::texture("shadow_points"),
        ])
        .unwrap()
    }

    #[test]
    fn uniform_offsets_follow_wgsl_rules() {
        let layout = edit_layout();
        assert_eq!(layout.uniform_offset("view_model"), Some(0));
        assert_eq!(layout.uniform_offset("brush_radius"), Some(64));
        assert_eq!(layout.uniform_offset("origin"), Some(80));
        // An f32 packs into the tail of a vec3.
        assert_eq!(layout.uniform_offset("dt"), Some(92));
        assert_eq!(layout.uniform_offset("pointer"), Some(96));
        assert_eq!(layout.uniform_size(), 112);
    }

    #[test]
    fn textures_bind_after_the_uniform_block() {
        let layout = edit_layout();
        assert_eq!(layout.texture_binding("voxels"), Some(1));
        assert_eq!(layout.texture_binding("positions"), Some(2));
        assert_eq!(layout.texture_binding("shadow_points"), Some(3));
        assert_eq!(layout.texture_count(), 3);
        assert_eq!(layout.texture_binding("dt"), None);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = MaterialLayout::new(&[ParamDesc::float("a"), ParamDesc::vec2("a")]).unwrap_err();
        assert!(matches!(err, SculptError::DuplicateParam { name } if name == "a"));
    }

    #[test]
    fn handles_check_kind_and_name() {
        let layout = edit_layout();
        assert!(layout.handle::<f32>("brush_radius").is_ok());
        assert!(matches!(
            layout.handle::<[f32; 3]>("brush_radius"),
            Err(SculptError::ParamKind { .. })
        ));
        assert!(matches!(
            layout.handle::<f32>("missing"),
            Err(SculptError::UnknownParam { .. })
        ));
        assert!(layout.texture_handle("voxels").is_ok());
        assert!(layout.texture_handle("dt").is_err());
    }

    #[test]
    fn header_declares_every_parameter() {
        let header = edit_layout().wgsl_header();
        assert!(header.contains("view_model: mat4x4<f32>,"));
        assert!(header.contains("origin: vec3<f32>,"));
        assert!(header.contains("@group(0) @binding(0) var<uniform> params: Params;"));
        assert!(header.contains("@group(0) @binding(2) var positions: texture_2d<f32>;"));
        assert!(header.contains("@group(0) @binding(3) var shadow_points: texture_2d<f32>;"));
    }

    #[test]
    fn texture_only_layout_still_has_a_uniform_block() {
        let layout = MaterialLayout::new(&[ParamDesc::texture("source")]).unwrap();
        assert_eq!(layout.uniform_size(), 16);
        assert!(layout.wgsl_header().contains("unused: vec4<f32>"));
    }

    #[test]
    fn matrix_bytes_are_column_major() {
        let mut bytes = [0u8; 64];
        let m = Matrix4::from_translation(cgmath::Vector3::new(1.0, 2.0, 3.0));
        m.write_bytes(&mut bytes);
        let floats: &[f32] = bytemuck::cast_slice(&bytes);
        assert_eq!(&floats[12..15], &[1.0, 2.0, 3.0]);
        assert_eq!(floats[0], 1.0);
        assert_eq!(floats[3], 0.0);
    }
}
