//! Ping-pong passes that update the voxel grid on the GPU.
//!
//! A texture is never sampled while it is the render target, so every update
//! renders into the copy surface first and copies back. The four steps of
//! [`DataPassPipeline::render_data_buffer`] are:
//!
//! 1. edit material (grid, positions, previous stroke) into the copy surface
//! 2. copy surface into the edit surface
//! 3. data material (grid, stroke) into the copy surface
//! 4. copy surface into the target

use crate::error::SculptResult;
use crate::gpu::GpuContext;
use crate::grid_encoding::GridLayout;
use crate::material::{MaterialLayout, MaterialTarget, ParamDesc, ParamHandle, ShaderMaterial, TextureHandle};
use crate::mesh::Mesh;
use crate::render_surface::{SurfaceClear, SurfaceId, SurfaceSet};
use crate::shaders::ShaderLibrary;
use crate::tool::ToolKind;

/// Format of the voxel grid and its scratch surfaces.
pub const VOXEL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Fraction of the volume side used for the seeded sphere.
const INIT_SPHERE_RADIUS: f32 = 0.35;
const INIT_COLOR: [f32; 3] = [0.78, 0.72, 0.66];

/// Which material a planned step draws with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepMaterial {
    Edit,
    Copy,
    Data,
}

impl StepMaterial {
    /// Surfaces the built-in material of this step samples.
    pub fn sampled(self) -> &'static [SurfaceId] {
        match self {
            StepMaterial::Edit => &[SurfaceId::VoxelGrid, SurfaceId::Position, SurfaceId::Edit],
            StepMaterial::Copy => &[SurfaceId::Copy],
            StepMaterial::Data => &[SurfaceId::VoxelGrid, SurfaceId::Edit],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataStep {
    pub label: &'static str,
    pub material: StepMaterial,
    pub target: SurfaceId,
}

impl DataStep {
    pub fn aliases(&self) -> bool {
        self.material.sampled().contains(&self.target)
    }
}

/// The four steps run for `target`, in order.
pub fn step_plan(target: SurfaceId) -> [DataStep; 4] {
    [
        DataStep { label: "edit", material: StepMaterial::Edit, target: SurfaceId::Copy },
        DataStep { label: "store stroke", material: StepMaterial::Copy, target: SurfaceId::Edit },
        DataStep { label: "apply", material: StepMaterial::Data, target: SurfaceId::Copy },
        DataStep { label: "write back", material: StepMaterial::Copy, target },
    ]
}

/// Data material used in step 3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataMaterial {
    /// Seeds the grid.
    Init,
    /// The active sculpt/paint program.
    Tool,
}

/// Per-edit inputs of the edit material.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EditRequest {
    /// Pointer position over the position buffer, top-left origin.
    pub pointer_uv: [f32; 2],
    /// Camera position in normalized grid space.
    pub origin: [f32; 3],
    pub radius: f32,
    /// How far the brush centre is pushed into the surface, in radii.
    pub push: f32,
    pub dt: f32,
}

struct EditParams {
    grid_side: ParamHandle<f32>,
    layers_per_row: ParamHandle<f32>,
    pointer_uv: ParamHandle<[f32; 2]>,
    origin: ParamHandle<[f32; 3]>,
    radius: ParamHandle<f32>,
    push: ParamHandle<f32>,
    dt: ParamHandle<f32>,
    brush_active: ParamHandle<f32>,
}

pub(crate) fn edit_layout() -> SculptResult<MaterialLayout> {
    MaterialLayout::new(&[
        ParamDesc::float("grid_side"),
        ParamDesc::float("layers_per_row"),
        ParamDesc::vec2("pointer_uv"),
        ParamDesc::vec3("origin"),
        ParamDesc::float("radius"),
        ParamDesc::float("push"),
        ParamDesc::float("dt"),
        ParamDesc::float("brush_active"),
        ParamDesc::texture("voxels"),
        ParamDesc::texture("positions"),
        ParamDesc::texture("stroke_prev"),
    ])
}

pub(crate) fn copy_layout() -> SculptResult<MaterialLayout> {
    MaterialLayout::new(&[ParamDesc::vec2("target_size"), ParamDesc::texture("source")])
}

pub(crate) fn tool_layout() -> SculptResult<MaterialLayout> {
    MaterialLayout::new(&[
        ParamDesc::vec3("paint_color"),
        ParamDesc::texture("voxels"),
        ParamDesc::texture("stroke"),
    ])
}

pub(crate) fn init_layout() -> SculptResult<MaterialLayout> {
    MaterialLayout::new(&[
        ParamDesc::vec3("color"),
        ParamDesc::float("grid_side"),
        ParamDesc::float("layers_per_row"),
        ParamDesc::float("radius"),
    ])
}

struct CopyMaterial {
    material: ShaderMaterial,
    source: TextureHandle,
    target_size: ParamHandle<[f32; 2]>,
}

impl CopyMaterial {
    fn new(device: &wgpu::Device, shaders: &ShaderLibrary) -> SculptResult<Self> {
        let material = ShaderMaterial::new(device, shaders, "copy", copy_layout()?, MaterialTarget::screen(VOXEL_FORMAT))?;
        Ok(Self {
            source: material.texture_handle("source")?,
            target_size: material.handle("target_size")?,
            material,
        })
    }

    fn point_at(&mut self, source: SurfaceId, width: u32, height: u32) {
        self.material.set_texture(self.source, source);
        self.material.set(self.target_size, [width as f32, height as f32]);
    }
}

pub struct DataPassPipeline {
    layout: GridLayout,
    quad: Mesh,
    edit: ShaderMaterial,
    edit_params: EditParams,
    copy: CopyMaterial,
    blit: CopyMaterial,
    tool: ShaderMaterial,
    tool_kind: ToolKind,
    paint_color: ParamHandle<[f32; 3]>,
    init: ShaderMaterial,
}

impl DataPassPipeline {
    pub fn new(gpu: &GpuContext, shaders: &ShaderLibrary, layout: GridLayout) -> SculptResult<Self> {
        let device = &gpu.device;
        let target = MaterialTarget::screen(VOXEL_FORMAT);

        let mut edit = ShaderMaterial::new(device, shaders, "edit", edit_layout()?, target)?;
        let edit_params = EditParams {
            grid_side: edit.handle("grid_side")?,
            layers_per_row: edit.handle("layers_per_row")?,
            pointer_uv: edit.handle("pointer_uv")?,
            origin: edit.handle("origin")?,
            radius: edit.handle("radius")?,
            push: edit.handle("push")?,
            dt: edit.handle("dt")?,
            brush_active: edit.handle("brush_active")?,
        };
        edit.set(edit_params.grid_side, layout.sculpt_side() as f32);
        edit.set(edit_params.layers_per_row, layout.layers_per_row() as f32);
        edit.set_texture(edit.texture_handle("voxels")?, SurfaceId::VoxelGrid);
        edit.set_texture(edit.texture_handle("positions")?, SurfaceId::Position);
        edit.set_texture(edit.texture_handle("stroke_prev")?, SurfaceId::Edit);

        let side = layout.texture_side();
        let mut copy = CopyMaterial::new(device, shaders)?;
        copy.point_at(SurfaceId::Copy, side, side);
        let blit = CopyMaterial::new(device, shaders)?;

        let tool_kind = ToolKind::Sculpt;
        let mut tool = ShaderMaterial::new(device, shaders, tool_kind.program(), tool_layout()?, target)?;
        let paint_color = tool.handle("paint_color")?;
        tool.set_texture(tool.texture_handle("voxels")?, SurfaceId::VoxelGrid);
        tool.set_texture(tool.texture_handle("stroke")?, SurfaceId::Edit);

        let mut init = ShaderMaterial::new(device, shaders, "init", init_layout()?, target)?;
        init.set(init.handle("color")?, INIT_COLOR);
        init.set(init.handle("grid_side")?, layout.sculpt_side() as f32);
        init.set(init.handle("layers_per_row")?, layout.layers_per_row() as f32);
        init.set(init.handle("radius")?, INIT_SPHERE_RADIUS);

        log::info!("Data pass ready for a {side}x{side} voxel texture");
        Ok(Self {
            layout,
            quad: Mesh::screen_quad(device),
            edit,
            edit_params,
            copy,
            blit,
            tool,
            tool_kind,
            paint_color,
            init,
        })
    }

    pub fn grid_layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn tool_kind(&self) -> ToolKind {
        self.tool_kind
    }

    /// Switch the data program; exactly one tool is active at a time.
    pub fn set_tool(&mut self, device: &wgpu::Device, shaders: &ShaderLibrary, kind: ToolKind) -> SculptResult<()> {
        self.tool.set_program(device, shaders, kind.program())?;
        self.tool_kind = kind;
        Ok(())
    }

    pub fn set_paint_color(&mut self, color: [f32; 3]) {
        self.tool.set(self.paint_color, color);
    }

    fn set_edit(&mut self, request: Option<EditRequest>) {
        let p = &self.edit_params;
        match request {
            Some(request) => {
                self.edit.set(p.pointer_uv, request.pointer_uv);
                self.edit.set(p.origin, request.origin);
                self.edit.set(p.radius, request.radius);
                self.edit.set(p.push, request.push);
                self.edit.set(p.dt, request.dt);
                self.edit.set(p.brush_active, 1.0);
            }
            None => {
                self.edit.set(p.dt, 0.0);
                self.edit.set(p.brush_active, 0.0);
            }
        }
    }

    /// Fill the voxel grid with the starting shape.
    pub fn run_init(&mut self, gpu: &GpuContext, surfaces: &SurfaceSet) -> usize {
        self.set_edit(None);
        self.render_data_buffer(gpu, surfaces, SurfaceId::VoxelGrid, DataMaterial::Init)
    }

    /// Apply the active tool at the pointer described by `request`.
    pub fn run_edit(&mut self, gpu: &GpuContext, surfaces: &SurfaceSet, request: EditRequest) -> usize {
        self.set_edit(Some(request));
        self.render_data_buffer(gpu, surfaces, SurfaceId::VoxelGrid, DataMaterial::Tool)
    }

    /// Run the tool with the brush disabled; the grid must come out unchanged.
    pub fn run_idle(&mut self, gpu: &GpuContext, surfaces: &SurfaceSet) -> usize {
        self.set_edit(None);
        self.render_data_buffer(gpu, surfaces, SurfaceId::VoxelGrid, DataMaterial::Tool)
    }

    /// Run the four ping-pong steps into `target`. Returns how many steps drew.
    pub fn render_data_buffer(
        &self,
        gpu: &GpuContext,
        surfaces: &SurfaceSet,
        target: SurfaceId,
        data: DataMaterial,
    ) -> usize {
        let data_material = match data {
            DataMaterial::Init => &self.init,
            DataMaterial::Tool => &self.tool,
        };
        step_plan(target)
            .iter()
            .map(|step| {
                let material = match step.material {
                    StepMaterial::Edit => &self.edit,
                    StepMaterial::Copy => &self.copy.material,
                    StepMaterial::Data => data_material,
                };
                self.run_step(gpu, surfaces, step.label, material, step.target)
            })
            .filter(|drew| *drew)
            .count()
    }

    /// Copy `source` over `target`, scaled with nearest sampling.
    pub fn blit(&mut self, gpu: &GpuContext, surfaces: &SurfaceSet, source: SurfaceId, target: SurfaceId) -> bool {
        let Some(surface) = surfaces.get(target) else {
            log::error!("Blit target {target:?} does not exist");
            return false;
        };
        self.blit.point_at(source, surface.width(), surface.height());
        self.run_step(gpu, surfaces, "blit", &self.blit.material, target)
    }

    fn run_step(
        &self,
        gpu: &GpuContext,
        surfaces: &SurfaceSet,
        label: &str,
        material: &ShaderMaterial,
        target: SurfaceId,
    ) -> bool {
        if material.samples(target) {
            log::error!(
                "Refusing data step \"{label}\": \"{}\" samples its own target {target:?}",
                material.program()
            );
            return false;
        }
        let Some(surface) = surfaces.get(target) else {
            log::error!("Data step \"{label}\" has no target {target:?}");
            return false;
        };

        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(label),
        });
        let drew = {
            let mut pass = surface.bind(&mut encoder, SurfaceClear::TRANSPARENT);
            let applied = material.apply(&gpu.device, &gpu.queue, surfaces, &mut pass);
            if applied {
                self.quad.draw(&mut pass);
            }
            applied
        };
        gpu.queue.submit(std::iter::once(encoder.finish()));
        log::trace!("data step \"{label}\" -> {target:?} drew: {drew}");
        drew
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_update_never_samples_its_target() {
        let plan = step_plan(SurfaceId::VoxelGrid);
        assert!(plan.iter().all(|step| !step.aliases()), "{plan:?}");
    }

    #[test]
    fn authoritative_grid_is_written_once_and_last() {
        let plan = step_plan(SurfaceId::VoxelGrid);
        let writes: Vec<_> = plan
            .iter()
            .enumerate()
            .filter(|(_, step)| step.target == SurfaceId::VoxelGrid)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(writes, vec![plan.len() - 1]);
        assert_eq!(plan[3].material, StepMaterial::Copy);
    }

    #[test]
    fn stroke_is_stored_before_the_data_material_reads_it() {
        let plan = step_plan(SurfaceId::VoxelGrid);
        let store = plan.iter().position(|s| s.target == SurfaceId::Edit).unwrap();
        let apply = plan.iter().position(|s| s.material == StepMaterial::Data).unwrap();
        assert!(store < apply);
    }

    #[test]
    fn aliasing_targets_are_detected() {
        let plan = step_plan(SurfaceId::Copy);
        assert!(plan[3].aliases());
        let plan = step_plan(SurfaceId::Edit);
        assert!(!plan[3].aliases());
    }

    #[test]
    fn material_layouts_resolve() {
        for layout in [edit_layout(), copy_layout(), tool_layout(), init_layout()] {
            layout.unwrap();
        }
    }
}
