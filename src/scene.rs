//! Per-frame orchestration of the sculpting session.
//!
//! One [`SceneController::tick`] runs, in order: the position pass (voxels and
//! floor), at most one rate-limited grid edit, the shadow pass and the final
//! composite into the caller's frame.

use crate::batched_cubes::BatchedCubes;
use crate::camera::{LightRig, OrbitCamera};
use crate::config::{unpack_rgb, SculptConfig};
use crate::data_pass::{DataPassPipeline, EditRequest, VOXEL_FORMAT};
use crate::error::{SculptError, SculptResult};
use crate::gpu::{validated, GpuContext};
use crate::grid_encoding::GridLayout;
use crate::material::{MaterialLayout, MaterialTarget, ParamDesc, ParamHandle, ShaderMaterial};
use crate::mesh::Mesh;
use crate::picking::{
    decode_position_texel, local_to_normalized, pointer_to_pixel, pointer_to_uv, view_ray, PickResult, SurfaceHit,
};
use crate::readback::{read_texture, TexelRegion};
use crate::render_surface::{RenderSurface, SurfaceClear, SurfaceId, SurfaceSet};
use crate::shaders::ShaderLibrary;
use crate::tool::{FrameClock, PointerInput, ToolKind, ToolState};
use cgmath::Matrix4;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// How voxels are drawn into the position buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    #[default]
    Solid,
    Wireframe,
}

impl RenderMode {
    fn program(self) -> &'static str {
        match self {
            RenderMode::Solid => "position",
            RenderMode::Wireframe => "wireframe",
        }
    }
}

/// What a tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameResult {
    /// Frame delta actually applied to the session clock.
    pub dt: f64,
    /// Steps drawn by the grid edit, zero when no edit ran.
    pub edit_steps: usize,
    pub positions_rendered: bool,
    pub shadows_rendered: bool,
    pub composited: bool,
}

/// Uniform inputs of the composite, derived from camera, light and tool state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompositeParams {
    pub light_space: Matrix4<f32>,
    pub model: Matrix4<f32>,
    pub background: [f32; 3],
    pub floor_color: [f32; 3],
    pub shadow_bias: f32,
    pub shadows_enabled: bool,
    pub brush_radius: f32,
    pub hover_uv: Option<[f32; 2]>,
}

impl CompositeParams {
    pub fn new(
        camera: &OrbitCamera,
        light: &LightRig,
        tool: &ToolState,
        config: &SculptConfig,
        shadows_enabled: bool,
    ) -> Self {
        Self {
            light_space: light.view_projection(),
            model: camera.model_matrix(),
            background: config.background_color,
            floor_color: config.floor_color,
            shadow_bias: light.shadow_bias,
            shadows_enabled,
            brush_radius: tool.brush_radius(),
            hover_uv: tool.hover().map(|[nx, ny]| pointer_to_uv(nx, ny)),
        }
    }
}

struct VoxelParams {
    projection: ParamHandle<Matrix4<f32>>,
    view: ParamHandle<Matrix4<f32>>,
    model: ParamHandle<Matrix4<f32>>,
}

struct FloorParams {
    projection: ParamHandle<Matrix4<f32>>,
    view: ParamHandle<Matrix4<f32>>,
}

struct ComposeParams {
    light_space: ParamHandle<Matrix4<f32>>,
    model: ParamHandle<Matrix4<f32>>,
    background: ParamHandle<[f32; 3]>,
    floor_color: ParamHandle<[f32; 3]>,
    hover_uv: ParamHandle<[f32; 2]>,
    shadow_bias: ParamHandle<f32>,
    shadows_enabled: ParamHandle<f32>,
    brush_radius: ParamHandle<f32>,
    hover_active: ParamHandle<f32>,
}

pub(crate) fn voxel_layout() -> SculptResult<MaterialLayout> {
    MaterialLayout::new(&[
        ParamDesc::mat4("projection"),
        ParamDesc::mat4("view"),
        ParamDesc::mat4("model"),
        ParamDesc::float("grid_side"),
        ParamDesc::float("layers_per_row"),
        ParamDesc::texture("voxels"),
    ])
}

pub(crate) fn floor_layout() -> SculptResult<MaterialLayout> {
    MaterialLayout::new(&[
        ParamDesc::mat4("projection"),
        ParamDesc::mat4("view"),
        ParamDesc::float("grid_side"),
    ])
}

pub(crate) fn compose_layout() -> SculptResult<MaterialLayout> {
    MaterialLayout::new(&[
        ParamDesc::mat4("light_space"),
        ParamDesc::mat4("model"),
        ParamDesc::vec3("background"),
        ParamDesc::float("grid_side"),
        ParamDesc::vec3("floor_color"),
        ParamDesc::float("layers_per_row"),
        ParamDesc::vec2("hover_uv"),
        ParamDesc::float("shadow_bias"),
        ParamDesc::float("shadows_enabled"),
        ParamDesc::float("brush_radius"),
        ParamDesc::float("hover_active"),
        ParamDesc::texture("voxels"),
        ParamDesc::texture("positions"),
        ParamDesc::texture("shadow_points"),
    ])
}

fn bool_param(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Owns every GPU resource of a session and drives it one frame at a time.
pub struct SceneController {
    gpu: GpuContext,
    config: SculptConfig,
    layout: GridLayout,
    shaders: ShaderLibrary,
    surfaces: SurfaceSet,
    position_format: wgpu::TextureFormat,
    cubes: BatchedCubes,
    floor: Mesh,
    quad: Mesh,
    data_pass: DataPassPipeline,
    voxel_material: ShaderMaterial,
    voxel_params: VoxelParams,
    floor_material: ShaderMaterial,
    floor_params: FloorParams,
    compose_material: ShaderMaterial,
    compose_params: ComposeParams,
    camera: OrbitCamera,
    light: LightRig,
    tool: ToolState,
    clock: FrameClock,
    render_mode: RenderMode,
    shadows_enabled: bool,
    width: u32,
    height: u32,
    last_pointer: Option<[f32; 2]>,
}

impl SceneController {
    /// Build every surface and material, then seed the grid.
    ///
    /// `frame_format` is the format of the views later passed to [`Self::tick`].
    pub fn new(
        gpu: GpuContext,
        config: SculptConfig,
        shaders: ShaderLibrary,
        frame_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> SculptResult<Self> {
        config.validate()?;
        let layout = config.grid_layout()?;
        let width = width.max(1);
        let height = height.max(1);
        let device = &gpu.device;
        let side = layout.texture_side();

        let position_format = gpu.position_format();
        let shadow_side = config.shadow_map_size;
        let surfaces = validated(device, "render surfaces", || {
            let mut surfaces = SurfaceSet::default();
            for (id, label) in [
                (SurfaceId::VoxelGrid, "Voxel Grid"),
                (SurfaceId::Copy, "Copy Buffer"),
                (SurfaceId::Edit, "Edit Buffer"),
                (SurfaceId::Import, "Import Buffer"),
            ] {
                surfaces.insert(id, RenderSurface::new(device, label, Some(VOXEL_FORMAT), None, side, side));
            }
            surfaces.insert(
                SurfaceId::Position,
                RenderSurface::new(device, "Position Buffer", Some(position_format), Some(DEPTH_FORMAT), width, height),
            );
            surfaces.insert(
                SurfaceId::Shadow,
                RenderSurface::new(
                    device,
                    "Shadow Buffer",
                    Some(position_format),
                    Some(DEPTH_FORMAT),
                    shadow_side,
                    shadow_side,
                ),
            );
            surfaces
        })?;

        let sculpt_side = layout.sculpt_side();
        let cubes = BatchedCubes::new(device, layout.voxel_count(), sculpt_side);

        let geometry = MaterialTarget::geometry(position_format, DEPTH_FORMAT, Some(wgpu::Face::Back));
        let mut voxel_material =
            ShaderMaterial::new(device, &shaders, RenderMode::Solid.program(), voxel_layout()?, geometry)?;
        let voxel_params = VoxelParams {
            projection: voxel_material.handle("projection")?,
            view: voxel_material.handle("view")?,
            model: voxel_material.handle("model")?,
        };
        voxel_material.set(voxel_material.handle("grid_side")?, sculpt_side as f32);
        voxel_material.set(voxel_material.handle("layers_per_row")?, layout.layers_per_row() as f32);
        voxel_material.set_texture(voxel_material.texture_handle("voxels")?, SurfaceId::VoxelGrid);

        let flat = MaterialTarget::geometry(position_format, DEPTH_FORMAT, None);
        let mut floor_material = ShaderMaterial::new(device, &shaders, "floor", floor_layout()?, flat)?;
        let floor_params = FloorParams {
            projection: floor_material.handle("projection")?,
            view: floor_material.handle("view")?,
        };
        floor_material.set(floor_material.handle("grid_side")?, sculpt_side as f32);

        let mut compose_material =
            ShaderMaterial::new(device, &shaders, "compose", compose_layout()?, MaterialTarget::screen(frame_format))?;
        let compose_params = ComposeParams {
            light_space: compose_material.handle("light_space")?,
            model: compose_material.handle("model")?,
            background: compose_material.handle("background")?,
            floor_color: compose_material.handle("floor_color")?,
            hover_uv: compose_material.handle("hover_uv")?,
            shadow_bias: compose_material.handle("shadow_bias")?,
            shadows_enabled: compose_material.handle("shadows_enabled")?,
            brush_radius: compose_material.handle("brush_radius")?,
            hover_active: compose_material.handle("hover_active")?,
        };
        compose_material.set(compose_material.handle("grid_side")?, sculpt_side as f32);
        compose_material.set(compose_material.handle("layers_per_row")?, layout.layers_per_row() as f32);
        compose_material.set_texture(compose_material.texture_handle("voxels")?, SurfaceId::VoxelGrid);
        compose_material.set_texture(compose_material.texture_handle("positions")?, SurfaceId::Position);
        compose_material.set_texture(compose_material.texture_handle("shadow_points")?, SurfaceId::Shadow);

        let mut data_pass = DataPassPipeline::new(&gpu, &shaders, layout)?;
        data_pass.set_paint_color(unpack_rgb(config.paint_color));

        let camera = OrbitCamera::new(&config.camera, width, height);
        let light = LightRig::new(&config.light);
        let tool = ToolState::new(config.brush_speed, config.brush_radius, config.paint_color);
        let shadows_enabled = config.shadows_enabled;
        let quad = Mesh::screen_quad(device);
        let floor = Mesh::floor(device, sculpt_side);

        let mut scene = Self {
            gpu,
            config,
            layout,
            shaders,
            surfaces,
            position_format,
            cubes,
            floor,
            quad,
            data_pass,
            voxel_material,
            voxel_params,
            floor_material,
            floor_params,
            compose_material,
            compose_params,
            camera,
            light,
            tool,
            clock: FrameClock::default(),
            render_mode: RenderMode::Solid,
            shadows_enabled,
            width,
            height,
            last_pointer: None,
        };

        let steps = scene.data_pass.run_init(&scene.gpu, &scene.surfaces);
        log::info!("Seeded {sculpt_side}^3 voxel grid ({steps} steps)");
        if !scene.shadows_enabled {
            scene.clear_shadow_buffer();
        }
        Ok(scene)
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    pub fn config(&self) -> &SculptConfig {
        &self.config
    }

    pub fn grid_layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn tool(&self) -> &ToolState {
        &self.tool
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    pub fn shadows_enabled(&self) -> bool {
        self.shadows_enabled
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Format of the position and shadow buffers on this device.
    pub fn position_format(&self) -> wgpu::TextureFormat {
        self.position_format
    }

    pub fn surface(&self, id: SurfaceId) -> Option<&RenderSurface> {
        self.surfaces.get(id)
    }

    pub fn composite_params(&self) -> CompositeParams {
        CompositeParams::new(&self.camera, &self.light, &self.tool, &self.config, self.shadows_enabled)
    }

    /// Render one frame into `target`, a view of the frame format given at construction.
    pub fn tick(&mut self, dt: f64, target: &wgpu::TextureView) -> FrameResult {
        let dt = self.clock.advance(dt);
        let mut result = FrameResult {
            dt,
            ..Default::default()
        };

        self.set_camera_matrices();
        result.positions_rendered = self.render_positions();
        if !result.positions_rendered {
            log::warn!("Position pass skipped; picking and editing use the previous frame");
        }

        if let Some(pointer) = self.tool.poll_edit(self.clock.now()) {
            if let Some(request) = self.edit_request(pointer, dt as f32) {
                result.edit_steps = self.data_pass.run_edit(&self.gpu, &self.surfaces, request);
            }
        }

        if self.shadows_enabled {
            result.shadows_rendered = self.render_shadows();
        }
        result.composited = self.composite(target);
        result
    }

    fn set_camera_matrices(&mut self) {
        let projection = self.camera.projection_matrix();
        let view = self.camera.view_matrix();
        self.voxel_material.set(self.voxel_params.projection, projection);
        self.voxel_material.set(self.voxel_params.view, view);
        self.voxel_material.set(self.voxel_params.model, self.camera.model_matrix());
        self.floor_material.set(self.floor_params.projection, projection);
        self.floor_material.set(self.floor_params.view, view);
    }

    fn render_positions(&self) -> bool {
        let Some(surface) = self.surfaces.get(SurfaceId::Position) else {
            return false;
        };
        let mut encoder = self.gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Position Pass"),
        });
        let drew = {
            let mut pass = surface.bind(&mut encoder, SurfaceClear::TRANSPARENT);
            let voxels = self.voxel_material.apply(&self.gpu.device, &self.gpu.queue, &self.surfaces, &mut pass);
            if voxels {
                self.cubes.render(&mut pass, None);
            }
            let floor = self.floor_material.apply(&self.gpu.device, &self.gpu.queue, &self.surfaces, &mut pass);
            if floor {
                self.floor.draw(&mut pass);
            }
            voxels && floor
        };
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        drew
    }

    fn render_shadows(&mut self) -> bool {
        self.voxel_material.set(self.voxel_params.projection, self.light.projection);
        self.voxel_material.set(self.voxel_params.view, self.light.view);

        let drew = match self.surfaces.get(SurfaceId::Shadow) {
            Some(surface) => {
                let mut encoder = self.gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Shadow Pass"),
                });
                let drew = {
                    let mut pass = surface.bind(&mut encoder, SurfaceClear::TRANSPARENT);
                    let applied =
                        self.voxel_material.apply(&self.gpu.device, &self.gpu.queue, &self.surfaces, &mut pass);
                    if applied {
                        self.cubes.render(&mut pass, None);
                    }
                    applied
                };
                self.gpu.queue.submit(std::iter::once(encoder.finish()));
                drew
            }
            None => false,
        };

        self.set_camera_matrices();
        drew
    }

    fn clear_shadow_buffer(&self) {
        let Some(surface) = self.surfaces.get(SurfaceId::Shadow) else {
            return;
        };
        let mut encoder = self.gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Shadow Clear"),
        });
        drop(surface.bind(&mut encoder, SurfaceClear::TRANSPARENT));
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
    }

    fn composite(&mut self, target: &wgpu::TextureView) -> bool {
        let params = self.composite_params();
        let p = &self.compose_params;
        let material = &mut self.compose_material;
        material.set(p.light_space, params.light_space);
        material.set(p.model, params.model);
        material.set(p.background, params.background);
        material.set(p.floor_color, params.floor_color);
        material.set(p.shadow_bias, params.shadow_bias);
        material.set(p.shadows_enabled, bool_param(params.shadows_enabled));
        material.set(p.brush_radius, params.brush_radius);
        material.set(p.hover_uv, params.hover_uv.unwrap_or_default());
        material.set(p.hover_active, bool_param(params.hover_uv.is_some()));

        let [r, g, b] = params.background;
        let clear = SurfaceClear::color(wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: 1.0,
        });
        let mut encoder = self.gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Composite Pass"),
        });
        let drew = {
            let mut pass = RenderSurface::bind_default(&mut encoder, target, self.width, self.height, clear);
            let applied = self
                .compose_material
                .apply(&self.gpu.device, &self.gpu.queue, &self.surfaces, &mut pass);
            if applied {
                self.quad.draw(&mut pass);
            }
            applied
        };
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        drew
    }

    fn edit_request(&self, pointer: [f32; 2], dt: f32) -> Option<EditRequest> {
        let eye = self.camera.eye_in_model_space()?;
        let origin = local_to_normalized(eye, self.layout.sculpt_side());
        let kind = self.tool.kind();
        Some(EditRequest {
            pointer_uv: pointer_to_uv(pointer[0], pointer[1]),
            origin: origin.into(),
            radius: self.tool.brush_radius(),
            push: kind.push(),
            dt,
        })
    }

    /// Route one host pointer sample to the tool, camera or hover state.
    pub fn handle_pointer(&mut self, input: PointerInput) {
        let (nx, ny) = input.normalized(self.width, self.height);
        let previous = self.last_pointer.replace([input.x, input.y]);

        let (dx, dy) = previous.map_or((0.0, 0.0), |[px, py]| (input.x - px, input.y - py));
        let mut zoom = input.zoom_delta;
        if input.zoom {
            zoom += dx + dy;
        }
        if zoom != 0.0 {
            self.handle_zoom(zoom);
        }
        if input.rotate && previous.is_some() {
            self.handle_rotate(dx / self.width as f32, dy / self.height as f32);
        }

        match (input.sculpt, self.tool.is_active()) {
            (true, false) => self.start_tool_use(nx, ny),
            (true, true) => self.handle_tool_use(nx, ny),
            (false, true) => self.end_tool_use(),
            (false, false) => {}
        }
        self.handle_mouse_move(nx, ny);
    }

    pub fn start_tool_use(&mut self, nx: f32, ny: f32) {
        self.tool.pointer_down(nx, ny);
    }

    pub fn handle_tool_use(&mut self, nx: f32, ny: f32) {
        self.tool.pointer_move(nx, ny);
    }

    pub fn end_tool_use(&mut self) {
        self.tool.pointer_up();
    }

    pub fn handle_mouse_move(&mut self, nx: f32, ny: f32) {
        self.tool.set_hover(nx, ny);
    }

    /// Forget the hover position, e.g. when the pointer leaves the window.
    pub fn clear_hover(&mut self) {
        self.tool.clear_hover();
        self.last_pointer = None;
    }

    pub fn handle_zoom(&mut self, delta: f32) {
        self.camera.zoom(delta);
    }

    /// Rotate by a drag given as fractions of the viewport.
    pub fn handle_rotate(&mut self, dx: f32, dy: f32) {
        self.camera.rotate(dx, dy);
    }

    /// Surface under a normalized pointer, read from the last position pass.
    pub fn pick(&self, nx: f32, ny: f32) -> SculptResult<PickResult> {
        let surface = self
            .surfaces
            .get(SurfaceId::Position)
            .ok_or_else(|| SculptError::Readback("position buffer is missing".to_string()))?;
        let texture = surface
            .color_texture()
            .ok_or_else(|| SculptError::Readback("position buffer has no color".to_string()))?;
        let pixel = pointer_to_pixel(nx, ny, surface.width(), surface.height());
        let texel_bytes = self
            .position_format
            .block_copy_size(None)
            .ok_or_else(|| SculptError::Readback(format!("{:?} has no texel size", self.position_format)))?;
        let bytes = read_texture(
            &self.gpu.device,
            &self.gpu.queue,
            texture,
            TexelRegion::texel(pixel.0, pixel.1),
            texel_bytes,
        )?;
        let texel = decode_position_texel(self.position_format, &bytes).ok_or_else(|| {
            SculptError::Readback(format!("cannot decode a {:?} position texel", self.position_format))
        })?;
        Ok(PickResult {
            pixel,
            hit: SurfaceHit::from_texel(texel, &self.layout),
            ray: view_ray(&self.camera, self.layout.sculpt_side(), nx, ny),
        })
    }

    /// Copy of the voxel texture, `texture_side^2` RGBA texels, rows top to bottom.
    pub fn vox_texture_cpu(&self) -> SculptResult<Vec<u8>> {
        let texture = self
            .surfaces
            .get(SurfaceId::VoxelGrid)
            .and_then(RenderSurface::color_texture)
            .ok_or_else(|| SculptError::Readback("voxel grid has no color".to_string()))?;
        let side = self.layout.texture_side();
        read_texture(&self.gpu.device, &self.gpu.queue, texture, TexelRegion::whole(side, side), 4)
    }

    /// Replace the grid with an image, resampled to the voxel texture size.
    ///
    /// `channels` is 3 (RGB, fully opaque) or 4 (RGBA).
    pub fn import_pixels(&mut self, width: u32, height: u32, channels: u32, pixels: &[u8]) -> SculptResult<()> {
        if channels != 3 && channels != 4 {
            return Err(SculptError::ChannelCount(channels));
        }
        let expected = width as usize * height as usize * channels as usize;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(SculptError::PixelBufferSize {
                width,
                height,
                channels,
                expected,
                actual: pixels.len(),
            });
        }
        let max_side = self.gpu.device.limits().max_texture_dimension_2d;
        if width > max_side || height > max_side {
            return Err(SculptError::InvalidConfig(format!(
                "imported image {width}x{height} exceeds the device limit {max_side}"
            )));
        }

        let rgba: Vec<u8> = if channels == 4 {
            pixels.to_vec()
        } else {
            pixels
                .chunks_exact(3)
                .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], u8::MAX])
                .collect()
        };

        let surface = self
            .surfaces
            .get_mut(SurfaceId::Import)
            .ok_or_else(|| SculptError::InvalidConfig("import buffer is missing".to_string()))?;
        surface.resize_attachments(&self.gpu.device, width, height);
        let texture = surface
            .color_texture()
            .ok_or_else(|| SculptError::InvalidConfig("import buffer has no color".to_string()))?;
        self.gpu.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &rgba,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        if self
            .data_pass
            .blit(&self.gpu, &self.surfaces, SurfaceId::Import, SurfaceId::VoxelGrid)
        {
            log::info!("Imported {width}x{height} image into the voxel grid");
        }
        Ok(())
    }

    pub fn set_brush_radius(&mut self, radius: f32) {
        self.tool.set_brush_radius(radius);
    }

    pub fn set_paint_color(&mut self, packed: u32) {
        self.tool.set_paint_color(packed);
        self.data_pass.set_paint_color(self.tool.paint_color());
    }

    pub fn set_tool(&mut self, kind: ToolKind) -> SculptResult<()> {
        self.data_pass.set_tool(&self.gpu.device, &self.shaders, kind)?;
        self.tool.set_kind(kind);
        Ok(())
    }

    /// Select a tool by its index in [`ToolKind::ALL`]. Unknown indices are ignored.
    pub fn set_tool_index(&mut self, index: u32) -> SculptResult<()> {
        match ToolKind::from_index(index) {
            Some(kind) => self.set_tool(kind),
            None => {
                log::warn!("Ignoring unknown tool index {index}");
                Ok(())
            }
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.camera.resize(self.width, self.height);
        if let Some(surface) = self.surfaces.get_mut(SurfaceId::Position) {
            surface.resize_attachments(&self.gpu.device, self.width, self.height);
        }
    }

    pub fn enable_shadows(&mut self, enabled: bool) {
        if self.shadows_enabled == enabled {
            return;
        }
        self.shadows_enabled = enabled;
        if !enabled {
            self.clear_shadow_buffer();
        }
        log::info!("Shadows {}", if enabled { "on" } else { "off" });
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) -> SculptResult<()> {
        self.voxel_material.set_program(&self.gpu.device, &self.shaders, mode.program())?;
        self.render_mode = mode;
        Ok(())
    }
}
