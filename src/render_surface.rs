//! Offscreen render targets and the arena that owns them.

use std::collections::HashMap;

/// Every offscreen surface the scene renders into or samples from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceId {
    VoxelGrid,
    Copy,
    Edit,
    Position,
    Shadow,
    Import,
}

/// Load behaviour of a pass. `None` keeps the previous contents.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceClear {
    pub color: Option<wgpu::Color>,
    pub depth: Option<f32>,
}

impl SurfaceClear {
    pub const TRANSPARENT: Self = Self {
        color: Some(wgpu::Color::TRANSPARENT),
        depth: Some(1.0),
    };

    pub fn color(color: wgpu::Color) -> Self {
        Self {
            color: Some(color),
            depth: Some(1.0),
        }
    }

    fn color_ops(&self) -> wgpu::Operations<wgpu::Color> {
        wgpu::Operations {
            load: self.color.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
            store: wgpu::StoreOp::Store,
        }
    }

    fn depth_ops(&self) -> wgpu::Operations<f32> {
        wgpu::Operations {
            load: self.depth.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
            store: wgpu::StoreOp::Store,
        }
    }
}

struct Attachment {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl Attachment {
    fn new(device: &wgpu::Device, label: &str, format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// A color texture and optional depth texture rendered as one target.
pub struct RenderSurface {
    label: String,
    color_format: Option<wgpu::TextureFormat>,
    depth_format: Option<wgpu::TextureFormat>,
    color: Option<Attachment>,
    depth: Option<Attachment>,
    width: u32,
    height: u32,
}

impl RenderSurface {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        color_format: Option<wgpu::TextureFormat>,
        depth_format: Option<wgpu::TextureFormat>,
        width: u32,
        height: u32,
    ) -> Self {
        let mut surface = Self {
            label: label.to_string(),
            color_format: None,
            depth_format: None,
            color: None,
            depth: None,
            width: 0,
            height: 0,
        };
        surface.configure(device, color_format, depth_format, width, height);
        surface
    }

    /// Replace the attachments; the previous textures are dropped.
    pub fn configure(
        &mut self,
        device: &wgpu::Device,
        color_format: Option<wgpu::TextureFormat>,
        depth_format: Option<wgpu::TextureFormat>,
        width: u32,
        height: u32,
    ) {
        let width = width.max(1);
        let height = height.max(1);
        self.color = color_format
            .map(|format| Attachment::new(device, &format!("{} Color", self.label), format, width, height));
        self.depth = depth_format
            .map(|format| Attachment::new(device, &format!("{} Depth", self.label), format, width, height));
        self.color_format = color_format;
        self.depth_format = depth_format;
        self.width = width;
        self.height = height;
        log::debug!("Configured surface {} at {}x{}", self.label, width, height);
    }

    /// Reallocate at a new size with the same formats. Contents are discarded.
    pub fn resize_attachments(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if self.width == width.max(1) && self.height == height.max(1) {
            return;
        }
        self.configure(device, self.color_format, self.depth_format, width, height);
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color_format(&self) -> Option<wgpu::TextureFormat> {
        self.color_format
    }

    pub fn depth_format(&self) -> Option<wgpu::TextureFormat> {
        self.depth_format
    }

    pub fn color_texture(&self) -> Option<&wgpu::Texture> {
        self.color.as_ref().map(|a| &a.texture)
    }

    pub fn color_view(&self) -> Option<&wgpu::TextureView> {
        self.color.as_ref().map(|a| &a.view)
    }

    /// Begin a pass on this surface with the viewport covering it.
    pub fn bind<'e>(&self, encoder: &'e mut wgpu::CommandEncoder, clear: SurfaceClear) -> wgpu::RenderPass<'e> {
        let color_attachment = self.color.as_ref().map(|a| wgpu::RenderPassColorAttachment {
            view: &a.view,
            resolve_target: None,
            ops: clear.color_ops(),
        });
        let depth_attachment = self.depth.as_ref().map(|a| wgpu::RenderPassDepthStencilAttachment {
            view: &a.view,
            depth_ops: Some(clear.depth_ops()),
            stencil_ops: None,
        });
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&self.label),
            color_attachments: &[color_attachment],
            depth_stencil_attachment: depth_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_viewport(0.0, 0.0, self.width as f32, self.height as f32, 0.0, 1.0);
        pass
    }

    /// Begin a pass on the window-backed target.
    pub fn bind_default<'e>(
        encoder: &'e mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        width: u32,
        height: u32,
        clear: SurfaceClear,
    ) -> wgpu::RenderPass<'e> {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Default Target"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: clear.color_ops(),
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_viewport(0.0, 0.0, width.max(1) as f32, height.max(1) as f32, 0.0, 1.0);
        pass
    }
}

/// Owner of every offscreen surface, keyed by id.
#[derive(Default)]
pub struct SurfaceSet {
    surfaces: HashMap<SurfaceId, RenderSurface>,
}

impl SurfaceSet {
    pub fn insert(&mut self, id: SurfaceId, surface: RenderSurface) {
        if let Some(old) = self.surfaces.insert(id, surface) {
            log::debug!("Replaced surface {:?} ({})", id, old.label());
        }
    }

    pub fn get(&self, id: SurfaceId) -> Option<&RenderSurface> {
        self.surfaces.get(&id)
    }

    pub fn get_mut(&mut self, id: SurfaceId) -> Option<&mut RenderSurface> {
        self.surfaces.get_mut(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_none_loads_previous_contents() {
        let keep = SurfaceClear { color: None, depth: None };
        assert_eq!(keep.color_ops().load, wgpu::LoadOp::Load);
        assert_eq!(keep.depth_ops().load, wgpu::LoadOp::Load);
        let clear = SurfaceClear::TRANSPARENT;
        assert_eq!(clear.color_ops().load, wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT));
        assert_eq!(clear.depth_ops().load, wgpu::LoadOp::Clear(1.0));
    }
}
