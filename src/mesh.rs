use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
}

impl Vertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

const QUAD_INDICES: &[u16] = &[0, 1, 2, 0, 2, 3];

const SCREEN_QUAD: &[Vertex] = &[
    Vertex { position: [-1.0, -1.0, 0.0] },
    Vertex { position: [1.0, -1.0, 0.0] },
    Vertex { position: [1.0, 1.0, 0.0] },
    Vertex { position: [-1.0, 1.0, 0.0] },
];

/// Small indexed mesh with 16-bit indices.
pub struct Mesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl Mesh {
    pub fn new(device: &wgpu::Device, label: &str, vertices: &[Vertex], indices: &[u16]) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertex Buffer")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Index Buffer")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }
    }

    /// Two triangles covering clip space.
    pub fn screen_quad(device: &wgpu::Device) -> Self {
        Self::new(device, "Screen Quad", SCREEN_QUAD, QUAD_INDICES)
    }

    /// World-fixed ground plane one volume height below the volume center.
    pub fn floor(device: &wgpu::Device, sculpt_side: u32) -> Self {
        let vertices = floor_vertices(sculpt_side);
        Self::new(device, "Floor", &vertices, QUAD_INDICES)
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

pub fn floor_vertices(sculpt_side: u32) -> [Vertex; 4] {
    let height = -(sculpt_side as f32);
    let extent = 2.0 * sculpt_side as f32;
    [
        Vertex { position: [-extent, height, -extent] },
        Vertex { position: [-extent, height, extent] },
        Vertex { position: [extent, height, extent] },
        Vertex { position: [extent, height, -extent] },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_sits_below_the_volume() {
        let vertices = floor_vertices(64);
        assert!(vertices.iter().all(|v| v.position[1] == -64.0));
        let max_x = vertices.iter().map(|v| v.position[0]).fold(f32::MIN, f32::max);
        assert!(max_x > 32.0);
    }

    #[test]
    fn vertex_layout_matches_struct() {
        let layout = Vertex::layout();
        assert_eq!(layout.array_stride, 12);
        assert_eq!(layout.attributes[0].shader_location, 0);
    }
}
