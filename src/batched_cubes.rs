//! Static cube geometry for every voxel slot, split into 16-bit indexable batches.
//!
//! Cubes are pre-placed on a grid with a spacing of two units, so the voxel
//! program recovers a cube's slot from its vertex position alone:
//! `slot = round(position / 2)`. No per-voxel data is uploaded.

use crate::mesh::Vertex;
use wgpu::util::DeviceExt;

/// Most cubes one buffer can hold: `36 * 1820 < 2^16`.
pub const MAX_PER_BUFFER: u32 = 1820;
pub const VERTICES_PER_CUBE: u32 = 8;
pub const INDICES_PER_CUBE: u32 = 36;

const CUBE_CORNERS: [[f32; 3]; 8] = [
    [-0.5, -0.5, 0.5],
    [0.5, -0.5, 0.5],
    [0.5, 0.5, 0.5],
    [-0.5, 0.5, 0.5],
    [-0.5, -0.5, -0.5],
    [-0.5, 0.5, -0.5],
    [0.5, 0.5, -0.5],
    [0.5, -0.5, -0.5],
];

#[rustfmt::skip]
const CUBE_INDICES: [u16; 36] = [
    0, 1, 2, 0, 2, 3, // front
    4, 5, 6, 4, 6, 7, // back
    5, 3, 2, 5, 2, 6, // top
    4, 7, 1, 4, 1, 0, // bottom
    7, 6, 2, 7, 2, 1, // right
    4, 0, 3, 4, 3, 5, // left
];

/// One indexed draw of a batch buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchDraw {
    pub buffer: usize,
    pub index_count: u32,
}

/// Buffer split of `max_cube_count` cubes on a `grid_side` grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchLayout {
    max_cube_count: u32,
    grid_side: u32,
}

impl BatchLayout {
    pub fn new(max_cube_count: u32, grid_side: u32) -> Self {
        Self {
            max_cube_count,
            grid_side: grid_side.max(1),
        }
    }

    pub fn max_cube_count(&self) -> u32 {
        self.max_cube_count
    }

    pub fn buffer_count(&self) -> usize {
        self.max_cube_count.div_ceil(MAX_PER_BUFFER) as usize
    }

    /// Cubes stored in buffer `buffer`.
    pub fn cubes_in_buffer(&self, buffer: usize) -> u32 {
        let start = buffer as u64 * MAX_PER_BUFFER as u64;
        let remaining = (self.max_cube_count as u64).saturating_sub(start);
        remaining.min(MAX_PER_BUFFER as u64) as u32
    }

    /// Grid offset of cube `cube` (global index).
    pub fn cube_offset(&self, cube: u32) -> [f32; 3] {
        let side = self.grid_side;
        [
            (cube % side) as f32 * 2.0,
            (cube / (side * side)) as f32 * 2.0,
            ((cube / side) % side) as f32 * 2.0,
        ]
    }

    pub fn vertices_for_buffer(&self, buffer: usize) -> Vec<Vertex> {
        let first = buffer as u32 * MAX_PER_BUFFER;
        (0..self.cubes_in_buffer(buffer))
            .flat_map(|local| {
                let [ox, oy, oz] = self.cube_offset(first + local);
                CUBE_CORNERS.iter().map(move |[x, y, z]| Vertex {
                    position: [x + ox, y + oy, z + oz],
                })
            })
            .collect()
    }

    /// Draws covering the first `count` cubes; `None` draws everything.
    /// Counts above the capacity are truncated.
    pub fn draw_plan(&self, count: Option<u32>) -> Vec<BatchDraw> {
        let count = count.map_or(self.max_cube_count, |c| c.min(self.max_cube_count));
        (0..self.buffer_count())
            .map_while(|buffer| {
                let start = buffer as u32 * MAX_PER_BUFFER;
                if start >= count {
                    return None;
                }
                let cubes = (count - start).min(MAX_PER_BUFFER);
                Some(BatchDraw {
                    buffer,
                    index_count: cubes * INDICES_PER_CUBE,
                })
            })
            .collect()
    }
}

/// Index list shared by every batch buffer.
pub fn batch_indices() -> Vec<u16> {
    (0..MAX_PER_BUFFER as u16)
        .flat_map(|local| {
            CUBE_INDICES
                .iter()
                .map(move |index| index + local * VERTICES_PER_CUBE as u16)
        })
        .collect()
}

pub struct BatchedCubes {
    layout: BatchLayout,
    vertex_buffers: Vec<wgpu::Buffer>,
    index_buffer: wgpu::Buffer,
}

impl BatchedCubes {
    pub fn new(device: &wgpu::Device, max_cube_count: u32, grid_side: u32) -> Self {
        let layout = BatchLayout::new(max_cube_count, grid_side);
        let vertex_buffers = (0..layout.buffer_count())
            .map(|buffer| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("Cube Batch {buffer} Vertex Buffer")),
                    contents: bytemuck::cast_slice(&layout.vertices_for_buffer(buffer)),
                    usage: wgpu::BufferUsages::VERTEX,
                })
            })
            .collect::<Vec<_>>();
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Cube Batch Index Buffer"),
            contents: bytemuck::cast_slice(&batch_indices()),
            usage: wgpu::BufferUsages::INDEX,
        });
        log::info!(
            "Built {} cube batch buffers for {} voxel slots",
            vertex_buffers.len(),
            max_cube_count
        );
        Self {
            layout,
            vertex_buffers,
            index_buffer,
        }
    }

    pub fn layout(&self) -> &BatchLayout {
        &self.layout
    }

    /// Issue one indexed draw per planned batch. The voxel program must be
    /// applied on `pass` beforehand.
    pub fn render(&self, pass: &mut wgpu::RenderPass<'_>, count: Option<u32>) {
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        for draw in self.layout.draw_plan(count) {
            pass.set_vertex_buffer(0, self.vertex_buffers[draw.buffer].slice(..));
            pass.draw_indexed(0..draw.index_count, 0, 0..1);
        }
    }
}
