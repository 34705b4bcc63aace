//! Addressing between the logical voxel cube and the square texture that stores it.
//!
//! The cube of side `S` is cut into `S` layers along z. Each layer is an `S x S`
//! tile, and tiles are laid out `N / S` per texture row, so layer `z` lands in
//! tile column `z % layers_per_row`, tile row `z / layers_per_row`.
//! `shaders/grid.wgsl` carries the same math for the GPU side.

use crate::error::{SculptError, SculptResult};

/// Bytes per texel of the voxel texture (RGBA8).
pub const VOXEL_TEXEL_BYTES: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridLayout {
    texture_side: u32,
    sculpt_side: u32,
    layers_per_row: u32,
}

impl GridLayout {
    pub fn new(texture_side: u32, sculpt_side: u32) -> SculptResult<Self> {
        if texture_side == 0 || sculpt_side == 0 {
            return Err(SculptError::InvalidConfig(
                "grid sides must be non-zero".to_string(),
            ));
        }
        if texture_side % sculpt_side != 0 {
            return Err(SculptError::InvalidConfig(format!(
                "texture side {texture_side} is not a multiple of sculpt side {sculpt_side}"
            )));
        }
        let texels = texture_side as u64 * texture_side as u64;
        let voxels = (sculpt_side as u64).pow(3);
        if texels != voxels {
            return Err(SculptError::InvalidConfig(format!(
                "{texture_side}x{texture_side} texels cannot hold exactly {sculpt_side}^3 voxels"
            )));
        }
        Ok(Self {
            texture_side,
            sculpt_side,
            layers_per_row: texture_side / sculpt_side,
        })
    }

    /// Side `N` of the square voxel texture.
    pub fn texture_side(&self) -> u32 {
        self.texture_side
    }

    /// Side `S` of the voxel cube.
    pub fn sculpt_side(&self) -> u32 {
        self.sculpt_side
    }

    pub fn layers_per_row(&self) -> u32 {
        self.layers_per_row
    }

    pub fn voxel_count(&self) -> u32 {
        self.sculpt_side.pow(3)
    }

    pub fn contains(&self, x: u32, y: u32, z: u32) -> bool {
        x < self.sculpt_side && y < self.sculpt_side && z < self.sculpt_side
    }

    /// Texel holding voxel `(x, y, z)`, or `None` outside the cube.
    pub fn encode(&self, x: u32, y: u32, z: u32) -> Option<(u32, u32)> {
        if !self.contains(x, y, z) {
            return None;
        }
        let s = self.sculpt_side;
        let u = (z % self.layers_per_row) * s + x;
        let v = (z / self.layers_per_row) * s + y;
        Some((u, v))
    }

    /// Voxel stored at texel `(u, v)`, or `None` outside the texture.
    pub fn decode(&self, u: u32, v: u32) -> Option<(u32, u32, u32)> {
        if u >= self.texture_side || v >= self.texture_side {
            return None;
        }
        let s = self.sculpt_side;
        let z = (v / s) * self.layers_per_row + u / s;
        Some((u % s, v % s, z))
    }

    /// Signed variant used when coordinates come from float math that may
    /// step outside the cube; negative components are rejected, not wrapped.
    pub fn encode_signed(&self, x: i32, y: i32, z: i32) -> Option<(u32, u32)> {
        if x < 0 || y < 0 || z < 0 {
            return None;
        }
        self.encode(x as u32, y as u32, z as u32)
    }

    /// Byte offset of texel `(u, v)` inside a tightly packed, row-major RGBA8
    /// readback of the voxel texture.
    pub fn texel_offset(&self, u: u32, v: u32) -> Option<usize> {
        if u >= self.texture_side || v >= self.texture_side {
            return None;
        }
        Some((v as usize * self.texture_side as usize + u as usize) * VOXEL_TEXEL_BYTES)
    }

    /// Size in bytes of a full RGBA8 readback.
    pub fn readback_len(&self) -> usize {
        self.texture_side as usize * self.texture_side as usize * VOXEL_TEXEL_BYTES
    }

    /// Look up the RGBA value of voxel `(x, y, z)` in a readback buffer.
    pub fn voxel_in<'a>(&self, texels: &'a [u8], x: u32, y: u32, z: u32) -> Option<&'a [u8]> {
        let (u, v) = self.encode(x, y, z)?;
        let offset = self.texel_offset(u, v)?;
        texels.get(offset..offset + VOXEL_TEXEL_BYTES)
    }
}
