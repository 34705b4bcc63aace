//! Screen-space picking against the position buffer.
//!
//! The position pass writes, for every pixel, the normalized grid-space point
//! of the nearest surface and a tag in alpha. Picking is a lookup of the pixel
//! under the pointer; no CPU copy of the voxels is involved.

use crate::camera::OrbitCamera;
use crate::config::Axis;
use crate::grid_encoding::GridLayout;
use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, SquareMatrix, Vector3, Vector4};

/// Alpha written for voxel surfaces.
pub const VOXEL_TAG: f32 = 1.0;
/// Alpha written for the floor plane.
pub const FLOOR_TAG: f32 = 0.5;

/// Pixel of a `width x height` target under a normalized pointer.
pub fn pointer_to_pixel(nx: f32, ny: f32, width: u32, height: u32) -> (u32, u32) {
    let [u, v] = pointer_to_uv(nx, ny);
    let px = (u * width as f32).floor() as i64;
    let py = (v * height as f32).floor() as i64;
    (
        px.clamp(0, width.saturating_sub(1) as i64) as u32,
        py.clamp(0, height.saturating_sub(1) as i64) as u32,
    )
}

/// Texture coordinate (origin top left) under a normalized pointer.
pub fn pointer_to_uv(nx: f32, ny: f32) -> [f32; 2] {
    [
        ((nx + 1.0) * 0.5).clamp(0.0, 1.0),
        ((1.0 - ny) * 0.5).clamp(0.0, 1.0),
    ]
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SurfaceHit {
    Background,
    Floor { point: [f32; 3] },
    Voxel { voxel: [u32; 3], point: [f32; 3] },
}

impl SurfaceHit {
    pub fn from_texel(texel: [f32; 4], layout: &GridLayout) -> Self {
        let [x, y, z, tag] = texel;
        let point = [x, y, z];
        if tag < (FLOOR_TAG * 0.5) {
            return SurfaceHit::Background;
        }
        if tag < (FLOOR_TAG + VOXEL_TAG) * 0.5 {
            return SurfaceHit::Floor { point };
        }
        match voxel_at(point, layout) {
            Some(voxel) => SurfaceHit::Voxel { voxel, point },
            None => SurfaceHit::Background,
        }
    }

    pub fn point(&self) -> Option<[f32; 3]> {
        match self {
            SurfaceHit::Background => None,
            SurfaceHit::Floor { point } | SurfaceHit::Voxel { point, .. } => Some(*point),
        }
    }
}

/// Decode one position texel read back in `format`.
///
/// Returns `None` for formats the position pass never renders to, or when
/// `bytes` is shorter than one texel.
pub fn decode_position_texel(format: wgpu::TextureFormat, bytes: &[u8]) -> Option<[f32; 4]> {
    match format {
        wgpu::TextureFormat::Rgba32Float => bytes.get(..16).map(bytemuck::pod_read_unaligned::<[f32; 4]>),
        wgpu::TextureFormat::Rgba16Float => {
            let halves: [u16; 4] = bytemuck::pod_read_unaligned(bytes.get(..8)?);
            Some(halves.map(|bits| half::f16::from_bits(bits).to_f32()))
        }
        _ => None,
    }
}

/// Voxel containing a normalized grid-space point.
pub fn voxel_at(point: [f32; 3], layout: &GridLayout) -> Option<[u32; 3]> {
    let side = layout.sculpt_side() as f32;
    let mut voxel = [0u32; 3];
    for (slot, component) in voxel.iter_mut().zip(point) {
        let index = (component * side).floor();
        if !(0.0..side).contains(&index) {
            return None;
        }
        *slot = index as u32;
    }
    Some(voxel)
}

/// Model-local coordinates to normalized grid space.
pub fn local_to_normalized(local: Point3<f32>, sculpt_side: u32) -> Point3<f32> {
    let side = sculpt_side as f32;
    Point3::new(
        local.x / side + 0.5,
        local.y / side + 0.5,
        local.z / side + 0.5,
    )
}

/// A ray in normalized grid space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }

    /// Intersection with the plane `axis = value`, in front of the origin.
    pub fn intersect_axis_plane(&self, axis: Axis, value: f32) -> Option<Point3<f32>> {
        let (origin, direction) = match axis {
            Axis::X => (self.origin.x, self.direction.x),
            Axis::Y => (self.origin.y, self.direction.y),
            Axis::Z => (self.origin.z, self.direction.z),
        };
        if direction.abs() <= f32::EPSILON {
            return None;
        }
        let t = (value - origin) / direction;
        (t >= 0.0).then(|| self.at(t))
    }
}

/// Ray from the camera through a normalized pointer position.
pub fn view_ray(camera: &OrbitCamera, sculpt_side: u32, nx: f32, ny: f32) -> Option<Ray> {
    let clip_from_local: Matrix4<f32> =
        camera.projection_matrix() * camera.view_matrix() * camera.model_matrix();
    let local_from_clip = clip_from_local.invert()?;
    let unproject = |depth: f32| {
        let p = local_from_clip * Vector4::new(nx, ny, depth, 1.0);
        Point3::from_vec(p.truncate() / p.w)
    };
    let near = local_to_normalized(unproject(0.0), sculpt_side);
    let far = local_to_normalized(unproject(1.0), sculpt_side);
    let direction = far - near;
    if direction.magnitude2() <= f32::EPSILON {
        return None;
    }
    Some(Ray {
        origin: near,
        direction: direction.normalize(),
    })
}

/// Result of a pick at a pointer position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickResult {
    pub pixel: (u32, u32),
    pub hit: SurfaceHit,
    pub ray: Option<Ray>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SculptConfig;
    use cgmath::{MetricSpace, Quaternion, Rad, Rotation3};

    fn layout() -> GridLayout {
        GridLayout::new(512, 64).unwrap()
    }

    #[test]
    fn pointer_maps_to_pixels_top_left_origin() {
        assert_eq!(pointer_to_pixel(-1.0, 1.0, 800, 600), (0, 0));
        assert_eq!(pointer_to_pixel(1.0, -1.0, 800, 600), (799, 599));
        assert_eq!(pointer_to_pixel(0.0, 0.0, 800, 600), (400, 300));
    }

    #[test]
    fn texel_tags_select_surface_kind() {
        let layout = layout();
        assert_eq!(SurfaceHit::from_texel([0.0; 4], &layout), SurfaceHit::Background);
        assert!(matches!(
            SurfaceHit::from_texel([0.5, -0.1, 0.5, FLOOR_TAG], &layout),
            SurfaceHit::Floor { .. }
        ));
        let center = |i: u32| (i as f32 + 0.5) / 64.0;
        let texel = [center(3), center(60), center(17), VOXEL_TAG];
        assert_eq!(
            SurfaceHit::from_texel(texel, &layout),
            SurfaceHit::Voxel {
                voxel: [3, 60, 17],
                point: [texel[0], texel[1], texel[2]],
            }
        );
        assert_eq!(
            SurfaceHit::from_texel([1.2, 0.5, 0.5, VOXEL_TAG], &layout),
            SurfaceHit::Background
        );
    }

    #[test]
    fn position_texels_decode_in_both_formats() {
        let layout = layout();
        let center = |i: u32| (i as f32 + 0.5) / 64.0;
        let texel = [center(40), center(9), center(63), VOXEL_TAG];

        let full: Vec<u8> = bytemuck::cast_slice(&texel).to_vec();
        assert_eq!(decode_position_texel(wgpu::TextureFormat::Rgba32Float, &full), Some(texel));

        let halves = texel.map(|c| half::f16::from_f32(c).to_bits());
        let packed: Vec<u8> = bytemuck::cast_slice(&halves).to_vec();
        let decoded = decode_position_texel(wgpu::TextureFormat::Rgba16Float, &packed).unwrap();
        // Half precision still resolves the voxel.
        assert_eq!(
            SurfaceHit::from_texel(decoded, &layout),
            SurfaceHit::Voxel {
                voxel: [40, 9, 63],
                point: [decoded[0], decoded[1], decoded[2]],
            }
        );
        for (got, want) in decoded.iter().zip(texel) {
            assert!((got - want).abs() < 1e-3, "{got} vs {want}");
        }
    }

    #[test]
    fn short_or_foreign_texels_are_rejected() {
        assert_eq!(decode_position_texel(wgpu::TextureFormat::Rgba32Float, &[0; 8]), None);
        assert_eq!(decode_position_texel(wgpu::TextureFormat::Rgba16Float, &[0; 6]), None);
        assert_eq!(decode_position_texel(wgpu::TextureFormat::Rgba8Unorm, &[0; 16]), None);
    }

    #[test]
    fn center_pixel_of_top_down_view_finds_the_surface() {
        let layout = layout();
        let mut camera = OrbitCamera::new(&SculptConfig::default().camera, 640, 640);
        camera.model.rotation = Quaternion::from_angle_x(Rad(std::f32::consts::FRAC_PI_2));

        let ray = view_ray(&camera, 64, 0.0, 0.0).unwrap();
        assert!(ray.direction.y < -0.999, "ray {:?}", ray);

        // Solid slab up to layer 40; its top face sits at y = 41 / 64.
        let top = 41.0 / 64.0;
        let surface = ray.intersect_axis_plane(Axis::Y, top).unwrap();
        let first_solid = [32u32, 40, 32];

        // What the position pass stores for that pixel: the center of the top voxel.
        let center = |i: u32| (i as f32 + 0.5) / 64.0;
        let texel = [center(32), center(40), center(32), VOXEL_TAG];
        let hit = SurfaceHit::from_texel(texel, &layout);
        let SurfaceHit::Voxel { voxel, point } = hit else {
            panic!("expected a voxel hit, got {hit:?}");
        };
        for axis in 0..3 {
            assert!(voxel[axis].abs_diff(first_solid[axis]) <= 1);
        }
        let distance = Point3::from(point).distance(surface);
        assert!(distance <= 1.0 / 64.0, "hit {distance} away from the surface");
    }

    #[test]
    fn plane_behind_the_ray_is_missed() {
        let ray = Ray {
            origin: Point3::new(0.5, 2.0, 0.5),
            direction: Vector3::new(0.0, -1.0, 0.0),
        };
        assert!(ray.intersect_axis_plane(Axis::Y, 3.0).is_none());
        assert!(ray.intersect_axis_plane(Axis::X, 0.7).is_none());
        let p = ray.intersect_axis_plane(Axis::Y, 0.25).unwrap();
        assert!((p.y - 0.25).abs() < 1e-6);
    }
}
