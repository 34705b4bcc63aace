//! Camera, model and light transforms of the sculpting scene.
//!
//! Everything here is plain matrix math so it can be exercised without a GPU.
//! Matrices follow the OpenGL clip convention and are converted to wgpu's
//! `[0, 1]` depth range with [`OPENGL_TO_WGPU_MATRIX`] when projections are built.

use crate::config::{Axis, CameraConfig, LightConfig};
use cgmath::{
    Deg, Matrix4, One, Point3, Quaternion, Rad, Rotation3, SquareMatrix, Vector3, Vector4,
};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Rotation followed by translation, the only transform shape the scene uses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RigidTransform {
    pub rotation: Quaternion<f32>,
    pub position: Vector3<f32>,
}

impl RigidTransform {
    pub fn new(position: Vector3<f32>) -> Self {
        Self {
            rotation: Quaternion::one(),
            position,
        }
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position) * Matrix4::from(self.rotation)
    }
}

#[derive(Clone, Debug)]
pub struct OrbitCamera {
    /// Camera rotation and camera-space offset; `position.z` is the zoom depth.
    pub view: RigidTransform,
    /// Orientation and placement of the sculpt volume.
    pub model: RigidTransform,
    fov_y: Rad<f32>,
    near: f32,
    far: f32,
    aspect: f32,
    zoom_min: f32,
    zoom_max: f32,
    rotate_sensitivity: f32,
}

impl OrbitCamera {
    pub fn new(config: &CameraConfig, width: u32, height: u32) -> Self {
        let depth = config.initial_depth.clamp(config.zoom_min, config.zoom_max);
        Self {
            view: RigidTransform::new(Vector3::new(0.0, 0.0, depth)),
            model: RigidTransform::new(Vector3::new(0.0, 0.0, 0.0)),
            fov_y: Deg(config.fov_y_degrees).into(),
            near: config.near,
            far: config.far,
            aspect: aspect_ratio(width, height),
            zoom_min: config.zoom_min,
            zoom_max: config.zoom_max,
            rotate_sensitivity: config.rotate_sensitivity,
        }
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        self.view.matrix()
    }

    pub fn model_matrix(&self) -> Matrix4<f32> {
        self.model.matrix()
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn depth(&self) -> f32 {
        self.view.position.z
    }

    /// Recompute the projection aspect for a new viewport.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    /// Move the camera along its depth axis, clamped to the configured range.
    pub fn zoom(&mut self, delta: f32) {
        let z = self.view.position.z + delta;
        self.view.position.z = z.clamp(self.zoom_min, self.zoom_max);
    }

    /// Spin the model by a drag, given as fractions of the viewport size.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        let vertical = Quaternion::from_angle_x(Rad(dy * self.rotate_sensitivity));
        let horizontal = Quaternion::from_angle_y(Rad(dx * self.rotate_sensitivity));
        let rotation = vertical * (horizontal * self.model.rotation);
        self.model.rotation = normalize_quaternion(rotation);
    }

    /// Inverse of `view * model`; maps camera space back into model space.
    /// `None` only for a degenerate transform.
    pub fn view_model_inverse(&self) -> Option<Matrix4<f32>> {
        (self.view_matrix() * self.model_matrix()).invert()
    }

    /// Camera eye expressed in model (voxel-local) space.
    pub fn eye_in_model_space(&self) -> Option<Point3<f32>> {
        let inverse = self.view_model_inverse()?;
        let eye = inverse * Vector4::new(0.0, 0.0, 0.0, 1.0);
        Some(Point3::new(eye.x, eye.y, eye.z))
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

fn normalize_quaternion(q: Quaternion<f32>) -> Quaternion<f32> {
    let len = (q.s * q.s + q.v.x * q.v.x + q.v.y * q.v.y + q.v.z * q.v.z).sqrt();
    if len <= f32::EPSILON {
        Quaternion::one()
    } else {
        q * (1.0 / len)
    }
}

/// Fixed directional light used for the shadow pass.
#[derive(Clone, Debug)]
pub struct LightRig {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub shadow_bias: f32,
}

impl LightRig {
    pub fn new(config: &LightConfig) -> Self {
        let rotation = config
            .rotation
            .iter()
            .fold(Quaternion::one(), |acc, step| {
                let angle = Rad(step.radians);
                let delta = match step.axis {
                    Axis::X => Quaternion::from_angle_x(angle),
                    Axis::Y => Quaternion::from_angle_y(angle),
                    Axis::Z => Quaternion::from_angle_z(angle),
                };
                acc * delta
            });
        let transform = RigidTransform {
            rotation: normalize_quaternion(rotation),
            position: Vector3::from(config.position),
        };
        let e = config.ortho_extent;
        let projection = OPENGL_TO_WGPU_MATRIX * cgmath::ortho(-e, e, -e, e, config.near, config.far);
        Self {
            view: transform.matrix(),
            projection,
            shadow_bias: config.shadow_bias,
        }
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection * self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SculptConfig;
    use cgmath::InnerSpace;

    fn camera() -> OrbitCamera {
        OrbitCamera::new(&SculptConfig::default().camera, 1280, 720)
    }

    #[test]
    fn zoom_stays_inside_range() {
        let mut camera = camera();
        let deltas = [-1000.0, 3.5, 800.0, -12.0, 0.25, -499.0, 1e6, -1e6, 42.0];
        for delta in deltas {
            camera.zoom(delta);
            assert!((-500.0..=-10.0).contains(&camera.depth()), "depth {}", camera.depth());
        }
        camera.zoom(1e6);
        assert_eq!(camera.depth(), -10.0);
        camera.zoom(-1e6);
        assert_eq!(camera.depth(), -500.0);
    }

    #[test]
    fn initial_depth_is_clamped() {
        let mut config = SculptConfig::default().camera;
        config.initial_depth = -5.0;
        let camera = OrbitCamera::new(&config, 100, 100);
        assert_eq!(camera.depth(), -10.0);
    }

    #[test]
    fn rotation_keeps_unit_quaternion() {
        let mut camera = camera();
        for i in 0..200 {
            camera.rotate(0.013 * (i % 7) as f32, -0.007 * (i % 5) as f32);
        }
        let q = camera.model.rotation;
        let len = (q.s * q.s + q.v.magnitude2()).sqrt();
        assert!((len - 1.0).abs() < 1e-4);
    }

    #[test]
    fn horizontal_drag_spins_about_y() {
        let mut camera = camera();
        camera.rotate(std::f32::consts::FRAC_PI_2 / 30.0, 0.0);
        let x_axis = camera.model_matrix() * Vector4::new(1.0, 0.0, 0.0, 0.0);
        assert!(x_axis.y.abs() < 1e-5);
        assert!((x_axis.z + 1.0).abs() < 1e-4, "x axis maps to {:?}", x_axis);
    }

    #[test]
    fn eye_is_behind_origin_in_model_space() {
        let camera = camera();
        let eye = camera.eye_in_model_space().unwrap();
        assert!((eye.z - 150.0).abs() < 1e-3);
        assert!(eye.x.abs() < 1e-4 && eye.y.abs() < 1e-4);
    }

    #[test]
    fn projection_maps_near_and_far_into_unit_depth() {
        let camera = camera();
        let proj = camera.projection_matrix();
        let near = proj * Vector4::new(0.0, 0.0, -0.1, 1.0);
        let far = proj * Vector4::new(0.0, 0.0, -1000.0, 1.0);
        assert!((near.z / near.w).abs() < 1e-4);
        assert!((far.z / far.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn light_frustum_covers_the_seeded_sphere() {
        let light = LightRig::new(&SculptConfig::default().light);
        let vp = light.view_projection();
        for corner in [
            Vector4::new(-20.0, -20.0, -20.0, 1.0),
            Vector4::new(20.0, 20.0, 20.0, 1.0),
            Vector4::new(20.0, -20.0, 20.0, 1.0),
            Vector4::new(-20.0, 20.0, -20.0, 1.0),
        ] {
            let clip = vp * corner;
            assert!(clip.x.abs() <= 1.0 && clip.y.abs() <= 1.0, "{:?}", clip);
            assert!((0.0..=1.0).contains(&clip.z), "{:?}", clip);
        }
    }
}
