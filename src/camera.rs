use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Vector3};

use crate::config::CameraConfig;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Radius of the swooping camera path.
pub const SWOOP_RADIUS: f32 = 2.0;
/// Seconds per revolution of the swooping camera.
pub const SWOOP_PERIOD: f32 = 10.0;
pub const SWOOP_HEIGHT: f32 = 4.0;

/// Position of the swooping camera at `time` seconds.
pub fn swoop_position(time: f32) -> Point3<f32> {
    let angle = time / SWOOP_PERIOD * std::f32::consts::TAU;
    Point3::new(
        angle.sin() * SWOOP_RADIUS,
        angle.cos() * SWOOP_RADIUS,
        SWOOP_HEIGHT,
    )
}

/// A perspective camera looking at `target`.
///
/// The projection matrix is cached; call [`Camera::update_projection_matrix`] after changing
/// `aspect`, `fovy`, `near` or `far`.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fovy: Rad<f32>,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    projection: Matrix4<f32>,
}

impl Camera {
    pub fn new(config: &CameraConfig, width: u32, height: u32) -> Self {
        let mut camera = Self {
            position: Point3::new(0.0, 0.0, config.distance),
            target: Point3::origin(),
            up: Vector3::unit_y(),
            fovy: cgmath::Deg(config.fov_degrees).into(),
            aspect: aspect_ratio(width, height),
            near: config.near,
            far: config.far,
            projection: Matrix4::from_scale(1.0),
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn update_projection_matrix(&mut self) {
        self.projection = cgmath::perspective(self.fovy, self.aspect, self.near, self.far);
    }

    pub fn projection(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn look_at(&mut self, target: Point3<f32>) {
        self.target = target;
    }

    pub fn view(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn view_proj(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * self.projection * self.view()
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).magnitude()
    }
}

pub(crate) fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = camera.view_proj().into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}
