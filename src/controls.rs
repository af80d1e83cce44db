//! Damped orbit controller.
//!
//! The camera orbits `target` on a sphere. Pointer input accumulates angular deltas and a zoom
//! scale, [`OrbitControls::update`] folds them into the camera once per frame. With damping
//! enabled the deltas are applied scaled by `damping_factor` and decay by
//! `1 - damping_factor` every update, so motion eases out over a few frames.

use cgmath::{InnerSpace, Point3, Vector3};

use crate::{camera::Camera, config::ControlsConfig};

const EPS: f32 = 1e-6;
/// Zoom multiplier per wheel step at `zoom_speed == 1`.
const ZOOM_STEP: f32 = 0.95;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Spherical {
    radius: f32,
    /// Azimuth around +Y, measured from +Z.
    theta: f32,
    /// Polar angle from +Y.
    phi: f32,
}

impl Spherical {
    fn from_offset(v: Vector3<f32>) -> Self {
        let radius = v.magnitude();
        if radius < EPS {
            return Self::default();
        }
        Self {
            radius,
            theta: v.x.atan2(v.z),
            phi: (v.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_offset(self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

#[derive(Clone, Debug)]
pub struct OrbitControls {
    pub config: ControlsConfig,
    /// Gates pointer input. `update` keeps integrating pending motion either way.
    pub enabled: bool,
    pub target: Point3<f32>,
    delta: Spherical,
    scale: f32,
    saved_position: Point3<f32>,
    saved_target: Point3<f32>,
    disposed: bool,
}

impl OrbitControls {
    pub fn new(config: ControlsConfig, camera: &Camera) -> Self {
        Self {
            config,
            enabled: true,
            target: camera.target,
            delta: Spherical::default(),
            scale: 1.0,
            saved_position: camera.position,
            saved_target: camera.target,
            disposed: false,
        }
    }

    fn accepts_input(&self) -> bool {
        self.enabled && !self.disposed
    }

    /// Converts a pointer drag in physical pixels into an orbit rotation. A drag across the
    /// full viewport height turns the camera by one full revolution.
    pub fn rotate_by_pixels(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        if !self.accepts_input() {
            return;
        }
        let height = viewport_height.max(1.0);
        let tau = std::f32::consts::TAU;
        self.rotate_left(tau * dx / height * self.config.rotate_speed);
        self.rotate_up(tau * dy / height * self.config.rotate_speed);
    }

    /// Positive `steps` move the camera closer.
    pub fn zoom_by(&mut self, steps: f32) {
        if !self.accepts_input() || !self.config.enable_zoom {
            return;
        }
        self.scale *= ZOOM_STEP.powf(self.config.zoom_speed * steps);
    }

    /// Panning is not supported. Kept so hosts can forward the gesture unconditionally.
    pub fn pan(&mut self, _dx: f32, _dy: f32) {
        if self.config.enable_pan {
            log::debug!("pan requested but the orbit controller has no pan mode");
        }
    }

    fn rotate_left(&mut self, angle: f32) {
        self.delta.theta -= angle;
    }

    fn rotate_up(&mut self, angle: f32) {
        self.delta.phi -= angle;
    }

    /// Advances the damping integration and moves the camera. Returns whether the camera
    /// moved.
    pub fn update(&mut self, camera: &mut Camera, dt: f32) -> bool {
        if self.disposed {
            return false;
        }
        let before = camera.position;
        let mut spherical = Spherical::from_offset(camera.position - self.target);

        if self.config.auto_rotate && self.accepts_input() {
            self.rotate_left(std::f32::consts::TAU / 60.0 * self.config.auto_rotate_speed * dt);
        }

        if self.config.enable_damping {
            spherical.theta += self.delta.theta * self.config.damping_factor;
            spherical.phi += self.delta.phi * self.config.damping_factor;
        } else {
            spherical.theta += self.delta.theta;
            spherical.phi += self.delta.phi;
        }
        spherical.phi = spherical.phi.clamp(EPS, std::f32::consts::PI - EPS);
        spherical.radius = (spherical.radius * self.scale)
            .clamp(self.config.min_distance, self.config.max_distance);

        camera.position = self.target + spherical.to_offset();
        camera.look_at(self.target);

        if self.config.enable_damping {
            let decay = 1.0 - self.config.damping_factor;
            self.delta.theta *= decay;
            self.delta.phi *= decay;
        } else {
            self.delta = Spherical::default();
        }
        self.scale = 1.0;

        (camera.position - before).magnitude2() > EPS
    }

    /// Restores the camera placement captured at construction and drops pending motion.
    pub fn reset(&mut self, camera: &mut Camera) {
        self.target = self.saved_target;
        camera.position = self.saved_position;
        camera.look_at(self.target);
        camera.update_projection_matrix();
        self.delta = Spherical::default();
        self.scale = 1.0;
    }

    /// Detaches the controller. Input and updates become no-ops.
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.delta = Spherical::default();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn has_pending_motion(&self) -> bool {
        self.delta.theta.abs() > EPS || self.delta.phi.abs() > EPS || (self.scale - 1.0).abs() > EPS
    }

    pub fn saved_position(&self) -> Point3<f32> {
        self.saved_position
    }
}
