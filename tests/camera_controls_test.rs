use approx::assert_relative_eq;
use cgmath::{EuclideanSpace, Point3};
use prism_ngin::{
    camera::{self, Camera},
    config::{CameraConfig, ControlsConfig},
    control::Control,
    controls::OrbitControls,
};

use crate::common::test_utils::{HEIGHT, WIDTH, sketch};
mod common;

fn rig(config: ControlsConfig) -> (Camera, OrbitControls) {
    let camera = Camera::new(&CameraConfig::default(), WIDTH, HEIGHT);
    let controls = OrbitControls::new(config, &camera);
    (camera, controls)
}

#[test]
fn should_follow_the_swoop_path() {
    let start = camera::swoop_position(0.0);
    assert_relative_eq!(start.x, 0.0);
    assert_relative_eq!(start.y, 2.0);
    assert_relative_eq!(start.z, 4.0);

    let quarter = camera::swoop_position(2.5);
    assert_relative_eq!(quarter.x, 2.0, epsilon = 1e-5);
    assert_relative_eq!(quarter.y, 0.0, epsilon = 1e-5);
    assert_relative_eq!(quarter.z, 4.0);
}

#[test]
fn should_place_the_swooping_camera_each_frame() {
    let mut sketch = sketch("glass-dragon");
    assert!(!sketch.controls().enabled);

    sketch.render(2.5, 0.016).unwrap();

    let camera = sketch.camera();
    let expected = camera::swoop_position(2.5);
    assert_relative_eq!(camera.position.x, expected.x, epsilon = 1e-5);
    assert_relative_eq!(camera.position.y, expected.y, epsilon = 1e-5);
    assert_relative_eq!(camera.position.z, expected.z, epsilon = 1e-5);
    assert_eq!(camera.target, Point3::origin());
}

#[test]
fn should_ignore_pointer_input_while_swooping() {
    let mut sketch = sketch("glass-dragon");
    sketch.controls_mut().rotate_by_pixels(120.0, 40.0, 600.0);
    sketch.controls_mut().zoom_by(3.0);
    assert!(!sketch.controls().has_pending_motion());
}

#[test]
fn should_switch_between_swoop_and_orbit_live() {
    let mut sketch = sketch("twin-dragons");
    assert!(sketch.controls().enabled);

    sketch.apply(Control::EnableSwoopingCamera(true)).unwrap();
    assert!(!sketch.controls().enabled);
    sketch.render(0.0, 0.016).unwrap();
    assert_relative_eq!(sketch.camera().position.y, 2.0, epsilon = 1e-5);

    sketch.apply(Control::EnableSwoopingCamera(false)).unwrap();
    assert!(sketch.controls().enabled);
    assert_eq!(sketch.camera().position, sketch.controls().saved_position());
    sketch.render(0.1, 0.016).unwrap();
    assert_relative_eq!(sketch.camera().distance(), 23.0, epsilon = 1e-3);
}

#[test]
fn should_ease_out_a_drag_over_several_updates() {
    let (mut camera, mut controls) = rig(ControlsConfig {
        damping_factor: 0.5,
        ..ControlsConfig::default()
    });
    controls.rotate_by_pixels(60.0, 0.0, 600.0);

    let before = camera.position;
    assert!(controls.update(&mut camera, 0.016));
    let first = camera.position;
    assert!(controls.has_pending_motion());
    assert!(controls.update(&mut camera, 0.016));
    let second = camera.position;

    let step1 = (first - before).x.abs();
    let step2 = (second - first).x.abs();
    assert!(step2 < step1, "second step {step2} should be smaller than {step1}");
    assert_relative_eq!(camera.distance(), 23.0, epsilon = 1e-3);
}

#[test]
fn should_apply_the_whole_drag_at_once_without_damping() {
    let (mut camera, mut controls) = rig(ControlsConfig {
        enable_damping: false,
        ..ControlsConfig::default()
    });
    controls.rotate_by_pixels(150.0, 0.0, 600.0);
    controls.update(&mut camera, 0.016);

    // a quarter of the viewport height is a quarter turn
    assert_relative_eq!(camera.position.x, -23.0, epsilon = 1e-3);
    assert_relative_eq!(camera.position.z, 0.0, epsilon = 1e-3);
    assert!(!controls.has_pending_motion());
    assert!(!controls.update(&mut camera, 0.016));
}

#[test]
fn should_clamp_zoom_to_the_distance_limits() {
    let (mut camera, mut controls) = rig(ControlsConfig::default());

    controls.zoom_by(100.0);
    controls.update(&mut camera, 0.016);
    assert_relative_eq!(camera.distance(), 10.0, epsilon = 1e-4);

    controls.zoom_by(-200.0);
    controls.update(&mut camera, 0.016);
    assert_relative_eq!(camera.distance(), 50.0, epsilon = 1e-3);
}

#[test]
fn should_not_zoom_when_zoom_is_disabled() {
    let (mut camera, mut controls) = rig(ControlsConfig {
        enable_zoom: false,
        ..ControlsConfig::default()
    });
    controls.zoom_by(5.0);
    controls.update(&mut camera, 0.016);
    assert_relative_eq!(camera.distance(), 23.0, epsilon = 1e-4);
}

#[test]
fn should_restore_the_start_placement_on_reset() {
    let (mut camera, mut controls) = rig(ControlsConfig::default());
    controls.rotate_by_pixels(80.0, 30.0, 600.0);
    controls.zoom_by(4.0);
    controls.update(&mut camera, 0.016);
    assert_ne!(camera.position, controls.saved_position());

    controls.reset(&mut camera);

    assert_eq!(camera.position, Point3::new(0.0, 0.0, 23.0));
    assert!(!controls.has_pending_motion());
}

#[test]
fn should_stop_responding_after_dispose() {
    let (mut camera, mut controls) = rig(ControlsConfig::default());
    controls.rotate_by_pixels(80.0, 0.0, 600.0);
    controls.dispose();
    controls.rotate_by_pixels(80.0, 0.0, 600.0);

    assert!(controls.is_disposed());
    assert!(!controls.update(&mut camera, 0.016));
    assert_eq!(camera.position, Point3::new(0.0, 0.0, 23.0));
}

#[test]
fn should_project_with_the_configured_frustum() {
    let camera = Camera::new(&CameraConfig::default(), 1600, 900);
    assert_relative_eq!(camera.aspect, 16.0 / 9.0);
    assert_relative_eq!(camera.near, 0.1);
    assert_relative_eq!(camera.far, 1000.0);
    assert_relative_eq!(camera.distance(), 23.0);
}
