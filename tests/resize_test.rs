use approx::assert_relative_eq;
use prism_ngin::{SketchError, backend::SurfaceSize, sketch::MAX_PIXEL_RATIO};

use crate::common::test_utils::{HEIGHT, WIDTH, sketch};
mod common;

fn size(width: u32, height: u32) -> SurfaceSize {
    SurfaceSize { width, height }
}

#[test]
fn should_size_the_backend_at_configure() {
    let sketch = sketch("twin-dragons");
    assert_eq!(sketch.backend().resizes, vec![size(WIDTH, HEIGHT)]);
    assert_relative_eq!(sketch.camera().aspect, WIDTH as f32 / HEIGHT as f32);
}

#[test]
fn should_ignore_repeated_resizes_with_the_same_arguments() {
    let mut sketch = sketch("twin-dragons");
    sketch.resize(1.0, 1024, 768).unwrap();
    sketch.resize(1.0, 1024, 768).unwrap();
    sketch.resize(1.0, 1024, 768).unwrap();

    assert_eq!(sketch.backend().resizes, vec![size(WIDTH, HEIGHT), size(1024, 768)]);
}

#[test]
fn should_clamp_the_pixel_ratio() {
    let mut sketch = sketch("twin-dragons");
    sketch.resize(3.0, 640, 480).unwrap();

    assert_relative_eq!(sketch.composer().pixel_ratio(), MAX_PIXEL_RATIO);
    assert_eq!(sketch.composer().size(), (640, 480));
    assert_eq!(sketch.composer().drawing_buffer_size(), (1280, 960));
    assert_eq!(sketch.backend().resizes.last(), Some(&size(1280, 960)));

    // a different ratio that clamps to the same value changes nothing
    sketch.resize(4.0, 640, 480).unwrap();
    assert_eq!(sketch.backend().resizes.len(), 2);
}

#[test]
fn should_scale_the_drawing_buffer_by_fractional_ratios() {
    let mut sketch = sketch("twin-dragons");
    sketch.resize(1.5, 801, 601).unwrap();
    assert_eq!(sketch.composer().drawing_buffer_size(), (1201, 901));
}

#[test]
fn should_fall_back_to_unit_ratio_for_nonsense_ratios() {
    let mut sketch = sketch("twin-dragons");
    sketch.resize(f32::NAN, 300, 200).unwrap();
    assert_relative_eq!(sketch.composer().pixel_ratio(), 1.0);
    sketch.resize(-2.0, 300, 100).unwrap();
    assert_relative_eq!(sketch.composer().pixel_ratio(), 1.0);
}

#[test]
fn should_ignore_zero_sized_viewports() {
    let mut sketch = sketch("twin-dragons");
    sketch.resize(1.0, 0, 600).unwrap();
    sketch.resize(1.0, 800, 0).unwrap();

    assert_eq!(sketch.backend().resizes.len(), 1);
    assert_relative_eq!(sketch.camera().aspect, WIDTH as f32 / HEIGHT as f32);
}

#[test]
fn should_update_camera_aspect_and_bloom_resolution() {
    let mut sketch = sketch("twin-dragons");
    sketch.resize(2.0, 1000, 500).unwrap();
    sketch.render(0.0, 0.0).unwrap();

    assert_relative_eq!(sketch.camera().aspect, 2.0);
    let frame = sketch.backend().last_frame().unwrap();
    assert_eq!(frame.bloom.resolution, [1000, 500]);
}

#[test]
fn should_accept_resizes_while_assets_are_loading() {
    let mut sketch = sketch("twin-dragons");
    sketch.begin_loading().unwrap();
    sketch.resize(1.0, 320, 240).unwrap();
    sketch.render(0.0, 0.016).unwrap();
    assert_eq!(sketch.backend().resizes.last(), Some(&size(320, 240)));
}

#[test]
fn should_reject_resize_after_unload() {
    let mut sketch = sketch("twin-dragons");
    sketch.unload().unwrap();
    assert!(matches!(sketch.resize(1.0, 320, 240), Err(SketchError::Disposed)));
    assert_eq!(sketch.backend().resizes.len(), 1);
}
