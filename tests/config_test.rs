use approx::assert_relative_eq;
use prism_ngin::{
    SketchError, Variant,
    config::{CameraConfig, ControlsConfig, Overrides, Rgb, SceneConfig},
};

use crate::common::test_utils::{HEIGHT, RecordingBackend, WIDTH};
mod common;

#[test]
fn should_ship_defaults_inside_their_ranges() {
    SceneConfig::default().validate().unwrap();
    for name in Variant::names() {
        let variant = Variant::builtin(name).unwrap();
        variant.options.validate().unwrap();
        assert_eq!(variant.name, *name);
    }
}

#[test]
fn should_configure_every_builtin_variant() {
    for name in Variant::names() {
        let variant = Variant::builtin(name).unwrap();
        let sketch =
            prism_ngin::Sketch::configure(variant, RecordingBackend::default(), WIDTH, HEIGHT)
                .unwrap();
        assert_eq!(sketch.materials().len(), 1, "{name} starts with only the glass");
        assert!(sketch.scene().is_empty());
    }
}

#[test]
fn should_start_the_glass_at_the_variant_tint() {
    for (name, tint) in [
        ("twin-dragons", Rgb::WHITE),
        ("glass-dragon", Rgb::WHITE),
        ("chrome-dragon", Rgb::WHITE),
        ("frosted", Rgb(0xd9f0ff)),
    ] {
        let variant = Variant::builtin(name).unwrap();
        assert_eq!(variant.glass_tint, tint);
        let sketch =
            prism_ngin::Sketch::configure(variant, RecordingBackend::default(), WIDTH, HEIGHT)
                .unwrap();
        assert_eq!(sketch.glass_material().unwrap().color, tint, "{name}");
    }
}

#[test]
fn should_reject_unknown_variants() {
    assert!(matches!(
        Variant::builtin("teapot"),
        Err(SketchError::UnknownVariant(name)) if name == "teapot"
    ));
}

#[test]
fn should_list_textures_before_meshes_in_requests() {
    let variant = Variant::builtin("twin-dragons").unwrap();
    let requests = variant.requests();
    let first_mesh = requests
        .iter()
        .position(|(key, _)| !key.is_texture())
        .unwrap();
    assert_eq!(first_mesh, 4);
    assert!(requests[first_mesh..].iter().all(|(key, _)| !key.is_texture()));
    assert_eq!(requests.len(), 7);
}

#[test]
fn should_parse_colours_as_integers_or_hex_strings() {
    let config = SceneConfig::from_toml_str(
        r##"
        color = 0x336699
        emissive_color = "#ff0000"
        "##,
    )
    .unwrap();
    assert_eq!(config.color, Rgb(0x336699));
    assert_eq!(config.emissive_color, Rgb(0xff0000));

    assert!(SceneConfig::from_toml_str(r##"color = "#zzzzzz""##).is_err());
    assert!(SceneConfig::from_toml_str("color = 0x1000000").is_err());
}

#[test]
fn should_convert_colours_to_linear_light() {
    assert_eq!(Rgb::WHITE.to_linear(), [1.0, 1.0, 1.0]);
    assert_eq!(Rgb::BLACK.to_linear(), [0.0, 0.0, 0.0]);
    let [r, _, _] = Rgb(0x808080).to_linear();
    assert_relative_eq!(r, 0.2158605, epsilon = 1e-5);
}

#[test]
fn should_keep_unnamed_fields_when_layering_overrides() {
    let overrides = Overrides::from_toml_str(
        r#"
        [options]
        roughness = 0.7
        enable_rotation = true

        [camera]
        distance = 30.0
        "#,
    )
    .unwrap();
    let base = Variant::builtin("glass-dragon").unwrap().options;

    let merged = overrides.apply_options(&base).unwrap();

    assert_relative_eq!(merged.roughness, 0.7);
    assert!(merged.enable_rotation);
    assert_eq!(merged.normal_repeat, base.normal_repeat);
    assert!(merged.enable_swooping_camera);
    let camera = overrides.camera.unwrap();
    assert_relative_eq!(camera.distance, 30.0);
    assert_relative_eq!(camera.fov_degrees, CameraConfig::default().fov_degrees);
    assert!(overrides.controls.is_none());
}

#[test]
fn should_leave_options_alone_without_an_options_table() {
    let overrides = Overrides::from_toml_str("[controls]\nmin_distance = 5.0\n").unwrap();
    let base = SceneConfig::default();
    assert_eq!(overrides.apply_options(&base).unwrap(), base);
    let controls = overrides.controls.unwrap();
    assert_relative_eq!(controls.min_distance, 5.0);
    assert_relative_eq!(controls.max_distance, ControlsConfig::default().max_distance);
}

#[test]
fn should_surface_toml_errors_as_config_errors() {
    let err = Overrides::from_toml_str("[options]\nroughness = \"rough\"")
        .and_then(|o| o.apply_options(&SceneConfig::default()))
        .unwrap_err();
    assert!(matches!(err, SketchError::Config(_)));

    let err = Overrides::from_toml_str("[camera\n").unwrap_err();
    assert!(matches!(err, SketchError::Config(_)));
}

#[test]
fn should_catch_out_of_range_overrides_on_validate() {
    let overrides = Overrides::from_toml_str("[options]\nbloom_radius = 2.0\n").unwrap();
    let merged = overrides.apply_options(&SceneConfig::default()).unwrap();
    assert!(matches!(
        merged.validate(),
        Err(SketchError::InvalidConfig {
            field: "bloom_radius",
            ..
        })
    ));
}
