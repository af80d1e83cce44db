use approx::assert_relative_eq;
use prism_ngin::{
    Phase, SketchError,
    assets::{AssetKey, Slot},
    config::SceneConfig,
};

use crate::common::test_utils::{HEIGHT, RecordingBackend, WIDTH, failed, load_everything, loaded, sketch};
mod common;

#[test]
fn should_render_background_only_frame_before_any_asset() {
    let mut sketch = sketch("twin-dragons");
    sketch.resize(1.0, 800, 600).unwrap();
    sketch.render(0.0, 0.0).unwrap();

    let frame = sketch.backend().last_frame().expect("one frame drawn");
    assert!(frame.items.is_empty());
    assert_eq!(frame.clear_color, [0.0, 0.0, 0.0, 1.0]);
    assert_eq!(sketch.scene().child_count(sketch.scene().root()), 0);
    assert_eq!(sketch.frames(), 1);
}

#[test]
fn should_configure_for_every_option_set_inside_the_documented_ranges() {
    let corners = [
        SceneConfig {
            roughness: 0.0,
            metalness: 0.0,
            transmission: 0.0,
            clearcoat: 0.0,
            ior: 1.0,
            ..SceneConfig::default()
        },
        SceneConfig {
            roughness: 1.0,
            metalness: 1.0,
            transmission: 1.0,
            clearcoat: 1.0,
            ior: 2.33,
            normal_repeat: 16,
            ..SceneConfig::default()
        },
    ];
    for options in corners {
        let mut variant = prism_ngin::Variant::builtin("twin-dragons").unwrap();
        variant.options = options;
        assert!(prism_ngin::Sketch::configure(variant, RecordingBackend::default(), WIDTH, HEIGHT).is_ok());
    }
}

#[test]
fn should_reject_out_of_range_options_at_configure() {
    let mut variant = prism_ngin::Variant::builtin("twin-dragons").unwrap();
    variant.options.ior = 3.0;
    let result = prism_ngin::Sketch::configure(variant, RecordingBackend::default(), WIDTH, HEIGHT);
    assert!(matches!(
        result,
        Err(SketchError::InvalidConfig { field: "ior", .. })
    ));
}

#[test]
fn should_stay_loading_until_every_slot_settles() {
    let mut sketch = sketch("twin-dragons");
    let requests = sketch.begin_loading().unwrap();
    assert_eq!(requests.len(), 7);
    assert_eq!(sketch.phase(), Phase::Loading);

    for request in &requests[..requests.len() - 1] {
        sketch.complete(loaded(request.key)).unwrap();
    }
    assert_eq!(sketch.phase(), Phase::Loading);

    let last = requests.last().unwrap().key;
    assert!(sketch.complete(failed(last)).is_err());
    assert_eq!(sketch.phase(), Phase::Ready);
    assert!(matches!(sketch.slots().get(last), Some(Slot::Failed(_))));
}

#[test]
fn should_add_exactly_one_root_child_per_mesh_completion() {
    let mut sketch = sketch("twin-dragons");
    sketch.begin_loading().unwrap();
    let root = sketch.scene().root();

    sketch.complete(loaded(AssetKey::Mesh(0))).unwrap();
    assert_eq!(sketch.scene().child_count(root), 1);

    sketch.complete(loaded(AssetKey::Mesh(1))).unwrap();
    assert_eq!(sketch.scene().child_count(root), 2);
    let metal = sketch.mesh_node(AssetKey::Mesh(1)).unwrap();
    // seven satellites hang off the metal dragon
    assert_eq!(sketch.scene().child_count(metal), 7);

    sketch.render(0.0, 0.016).unwrap();
    let frame = sketch.backend().last_frame().unwrap();
    assert_eq!(frame.items.len(), 1 + 1 + 7);
}

#[test]
fn should_build_satellites_as_small_cubes() {
    let mut sketch = sketch("twin-dragons");
    sketch.begin_loading().unwrap();
    sketch.complete(loaded(AssetKey::Mesh(1))).unwrap();

    let backend = sketch.backend();
    let at = backend
        .geometries
        .iter()
        .position(|(_, label)| label == "satellite")
        .unwrap();
    for (size, expected) in backend.extents[at].iter().zip([0.1, 0.1, 0.1]) {
        assert_relative_eq!(*size, expected, epsilon = 1e-6);
    }
}

#[test]
fn should_reset_named_mesh_to_origin_even_if_the_file_moves_it() {
    let mut sketch = sketch("twin-dragons");
    sketch.begin_loading().unwrap();
    sketch.complete(loaded(AssetKey::Mesh(0))).unwrap();

    let node = sketch.mesh_node(AssetKey::Mesh(0)).unwrap();
    let transform = sketch.scene().get(node).unwrap().transform;
    assert_eq!(transform.position, cgmath::Vector3::new(0.0, 0.0, 0.0));
    assert_relative_eq!(transform.scale.x, 0.3);

    sketch.render(0.0, 0.0).unwrap();
    let item = &sketch.backend().last_frame().unwrap().items[0];
    assert_relative_eq!(item.world[3][0], 0.0);
    assert_relative_eq!(item.world[0][0], 0.3);
}

#[test]
fn should_keep_file_transforms_inside_a_whole_scene_container() {
    let mut sketch = sketch("twin-dragons");
    sketch.begin_loading().unwrap();
    sketch.complete(loaded(AssetKey::Mesh(2))).unwrap();

    let container = sketch.mesh_node(AssetKey::Mesh(2)).unwrap();
    // group, dragon and base; only dragon and base carry geometry
    assert_eq!(sketch.scene().descendants(container).len(), 3);
    assert_eq!(sketch.mesh_geometries(AssetKey::Mesh(2)).unwrap().len(), 2);

    sketch.render(0.0, 0.0).unwrap();
    let frame = sketch.backend().last_frame().unwrap();
    let nested = frame
        .items
        .iter()
        .find(|item| item.world[3][0] > 0.0)
        .expect("the nested mesh keeps its offset");
    assert_relative_eq!(nested.world[3][0], 5.0 * 0.305, epsilon = 1e-5);
    assert_relative_eq!(nested.world[3][1], 1.0 * 0.305, epsilon = 1e-5);
}

#[test]
fn should_tolerate_completions_for_keys_that_are_not_pending() {
    let mut sketch = sketch("glass-dragon");
    // before the request is issued
    sketch.complete(loaded(AssetKey::Mesh(0))).unwrap();
    assert!(sketch.backend().geometries.is_empty());

    sketch.begin_loading().unwrap();
    sketch.complete(loaded(AssetKey::Mesh(0))).unwrap();
    sketch.complete(loaded(AssetKey::Mesh(0))).unwrap();
    assert_eq!(sketch.backend().geometries.len(), 1);
    assert_eq!(sketch.scene().child_count(sketch.scene().root()), 1);
}

#[test]
fn should_report_not_ready_for_meshes_that_have_not_attached() {
    let mut sketch = sketch("twin-dragons");
    sketch.begin_loading().unwrap();
    assert!(matches!(
        sketch.mesh_node(AssetKey::Mesh(0)),
        Err(SketchError::NotReady(AssetKey::Mesh(0)))
    ));
    sketch.complete(failed(AssetKey::Mesh(0))).unwrap_err();
    assert!(sketch.mesh_node(AssetKey::Mesh(0)).is_err());
}

#[test]
fn should_fail_a_named_pick_that_the_file_lacks_without_touching_the_scene() {
    let mut sketch = sketch("glass-dragon");
    sketch.begin_loading().unwrap();
    let mut data = common::test_utils::mesh("model1.glb");
    data.nodes.retain(|n| n.name != "dragon");
    let result = sketch.complete(prism_ngin::assets::Completion {
        key: AssetKey::Mesh(0),
        result: Ok(prism_ngin::assets::LoadedAsset::Mesh(data)),
    });

    assert!(matches!(result, Err(SketchError::AssetLoad { .. })));
    assert!(sketch.backend().geometries.is_empty());
    assert_eq!(sketch.scene().child_count(sketch.scene().root()), 0);
}

#[test]
fn should_release_everything_that_loaded_on_unload() {
    let mut sketch = sketch("twin-dragons");
    load_everything(&mut sketch);
    sketch.render(1.0, 0.016).unwrap();
    assert_eq!(sketch.backend().live_geometries(), 5);
    assert_eq!(sketch.backend().live_textures(), 4);

    sketch.unload().unwrap();

    let backend = sketch.backend();
    assert_eq!(backend.live_geometries(), 0);
    assert_eq!(backend.live_textures(), 0);
    assert_eq!(backend.disposals, 1);
    assert!(sketch.materials().is_empty());
    assert_eq!(sketch.scene().len(), 1);
    assert!(sketch.controls().is_disposed());
    assert!(sketch.composer().is_disposed());
    assert_eq!(sketch.phase(), Phase::Disposed);
}

#[test]
fn should_unload_while_loading_without_touching_absent_handles() {
    let mut sketch = sketch("twin-dragons");
    sketch.begin_loading().unwrap();
    sketch.complete(loaded(AssetKey::LightingEnv)).unwrap();
    sketch.complete(failed(AssetKey::Mesh(1))).unwrap_err();
    sketch.complete(loaded(AssetKey::Mesh(2))).unwrap();
    assert_eq!(sketch.phase(), Phase::Loading);

    sketch.unload().unwrap();

    let backend = sketch.backend();
    assert_eq!(backend.released_textures.len(), 1);
    assert_eq!(backend.released_geometries.len(), 2);
    assert_eq!(backend.disposals, 1);
}

#[test]
fn should_reject_every_call_after_unload() {
    let mut sketch = sketch("glass-dragon");
    sketch.unload().unwrap();

    assert!(matches!(sketch.unload(), Err(SketchError::Disposed)));
    assert!(matches!(sketch.render(0.0, 0.0), Err(SketchError::Disposed)));
    assert!(matches!(sketch.resize(1.0, 10, 10), Err(SketchError::Disposed)));
    assert!(matches!(sketch.complete(loaded(AssetKey::Mesh(0))), Err(SketchError::Disposed)));
    assert_eq!(sketch.backend().disposals, 1);
}

#[test]
fn should_propagate_draw_failures() {
    let mut sketch = sketch("glass-dragon");
    sketch.backend_mut().fail_next_draw = Some("device lost".into());

    let err = sketch.render(0.0, 0.0).unwrap_err();
    assert!(matches!(err, SketchError::Render(_)));
    assert!(!err.is_fatal());
    assert_eq!(sketch.frames(), 0);

    sketch.render(0.1, 0.1).unwrap();
    assert_eq!(sketch.frames(), 1);
}

#[test]
fn should_draw_opaque_items_before_transparent_ones() {
    let mut sketch = sketch("twin-dragons");
    load_everything(&mut sketch);
    sketch.render(0.0, 0.0).unwrap();

    let items = &sketch.backend().last_frame().unwrap().items;
    assert_eq!(items.len(), 11);
    let first_transparent = items
        .iter()
        .position(|i| i.state.transparent)
        .expect("the metal dragon is transparent");
    assert!(items[first_transparent..].iter().all(|i| i.state.transparent));
}

#[test]
fn should_bind_textures_once_their_slots_load() {
    let mut sketch = sketch("glass-dragon");
    sketch.begin_loading().unwrap();
    sketch.complete(loaded(AssetKey::Mesh(0))).unwrap();
    sketch.render(0.0, 0.0).unwrap();
    let before = sketch.backend().last_frame().unwrap().items[0].clone();
    assert_eq!(before.textures.env, None);
    assert_eq!(before.material.maps[0], 0);

    sketch.complete(loaded(AssetKey::BackgroundEnv)).unwrap();
    assert!(sketch.glass_material().unwrap().needs_update);
    sketch.render(0.1, 0.1).unwrap();
    let after = &sketch.backend().last_frame().unwrap().items[0];
    assert!(after.textures.env.is_some());
    assert_eq!(after.material.maps[0], 1);
    assert!(after.material_dirty);
    assert!(!sketch.glass_material().unwrap().needs_update);
}
