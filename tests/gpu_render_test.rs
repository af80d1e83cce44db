#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
mod gpu {
    use prism_ngin::{
        Sketch, Variant,
        assets::AssetKey,
        config::Rgb,
        gpu::{WgpuBackend, context::Context},
    };

    use crate::common::test_utils::{load_everything, loaded};

    const SIZE: u32 = 64;

    fn headless_sketch(name: &str, clear: Rgb) -> Sketch<WgpuBackend> {
        let _ = env_logger::builder().is_test(true).try_init();
        let context = futures::executor::block_on(Context::headless(SIZE, SIZE))
            .expect("a GPU adapter is required for integration tests");
        let mut variant = Variant::builtin(name).unwrap();
        variant.camera.clear_color = clear;
        Sketch::configure(variant, WgpuBackend::new(context), SIZE, SIZE).unwrap()
    }

    #[test]
    fn should_render_clear_colour() {
        let mut sketch = headless_sketch("twin-dragons", Rgb::WHITE);
        sketch.render(0.0, 0.0).unwrap();

        let image = futures::executor::block_on(sketch.backend().capture()).unwrap();
        assert_eq!(image.dimensions(), (SIZE, SIZE));
        for pixel in image.pixels() {
            assert_eq!(*pixel, image::Rgba([255, 255, 255, 255]));
        }
    }

    #[test]
    fn should_render_a_black_background_without_bloom_bleed() {
        let mut sketch = headless_sketch("glass-dragon", Rgb::BLACK);
        sketch.render(0.0, 0.0).unwrap();
        sketch.render(0.1, 0.1).unwrap();

        let image = futures::executor::block_on(sketch.backend().capture()).unwrap();
        for pixel in image.pixels() {
            assert_eq!(&pixel.0[..3], &[0, 0, 0]);
        }
    }

    #[test]
    fn should_draw_meshes_and_release_them_on_unload() {
        let mut sketch = headless_sketch("twin-dragons", Rgb::BLACK);
        load_everything(&mut sketch);
        sketch.render(0.0, 0.016).unwrap();

        assert_eq!(sketch.backend().geometry_count(), 5);
        assert_eq!(sketch.backend().texture_count(), 4);
        // opaque and transparent materials need distinct pipelines
        assert!(sketch.backend().pipeline_count() >= 2);

        sketch.unload().unwrap();
        assert_eq!(sketch.backend().geometry_count(), 0);
        assert_eq!(sketch.backend().texture_count(), 0);
    }

    #[test]
    fn should_follow_resizes_in_the_readback() {
        let mut sketch = headless_sketch("glass-dragon", Rgb::WHITE);
        sketch.begin_loading().unwrap();
        sketch.complete(loaded(AssetKey::Mesh(0))).unwrap();
        sketch.resize(1.0, 48, 32).unwrap();
        sketch.render(0.0, 0.0).unwrap();

        let image = futures::executor::block_on(sketch.backend().capture()).unwrap();
        assert_eq!(image.dimensions(), (48, 32));
    }
}
