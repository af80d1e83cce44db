//! The render-loop driver.
//!
//! A [`Sketch`] owns everything one running scene needs: camera, orbit controller, scene
//! graph, materials, post-processing parameters and the asset slot table. The host drives it
//! through four hooks:
//!
//! 1. [`Sketch::configure`] builds the fixed parts against an injected [`Backend`]
//! 2. [`Sketch::resize`] follows the viewport
//! 3. [`Sketch::render`] applies arrived asset completions, advances the controller, runs
//!    the per-frame update and draws
//! 4. [`Sketch::unload`] releases whatever actually loaded and ends in [`Phase::Disposed`]
//!
//! Assets arrive out of band through [`Completions`] and may land before, between or after
//! any frame. Nothing reads a slot's handle unless the slot is `Loaded`.

use cgmath::{EuclideanSpace, InnerSpace, Point3, Quaternion, Rad, Rotation3, Vector3};

use crate::{
    assets::{
        AssetKey, AssetLoader, AssetRequest, AssetSlots, Completion, Completions, LoadedAsset,
        LoadedHandle, MeshData, Slot,
    },
    backend::{Backend, DrawItem, DrawTextures, Frame, GeometryId, SurfaceSize},
    camera::{self, Camera, CameraUniform},
    config::SceneConfig,
    control::{Control, Target},
    controls::OrbitControls,
    error::{Result, SketchError},
    geometry::Geometry,
    material::{BoundMaps, MaterialId, Materials, PhysicalMaterial},
    post::{BloomPass, Composer},
    scene::{MeshBinding, Node, NodeId, Scene, Transform},
    variant::{MeshPick, MeshSpec, PresetKind, Variant},
};

/// Device pixel ratios above this are clamped.
pub const MAX_PIXEL_RATIO: f32 = 2.0;
/// Angular speed of the scene root in rotation mode, radians per second.
pub const ROTATION_SPEED: f32 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// At least one asset has not settled yet.
    Loading,
    /// Every requested asset has loaded or failed.
    Ready,
    /// Torn down; every further call fails with [`SketchError::Disposed`].
    Disposed,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Viewport {
    pixel_ratio: f32,
    width: u32,
    height: u32,
}

pub struct Sketch<B: Backend> {
    variant: Variant,
    options: SceneConfig,
    backend: B,
    camera: Camera,
    controls: OrbitControls,
    scene: Scene,
    composer: Composer,
    materials: Materials,
    glass: Option<MaterialId>,
    slots: AssetSlots,
    completions: Vec<Completions>,
    failures: Vec<SketchError>,
    viewport: Option<Viewport>,
    frames: u64,
    disposed: bool,
}

impl<B: Backend> Sketch<B> {
    /// Builds camera, controller, scene root, post chain and the glass material. Fails only
    /// if the variant's options are outside their documented ranges.
    pub fn configure(variant: Variant, mut backend: B, width: u32, height: u32) -> Result<Self> {
        variant.options.validate()?;
        let options = variant.options.clone();

        let camera = Camera::new(&variant.camera, width, height);
        let mut controls = OrbitControls::new(variant.controls.clone(), &camera);
        controls.enabled = !options.enable_swooping_camera;

        let bloom = BloomPass::new(
            [width, height],
            options.bloom_strength,
            options.bloom_radius,
            options.bloom_threshold,
        );
        let composer = Composer::new(bloom, width, height);

        let mut materials = Materials::default();
        let glass = materials.insert(PhysicalMaterial::glass(&options, variant.glass_tint));

        backend.resize(SurfaceSize {
            width: width.max(1),
            height: height.max(1),
        });
        log::info!("configured sketch {:?} at {width}x{height}", variant.name);

        Ok(Self {
            variant,
            options,
            backend,
            camera,
            controls,
            scene: Scene::new(),
            composer,
            materials,
            glass: Some(glass),
            slots: AssetSlots::new(),
            completions: Vec::new(),
            failures: Vec::new(),
            viewport: None,
            frames: 0,
            disposed: false,
        })
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            Err(SketchError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Marks every asset of the variant pending and returns the requests to issue.
    pub fn begin_loading(&mut self) -> Result<Vec<AssetRequest>> {
        self.ensure_live()?;
        Ok(self
            .variant
            .requests()
            .into_iter()
            .filter(|(key, _)| self.slots.request(*key))
            .map(|(key, path)| AssetRequest::new(key, path))
            .collect())
    }

    /// Issues the variant's asset requests on `loader`. Completions are applied by later
    /// [`Sketch::render`] calls.
    pub fn load_assets(&mut self, loader: &AssetLoader) -> Result<()> {
        let requests = self.begin_loading()?;
        log::info!("loading {} assets from {}", requests.len(), loader.root().display());
        self.completions.push(loader.spawn(requests));
        Ok(())
    }

    /// Applies one load result. A failed load settles the slot as failed and the error is
    /// returned; the scene simply lacks that asset. Results for keys that are not pending are
    /// dropped.
    pub fn complete(&mut self, completion: Completion) -> Result<()> {
        self.ensure_live()?;
        let Completion { key, result } = completion;
        if !self.slots.is_pending(key) {
            log::warn!("ignoring completion for {key}, it is not pending");
            return Ok(());
        }
        let outcome = result.and_then(|asset| self.attach(key, asset));
        match outcome {
            Ok(handle) => {
                log::debug!("{key} loaded");
                self.slots.settle(key, Slot::Loaded(handle));
                self.materials
                    .iter_mut()
                    .filter(|m| m.texture_keys().contains(&key))
                    .for_each(|m| m.needs_update = true);
                Ok(())
            }
            Err(e) => {
                log::warn!("{e}");
                self.slots.settle(key, Slot::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    fn attach(&mut self, key: AssetKey, asset: LoadedAsset) -> Result<LoadedHandle> {
        let mismatch = |what: &str| SketchError::AssetLoad {
            key,
            path: Default::default(),
            reason: format!("decoded a {what} for a slot that expects something else"),
        };
        match asset {
            LoadedAsset::Texture(data) if key.is_texture() => {
                Ok(LoadedHandle::Texture(self.backend.upload_texture(&data)))
            }
            LoadedAsset::Mesh(data) if !key.is_texture() => {
                let spec = self
                    .variant
                    .mesh_spec(key)
                    .cloned()
                    .ok_or_else(|| mismatch("mesh"))?;
                self.attach_mesh(&spec, &data)
            }
            LoadedAsset::Texture(_) => Err(mismatch("texture")),
            LoadedAsset::Mesh(_) => Err(mismatch("mesh")),
        }
    }

    fn preset_material(&mut self, preset: PresetKind) -> (MaterialId, bool) {
        match (preset, self.glass) {
            (PresetKind::Glass, Some(glass)) => (glass, false),
            (PresetKind::Glass, None) => {
                let id = self
                    .materials
                    .insert(PhysicalMaterial::glass(&self.options, self.variant.glass_tint));
                self.glass = Some(id);
                (id, false)
            }
            (PresetKind::Metal, _) => (
                self.materials
                    .insert(PhysicalMaterial::metal(&self.variant.metal)),
                true,
            ),
            (PresetKind::Diffuse, _) => (
                self.materials
                    .insert(PhysicalMaterial::diffuse(&self.variant.diffuse)),
                true,
            ),
        }
    }

    /// Attaches a decoded file as exactly one new child of the scene root.
    fn attach_mesh(&mut self, spec: &MeshSpec, data: &MeshData) -> Result<LoadedHandle> {
        let root = self.scene.root();
        let mut geometries = Vec::new();
        let mut owned_materials = Vec::new();

        // Validate before touching the backend or the scene.
        let named = match &spec.pick {
            MeshPick::Named(name) => Some(data.find(name).ok_or_else(|| SketchError::AssetLoad {
                key: spec.key,
                path: spec.path.clone(),
                reason: format!("no mesh node named {name:?}"),
            })?),
            MeshPick::Scene => None,
        };

        let (material, owned) = self.preset_material(spec.preset);
        if owned {
            owned_materials.push(material);
        }

        let node = match named {
            Some(source) => {
                let mut transform = match spec.position {
                    Some(p) => Transform::new().with_position(p),
                    None => source.transform,
                };
                transform.scale = Vector3::new(spec.scale, spec.scale, spec.scale);
                let geometry = self.backend.upload_geometry(&source.merged_geometry());
                geometries.push(geometry);
                let node = Node::new(source.name.clone())
                    .with_transform(transform)
                    .with_mesh(MeshBinding { geometry, material });
                self.add_node(root, node)?
            }
            None => {
                let transform = Transform::new()
                    .with_position(spec.position.unwrap_or([0.0; 3]))
                    .with_uniform_scale(spec.scale);
                let container =
                    self.add_node(root, Node::new(data.label.clone()).with_transform(transform))?;
                let mut ids: Vec<NodeId> = Vec::with_capacity(data.nodes.len());
                for source in &data.nodes {
                    let parent = source.parent.and_then(|p| ids.get(p).copied()).unwrap_or(container);
                    let mut node = Node::new(source.name.clone()).with_transform(source.transform);
                    if !source.primitives.is_empty() {
                        let geometry = self.backend.upload_geometry(&source.merged_geometry());
                        geometries.push(geometry);
                        node = node.with_mesh(MeshBinding { geometry, material });
                    }
                    ids.push(self.add_node(parent, node)?);
                }
                container
            }
        };

        if let Some(satellites) = &spec.satellites {
            let [w, h, d] = satellites.size;
            let cube = self
                .backend
                .upload_geometry(&Geometry::cuboid("satellite", w, h, d));
            geometries.push(cube);
            for (i, ratio) in satellites.refraction_ratios.iter().enumerate() {
                let material = self
                    .materials
                    .insert(PhysicalMaterial::satellite(satellites, *ratio));
                owned_materials.push(material);
                let offset = satellites.spacing * i as f32;
                let child = Node::new(format!("satellite{i}"))
                    .with_transform(Transform::new().with_position([offset, offset, 0.0]))
                    .with_mesh(MeshBinding {
                        geometry: cube,
                        material,
                    });
                self.add_node(node, child)?;
            }
        }

        log::info!(
            "attached {} ({} geometries) under the scene root",
            spec.path.display(),
            geometries.len()
        );
        Ok(LoadedHandle::Mesh {
            node,
            geometries,
            materials: owned_materials,
        })
    }

    fn add_node(&mut self, parent: NodeId, node: Node) -> Result<NodeId> {
        self.scene
            .add(parent, node)
            .ok_or_else(|| SketchError::Render(format!("parent node {parent:?} vanished")))
    }

    /// Applies every completion that has arrived, collecting failures for
    /// [`Sketch::take_failures`].
    pub fn poll_completions(&mut self) -> usize {
        let arrived: Vec<Completion> = self
            .completions
            .iter_mut()
            .flat_map(Completions::drain_ready)
            .collect();
        let count = arrived.len();
        for completion in arrived {
            if let Err(e) = self.complete(completion) {
                self.failures.push(e);
            }
        }
        if count > 0 && self.slots.pending() == 0 {
            log::info!("all assets settled");
        }
        count
    }

    /// Load failures seen by [`Sketch::render`] since the last call.
    pub fn take_failures(&mut self) -> Vec<SketchError> {
        std::mem::take(&mut self.failures)
    }

    /// Per-frame camera update. The swooping camera overrides the orbit controller. Touches
    /// nothing but the camera.
    pub fn update(&mut self, time: f32, _dt: f32) {
        if self.options.enable_swooping_camera {
            self.camera.position = camera::swoop_position(time);
            self.camera.look_at(Point3::origin());
        }
    }

    /// Scene motion: in rotation mode the root spins about +Y at [`ROTATION_SPEED`].
    pub fn animate(&mut self, time: f32) {
        if self.options.enable_rotation {
            let root = self.scene.root();
            if let Some(node) = self.scene.get_mut(root) {
                node.transform.rotation = Quaternion::from_angle_y(Rad(time * ROTATION_SPEED));
            }
        }
    }

    /// Follows a viewport change. The pixel ratio is capped at [`MAX_PIXEL_RATIO`]; repeated
    /// calls with the same arguments change nothing, and zero-sized viewports are ignored.
    pub fn resize(&mut self, pixel_ratio: f32, width: u32, height: u32) -> Result<()> {
        self.ensure_live()?;
        if width == 0 || height == 0 {
            log::debug!("ignoring resize to {width}x{height}");
            return Ok(());
        }
        let pixel_ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            pixel_ratio.min(MAX_PIXEL_RATIO)
        } else {
            1.0
        };
        let viewport = Viewport {
            pixel_ratio,
            width,
            height,
        };
        if self.viewport == Some(viewport) {
            return Ok(());
        }
        self.viewport = Some(viewport);

        self.composer.set_pixel_ratio(pixel_ratio);
        self.composer.set_size(width, height);
        self.composer.bloom.set_resolution(width, height);
        self.camera.aspect = camera::aspect_ratio(width, height);
        self.camera.update_projection_matrix();

        let (w, h) = self.composer.drawing_buffer_size();
        self.backend.resize(SurfaceSize { width: w, height: h });
        log::debug!("resized to {width}x{height} @ {pixel_ratio}");
        Ok(())
    }

    /// Draws one frame. Draw errors propagate; the frame is not skipped silently.
    pub fn render(&mut self, time: f32, dt: f32) -> Result<()> {
        self.ensure_live()?;
        self.poll_completions();
        self.controls.update(&mut self.camera, dt);
        self.update(time, dt);
        self.animate(time);

        let frame = self.frame();
        self.backend.draw(&frame)?;
        self.materials
            .iter_mut()
            .for_each(|m| m.needs_update = false);
        self.frames += 1;
        Ok(())
    }

    /// Describes the current state as a backend frame.
    pub fn frame(&self) -> Frame {
        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update_view_proj(&self.camera);

        let eye = self.camera.position.to_vec();
        let mut opaque = Vec::new();
        let mut transparent = Vec::new();
        for item in self.scene.world_items() {
            let Some(material) = self.materials.get(item.mesh.material) else {
                continue;
            };
            let resolve = |key: Option<AssetKey>| key.and_then(|k| self.slots.texture(k));
            let textures = DrawTextures {
                env: resolve(material.env_map),
                normal: resolve(material.normal_map),
                clearcoat_normal: resolve(material.clearcoat_normal_map),
            };
            let bound = BoundMaps {
                env: textures.env.is_some(),
                normal: textures.normal.is_some(),
                clearcoat_normal: textures.clearcoat_normal.is_some(),
            };
            let draw = DrawItem {
                geometry: item.mesh.geometry,
                world: item.world.into(),
                normal: item.normal.into(),
                material: material.uniform(bound),
                textures,
                state: material.render_state(),
                material_dirty: material.needs_update,
            };
            if material.transparent {
                let distance = (item.world.w.truncate() - eye).magnitude2();
                transparent.push((distance, draw));
            } else {
                opaque.push(draw);
            }
        }
        transparent.sort_by(|a, b| b.0.total_cmp(&a.0));
        opaque.extend(transparent.into_iter().map(|(_, d)| d));

        let [r, g, b] = self.variant.camera.clear_color.to_linear();
        Frame {
            camera: camera_uniform,
            clear_color: [r as f64, g as f64, b as f64, 1.0],
            bloom: self.composer.bloom.settings(),
            items: opaque,
        }
    }

    /// Tears everything down: attached meshes with their geometries and materials first,
    /// then the remaining materials, then textures, then controller, post chain and backend.
    /// Slots that never loaded are skipped. Pending loads keep running but their results are
    /// discarded.
    pub fn unload(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.completions.clear();

        let loaded = self.slots.drain_loaded();
        let (meshes, textures): (Vec<_>, Vec<_>) =
            loaded.into_iter().partition(|(key, _)| !key.is_texture());

        for (key, handle) in meshes {
            if let LoadedHandle::Mesh {
                node,
                geometries,
                materials,
            } = handle
            {
                self.scene.remove_subtree(node);
                geometries
                    .into_iter()
                    .for_each(|g| self.backend.release_geometry(g));
                for m in materials {
                    self.materials.remove(m);
                }
                log::debug!("released {key}");
            }
        }

        self.materials.clear();
        self.glass = None;

        for (key, handle) in textures {
            if let LoadedHandle::Texture(id) = handle {
                self.backend.release_texture(id);
                log::debug!("released {key}");
            }
        }

        self.controls.dispose();
        self.composer.dispose();
        self.backend.dispose();
        self.disposed = true;
        log::info!("sketch {:?} unloaded after {} frames", self.variant.name, self.frames);
        Ok(())
    }

    /// Applies a live edit: stores the value and performs the one engine update it needs.
    pub fn apply(&mut self, control: Control) -> Result<()> {
        self.ensure_live()?;
        control.validate()?;
        control.write(&mut self.options);
        match control.target() {
            Target::GlassMaterial => {
                if let Some(material) = self.glass.and_then(|id| self.materials.get_mut(id)) {
                    write_glass(material, control);
                    material.needs_update = true;
                }
            }
            Target::Bloom => {
                let bloom = &mut self.composer.bloom;
                match control {
                    Control::BloomThreshold(v) => bloom.threshold = v,
                    Control::BloomStrength(v) => bloom.strength = v,
                    Control::BloomRadius(v) => bloom.radius = v,
                    _ => {}
                }
            }
            Target::CameraMode => {
                if let Control::EnableSwoopingCamera(swoop) = control {
                    self.controls.enabled = !swoop;
                    self.controls.reset(&mut self.camera);
                }
            }
            Target::SceneMotion => {
                if !self.options.enable_rotation {
                    let root = self.scene.root();
                    if let Some(node) = self.scene.get_mut(root) {
                        node.transform.rotation = Transform::new().rotation;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn phase(&self) -> Phase {
        if self.disposed {
            Phase::Disposed
        } else if self.slots.pending() > 0 {
            Phase::Loading
        } else {
            Phase::Ready
        }
    }

    /// Scene node an attached mesh asset lives under.
    pub fn mesh_node(&self, key: AssetKey) -> Result<NodeId> {
        self.ensure_live()?;
        match self.slots.handle(key) {
            Some(LoadedHandle::Mesh { node, .. }) => Ok(*node),
            _ => Err(SketchError::NotReady(key)),
        }
    }

    /// Geometries uploaded for an attached mesh asset.
    pub fn mesh_geometries(&self, key: AssetKey) -> Result<&[GeometryId]> {
        self.ensure_live()?;
        match self.slots.handle(key) {
            Some(LoadedHandle::Mesh { geometries, .. }) => Ok(geometries),
            _ => Err(SketchError::NotReady(key)),
        }
    }

    pub fn options(&self) -> &SceneConfig {
        &self.options
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut OrbitControls {
        &mut self.controls
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn slots(&self) -> &AssetSlots {
        &self.slots
    }

    pub fn materials(&self) -> &Materials {
        &self.materials
    }

    pub fn glass_material(&self) -> Option<&PhysicalMaterial> {
        self.glass.and_then(|id| self.materials.get(id))
    }

    pub fn material(&self, id: MaterialId) -> Option<&PhysicalMaterial> {
        self.materials.get(id)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

fn write_glass(material: &mut PhysicalMaterial, control: Control) {
    match control {
        Control::Color(c) => material.color = c,
        Control::Roughness(v) => material.roughness = v,
        Control::Metalness(v) => material.metalness = v,
        Control::Transmission(v) => material.transmission = v,
        Control::Ior(v) => material.ior = v,
        Control::Reflectivity(v) => material.reflectivity = v,
        Control::Thickness(v) => material.thickness = v,
        Control::EnvMapIntensity(v) => material.env_map_intensity = v,
        Control::Clearcoat(v) => material.clearcoat = v,
        Control::ClearcoatRoughness(v) => material.clearcoat_roughness = v,
        Control::NormalScale(v) => material.normal_scale = v,
        Control::ClearcoatNormalScale(v) => material.clearcoat_normal_scale = v,
        Control::NormalRepeat(n) => material.normal_repeat = n,
        Control::Transparent(v) => material.transparent = v,
        Control::Opacity(v) => material.opacity = v,
        Control::EmissiveColor(c) => material.emissive = c,
        Control::DepthTest(v) => material.depth_test = v,
        Control::DepthWrite(v) => material.depth_write = v,
        Control::Wireframe(v) => material.wireframe = v,
        Control::EnableSwoopingCamera(_)
        | Control::EnableRotation(_)
        | Control::BloomThreshold(_)
        | Control::BloomStrength(_)
        | Control::BloomRadius(_) => {}
    }
}
