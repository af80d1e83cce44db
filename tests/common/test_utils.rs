#![allow(dead_code)]

use std::io::Cursor;

use prism_ngin::{
    Backend, Sketch, SketchError, Variant,
    assets::{
        AssetKey, Completion, LoadedAsset, MeshData, MeshNode, MipLevel, PixelFormat, TextureData,
    },
    backend::{Frame, GeometryId, SurfaceSize, TextureId},
    geometry::Geometry,
    scene::Transform,
};

pub(crate) const WIDTH: u32 = 800;
pub(crate) const HEIGHT: u32 = 600;

/// Backend that records every call instead of talking to a GPU.
#[derive(Debug, Default)]
pub(crate) struct RecordingBackend {
    pub geometries: Vec<(GeometryId, String)>,
    /// Bounding-box size of each uploaded geometry, in upload order.
    pub extents: Vec<[f32; 3]>,
    pub textures: Vec<(TextureId, String)>,
    pub released_geometries: Vec<GeometryId>,
    pub released_textures: Vec<TextureId>,
    pub resizes: Vec<SurfaceSize>,
    pub frames: Vec<Frame>,
    pub disposals: u32,
    /// Makes the next `draw` fail with this message.
    pub fail_next_draw: Option<String>,
    next_id: u32,
}

impl RecordingBackend {
    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn live_geometries(&self) -> usize {
        self.geometries.len() - self.released_geometries.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len() - self.released_textures.len()
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }
}

fn extents(geometry: &Geometry) -> [f32; 3] {
    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];
    for vertex in &geometry.vertices {
        for axis in 0..3 {
            min[axis] = min[axis].min(vertex.position[axis]);
            max[axis] = max[axis].max(vertex.position[axis]);
        }
    }
    [max[0] - min[0], max[1] - min[1], max[2] - min[2]]
}

impl Backend for RecordingBackend {
    fn upload_geometry(&mut self, geometry: &Geometry) -> GeometryId {
        let id = GeometryId(self.next());
        self.geometries.push((id, geometry.label.clone()));
        self.extents.push(extents(geometry));
        id
    }

    fn upload_texture(&mut self, texture: &TextureData) -> TextureId {
        let id = TextureId(self.next());
        self.textures.push((id, texture.label.clone()));
        id
    }

    fn release_geometry(&mut self, id: GeometryId) {
        self.released_geometries.push(id);
    }

    fn release_texture(&mut self, id: TextureId) {
        self.released_textures.push(id);
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.resizes.push(size);
    }

    fn draw(&mut self, frame: &Frame) -> prism_ngin::Result<()> {
        if let Some(reason) = self.fail_next_draw.take() {
            return Err(SketchError::Render(reason));
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn dispose(&mut self) {
        self.disposals += 1;
    }
}

pub(crate) fn sketch(name: &str) -> Sketch<RecordingBackend> {
    let variant = Variant::builtin(name).expect("built-in variant");
    Sketch::configure(variant, RecordingBackend::default(), WIDTH, HEIGHT).expect("configure")
}

pub(crate) fn texture(label: &str) -> TextureData {
    TextureData {
        label: label.to_string(),
        format: PixelFormat::Rgba8Linear,
        levels: vec![MipLevel {
            width: 1,
            height: 1,
            bytes: vec![127, 127, 255, 255],
        }],
    }
}

/// A file shaped like the dragon models: a group holding the named mesh, which sits away from
/// the origin, plus a second top-level mesh.
pub(crate) fn mesh(label: &str) -> MeshData {
    MeshData {
        label: label.to_string(),
        nodes: vec![
            MeshNode {
                name: "group".into(),
                transform: Transform::new().with_position([0.0, 1.0, 0.0]),
                parent: None,
                primitives: vec![],
            },
            MeshNode {
                name: "dragon".into(),
                transform: Transform::new().with_position([5.0, 0.0, 0.0]),
                parent: Some(0),
                primitives: vec![Geometry::cuboid("dragon body", 1.0, 1.0, 1.0)],
            },
            MeshNode {
                name: "base".into(),
                transform: Transform::new(),
                parent: None,
                primitives: vec![
                    Geometry::cuboid("base top", 2.0, 0.1, 2.0),
                    Geometry::cuboid("base foot", 1.0, 1.0, 1.0),
                ],
            },
        ],
    }
}

/// A successful completion with fixture data of the right kind for `key`.
pub(crate) fn loaded(key: AssetKey) -> Completion {
    let asset = if key.is_texture() {
        LoadedAsset::Texture(texture(&key.to_string()))
    } else {
        LoadedAsset::Mesh(mesh(&key.to_string()))
    };
    Completion {
        key,
        result: Ok(asset),
    }
}

pub(crate) fn failed(key: AssetKey) -> Completion {
    Completion {
        key,
        result: Err(SketchError::AssetLoad {
            key,
            path: "missing.bin".into(),
            reason: "not found".into(),
        }),
    }
}

/// Requests every asset of the sketch and completes all of them successfully.
pub(crate) fn load_everything<B: Backend>(sketch: &mut Sketch<B>) -> Vec<AssetKey> {
    let keys: Vec<AssetKey> = sketch
        .begin_loading()
        .expect("begin loading")
        .into_iter()
        .map(|r| r.key)
        .collect();
    for key in &keys {
        sketch.complete(loaded(*key)).expect("completion applies");
    }
    keys
}

pub(crate) fn hdr_bytes(width: u32, height: u32, value: f32) -> Vec<u8> {
    let pixels = vec![image::Rgb([value, value * 0.5, value * 0.25]); (width * height) as usize];
    let mut out = Vec::new();
    image::codecs::hdr::HdrEncoder::new(&mut out)
        .encode(&pixels, width as usize, height as usize)
        .expect("encode hdr");
    out
}

pub(crate) fn png_bytes(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(pixel));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

fn pad(mut bytes: Vec<u8>, fill: u8) -> Vec<u8> {
    while bytes.len() % 4 != 0 {
        bytes.push(fill);
    }
    bytes
}

/// A binary glTF with one triangle, used by a `dragon` node nested under `group` and by a
/// top-level `base` node.
pub(crate) fn glb_bytes() -> Vec<u8> {
    let positions: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
    let indices: [u32; 3] = [0, 1, 2];
    let mut bin = Vec::new();
    bin.extend_from_slice(bytemuck::cast_slice(&positions));
    bin.extend_from_slice(bytemuck::cast_slice(&indices));
    let bin = pad(bin, 0);

    let json = format!(
        r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "nodes": [0, 2] }}],
  "nodes": [
    {{ "name": "group", "translation": [0.0, 1.0, 0.0], "children": [1] }},
    {{ "name": "dragon", "mesh": 0, "translation": [5.0, 0.0, 0.0] }},
    {{ "name": "base", "mesh": 0 }}
  ],
  "meshes": [{{ "primitives": [{{ "attributes": {{ "POSITION": 0 }}, "indices": 1 }}] }}],
  "buffers": [{{ "byteLength": {len} }}],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 12 }}
  ],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
       "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }},
    {{ "bufferView": 1, "componentType": 5125, "count": 3, "type": "SCALAR" }}
  ]
}}"#,
        len = bin.len()
    );
    let json = pad(json.into_bytes(), b' ');

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(b"JSON");
    out.extend_from_slice(&json);
    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(b"BIN\0");
    out.extend_from_slice(&bin);
    out
}

/// Fresh empty directory under the system temp dir.
pub(crate) fn temp_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("prism-ngin-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}
