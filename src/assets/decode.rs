//! Decoders turning file bytes into [`LoadedAsset`]s. All of them are synchronous and run on
//! the loader's blocking pool.

use std::path::Path;

use cgmath::Vector3;
use half::f16;
use image::ImageFormat;

use super::{LoadedAsset, MeshData, MeshNode, MipLevel, PixelFormat, TextureData};
use crate::{
    geometry::{Geometry, ModelVertex},
    scene::Transform,
};

/// Largest finite half float.
const F16_MAX: f32 = 65504.0;

/// Decodes a Radiance HDR panorama into half floats with a full box-filtered mip chain.
/// Rougher surfaces sample the smaller levels.
pub fn decode_hdr(bytes: &[u8], label: &str) -> Result<LoadedAsset, String> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Hdr)
        .map_err(|e| e.to_string())?
        .to_rgba32f();
    let (width, height) = img.dimensions();
    let mut levels = Vec::new();
    let mut texels = img.into_raw();
    let (mut w, mut h) = (width, height);
    loop {
        levels.push(MipLevel {
            width: w,
            height: h,
            bytes: to_f16_bytes(&texels),
        });
        if w == 1 && h == 1 {
            break;
        }
        let (next, nw, nh) = downsample(&texels, w, h);
        texels = next;
        w = nw;
        h = nh;
    }
    Ok(LoadedAsset::Texture(TextureData {
        label: label.to_string(),
        format: PixelFormat::HdrF16,
        levels,
    }))
}

fn to_f16_bytes(texels: &[f32]) -> Vec<u8> {
    let halfs: Vec<f16> = texels
        .iter()
        .map(|v| f16::from_f32(v.clamp(-F16_MAX, F16_MAX)))
        .collect();
    bytemuck::cast_slice(&halfs).to_vec()
}

/// 2x2 box filter over RGBA texels. Odd edges clamp.
fn downsample(texels: &[f32], w: u32, h: u32) -> (Vec<f32>, u32, u32) {
    let (nw, nh) = ((w / 2).max(1), (h / 2).max(1));
    let mut out = Vec::with_capacity((nw * nh * 4) as usize);
    let at = |x: u32, y: u32, c: u32| texels[((y.min(h - 1) * w + x.min(w - 1)) * 4 + c) as usize];
    for y in 0..nh {
        for x in 0..nw {
            for c in 0..4 {
                let (sx, sy) = (x * 2, y * 2);
                let sum = at(sx, sy, c) + at(sx + 1, sy, c) + at(sx, sy + 1, c) + at(sx + 1, sy + 1, c);
                out.push(sum / 4.0);
            }
        }
    }
    (out, nw, nh)
}

/// Decodes any supported raster image into RGBA8. Normal maps pass `srgb = false`.
pub fn decode_raster(bytes: &[u8], label: &str, srgb: bool) -> Result<LoadedAsset, String> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| e.to_string())?
        .to_rgba8();
    let (width, height) = img.dimensions();
    Ok(LoadedAsset::Texture(TextureData {
        label: label.to_string(),
        format: if srgb {
            PixelFormat::Rgba8Srgb
        } else {
            PixelFormat::Rgba8Linear
        },
        levels: vec![MipLevel {
            width,
            height,
            bytes: img.into_raw(),
        }],
    }))
}

/// Decodes a glTF/GLB file. External buffers are resolved against `base_dir`.
pub fn decode_gltf(bytes: &[u8], label: &str, base_dir: Option<&Path>) -> Result<LoadedAsset, String> {
    let gltf = gltf::Gltf::from_slice(bytes).map_err(|e| e.to_string())?;

    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .as_ref()
                    .ok_or_else(|| "binary chunk missing".to_string())?;
                buffer_data.push(blob.clone());
            }
            gltf::buffer::Source::Uri(uri) => {
                if uri.starts_with("data:") {
                    return Err(format!("embedded data uri buffers are not supported ({label})"));
                }
                let path = base_dir.map_or_else(|| Path::new(uri).to_path_buf(), |d| d.join(uri));
                let bin = std::fs::read(&path).map_err(|e| format!("{}: {e}", path.display()))?;
                buffer_data.push(bin);
            }
        }
    }

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .ok_or_else(|| "file contains no scene".to_string())?;

    let mut nodes = Vec::new();
    let mut stack: Vec<(gltf::Node, Option<usize>)> = scene.nodes().map(|n| (n, None)).collect();
    stack.reverse();
    while let Some((node, parent)) = stack.pop() {
        let (translation, rotation, scale) = node.transform().decomposed();
        let name = node
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("node{}", node.index()));
        let primitives = match node.mesh() {
            Some(mesh) => read_mesh(&mesh, &buffer_data, &name),
            None => Vec::new(),
        };
        let index = nodes.len();
        nodes.push(MeshNode {
            name,
            transform: Transform {
                position: translation.into(),
                rotation: rotation.into(),
                scale: scale.into(),
            },
            parent,
            primitives,
        });
        let children: Vec<_> = node.children().collect();
        stack.extend(children.into_iter().rev().map(|c| (c, Some(index))));
    }

    Ok(LoadedAsset::Mesh(MeshData {
        label: label.to_string(),
        nodes,
    }))
}

fn read_mesh(mesh: &gltf::Mesh, buffers: &[Vec<u8>], name: &str) -> Vec<Geometry> {
    let mut out = Vec::new();
    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!(
                "{name}: skipping primitive {} with mode {:?}",
                primitive.index(),
                primitive.mode()
            );
            continue;
        }
        let reader = primitive.reader(|b| buffers.get(b.index()).map(Vec::as_slice));
        let Some(positions) = reader.read_positions() else {
            log::warn!("{name}: primitive {} has no positions", primitive.index());
            continue;
        };
        let mut vertices: Vec<ModelVertex> = positions
            .map(|position| ModelVertex {
                position,
                ..ModelVertex::default()
            })
            .collect();

        let has_normals = match reader.read_normals() {
            Some(normals) => {
                vertices
                    .iter_mut()
                    .zip(normals)
                    .for_each(|(v, n)| v.normal = n);
                true
            }
            None => false,
        };
        if let Some(uvs) = reader.read_tex_coords(0) {
            vertices
                .iter_mut()
                .zip(uvs.into_f32())
                .for_each(|(v, uv)| v.tex_coords = uv);
        }
        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..vertices.len() as u32).collect(),
        };

        let mut geometry = Geometry {
            label: format!("{name}/{}", primitive.index()),
            vertices,
            indices,
        };
        if !has_normals {
            geometry.compute_normals();
        }
        match reader.read_tangents() {
            Some(tangents) => geometry
                .vertices
                .iter_mut()
                .zip(tangents)
                .for_each(|(v, [x, y, z, w])| {
                    let t = Vector3::new(x, y, z);
                    let n = Vector3::from(v.normal);
                    v.tangent = t.into();
                    v.bitangent = (n.cross(t) * -w).into();
                }),
            None => geometry.compute_tangents(),
        }
        out.push(geometry);
    }
    out
}

