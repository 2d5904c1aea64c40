//! glTF/GLB adapter
//!
//! Exposes the glTF node hierarchy through [`NodeGraph`] and extracts skins,
//! materials, meshes and animations into canonical records. Only buffers are
//! loaded; texture images are referenced by path and never decoded.

use anyhow::{Context, Result};
use glam::{DMat4, Mat4};
use gltf::image::Source;
use gltf::mesh::Mode;
use gltf::texture::WrappingMode;
use hashbrown::HashMap;
use std::path::Path;

use crate::config::CanonConfig;
use crate::identifier::name_or_indexed;
use crate::material::{Channels, InputName, InputValue, Material, TextureMap, WrapMode};
use crate::mesh::{AttributeValues, Interpolation, MeshAttribute, MeshBinding, MeshRecord};
use crate::node_graph::NodeGraph;
use crate::session::{CanonicalScene, ConversionRun};
use crate::skeleton::Skin;

/// [`NodeGraph`] over a glTF document, nodes keyed by index
pub struct GltfGraph {
    document: gltf::Document,
    parents: HashMap<usize, usize>,
}

impl GltfGraph {
    pub fn new(document: gltf::Document) -> Self {
        let mut parents = HashMap::new();
        for node in document.nodes() {
            for child in node.children() {
                parents.insert(child.index(), node.index());
            }
        }
        Self { document, parents }
    }

    pub fn document(&self) -> &gltf::Document {
        &self.document
    }

    fn node(&self, index: usize) -> Option<gltf::Node<'_>> {
        self.document.nodes().nth(index)
    }
}

impl NodeGraph for GltfGraph {
    type Node = usize;

    fn name(&self, node: usize) -> String {
        name_or_indexed(self.node(node).and_then(|n| n.name()), "node_", node)
    }

    fn children(&self, node: usize) -> Vec<usize> {
        self.node(node)
            .map(|n| n.children().map(|child| child.index()).collect())
            .unwrap_or_default()
    }

    fn local_transform(&self, node: usize) -> DMat4 {
        self.node(node)
            .map(|n| Mat4::from_cols_array_2d(&n.transform().matrix()).as_dmat4())
            .unwrap_or(DMat4::IDENTITY)
    }

    fn parent(&self, node: usize) -> Option<usize> {
        self.parents.get(&node).copied()
    }
}

/// Everything extracted from one glTF asset
pub struct GltfScene {
    pub graph: GltfGraph,
    pub skins: Vec<Skin<usize>>,
    pub materials: Vec<Material>,
    pub meshes: Vec<MeshRecord<usize>>,
    pub animations: Vec<(String, Vec<usize>)>,
}

impl GltfScene {
    /// Feed everything through a conversion run
    pub fn canonicalize(&self, config: CanonConfig) -> CanonicalScene {
        let mut run = ConversionRun::new(&self.graph, config);
        for skin in &self.skins {
            run.add_skin(skin.clone());
        }
        for material in &self.materials {
            run.add_material(material.clone());
        }
        for mesh in &self.meshes {
            run.add_mesh(mesh.clone());
        }
        for (name, targets) in &self.animations {
            run.add_animation(name, targets.clone());
        }
        run.finish()
    }
}

/// Load a .gltf or .glb file
pub fn load_gltf(path: &Path) -> Result<GltfScene> {
    let gltf::Gltf { document, blob } =
        gltf::Gltf::open(path).with_context(|| format!("Failed to load glTF: {:?}", path))?;
    let buffers = gltf::import_buffers(&document, path.parent(), blob)
        .with_context(|| format!("Failed to load glTF buffers: {:?}", path))?;
    extract(document, &buffers)
}

/// Load glTF from memory; buffers must be embedded
pub fn load_gltf_slice(bytes: &[u8]) -> Result<GltfScene> {
    let gltf::Gltf { document, blob } =
        gltf::Gltf::from_slice(bytes).context("Failed to parse glTF")?;
    let buffers =
        gltf::import_buffers(&document, None, blob).context("Failed to load glTF buffers")?;
    extract(document, &buffers)
}

fn extract(document: gltf::Document, buffers: &[gltf::buffer::Data]) -> Result<GltfScene> {
    let skins = extract_skins(&document, buffers);
    let materials = document.materials().map(|m| extract_material(&m)).collect();
    let meshes = extract_meshes(&document, buffers)?;
    let animations = document
        .animations()
        .map(|animation| {
            let name = name_or_indexed(animation.name(), "animation_", animation.index());
            let targets = animation
                .channels()
                .map(|channel| channel.target().node().index())
                .collect();
            (name, targets)
        })
        .collect();

    tracing::info!(
        "Loaded glTF: {} nodes, {} skins, {} materials, {} meshes",
        document.nodes().count(),
        document.skins().count(),
        document.materials().count(),
        document.meshes().count()
    );

    Ok(GltfScene {
        graph: GltfGraph::new(document),
        skins,
        materials,
        meshes,
        animations,
    })
}

/// Skins with bind matrices; glTF stores their inverses
fn extract_skins(document: &gltf::Document, buffers: &[gltf::buffer::Data]) -> Vec<Skin<usize>> {
    document
        .skins()
        .map(|skin| {
            let reader = skin.reader(|buffer| buffers.get(buffer.index()).map(|data| &data[..]));
            let inverse_binds: Vec<[[f32; 4]; 4]> = reader
                .read_inverse_bind_matrices()
                .map(|iter| iter.collect())
                .unwrap_or_default();

            let mut out = Skin::new(skin.skeleton().map(|node| node.index()));
            for (i, joint) in skin.joints().enumerate() {
                let bind = inverse_binds
                    .get(i)
                    .map(|m| Mat4::from_cols_array_2d(m).as_dmat4().inverse())
                    .unwrap_or(DMat4::IDENTITY);
                out.add_joint(joint.index(), bind);
            }
            out
        })
        .collect()
}

/// Primvar name for a texcoord set: `st`, `st1`, `st2`, ...
fn texcoord_name(set: u32) -> String {
    if set == 0 {
        "st".to_string()
    } else {
        format!("st{}", set)
    }
}

fn wrap_mode(mode: WrappingMode) -> WrapMode {
    match mode {
        WrappingMode::ClampToEdge => WrapMode::Clamp,
        WrappingMode::MirroredRepeat => WrapMode::Mirror,
        WrappingMode::Repeat => WrapMode::Repeat,
    }
}

/// File a texture reads; embedded images get a generated name
fn texture_file(texture: &gltf::Texture) -> String {
    let image = texture.source();
    match image.source() {
        Source::Uri { uri, .. } => uri.to_string(),
        Source::View { mime_type, .. } => {
            let ext = if mime_type == "image/jpeg" { "jpg" } else { "png" };
            format!("textures/image_{}.{}", image.index(), ext)
        }
    }
}

fn texture_map(texture: &gltf::Texture, tex_coord: u32) -> TextureMap {
    let sampler = texture.sampler();
    let mut map = TextureMap::new(texture_file(texture)).with_texcoord_set(texcoord_name(tex_coord));
    map.wrap_s = wrap_mode(sampler.wrap_s());
    map.wrap_t = wrap_mode(sampler.wrap_t());
    map
}

fn extract_material(material: &gltf::Material) -> Material {
    let index = material.index().unwrap_or(0);
    let mut out = Material::new(&name_or_indexed(material.name(), "material_", index));
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, a] = pbr.base_color_factor();

    if let Some(info) = pbr.base_color_texture() {
        let mut map = texture_map(&info.texture(), info.tex_coord());
        if [r, g, b] != [1.0; 3] {
            map = map.with_scale(InputValue::Vector([r, g, b]));
        }
        if material.alpha_mode() != gltf::material::AlphaMode::Opaque {
            let mut alpha = map.clone().with_channels(Channels::A);
            alpha.scale = (a != 1.0).then_some(InputValue::Scalar(a));
            out.set_texture(InputName::Opacity, alpha);
        }
        out.set_texture(InputName::DiffuseColor, map.with_channels(Channels::Rgb));
    } else {
        out.set_constant(InputName::DiffuseColor, InputValue::Vector([r, g, b]));
        if material.alpha_mode() != gltf::material::AlphaMode::Opaque {
            out.set_constant(InputName::Opacity, InputValue::Scalar(a));
        }
    }

    let metallic = pbr.metallic_factor();
    let roughness = pbr.roughness_factor();
    if let Some(info) = pbr.metallic_roughness_texture() {
        let map = texture_map(&info.texture(), info.tex_coord());
        let mut metal = map.clone().with_channels(Channels::B);
        metal.scale = (metallic != 1.0).then_some(InputValue::Scalar(metallic));
        let mut rough = map.with_channels(Channels::G);
        rough.scale = (roughness != 1.0).then_some(InputValue::Scalar(roughness));
        out.set_texture(InputName::Metallic, metal);
        out.set_texture(InputName::Roughness, rough);
    } else {
        out.set_constant(InputName::Metallic, InputValue::Scalar(metallic));
        out.set_constant(InputName::Roughness, InputValue::Scalar(roughness));
    }

    if let Some(normal) = material.normal_texture() {
        let map = texture_map(&normal.texture(), normal.tex_coord()).with_channels(Channels::Rgb);
        out.set_texture(InputName::Normal, map);
    }

    if let Some(occlusion) = material.occlusion_texture() {
        let mut map =
            texture_map(&occlusion.texture(), occlusion.tex_coord()).with_channels(Channels::R);
        let strength = occlusion.strength();
        map.scale = (strength != 1.0).then_some(InputValue::Scalar(strength));
        out.set_texture(InputName::Occlusion, map);
    }

    let emissive = material.emissive_factor();
    if let Some(info) = material.emissive_texture() {
        let mut map = texture_map(&info.texture(), info.tex_coord()).with_channels(Channels::Rgb);
        if emissive != [1.0; 3] {
            map = map.with_scale(InputValue::Vector(emissive));
        }
        out.set_texture(InputName::EmissiveColor, map);
    } else if emissive != [0.0; 3] {
        out.set_constant(InputName::EmissiveColor, InputValue::Vector(emissive));
    }

    out
}

fn extract_meshes(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> Result<Vec<MeshRecord<usize>>> {
    let mut meshes = Vec::new();
    for node in document.nodes() {
        let Some(mesh) = node.mesh() else {
            continue;
        };
        let node_name = name_or_indexed(node.name(), "node_", node.index());
        let primitive_count = mesh.primitives().count();

        for primitive in mesh.primitives() {
            let path = if primitive_count > 1 {
                format!("/Geom/{}/primitive_{}", node_name, primitive.index())
            } else {
                format!("/Geom/{}", node_name)
            };
            if primitive.mode() != Mode::Triangles {
                tracing::warn!("{}: primitive mode {:?} is not supported, skipped", path, primitive.mode());
                continue;
            }

            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data[..]));
            let points: Vec<[f32; 3]> = reader
                .read_positions()
                .with_context(|| format!("{}: no positions in primitive", path))?
                .collect();
            let indices: Vec<u32> = match reader.read_indices() {
                Some(iter) => iter.into_u32().collect(),
                None => (0..points.len() as u32).collect(),
            };

            let mut record = MeshRecord::new(&path);
            record.node = Some(node.index());
            record.face_vertex_counts = vec![3; indices.len() / 3];
            record.face_vertex_indices = indices;
            record.material = primitive.material().index().and_then(|i| {
                document
                    .materials()
                    .nth(i)
                    .map(|m| name_or_indexed(m.name(), "material_", i))
            });

            record.normals = reader.read_normals().map(|iter| {
                MeshAttribute::new(
                    "normals",
                    Interpolation::Vertex,
                    AttributeValues::Tuples(iter.map(|n| n.iter().map(|&c| c as f64).collect()).collect()),
                )
            });

            let mut set = 0;
            while let Some(uvs) = reader.read_tex_coords(set) {
                let values = uvs
                    .into_f32()
                    .map(|[u, v]| vec![u as f64, 1.0 - v as f64])
                    .collect();
                record.primvars.push(MeshAttribute::new(
                    &texcoord_name(set),
                    Interpolation::Vertex,
                    AttributeValues::Tuples(values),
                ));
                set += 1;
            }

            if let Some(colors) = reader.read_colors(0) {
                let values = colors
                    .into_rgb_f32()
                    .map(|c| c.iter().map(|&x| x as f64).collect())
                    .collect();
                record.primvars.push(MeshAttribute::new(
                    "displayColor",
                    Interpolation::Vertex,
                    AttributeValues::Tuples(values),
                ));
            }

            record.binding = match (node.skin(), reader.read_joints(0), reader.read_weights(0)) {
                (Some(skin), Some(joints), Some(weights)) => Some(MeshBinding::Skinned {
                    skin: skin.index(),
                    joint_indices: joints
                        .into_u16()
                        .flat_map(|j| j.map(u32::from))
                        .collect(),
                    joint_weights: weights.into_f32().flatten().collect(),
                    element_size: 4,
                }),
                (Some(_), _, _) => {
                    tracing::warn!("{}: skinned node without JOINTS_0/WEIGHTS_0", path);
                    None
                }
                // Unskinned meshes follow their own node once skeletons exist
                (None, _, _) => None,
            };

            meshes.push(record);
        }
    }
    Ok(meshes)
}
