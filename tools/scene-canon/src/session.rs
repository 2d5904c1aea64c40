//! Conversion run
//!
//! One [`ConversionRun`] per asset. It owns every piece of per-asset state
//! (skinning arena, material lookup, texture renames, diagnostics) and is
//! consumed by [`ConversionRun::finish`], which runs the pipeline in input
//! order and returns the canonical scene.

use hashbrown::{HashMap, HashSet};
use serde::Serialize;
use std::path::Path;

use crate::config::CanonConfig;
use crate::diagnostics::Diagnostics;
use crate::identifier::{make_valid_identifier, make_valid_path};
use crate::material::{
    validate_shading_graph, InputName, Material, MaterialGraphBuilder, MaterialInput,
    ShadingGraph,
};
use crate::mesh::{validate_mesh, MeshBinding, MeshRecord, MeshReport, MeshStatus};
use crate::node_graph::NodeGraph;
use crate::skeleton::{JointInfluences, RigidBinding, SkeletonRecord, Skin, Skinning};

/// How one mesh ended up bound to a skeleton
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BindingRecord {
    Skinned(JointInfluences),
    Rigid(RigidBinding),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshBindingRecord {
    pub mesh: String,
    pub binding: BindingRecord,
}

/// Material bound to a mesh or one of its subsets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterialBindingRecord {
    /// Mesh path, or `<mesh>/<subset>` for a geometry subset
    pub prim: String,
    /// Path of the bound shading graph
    pub material: String,
}

/// Texture file the emitter has to copy under a new name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextureCopy {
    pub source: String,
    pub target: String,
}

/// Everything handed to the emitter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalScene {
    pub asset: String,
    pub skeletons: Vec<SkeletonRecord>,
    pub bindings: Vec<MeshBindingRecord>,
    pub materials: Vec<ShadingGraph>,
    pub material_bindings: Vec<MaterialBindingRecord>,
    pub meshes: Vec<MeshReport>,
    pub textures: Vec<TextureCopy>,
    pub diagnostics: Diagnostics,
    /// No structural or graph-consistency error anywhere in the asset
    pub passed: bool,
}

/// Source texture path -> sanitized, deduplicated target path
#[derive(Debug, Default)]
struct TextureNames {
    renamed: HashMap<String, String>,
    taken: HashSet<String>,
    order: Vec<String>,
}

impl TextureNames {
    fn target(&mut self, source: &str) -> String {
        if let Some(target) = self.renamed.get(source) {
            return target.clone();
        }

        let mut target = make_valid_path(source);
        if let Some(stem) = target
            .strip_suffix(".jpeg")
            .or_else(|| target.strip_suffix(".JPEG"))
        {
            target = format!("{}.jpg", stem);
        }

        // Two sources sanitizing to the same name go to numbered folders
        if self.taken.contains(&target) {
            let base = Path::new(&target)
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or(target.as_str())
                .to_string();
            let mut folder = 0;
            loop {
                let candidate = format!("textures/{}/{}", folder, base);
                if !self.taken.contains(&candidate) {
                    target = candidate;
                    break;
                }
                folder += 1;
            }
        }

        self.taken.insert(target.clone());
        self.renamed.insert(source.to_string(), target.clone());
        self.order.push(source.to_string());
        target
    }

    fn copies(&self) -> Vec<TextureCopy> {
        self.order
            .iter()
            .filter_map(|source| {
                let target = &self.renamed[source];
                (target != source).then(|| TextureCopy {
                    source: source.clone(),
                    target: target.clone(),
                })
            })
            .collect()
    }
}

/// Per-asset pipeline state
pub struct ConversionRun<'g, G: NodeGraph> {
    graph: &'g G,
    config: CanonConfig,
    skinning: Skinning<G::Node>,
    materials: Vec<Material>,
    material_index: HashMap<String, usize>,
    textures: TextureNames,
    meshes: Vec<MeshRecord<G::Node>>,
    animations: Vec<(String, Vec<G::Node>)>,
    diagnostics: Diagnostics,
}

impl<'g, G: NodeGraph> ConversionRun<'g, G> {
    pub fn new(graph: &'g G, config: CanonConfig) -> Self {
        Self {
            graph,
            config,
            skinning: Skinning::new(),
            materials: Vec::new(),
            material_index: HashMap::new(),
            textures: TextureNames::default(),
            meshes: Vec::new(),
            animations: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn config(&self) -> &CanonConfig {
        &self.config
    }

    /// Register a skin; returns the index mesh bindings refer to
    pub fn add_skin(&mut self, skin: Skin<G::Node>) -> usize {
        self.skinning.add_skin(skin)
    }

    /// Register a material; a second material with the same name is dropped
    pub fn add_material(&mut self, mut material: Material) -> usize {
        material.normalize_name();
        if let Some(&index) = self.material_index.get(&material.name) {
            tracing::debug!("Material '{}' already registered", material.name);
            return index;
        }

        for input in InputName::ALL {
            if let Some(MaterialInput::Texture(map)) = material.inputs.get_mut(&input) {
                if !map.file.is_empty() {
                    map.file = self.textures.target(&map.file);
                }
            }
        }
        material.assign_sampler_names();

        let index = self.materials.len();
        self.material_index.insert(material.name.clone(), index);
        self.materials.push(material);
        index
    }

    /// Index of a registered material, by authored or sanitized name
    pub fn material_index(&self, name: &str) -> Option<usize> {
        self.material_index
            .get(name)
            .or_else(|| {
                let base = name.rsplit('/').next().unwrap_or(name);
                self.material_index.get(&make_valid_identifier(base))
            })
            .copied()
    }

    pub fn add_mesh(&mut self, mesh: MeshRecord<G::Node>) {
        self.meshes.push(mesh);
    }

    pub fn add_animation(&mut self, name: &str, targets: Vec<G::Node>) {
        self.animations.push((name.to_string(), targets));
    }

    /// Run the pipeline and hand back the canonical scene
    pub fn finish(mut self) -> CanonicalScene {
        tracing::info!(
            "Canonicalizing '{}': {} skins, {} materials, {} meshes",
            self.config.asset.name,
            self.skinning.skins().len(),
            self.materials.len(),
            self.meshes.len()
        );

        self.skinning.consolidate(self.graph, &mut self.diagnostics);

        for (name, targets) in &self.animations {
            self.skinning
                .assign_animation_to_targets(targets, name, &mut self.diagnostics);
        }

        let builder = MaterialGraphBuilder::new(&self.config);
        let mut materials = Vec::with_capacity(self.materials.len());
        for material in &self.materials {
            let graph = builder.build(material, &mut self.diagnostics);
            self.diagnostics.extend(validate_shading_graph(&graph));
            materials.push(graph);
        }

        let records = std::mem::take(&mut self.meshes);
        let mut meshes = Vec::with_capacity(records.len());
        let mut bindings = Vec::new();
        let mut material_bindings = Vec::new();
        for mesh in &records {
            self.bind_materials(mesh, &materials, &mut material_bindings);
            let report = validate_mesh(mesh);
            self.diagnostics.extend(report.diagnostics.clone());
            if report.status != MeshStatus::Fail {
                if let Some(binding) = self.bind_mesh(mesh) {
                    bindings.push(MeshBindingRecord {
                        mesh: mesh.path.clone(),
                        binding,
                    });
                }
            }
            meshes.push(report);
        }

        let passed = !self.diagnostics.has_errors()
            && meshes.iter().all(|report| report.status != MeshStatus::Fail);
        let skeletons = self.skinning.skeleton_records();

        tracing::info!(
            "Canonicalized '{}': {} skeletons, {} materials, {} diagnostics, {}",
            self.config.asset.name,
            skeletons.len(),
            materials.len(),
            self.diagnostics.len(),
            if passed { "passed" } else { "failed" }
        );

        CanonicalScene {
            asset: self.config.asset.name.clone(),
            skeletons,
            bindings,
            materials,
            material_bindings,
            meshes,
            textures: self.textures.copies(),
            diagnostics: self.diagnostics,
            passed,
        }
    }

    /// Resolve the material names a mesh and its subsets refer to
    fn bind_materials(
        &mut self,
        mesh: &MeshRecord<G::Node>,
        graphs: &[ShadingGraph],
        out: &mut Vec<MaterialBindingRecord>,
    ) {
        let targets = std::iter::once((mesh.path.clone(), mesh.material.as_deref())).chain(
            mesh.subsets.iter().map(|subset| {
                (
                    format!("{}/{}", mesh.path, make_valid_identifier(&subset.name)),
                    subset.material.as_deref(),
                )
            }),
        );
        for (prim, name) in targets {
            let Some(name) = name else {
                continue;
            };
            match self.material_index(name).and_then(|index| graphs.get(index)) {
                Some(graph) => out.push(MaterialBindingRecord {
                    prim,
                    material: graph.path.clone(),
                }),
                None => self.diagnostics.warn(
                    prim,
                    format!("material '{}' is not defined, binding dropped", name),
                ),
            }
        }
    }

    fn bind_mesh(&mut self, mesh: &MeshRecord<G::Node>) -> Option<BindingRecord> {
        // A mesh without a binding follows its own node if a skeleton owns it
        let Some(binding) = mesh.binding.as_ref() else {
            let node = mesh.node?;
            return self
                .skinning
                .bind_rigid(self.graph, node, node)
                .map(BindingRecord::Rigid);
        };
        match binding {
            MeshBinding::Skinned {
                skin,
                joint_indices,
                joint_weights,
                element_size,
            } => {
                let normalize = self.config.skinning.normalize_weights;
                match self.skinning.remap_influences(
                    *skin,
                    joint_indices,
                    joint_weights,
                    *element_size,
                    normalize,
                ) {
                    Ok(influences) => Some(BindingRecord::Skinned(influences)),
                    Err(err) => {
                        self.diagnostics.fail(mesh.path.clone(), err.to_string());
                        None
                    }
                }
            }
            MeshBinding::Rigid { node, joint } => {
                match self.skinning.bind_rigid(self.graph, *node, *joint) {
                    Some(rigid) => Some(BindingRecord::Rigid(rigid)),
                    None => {
                        self.diagnostics.warn(
                            mesh.path.clone(),
                            format!(
                                "joint '{}' is not part of any skeleton, mesh left unbound",
                                self.graph.name(*joint)
                            ),
                        );
                        None
                    }
                }
            }
        }
    }
}
