//! Reader that delegates file decoding to the gmsh executable.
//!
//! gmsh re-exports the input (any format or msh version it can open) as an
//! msh 4.1 ASCII file, which is then queried the way the gmsh API exposes a
//! model: physical groups, the entities of a group, the elements of an
//! entity grouped by type, and the node list.

use std::{
    collections::{BTreeSet, HashMap},
    path::Path,
    process::Command,
};

use nalgebra::Point3;
use tracing::{debug, info};

use crate::{
    datatypes::{Block, Boundary, IntermediateMesh},
    error::Msh2ExoError,
    msh::{read_msh_file, GmshElementType, MshFile},
    reader::{local_node, MeshReader},
};

#[derive(Debug, Clone)]
pub struct ToolkitReader {
    gmsh_executable: String,
}

impl ToolkitReader {
    pub fn new(gmsh_executable: impl Into<String>) -> Self {
        ToolkitReader {
            gmsh_executable: gmsh_executable.into(),
        }
    }

    /// Whether the gmsh executable can be started at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.gmsh_executable)
            .arg("-version")
            .output()
            .is_ok()
    }

    /// Runs gmsh to write `input` as an msh 4.1 ASCII file at `output`
    fn export(&self, input: &Path, output: &Path) -> Result<(), Msh2ExoError> {
        info!("running {} on {}", self.gmsh_executable, input.display());
        let result = Command::new(&self.gmsh_executable)
            .arg(input)
            .arg("-0")
            .arg("-format")
            .arg("msh41")
            .arg("-o")
            .arg(output)
            .output()
            .map_err(|err| Msh2ExoError::Toolkit(format!("Gmsh failed: {err}")))?;

        if !result.status.success() {
            return Err(Msh2ExoError::Toolkit(format!(
                "Gmsh exited with {} while reading {}: {}",
                result.status,
                input.display(),
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }
        debug!("{}", String::from_utf8_lossy(&result.stdout).trim());

        Ok(())
    }
}

impl MeshReader for ToolkitReader {
    fn name(&self) -> &'static str {
        "gmsh toolkit"
    }

    fn read(&self, path: &Path) -> Result<IntermediateMesh, Msh2ExoError> {
        if !path.is_file() {
            return Err(Msh2ExoError::Input(format!(
                "Unable to open mesh file {}",
                path.display()
            )));
        }

        let scratch = tempfile::tempdir()?;
        let exported = scratch.path().join("export.msh");
        self.export(path, &exported)?;

        let msh = read_msh_file(&exported)?;
        let mesh = Model::new(&msh).reconstruct()?;
        mesh.validate()?;
        info!(
            "{}: loaded {} nodes, {} elements in {} blocks, {} boundaries",
            path.display(),
            mesh.n_nodes,
            mesh.n_elements,
            mesh.n_blocks(),
            mesh.boundaries.len()
        );
        Ok(mesh)
    }
}

/// Elements of one entity grouped by type, in order of first appearance.
#[derive(Debug, Default)]
struct EntityElements {
    element_types: Vec<GmshElementType>,
    element_tags: Vec<Vec<usize>>,
    node_tags: Vec<Vec<usize>>,
}

/// Query view over an exported msh file.
struct Model<'a> {
    msh: &'a MshFile,
}

impl<'a> Model<'a> {
    fn new(msh: &'a MshFile) -> Self {
        Model { msh }
    }

    fn physical_groups(&self) -> Vec<(i32, i32)> {
        self.msh
            .physical_groups
            .iter()
            .map(|p| (p.dim, p.tag))
            .collect()
    }

    fn physical_name(&self, dim: i32, tag: i32) -> &'a str {
        self.msh
            .physical_groups
            .iter()
            .find(|p| p.dim == dim && p.tag == tag)
            .map_or("", |p| p.name.as_str())
    }

    fn entities_for_physical_group(&self, dim: i32, tag: i32) -> Vec<i32> {
        self.msh
            .entities
            .iter()
            .filter(|e| e.dim == dim && e.physical_tags.contains(&tag))
            .map(|e| e.tag)
            .collect()
    }

    fn elements(&self, dim: i32, entity_tag: i32) -> EntityElements {
        let mut elements = EntityElements::default();
        for group in self
            .msh
            .element_groups
            .iter()
            .filter(|g| g.dim == dim && g.entity_tag == entity_tag)
        {
            let slot = match elements
                .element_types
                .iter()
                .position(|&t| t == group.element_type)
            {
                Some(slot) => slot,
                None => {
                    elements.element_types.push(group.element_type);
                    elements.element_tags.push(Vec::new());
                    elements.node_tags.push(Vec::new());
                    elements.element_types.len() - 1
                }
            };
            elements.element_tags[slot].extend_from_slice(&group.element_tags);
            elements.node_tags[slot].extend_from_slice(&group.node_tags);
        }
        elements
    }

    fn nodes(&self) -> (Vec<usize>, Vec<Point3<f64>>) {
        let mut tags = Vec::with_capacity(self.msh.n_nodes());
        let mut coords = Vec::with_capacity(self.msh.n_nodes());
        for block in &self.msh.node_blocks {
            tags.extend_from_slice(&block.tags);
            coords.extend_from_slice(&block.coords);
        }
        (tags, coords)
    }

    /// Builds the mesh from the query results.
    ///
    /// Unlike the builtin reader, only nodes used by block elements are kept.
    /// They are numbered block by block in ascending tag order, and block
    /// elements are numbered in ascending tag order.
    fn reconstruct(&self) -> Result<IntermediateMesh, Msh2ExoError> {
        let (node_tags, coords) = self.nodes();
        if node_tags.is_empty() {
            return Err(Msh2ExoError::Consistency(
                "gmsh model has no nodes".to_string(),
            ));
        }

        let dim_tags = self.physical_groups();
        let max_dim = dim_tags.iter().map(|&(dim, _)| dim).max().ok_or_else(|| {
            Msh2ExoError::Format("gmsh model has no physical groups".to_string())
        })?;

        let phys_elems: Vec<Vec<EntityElements>> = dim_tags
            .iter()
            .map(|&(dim, tag)| {
                self.entities_for_physical_group(dim, tag)
                    .into_iter()
                    .map(|entity| self.elements(dim, entity))
                    .collect()
            })
            .collect();

        // element type, element tags and node tags of each block
        let mut block_groups = Vec::new();
        for (i, &(dim, tag)) in dim_tags.iter().enumerate() {
            if dim != max_dim {
                continue;
            }
            let name = self.physical_name(dim, tag);

            let mut types: Vec<GmshElementType> = Vec::new();
            for entity in &phys_elems[i] {
                for &t in &entity.element_types {
                    if !types.contains(&t) {
                        types.push(t);
                    }
                }
            }
            if types.len() > 1 {
                return Err(Msh2ExoError::Format(format!(
                    "More than one element type found in physical group {name} tag {tag}"
                )));
            }
            let gmsh_type = *types.first().ok_or_else(|| {
                Msh2ExoError::Consistency(format!(
                    "physical group {name} tag {tag} has no elements"
                ))
            })?;
            let element_type = gmsh_type.element_type().ok_or_else(|| {
                Msh2ExoError::Unsupported(format!(
                    "physical group {name} tag {tag} holds point elements, which cannot form a block"
                ))
            })?;

            let mut elem_set = BTreeSet::new();
            let mut node_set = BTreeSet::new();
            for entity in &phys_elems[i] {
                elem_set.extend(entity.element_tags.iter().flatten().copied());
                node_set.extend(entity.node_tags.iter().flatten().copied());
            }
            block_groups.push((i, gmsh_type, element_type, elem_set, node_set));
        }

        let mut node_index_map: HashMap<usize, usize> = HashMap::new();
        for (_, _, _, _, node_set) in &block_groups {
            for &nid in node_set {
                let next = node_index_map.len();
                node_index_map.entry(nid).or_insert(next);
            }
        }

        let mut elem_index_map: HashMap<usize, usize> = HashMap::new();
        let mut blocks = Vec::with_capacity(block_groups.len());
        for (i, gmsh_type, element_type, elem_set, _) in &block_groups {
            let (dim, tag) = dim_tags[*i];
            let name = self.physical_name(dim, tag);
            let start_elem = elem_index_map.len();
            for &eid in elem_set {
                let next = elem_index_map.len();
                elem_index_map.entry(eid).or_insert(next);
            }
            let n_elements = elem_index_map.len() - start_elem;

            let n_nodes = gmsh_type.n_nodes();
            let node_order = gmsh_type.exodus_node_order();
            let mut connectivity = vec![0; n_elements * n_nodes];
            for entity in &phys_elems[*i] {
                for (elem_tags, elem_nodes) in entity.element_tags.iter().zip(&entity.node_tags) {
                    for (&eid, nodes) in elem_tags.iter().zip(elem_nodes.chunks_exact(n_nodes)) {
                        let elem = elem_index_map[&eid];
                        if elem < start_elem {
                            return Err(Msh2ExoError::Consistency(format!(
                                "element tag {eid} belongs to more than one block ({name})"
                            )));
                        }
                        let offset = (elem - start_elem) * n_nodes;
                        for n in 0..n_nodes {
                            let gmsh_index = node_order.map_or(n, |order| order[n]);
                            connectivity[offset + n] =
                                local_node(&node_index_map, nodes[gmsh_index], name)?;
                        }
                    }
                }
            }

            blocks.push(Block {
                name: name.to_string(),
                element_type: *element_type,
                n_elements,
                connectivity,
            });
        }

        let mut boundaries = Vec::new();
        for (i, &(dim, tag)) in dim_tags.iter().enumerate() {
            if dim == max_dim {
                continue;
            }
            let name = self.physical_name(dim, tag);
            let mut nodes = BTreeSet::new();
            for entity in &phys_elems[i] {
                for &nid in entity.node_tags.iter().flatten() {
                    let node = node_index_map.get(&nid).copied().ok_or_else(|| {
                        Msh2ExoError::Consistency(format!(
                            "node tag {nid} of boundary {name} is not attached to any block element"
                        ))
                    })?;
                    nodes.insert(node);
                }
            }
            boundaries.push(Boundary::new(tag, name, nodes.into_iter().collect()));
        }

        let n_nodes = node_index_map.len();
        let mut mapped_coords = vec![0.0; n_nodes * 3];
        for (tag, point) in node_tags.iter().zip(&coords) {
            if let Some(&index) = node_index_map.get(tag) {
                mapped_coords[index * 3..index * 3 + 3].copy_from_slice(&[point.x, point.y, point.z]);
            }
        }

        Ok(IntermediateMesh {
            dim: max_dim.max(0) as usize,
            n_nodes,
            n_elements: elem_index_map.len(),
            coords: mapped_coords,
            blocks,
            boundaries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::ElementType,
        msh::{parse_msh, tests::SINGLE_HEX},
        reader::tests::SPARSE_TRIS,
    };

    #[test]
    fn single_hex_matches_builtin_reconstruction() {
        let msh = parse_msh(SINGLE_HEX).unwrap();
        let toolkit = Model::new(&msh).reconstruct().unwrap();
        let builtin = crate::reader::reconstruct(&msh).unwrap();
        toolkit.validate().unwrap();
        assert_eq!(toolkit, builtin);
    }

    #[test]
    fn nodes_and_elements_follow_ascending_tags() {
        let msh = parse_msh(SPARSE_TRIS).unwrap();
        let mesh = Model::new(&msh).reconstruct().unwrap();
        mesh.validate().unwrap();

        // block nodes 3, 5, 9, 17 -> 0, 1, 2, 3; node 42 is dropped
        assert_eq!(mesh.n_nodes, 4);
        assert_eq!(mesh.n_elements, 3);
        assert_eq!(mesh.blocks[0].element_type, ElementType::Tri3);
        assert_eq!(mesh.blocks[0].connectivity, vec![1, 3, 0, 3, 2, 0, 0, 2, 1]);
        assert_eq!(mesh.boundaries[0].nodes, vec![1, 3]);
        assert_eq!(&mesh.coords[9..12], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn elements_are_grouped_by_type() {
        let msh = parse_msh(SINGLE_HEX).unwrap();
        let model = Model::new(&msh);
        assert_eq!(model.physical_groups(), vec![(2, 1), (2, 2), (3, 10)]);
        assert_eq!(model.entities_for_physical_group(3, 10), vec![1]);
        let elements = model.elements(3, 1);
        assert_eq!(elements.element_types, vec![GmshElementType::Hex8]);
        assert_eq!(elements.element_tags, vec![vec![3]]);
    }

    #[test]
    fn boundary_node_outside_blocks_is_rejected() {
        let contents = SPARSE_TRIS.replacen("1 5 17\n", "1 5 42\n", 1);
        let msh = parse_msh(&contents).unwrap();
        match Model::new(&msh).reconstruct() {
            Err(Msh2ExoError::Consistency(msg)) => assert!(msg.contains("42")),
            other => panic!("expected consistency error, got {other:?}"),
        }
        // the builtin reader keeps every declared node
        assert!(crate::reader::reconstruct(&msh).is_ok());
    }

    #[test]
    fn mixed_types_are_rejected() {
        let contents = SPARSE_TRIS.replacen("2 2 2 1\n4 3 9 5", "2 2 3 1\n4 3 9 5 17", 1);
        let msh = parse_msh(&contents).unwrap();
        assert!(matches!(
            Model::new(&msh).reconstruct(),
            Err(Msh2ExoError::Format(_))
        ));
    }

    #[test]
    fn missing_gmsh_is_a_toolkit_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hex.msh");
        std::fs::write(&path, SINGLE_HEX).unwrap();

        let reader = ToolkitReader::new("/nonexistent/gmsh-binary");
        assert!(!reader.is_available());
        assert!(matches!(reader.read(&path), Err(Msh2ExoError::Toolkit(_))));
    }
}
