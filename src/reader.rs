//! Builds an [`IntermediateMesh`] from a parsed msh file.
//!
//! Physical groups of the largest dimension become element blocks, every
//! lower-dimensional physical group becomes a boundary node set.

use std::{
    collections::{hash_map::Entry, BTreeSet, HashMap},
    path::Path,
};

use tracing::{debug, info, warn};

use crate::{
    datatypes::{Block, Boundary, IntermediateMesh},
    error::Msh2ExoError,
    msh::{read_msh_file, ElementGroup, MshFile, PhysicalGroup},
    settings::Settings,
    toolkit::ToolkitReader,
};

/// Anything that can turn a mesh file into an [`IntermediateMesh`].
pub trait MeshReader {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    fn read(&self, path: &Path) -> Result<IntermediateMesh, Msh2ExoError>;
}

/// Reads msh 4.1 ASCII files without any external program.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinReader;

impl MeshReader for BuiltinReader {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn read(&self, path: &Path) -> Result<IntermediateMesh, Msh2ExoError> {
        let msh = read_msh_file(path)?;
        debug!(
            "msh version {}, {} byte floats, {} node blocks, {} element groups",
            msh.format.version,
            msh.format.data_size,
            msh.node_blocks.len(),
            msh.element_groups.len()
        );
        let mesh = reconstruct(&msh)?;
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

/// Picks the reader for a run. The toolkit reader is preferred unless
/// `builtin` is set or the gmsh executable cannot be started.
pub fn select_reader(builtin: bool, settings: &Settings) -> Box<dyn MeshReader> {
    if builtin {
        return Box::new(BuiltinReader);
    }

    let toolkit = ToolkitReader::new(&settings.gmsh_executable);
    if toolkit.is_available() {
        Box::new(toolkit)
    } else {
        warn!(
            "gmsh executable '{}' not found, falling back to the builtin reader",
            settings.gmsh_executable
        );
        Box::new(BuiltinReader)
    }
}

/// Resolves a gmsh node tag to its dense index.
pub(crate) fn local_node(
    node_map: &HashMap<usize, usize>,
    tag: usize,
    context: &str,
) -> Result<usize, Msh2ExoError> {
    node_map.get(&tag).copied().ok_or_else(|| {
        Msh2ExoError::Consistency(format!(
            "node tag {tag} used by {context} is not declared in $Nodes"
        ))
    })
}

/// Appends the connectivity of one element group to `block`, converting
/// tags to local indices and gmsh node order to ExodusII node order.
pub(crate) fn append_group(
    block: &mut Block,
    group: &ElementGroup,
    node_map: &HashMap<usize, usize>,
) -> Result<(), Msh2ExoError> {
    let n_nodes = group.element_type.n_nodes();
    let node_order = group.element_type.exodus_node_order();
    block.connectivity.reserve(group.node_tags.len());

    for element_nodes in group.node_tags.chunks_exact(n_nodes) {
        for i in 0..n_nodes {
            let gmsh_index = node_order.map_or(i, |order| order[i]);
            let node = local_node(node_map, element_nodes[gmsh_index], &block.name)?;
            block.connectivity.push(node);
        }
    }
    block.n_elements += group.element_tags.len();

    Ok(())
}

fn collect_block(
    msh: &MshFile,
    physical: &PhysicalGroup,
    ent_set: &BTreeSet<i32>,
    node_map: &HashMap<usize, usize>,
) -> Result<Block, Msh2ExoError> {
    let mut block: Option<Block> = None;

    for group in msh.element_groups_in(physical.dim, ent_set) {
        let element_type = group.element_type.element_type().ok_or_else(|| {
            Msh2ExoError::Unsupported(format!(
                "physical group {} tag {} holds point elements, which cannot form a block",
                physical.name, physical.tag
            ))
        })?;

        let block = block.get_or_insert_with(|| Block {
            name: physical.name.clone(),
            element_type,
            n_elements: 0,
            connectivity: Vec::new(),
        });
        if block.element_type != element_type {
            return Err(Msh2ExoError::Format(format!(
                "More than one element type found in physical group {} tag {} ({} and {})",
                physical.name, physical.tag, block.element_type, element_type
            )));
        }

        append_group(block, group, node_map)?;
    }

    block.ok_or_else(|| {
        Msh2ExoError::Consistency(format!(
            "physical group {} tag {} has no elements",
            physical.name, physical.tag
        ))
    })
}

fn collect_boundary(
    msh: &MshFile,
    physical: &PhysicalGroup,
    ent_set: &BTreeSet<i32>,
    node_map: &HashMap<usize, usize>,
) -> Result<Boundary, Msh2ExoError> {
    let mut ss_nodes = BTreeSet::new();
    for group in msh.element_groups_in(physical.dim, ent_set) {
        for &tag in &group.node_tags {
            ss_nodes.insert(local_node(node_map, tag, &physical.name)?);
        }
    }

    Ok(Boundary::new(
        physical.tag,
        physical.name.clone(),
        ss_nodes.into_iter().collect(),
    ))
}

/// Reconstructs blocks and boundaries from the raw msh sections.
///
/// Nodes are numbered in the order they appear in `$Nodes`. Block elements
/// keep the order of their element groups in `$Elements`.
///
/// # Arguments
/// * `msh` - The parsed msh file
///
/// # Returns
/// The mesh in local indices, not yet validated
pub fn reconstruct(msh: &MshFile) -> Result<IntermediateMesh, Msh2ExoError> {
    let max_dim = msh
        .max_dim()
        .ok_or_else(|| Msh2ExoError::Format("mesh file has no physical groups".to_string()))?;
    let phys_ents = msh.physical_entities();

    let n_nodes = msh.n_nodes();
    let mut node_map: HashMap<usize, usize> = HashMap::with_capacity(n_nodes);
    let mut coords = Vec::with_capacity(n_nodes * 3);
    for node_block in &msh.node_blocks {
        for (&tag, point) in node_block.tags.iter().zip(&node_block.coords) {
            let index = node_map.len();
            match node_map.entry(tag) {
                Entry::Occupied(_) => {
                    return Err(Msh2ExoError::Format(format!(
                        "node tag {tag} is declared more than once"
                    )))
                }
                Entry::Vacant(entry) => {
                    entry.insert(index);
                }
            }
            coords.extend_from_slice(&[point.x, point.y, point.z]);
        }
    }

    let mut mesh = IntermediateMesh {
        dim: max_dim.max(0) as usize,
        n_nodes: node_map.len(),
        coords,
        ..Default::default()
    };

    for physical in &msh.physical_groups {
        let ent_set = phys_ents.get(&(physical.dim, physical.tag)).ok_or_else(|| {
            Msh2ExoError::Consistency(format!(
                "physical group {} tag {} is not referenced by any entity",
                physical.name, physical.tag
            ))
        })?;

        if physical.dim == max_dim {
            let block = collect_block(msh, physical, ent_set, &node_map)?;
            mesh.n_elements += block.n_elements;
            mesh.blocks.push(block);
        } else {
            let boundary = collect_boundary(msh, physical, ent_set, &node_map)?;
            mesh.boundaries.push(boundary);
        }
    }

    Ok(mesh)
}
