//! Derives the element sides that lie on each boundary node set.

use std::collections::{BTreeSet, HashSet};

use indicatif::ProgressBar;
use tracing::info;

use crate::{
    datatypes::{Boundary, IntermediateMesh, Side},
    error::Msh2ExoError,
};

/// Maps every local node to the global elements that reference it.
#[derive(Debug, Clone)]
pub struct NodeElementIndex {
    node_elems: Vec<Vec<usize>>,
    block_offsets: Vec<usize>,
}

impl NodeElementIndex {
    /// Builds the index in one pass over all block connectivity.
    pub fn build(mesh: &IntermediateMesh) -> NodeElementIndex {
        let mut node_elems: Vec<Vec<usize>> = vec![Vec::new(); mesh.n_nodes];
        let block_offsets = mesh.block_offsets();

        for (block, &offset) in mesh.blocks.iter().zip(&block_offsets) {
            for elem in 0..block.n_elements {
                for &node in block.element_nodes(elem) {
                    node_elems[node].push(offset + elem);
                }
            }
        }
        for elems in &mut node_elems {
            elems.sort_unstable();
            elems.dedup();
        }

        NodeElementIndex {
            node_elems,
            block_offsets,
        }
    }

    /// Global elements incident to `node`, ascending.
    pub fn elements_of(&self, node: usize) -> &[usize] {
        self.node_elems.get(node).map_or(&[], Vec::as_slice)
    }

    /// Splits a global element index into (block index, element within block).
    pub fn locate(&self, elem: usize) -> (usize, usize) {
        let block = self.block_offsets.partition_point(|&offset| offset <= elem) - 1;
        (block, elem - self.block_offsets[block])
    }
}

/// Finds every element side whose nodes all belong to `boundary`.
///
/// # Arguments
/// * `mesh` - The mesh holding the element blocks
/// * `index` - Node to element index built from the same mesh
/// * `boundary` - The node set to search
///
/// # Returns
/// Sides with 1-based element and side numbers
pub fn find_boundary_sides(
    mesh: &IntermediateMesh,
    index: &NodeElementIndex,
    boundary: &Boundary,
) -> Result<BTreeSet<Side>, Msh2ExoError> {
    let node_set: HashSet<usize> = boundary.nodes.iter().copied().collect();
    let mut visited: HashSet<usize> = HashSet::new();
    let mut sides = BTreeSet::new();

    for &node in &boundary.nodes {
        for &elem in index.elements_of(node) {
            if !visited.insert(elem) {
                continue;
            }

            let (block_index, local_elem) = index.locate(elem);
            let block = &mesh.blocks[block_index];
            let info = block.element_type.info()?;
            let elem_nodes = block.element_nodes(local_elem);

            for side in 0..info.n_sides() {
                let side_nodes = info.local_side_order[side];
                if side_nodes.iter().all(|&n| node_set.contains(&elem_nodes[n])) {
                    sides.insert(Side {
                        element: elem + 1,
                        side: side + 1,
                    });
                }
            }
        }
    }

    Ok(sides)
}

/// Fills in `sides` of every boundary of `mesh`.
pub fn derive_boundary_sides(
    mesh: &mut IntermediateMesh,
    show_progress: bool,
) -> Result<(), Msh2ExoError> {
    if mesh.boundaries.is_empty() {
        return Ok(());
    }

    info!("Generating node to element map");
    let index = NodeElementIndex::build(mesh);

    let bar = if show_progress {
        ProgressBar::new(mesh.boundaries.len() as u64)
    } else {
        ProgressBar::hidden()
    };

    let mut found = Vec::with_capacity(mesh.boundaries.len());
    for boundary in &mesh.boundaries {
        bar.suspend(|| {
            info!(
                "Searching boundary {} ({}) for sides, {} nodes",
                boundary.tag,
                boundary.name,
                boundary.nodes.len()
            )
        });
        found.push(find_boundary_sides(mesh, &index, boundary)?);
        bar.inc(1);
    }
    bar.finish_and_clear();

    for (boundary, sides) in mesh.boundaries.iter_mut().zip(found) {
        boundary.sides = sides;
    }

    Ok(())
}
