use std::collections::{BTreeSet, HashSet};

use nalgebra::Point3;

use crate::{catalog::ElementType, error::Msh2ExoError};

/// A named group of elements that all share one topology.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub element_type: ElementType,
    pub n_elements: usize,
    /// `n_elements * element_type.n_nodes()` local node indices
    pub connectivity: Vec<usize>,
}

impl Block {
    /// Local node indices of the `elem`-th element of this block.
    pub fn element_nodes(&self, elem: usize) -> &[usize] {
        let n = self.element_type.n_nodes();
        &self.connectivity[elem * n..(elem + 1) * n]
    }
}

/// One element side: 1-based global element index and 1-based side index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Side {
    pub element: usize,
    pub side: usize,
}

/// A named node set. `sides` is empty until the side search has run.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    pub tag: i32,
    pub name: String,
    pub nodes: Vec<usize>,
    pub sides: BTreeSet<Side>,
}

impl Boundary {
    pub fn new(tag: i32, name: impl Into<String>, nodes: Vec<usize>) -> Self {
        Boundary {
            tag,
            name: name.into(),
            nodes,
            sides: BTreeSet::new(),
        }
    }
}

/// Reader-independent mesh handed from the msh readers to the exodus writer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntermediateMesh {
    pub dim: usize,
    pub n_nodes: usize,
    pub n_elements: usize,
    /// Three components per node, also for 1D and 2D meshes
    pub coords: Vec<f64>,
    pub blocks: Vec<Block>,
    pub boundaries: Vec<Boundary>,
}

impl IntermediateMesh {
    pub fn n_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Number of boundaries that have at least one derived side.
    pub fn n_side_sets(&self) -> usize {
        self.boundaries.iter().filter(|b| !b.sides.is_empty()).count()
    }

    /// Global index of the first element of every block.
    pub fn block_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.blocks.len());
        let mut offset = 0;
        for block in &self.blocks {
            offsets.push(offset);
            offset += block.n_elements;
        }
        offsets
    }

    pub fn node_coordinates(&self, node: usize) -> Point3<f64> {
        Point3::new(
            self.coords[node * 3],
            self.coords[node * 3 + 1],
            self.coords[node * 3 + 2],
        )
    }

    /// Extracts one coordinate component (0 = x) of every node.
    pub fn coordinate_axis(&self, axis: usize) -> Vec<f64> {
        (0..self.n_nodes)
            .map(|node| self.node_coordinates(node)[axis])
            .collect()
    }

    /// Checks the cross-structure invariants every reader must uphold.
    ///
    /// # Returns
    /// A consistency error describing the first violation found
    pub fn validate(&self) -> Result<(), Msh2ExoError> {
        if self.blocks.is_empty() {
            return Err(Msh2ExoError::Consistency(
                "mesh has no element blocks".to_string(),
            ));
        }
        if self.coords.len() != self.n_nodes * 3 {
            return Err(Msh2ExoError::Consistency(format!(
                "{} coordinate values for {} nodes",
                self.coords.len(),
                self.n_nodes
            )));
        }

        let mut n_elements = 0;
        for block in &self.blocks {
            let expected = block.n_elements * block.element_type.n_nodes();
            if block.connectivity.len() != expected {
                return Err(Msh2ExoError::Consistency(format!(
                    "block {} has {} connectivity entries, expected {}",
                    block.name,
                    block.connectivity.len(),
                    expected
                )));
            }
            if let Some(node) = block.connectivity.iter().find(|&&n| n >= self.n_nodes) {
                return Err(Msh2ExoError::Consistency(format!(
                    "block {} references node index {} of {}",
                    block.name, node, self.n_nodes
                )));
            }
            n_elements += block.n_elements;
        }
        if n_elements != self.n_elements {
            return Err(Msh2ExoError::Consistency(format!(
                "blocks hold {} elements, mesh declares {}",
                n_elements, self.n_elements
            )));
        }

        for boundary in &self.boundaries {
            if let Some(node) = boundary.nodes.iter().find(|&&n| n >= self.n_nodes) {
                return Err(Msh2ExoError::Consistency(format!(
                    "boundary {} references node index {} of {}",
                    boundary.name, node, self.n_nodes
                )));
            }
            let unique: HashSet<&usize> = boundary.nodes.iter().collect();
            if unique.len() != boundary.nodes.len() {
                return Err(Msh2ExoError::Consistency(format!(
                    "boundary {} lists a node twice",
                    boundary.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_block_mesh() -> IntermediateMesh {
        IntermediateMesh {
            dim: 2,
            n_nodes: 5,
            n_elements: 3,
            coords: (0..15).map(|v| v as f64).collect(),
            blocks: vec![
                Block {
                    name: "quads".to_string(),
                    element_type: ElementType::Quad4,
                    n_elements: 1,
                    connectivity: vec![0, 1, 2, 3],
                },
                Block {
                    name: "tris".to_string(),
                    element_type: ElementType::Tri3,
                    n_elements: 2,
                    connectivity: vec![1, 4, 2, 2, 4, 3],
                },
            ],
            boundaries: vec![Boundary::new(7, "left", vec![0, 3])],
        }
    }

    #[test]
    fn offsets_and_element_nodes() {
        let mesh = two_block_mesh();
        assert_eq!(mesh.block_offsets(), vec![0, 1]);
        assert_eq!(mesh.blocks[1].element_nodes(1), &[2, 4, 3]);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn coordinates_keep_three_components() {
        let mesh = two_block_mesh();
        assert_eq!(mesh.node_coordinates(1), Point3::new(3.0, 4.0, 5.0));
        assert_eq!(mesh.coordinate_axis(2), vec![2.0, 5.0, 8.0, 11.0, 14.0]);
    }

    #[test]
    fn out_of_range_boundary_node_is_rejected() {
        let mut mesh = two_block_mesh();
        mesh.boundaries[0].nodes.push(9);
        assert!(matches!(
            mesh.validate(),
            Err(Msh2ExoError::Consistency(_))
        ));
    }

    #[test]
    fn element_count_must_match_blocks() {
        let mut mesh = two_block_mesh();
        mesh.n_elements = 4;
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn side_set_count_skips_empty_boundaries() {
        let mut mesh = two_block_mesh();
        mesh.boundaries.push(Boundary::new(8, "right", vec![1]));
        mesh.boundaries[0].sides.insert(Side { element: 1, side: 4 });
        assert_eq!(mesh.n_side_sets(), 1);
    }
}
