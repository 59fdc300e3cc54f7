//! Element topologies and their side tables.
//!
//! Side numbering follows the ExodusII convention: side `i` of an element is
//! `local_side_order[i - 1]`, listed as indices into the element's own
//! connectivity.

use std::fmt::Display;

use crate::error::Msh2ExoError;

/// Element topologies a block may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Line2,
    Line3,
    Tri3,
    Tri6,
    Quad4,
    Quad8,
    Quad9,
    Tet4,
    Tet10,
    Hex8,
    Hex27,
}

/// Topology of one element type.
#[derive(Debug)]
pub struct ElementInfo {
    pub n_nodes: usize,
    pub local_side_order: &'static [&'static [usize]],
}

impl ElementInfo {
    pub fn n_sides(&self) -> usize {
        self.local_side_order.len()
    }
}

static LINE2: ElementInfo = ElementInfo {
    n_nodes: 2,
    local_side_order: &[&[0], &[1]],
};

static LINE3: ElementInfo = ElementInfo {
    n_nodes: 3,
    local_side_order: &[&[0], &[1]],
};

static TRI3: ElementInfo = ElementInfo {
    n_nodes: 3,
    local_side_order: &[&[0, 1], &[1, 2], &[2, 0]],
};

static TRI6: ElementInfo = ElementInfo {
    n_nodes: 6,
    local_side_order: &[&[0, 3, 1], &[1, 4, 2], &[2, 5, 0]],
};

static QUAD4: ElementInfo = ElementInfo {
    n_nodes: 4,
    local_side_order: &[&[0, 1], &[1, 2], &[2, 3], &[3, 0]],
};

static QUAD8: ElementInfo = ElementInfo {
    n_nodes: 8,
    local_side_order: &[&[0, 4, 1], &[1, 5, 2], &[2, 6, 3], &[3, 7, 0]],
};

// the center node never lies on a side
static QUAD9: ElementInfo = ElementInfo {
    n_nodes: 9,
    local_side_order: &[&[0, 4, 1], &[1, 5, 2], &[2, 6, 3], &[3, 7, 0]],
};

static TET4: ElementInfo = ElementInfo {
    n_nodes: 4,
    local_side_order: &[&[0, 1, 3], &[1, 2, 3], &[0, 3, 2], &[0, 2, 1]],
};

static TET10: ElementInfo = ElementInfo {
    n_nodes: 10,
    local_side_order: &[
        &[0, 1, 3, 4, 8, 7],
        &[1, 2, 3, 5, 9, 8],
        &[0, 3, 2, 7, 9, 6],
        &[0, 2, 1, 6, 5, 4],
    ],
};

static HEX8: ElementInfo = ElementInfo {
    n_nodes: 8,
    local_side_order: &[
        &[0, 1, 5, 4],
        &[1, 2, 6, 5],
        &[2, 3, 7, 6],
        &[0, 4, 7, 3],
        &[0, 3, 2, 1],
        &[4, 5, 6, 7],
    ],
};

impl ElementType {
    /// Number of nodes per element. Known for every type, including those
    /// without a side table.
    pub fn n_nodes(self) -> usize {
        match self {
            ElementType::Line2 => 2,
            ElementType::Line3 => 3,
            ElementType::Tri3 => 3,
            ElementType::Tri6 => 6,
            ElementType::Quad4 => 4,
            ElementType::Quad8 => 8,
            ElementType::Quad9 => 9,
            ElementType::Tet4 => 4,
            ElementType::Tet10 => 10,
            ElementType::Hex8 => 8,
            ElementType::Hex27 => 27,
        }
    }

    /// Topology name in the ExodusII vocabulary.
    pub fn exodus_name(self) -> &'static str {
        match self {
            ElementType::Line2 => "BAR2",
            ElementType::Line3 => "BAR3",
            ElementType::Tri3 => "TRI3",
            ElementType::Tri6 => "TRI6",
            ElementType::Quad4 => "QUAD4",
            ElementType::Quad8 => "QUAD8",
            ElementType::Quad9 => "QUAD9",
            ElementType::Tet4 => "TETRA4",
            ElementType::Tet10 => "TETRA10",
            ElementType::Hex8 => "HEX8",
            ElementType::Hex27 => "HEX27",
        }
    }

    /// Looks up the side table for this type.
    ///
    /// # Returns
    /// The static [`ElementInfo`], or an unsupported-feature error for types
    /// that can be read but not converted.
    pub fn info(self) -> Result<&'static ElementInfo, Msh2ExoError> {
        match self {
            ElementType::Line2 => Ok(&LINE2),
            ElementType::Line3 => Ok(&LINE3),
            ElementType::Tri3 => Ok(&TRI3),
            ElementType::Tri6 => Ok(&TRI6),
            ElementType::Quad4 => Ok(&QUAD4),
            ElementType::Quad8 => Ok(&QUAD8),
            ElementType::Quad9 => Ok(&QUAD9),
            ElementType::Tet4 => Ok(&TET4),
            ElementType::Tet10 => Ok(&TET10),
            ElementType::Hex8 => Ok(&HEX8),
            ElementType::Hex27 => Err(Msh2ExoError::Unsupported(format!(
                "element type {} has no side table",
                self.exodus_name()
            ))),
        }
    }
}

impl Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.exodus_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ElementType; 11] = [
        ElementType::Line2,
        ElementType::Line3,
        ElementType::Tri3,
        ElementType::Tri6,
        ElementType::Quad4,
        ElementType::Quad8,
        ElementType::Quad9,
        ElementType::Tet4,
        ElementType::Tet10,
        ElementType::Hex8,
        ElementType::Hex27,
    ];

    #[test]
    fn side_tables_reference_valid_local_nodes() {
        for element_type in ALL {
            let Ok(info) = element_type.info() else {
                continue;
            };
            assert_eq!(info.n_nodes, element_type.n_nodes());
            for side in info.local_side_order {
                assert!(side.iter().all(|&n| n < info.n_nodes), "{element_type}");
            }
        }
    }

    #[test]
    fn side_counts() {
        assert_eq!(ElementType::Line2.info().unwrap().n_sides(), 2);
        assert_eq!(ElementType::Tri6.info().unwrap().n_sides(), 3);
        assert_eq!(ElementType::Quad9.info().unwrap().n_sides(), 4);
        assert_eq!(ElementType::Tet10.info().unwrap().n_sides(), 4);
        assert_eq!(ElementType::Hex8.info().unwrap().n_sides(), 6);
    }

    #[test]
    fn hex_sides_cover_each_corner_three_times() {
        let info = ElementType::Hex8.info().unwrap();
        let mut counts = [0; 8];
        for side in info.local_side_order {
            assert_eq!(side.len(), 4);
            for &n in side.iter() {
                counts[n] += 1;
            }
        }
        assert_eq!(counts, [3; 8]);
    }

    #[test]
    fn hex27_is_rejected_at_lookup() {
        assert_eq!(ElementType::Hex27.n_nodes(), 27);
        match ElementType::Hex27.info() {
            Err(Msh2ExoError::Unsupported(msg)) => assert!(msg.contains("HEX27")),
            other => panic!("expected unsupported error, got {other:?}"),
        }
    }
}
