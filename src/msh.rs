//! Gmsh MSH 4.1 ASCII files, section by section.
//!
//! The structures here keep the file's own tags. Turning tags into dense
//! indices is the job of the readers in [`crate::reader`].

use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
    str::{FromStr, SplitWhitespace},
};

use nalgebra::Point3;

use crate::{catalog::ElementType, error::Msh2ExoError};

/// Gmsh element type codes understood by the readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GmshElementType {
    Line2 = 1,
    Tri3 = 2,
    Quad4 = 3,
    Tet4 = 4,
    Hex8 = 5,
    Line3 = 8,
    Tri6 = 9,
    Quad9 = 10,
    Tet10 = 11,
    Hex27 = 12,
    Point1 = 15,
    Quad8 = 16,
}

impl TryFrom<i32> for GmshElementType {
    type Error = Msh2ExoError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(GmshElementType::Line2),
            2 => Ok(GmshElementType::Tri3),
            3 => Ok(GmshElementType::Quad4),
            4 => Ok(GmshElementType::Tet4),
            5 => Ok(GmshElementType::Hex8),
            8 => Ok(GmshElementType::Line3),
            9 => Ok(GmshElementType::Tri6),
            10 => Ok(GmshElementType::Quad9),
            11 => Ok(GmshElementType::Tet10),
            12 => Ok(GmshElementType::Hex27),
            15 => Ok(GmshElementType::Point1),
            16 => Ok(GmshElementType::Quad8),
            _ => Err(Msh2ExoError::Format(format!(
                "gmsh element type {value} is not supported"
            ))),
        }
    }
}

impl GmshElementType {
    pub fn n_nodes(self) -> usize {
        match self.element_type() {
            Some(element_type) => element_type.n_nodes(),
            None => 1,
        }
    }

    /// The block topology for this code; points never form blocks.
    pub fn element_type(self) -> Option<ElementType> {
        match self {
            GmshElementType::Line2 => Some(ElementType::Line2),
            GmshElementType::Tri3 => Some(ElementType::Tri3),
            GmshElementType::Quad4 => Some(ElementType::Quad4),
            GmshElementType::Tet4 => Some(ElementType::Tet4),
            GmshElementType::Hex8 => Some(ElementType::Hex8),
            GmshElementType::Line3 => Some(ElementType::Line3),
            GmshElementType::Tri6 => Some(ElementType::Tri6),
            GmshElementType::Quad9 => Some(ElementType::Quad9),
            GmshElementType::Tet10 => Some(ElementType::Tet10),
            GmshElementType::Hex27 => Some(ElementType::Hex27),
            GmshElementType::Quad8 => Some(ElementType::Quad8),
            GmshElementType::Point1 => None,
        }
    }

    /// Position of each ExodusII local node in the gmsh node list, for the
    /// types whose orderings differ.
    pub fn exodus_node_order(self) -> Option<&'static [usize]> {
        match self {
            GmshElementType::Tet10 => Some(&[0, 1, 2, 3, 4, 5, 6, 7, 9, 8]),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshFormat {
    pub version: String,
    pub file_type: i32,
    pub data_size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalGroup {
    pub dim: i32,
    pub tag: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub dim: i32,
    pub tag: i32,
    pub physical_tags: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeBlock {
    pub entity_dim: i32,
    pub entity_tag: i32,
    pub tags: Vec<usize>,
    pub coords: Vec<Point3<f64>>,
}

/// One entity block of the `$Elements` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementGroup {
    pub dim: i32,
    pub entity_tag: i32,
    pub element_type: GmshElementType,
    pub element_tags: Vec<usize>,
    /// `element_tags.len() * element_type.n_nodes()` node tags
    pub node_tags: Vec<usize>,
}

/// The sections of an msh file the converter needs.
#[derive(Debug, Clone, PartialEq)]
pub struct MshFile {
    pub format: MeshFormat,
    pub physical_groups: Vec<PhysicalGroup>,
    pub entities: Vec<Entity>,
    pub node_blocks: Vec<NodeBlock>,
    pub element_groups: Vec<ElementGroup>,
}

impl MshFile {
    /// Largest physical group dimension, which decides blocks vs boundaries.
    pub fn max_dim(&self) -> Option<i32> {
        self.physical_groups.iter().map(|p| p.dim).max()
    }

    /// Maps `(dim, physical tag)` to the tags of the entities in that group.
    pub fn physical_entities(&self) -> BTreeMap<(i32, i32), BTreeSet<i32>> {
        let mut phys_ents: BTreeMap<(i32, i32), BTreeSet<i32>> = BTreeMap::new();
        for entity in &self.entities {
            for &phys_tag in &entity.physical_tags {
                phys_ents
                    .entry((entity.dim, phys_tag))
                    .or_default()
                    .insert(entity.tag);
            }
        }
        phys_ents
    }

    /// Element groups of dimension `dim` owned by any of `entity_tags`, in
    /// file order.
    pub fn element_groups_in<'a>(
        &'a self,
        dim: i32,
        entity_tags: &'a BTreeSet<i32>,
    ) -> impl Iterator<Item = &'a ElementGroup> + 'a {
        self.element_groups
            .iter()
            .filter(move |group| group.dim == dim && entity_tags.contains(&group.entity_tag))
    }

    pub fn n_nodes(&self) -> usize {
        self.node_blocks.iter().map(|b| b.tags.len()).sum()
    }
}

#[derive(Clone, Copy)]
enum MeshParseState<'a> {
    Limbo,
    Section { name: &'a str, body_start: usize },
}

struct Section<'a> {
    name: &'a str,
    body: &'a str,
}

/// Splits the file into `$Name ... $EndName` sections.
fn split_sections(contents: &str) -> Result<Vec<Section<'_>>, Msh2ExoError> {
    let mut sections = Vec::new();
    let mut parser_state = MeshParseState::Limbo;
    let mut offset = 0;

    for raw_line in contents.split_inclusive('\n') {
        let line_start = offset;
        offset += raw_line.len();
        let line = raw_line.trim();

        match parser_state {
            MeshParseState::Limbo => {
                if let Some(name) = line.strip_prefix('$') {
                    parser_state = MeshParseState::Section {
                        name,
                        body_start: offset,
                    };
                }
            }
            MeshParseState::Section { name, body_start } => {
                if line.strip_prefix("$End") == Some(name) {
                    sections.push(Section {
                        name,
                        body: &contents[body_start..line_start],
                    });
                    parser_state = MeshParseState::Limbo;
                }
            }
        }
    }

    if let MeshParseState::Section { name, .. } = parser_state {
        return Err(Msh2ExoError::Format(format!(
            "section ${name} is missing its $End{name} marker"
        )));
    }

    Ok(sections)
}

/// Whitespace separated values of one section body.
struct Tokens<'a> {
    section: &'a str,
    inner: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(section: &Section<'a>) -> Self {
        Tokens {
            section: section.name,
            inner: section.body.split_whitespace(),
        }
    }

    fn next_value<T: FromStr>(&mut self, what: &str) -> Result<T, Msh2ExoError> {
        let token = self.inner.next().ok_or_else(|| {
            Msh2ExoError::Format(format!(
                "${}: section ended while reading {what}",
                self.section
            ))
        })?;
        token.parse().map_err(|_| {
            Msh2ExoError::Format(format!(
                "${}: expected {what}, found '{token}'",
                self.section
            ))
        })
    }

    fn skip(&mut self, count: usize, what: &str) -> Result<(), Msh2ExoError> {
        for _ in 0..count {
            self.next_value::<f64>(what)?;
        }
        Ok(())
    }
}

/// Versions are compared as decimals, so 4.05 is older than 4.1.
const MIN_VERSION_EXCLUSIVE: f64 = 4.09;

fn parse_mesh_format(section: &Section) -> Result<MeshFormat, Msh2ExoError> {
    let mut tokens = Tokens::new(section);
    let version: String = tokens.next_value("format version")?;
    let file_type: i32 = tokens.next_value("file type")?;
    let data_size: usize = tokens.next_value("data size")?;

    let numeric: f64 = version.parse().map_err(|_| {
        Msh2ExoError::Format(format!("Unreadable Gmsh file version {version}"))
    })?;
    if numeric <= MIN_VERSION_EXCLUSIVE {
        return Err(Msh2ExoError::Format(format!(
            "Expected Gmsh file version >= 4.1, found {version}"
        )));
    }
    if file_type != 0 {
        return Err(Msh2ExoError::Format(
            "Expected ASCII Gmsh msh file, binary msh files are not supported".to_string(),
        ));
    }

    Ok(MeshFormat {
        version,
        file_type,
        data_size,
    })
}

/// Reads `$PhysicalNames`. Names are quoted and may contain spaces, so this
/// section is parsed line by line.
fn parse_physical_names(section: &Section) -> Result<Vec<PhysicalGroup>, Msh2ExoError> {
    let bad_line = |line: &str| {
        Msh2ExoError::Format(format!("$PhysicalNames: malformed line '{line}'"))
    };

    let mut lines = section.body.lines().map(str::trim).filter(|l| !l.is_empty());
    let n_names: usize = match lines.next() {
        Some(line) => line.parse().map_err(|_| bad_line(line))?,
        None => 0,
    };

    let mut phys_names = Vec::with_capacity(n_names);
    for line in lines.by_ref().take(n_names) {
        let (dim, rest) = line.split_once(char::is_whitespace).ok_or_else(|| bad_line(line))?;
        let (tag, name) = rest
            .trim_start()
            .split_once(char::is_whitespace)
            .ok_or_else(|| bad_line(line))?;
        let name = name.trim();
        let name = name
            .strip_prefix('"')
            .and_then(|n| n.strip_suffix('"'))
            .unwrap_or(name);

        phys_names.push(PhysicalGroup {
            dim: dim.parse().map_err(|_| bad_line(line))?,
            tag: tag.parse().map_err(|_| bad_line(line))?,
            name: name.to_string(),
        });
    }

    if phys_names.len() != n_names {
        return Err(Msh2ExoError::Format(format!(
            "$PhysicalNames: declares {} names but lists {}",
            n_names,
            phys_names.len()
        )));
    }

    Ok(phys_names)
}

fn parse_entities(section: &Section) -> Result<Vec<Entity>, Msh2ExoError> {
    let mut tokens = Tokens::new(section);
    let mut counts = [0usize; 4];
    for (dim, count) in counts.iter_mut().enumerate() {
        *count = tokens.next_value(&format!("number of dimension {dim} entities"))?;
    }

    let mut entities = Vec::with_capacity(counts.iter().sum());
    for (dim, &count) in counts.iter().enumerate() {
        for _ in 0..count {
            let tag: i32 = tokens.next_value("entity tag")?;
            // points carry a location, everything else a bounding box
            let n_coords = if dim == 0 { 3 } else { 6 };
            tokens.skip(n_coords, "entity coordinate")?;

            let n_physical_tags: usize = tokens.next_value("number of physical tags")?;
            let mut physical_tags = Vec::with_capacity(n_physical_tags);
            for _ in 0..n_physical_tags {
                physical_tags.push(tokens.next_value("physical tag")?);
            }

            if dim > 0 {
                let n_bound: usize = tokens.next_value("number of bounding entities")?;
                tokens.skip(n_bound, "bounding entity tag")?;
            }

            entities.push(Entity {
                dim: dim as i32,
                tag,
                physical_tags,
            });
        }
    }

    Ok(entities)
}

fn parse_nodes(section: &Section) -> Result<Vec<NodeBlock>, Msh2ExoError> {
    let mut tokens = Tokens::new(section);
    let n_entity_blocks: usize = tokens.next_value("number of node blocks")?;
    let n_nodes: usize = tokens.next_value("number of nodes")?;
    let _min_node_tag: usize = tokens.next_value("minimum node tag")?;
    let _max_node_tag: usize = tokens.next_value("maximum node tag")?;

    let mut node_blocks = Vec::with_capacity(n_entity_blocks);
    for _ in 0..n_entity_blocks {
        let entity_dim: i32 = tokens.next_value("entity dimension")?;
        let entity_tag: i32 = tokens.next_value("entity tag")?;
        let parametric: i32 = tokens.next_value("parametric flag")?;
        let n_nodes_in_block: usize = tokens.next_value("number of nodes in block")?;

        let mut tags = Vec::with_capacity(n_nodes_in_block);
        for _ in 0..n_nodes_in_block {
            tags.push(tokens.next_value("node tag")?);
        }

        let mut coords = Vec::with_capacity(n_nodes_in_block);
        for _ in 0..n_nodes_in_block {
            let x = tokens.next_value("node coordinate")?;
            let y = tokens.next_value("node coordinate")?;
            let z = tokens.next_value("node coordinate")?;
            coords.push(Point3::new(x, y, z));
            if parametric != 0 {
                tokens.skip(entity_dim.max(0) as usize, "parametric coordinate")?;
            }
        }

        node_blocks.push(NodeBlock {
            entity_dim,
            entity_tag,
            tags,
            coords,
        });
    }

    let found: usize = node_blocks.iter().map(|b| b.tags.len()).sum();
    if found != n_nodes {
        return Err(Msh2ExoError::Format(format!(
            "$Nodes: declares {n_nodes} nodes but lists {found}"
        )));
    }

    Ok(node_blocks)
}

fn parse_elements(section: &Section) -> Result<Vec<ElementGroup>, Msh2ExoError> {
    let mut tokens = Tokens::new(section);
    let n_entity_blocks: usize = tokens.next_value("number of element blocks")?;
    let n_elements: usize = tokens.next_value("number of elements")?;
    let _min_element_tag: usize = tokens.next_value("minimum element tag")?;
    let _max_element_tag: usize = tokens.next_value("maximum element tag")?;

    let mut element_groups = Vec::with_capacity(n_entity_blocks);
    for _ in 0..n_entity_blocks {
        let dim: i32 = tokens.next_value("entity dimension")?;
        let entity_tag: i32 = tokens.next_value("entity tag")?;
        let type_code: i32 = tokens.next_value("element type")?;
        let n_elements_in_block: usize = tokens.next_value("number of elements in block")?;

        let element_type = GmshElementType::try_from(type_code).map_err(|_| {
            Msh2ExoError::Format(format!(
                "$Elements: entity {entity_tag} (dimension {dim}) uses gmsh element type \
                 {type_code}, which is not supported"
            ))
        })?;
        let n_nodes = element_type.n_nodes();

        let mut element_tags = Vec::with_capacity(n_elements_in_block);
        let mut node_tags = Vec::with_capacity(n_elements_in_block * n_nodes);
        for _ in 0..n_elements_in_block {
            element_tags.push(tokens.next_value("element tag")?);
            for _ in 0..n_nodes {
                node_tags.push(tokens.next_value("element node tag")?);
            }
        }

        element_groups.push(ElementGroup {
            dim,
            entity_tag,
            element_type,
            element_tags,
            node_tags,
        });
    }

    let found: usize = element_groups.iter().map(|g| g.element_tags.len()).sum();
    if found != n_elements {
        return Err(Msh2ExoError::Format(format!(
            "$Elements: declares {n_elements} elements but lists {found}"
        )));
    }

    Ok(element_groups)
}

/// Finds and checks `$MeshFormat` without looking at the rest of the file.
fn scan_mesh_format(contents: &str) -> Result<MeshFormat, Msh2ExoError> {
    let mut lines = contents.lines().map(str::trim);
    if !lines.by_ref().any(|line| line == "$MeshFormat") {
        return Err(Msh2ExoError::Format(
            "section $MeshFormat not found".to_string(),
        ));
    }
    let header = lines.next().unwrap_or_default();
    parse_mesh_format(&Section {
        name: "MeshFormat",
        body: header,
    })
}

/// Parses the contents of an msh file.
///
/// # Arguments
/// * `contents` - The full text of the file
///
/// # Returns
/// The raw sections, still keyed by gmsh tags
pub fn parse_msh(contents: &str) -> Result<MshFile, Msh2ExoError> {
    let format = scan_mesh_format(contents)?;

    let mut physical_groups = None;
    let mut entities = None;
    let mut node_blocks = None;
    let mut element_groups = None;

    for section in split_sections(contents)? {
        match section.name {
            "PhysicalNames" => physical_groups = Some(parse_physical_names(&section)?),
            "Entities" => entities = Some(parse_entities(&section)?),
            "Nodes" => node_blocks = Some(parse_nodes(&section)?),
            "Elements" => element_groups = Some(parse_elements(&section)?),
            "MeshFormat" => {}
            other => tracing::debug!("skipping section ${other}"),
        }
    }

    let missing = |name: &str| Msh2ExoError::Format(format!("section ${name} not found"));

    Ok(MshFile {
        format,
        physical_groups: physical_groups.ok_or_else(|| missing("PhysicalNames"))?,
        entities: entities.ok_or_else(|| missing("Entities"))?,
        node_blocks: node_blocks.ok_or_else(|| missing("Nodes"))?,
        element_groups: element_groups.ok_or_else(|| missing("Elements"))?,
    })
}

/// Reads and parses an msh file from disk.
pub fn read_msh_file(path: &Path) -> Result<MshFile, Msh2ExoError> {
    let bytes = std::fs::read(path).map_err(|err| {
        Msh2ExoError::Input(format!("Unable to open mesh file {}: {err}", path.display()))
    })?;

    match std::str::from_utf8(&bytes) {
        Ok(contents) => parse_msh(contents),
        Err(_) => {
            // binary files still start with a text header; report that first
            scan_mesh_format(&String::from_utf8_lossy(&bytes))?;
            Err(Msh2ExoError::Format(format!(
                "{} is not an ASCII msh file",
                path.display()
            )))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// One unit hexahedron (volume 1, physical "block" 10). Surface 1 is the
    /// bottom quad (physical "bottom" 1), surface 2 a triangle on three of the
    /// four top nodes (physical "top_partial" 2).
    pub(crate) const SINGLE_HEX: &str = "$MeshFormat
4.1 0 8
$EndMeshFormat
$PhysicalNames
3
2 1 \"bottom\"
2 2 \"top_partial\"
3 10 \"block\"
$EndPhysicalNames
$Entities
0 0 2 1
1 0 0 0 1 1 0 1 1 0
2 0 0 1 1 1 1 1 2 0
1 0 0 0 1 1 1 1 10 2 1 -2
$EndEntities
$Nodes
1 8 1 8
3 1 0 8
1
2
3
4
5
6
7
8
0 0 0
1 0 0
1 1 0
0 1 0
0 0 1
1 0 1
1 1 1
0 1 1
$EndNodes
$Elements
3 3 1 3
2 1 3 1
1 1 2 3 4
2 2 2 1
2 5 6 7
3 1 5 1
3 1 2 3 4 5 6 7 8
$EndElements
";

    #[test]
    fn reads_all_sections() {
        let msh = parse_msh(SINGLE_HEX).unwrap();
        assert_eq!(msh.format.version, "4.1");
        assert_eq!(msh.physical_groups.len(), 3);
        assert_eq!(msh.physical_groups[0].name, "bottom");
        assert_eq!(msh.entities.len(), 3);
        assert_eq!(msh.entities[2].dim, 3);
        assert_eq!(msh.entities[2].physical_tags, vec![10]);
        assert_eq!(msh.n_nodes(), 8);
        assert_eq!(msh.node_blocks[0].coords[6], Point3::new(1.0, 1.0, 1.0));
        assert_eq!(msh.element_groups.len(), 3);
        assert_eq!(msh.element_groups[2].element_type, GmshElementType::Hex8);
        assert_eq!(msh.element_groups[2].node_tags, (1..=8).collect::<Vec<usize>>());
        assert_eq!(msh.max_dim(), Some(3));
    }

    #[test]
    fn physical_entities_are_keyed_by_dimension() {
        let msh = parse_msh(SINGLE_HEX).unwrap();
        let phys_ents = msh.physical_entities();
        assert_eq!(phys_ents[&(2, 1)], BTreeSet::from([1]));
        assert_eq!(phys_ents[&(2, 2)], BTreeSet::from([2]));
        assert_eq!(phys_ents[&(3, 10)], BTreeSet::from([1]));
        assert!(!phys_ents.contains_key(&(3, 1)));
    }

    #[test]
    fn rejects_old_versions() {
        let contents = SINGLE_HEX.replacen("4.1 0 8", "4 0 8", 1);
        match parse_msh(&contents) {
            Err(Msh2ExoError::Format(msg)) => assert!(msg.contains("4.1")),
            other => panic!("expected format error, got {other:?}"),
        }
        let contents = SINGLE_HEX.replacen("4.1 0 8", "2.2 0 8", 1);
        assert!(parse_msh(&contents).is_err());
    }

    #[test]
    fn accepts_newer_minor_versions() {
        for version in ["4.10", "4.2", "5"] {
            let contents = SINGLE_HEX.replacen("4.1 0 8", &format!("{version} 0 8"), 1);
            assert!(parse_msh(&contents).is_ok(), "version {version}");
        }
    }

    #[test]
    fn versions_compare_as_decimals() {
        for version in ["4.05", "4.09", "4.0"] {
            let contents = SINGLE_HEX.replacen("4.1 0 8", &format!("{version} 0 8"), 1);
            assert!(
                matches!(parse_msh(&contents), Err(Msh2ExoError::Format(_))),
                "version {version}"
            );
        }
        let contents = SINGLE_HEX.replacen("4.1 0 8", "four 0 8", 1);
        assert!(matches!(parse_msh(&contents), Err(Msh2ExoError::Format(_))));
    }

    #[test]
    fn rejects_binary_encoding() {
        let contents = SINGLE_HEX.replacen("4.1 0 8", "4.1 1 8", 1);
        match parse_msh(&contents) {
            Err(Msh2ExoError::Format(msg)) => assert!(msg.contains("binary")),
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn missing_sections_are_reported() {
        let contents = SINGLE_HEX.replace("$PhysicalNames", "$Junk").replace("$EndPhysicalNames", "$EndJunk");
        match parse_msh(&contents) {
            Err(Msh2ExoError::Format(msg)) => assert!(msg.contains("$PhysicalNames")),
            other => panic!("expected format error, got {other:?}"),
        }

        let contents = SINGLE_HEX.replace("$EndNodes\n", "");
        match parse_msh(&contents) {
            Err(Msh2ExoError::Format(msg)) => assert!(msg.contains("$EndNodes")),
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_element_type_is_a_format_error() {
        let contents = SINGLE_HEX.replacen("3 1 5 1", "3 1 17 1", 1);
        match parse_msh(&contents) {
            Err(Msh2ExoError::Format(msg)) => assert!(msg.contains("17")),
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn truncated_node_section_is_a_format_error() {
        let contents = SINGLE_HEX.replacen("0 1 1\n$EndNodes", "0 1\n$EndNodes", 1);
        assert!(matches!(parse_msh(&contents), Err(Msh2ExoError::Format(_))));
    }

    #[test]
    fn names_with_spaces_and_skipped_sections() {
        let contents = SINGLE_HEX
            .replacen("\"top_partial\"", "\"top part\"", 1)
            .replacen("$Nodes", "$Comments\nanything $Nodes goes\n$EndComments\n$Nodes", 1);
        let msh = parse_msh(&contents).unwrap();
        assert_eq!(msh.physical_groups[1].name, "top part");
        assert_eq!(msh.n_nodes(), 8);
    }

    #[test]
    fn parametric_coordinates_are_skipped() {
        let contents = "$MeshFormat
4.1 0 8
$EndMeshFormat
$PhysicalNames
1
1 1 \"edge\"
$EndPhysicalNames
$Entities
0 1 0 0
4 0 0 0 1 0 0 1 1 0
$EndEntities
$Nodes
1 2 5 6
1 4 1 2
5
6
0 0 0 0.0
1 0 0 1.0
$EndNodes
$Elements
1 1 1 1
1 4 1 1
1 5 6
$EndElements
";
        let msh = parse_msh(contents).unwrap();
        assert_eq!(msh.node_blocks[0].coords[1], Point3::new(1.0, 0.0, 0.0));
        assert_eq!(msh.element_groups[0].node_tags, vec![5, 6]);
    }

    #[test]
    fn binary_file_reports_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binary.msh");
        let mut bytes = b"$MeshFormat\n4.1 1 8\n".to_vec();
        bytes.extend_from_slice(&[1, 0, 0, 0, 0xff, 0xfe]);
        bytes.extend_from_slice(b"\n$EndMeshFormat\n");
        std::fs::write(&path, bytes).unwrap();

        match read_msh_file(&path) {
            Err(Msh2ExoError::Format(msg)) => assert!(msg.contains("binary")),
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_msh_file(&dir.path().join("nope.msh"));
        assert!(matches!(result, Err(Msh2ExoError::Input(_))));
    }
}
