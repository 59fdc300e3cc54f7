//! ExodusII output.
//!
//! The mesh is first laid out as a netCDF-3 definition following the
//! ExodusII naming conventions, together with the data of every variable.
//! The file is then written to a temporary path next to the destination and
//! renamed into place.

use std::{collections::HashSet, path::Path};

use netcdf3::{DataSet, FileWriter, Version};
use tempfile::NamedTempFile;
use tracing::info;

use crate::{datatypes::IntermediateMesh, error::Msh2ExoError};

const LEN_STRING: usize = 33;
const LEN_LINE: usize = 81;
const LEN_NAME: usize = 256;
const MAX_NAME_LENGTH: usize = 32;
const API_VERSION: f32 = 8.03;
const COORDINATE_NAMES: [&str; 3] = ["x", "y", "z"];

#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub title: String,
    /// Overwrite an existing output file
    pub force: bool,
}

/// The provenance record stored in `qa_records`.
#[derive(Debug, Clone, PartialEq)]
pub struct QaRecord {
    pub code_name: String,
    pub code_version: String,
    pub date: String,
    pub time: String,
}

impl QaRecord {
    pub fn now() -> QaRecord {
        let now = chrono::Local::now();
        QaRecord {
            code_name: env!("CARGO_PKG_NAME").to_string(),
            code_version: env!("CARGO_PKG_VERSION").to_string(),
            date: now.format("%m/%d/%y").to_string(),
            time: now.format("%H:%M:%S").to_string(),
        }
    }
}

/// Values of one variable, written once the definition is complete.
#[derive(Debug, Clone, PartialEq)]
pub enum VarData {
    Int(Vec<i32>),
    Double(Vec<f64>),
    /// NC_CHAR, stored by netcdf3 as `u8`
    Char(Vec<u8>),
}

/// An ExodusII database ready to be written.
pub struct ExodusDataset {
    pub def: DataSet,
    data: Vec<(String, VarData)>,
}

fn netcdf_error(err: impl std::fmt::Debug) -> Msh2ExoError {
    Msh2ExoError::Writer(format!("netCDF: {err:?}"))
}

impl ExodusDataset {
    fn new() -> ExodusDataset {
        ExodusDataset {
            def: DataSet::new(),
            data: Vec::new(),
        }
    }

    /// Declares a count dimension. A zero size is not a valid fixed dimension.
    fn add_count_dim(&mut self, name: &str, len: usize) -> Result<(), Msh2ExoError> {
        if len == 0 {
            return Err(Msh2ExoError::Writer(format!(
                "dimension {name} would be empty"
            )));
        }
        self.def.add_fixed_dim(name, len).map_err(netcdf_error)
    }

    fn add_var(&mut self, name: &str, dims: &[&str], data: VarData) -> Result<(), Msh2ExoError> {
        match &data {
            VarData::Int(_) => self.def.add_var_i32(name, dims),
            VarData::Double(_) => self.def.add_var_f64(name, dims),
            VarData::Char(_) => self.def.add_var_u8(name, dims),
        }
        .map_err(netcdf_error)?;
        self.data.push((name.to_string(), data));
        Ok(())
    }

    /// Adds a `*_prop1` id variable with its `name = "ID"` attribute.
    fn add_ids(&mut self, var: &str, dim: &str, ids: Vec<i32>) -> Result<(), Msh2ExoError> {
        self.add_var(var, &[dim], VarData::Int(ids))?;
        self.def
            .add_var_attr_string(var, "name", "ID")
            .map_err(netcdf_error)
    }

    #[cfg(test)]
    pub fn var_data(&self, name: &str) -> Option<&VarData> {
        self.data.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    /// Writes the definition and all variables as a 64-bit offset file.
    fn write(&self, path: &Path) -> Result<(), Msh2ExoError> {
        let mut writer = FileWriter::open(path).map_err(netcdf_error)?;
        writer
            .set_def(&self.def, Version::Offset64Bit, 0)
            .map_err(netcdf_error)?;
        for (name, data) in &self.data {
            match data {
                VarData::Int(v) => writer.write_var_i32(name, v),
                VarData::Double(v) => writer.write_var_f64(name, v),
                VarData::Char(v) => writer.write_var_u8(name, v),
            }
            .map_err(netcdf_error)?;
        }
        writer.close().map_err(netcdf_error)?;
        Ok(())
    }
}

/// Longest prefix of `name` that fits `max` bytes without splitting a char.
fn truncate_name(name: &str, max: usize) -> &str {
    let mut end = name.len().min(max);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// Packs strings into fixed-width, NUL padded rows.
fn char_rows<'a>(names: impl IntoIterator<Item = &'a str>, max: usize, width: usize) -> VarData {
    let mut rows = Vec::new();
    for name in names {
        let name = truncate_name(name, max);
        rows.extend_from_slice(name.as_bytes());
        rows.resize(rows.len() + width - name.len(), 0);
    }
    VarData::Char(rows)
}

fn to_int(value: usize, what: &str) -> Result<i32, Msh2ExoError> {
    i32::try_from(value).map_err(|_| {
        Msh2ExoError::Writer(format!(
            "{what} {value} does not fit a 32-bit ExodusII integer"
        ))
    })
}

/// Shifts 0-based indices to 1-based 32-bit integers.
fn one_based<'a>(
    indices: impl IntoIterator<Item = &'a usize>,
    what: &str,
) -> Result<Vec<i32>, Msh2ExoError> {
    indices.into_iter().map(|&i| to_int(i + 1, what)).collect()
}

/// Lays out `mesh` as an ExodusII dataset.
///
/// Boundaries become node sets in order. Only boundaries with derived
/// sides also become side sets, keeping the boundary tag as set id.
///
/// # Arguments
/// * `mesh` - The mesh, with boundary sides already derived
/// * `title` - The database title
/// * `qa` - The provenance record
pub fn build_dataset(
    mesh: &IntermediateMesh,
    title: &str,
    qa: &QaRecord,
) -> Result<ExodusDataset, Msh2ExoError> {
    let mut seen_ids = HashSet::new();
    for boundary in &mesh.boundaries {
        if !seen_ids.insert(boundary.tag) {
            return Err(Msh2ExoError::Writer(format!(
                "two boundaries share id {} (second one is {})",
                boundary.tag, boundary.name
            )));
        }
    }

    let side_sets: Vec<_> = mesh
        .boundaries
        .iter()
        .filter(|b| !b.sides.is_empty())
        .collect();
    let n_node_sets = mesh.boundaries.len();
    let n_side_sets = mesh.n_side_sets();
    let n_dim = mesh.dim.min(COORDINATE_NAMES.len());

    info!(
        "Initializing exodus: dim {}, {} nodes, {} elements, {} blocks, {} node sets, {} side sets",
        n_dim,
        mesh.n_nodes,
        mesh.n_elements,
        mesh.n_blocks(),
        n_node_sets,
        n_side_sets
    );

    let mut ds = ExodusDataset::new();
    ds.add_count_dim("len_string", LEN_STRING)?;
    ds.add_count_dim("len_line", LEN_LINE)?;
    ds.add_count_dim("four", 4)?;
    ds.add_count_dim("len_name", LEN_NAME)?;
    ds.def
        .set_unlimited_dim("time_step", 0)
        .map_err(netcdf_error)?;
    ds.add_count_dim("num_dim", n_dim)?;
    ds.add_count_dim("num_nodes", mesh.n_nodes)?;
    ds.add_count_dim("num_elem", mesh.n_elements)?;
    ds.add_count_dim("num_el_blk", mesh.n_blocks())?;
    if n_node_sets > 0 {
        ds.add_count_dim("num_node_sets", n_node_sets)?;
    }
    if n_side_sets > 0 {
        ds.add_count_dim("num_side_sets", n_side_sets)?;
    }
    ds.add_count_dim("num_qa_rec", 1)?;

    // the title keeps its terminating NUL, as the ExodusII library stores it
    let title = format!("{}\0", truncate_name(title, LEN_LINE - 1));
    let attributes = [
        ds.def.add_global_attr_f32("api_version", vec![API_VERSION]),
        ds.def.add_global_attr_f32("version", vec![API_VERSION]),
        ds.def.add_global_attr_i32("floating_point_word_size", vec![8]),
        ds.def.add_global_attr_i32("file_size", vec![1]),
        ds.def.add_global_attr_i32("maximum_name_length", vec![MAX_NAME_LENGTH as i32]),
        ds.def.add_global_attr_i32("int64_status", vec![0]),
        ds.def.add_global_attr_string("title", title.as_str()),
    ];
    for result in attributes {
        result.map_err(netcdf_error)?;
    }

    ds.def
        .add_var_f64("time_whole", &["time_step"])
        .map_err(netcdf_error)?;

    // element blocks
    let n_blocks = mesh.n_blocks();
    ds.add_var("eb_status", &["num_el_blk"], VarData::Int(vec![1; n_blocks]))?;
    ds.add_ids(
        "eb_prop1",
        "num_el_blk",
        (1..=n_blocks)
            .map(|id| to_int(id, "block id"))
            .collect::<Result<Vec<_>, _>>()?,
    )?;
    ds.add_var(
        "eb_names",
        &["num_el_blk", "len_name"],
        char_rows(mesh.blocks.iter().map(|b| b.name.as_str()), MAX_NAME_LENGTH, LEN_NAME),
    )?;

    // node sets
    if n_node_sets > 0 {
        ds.add_var(
            "ns_status",
            &["num_node_sets"],
            VarData::Int(
                mesh.boundaries
                    .iter()
                    .map(|b| i32::from(!b.nodes.is_empty()))
                    .collect(),
            ),
        )?;
        ds.add_ids(
            "ns_prop1",
            "num_node_sets",
            mesh.boundaries.iter().map(|b| b.tag).collect(),
        )?;
        ds.add_var(
            "ns_names",
            &["num_node_sets", "len_name"],
            char_rows(mesh.boundaries.iter().map(|b| b.name.as_str()), MAX_NAME_LENGTH, LEN_NAME),
        )?;
    }

    // side sets
    if n_side_sets > 0 {
        ds.add_var("ss_status", &["num_side_sets"], VarData::Int(vec![1; n_side_sets]))?;
        ds.add_ids(
            "ss_prop1",
            "num_side_sets",
            side_sets.iter().map(|b| b.tag).collect(),
        )?;
        ds.add_var(
            "ss_names",
            &["num_side_sets", "len_name"],
            char_rows(side_sets.iter().map(|b| b.name.as_str()), MAX_NAME_LENGTH, LEN_NAME),
        )?;
    }

    info!("Inserting coordinates of {} nodes", mesh.n_nodes);
    for (axis, name) in COORDINATE_NAMES.iter().enumerate().take(n_dim) {
        ds.add_var(
            &format!("coord{name}"),
            &["num_nodes"],
            VarData::Double(mesh.coordinate_axis(axis)),
        )?;
    }
    ds.add_var(
        "coor_names",
        &["num_dim", "len_name"],
        char_rows(COORDINATE_NAMES[..n_dim].iter().copied(), MAX_NAME_LENGTH, LEN_NAME),
    )?;

    ds.add_var(
        "qa_records",
        &["num_qa_rec", "four", "len_string"],
        char_rows(
            [
                qa.code_name.as_str(),
                qa.code_version.as_str(),
                qa.date.as_str(),
                qa.time.as_str(),
            ],
            LEN_STRING - 1,
            LEN_STRING,
        ),
    )?;

    for (i, block) in mesh.blocks.iter().enumerate() {
        let id = i + 1;
        let info = block.element_type.info()?;
        let elems_dim = format!("num_el_in_blk{id}");
        let nodes_dim = format!("num_nod_per_el{id}");
        ds.add_count_dim(&elems_dim, block.n_elements)?;
        ds.add_count_dim(&nodes_dim, info.n_nodes)?;

        let connect = format!("connect{id}");
        ds.add_var(
            &connect,
            &[elems_dim.as_str(), nodes_dim.as_str()],
            VarData::Int(one_based(&block.connectivity, "node index")?),
        )?;
        ds.def
            .add_var_attr_string(connect.as_str(), "elem_type", block.element_type.exodus_name())
            .map_err(netcdf_error)?;
        info!(
            "BLOCK {} (id {}): type {}, n_elements {}, n_nodes_per_elem {}",
            block.name,
            id,
            block.element_type.exodus_name(),
            block.n_elements,
            info.n_nodes
        );
    }

    for (i, boundary) in mesh.boundaries.iter().enumerate() {
        info!(
            "NS {} (id {}): {} nodes",
            boundary.name,
            boundary.tag,
            boundary.nodes.len()
        );
        if boundary.nodes.is_empty() {
            continue;
        }
        let dim = format!("num_nod_ns{}", i + 1);
        ds.add_count_dim(&dim, boundary.nodes.len())?;
        ds.add_var(
            &format!("node_ns{}", i + 1),
            &[dim.as_str()],
            VarData::Int(one_based(&boundary.nodes, "node index")?),
        )?;
    }

    for (i, boundary) in side_sets.iter().enumerate() {
        info!(
            "SS {} (id {}): {} sides",
            boundary.name,
            boundary.tag,
            boundary.sides.len()
        );
        let dim = format!("num_side_ss{}", i + 1);
        ds.add_count_dim(&dim, boundary.sides.len())?;
        let elems = boundary
            .sides
            .iter()
            .map(|s| to_int(s.element, "element index"))
            .collect::<Result<Vec<_>, _>>()?;
        let sides = boundary
            .sides
            .iter()
            .map(|s| to_int(s.side, "side index"))
            .collect::<Result<Vec<_>, _>>()?;
        ds.add_var(&format!("elem_ss{}", i + 1), &[dim.as_str()], VarData::Int(elems))?;
        ds.add_var(&format!("side_ss{}", i + 1), &[dim.as_str()], VarData::Int(sides))?;
    }

    Ok(ds)
}

/// Writes `mesh` to `output` as an ExodusII file.
///
/// Nothing is written to `output` unless the whole file could be produced.
pub fn write_mesh(
    mesh: &IntermediateMesh,
    output: &Path,
    options: &WriteOptions,
) -> Result<(), Msh2ExoError> {
    if output.exists() && !options.force {
        return Err(Msh2ExoError::Input(format!(
            "Output file {} already exists, use --force to overwrite it",
            output.display()
        )));
    }

    let dataset = build_dataset(mesh, &options.title, &QaRecord::now())?;

    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir).map_err(|err| {
        Msh2ExoError::Writer(format!("Unable to create a file in {}: {err}", dir.display()))
    })?;
    dataset.write(tmp.path())?;

    let persisted = if options.force {
        tmp.persist(output)
    } else {
        tmp.persist_noclobber(output)
    };
    persisted.map_err(|err| {
        Msh2ExoError::Writer(format!("Unable to write {}: {}", output.display(), err.error))
    })?;

    info!("Wrote {}", output.display());
    Ok(())
}
