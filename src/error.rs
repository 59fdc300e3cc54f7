use thiserror::Error;

/// Every way a conversion can fail. All of them abort the whole run.
#[derive(Debug, Error)]
pub enum Msh2ExoError {
    /// Bad command line arguments or settings file.
    #[error("Input error: {0}")]
    Input(String),

    /// The msh file is malformed or uses a version/encoding we do not read.
    #[error("Format error: {0}")]
    Format(String),

    /// A tag or index is referenced without being declared.
    #[error("Consistency error: {0}")]
    Consistency(String),

    /// An element topology without a face table.
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// The external gmsh executable failed.
    #[error("Toolkit error: {0}")]
    Toolkit(String),

    /// The ExodusII file could not be created or written.
    #[error("Writer error: {0}")]
    Writer(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
