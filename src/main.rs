use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use tracing::{info, Level};

use crate::{
    error::Msh2ExoError,
    exodus::WriteOptions,
    reader::select_reader,
    settings::Settings,
};

mod catalog;
mod datatypes;
mod error;
mod exodus;
mod msh;
mod reader;
mod settings;
mod sides;
mod toolkit;

/// Converts a gmsh msh file to ExodusII.
#[derive(Parser, Debug)]
#[command(name = "msh2exo", version, about = "msh2exo: mesh conversion utility")]
struct Options {
    /// Gmsh mesh to convert
    input_file: PathBuf,

    /// ExodusII file to create
    output_file: PathBuf,

    /// Use the builtin msh 4.1 ASCII reader instead of gmsh
    #[arg(short, long)]
    builtin: bool,

    /// Print progress information
    #[arg(short, long)]
    verbose: bool,

    /// Overwrite the output file if it exists
    #[arg(short, long)]
    force: bool,

    /// Json file with conversion settings
    #[arg(short, long, value_name = "JSON")]
    settings: Option<PathBuf>,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::INFO } else { Level::WARN };
    // a second init (tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_conversion(options: &Options) -> Result<(), Msh2ExoError> {
    if !options.input_file.is_file() {
        return Err(Msh2ExoError::Input(format!(
            "Input file {} does not exist",
            options.input_file.display()
        )));
    }

    let settings = match &options.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    let reader = select_reader(options.builtin, &settings);
    info!(
        "Reading {} with the {} reader",
        options.input_file.display(),
        reader.name()
    );
    let mut mesh = reader.read(&options.input_file)?;

    sides::derive_boundary_sides(&mut mesh, options.verbose)?;

    let write_options = WriteOptions {
        title: settings.title,
        force: options.force,
    };
    exodus::write_mesh(&mesh, &options.output_file, &write_options)
}

fn main() -> ExitCode {
    let options = Options::parse();
    init_logging(options.verbose);

    match run_conversion(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{msh::tests::SINGLE_HEX, reader::tests::SPARSE_TRIS};

    fn options(args: &[&str]) -> Options {
        Options::try_parse_from(std::iter::once("msh2exo").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn parses_flags() {
        let opts = options(&["-b", "-v", "--force", "-s", "cfg.json", "in.msh", "out.exo"]);
        assert!(opts.builtin && opts.verbose && opts.force);
        assert_eq!(opts.settings, Some(PathBuf::from("cfg.json")));
        assert_eq!(opts.input_file, PathBuf::from("in.msh"));
        assert_eq!(opts.output_file, PathBuf::from("out.exo"));

        assert!(Options::try_parse_from(["msh2exo", "in.msh"]).is_err());
    }

    #[test]
    fn converts_with_builtin_reader() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("hex.msh");
        let output = dir.path().join("hex.exo");
        let settings = dir.path().join("settings.json");
        std::fs::write(&input, SINGLE_HEX).unwrap();
        std::fs::write(&settings, r#"{ "title": "unit hex" }"#).unwrap();

        let opts = options(&[
            "--builtin",
            "--settings",
            settings.to_str().unwrap(),
            input.to_str().unwrap(),
            output.to_str().unwrap(),
        ]);
        run_conversion(&opts).unwrap();

        let written = std::fs::read(&output).unwrap();
        assert_eq!(&written[..4], b"CDF\x02");
        assert!(written.windows(8).any(|w| w == b"unit hex"));
    }

    #[test]
    fn failed_conversion_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("mixed.msh");
        let output = dir.path().join("mixed.exo");
        let contents = SPARSE_TRIS.replacen("2 2 2 1\n4 3 9 5", "2 2 3 1\n4 3 9 5 17", 1);
        std::fs::write(&input, contents).unwrap();

        let opts = options(&["-b", input.to_str().unwrap(), output.to_str().unwrap()]);
        assert!(matches!(run_conversion(&opts), Err(Msh2ExoError::Format(_))));
        assert!(!output.exists());
    }

    #[test]
    fn missing_input_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("none.msh");
        let output = dir.path().join("none.exo");
        let opts = options(&[input.to_str().unwrap(), output.to_str().unwrap()]);
        assert!(matches!(run_conversion(&opts), Err(Msh2ExoError::Input(_))));
    }
}
