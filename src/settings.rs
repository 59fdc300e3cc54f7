use std::path::Path;

use json::JsonValue;
use tracing::warn;

use crate::error::Msh2ExoError;

/// Optional conversion settings loaded from a json file.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Title stored in the ExodusII file
    pub title: String,
    /// Program used by the toolkit reader
    pub gmsh_executable: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            title: String::new(),
            gmsh_executable: "gmsh".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from a json file
    ///
    /// # Arguments
    /// * `settings_file` - The path to the json file
    pub fn load(settings_file: &Path) -> Result<Settings, Msh2ExoError> {
        let file_string = std::fs::read_to_string(settings_file).map_err(|err| {
            Msh2ExoError::Input(format!(
                "Unable to open settings file {}: {err}",
                settings_file.display()
            ))
        })?;

        Settings::from_json(&file_string)
    }

    /// Parses settings from json text. Missing keys keep their defaults.
    pub fn from_json(text: &str) -> Result<Settings, Msh2ExoError> {
        let settings_json = json::parse(text)
            .map_err(|err| Msh2ExoError::Input(format!("Error in settings json: {err}")))?;

        if !settings_json.is_object() {
            return Err(Msh2ExoError::Input(
                "Settings json must be an object".to_string(),
            ));
        }

        let mut settings = Settings::default();
        for (key, value) in settings_json.entries() {
            match key {
                "title" => settings.title = string_value(key, value)?,
                "gmsh_executable" => settings.gmsh_executable = string_value(key, value)?,
                other => warn!("ignoring unknown settings key '{other}'"),
            }
        }

        if settings.gmsh_executable.trim().is_empty() {
            return Err(Msh2ExoError::Input(
                "Settings field gmsh_executable must not be empty".to_string(),
            ));
        }

        Ok(settings)
    }
}

fn string_value(key: &str, value: &JsonValue) -> Result<String, Msh2ExoError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Msh2ExoError::Input(format!("Settings field {key} must be a string")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        assert_eq!(Settings::from_json("{}").unwrap(), Settings::default());
    }

    #[test]
    fn reads_known_keys() {
        let settings = Settings::from_json(
            r#"{ "title": "cavity", "gmsh_executable": "/opt/gmsh/bin/gmsh", "extra": 1 }"#,
        )
        .unwrap();
        assert_eq!(settings.title, "cavity");
        assert_eq!(settings.gmsh_executable, "/opt/gmsh/bin/gmsh");
    }

    #[test]
    fn wrong_types_are_input_errors() {
        assert!(matches!(
            Settings::from_json(r#"{ "title": 3 }"#),
            Err(Msh2ExoError::Input(_))
        ));
        assert!(matches!(
            Settings::from_json("[1, 2]"),
            Err(Msh2ExoError::Input(_))
        ));
        assert!(matches!(
            Settings::from_json(r#"{ "gmsh_executable": " " }"#),
            Err(Msh2ExoError::Input(_))
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Settings::load(&dir.path().join("settings.json"));
        assert!(matches!(result, Err(Msh2ExoError::Input(_))));
    }
}
