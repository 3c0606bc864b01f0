use crate::error::{Error, Result};
use crate::permissions;
use config::{Config as ConfigBuilder, File as ConfigFile, FileFormat};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_PERMISSIONS: &str = "rw-r--r--";
pub const DEFAULT_PROBLEMATIC_CHARACTERS: [char; 8] = [';', '\'', ',', '*', '?', '#', '`', '|'];
pub const DEFAULT_REPLACEMENT_CHARACTER: char = '_';
pub const DEFAULT_TEMPORARY_EXTENSIONS: [&str; 2] = [".tmp", ".log"];

/// Validated, read-only settings shared by every phase of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    suggested_file_permissions: String,
    problematic_characters: Vec<char>,
    replacement_character: char,
    temporary_file_extensions: Vec<String>,
}

/// Shape of the JSON file before validation.
#[derive(Debug, Deserialize)]
struct RawConfig {
    suggested_file_permissions: String,
    problematic_characters: Vec<String>,
    replacement_character: String,
    temporary_file_extensions: Vec<String>,
}

/// Where the configuration of a run came from.
#[derive(Debug)]
pub enum ConfigOrigin {
    BuiltIn,
    File,
    /// A path was given but could not be read.
    FallbackDefault(io::Error),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            suggested_file_permissions: DEFAULT_PERMISSIONS.to_string(),
            problematic_characters: DEFAULT_PROBLEMATIC_CHARACTERS.to_vec(),
            replacement_character: DEFAULT_REPLACEMENT_CHARACTER,
            temporary_file_extensions: DEFAULT_TEMPORARY_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Config {
    pub fn new(
        suggested_file_permissions: &str,
        problematic_characters: Vec<char>,
        replacement_character: char,
        temporary_file_extensions: Vec<String>,
    ) -> Result<Self> {
        if !permissions::is_valid_symbolic(suggested_file_permissions) {
            return Err(Error::Config(format!(
                "invalid permissions format '{}', expected 9 characters such as rw-r--r--",
                suggested_file_permissions
            )));
        }
        if matches!(replacement_character, '/' | '\0') {
            return Err(Error::Config(format!(
                "replacement character {:?} cannot appear in a file name",
                replacement_character
            )));
        }
        if temporary_file_extensions.iter().any(|ext| ext.is_empty()) {
            return Err(Error::Config(
                "temporary file extensions cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            suggested_file_permissions: suggested_file_permissions.to_string(),
            problematic_characters,
            replacement_character,
            temporary_file_extensions,
        })
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let problematic_characters = raw
            .problematic_characters
            .iter()
            .map(|s| single_char("problematic_characters", s))
            .collect::<Result<Vec<_>>>()?;
        let replacement_character =
            single_char("replacement_character", &raw.replacement_character)?;

        Self::new(
            &raw.suggested_file_permissions,
            problematic_characters,
            replacement_character,
            raw.temporary_file_extensions,
        )
    }

    /// Parse a JSON document. Keys it leaves out keep their built-in values.
    pub fn from_json(contents: &str) -> Result<Self> {
        let defaults = Self::default();
        let builder = ConfigBuilder::builder()
            .set_default(
                "suggested_file_permissions",
                defaults.suggested_file_permissions.clone(),
            )?
            .set_default(
                "problematic_characters",
                defaults
                    .problematic_characters
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>(),
            )?
            .set_default(
                "replacement_character",
                defaults.replacement_character.to_string(),
            )?
            .set_default(
                "temporary_file_extensions",
                defaults.temporary_file_extensions.clone(),
            )?
            .add_source(ConfigFile::from_str(contents, FileFormat::Json))
            .build()?;

        Self::from_raw(builder.try_deserialize::<RawConfig>()?)
    }

    pub fn suggested_file_permissions(&self) -> &str {
        &self.suggested_file_permissions
    }

    pub fn suggested_mode(&self) -> u32 {
        permissions::symbolic_to_octal(&self.suggested_file_permissions)
    }

    pub fn problematic_characters(&self) -> &[char] {
        &self.problematic_characters
    }

    pub fn replacement_character(&self) -> char {
        self.replacement_character
    }

    pub fn temporary_file_extensions(&self) -> &[String] {
        &self.temporary_file_extensions
    }
}

fn single_char(key: &str, value: &str) -> Result<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(Error::Config(format!(
            "{} must hold single characters, got '{}'",
            key, value
        ))),
    }
}

/// Load the configuration for a run.
///
/// With no path the built-in defaults are used. A path that cannot be read
/// also falls back to the defaults; the caller reports that through the
/// returned [`ConfigOrigin`]. Unparseable or invalid contents are an error.
pub fn load_configuration(path: Option<&Path>) -> Result<(Config, ConfigOrigin)> {
    let Some(path) = path else {
        return Ok((Config::default(), ConfigOrigin::BuiltIn));
    };

    match fs::read_to_string(path) {
        Ok(contents) => {
            debug!("Loading configuration from {}", path.display());
            Ok((Config::from_json(&contents)?, ConfigOrigin::File))
        }
        Err(err) => {
            debug!("Could not read {}: {}", path.display(), err);
            Ok((Config::default(), ConfigOrigin::FallbackDefault(err)))
        }
    }
}

/// Remove directories that are subdirectories of other directories in the list.
pub fn non_overlapping_directories<P: AsRef<Path>>(dirs: &[P]) -> Vec<&Path> {
    let mut result: Vec<&Path> = Vec::new();

    for dir in dirs {
        let dir_path = dir.as_ref();
        if result.iter().any(|kept| dir_path.starts_with(kept)) {
            continue;
        }
        result.retain(|kept| !kept.starts_with(dir_path));
        result.push(dir_path);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.suggested_file_permissions(), "rw-r--r--");
        assert_eq!(config.suggested_mode(), 0o644);
        assert_eq!(config.replacement_character(), '_');
        assert!(config.problematic_characters().contains(&';'));
        assert_eq!(config.temporary_file_extensions(), [".tmp", ".log"]);
    }

    #[test]
    fn test_full_json() {
        let config = Config::from_json(
            r#"{
                "suggested_file_permissions": "rwxr-x---",
                "problematic_characters": [":", "$"],
                "replacement_character": "-",
                "temporary_file_extensions": [".bak"]
            }"#,
        )
        .unwrap();
        assert_eq!(config.suggested_mode(), 0o750);
        assert_eq!(config.problematic_characters(), [':', '$']);
        assert_eq!(config.replacement_character(), '-');
        assert_eq!(config.temporary_file_extensions(), [".bak"]);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = Config::from_json(r#"{ "replacement_character": "+" }"#).unwrap();
        assert_eq!(config.replacement_character(), '+');
        assert_eq!(config.suggested_file_permissions(), DEFAULT_PERMISSIONS);
        assert_eq!(
            config.problematic_characters(),
            DEFAULT_PROBLEMATIC_CHARACTERS
        );
    }

    #[test]
    fn test_wrong_permission_length_is_rejected() {
        let err = Config::from_json(r#"{ "suggested_file_permissions": "rw-r--r" }"#)
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("rw-r--r"));
    }

    #[test]
    fn test_multi_char_entries_are_rejected() {
        assert!(Config::from_json(r#"{ "replacement_character": "__" }"#).is_err());
        assert!(Config::from_json(r#"{ "problematic_characters": [";;"] }"#).is_err());
        assert!(Config::from_json(r#"{ "replacement_character": "/" }"#).is_err());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(Config::from_json("{ not json").is_err());
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let dir = tempdir().unwrap();
        let (config, origin) =
            load_configuration(Some(&dir.path().join("missing.json"))).unwrap();
        assert!(matches!(
            origin,
            ConfigOrigin::FallbackDefault(ref err) if err.kind() == io::ErrorKind::NotFound
        ));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_unreadable_path_keeps_the_reason() {
        let dir = tempdir().unwrap();
        let (config, origin) = load_configuration(Some(dir.path())).unwrap();
        match origin {
            ConfigOrigin::FallbackDefault(err) => assert_ne!(err.kind(), io::ErrorKind::NotFound),
            other => panic!("expected a fallback, got {:?}", other),
        }
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "temporary_file_extensions": [".swp"] }"#).unwrap();
        let (config, origin) = load_configuration(Some(&path)).unwrap();
        assert!(matches!(origin, ConfigOrigin::File));
        assert_eq!(config.temporary_file_extensions(), [".swp"]);
    }

    #[test]
    fn test_non_overlapping_with_subdirectory() {
        let dirs = vec![
            PathBuf::from("/home/user/docs"),
            PathBuf::from("/home/user"),
            PathBuf::from("/var/data"),
            PathBuf::from("/var/data"),
        ];
        let result = non_overlapping_directories(&dirs);
        assert_eq!(result, vec![Path::new("/home/user"), Path::new("/var/data")]);
    }

    #[test]
    fn test_non_overlapping_sibling_prefix() {
        let dirs = vec![PathBuf::from("/data/a"), PathBuf::from("/data/ab")];
        assert_eq!(non_overlapping_directories(&dirs).len(), 2);
    }
}
