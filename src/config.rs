//! Compiler options.
//!
//! Options are plain serde data in the camelCase shape build tools pass them
//! in. [`Options::validate`] rejects inconsistent combinations up front so no
//! file is processed with a configuration that cannot be honoured.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::StyleBakeError;
use crate::types::ConfigError;

/// Module whose `css` export is the style function unless configured otherwise.
pub const DEFAULT_IMPORT_SOURCE: &str = "@stylebake/react";

/// Module the bake pass imports its runtime helpers from.
pub const DEFAULT_RUNTIME_MODULE: &str = "@stylebake/react/runtime";

/// Source and destination roots for per-file stylesheet emission.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StyleDirectory {
    pub source: PathBuf,
    pub dest: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Options {
    /// Run the extraction pass after baking.
    pub extract: bool,
    /// Target of one side-effect import per rule.
    pub style_sheet_path: Option<String>,
    /// Write one stylesheet per source file under `dest`.
    pub extract_styles_to_directory: Option<StyleDirectory>,
    /// Replaces long class names with shorter ones; keyed without the leading `_`.
    pub class_name_compression_map: Option<HashMap<String, String>>,
    /// Added to every emitted style container.
    pub nonce: Option<String>,
    pub import_sources: Vec<String>,
    pub runtime_module: String,
    /// Order `@media` rules mobile-first.
    pub sort_at_rules: bool,
    /// Enables runtime warnings for insertion-order-sensitive selectors.
    pub development: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            extract: false,
            style_sheet_path: None,
            extract_styles_to_directory: None,
            class_name_compression_map: None,
            nonce: None,
            import_sources: vec![DEFAULT_IMPORT_SOURCE.to_owned()],
            runtime_module: DEFAULT_RUNTIME_MODULE.to_owned(),
            sort_at_rules: true,
            development: false,
        }
    }
}

/// Where extracted rules go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission {
    /// One `import "<path>?style=<rule>"` per unique rule.
    StyleSheetPath(String),
    /// A bucket-sorted `.compiled.css` file beside the module's mirror under `dest`.
    Directory { source: PathBuf, dest: PathBuf },
    /// Rules are only reported to the caller.
    Metadata,
}

impl Options {
    /// Parses options from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] for malformed input or unknown fields.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses an options file.
    ///
    /// # Errors
    ///
    /// Returns [`StyleBakeError::Io`] if the file cannot be read or
    /// [`StyleBakeError::Config`] if it is not valid options JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StyleBakeError> {
        let json = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&json)?)
    }

    /// Checks the options for conflicts.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.style_sheet_path.is_some() && self.extract_styles_to_directory.is_some() {
            return Err(ConfigError::ConflictingEmission);
        }
        if let Some(dir) = &self.extract_styles_to_directory {
            if dir.source.as_os_str().is_empty() {
                return Err(ConfigError::EmptyDirectory { field: "source" });
            }
            if dir.dest.as_os_str().is_empty() {
                return Err(ConfigError::EmptyDirectory { field: "dest" });
            }
        }
        if self.import_sources.is_empty() {
            return Err(ConfigError::NoImportSources);
        }
        if self.import_sources.contains(&self.runtime_module) {
            return Err(ConfigError::RuntimeIsImportSource(self.runtime_module.clone()));
        }
        Ok(())
    }

    /// The emission policy selected by these options; `None` when extraction is off.
    #[must_use]
    pub fn emission(&self) -> Option<Emission> {
        if !self.extract {
            return None;
        }
        if let Some(path) = &self.style_sheet_path {
            return Some(Emission::StyleSheetPath(path.clone()));
        }
        if let Some(dir) = &self.extract_styles_to_directory {
            return Some(Emission::Directory {
                source: dir.source.clone(),
                dest: dir.dest.clone(),
            });
        }
        Some(Emission::Metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = Options::default();
        assert!(!options.extract);
        assert!(options.sort_at_rules);
        assert_eq!(options.import_sources, vec![DEFAULT_IMPORT_SOURCE]);
        assert_eq!(options.runtime_module, DEFAULT_RUNTIME_MODULE);
        assert_eq!(options.emission(), None);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn camel_case_fields() {
        let options = Options::from_json(
            r#"{
                "extract": true,
                "extractStylesToDirectory": { "source": "src", "dest": "dist" },
                "classNameCompressionMap": { "1abc2def": "a" },
                "nonce": "k3y",
                "sortAtRules": false
            }"#,
        )
        .unwrap();
        assert_eq!(
            options.emission(),
            Some(Emission::Directory {
                source: "src".into(),
                dest: "dist".into()
            })
        );
        assert_eq!(options.nonce.as_deref(), Some("k3y"));
        assert!(!options.sort_at_rules);
        assert_eq!(options.import_sources, vec![DEFAULT_IMPORT_SOURCE]);
    }

    #[test]
    fn emission_policies() {
        let mut options = Options {
            extract: true,
            ..Options::default()
        };
        assert_eq!(options.emission(), Some(Emission::Metadata));
        options.style_sheet_path = Some("@stylebake/css-loader/extract.css".into());
        assert_eq!(
            options.emission(),
            Some(Emission::StyleSheetPath(
                "@stylebake/css-loader/extract.css".into()
            ))
        );
    }

    #[test]
    fn conflicting_emission_is_rejected() {
        let options = Options::from_json(
            r#"{ "styleSheetPath": "x.css", "extractStylesToDirectory": { "source": "src", "dest": "dist" } }"#,
        )
        .unwrap();
        assert!(matches!(
            options.validate(),
            Err(ConfigError::ConflictingEmission)
        ));
    }

    #[test]
    fn empty_directory_fields_are_rejected() {
        let options = Options::from_json(
            r#"{ "extractStylesToDirectory": { "source": "src", "dest": "" } }"#,
        )
        .unwrap();
        assert!(matches!(
            options.validate(),
            Err(ConfigError::EmptyDirectory { field: "dest" })
        ));
    }

    #[test]
    fn import_setup_conflicts() {
        let options = Options {
            import_sources: Vec::new(),
            ..Options::default()
        };
        assert!(matches!(options.validate(), Err(ConfigError::NoImportSources)));

        let options = Options {
            import_sources: vec![DEFAULT_RUNTIME_MODULE.into()],
            ..Options::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ConfigError::RuntimeIsImportSource(_))
        ));
    }

    #[test]
    fn unknown_fields_are_errors() {
        let err = Options::from_json(r#"{ "extrat": true }"#).unwrap_err();
        assert!(err.to_string().starts_with("invalid options:"), "{err}");
    }

    #[test]
    fn from_file_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stylebake.json");
        std::fs::write(&path, r#"{ "extract": true }"#).unwrap();
        let options = Options::from_file(&path).unwrap();
        assert!(options.extract);
        assert!(matches!(
            Options::from_file(dir.path().join("missing.json")),
            Err(StyleBakeError::Io(_))
        ));
    }
}
