//! Options de parsing

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::KofError;

/// Mode de lecture des lignes `05`
///
/// Un en-tête `-05` dans le fichier impose toujours le mode colonnes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Colonnes si un en-tête `-05` est présent, tokens sinon
    #[default]
    Auto,
    /// Colonnes fixes, gabarit par défaut en l'absence d'en-tête
    Columns,
}

/// Options de parsing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ParseOptions {
    pub mode: ParseMode,

    /// En-tête `-05 ...` imposé (prioritaire sur celui du fichier)
    pub header: Option<String>,

    /// Refuser les fichiers sans extension `.kof`
    pub validate_extension: bool,

    /// Parcourir les sous-dossiers
    pub recursive: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            mode: ParseMode::Auto,
            header: None,
            validate_extension: true,
            recursive: false,
        }
    }
}

impl ParseOptions {
    /// Charge les options depuis un fichier JSON
    pub fn load(path: &Path) -> Result<Self, KofError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse les options depuis du JSON (champs absents = valeurs par défaut)
    pub fn from_json(json: &str) -> Result<Self, KofError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_mode(mut self, mode: ParseMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ParseOptions::default();
        assert_eq!(options.mode, ParseMode::Auto);
        assert!(options.validate_extension);
        assert!(!options.recursive);
        assert_eq!(ParseOptions::from_json("{}").unwrap(), options);
    }

    #[test]
    fn test_from_json() {
        let options =
            ParseOptions::from_json(r#"{"mode": "columns", "recursive": true}"#).unwrap();
        assert_eq!(options.mode, ParseMode::Columns);
        assert!(options.recursive);
        assert!(options.validate_extension);
    }

    #[test]
    fn test_invalid_json() {
        let err = ParseOptions::from_json(r#"{"mode": "fast"}"#).unwrap_err();
        assert!(matches!(err, KofError::InvalidOptions(_)));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("kof-options-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"mode": "columns", "validate_extension": false}"#).unwrap();
        let options = ParseOptions::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(options.mode, ParseMode::Columns);
        assert!(!options.validate_extension);
    }
}
