//! Registre des codes EPSG acceptés pour les fichiers KOF
//!
//! Deux tables JSON embarquées: code -> nom du système, et code -> description
//! du système de coordonnées. Un code n'est utilisable comme CRS source ou cible
//! que s'il figure dans les deux.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

use crate::error::ExportError;

static RE_EPSG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:EPSG:)?(\d{3,6})$").expect("valid EPSG regex"));

static EMBEDDED: LazyLock<EpsgRegistry> = LazyLock::new(|| {
    EpsgRegistry::from_json(
        include_str!("presets/epsg_names.json"),
        include_str!("presets/csys_descriptions.json"),
    )
    .expect("valid embedded EPSG tables")
});

/// Système de coordonnées résolu
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crs {
    /// Code canonique, ex. `EPSG:25832`
    pub code: String,
    pub name: String,
    pub description: String,
}

impl Crs {
    /// Numéro EPSG seul
    pub fn epsg(&self) -> u32 {
        self.code
            .strip_prefix("EPSG:")
            .and_then(|n| n.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code, self.name)
    }
}

/// Tables EPSG indexées par numéro (`"25832"`)
#[derive(Debug, Clone, Default)]
pub struct EpsgRegistry {
    names: BTreeMap<String, String>,
    descriptions: BTreeMap<String, String>,
}

impl EpsgRegistry {
    /// Registre embarqué (UTM, NTM, NGO 1948 et systèmes géographiques usuels)
    pub fn embedded() -> &'static EpsgRegistry {
        &EMBEDDED
    }

    /// Charge un registre depuis deux fichiers JSON (`{"25832": "..."}`)
    pub fn load(names: &Path, descriptions: &Path) -> Result<Self> {
        let names_json = std::fs::read_to_string(names)
            .context(format!("Failed to read EPSG table: {}", names.display()))?;
        let descriptions_json = std::fs::read_to_string(descriptions)
            .context(format!("Failed to read EPSG table: {}", descriptions.display()))?;
        Self::from_json(&names_json, &descriptions_json)
    }

    /// Construit un registre depuis le contenu JSON des deux tables
    ///
    /// Les clés peuvent être préfixées (`EPSG:25832`) ou non.
    pub fn from_json(names: &str, descriptions: &str) -> Result<Self> {
        Ok(Self {
            names: load_table(names).context("Failed to parse EPSG name table")?,
            descriptions: load_table(descriptions)
                .context("Failed to parse coordinate system description table")?,
        })
    }

    /// Numéro EPSG d'un code `EPSG:25832` ou `25832` (casse ignorée)
    pub fn normalize(code: &str) -> Option<String> {
        RE_EPSG
            .captures(code.trim())
            .map(|caps| caps[1].to_string())
    }

    /// Code bien formé et présent dans la table des noms
    pub fn is_valid(&self, code: &str) -> bool {
        Self::normalize(code).is_some_and(|key| self.names.contains_key(&key))
    }

    pub fn name(&self, code: &str) -> Option<&str> {
        let key = Self::normalize(code)?;
        self.names.get(&key).map(String::as_str)
    }

    pub fn description(&self, code: &str) -> Option<&str> {
        let key = Self::normalize(code)?;
        self.descriptions.get(&key).map(String::as_str)
    }

    /// Résout un code en [`Crs`]
    ///
    /// # Errors
    ///
    /// `InvalidEpsgCode` si le code est mal formé ou inconnu,
    /// `MissingCrsDescription` s'il n'a pas de description.
    pub fn resolve(&self, code: &str) -> Result<Crs, ExportError> {
        let key =
            Self::normalize(code).ok_or_else(|| ExportError::InvalidEpsgCode(code.to_string()))?;
        let name = self
            .names
            .get(&key)
            .ok_or_else(|| ExportError::InvalidEpsgCode(code.to_string()))?;
        let canonical = format!("EPSG:{key}");
        let description = self
            .descriptions
            .get(&key)
            .ok_or_else(|| ExportError::MissingCrsDescription(canonical.clone()))?;

        Ok(Crs {
            code: canonical,
            name: name.clone(),
            description: description.clone(),
        })
    }

    /// Codes connus, au format `EPSG:n`
    pub fn codes(&self) -> impl Iterator<Item = String> + '_ {
        self.names.keys().map(|key| format!("EPSG:{key}"))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn load_table(json: &str) -> Result<BTreeMap<String, String>> {
    let raw: BTreeMap<String, String> = serde_json::from_str(json)?;
    raw.into_iter()
        .map(|(code, value)| match EpsgRegistry::normalize(&code) {
            Some(key) => Ok((key, value)),
            None => anyhow::bail!("Invalid EPSG key: {}", code),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(EpsgRegistry::normalize("EPSG:25832").as_deref(), Some("25832"));
        assert_eq!(EpsgRegistry::normalize("epsg:5972").as_deref(), Some("5972"));
        assert_eq!(EpsgRegistry::normalize("4326").as_deref(), Some("4326"));
        assert_eq!(EpsgRegistry::normalize("EPSG:12"), None);
        assert_eq!(EpsgRegistry::normalize("EPSG:1234567"), None);
        assert_eq!(EpsgRegistry::normalize("UTM32"), None);
        assert_eq!(EpsgRegistry::normalize(""), None);
    }

    #[test]
    fn test_embedded_tables() {
        let registry = EpsgRegistry::embedded();
        assert!(!registry.is_empty());
        assert!(registry.is_valid("EPSG:25832"));
        assert!(registry.is_valid("25833"));
        assert!(registry.is_valid("epsg:5110"));
        assert!(!registry.is_valid("EPSG:99999"));
        assert_eq!(registry.name("EPSG:25832"), Some("ETRS89 / UTM zone 32N"));
        assert_eq!(registry.description("25832"), Some("EUREF89 UTM sone 32"));
        assert!(registry.codes().any(|code| code == "EPSG:4326"));
    }

    #[test]
    fn test_resolve() {
        let registry = EpsgRegistry::embedded();
        let crs = registry.resolve("25832").unwrap();
        assert_eq!(crs.code, "EPSG:25832");
        assert_eq!(crs.epsg(), 25832);
        assert_eq!(crs.to_string(), "EPSG:25832 (ETRS89 / UTM zone 32N)");
    }

    #[test]
    fn test_resolve_errors() {
        let registry = EpsgRegistry::embedded();
        assert!(matches!(
            registry.resolve("EPSG:abc"),
            Err(ExportError::InvalidEpsgCode(_))
        ));
        assert!(matches!(
            registry.resolve("EPSG:99999"),
            Err(ExportError::InvalidEpsgCode(_))
        ));
        // Pseudo-Mercator: connu, mais sans description
        assert!(matches!(
            registry.resolve("EPSG:3857"),
            Err(ExportError::MissingCrsDescription(code)) if code == "EPSG:3857"
        ));
    }

    #[test]
    fn test_from_json_prefixed_keys() {
        let registry = EpsgRegistry::from_json(
            r#"{"EPSG:25832": "ETRS89 / UTM zone 32N"}"#,
            r#"{"25832": "EUREF89 UTM sone 32"}"#,
        )
        .unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.resolve("EPSG:25832").is_ok());
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(EpsgRegistry::from_json(r#"{"UTM": "x"}"#, "{}").is_err());
        assert!(EpsgRegistry::from_json("[", "{}").is_err());
    }
}
