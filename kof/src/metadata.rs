//! Métadonnées d'un fichier KOF

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::parser::record::RecordCode;
use crate::types::{Attributes, KofGeometry};

/// Mode de lecture des lignes `05` retenu pour le fichier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserMode {
    /// Colonnes fixes (en-tête `-05` ou mode imposé)
    Columns,
    /// Heuristiques sur les tokens
    #[default]
    Tokens,
}

impl ParserMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Columns => "columns",
            Self::Tokens => "tokens",
        }
    }
}

/// Compteurs de géométries émises
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GeometryCounts {
    pub points: usize,
    pub line_strings: usize,
    /// Points constitutifs des lignes
    pub line_points: usize,
    pub polygons: usize,
    /// Points des anneaux (point de fermeture inclus)
    pub polygon_points: usize,
}

/// Ligne de mesure `20`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    /// Numéro de ligne (1-based)
    pub line: usize,
    pub attributes: Attributes,
}

/// Métadonnées collectées pendant le parsing
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileMetadata {
    pub file_name: Option<String>,
    /// Taille en octets
    pub file_size: Option<u64>,
    /// Encodage détecté (`UTF-8`, `windows-1252`)
    pub encoding: Option<String>,
    pub number_of_lines: usize,
    pub mode: ParserMode,
    /// Occurrences par code d'enregistrement (`05`, `09_91`, ...)
    pub record_counts: BTreeMap<String, usize>,
    /// Codes objet (SOSI) distincts
    pub feature_codes: BTreeSet<String>,
    pub geometry_counts: GeometryCounts,
    /// Attributs de fichier (lignes `10` / `12`)
    pub attributes: Attributes,
    /// Commentaires (lignes `00`)
    pub comments: Vec<String>,
    pub measurements: Vec<Measurement>,
    pub source_crs: Option<String>,
    pub target_crs: Option<String>,
    pub reprojection_error: Option<String>,
}

impl FileMetadata {
    /// Compte les lignes et les codes d'enregistrement
    pub fn scan(lines: &[&str]) -> Self {
        let mut record_counts = BTreeMap::new();
        for line in lines {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let key = if trimmed.starts_with('-') {
                trimmed
                    .split_whitespace()
                    .next()
                    .unwrap_or("-")
                    .to_string()
            } else {
                RecordCode::classify(trimmed).key()
            };
            *record_counts.entry(key).or_insert(0) += 1;
        }

        Self {
            number_of_lines: lines.len(),
            record_counts,
            ..Self::default()
        }
    }

    /// Met à jour les compteurs pour une géométrie émise
    pub fn record_geometry(&mut self, geometry: &KofGeometry) {
        let counts = &mut self.geometry_counts;
        match geometry {
            KofGeometry::Point(_) => counts.points += 1,
            KofGeometry::Line(line) => {
                counts.line_strings += 1;
                counts.line_points += line.len();
            }
            KofGeometry::Polygon(polygon) => {
                counts.polygons += 1;
                counts.polygon_points += polygon.ring().len();
            }
        }
    }

    /// Nombre d'occurrences d'un code (`"05"`, `"09_91"`, ...)
    pub fn record_count(&self, key: &str) -> usize {
        self.record_counts.get(key).copied().unwrap_or(0)
    }
}
