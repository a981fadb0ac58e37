//! Erreurs de l'export KOF

use kof::KofError;
use thiserror::Error;

/// Erreurs d'export et de gestion des systèmes de coordonnées
///
/// Un échec de reprojection n'en fait pas partie: il est consigné dans
/// `metadata.reprojection_error` et le GeoJSON est rendu sans transformation.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Lecture ou parsing du fichier source
    #[error(transparent)]
    Kof(#[from] KofError),

    /// Code absent de la table EPSG ou mal formé
    #[error("Invalid EPSG code: {0}")]
    InvalidEpsgCode(String),

    /// Code connu mais sans description de système de coordonnées
    #[error("No coordinate system description available for EPSG code {0}")]
    MissingCrsDescription(String),

    /// Encodage WKB
    #[error("Failed to convert geometry to WKB: {0}")]
    Wkb(String),

    /// Encodage WKT
    #[error("Failed to convert geometry to WKT: {0}")]
    Wkt(#[from] geozero::error::GeozeroError),

    /// Sérialisation JSON
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transformation de coordonnées (PROJ ou fonction fournie)
    #[error("Coordinate transformation failed: {0}")]
    Transform(String),
}

impl ExportError {
    pub fn transform(message: impl std::fmt::Display) -> Self {
        Self::Transform(message.to_string())
    }
}
