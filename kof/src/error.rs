//! Types d'erreurs pour le crate kof

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Erreurs fatales pouvant survenir lors de la lecture d'un fichier KOF
///
/// Les problèmes de données (lignes mal formées, marqueurs orphelins...) ne
/// sont jamais des erreurs: ils sont rapportés sous forme de [`Warning`].
#[derive(Debug, Error)]
pub enum KofError {
    /// Erreur d'I/O lors de la lecture du fichier
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Extension de fichier invalide (attendu: .kof)
    #[error("Invalid file extension: {0}")]
    InvalidExtension(String),

    /// Options de parsing illisibles
    #[error("Invalid parse options: {0}")]
    InvalidOptions(#[from] serde_json::Error),
}

/// Erreur de décodage d'une ligne `05`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    /// Ligne vide après le code `05`
    #[error("KOF line {line} malformed: no data after '05'.")]
    Empty { line: usize },

    /// Aucune paire de coordonnées plausible
    #[error("KOF line {line} malformed: invalid coordinates.")]
    InvalidCoordinates { line: usize },
}

impl RowError {
    /// Numéro de ligne (1-based)
    pub fn line(&self) -> usize {
        match self {
            Self::Empty { line } | Self::InvalidCoordinates { line } => *line,
        }
    }
}

/// Catégorie d'un avertissement non fatal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WarningKind {
    /// Ligne `05` sans paire de coordonnées exploitable
    MalformedRow,
    /// Marqueur de fin (`09_96`/`09_99`) sans groupe ouvert
    OrphanControlMarker,
    /// Marqueur de début combiné à un marqueur de fin sur la même ligne
    ConflictingMarker,
    /// Code d'enregistrement inconnu
    UnknownCode,
    /// Lignes commençant par `-`
    IgnoredLines,
    /// Groupe (ou sous-ligne) avec trop peu de points
    DegenerateGroup,
    /// Groupe encore ouvert en fin de fichier
    UnclosedGroup,
    /// Code de contrôle `09_xx` reconnu mais non supporté
    UnsupportedControl,
}

/// Avertissement non fatal, attaché à une ligne du fichier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    /// Numéro de ligne (1-based)
    pub line: usize,
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn new(line: usize, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            line,
            kind,
            message: message.into(),
        }
    }
}

impl From<RowError> for Warning {
    fn from(err: RowError) -> Self {
        Self::new(err.line(), WarningKind::MalformedRow, err.to_string())
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}
