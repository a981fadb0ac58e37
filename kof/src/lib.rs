//! # kof
//!
//! Parser pour le format KOF (format d'échange norvégien des levés topographiques).
//!
//! ## Features
//!
//! - Lecture en colonnes fixes (en-tête `-05`) ou par heuristiques sur les tokens
//! - Construction des points, lignes et polygones à partir des codes `09`
//!   (dont les modes multi-lignes scie et vague)
//! - Avertissements non fatals: une ligne invalide n'interrompt jamais le parsing
//! - Types `geo` pour l'interopérabilité avec l'écosystème Rust géospatial
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kof::{parse_file, ParseOptions};
//! use std::path::Path;
//!
//! let result = parse_file(Path::new("survey.kof"), &ParseOptions::default())?;
//! println!("Points: {}", result.metadata.geometry_counts.points);
//!
//! for warning in &result.warnings {
//!     println!("{warning}");
//! }
//! ```

pub mod assemble;
pub mod config;
pub mod error;
pub mod metadata;
pub mod parser;
pub mod reader;
pub mod types;

pub use config::{ParseMode, ParseOptions};
pub use error::{KofError, RowError, Warning, WarningKind};
pub use metadata::{FileMetadata, ParserMode};
pub use types::{
    AttrValue, Attributes, Diagnostic, KofGeometry, KofLine, KofPoint, KofPolygon, ParseResult,
    MISSING_ELEVATION,
};

use std::path::Path;

use tracing::info;

/// Parse un contenu KOF en mémoire
pub fn parse_str(content: &str, options: &ParseOptions) -> ParseResult {
    parser::parse(content, options)
}

/// Lit et parse un fichier `.kof`
///
/// # Errors
///
/// Retourne `KofError` si le fichier est illisible ou si son extension n'est
/// pas `.kof` (quand `validate_extension` est actif).
pub fn parse_file(path: &Path, options: &ParseOptions) -> Result<ParseResult, KofError> {
    let source = reader::read_file(path, options.validate_extension)?;
    let mut result = parser::parse(&source.text, options);

    let metadata = &mut result.metadata;
    metadata.file_name = Some(source.file_name());
    metadata.file_size = Some(source.size);
    metadata.encoding = Some(source.encoding.name().to_string());

    info!(
        file = %path.display(),
        encoding = source.encoding.name(),
        mode = metadata.mode.as_str(),
        geometries = result.geometries.len(),
        warnings = result.warnings.len(),
        "KOF file parsed"
    );
    Ok(result)
}

/// Parse une liste de fichiers, dans l'ordre donné
///
/// S'arrête à la première erreur (extension invalide, fichier illisible).
pub fn parse_files<P: AsRef<Path>>(
    paths: &[P],
    options: &ParseOptions,
) -> Result<Vec<ParseResult>, KofError> {
    paths
        .iter()
        .map(|p| parse_file(p.as_ref(), options))
        .collect()
}

/// Parse tous les fichiers `.kof` d'un dossier (sous-dossiers si `recursive`)
pub fn parse_dir(dir: &Path, options: &ParseOptions) -> Result<Vec<ParseResult>, KofError> {
    let paths = reader::collect_paths(dir, options.recursive)?;
    info!(dir = %dir.display(), files = paths.len(), "KOF directory scanned");
    parse_files(&paths, options)
}

/// Fichier ou dossier selon la nature du chemin
pub fn parse_path(path: &Path, options: &ParseOptions) -> Result<Vec<ParseResult>, KofError> {
    if path.is_dir() {
        parse_dir(path, options)
    } else {
        parse_file(path, options).map(|result| vec![result])
    }
}
