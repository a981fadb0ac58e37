//! Lecture des fichiers KOF (.kof)
//!
//! Les fichiers sont lus en mémoire puis décodés: UTF-8 (BOM retiré) si
//! valide, Windows-1252 sinon.

use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

use crate::error::KofError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Fichier KOF lu et décodé
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Taille en octets
    pub size: u64,
    pub text: String,
    pub encoding: &'static Encoding,
}

impl SourceFile {
    /// Nom du fichier (sans le dossier)
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Décode des octets KOF en texte
pub fn decode_bytes(data: &[u8]) -> (String, &'static Encoding) {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);

    // Validation SIMD, cas le plus fréquent
    if let Ok(text) = simdutf8::basic::from_utf8(data) {
        return (text.to_string(), UTF_8);
    }

    let (decoded, _) = WINDOWS_1252.decode_without_bom_handling(data);
    (decoded.into_owned(), WINDOWS_1252)
}

/// Extension `.kof` (insensible à la casse)
pub fn is_kof_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("kof"))
}

/// Lit et décode un fichier
pub fn read_file(path: &Path, validate_extension: bool) -> Result<SourceFile, KofError> {
    if validate_extension && !is_kof_extension(path) {
        return Err(KofError::InvalidExtension(path.display().to_string()));
    }

    let data = std::fs::read(path)?;
    let (text, encoding) = decode_bytes(&data);

    Ok(SourceFile {
        path: path.to_path_buf(),
        size: data.len() as u64,
        text,
        encoding,
    })
}

/// Liste les fichiers `.kof` d'un dossier, triés
pub fn collect_paths(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, KofError> {
    let mut paths = Vec::new();
    walk(dir, recursive, &mut paths)?;
    paths.sort();
    Ok(paths)
}

fn walk(dir: &Path, recursive: bool, paths: &mut Vec<PathBuf>) -> Result<(), KofError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let entry_path = entry.path();

        if entry_path.is_dir() {
            if recursive {
                walk(&entry_path, recursive, paths)?;
            }
        } else if is_kof_extension(&entry_path) {
            paths.push(entry_path);
        }
    }
    Ok(())
}
