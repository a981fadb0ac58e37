//! Fichier KOF parsé, avec ses systèmes de coordonnées source et cible

use std::io::Write;
use std::path::Path;

use ::geojson::FeatureCollection;
use tracing::{debug, warn};

use kof::{FileMetadata, KofGeometry, ParseOptions, ParseResult, Warning};

use crate::epsg::{Crs, EpsgRegistry};
use crate::error::ExportError;
use crate::geojson::{to_feature_collection, write_feature_collection};
use crate::transform::CoordinateTransform;
use crate::wkb::{to_wkb_geometries, WkbGeometry};

/// Document KOF: résultat du parsing et CRS associés
///
/// Les erreurs de reprojection ne remontent jamais à l'appelant: le GeoJSON
/// est rendu sans transformation et le message est conservé dans
/// `metadata().reprojection_error`.
#[derive(Debug, Clone)]
pub struct KofFile {
    result: ParseResult,
    source_crs: Option<Crs>,
    target_crs: Option<Crs>,
}

impl KofFile {
    pub fn new(result: ParseResult) -> Self {
        Self {
            result,
            source_crs: None,
            target_crs: None,
        }
    }

    /// Parse un contenu en mémoire, `name` servant de nom de fichier
    pub fn from_content(name: &str, content: &str, options: &ParseOptions) -> Self {
        let mut result = kof::parse_str(content, options);
        result.metadata.file_name = Some(name.to_string());
        result.metadata.file_size = Some(content.len() as u64);
        Self::new(result)
    }

    /// Lit et parse un fichier `.kof`
    pub fn open(path: &Path, options: &ParseOptions) -> Result<Self, ExportError> {
        Ok(Self::new(kof::parse_file(path, options)?))
    }

    pub fn result(&self) -> &ParseResult {
        &self.result
    }

    pub fn into_result(self) -> ParseResult {
        self.result
    }

    pub fn metadata(&self) -> &FileMetadata {
        &self.result.metadata
    }

    pub fn geometries(&self) -> &[KofGeometry] {
        &self.result.geometries
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.result.warnings
    }

    pub fn source_crs(&self) -> Option<&Crs> {
        self.source_crs.as_ref()
    }

    pub fn target_crs(&self) -> Option<&Crs> {
        self.target_crs.as_ref()
    }

    /// Définit le CRS source (`EPSG:25832` ou `25832`)
    ///
    /// # Errors
    ///
    /// `InvalidEpsgCode` ou `MissingCrsDescription`; le CRS courant est alors
    /// conservé.
    pub fn set_source_crs(&mut self, code: &str) -> Result<&Crs, ExportError> {
        self.set_source_crs_in(EpsgRegistry::embedded(), code)
    }

    pub fn set_source_crs_in(
        &mut self,
        registry: &EpsgRegistry,
        code: &str,
    ) -> Result<&Crs, ExportError> {
        let crs = registry.resolve(code)?;
        self.result.metadata.source_crs = Some(crs.code.clone());
        Ok(self.source_crs.insert(crs))
    }

    /// Définit le CRS cible, mêmes règles que [`KofFile::set_source_crs`]
    pub fn set_target_crs(&mut self, code: &str) -> Result<&Crs, ExportError> {
        self.set_target_crs_in(EpsgRegistry::embedded(), code)
    }

    pub fn set_target_crs_in(
        &mut self,
        registry: &EpsgRegistry,
        code: &str,
    ) -> Result<&Crs, ExportError> {
        let crs = registry.resolve(code)?;
        self.result.metadata.target_crs = Some(crs.code.clone());
        Ok(self.target_crs.insert(crs))
    }

    /// Modèle géométrique (coordonnées source)
    pub fn to_wkb_geometries(&self) -> Vec<WkbGeometry> {
        to_wkb_geometries(&self.result.geometries)
    }

    /// GeoJSON en coordonnées source
    pub fn to_geojson(&self) -> FeatureCollection {
        to_feature_collection(&self.to_wkb_geometries(), self.source_crs.as_ref())
    }

    /// Écrit le GeoJSON en coordonnées source, feature par feature
    pub fn write_geojson<W: Write>(&self, writer: &mut W) -> Result<(), ExportError> {
        write_feature_collection(writer, &self.to_wkb_geometries(), self.source_crs.as_ref())
    }

    /// GeoJSON reprojeté vers le CRS cible quand source et cible diffèrent
    ///
    /// Sans transformation fournie, ou si elle échoue, retourne le GeoJSON
    /// non transformé et renseigne `reprojection_error`.
    pub fn to_geojson_with(
        &mut self,
        transform: Option<&dyn CoordinateTransform>,
    ) -> FeatureCollection {
        let (source, target) = match (&self.source_crs, &self.target_crs) {
            (Some(source), Some(target)) if source.code != target.code => {
                (source.clone(), target.clone())
            }
            _ => return self.to_geojson(),
        };

        let Some(transform) = transform else {
            return self.reprojection_failed("No coordinate transform available".to_string());
        };

        let mut geometries = self.to_wkb_geometries();
        let transformed = geometries.iter_mut().try_for_each(|geometry| {
            geometry.try_map_xy(|xy| transform.transform(&source.code, &target.code, xy))
        });

        match transformed {
            Ok(()) => {
                debug!(
                    source = %source.code,
                    target = %target.code,
                    geometries = geometries.len(),
                    "Geometries reprojected"
                );
                self.result.metadata.reprojection_error = None;
                to_feature_collection(&geometries, Some(&target))
            }
            Err(e) => self.reprojection_failed(e.to_string()),
        }
    }

    /// Fixe le CRS cible puis reprojette
    ///
    /// # Errors
    ///
    /// Seul un code cible invalide est une erreur. L'absence de CRS source
    /// est consignée dans `reprojection_error`.
    pub fn reproject(
        &mut self,
        target: &str,
        transform: Option<&dyn CoordinateTransform>,
    ) -> Result<FeatureCollection, ExportError> {
        self.set_target_crs(target)?;
        if self.source_crs.is_none() {
            return Ok(self.reprojection_failed("Source CRS not set".to_string()));
        }
        Ok(self.to_geojson_with(transform))
    }

    fn reprojection_failed(&mut self, message: String) -> FeatureCollection {
        warn!(
            file = self.result.metadata.file_name.as_deref().unwrap_or("<memory>"),
            error = %message,
            "Reprojection skipped"
        );
        self.result.metadata.reprojection_error = Some(message);
        self.to_geojson()
    }
}
