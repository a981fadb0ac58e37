//! # kof-export
//!
//! Export des fichiers KOF parsés par le crate `kof`.
//!
//! ## Features
//!
//! - GeoJSON (FeatureCollection en mémoire ou écrite en streaming)
//! - Modèle géométrique analogue à WKB, encodage WKB binaire et WKT
//! - Registre EPSG embarqué (UTM, NTM, NGO 1948...)
//! - Reprojection via une transformation fournie, ou PROJ avec le feature
//!   `reproject`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kof::ParseOptions;
//! use kof_export::KofFile;
//! use std::path::Path;
//!
//! let mut file = KofFile::open(Path::new("survey.kof"), &ParseOptions::default())?;
//! file.set_source_crs("EPSG:25832")?;
//! let geojson = file.to_geojson();
//! println!("{}", geojson.to_string());
//! ```

pub mod document;
pub mod epsg;
pub mod error;
pub mod geojson;
pub mod transform;
pub mod wkb;

pub use document::KofFile;
pub use epsg::{Crs, EpsgRegistry};
pub use error::ExportError;
pub use transform::{CoordinateTransform, ProjTransform};
pub use wkb::{WkbGeometry, WkbLineString, WkbPoint, WkbPolygon};
