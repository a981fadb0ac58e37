//! Export GeoJSON
//!
//! Coordonnées `[est, nord, altitude]`. Les propriétés de chaque feature
//! contiennent toujours `name` et `fcode` (null si inconnus).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ::geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde_json::{json, Value};

use crate::epsg::Crs;
use crate::error::ExportError;
use crate::wkb::WkbGeometry;

/// Feature GeoJSON d'une géométrie
pub fn to_feature(geometry: &WkbGeometry) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geometry.to_geojson_value())),
        id: None,
        properties: Some(geometry.properties()),
        foreign_members: None,
    }
}

/// FeatureCollection, avec un membre `crs` si le système est connu
pub fn to_feature_collection(geometries: &[WkbGeometry], crs: Option<&Crs>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: geometries.iter().map(to_feature).collect(),
        foreign_members: crs.map(|crs| {
            let mut members = JsonObject::new();
            members.insert("crs".to_string(), crs_member(crs));
            members
        }),
    }
}

/// Écrit une FeatureCollection feature par feature
pub fn write_feature_collection<W: Write>(
    writer: &mut W,
    geometries: &[WkbGeometry],
    crs: Option<&Crs>,
) -> Result<(), ExportError> {
    write!(writer, r#"{{"type":"FeatureCollection","#)?;
    if let Some(crs) = crs {
        write!(writer, r#""crs":{},"#, crs_member(crs))?;
    }
    write!(writer, r#""features":["#)?;

    for (i, geometry) in geometries.iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        serde_json::to_writer(&mut *writer, &to_feature(geometry))?;
    }

    write!(writer, "]}}")?;
    Ok(())
}

/// Exporte vers un fichier `.geojson`
pub fn export_to_geojson(
    geometries: &[WkbGeometry],
    crs: Option<&Crs>,
    output_path: &Path,
) -> Result<(), ExportError> {
    let file = File::create(output_path)?;
    let mut writer = BufWriter::new(file);
    write_feature_collection(&mut writer, geometries, crs)?;
    writer.flush()?;
    Ok(())
}

fn crs_member(crs: &Crs) -> Value {
    json!({
        "type": "name",
        "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", crs.epsg()) }
    })
}
