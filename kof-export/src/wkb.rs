//! Modèle géométrique de sortie, analogue à WKB
//!
//! Chaque sommet porte x (est), y (nord), z (altitude, `-500` si absente) et
//! ses propres métadonnées. L'encodage binaire (WKB 2D) et texte (WKT) passe
//! par une conversion en `geo::Geometry`.

use geo::{Coord, Geometry, LineString, Point, Polygon};
use geozero::wkt::WktWriter;
use geozero::GeozeroGeometry;
use serde_json::{Map, Value};
use ::wkb::geom_to_wkb;

use kof::{AttrValue, Attributes, KofGeometry, KofLine, KofPoint};

use crate::error::ExportError;

/// Métadonnées d'une géométrie (propriétés GeoJSON)
pub type Meta = Map<String, Value>;

/// Sommet
#[derive(Debug, Clone, PartialEq)]
pub struct WkbPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub meta: Meta,
}

impl WkbPoint {
    /// Coordonnées `[x, y, z]`
    pub fn position(&self) -> Vec<f64> {
        vec![self.x, self.y, self.z]
    }

    fn coord(&self) -> Coord {
        Coord {
            x: self.x,
            y: self.y,
        }
    }
}

impl From<&KofPoint> for WkbPoint {
    fn from(point: &KofPoint) -> Self {
        let mut meta = attributes_to_meta(&point.attributes);
        meta.entry("name")
            .or_insert_with(|| optional_string(point.name.as_deref()));
        meta.entry("fcode")
            .or_insert_with(|| optional_string(point.code.as_deref()));

        Self {
            x: point.easting,
            y: point.northing,
            z: point.elevation_or_default(),
            meta,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WkbLineString {
    pub points: Vec<WkbPoint>,
    pub meta: Meta,
}

impl WkbLineString {
    fn to_geo(&self) -> LineString {
        LineString::new(self.points.iter().map(WkbPoint::coord).collect())
    }

    fn positions(&self) -> Vec<Vec<f64>> {
        self.points.iter().map(WkbPoint::position).collect()
    }
}

impl From<&KofLine> for WkbLineString {
    fn from(line: &KofLine) -> Self {
        Self {
            points: line.points.iter().map(WkbPoint::from).collect(),
            meta: attributes_to_meta(&line.attributes),
        }
    }
}

/// Polygone: premier anneau extérieur, toujours fermé
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WkbPolygon {
    pub rings: Vec<WkbLineString>,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WkbGeometry {
    Point(WkbPoint),
    LineString(WkbLineString),
    Polygon(WkbPolygon),
}

impl From<&KofGeometry> for WkbGeometry {
    fn from(geometry: &KofGeometry) -> Self {
        match geometry {
            KofGeometry::Point(p) => Self::Point(WkbPoint::from(p)),
            KofGeometry::Line(l) => Self::LineString(WkbLineString::from(l)),
            KofGeometry::Polygon(p) => Self::Polygon(WkbPolygon {
                rings: vec![WkbLineString::from(p.ring())],
                meta: attributes_to_meta(p.attributes()),
            }),
        }
    }
}

impl WkbGeometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::LineString(_) => "LineString",
            Self::Polygon(_) => "Polygon",
        }
    }

    pub fn meta(&self) -> &Meta {
        match self {
            Self::Point(p) => &p.meta,
            Self::LineString(l) => &l.meta,
            Self::Polygon(p) => &p.meta,
        }
    }

    /// Premier sommet (source des valeurs `name`/`fcode` par défaut)
    pub fn first_point(&self) -> Option<&WkbPoint> {
        match self {
            Self::Point(p) => Some(p),
            Self::LineString(l) => l.points.first(),
            Self::Polygon(p) => p.rings.first().and_then(|r| r.points.first()),
        }
    }

    /// Propriétés GeoJSON: `name` et `fcode` toujours présents
    pub fn properties(&self) -> Meta {
        let mut props = self.meta().clone();
        let first = self.first_point().map(|p| &p.meta);
        for key in ["name", "fcode"] {
            if !props.contains_key(key) {
                let value = first
                    .and_then(|meta| meta.get(key))
                    .cloned()
                    .unwrap_or(Value::Null);
                props.insert(key.to_string(), value);
            }
        }
        props
    }

    /// Valeur `geojson` de la géométrie (positions 3D)
    pub fn to_geojson_value(&self) -> geojson::Value {
        match self {
            Self::Point(p) => geojson::Value::Point(p.position()),
            Self::LineString(l) => geojson::Value::LineString(l.positions()),
            Self::Polygon(p) => {
                geojson::Value::Polygon(p.rings.iter().map(WkbLineString::positions).collect())
            }
        }
    }

    /// Applique `f` à chaque position `[x, y]` (z inchangé)
    pub fn try_map_xy<F>(&mut self, mut f: F) -> Result<(), ExportError>
    where
        F: FnMut([f64; 2]) -> Result<[f64; 2], ExportError>,
    {
        let mut apply = |point: &mut WkbPoint| -> Result<(), ExportError> {
            let [x, y] = f([point.x, point.y])?;
            point.x = x;
            point.y = y;
            Ok(())
        };

        match self {
            Self::Point(p) => apply(p),
            Self::LineString(l) => l.points.iter_mut().try_for_each(apply),
            Self::Polygon(p) => p
                .rings
                .iter_mut()
                .flat_map(|r| r.points.iter_mut())
                .try_for_each(apply),
        }
    }

    /// Géométrie `geo` 2D
    pub fn to_geo(&self) -> Geometry {
        match self {
            Self::Point(p) => Geometry::Point(Point::from(p.coord())),
            Self::LineString(l) => Geometry::LineString(l.to_geo()),
            Self::Polygon(p) => {
                let mut rings = p.rings.iter().map(WkbLineString::to_geo);
                let exterior = rings.next().unwrap_or_else(|| LineString::new(vec![]));
                Geometry::Polygon(Polygon::new(exterior, rings.collect()))
            }
        }
    }

    /// Encodage WKB binaire (2D)
    pub fn to_wkb(&self) -> Result<Vec<u8>, ExportError> {
        geom_to_wkb(&self.to_geo()).map_err(|e| ExportError::Wkb(format!("{:?}", e)))
    }

    /// Encodage WKT (2D)
    pub fn to_wkt(&self) -> Result<String, ExportError> {
        let mut wkt_buf = Vec::new();
        {
            let mut writer = WktWriter::new(&mut wkt_buf);
            self.to_geo().process_geom(&mut writer)?;
        }
        Ok(String::from_utf8_lossy(&wkt_buf).into_owned())
    }
}

/// Convertit toutes les géométries d'un parsing
pub fn to_wkb_geometries(geometries: &[KofGeometry]) -> Vec<WkbGeometry> {
    geometries.iter().map(WkbGeometry::from).collect()
}

fn attributes_to_meta(attributes: &Attributes) -> Meta {
    attributes
        .iter()
        .map(|(key, value)| (key.clone(), attr_to_json(value)))
        .collect()
}

fn attr_to_json(value: &AttrValue) -> Value {
    match value {
        AttrValue::Text(s) => Value::String(s.clone()),
        AttrValue::List(items) => {
            Value::Array(items.iter().cloned().map(Value::String).collect())
        }
    }
}

fn optional_string(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |s| Value::String(s.to_string()))
}
