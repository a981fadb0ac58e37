//! Types de données pour le crate kof

use std::collections::BTreeMap;
use std::fmt;

use geo::{Coord, LineString, Point, Polygon};
use serde::Serialize;

use crate::error::Warning;
use crate::metadata::FileMetadata;

/// Altitude utilisée quand une ligne `05` n'a pas de champ Z
pub const MISSING_ELEVATION: f64 = -500.0;

/// Valeur d'attribut: texte, ou liste de tokens bruts (`_raw`, `_extra`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Text(String),
    List(Vec<String>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::Text(_) => None,
            Self::List(items) => Some(items),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::List(items) => f.write_str(&items.join(" ")),
        }
    }
}

/// Attributs (clé -> valeur), triés par clé
pub type Attributes = BTreeMap<String, AttrValue>;

/// Point levé (ligne `05`)
#[derive(Debug, Clone, PartialEq)]
pub struct KofPoint {
    /// Nom du point (champ P)
    pub name: Option<String>,

    /// Code objet SOSI (champ K)
    pub code: Option<String>,

    /// Nord (champ X)
    pub northing: f64,

    /// Est (champ Y)
    pub easting: f64,

    /// Altitude (champ Z), absente si la ligne n'en porte pas
    pub elevation: Option<f64>,

    /// Attributs libres (paires key=value en fin de ligne, attributs en attente)
    pub attributes: Attributes,

    /// Ligne source, conservée pour la réécriture en texte
    pub raw: String,
}

impl KofPoint {
    pub fn new(easting: f64, northing: f64) -> Self {
        Self {
            name: None,
            code: None,
            northing,
            easting,
            elevation: None,
            attributes: Attributes::new(),
            raw: String::new(),
        }
    }

    /// Altitude, ou [`MISSING_ELEVATION`] si absente
    pub fn elevation_or_default(&self) -> f64 {
        self.elevation.unwrap_or(MISSING_ELEVATION)
    }

    /// Un point en (0, 0) est considéré comme absent
    pub fn is_valid(&self) -> bool {
        !(self.northing == 0.0 && self.easting == 0.0)
    }

    /// Comparaison exacte des coordonnées planimétriques
    pub fn same_position(&self, other: &KofPoint) -> bool {
        self.easting == other.easting && self.northing == other.northing
    }

    /// Coordonnée geo (x = est, y = nord)
    pub fn coord(&self) -> Coord {
        Coord {
            x: self.easting,
            y: self.northing,
        }
    }

    /// Nom résolu: l'attribut `name` prime sur le champ P
    pub fn resolved_name(&self) -> Option<&str> {
        resolve(&self.attributes, "name", self.name.as_deref())
    }

    /// Code objet résolu: l'attribut `fcode` prime sur le champ K
    pub fn resolved_code(&self) -> Option<&str> {
        resolve(&self.attributes, "fcode", self.code.as_deref())
    }

    /// Ligne KOF correspondant au point (ligne source si connue)
    pub fn to_kof_row(&self) -> String {
        if !self.raw.is_empty() {
            return self.raw.clone();
        }
        format!(
            "05 {:<10} {:<8} {:>12.3} {:>11.3} {:>8.3}",
            self.name.as_deref().unwrap_or(""),
            self.code.as_deref().unwrap_or(""),
            self.northing,
            self.easting,
            self.elevation_or_default()
        )
    }
}

/// Ligne (suite ordonnée de points)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KofLine {
    pub points: Vec<KofPoint>,

    /// Attributs rattachés au groupe (lignes `11` / `30`)
    pub attributes: Attributes,
}

impl KofLine {
    pub fn new(points: Vec<KofPoint>) -> Self {
        Self {
            points,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attributes(points: Vec<KofPoint>, attributes: Attributes) -> Self {
        Self { points, attributes }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Nom: attribut `name`, sinon celui du premier point
    pub fn name(&self) -> Option<&str> {
        let first = self.points.first().and_then(|p| p.name.as_deref());
        resolve(&self.attributes, "name", first)
    }

    /// Code objet: attribut `fcode`, sinon celui du premier point
    pub fn code(&self) -> Option<&str> {
        let first = self.points.first().and_then(|p| p.code.as_deref());
        resolve(&self.attributes, "fcode", first)
    }

    /// Lignes sources jointes par `\n`
    pub fn raw(&self) -> String {
        self.points
            .iter()
            .map(KofPoint::to_kof_row)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_geo(&self) -> LineString {
        LineString::new(self.points.iter().map(KofPoint::coord).collect())
    }
}

/// Polygone à un seul anneau extérieur
#[derive(Debug, Clone, PartialEq)]
pub struct KofPolygon {
    ring: KofLine,
}

impl KofPolygon {
    /// Construit le polygone et ferme l'anneau si premier != dernier
    pub fn new(mut points: Vec<KofPoint>, attributes: Attributes) -> Self {
        if let (Some(first), Some(last)) = (points.first(), points.last()) {
            if !first.same_position(last) {
                let closing = first.clone();
                points.push(closing);
            }
        }
        Self {
            ring: KofLine::with_attributes(points, attributes),
        }
    }

    /// Anneau extérieur (toujours fermé)
    pub fn ring(&self) -> &KofLine {
        &self.ring
    }

    /// Anneau d'au moins 4 positions (3 sommets distincts au minimum)
    pub fn has_valid_ring(&self) -> bool {
        self.ring.len() >= 4
    }

    pub fn attributes(&self) -> &Attributes {
        &self.ring.attributes
    }

    pub fn name(&self) -> Option<&str> {
        self.ring.name()
    }

    pub fn code(&self) -> Option<&str> {
        self.ring.code()
    }

    pub fn to_geo(&self) -> Polygon {
        Polygon::new(self.ring.to_geo(), vec![])
    }
}

/// Géométrie produite par le parser
#[derive(Debug, Clone, PartialEq)]
pub enum KofGeometry {
    Point(KofPoint),
    Line(KofLine),
    Polygon(KofPolygon),
}

impl KofGeometry {
    /// Type GeoJSON correspondant
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::Line(_) => "LineString",
            Self::Polygon(_) => "Polygon",
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Point(p) => p.resolved_name(),
            Self::Line(l) => l.name(),
            Self::Polygon(p) => p.name(),
        }
    }

    pub fn feature_code(&self) -> Option<&str> {
        match self {
            Self::Point(p) => p.resolved_code(),
            Self::Line(l) => l.code(),
            Self::Polygon(p) => p.code(),
        }
    }

    pub fn attributes(&self) -> &Attributes {
        match self {
            Self::Point(p) => &p.attributes,
            Self::Line(l) => &l.attributes,
            Self::Polygon(p) => p.attributes(),
        }
    }

    /// Points constitutifs (anneau fermé inclus pour un polygone)
    pub fn points(&self) -> &[KofPoint] {
        match self {
            Self::Point(p) => std::slice::from_ref(p),
            Self::Line(l) => &l.points,
            Self::Polygon(p) => &p.ring().points,
        }
    }

    pub fn to_geo(&self) -> geo::Geometry {
        match self {
            Self::Point(p) => geo::Geometry::Point(Point::from(p.coord())),
            Self::Line(l) => geo::Geometry::LineString(l.to_geo()),
            Self::Polygon(p) => geo::Geometry::Polygon(p.to_geo()),
        }
    }
}

/// Stratégie de décodage retenue pour une ligne `05`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Numéro de ligne (1-based)
    pub line: usize,
    pub strategy: String,
}

/// Résultat du parsing d'un fichier KOF
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    /// Géométries dans l'ordre d'émission
    pub geometries: Vec<KofGeometry>,

    /// Avertissements non fataux, triés par ligne
    pub warnings: Vec<Warning>,

    /// Stratégie de décodage par ligne `05`
    pub diagnostics: Vec<Diagnostic>,

    pub metadata: FileMetadata,
}

impl ParseResult {
    /// Ajoute une géométrie et met à jour les compteurs
    pub fn push_geometry(&mut self, geometry: KofGeometry) {
        self.metadata.record_geometry(&geometry);
        self.geometries.push(geometry);
    }

    pub fn points(&self) -> impl Iterator<Item = &KofPoint> {
        self.geometries.iter().filter_map(|g| match g {
            KofGeometry::Point(p) => Some(p),
            _ => None,
        })
    }

    pub fn lines(&self) -> impl Iterator<Item = &KofLine> {
        self.geometries.iter().filter_map(|g| match g {
            KofGeometry::Line(l) => Some(l),
            _ => None,
        })
    }

    pub fn polygons(&self) -> impl Iterator<Item = &KofPolygon> {
        self.geometries.iter().filter_map(|g| match g {
            KofGeometry::Polygon(p) => Some(p),
            _ => None,
        })
    }
}

fn resolve<'a>(attributes: &'a Attributes, key: &str, fallback: Option<&'a str>) -> Option<&'a str> {
    match attributes.get(key) {
        Some(value) => value.as_str().or(fallback),
        None => fallback,
    }
}
