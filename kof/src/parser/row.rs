//! Décodage d'une ligne `05` en champs typés
//!
//! Ordre des stratégies:
//! 1. `columns`: découpe selon le gabarit (si fourni)
//! 2. `columns-ordered`: tokens affectés aux champs du gabarit dans l'ordre
//! 3. heuristiques sur les tokens numériques (`tokens-end-3`, `tokens-end-3-large`,
//!    `tokens-end-2`, `decimal-scan`, `large-first`)
//!
//! Un couple nord/est inversé est permuté (suffixe `-swapped`).

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::error::RowError;
use crate::parser::attributes::parse_trailing;
use crate::parser::layout::{ColumnLayout, Field};
use crate::types::{Attributes, KofPoint};

static RE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(?:[.,]\d+)?$").expect("valid number regex"));

/// Champs décodés d'une ligne `05`
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRow {
    pub name: Option<String>,
    pub code: Option<String>,
    pub northing: f64,
    pub easting: f64,
    pub elevation: Option<f64>,
    pub attributes: Attributes,
    /// Stratégie retenue (diagnostic)
    pub strategy: String,
}

impl DecodedRow {
    /// Convertit en point, en conservant la ligne source
    pub fn into_point(self, raw: &str) -> KofPoint {
        KofPoint {
            name: self.name,
            code: self.code,
            northing: self.northing,
            easting: self.easting,
            elevation: self.elevation,
            attributes: self.attributes,
            raw: raw.trim_end_matches(['\r', '\n']).to_string(),
        }
    }

    /// Permute nord/est si l'ordre lu n'est pas plausible mais l'inverse l'est
    fn finalize(mut self) -> Self {
        if !is_plausible(self.northing, self.easting) && is_plausible(self.easting, self.northing) {
            std::mem::swap(&mut self.northing, &mut self.easting);
            self.strategy.push_str("-swapped");
        }
        self
    }
}

/// Décode une ligne `05`
///
/// `line_index` est 0-based; les erreurs portent le numéro 1-based.
pub fn decode_point(
    line: &str,
    line_index: usize,
    layout: Option<&ColumnLayout>,
) -> Result<DecodedRow, RowError> {
    let line_no = line_index + 1;
    let raw = line.trim_end_matches(['\r', '\n']);

    if let Some(layout) = layout {
        if let Some(row) = decode_columns(raw, layout) {
            return Ok(row.finalize());
        }
        if let Some(row) = decode_ordered(raw, layout) {
            return Ok(row.finalize());
        }
        trace!(line = line_no, "Row not aligned with header, using token heuristics");
    }

    decode_tokens(raw, line_no).map(DecodedRow::finalize)
}

/// Couple (nord, est) plausible: nord décimal, ou |nord| >= 100000, ou |est| >= 1000
pub fn is_plausible(northing: f64, easting: f64) -> bool {
    if !northing.is_finite() || !easting.is_finite() {
        return false;
    }
    northing.fract() != 0.0 || northing.abs() >= 100_000.0 || easting.abs() >= 1000.0
}

/// Vrai si le token a la forme d'un nombre (`,` accepté comme séparateur)
pub fn is_number(token: &str) -> bool {
    RE_NUMBER.is_match(token)
}

/// Parse un nombre KOF (`,` ou `.` décimal)
pub fn parse_number(token: &str) -> Option<f64> {
    if !is_number(token) {
        return None;
    }
    if token.contains(',') {
        fast_float::parse(token.replacen(',', ".", 1)).ok()
    } else {
        fast_float::parse(token).ok()
    }
}

fn decode_columns(raw: &str, layout: &ColumnLayout) -> Option<DecodedRow> {
    let fields = layout.extract(raw);
    let northing = fields.northing.as_deref().and_then(parse_number)?;
    let easting = fields.easting.as_deref().and_then(parse_number)?;
    if !is_plausible(northing, easting) && !is_plausible(easting, northing) {
        return None;
    }

    Some(DecodedRow {
        name: fields.name,
        code: fields.code,
        northing,
        easting,
        elevation: fields.elevation.as_deref().and_then(parse_number),
        attributes: fields
            .trailing
            .as_deref()
            .map(parse_trailing)
            .unwrap_or_default(),
        strategy: "columns".to_string(),
    })
}

/// Tokens affectés aux champs du gabarit quand leur nombre correspond
fn decode_ordered(raw: &str, layout: &ColumnLayout) -> Option<DecodedRow> {
    let tokens = data_tokens(raw);
    if tokens.len() != layout.len() {
        return None;
    }

    let mut row = DecodedRow {
        name: None,
        code: None,
        northing: f64::NAN,
        easting: f64::NAN,
        elevation: None,
        attributes: Attributes::new(),
        strategy: "columns-ordered".to_string(),
    };
    for (field, token) in layout.fields().zip(&tokens) {
        match field {
            Field::Name => row.name = Some(token.to_string()),
            Field::Code => row.code = Some(token.to_string()),
            Field::Northing => row.northing = parse_number(token)?,
            Field::Easting => row.easting = parse_number(token)?,
            Field::Elevation => row.elevation = parse_number(token),
        }
    }

    if !is_plausible(row.northing, row.easting) && !is_plausible(row.easting, row.northing) {
        return None;
    }
    Some(row)
}

fn decode_tokens(raw: &str, line_no: usize) -> Result<DecodedRow, RowError> {
    let tokens = data_tokens(raw);
    if tokens.is_empty() {
        return Err(RowError::Empty { line: line_no });
    }

    let n = tokens.len();
    let numbers: Vec<Option<f64>> = tokens.iter().map(|t| parse_number(t)).collect();

    // (a) / (b): nombres contigus en fin de ligne
    if n >= 2 {
        if let (Some(second), Some(last)) = (numbers[n - 2], numbers[n - 1]) {
            if n >= 3 {
                if let Some(first) = numbers[n - 3] {
                    // [nord, est, altitude]
                    if last.abs() < 1000.0 && is_plausible(first, second) {
                        return Ok(build(&tokens, n - 3, n, first, second, Some(last), "tokens-end-3"));
                    }
                    // [code, nord, est]
                    if is_plausible(second, last) {
                        let mut row = build(&tokens, n - 3, n, second, last, None, "tokens-end-3-large");
                        row.code = Some(tokens[n - 3].to_string());
                        return Ok(row);
                    }
                }
            }
            if is_plausible(second, last) || is_plausible(last, second) {
                return Ok(build(&tokens, n - 2, n, second, last, None, "tokens-end-2"));
            }
        }
    }

    // (c) premier nombre décimal + nombre suivant
    if let Some(idx) = tokens
        .iter()
        .position(|t| is_number(t) && (t.contains('.') || t.contains(',')))
    {
        if let (Some(north), Some(east)) = (numbers[idx], numbers.get(idx + 1).copied().flatten()) {
            if is_plausible(north, east) || is_plausible(east, north) {
                let elevation = numbers.get(idx + 2).copied().flatten();
                let end = idx + 2 + usize::from(elevation.is_some());
                return Ok(build(&tokens, idx, end, north, east, elevation, "decimal-scan"));
            }
        }
    }

    // (d) premier nombre >= 100000 + nombre suivant
    for idx in 0..n.saturating_sub(1) {
        let (Some(north), Some(east)) = (numbers[idx], numbers[idx + 1]) else {
            continue;
        };
        if north.abs() >= 100_000.0 && is_plausible(north, east) {
            let elevation = numbers.get(idx + 2).copied().flatten();
            let end = idx + 2 + usize::from(elevation.is_some());
            return Ok(build(&tokens, idx, end, north, east, elevation, "large-first"));
        }
    }

    Err(RowError::InvalidCoordinates { line: line_no })
}

/// Assemble le résultat: tokens avant `start` = [nom, code], après `end` = attributs
fn build(
    tokens: &[&str],
    start: usize,
    end: usize,
    northing: f64,
    easting: f64,
    elevation: Option<f64>,
    strategy: &str,
) -> DecodedRow {
    let prefix = &tokens[..start];
    let trailing = tokens[end..].join(" ");

    DecodedRow {
        name: prefix.first().map(|s| s.to_string()),
        code: prefix.get(1).map(|s| s.to_string()),
        northing,
        easting,
        elevation,
        attributes: parse_trailing(&trailing),
        strategy: strategy.to_string(),
    }
}

/// Tokens de la ligne, sans le code `05` initial
fn data_tokens(raw: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.first() == Some(&"05") {
        tokens.remove(0);
    }
    tokens
}
